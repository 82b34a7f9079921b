//! Line-oriented terminal output for the transcript.
//!
//! Committed entries are printed once and scroll away normally. Below them
//! sits a small live region (progress indicator plus the typing placeholder)
//! that is erased and redrawn in place whenever it changes.

use std::io::{self, Write};

use ratatui::crossterm::{
    cursor::MoveToPreviousLine,
    queue,
    style::{
        Attribute, Color as TermColor, Print, ResetColor, SetAttribute, SetForegroundColor,
    },
    terminal::{Clear, ClearType},
};
use ratatui::style::{Color, Modifier};
use ratatui::text::{Line, Span};
use tracing::warn;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::core::client::TranscriptView;
use crate::core::transcript::TranscriptEntry;
use crate::ui::renderer::{line_text, render_entry, render_progress, render_typing, RenderConfig};
use crate::ui::theme::Theme;
use crate::utils::logging::TranscriptLog;

pub struct TerminalView<W: Write> {
    out: W,
    theme: Theme,
    render: RenderConfig,
    /// Emit colors and redraw the live region in place.
    interactive: bool,
    width: usize,
    /// The live region is kept below this many rows so it can always be
    /// erased with a relative cursor move.
    height: usize,
    log: TranscriptLog,
    progress: Option<String>,
    typing: Option<String>,
    live_rows: u16,
}

impl<W: Write> TerminalView<W> {
    pub fn new(out: W, theme: Theme, render: RenderConfig, interactive: bool) -> Self {
        let (width, height) = ratatui::crossterm::terminal::size()
            .map(|(columns, rows)| (columns as usize, rows as usize))
            .unwrap_or((80, 24));
        Self {
            out,
            theme,
            render,
            interactive,
            width: width.max(1),
            height: height.max(2),
            log: TranscriptLog::disabled(),
            progress: None,
            typing: None,
            live_rows: 0,
        }
    }

    pub fn with_log(mut self, log: TranscriptLog) -> Self {
        self.log = log;
        self
    }

    #[cfg(test)]
    fn with_width(mut self, width: usize) -> Self {
        self.width = width.max(1);
        self
    }

    #[cfg(test)]
    fn with_height(mut self, height: usize) -> Self {
        self.height = height.max(2);
        self
    }

    /// Erases the live region, e.g. before printing a prompt.
    pub fn settle(&mut self) -> io::Result<()> {
        self.progress = None;
        self.typing = None;
        self.clear_live()?;
        self.out.flush()
    }

    /// Writes an input prompt without a trailing newline.
    pub fn prompt(&mut self, text: &str) -> io::Result<()> {
        self.clear_live()?;
        write!(self.out, "{text}")?;
        self.out.flush()
    }

    /// Prints a line that is not part of the transcript (help, hints).
    pub fn notice(&mut self, text: &str) -> io::Result<()> {
        self.clear_live()?;
        writeln!(self.out, "{text}")?;
        self.draw_live()
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn print_entry(&mut self, entry: &TranscriptEntry) -> io::Result<()> {
        let lines = render_entry(entry, &self.theme, &self.render);
        self.clear_live()?;
        for line in &lines {
            self.write_line(line)?;
        }
        writeln!(self.out)?;

        let plain: Vec<String> = lines.iter().map(line_text).collect();
        if let Err(err) = self.log.log_entry(entry.role.as_str(), &plain) {
            warn!(error = %err, "failed to append to transcript log");
        }

        self.draw_live()
    }

    fn draw_live(&mut self) -> io::Result<()> {
        self.clear_live()?;
        if !self.interactive {
            return self.out.flush();
        }

        let mut lines = Vec::new();
        if let Some(progress) = &self.progress {
            lines.push(render_progress(progress, &self.theme));
        }
        if let Some(typing) = &self.typing {
            lines.extend(render_typing(typing, &self.theme));
        }

        let lines = self.visible_tail(lines);
        let mut rows = 0usize;
        for line in &lines {
            rows += self.rows_for(line);
            self.write_line(line)?;
        }
        self.live_rows = rows.min(u16::MAX as usize) as u16;
        self.out.flush()
    }

    /// Keeps the trailing lines that fit in `height - 1` rows. A single line
    /// taller than that is cut down to its last screenful.
    fn visible_tail(&self, mut lines: Vec<Line<'static>>) -> Vec<Line<'static>> {
        let budget = self.height.saturating_sub(1).max(1);
        let mut rows = 0usize;
        let mut start = lines.len();
        while start > 0 {
            let needed = self.rows_for(&lines[start - 1]);
            if rows + needed > budget {
                break;
            }
            rows += needed;
            start -= 1;
        }
        if start == lines.len() {
            return lines
                .pop()
                .map(|line| vec![tail_columns(&line, budget * self.width)])
                .unwrap_or_default();
        }
        lines.split_off(start)
    }

    fn clear_live(&mut self) -> io::Result<()> {
        if self.live_rows > 0 {
            queue!(
                self.out,
                MoveToPreviousLine(self.live_rows),
                Clear(ClearType::FromCursorDown)
            )?;
            self.live_rows = 0;
        }
        Ok(())
    }

    fn rows_for(&self, line: &Line<'_>) -> usize {
        let width = line_text(line).width();
        width.div_ceil(self.width).max(1)
    }

    fn write_line(&mut self, line: &Line<'_>) -> io::Result<()> {
        if !self.interactive {
            return writeln!(self.out, "{}", line_text(line));
        }
        for span in &line.spans {
            let style = span.style;
            if let Some(color) = style.fg.and_then(term_color) {
                queue!(self.out, SetForegroundColor(color))?;
            }
            for (modifier, attribute) in [
                (Modifier::BOLD, Attribute::Bold),
                (Modifier::DIM, Attribute::Dim),
                (Modifier::ITALIC, Attribute::Italic),
                (Modifier::UNDERLINED, Attribute::Underlined),
                (Modifier::REVERSED, Attribute::Reverse),
            ] {
                if style.add_modifier.contains(modifier) {
                    queue!(self.out, SetAttribute(attribute))?;
                }
            }
            queue!(
                self.out,
                Print(span.content.as_ref()),
                SetAttribute(Attribute::Reset),
                ResetColor
            )?;
        }
        writeln!(self.out)
    }
}

impl<W: Write> TranscriptView for TerminalView<W> {
    fn entry_added(&mut self, entry: &TranscriptEntry) {
        if let Err(err) = self.print_entry(entry) {
            warn!(error = %err, "failed to write transcript entry");
        }
    }

    fn typing_changed(&mut self, text: Option<&str>) {
        self.typing = text.map(str::to_string);
        if let Err(err) = self.draw_live() {
            warn!(error = %err, "failed to redraw typing placeholder");
        }
    }

    fn progress_changed(&mut self, text: &str) {
        self.progress = Some(text.to_string());
        if let Err(err) = self.draw_live() {
            warn!(error = %err, "failed to redraw progress");
        }
    }
}

/// The end of `line` that fits in `columns` display cells, in the style of
/// its last span.
fn tail_columns(line: &Line<'_>, columns: usize) -> Line<'static> {
    let text = line_text(line);
    let mut used = 0usize;
    let mut start = text.len();
    for (index, ch) in text.char_indices().rev() {
        let width = ch.width().unwrap_or(0);
        if used + width > columns {
            break;
        }
        used += width;
        start = index;
    }
    let style = line.spans.last().map(|span| span.style).unwrap_or_default();
    Line::from(Span::styled(text[start..].to_string(), style))
}

fn term_color(color: Color) -> Option<TermColor> {
    Some(match color {
        Color::Reset => return None,
        Color::Black => TermColor::Black,
        Color::Red => TermColor::DarkRed,
        Color::Green => TermColor::DarkGreen,
        Color::Yellow => TermColor::DarkYellow,
        Color::Blue => TermColor::DarkBlue,
        Color::Magenta => TermColor::DarkMagenta,
        Color::Cyan => TermColor::DarkCyan,
        Color::Gray => TermColor::Grey,
        Color::DarkGray => TermColor::DarkGrey,
        Color::LightRed => TermColor::Red,
        Color::LightGreen => TermColor::Green,
        Color::LightYellow => TermColor::Yellow,
        Color::LightBlue => TermColor::Blue,
        Color::LightMagenta => TermColor::Magenta,
        Color::LightCyan => TermColor::Cyan,
        Color::White => TermColor::White,
        Color::Rgb(r, g, b) => TermColor::Rgb { r, g, b },
        Color::Indexed(index) => TermColor::AnsiValue(index),
    })
}
