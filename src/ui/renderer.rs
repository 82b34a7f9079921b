use ratatui::text::{Line, Span};

use crate::api::StructuredResponse;
use crate::core::rich_text::{parse_rich_content, RichSegment};
use crate::core::transcript::{EntryContent, EntryRole, TranscriptEntry};
use crate::ui::summary::{summarize, SummaryImage, SummarySection, SUMMARY_TITLE};
use crate::ui::theme::Theme;
use crate::utils::url::resolve_display_url;

pub const USER_PREFIX: &str = "You: ";
pub const LIST_MARKER: &str = "  • ";
pub const IMAGE_MARKER: &str = "[image] ";
const INDENT: &str = "  ";

#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Render images found in answers as image lines instead of literal text.
    pub rich_images: bool,
    /// Backend origin used to turn `/imagery/..` paths into openable links.
    pub base_url: String,
}

impl RenderConfig {
    pub fn new(rich_images: bool, base_url: impl Into<String>) -> Self {
        Self {
            rich_images,
            base_url: base_url.into(),
        }
    }
}

pub fn render_entry(
    entry: &TranscriptEntry,
    theme: &Theme,
    config: &RenderConfig,
) -> Vec<Line<'static>> {
    match &entry.content {
        EntryContent::Text(text) => render_text(entry.role, text, theme),
        EntryContent::Image { src, caption } => {
            let mut lines = vec![image_line(
                "",
                &SummaryImage {
                    alt: "uploaded-image".to_string(),
                    src: src.clone(),
                },
                theme,
                config,
            )];
            if !caption.is_empty() {
                lines.push(Line::from(Span::styled(
                    format!("{INDENT}{caption}"),
                    theme.detail_style,
                )));
            }
            if entry.role == EntryRole::User {
                lines[0].spans.insert(0, Span::styled(USER_PREFIX, theme.user_prefix_style));
            }
            lines
        }
        EntryContent::Structured(response) => render_structured(response, theme, config),
    }
}

pub fn render_text(role: EntryRole, text: &str, theme: &Theme) -> Vec<Line<'static>> {
    match role {
        EntryRole::User => {
            let mut lines = Vec::new();
            for (index, content_line) in text.split('\n').enumerate() {
                let prefix = if index == 0 { USER_PREFIX } else { "     " };
                lines.push(Line::from(vec![
                    Span::styled(prefix, theme.user_prefix_style),
                    Span::styled(content_line.to_string(), theme.user_text_style),
                ]));
            }
            lines
        }
        EntryRole::Bot => text
            .split('\n')
            .map(|content_line| {
                Line::from(Span::styled(content_line.to_string(), theme.bot_text_style))
            })
            .collect(),
    }
}

/// The live typing placeholder.
pub fn render_typing(text: &str, theme: &Theme) -> Vec<Line<'static>> {
    if text.is_empty() {
        return vec![Line::from(Span::styled("…", theme.typing_style))];
    }
    text.split('\n')
        .map(|content_line| Line::from(Span::styled(content_line.to_string(), theme.typing_style)))
        .collect()
}

pub fn render_progress(text: &str, theme: &Theme) -> Line<'static> {
    Line::from(Span::styled(format!("… {text}"), theme.progress_style))
}

pub fn render_structured(
    response: &StructuredResponse,
    theme: &Theme,
    config: &RenderConfig,
) -> Vec<Line<'static>> {
    let mut lines = vec![Line::from(Span::styled(
        SUMMARY_TITLE,
        theme.summary_title_style,
    ))];

    lines.push(Line::from(Span::styled("Answer", theme.section_title_style)));
    lines.extend(render_answer(&response.answer, theme, config));

    let summary = summarize(response);
    for section in summary.sections() {
        lines.extend(render_section(section, theme, config));
    }
    lines
}

/// Answer text with inline images. In plain mode the text is shown verbatim.
pub fn render_answer(answer: &str, theme: &Theme, config: &RenderConfig) -> Vec<Line<'static>> {
    let indented = |text: &str| {
        Line::from(vec![
            Span::raw(INDENT),
            Span::styled(text.to_string(), theme.bot_text_style),
        ])
    };

    if !config.rich_images {
        return answer.split('\n').map(indented).collect();
    }

    let mut lines = Vec::new();
    let mut current = String::new();
    for segment in parse_rich_content(answer) {
        match segment {
            RichSegment::Text(text) => {
                let mut parts = text.split('\n');
                if let Some(first) = parts.next() {
                    current.push_str(first);
                }
                for part in parts {
                    lines.push(indented(&current));
                    current = part.to_string();
                }
            }
            RichSegment::Image { alt, src, .. } => {
                if !current.trim().is_empty() {
                    lines.push(indented(current.trim_end()));
                }
                current.clear();
                lines.push(image_line(INDENT, &SummaryImage { alt, src }, theme, config));
            }
        }
    }
    if !current.trim().is_empty() || lines.is_empty() {
        lines.push(indented(current.trim_start()));
    }
    lines
}

fn render_section(
    section: &SummarySection,
    theme: &Theme,
    config: &RenderConfig,
) -> Vec<Line<'static>> {
    let mut lines = vec![Line::from(Span::styled(
        section.title,
        theme.section_title_style,
    ))];
    for detail in &section.details {
        lines.push(Line::from(Span::styled(
            format!("{INDENT}{detail}"),
            theme.detail_style,
        )));
    }
    if let Some(error) = &section.error {
        lines.push(Line::from(Span::styled(
            format!("{INDENT}{error}"),
            theme.error_style,
        )));
    }
    for item in &section.items {
        lines.push(Line::from(vec![
            Span::styled(LIST_MARKER, theme.list_marker_style),
            Span::styled(item.text.clone(), theme.bot_text_style),
        ]));
        if let Some(image) = &item.image {
            if config.rich_images {
                lines.push(image_line("      ", image, theme, config));
            }
        }
    }
    lines
}

fn image_line(
    indent: &str,
    image: &SummaryImage,
    theme: &Theme,
    config: &RenderConfig,
) -> Line<'static> {
    Line::from(vec![
        Span::raw(indent.to_string()),
        Span::styled(IMAGE_MARKER, theme.image_style),
        Span::styled(format!("{} ", image.alt), theme.detail_style),
        Span::styled(
            resolve_display_url(&config.base_url, &image.src),
            theme.image_style,
        ),
    ])
}

/// Unstyled text of a line, as written to logs and piped output.
pub fn line_text(line: &Line<'_>) -> String {
    line.spans
        .iter()
        .map(|span| span.content.as_ref())
        .collect()
}
