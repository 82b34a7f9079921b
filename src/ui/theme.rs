use ratatui::style::{Color, Modifier, Style};

#[derive(Debug, Clone)]
pub struct Theme {
    // Transcript text
    pub user_prefix_style: Style,
    pub user_text_style: Style,
    pub bot_text_style: Style,

    // Structured response block
    pub summary_title_style: Style,
    pub section_title_style: Style,
    pub detail_style: Style,
    pub list_marker_style: Style,
    pub error_style: Style,
    pub image_style: Style,

    // Live region
    pub typing_style: Style,
    pub progress_style: Style,
}

impl Theme {
    pub fn dark_default() -> Self {
        Theme {
            user_prefix_style: Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
            user_text_style: Style::default().fg(Color::Cyan),
            bot_text_style: Style::default().fg(Color::White),

            summary_title_style: Style::default()
                .fg(Color::LightBlue)
                .add_modifier(Modifier::BOLD),
            section_title_style: Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
            detail_style: Style::default().fg(Color::Gray),
            list_marker_style: Style::default().fg(Color::LightBlue),
            error_style: Style::default().fg(Color::LightRed),
            image_style: Style::default()
                .fg(Color::LightMagenta)
                .add_modifier(Modifier::UNDERLINED),

            typing_style: Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::ITALIC),
            progress_style: Style::default().fg(Color::DarkGray),
        }
    }

    /// No colors or modifiers at all, for piped output.
    pub fn monochrome() -> Self {
        let plain = Style::default();
        Theme {
            user_prefix_style: plain,
            user_text_style: plain,
            bot_text_style: plain,
            summary_title_style: plain,
            section_title_style: plain,
            detail_style: plain,
            list_marker_style: plain,
            error_style: plain,
            image_style: plain,
            typing_style: plain,
            progress_style: plain,
        }
    }
}
