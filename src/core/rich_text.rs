//! Answer text helpers: display sanitization while streaming and splitting a
//! finished answer into text and inline image segments.

use std::sync::LazyLock;

use regex::Regex;

static MARKDOWN_IMAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!\[[^\]]*]\([^)]+\)").expect("valid markdown image pattern"));

static RAW_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://[^\s)]+").expect("valid url pattern"));

static IMAGE_EXTENSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\.(png|jpe?g|gif|webp|bmp|tiff?)(\?.*)?$").expect("valid extension pattern")
});

/// Markdown images, or bare absolute URLs / rooted paths / imagery paths.
static RICH_CANDIDATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"!\[([^\]]*)]\(([^)\s]+)\)|(https?://[^\s)]+|/[^\s)]+|data/imagery/[^\s)]+)")
        .expect("valid rich content pattern")
});

const IMAGERY_DATA_PREFIX: &str = "data/imagery/";
const IMAGERY_PREFIX: &str = "imagery/";

pub fn strip_markdown_images(text: &str) -> String {
    MARKDOWN_IMAGE.replace_all(text, "").trim().to_string()
}

pub fn strip_urls(text: &str) -> String {
    RAW_URL.replace_all(text, "").trim().to_string()
}

/// Text shown in the live typing placeholder: image markup and links are
/// dropped because they are only rendered once the final response arrives.
pub fn sanitize_display_text(text: &str) -> String {
    strip_urls(&strip_markdown_images(text))
}

/// Maps backend storage paths onto the public `/imagery/` route.
pub fn normalize_image_url(url: &str) -> String {
    if let Some(rest) = url.strip_prefix(IMAGERY_DATA_PREFIX) {
        return format!("/imagery/{rest}");
    }
    if url.starts_with(IMAGERY_PREFIX) {
        return format!("/{url}");
    }
    url.to_string()
}

pub fn is_image_url(url: &str) -> bool {
    IMAGE_EXTENSION.is_match(url) || url.starts_with("/imagery/")
}

pub fn resolve_renderable_image_src(src: &str) -> String {
    normalize_image_url(src.trim())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RichSegment {
    Text(String),
    Image {
        alt: String,
        /// Normalized source, still relative when the backend sent a path.
        src: String,
        /// Exactly what appeared in the answer, for fallback captions.
        raw: String,
    },
}

/// Splits an answer into literal text and inline images.
///
/// A markdown image or URL becomes an image segment only when its normalized
/// target looks like an image; anything else is kept verbatim as text.
pub fn parse_rich_content(text: &str) -> Vec<RichSegment> {
    let mut segments = Vec::new();
    let mut cursor = 0;

    for caps in RICH_CANDIDATE.captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        if whole.start() > cursor {
            push_text(&mut segments, &text[cursor..whole.start()]);
        }

        let raw_target = caps
            .get(2)
            .or_else(|| caps.get(3))
            .map(|m| m.as_str())
            .unwrap_or_default();
        let candidate = resolve_renderable_image_src(raw_target);
        if !candidate.is_empty() && is_image_url(&candidate) {
            let alt = caps
                .get(1)
                .map(|m| m.as_str())
                .filter(|alt| !alt.is_empty())
                .unwrap_or("response-image");
            segments.push(RichSegment::Image {
                alt: alt.to_string(),
                src: candidate,
                raw: raw_target.to_string(),
            });
        } else {
            push_text(&mut segments, whole.as_str());
        }
        cursor = whole.end();
    }

    if cursor < text.len() {
        push_text(&mut segments, &text[cursor..]);
    }
    segments
}

fn push_text(segments: &mut Vec<RichSegment>, text: &str) {
    if let Some(RichSegment::Text(previous)) = segments.last_mut() {
        previous.push_str(text);
    } else {
        segments.push(RichSegment::Text(text.to_string()));
    }
}
