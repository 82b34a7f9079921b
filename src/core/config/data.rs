use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_TOP_K: u32 = 3;

#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct Config {
    /// Backend origin, e.g. "http://localhost:8000"
    pub base_url: Option<String>,
    /// Number of retrieved chunks requested per question
    pub top_k: Option<u32>,
    /// Analysis operations forwarded with every question
    pub ops: Option<Vec<String>>,
    /// Use `/chat/stream` (true) or the one-shot `/chat` endpoint
    pub streaming: Option<bool>,
    /// Render images in answers as image items rather than literal text
    pub rich_images: Option<bool>,
    /// Strip image markup and links from the live typing text
    pub sanitize_stream: Option<bool>,
}

/// A configuration key settable from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    BaseUrl,
    TopK,
    Ops,
    Streaming,
    RichImages,
    SanitizeStream,
}

impl ConfigKey {
    pub const ALL: [ConfigKey; 6] = [
        ConfigKey::BaseUrl,
        ConfigKey::TopK,
        ConfigKey::Ops,
        ConfigKey::Streaming,
        ConfigKey::RichImages,
        ConfigKey::SanitizeStream,
    ];

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|key| key.as_str().eq_ignore_ascii_case(name))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ConfigKey::BaseUrl => "base-url",
            ConfigKey::TopK => "top-k",
            ConfigKey::Ops => "ops",
            ConfigKey::Streaming => "streaming",
            ConfigKey::RichImages => "rich-images",
            ConfigKey::SanitizeStream => "sanitize-stream",
        }
    }
}

impl Config {
    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn top_k(&self) -> u32 {
        self.top_k.unwrap_or(DEFAULT_TOP_K)
    }

    pub fn ops(&self) -> Option<Vec<String>> {
        self.ops.clone().filter(|ops| !ops.is_empty())
    }

    pub fn streaming(&self) -> bool {
        self.streaming.unwrap_or(true)
    }

    pub fn rich_images(&self) -> bool {
        self.rich_images.unwrap_or(true)
    }

    pub fn sanitize_stream(&self) -> bool {
        self.sanitize_stream.unwrap_or(true)
    }

    /// Applies `starchat set <key> <value>`.
    pub fn set_value(&mut self, key: ConfigKey, value: &str) -> Result<(), String> {
        let value = value.trim();
        match key {
            ConfigKey::BaseUrl => {
                if !(value.starts_with("http://") || value.starts_with("https://")) {
                    return Err(format!("base-url must start with http:// or https://: {value}"));
                }
                self.base_url = Some(value.to_string());
            }
            ConfigKey::TopK => {
                let top_k = value
                    .parse::<u32>()
                    .ok()
                    .filter(|top_k| *top_k > 0)
                    .ok_or_else(|| format!("top-k must be a positive integer: {value}"))?;
                self.top_k = Some(top_k);
            }
            ConfigKey::Ops => {
                let ops: Vec<String> = value
                    .split(',')
                    .map(str::trim)
                    .filter(|op| !op.is_empty())
                    .map(str::to_string)
                    .collect();
                self.ops = (!ops.is_empty()).then_some(ops);
            }
            ConfigKey::Streaming => self.streaming = Some(parse_bool(key, value)?),
            ConfigKey::RichImages => self.rich_images = Some(parse_bool(key, value)?),
            ConfigKey::SanitizeStream => self.sanitize_stream = Some(parse_bool(key, value)?),
        }
        Ok(())
    }

    pub fn unset_value(&mut self, key: ConfigKey) {
        match key {
            ConfigKey::BaseUrl => self.base_url = None,
            ConfigKey::TopK => self.top_k = None,
            ConfigKey::Ops => self.ops = None,
            ConfigKey::Streaming => self.streaming = None,
            ConfigKey::RichImages => self.rich_images = None,
            ConfigKey::SanitizeStream => self.sanitize_stream = None,
        }
    }

    pub fn display_value(&self, key: ConfigKey) -> String {
        match key {
            ConfigKey::BaseUrl => self.base_url().to_string(),
            ConfigKey::TopK => self.top_k().to_string(),
            ConfigKey::Ops => self
                .ops()
                .map(|ops| ops.join(","))
                .unwrap_or_else(|| "(backend default)".to_string()),
            ConfigKey::Streaming => self.streaming().to_string(),
            ConfigKey::RichImages => self.rich_images().to_string(),
            ConfigKey::SanitizeStream => self.sanitize_stream().to_string(),
        }
    }

    pub fn print_all(&self) {
        println!("starchat configuration:");
        for key in ConfigKey::ALL {
            println!("  {:<16} {}", key.as_str(), self.display_value(key));
        }
    }
}

fn parse_bool(key: ConfigKey, value: &str) -> Result<bool, String> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Ok(true),
        "false" | "off" | "no" | "0" => Ok(false),
        _ => Err(format!("{} expects on/off, got: {value}", key.as_str())),
    }
}

/// Get a user-friendly display string for a path
/// Converts absolute paths to use ~ notation on Unix-like systems when possible
pub fn path_display<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();

    #[cfg(unix)]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let home_path = PathBuf::from(home);
            if let Ok(relative) = path.strip_prefix(&home_path) {
                return format!("~/{}", relative.display());
            }
        }
    }

    path.display().to_string()
}
