use crate::api::StructuredResponse;
use crate::core::rich_text::sanitize_display_text;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryRole {
    User,
    Bot,
}

impl EntryRole {
    pub fn as_str(self) -> &'static str {
        match self {
            EntryRole::User => "user",
            EntryRole::Bot => "bot",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    Text,
    Image,
    Structured,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EntryContent {
    Text(String),
    Image { src: String, caption: String },
    Structured(Box<StructuredResponse>),
}

/// One rendered unit of the conversation.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptEntry {
    pub role: EntryRole,
    pub content: EntryContent,
}

impl TranscriptEntry {
    pub fn text(role: EntryRole, text: impl Into<String>) -> Self {
        Self {
            role,
            content: EntryContent::Text(text.into()),
        }
    }

    pub fn kind(&self) -> EntryKind {
        match self.content {
            EntryContent::Text(_) => EntryKind::Text,
            EntryContent::Image { .. } => EntryKind::Image,
            EntryContent::Structured(_) => EntryKind::Structured,
        }
    }
}

/// The live bubble that collects `answer_chunk` text until the stream ends.
#[derive(Debug, Default, Clone)]
struct TypingPlaceholder {
    raw: String,
}

/// Conversation state shown to the user: committed entries, at most one live
/// typing placeholder, and the progress indicator.
#[derive(Debug, Clone)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
    typing: Option<TypingPlaceholder>,
    progress: Option<String>,
    sanitize_stream: bool,
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Transcript {
    pub fn new(sanitize_stream: bool) -> Self {
        Self {
            entries: Vec::new(),
            typing: None,
            progress: None,
            sanitize_stream,
        }
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&TranscriptEntry> {
        self.entries.last()
    }

    pub fn push(&mut self, entry: TranscriptEntry) -> &TranscriptEntry {
        self.entries.push(entry);
        &self.entries[self.entries.len() - 1]
    }

    pub fn push_text(&mut self, role: EntryRole, text: impl Into<String>) -> &TranscriptEntry {
        self.push(TranscriptEntry::text(role, text))
    }

    pub fn push_image(
        &mut self,
        role: EntryRole,
        src: impl Into<String>,
        caption: impl Into<String>,
    ) -> &TranscriptEntry {
        self.push(TranscriptEntry {
            role,
            content: EntryContent::Image {
                src: src.into(),
                caption: caption.into(),
            },
        })
    }

    pub fn push_structured(&mut self, response: StructuredResponse) -> &TranscriptEntry {
        self.push(TranscriptEntry {
            role: EntryRole::Bot,
            content: EntryContent::Structured(Box::new(response)),
        })
    }

    /// Opens the typing placeholder. Does nothing when one is already open.
    pub fn start_typing(&mut self) {
        if self.typing.is_none() {
            self.typing = Some(TypingPlaceholder::default());
        }
    }

    /// Appends streamed answer text, opening the placeholder if needed.
    pub fn append_typing(&mut self, chunk: &str) {
        self.typing
            .get_or_insert_with(TypingPlaceholder::default)
            .raw
            .push_str(chunk);
    }

    /// Removes the typing placeholder. Returns whether one was open.
    pub fn end_typing(&mut self) -> bool {
        self.typing.take().is_some()
    }

    pub fn is_typing(&self) -> bool {
        self.typing.is_some()
    }

    /// Text currently shown in the typing placeholder.
    pub fn typing_text(&self) -> Option<String> {
        let typing = self.typing.as_ref()?;
        Some(if self.sanitize_stream {
            sanitize_display_text(&typing.raw)
        } else {
            typing.raw.clone()
        })
    }

    /// Everything streamed so far, before display sanitization.
    pub fn typing_raw(&self) -> Option<&str> {
        self.typing.as_ref().map(|typing| typing.raw.as_str())
    }

    pub fn set_progress(&mut self, text: impl Into<String>) {
        self.progress = Some(text.into());
    }

    pub fn progress(&self) -> Option<&str> {
        self.progress.as_deref()
    }
}
