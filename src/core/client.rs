//! The chat client proper: submits a question, follows the event stream and
//! keeps the transcript current while it does.

use std::path::Path;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::api::backend::upload_image;
use crate::api::{ChatRequest, StructuredResponse};
use crate::core::chat_stream::{ChatStreamService, StreamMessage, StreamParams};
use crate::core::config::Config;
use crate::core::rich_text::resolve_renderable_image_src;
use crate::core::session::Session;
use crate::core::status::{
    progress_text, STATUS_DONE, STATUS_FAILED, STATUS_NO_RESPONSE, STATUS_SENDING,
};
use crate::core::transcript::{EntryRole, Transcript, TranscriptEntry};

pub const EMPTY_INPUT_MESSAGE: &str = "Please enter a question or attach an image.";
pub const IMAGE_ONLY_QUESTION: &str = "(no question, image analysis request)";
pub const EMPTY_STREAM_MESSAGE: &str = "The streaming response was empty.";
pub const REQUEST_FAILED_PREFIX: &str = "Request failed: ";

/// Receives transcript changes as they happen so a frontend can redraw only
/// what changed.
pub trait TranscriptView {
    fn entry_added(&mut self, entry: &TranscriptEntry);
    /// `None` once the typing placeholder has been removed.
    fn typing_changed(&mut self, text: Option<&str>);
    fn progress_changed(&mut self, text: &str);
}

/// A view that ignores every update.
pub struct NullView;

impl TranscriptView for NullView {
    fn entry_added(&mut self, _entry: &TranscriptEntry) {}
    fn typing_changed(&mut self, _text: Option<&str>) {}
    fn progress_changed(&mut self, _text: &str) {}
}

/// Request settings taken from configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatOptions {
    pub base_url: String,
    pub top_k: u32,
    pub ops: Option<Vec<String>>,
    pub streaming: bool,
    pub sanitize_stream: bool,
}

impl ChatOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            base_url: config.base_url().to_string(),
            top_k: config.top_k(),
            ops: config.ops(),
            streaming: config.streaming(),
            sanitize_stream: config.sanitize_stream(),
        }
    }
}

/// How a submission ended.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Nothing to send.
    Rejected,
    Answered,
    Empty,
    Failed(String),
}

/// Per-stream bookkeeping while a request is in flight.
#[derive(Default)]
struct InFlight {
    final_response: Option<StructuredResponse>,
    error: Option<String>,
}

pub struct StreamingChatClient {
    http: reqwest::Client,
    session: Session,
    options: ChatOptions,
    transcript: Transcript,
    stream_service: ChatStreamService,
    rx: mpsc::UnboundedReceiver<(StreamMessage, u64)>,
    current_stream_id: u64,
    cancel_token: Option<CancellationToken>,
    in_flight: InFlight,
}

impl StreamingChatClient {
    pub fn new(http: reqwest::Client, session: Session, options: ChatOptions) -> Self {
        let (stream_service, rx) = ChatStreamService::new();
        Self {
            http,
            session,
            transcript: Transcript::new(options.sanitize_stream),
            options,
            stream_service,
            rx,
            current_stream_id: 0,
            cancel_token: None,
            in_flight: InFlight::default(),
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn options(&self) -> &ChatOptions {
        &self.options
    }

    /// Sends one question (and optionally an image) and follows the response
    /// until it ends. Failures never escape: they are rendered as a bot
    /// message and reported through the outcome.
    pub async fn submit<V: TranscriptView>(
        &mut self,
        question: &str,
        image: Option<&Path>,
        view: &mut V,
    ) -> SubmitOutcome {
        let question = question.trim();
        if question.is_empty() && image.is_none() {
            view.entry_added(self.transcript.push_text(EntryRole::Bot, EMPTY_INPUT_MESSAGE));
            return SubmitOutcome::Rejected;
        }

        self.set_progress(STATUS_SENDING, view);

        let mut image_uri = None;
        if let Some(path) = image {
            match upload_image(&self.http, &self.options.base_url, self.session.user_id(), path)
                .await
            {
                Ok(uploaded) => {
                    if !uploaded.preview_url.is_empty() {
                        let caption = path
                            .file_name()
                            .map(|name| name.to_string_lossy().into_owned())
                            .unwrap_or_else(|| "uploaded image".to_string());
                        let src = resolve_renderable_image_src(&uploaded.preview_url);
                        view.entry_added(self.transcript.push_image(EntryRole::User, src, caption));
                    }
                    image_uri = Some(uploaded.image_uri).filter(|uri| !uri.is_empty());
                }
                Err(err) => return self.fail(err.to_string(), view),
            }
        }

        let shown_question = if question.is_empty() {
            IMAGE_ONLY_QUESTION
        } else {
            question
        };
        view.entry_added(self.transcript.push_text(EntryRole::User, shown_question));

        let request = ChatRequest {
            question: question.to_string(),
            top_k: self.options.top_k,
            image_uri,
            ops: self.options.ops.clone(),
        };
        let stream_id = self.start_stream(request);

        // The client owns the sending half, so the channel stays open until
        // the stream reports its end.
        while let Some((message, id)) = self.rx.recv().await {
            if id != stream_id {
                debug!(id, current = stream_id, "ignoring message from stale stream");
                continue;
            }
            if self.apply_stream_message(message, view) {
                break;
            }
        }

        self.finish_stream(view)
    }

    fn start_stream(&mut self, request: ChatRequest) -> u64 {
        self.cancel_current_stream();
        self.current_stream_id += 1;
        self.in_flight = InFlight::default();

        let cancel_token = CancellationToken::new();
        self.cancel_token = Some(cancel_token.clone());

        self.stream_service.spawn_stream(StreamParams {
            client: self.http.clone(),
            base_url: self.options.base_url.clone(),
            user_id: self.session.user_id().to_string(),
            request,
            streaming: self.options.streaming,
            cancel_token,
            stream_id: self.current_stream_id,
        });
        self.current_stream_id
    }

    /// Abandons the request in flight, if any.
    pub fn cancel_current_stream(&mut self) {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }
    }

    /// Applies one message of the current stream to the transcript. Returns
    /// true once the stream has ended.
    pub fn apply_stream_message<V: TranscriptView>(
        &mut self,
        message: StreamMessage,
        view: &mut V,
    ) -> bool {
        match message {
            StreamMessage::Status(status) => {
                self.set_progress(&progress_text(&status), view);
            }
            StreamMessage::AnswerStart => {
                if !self.transcript.is_typing() {
                    self.transcript.start_typing();
                    view.typing_changed(self.transcript.typing_text().as_deref());
                }
            }
            StreamMessage::AnswerChunk(text) => {
                self.transcript.append_typing(&text);
                view.typing_changed(self.transcript.typing_text().as_deref());
            }
            StreamMessage::Final(response) => {
                self.in_flight.final_response = Some(*response);
            }
            StreamMessage::Error(reason) => {
                self.in_flight.error = Some(reason);
            }
            StreamMessage::End => return true,
        }
        false
    }

    /// Replaces the typing placeholder with the outcome of the stream.
    pub fn finish_stream<V: TranscriptView>(&mut self, view: &mut V) -> SubmitOutcome {
        self.cancel_token = None;
        let in_flight = std::mem::take(&mut self.in_flight);

        if self.transcript.end_typing() {
            view.typing_changed(None);
        }

        if let Some(reason) = in_flight.error {
            return self.fail(reason, view);
        }

        match in_flight.final_response {
            Some(response) => {
                view.entry_added(self.transcript.push_structured(response));
                self.set_progress(STATUS_DONE, view);
                SubmitOutcome::Answered
            }
            None => {
                view.entry_added(self.transcript.push_text(EntryRole::Bot, EMPTY_STREAM_MESSAGE));
                self.set_progress(STATUS_NO_RESPONSE, view);
                SubmitOutcome::Empty
            }
        }
    }

    fn fail<V: TranscriptView>(&mut self, reason: String, view: &mut V) -> SubmitOutcome {
        if self.transcript.end_typing() {
            view.typing_changed(None);
        }
        let message = format!("{REQUEST_FAILED_PREFIX}{reason}");
        view.entry_added(self.transcript.push_text(EntryRole::Bot, message));
        self.set_progress(STATUS_FAILED, view);
        SubmitOutcome::Failed(reason)
    }

    fn set_progress<V: TranscriptView>(&mut self, text: &str, view: &mut V) {
        self.transcript.set_progress(text);
        view.progress_changed(text);
    }

    #[cfg(test)]
    pub(crate) fn stream_service(&self) -> &ChatStreamService {
        &self.stream_service
    }
}
