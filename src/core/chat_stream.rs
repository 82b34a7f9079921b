use futures_util::StreamExt;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::api::backend::{fetch_answer, open_chat_stream, BackendError};
use crate::api::{ChatEvent, ChatRequest, StatusEvent, StructuredResponse};
use crate::core::ndjson::NdjsonDecoder;

pub const MISSING_BODY_MESSAGE: &str = "stream body is missing";

#[derive(Clone, Debug, PartialEq)]
pub enum StreamMessage {
    Status(StatusEvent),
    AnswerStart,
    AnswerChunk(String),
    Final(Box<StructuredResponse>),
    /// Reason the request failed, without any prefix.
    Error(String),
    End,
}

pub struct StreamParams {
    pub client: reqwest::Client,
    pub base_url: String,
    pub user_id: String,
    pub request: ChatRequest,
    /// `/chat/stream` when true, one-shot `/chat` otherwise.
    pub streaming: bool,
    pub cancel_token: tokio_util::sync::CancellationToken,
    pub stream_id: u64,
}

type Sender = mpsc::UnboundedSender<(StreamMessage, u64)>;

#[derive(Clone)]
pub struct ChatStreamService {
    tx: Sender,
}

impl ChatStreamService {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(StreamMessage, u64)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Runs one chat request in the background. Every request ends with
    /// exactly one [`StreamMessage::End`] unless it is cancelled first.
    pub fn spawn_stream(&self, params: StreamParams) {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let cancel_token = params.cancel_token.clone();
            let stream_id = params.stream_id;
            tokio::select! {
                _ = run_request(params, &tx) => {
                    let _ = tx.send((StreamMessage::End, stream_id));
                }
                _ = cancel_token.cancelled() => {
                    debug!(stream_id, "chat stream cancelled");
                }
            }
        });
    }

    #[cfg(test)]
    pub fn send_for_test(&self, message: StreamMessage, stream_id: u64) {
        let _ = self.tx.send((message, stream_id));
    }
}

async fn run_request(params: StreamParams, tx: &Sender) {
    let StreamParams {
        client,
        base_url,
        user_id,
        request,
        streaming,
        stream_id,
        ..
    } = params;
    let send = |message: StreamMessage| {
        let _ = tx.send((message, stream_id));
    };

    if !streaming {
        match fetch_answer(&client, &base_url, &user_id, &request).await {
            Ok(response) => send(StreamMessage::Final(Box::new(response))),
            Err(err) => send(StreamMessage::Error(err.to_string())),
        }
        return;
    }

    let response = match open_chat_stream(&client, &base_url, &user_id, &request).await {
        Ok(response) => response,
        Err(err) => {
            send(StreamMessage::Error(err.to_string()));
            return;
        }
    };

    let mut stream = response.bytes_stream();
    let mut decoder = NdjsonDecoder::new();

    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(stream_id, error = %err, "chat stream interrupted");
                send(StreamMessage::Error(BackendError::Connect(err).to_string()));
                return;
            }
        };

        for event in decoder.push(&chunk) {
            if forward_event(event, &send) {
                return;
            }
        }
    }

    if decoder.bytes_seen() == 0 {
        send(StreamMessage::Error(MISSING_BODY_MESSAGE.to_string()));
        return;
    }

    if let Some(event) = decoder.finish() {
        forward_event(event, &send);
    }
}

/// Converts one decoded line into a stream message. Returns true when the
/// stream is finished: a `final` event arrived or the line was malformed.
fn forward_event<F>(event: Result<ChatEvent, crate::core::ndjson::DecodeError>, send: &F) -> bool
where
    F: Fn(StreamMessage),
{
    match event {
        Ok(ChatEvent::Status(status)) => {
            debug!(stage = %status.stage, "status event");
            send(StreamMessage::Status(status));
            false
        }
        Ok(ChatEvent::AnswerStart) => {
            send(StreamMessage::AnswerStart);
            false
        }
        Ok(ChatEvent::AnswerChunk { text }) => {
            send(StreamMessage::AnswerChunk(text));
            false
        }
        Ok(ChatEvent::Final { data }) => {
            send(StreamMessage::Final(Box::new(data)));
            true
        }
        Ok(ChatEvent::Unknown) => false,
        Err(err) => {
            warn!(error = %err, "dropping malformed chat stream");
            send(StreamMessage::Error(err.to_string()));
            true
        }
    }
}
