//! End-to-end submissions against a mock backend.

use std::io::Write;

use serde_json::json;
use starchat::core::client::{
    ChatOptions, StreamingChatClient, SubmitOutcome, TranscriptView, EMPTY_STREAM_MESSAGE,
    IMAGE_ONLY_QUESTION,
};
use starchat::core::session::Session;
use starchat::core::transcript::{EntryContent, EntryKind, EntryRole, TranscriptEntry};
use tempfile::NamedTempFile;
use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Default)]
struct RecordingView {
    entries: Vec<TranscriptEntry>,
    typing: Vec<Option<String>>,
    progress: Vec<String>,
}

impl TranscriptView for RecordingView {
    fn entry_added(&mut self, entry: &TranscriptEntry) {
        self.entries.push(entry.clone());
    }

    fn typing_changed(&mut self, text: Option<&str>) {
        self.typing.push(text.map(str::to_string));
    }

    fn progress_changed(&mut self, text: &str) {
        self.progress.push(text.to_string());
    }
}

fn client(base_url: &str, streaming: bool) -> StreamingChatClient {
    StreamingChatClient::new(
        reqwest::Client::new(),
        Session::new("alice"),
        ChatOptions {
            base_url: base_url.to_string(),
            top_k: 3,
            ops: None,
            streaming,
            sanitize_stream: true,
        },
    )
}

fn ndjson(lines: &[serde_json::Value]) -> String {
    lines
        .iter()
        .map(|line| format!("{line}\n"))
        .collect::<String>()
}

fn final_event() -> serde_json::Value {
    json!({
        "type": "final",
        "data": {
            "answer": "Two craters.",
            "trace": {"tools": ["route.rag:true", "route.mcp:false"], "latency_ms": 42},
            "citations": [
                {"doc_id": "moon.md", "chunk_id": "c1", "snippet": "...", "score": 0.9},
                {"doc_id": "mars.md", "chunk_id": "c2", "snippet": "...", "score": 0.4}
            ],
            "analysis": {"invoked": false, "ops": []}
        }
    })
}

fn last_text(client: &StreamingChatClient) -> String {
    match &client.transcript().last().expect("transcript entry").content {
        EntryContent::Text(text) => text.clone(),
        other => panic!("expected a text entry, got {other:?}"),
    }
}

fn image_file() -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".png")
        .tempfile()
        .expect("temp file");
    file.write_all(b"\x89PNG\r\n\x1a\nfake").expect("write image");
    file
}

#[tokio::test]
async fn streamed_answer_ends_in_structured_entry() {
    let server = MockServer::start().await;
    let body = ndjson(&[
        json!({"type": "status", "stage": "route"}),
        json!({"type": "status", "stage": "rag", "used": true, "hits": 2}),
        json!({"type": "answer_start"}),
        json!({"type": "answer_chunk", "text": "Two "}),
        json!({"type": "heartbeat"}),
        json!({"type": "answer_chunk", "text": "craters."}),
        final_event(),
    ]);

    Mock::given(method("POST"))
        .and(path("/chat/stream"))
        .and(header("x-user-id", "alice"))
        .and(body_partial_json(json!({"question": "how many craters?", "top_k": 3})))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/x-ndjson"))
        .expect(1)
        .mount(&server)
        .await;

    let mut client = client(&server.uri(), true);
    let mut view = RecordingView::default();
    let outcome = client.submit("how many craters?", None, &mut view).await;

    assert_eq!(outcome, SubmitOutcome::Answered);
    let kinds: Vec<EntryKind> = client.transcript().entries().iter().map(|e| e.kind()).collect();
    assert_eq!(kinds, vec![EntryKind::Text, EntryKind::Structured]);
    assert_eq!(
        client.transcript().entries()[0],
        TranscriptEntry::text(EntryRole::User, "how many craters?")
    );
    match &client.transcript().entries()[1].content {
        EntryContent::Structured(response) => {
            assert_eq!(response.answer, "Two craters.");
            assert_eq!(response.citations.len(), 2);
        }
        other => panic!("expected structured entry, got {other:?}"),
    }

    assert_eq!(
        view.progress,
        vec![
            "Sending request",
            "Deciding tool usage",
            "RAG search complete (hits 2)",
            "Done"
        ]
    );
    assert_eq!(view.typing.first(), Some(&Some(String::new())));
    assert!(view.typing.contains(&Some("Two craters.".to_string())));
    assert_eq!(view.typing.last(), Some(&None));
    assert!(!client.transcript().is_typing());
}

#[tokio::test]
async fn upload_error_detail_is_shown_verbatim() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload-image"))
        .and(header("x-user-id", "alice"))
        .respond_with(
            ResponseTemplate::new(413).set_body_json(json!({"detail": "file too large (max 5 MB)"})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/stream"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let image = image_file();
    let mut client = client(&server.uri(), true);
    let mut view = RecordingView::default();
    let outcome = client
        .submit("what is this?", Some(image.path()), &mut view)
        .await;

    assert_eq!(
        outcome,
        SubmitOutcome::Failed("file too large (max 5 MB)".into())
    );
    assert_eq!(client.transcript().len(), 1);
    assert_eq!(last_text(&client), "Request failed: file too large (max 5 MB)");
    assert_eq!(view.progress.last().map(String::as_str), Some("Failed"));
}

#[tokio::test]
async fn upload_error_without_detail_uses_fallback() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload-image"))
        .respond_with(ResponseTemplate::new(500).set_body_string("oops"))
        .mount(&server)
        .await;

    let image = image_file();
    let mut client = client(&server.uri(), true);
    let outcome = client
        .submit("", Some(image.path()), &mut RecordingView::default())
        .await;

    assert_eq!(outcome, SubmitOutcome::Failed("image upload failed".into()));
    assert_eq!(last_text(&client), "Request failed: image upload failed");
}

#[tokio::test]
async fn image_only_question_sends_uploaded_uri() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload-image"))
        .and(body_string_contains("name=\"file\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "image_uri": "data/uploads/alice/u1.png",
            "preview_url": "data/imagery/u1.png"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/stream"))
        .and(body_partial_json(json!({"image_uri": "data/uploads/alice/u1.png"})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(ndjson(&[final_event()]), "application/x-ndjson"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let image = image_file();
    let mut client = client(&server.uri(), true);
    let outcome = client
        .submit("  ", Some(image.path()), &mut RecordingView::default())
        .await;

    assert_eq!(outcome, SubmitOutcome::Answered);
    let entries = client.transcript().entries();
    assert_eq!(entries.len(), 3);
    match &entries[0].content {
        EntryContent::Image { src, .. } => assert_eq!(src, "/imagery/u1.png"),
        other => panic!("expected image entry, got {other:?}"),
    }
    assert_eq!(
        entries[1],
        TranscriptEntry::text(EntryRole::User, IMAGE_ONLY_QUESTION)
    );
    assert_eq!(entries[2].kind(), EntryKind::Structured);
}

#[tokio::test]
async fn stream_rejection_detail_is_shown() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/stream"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({"detail": "user is not verified"})))
        .mount(&server)
        .await;

    let mut client = client(&server.uri(), true);
    let outcome = client
        .submit("hello", None, &mut RecordingView::default())
        .await;

    assert_eq!(outcome, SubmitOutcome::Failed("user is not verified".into()));
    assert_eq!(last_text(&client), "Request failed: user is not verified");
}

#[tokio::test]
async fn unreachable_backend_reports_generic_reason() {
    let mut client = client("http://127.0.0.1:1", true);
    let outcome = client
        .submit("hello", None, &mut RecordingView::default())
        .await;

    assert_eq!(
        outcome,
        SubmitOutcome::Failed("could not connect to the server".into())
    );
    assert_eq!(last_text(&client), "Request failed: could not connect to the server");
}

#[tokio::test]
async fn stream_without_final_event_is_reported_empty() {
    let server = MockServer::start().await;
    let body = ndjson(&[
        json!({"type": "answer_start"}),
        json!({"type": "answer_chunk", "text": "partial"}),
    ]);
    Mock::given(method("POST"))
        .and(path("/chat/stream"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/x-ndjson"))
        .mount(&server)
        .await;

    let mut client = client(&server.uri(), true);
    let mut view = RecordingView::default();
    let outcome = client.submit("hello", None, &mut view).await;

    assert_eq!(outcome, SubmitOutcome::Empty);
    assert_eq!(last_text(&client), EMPTY_STREAM_MESSAGE);
    assert_eq!(view.typing.last(), Some(&None));
    assert_eq!(view.progress.last().map(String::as_str), Some("No response"));
}

#[tokio::test]
async fn empty_body_is_a_missing_stream() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/stream"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let mut client = client(&server.uri(), true);
    let outcome = client
        .submit("hello", None, &mut RecordingView::default())
        .await;

    assert_eq!(outcome, SubmitOutcome::Failed("stream body is missing".into()));
}

#[tokio::test]
async fn malformed_line_fails_the_request() {
    let server = MockServer::start().await;
    let body = format!(
        "{}\n{{not json\n{}\n",
        json!({"type": "answer_start"}),
        final_event()
    );
    Mock::given(method("POST"))
        .and(path("/chat/stream"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/x-ndjson"))
        .mount(&server)
        .await;

    let mut client = client(&server.uri(), true);
    let outcome = client
        .submit("hello", None, &mut RecordingView::default())
        .await;

    match outcome {
        SubmitOutcome::Failed(reason) => assert!(reason.starts_with("invalid stream event")),
        other => panic!("expected failure, got {other:?}"),
    }
    assert!(!client.transcript().is_typing());
    assert!(last_text(&client).starts_with("Request failed: invalid stream event"));
}

#[tokio::test]
async fn non_streaming_mode_uses_chat_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat"))
        .and(header("x-user-id", "alice"))
        .and(body_partial_json(json!({"question": "hello", "top_k": 3})))
        .respond_with(ResponseTemplate::new(200).set_body_json(final_event()["data"].clone()))
        .expect(1)
        .mount(&server)
        .await;

    let mut client = client(&server.uri(), false);
    let mut view = RecordingView::default();
    let outcome = client.submit("hello", None, &mut view).await;

    assert_eq!(outcome, SubmitOutcome::Answered);
    assert_eq!(client.transcript().last().map(|e| e.kind()), Some(EntryKind::Structured));
    assert!(view.typing.is_empty());
}
