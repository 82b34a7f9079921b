//! One-shot "say" command: asks a single question and prints the result.

use std::error::Error;
use std::path::PathBuf;

use crate::cli::{build_http_client, require_session, terminal_view};
use crate::core::client::{ChatOptions, StreamingChatClient, SubmitOutcome};
use crate::core::config::Config;
use crate::core::session::SessionStore;

pub async fn run_say(
    question: Vec<String>,
    image: Option<PathBuf>,
    config: &Config,
    transcript: Option<PathBuf>,
) -> Result<(), Box<dyn Error>> {
    let question = question.join(" ");
    if question.trim().is_empty() && image.is_none() {
        eprintln!("Usage: starchat say [--image <path>] <question>");
        std::process::exit(1);
    }

    let store = SessionStore::default_location()?;
    let session = require_session(&store)?;
    let mut client = StreamingChatClient::new(
        build_http_client()?,
        session,
        ChatOptions::from_config(config),
    );
    let mut view = terminal_view(config, transcript)?;

    let outcome = tokio::select! {
        outcome = client.submit(&question, image.as_deref(), &mut view) => Some(outcome),
        _ = tokio::signal::ctrl_c() => None,
    };
    view.settle()?;

    match outcome {
        Some(SubmitOutcome::Answered) | Some(SubmitOutcome::Empty) => Ok(()),
        Some(outcome) => {
            tracing::debug!(?outcome, "say finished without an answer");
            std::process::exit(1);
        }
        None => {
            client.cancel_current_stream();
            eprintln!("Cancelled.");
            std::process::exit(130);
        }
    }
}
