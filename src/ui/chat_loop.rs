//! Interactive line-mode chat.
//!
//! Each input line is either a slash command or a question. Questions are
//! submitted one at a time; the loop waits for the response to finish before
//! reading the next line.

use std::error::Error;
use std::io::Write;
use std::path::PathBuf;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::debug;

use crate::core::client::StreamingChatClient;
use crate::core::session::{logout, Route, SessionStore};
use crate::ui::terminal::TerminalView;

pub struct Command {
    pub name: &'static str,
    pub usage: &'static str,
    pub help: &'static str,
}

const COMMANDS: &[Command] = &[
    Command {
        name: "image",
        usage: "/image <path> [question]",
        help: "Upload an image and ask about it.",
    },
    Command {
        name: "logout",
        usage: "/logout",
        help: "Forget the stored user id and leave the chat.",
    },
    Command {
        name: "help",
        usage: "/help",
        help: "Show available commands.",
    },
    Command {
        name: "quit",
        usage: "/quit",
        help: "Leave the chat.",
    },
];

pub fn all_commands() -> &'static [Command] {
    COMMANDS
}

pub fn find_command(name: &str) -> Option<&'static Command> {
    all_commands()
        .iter()
        .find(|command| command.name.eq_ignore_ascii_case(name))
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoopInput {
    Ask {
        question: String,
        image: Option<PathBuf>,
    },
    Logout,
    Help,
    Quit,
    /// A known command used with missing arguments.
    Usage(&'static str),
    UnknownCommand(String),
}

/// Classifies one line of user input. Anything not starting with `/` is a
/// question, including the empty line.
pub fn parse_input(line: &str) -> LoopInput {
    let trimmed = line.trim();
    let Some(rest) = trimmed.strip_prefix('/') else {
        return LoopInput::Ask {
            question: trimmed.to_string(),
            image: None,
        };
    };

    let (name, args) = match rest.split_once(char::is_whitespace) {
        Some((name, args)) => (name, args.trim()),
        None => (rest, ""),
    };
    let Some(command) = find_command(name) else {
        return LoopInput::UnknownCommand(name.to_string());
    };

    match command.name {
        "image" => {
            let (path, question) = match args.split_once(char::is_whitespace) {
                Some((path, question)) => (path, question.trim()),
                None => (args, ""),
            };
            if path.is_empty() {
                return LoopInput::Usage(command.usage);
            }
            LoopInput::Ask {
                question: question.to_string(),
                image: Some(PathBuf::from(path)),
            }
        }
        "logout" => LoopInput::Logout,
        "help" => LoopInput::Help,
        _ => LoopInput::Quit,
    }
}

pub fn help_text() -> String {
    let width = all_commands()
        .iter()
        .map(|command| command.usage.len())
        .max()
        .unwrap_or(0);
    let mut text = String::from("Type a question and press Enter. Commands:\n");
    for command in all_commands() {
        text.push_str(&format!("  {:width$}  {}\n", command.usage, command.help));
    }
    text.push_str("  Ctrl+C cancels a running request and exits.");
    text
}

/// The prompt carries the last progress state so a finished request stays
/// visible after the live region is cleared.
pub fn prompt_text(progress: Option<&str>) -> String {
    match progress {
        Some(progress) if !progress.is_empty() => format!("[{progress}] > "),
        _ => "> ".to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// `/quit` or end of input.
    Quit,
    /// Ctrl+C, possibly while a request was running.
    Interrupted,
    Redirect(Route),
}

pub async fn run_chat<R, W>(
    input: R,
    client: &mut StreamingChatClient,
    store: &SessionStore,
    view: &mut TerminalView<W>,
) -> Result<LoopExit, Box<dyn Error>>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();
    view.notice(&format!(
        "Signed in as {}. Type /help for commands.",
        client.session().user_id()
    ))?;

    loop {
        view.settle()?;
        view.prompt(&prompt_text(client.transcript().progress()))?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                view.notice("")?;
                return Ok(LoopExit::Interrupted);
            }
        };
        let Some(line) = line else {
            view.notice("")?;
            return Ok(LoopExit::Quit);
        };

        match parse_input(&line) {
            LoopInput::Ask { question, image } => {
                let outcome = tokio::select! {
                    outcome = client.submit(&question, image.as_deref(), view) => Some(outcome),
                    _ = tokio::signal::ctrl_c() => None,
                };
                match outcome {
                    Some(outcome) => debug!(?outcome, "submission finished"),
                    None => {
                        client.cancel_current_stream();
                        view.settle()?;
                        view.notice("Cancelled.")?;
                        return Ok(LoopExit::Interrupted);
                    }
                }
            }
            LoopInput::Logout => {
                let route = logout(store)?;
                view.notice("Logged out.")?;
                return Ok(LoopExit::Redirect(route));
            }
            LoopInput::Help => view.notice(&help_text())?,
            LoopInput::Quit => return Ok(LoopExit::Quit),
            LoopInput::Usage(usage) => view.notice(&format!("Usage: {usage}"))?,
            LoopInput::UnknownCommand(name) => {
                view.notice(&format!("Unknown command: /{name}. Type /help for commands."))?
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::client::{ChatOptions, EMPTY_INPUT_MESSAGE};
    use crate::core::session::Session;
    use crate::core::transcript::{EntryRole, TranscriptEntry};
    use crate::ui::renderer::RenderConfig;
    use crate::ui::theme::Theme;
    use tempfile::TempDir;

    fn client() -> StreamingChatClient {
        StreamingChatClient::new(
            reqwest::Client::new(),
            Session::new("alice"),
            ChatOptions {
                base_url: "http://127.0.0.1:9".into(),
                top_k: 3,
                ops: None,
                streaming: true,
                sanitize_stream: true,
            },
        )
    }

    fn view() -> TerminalView<Vec<u8>> {
        TerminalView::new(
            Vec::new(),
            Theme::monochrome(),
            RenderConfig::new(true, "http://127.0.0.1:9"),
            false,
        )
    }

    #[test]
    fn plain_lines_are_questions() {
        assert_eq!(
            parse_input("  what is this crater?  "),
            LoopInput::Ask {
                question: "what is this crater?".into(),
                image: None
            }
        );
        assert_eq!(
            parse_input(""),
            LoopInput::Ask {
                question: String::new(),
                image: None
            }
        );
    }

    #[test]
    fn image_command_takes_path_then_question() {
        assert_eq!(
            parse_input("/image shots/moon.png how many craters?"),
            LoopInput::Ask {
                question: "how many craters?".into(),
                image: Some(PathBuf::from("shots/moon.png"))
            }
        );
        assert_eq!(
            parse_input("/IMAGE moon.png"),
            LoopInput::Ask {
                question: String::new(),
                image: Some(PathBuf::from("moon.png"))
            }
        );
        assert_eq!(
            parse_input("/image"),
            LoopInput::Usage("/image <path> [question]")
        );
    }

    #[test]
    fn other_commands() {
        assert_eq!(parse_input("/logout"), LoopInput::Logout);
        assert_eq!(parse_input("/help"), LoopInput::Help);
        assert_eq!(parse_input("/quit"), LoopInput::Quit);
        assert_eq!(
            parse_input("/model gpt"),
            LoopInput::UnknownCommand("model".into())
        );
    }

    #[test]
    fn help_lists_every_command() {
        let help = help_text();
        for command in all_commands() {
            assert!(help.contains(command.usage));
            assert!(help.contains(command.help));
        }
    }

    #[test]
    fn prompt_shows_last_progress() {
        assert_eq!(prompt_text(None), "> ");
        assert_eq!(prompt_text(Some("")), "> ");
        assert_eq!(prompt_text(Some("Done")), "[Done] > ");
    }

    #[tokio::test]
    async fn empty_question_is_rejected_without_a_request() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path().join("session.toml"));
        let mut client = client();
        let mut view = view();

        let exit = run_chat(&b"\n/quit\n"[..], &mut client, &store, &mut view)
            .await
            .unwrap();

        assert_eq!(exit, LoopExit::Quit);
        assert_eq!(client.transcript().len(), 1);
        assert_eq!(
            client.transcript().entries()[0],
            TranscriptEntry::text(EntryRole::Bot, EMPTY_INPUT_MESSAGE)
        );
    }

    #[tokio::test]
    async fn logout_clears_store_and_redirects_to_login() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path().join("session.toml"));
        store.save(&Session::new("alice")).unwrap();
        let mut client = client();
        let mut view = view();

        let exit = run_chat(&b"/help\n/logout\n"[..], &mut client, &store, &mut view)
            .await
            .unwrap();

        assert_eq!(exit, LoopExit::Redirect(Route::Login));
        assert!(store.load().unwrap().is_none());
        let output = String::from_utf8(view.into_inner()).unwrap();
        assert!(output.contains("Signed in as alice."));
        assert!(output.contains("/image <path> [question]"));
        assert!(output.contains("Logged out."));
    }

    #[tokio::test]
    async fn end_of_input_quits() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path().join("session.toml"));
        let mut client = client();
        let mut view = view();

        let exit = run_chat(&b"/nope\n"[..], &mut client, &store, &mut view)
            .await
            .unwrap();

        assert_eq!(exit, LoopExit::Quit);
        let output = String::from_utf8(view.into_inner()).unwrap();
        assert!(output.contains("Unknown command: /nope."));
    }
}
