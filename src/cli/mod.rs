//! Command-line interface parsing and handling
//!
//! This module parses command-line arguments and dispatches to the login,
//! chat, one-shot and configuration commands.

pub mod say;

use std::error::Error;
use std::io::{self, IsTerminal, Stdout};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tokio::io::BufReader;
use tracing::debug;

use crate::core::auth::login;
use crate::core::client::{ChatOptions, StreamingChatClient};
use crate::core::config::data::{path_display, ConfigKey};
use crate::core::config::Config;
use crate::core::session::{initial_route, logout, Route, Session, SessionStore};
use crate::ui::chat_loop::{run_chat, LoopExit};
use crate::ui::renderer::RenderConfig;
use crate::ui::terminal::TerminalView;
use crate::ui::theme::Theme;
use crate::utils::logging::{init_tracing, TranscriptLog};

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("VERGEN_GIT_DESCRIBE"),
    ", built ",
    env!("VERGEN_BUILD_DATE"),
    ")"
);

const LOGIN_HINT: &str = "Run `starchat login <user-id>` to sign in.";

#[derive(Parser)]
#[command(name = "starchat", version, long_version = LONG_VERSION)]
#[command(about = "A terminal chat client for retrieval-augmented chat backends")]
#[command(
    long_about = "Starchat talks to a chat backend that answers questions with retrieved \
documents and optional image analysis. Answers stream in as they are generated, followed \
by a summary of the pipeline, the citations used and any analysis results.\n\n\
Getting started:\n\
  starchat login <user-id>   Verify and remember your user id\n\
  starchat                   Start an interactive chat\n\
  starchat say <question>    Ask a single question and exit\n\n\
Interactive commands:\n\
  /image <path> [question]   Upload an image and ask about it\n\
  /logout                    Forget the stored user id\n\
  /help                      Show available commands\n\
  /quit                      Leave the chat (Ctrl+C also works)\n\n\
Environment Variables:\n\
  STARCHAT_LOG   Diagnostic log filter, e.g. starchat=debug (default: warn)"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Backend base URL for this run, overriding the configured base-url
    #[arg(short = 'u', long, global = true, value_name = "URL")]
    pub base_url: Option<String>,

    /// Write diagnostic logs to this file instead of stderr
    #[arg(short = 'l', long, global = true, value_name = "FILE")]
    pub log: Option<PathBuf>,

    /// Append the conversation to this file as plain text
    #[arg(short = 't', long, global = true, value_name = "FILE")]
    pub transcript: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Verify a user id with the backend and remember it
    Login {
        /// User id sent as the x-user-id header
        user_id: String,
    },
    /// Forget the stored user id
    Logout,
    /// Start the interactive chat (default)
    Chat,
    /// Ask a single question and print the answer
    Say {
        /// Image to upload with the question
        #[arg(short, long, value_name = "PATH")]
        image: Option<PathBuf>,
        /// The question (may be several words)
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        question: Vec<String>,
    },
    /// Set a configuration value
    Set {
        /// base-url, top-k, ops, streaming, rich-images or sanitize-stream
        key: String,
        /// Value to set (ops takes a comma-separated list)
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
        value: Vec<String>,
    },
    /// Reset a configuration value to its default
    Unset {
        /// Configuration key to unset
        key: String,
    },
    /// Print the current configuration
    Config,
}

pub fn main() -> Result<(), Box<dyn Error>> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?
        .block_on(async_main())
}

async fn async_main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_tracing(args.log.as_deref())?;

    let mut config = Config::load()?;

    match args.command.unwrap_or(Commands::Chat) {
        Commands::Set { key, value } => {
            let key = parse_key(&key);
            if let Err(message) = config.set_value(key, &value.join(" ")) {
                eprintln!("❌ {message}");
                std::process::exit(1);
            }
            config.save()?;
            println!("✅ Set {} to: {}", key.as_str(), config.display_value(key));
            Ok(())
        }
        Commands::Unset { key } => {
            let key = parse_key(&key);
            config.unset_value(key);
            config.save()?;
            println!(
                "✅ Unset {} (now: {})",
                key.as_str(),
                config.display_value(key)
            );
            Ok(())
        }
        Commands::Config => {
            config.print_all();
            println!();
            println!("Config file: {}", path_display(Config::config_path()?));
            if let Ok(store) = SessionStore::default_location() {
                println!("Session file: {}", path_display(store.path()));
            }
            Ok(())
        }
        Commands::Login { user_id } => {
            let config = with_overrides(config, args.base_url);
            let store = SessionStore::default_location()?;
            let http = build_http_client()?;
            match login(&http, config.base_url(), &store, &user_id).await {
                Ok((session, _)) => {
                    println!("✅ Signed in as {}", session.user_id());
                    Ok(())
                }
                Err(err) => {
                    eprintln!("❌ {err}");
                    std::process::exit(1);
                }
            }
        }
        Commands::Logout => {
            let store = SessionStore::default_location()?;
            logout(&store)?;
            println!("✅ Logged out. {LOGIN_HINT}");
            Ok(())
        }
        Commands::Say { image, question } => {
            let config = with_overrides(config, args.base_url);
            say::run_say(question, image, &config, args.transcript).await
        }
        Commands::Chat => {
            let config = with_overrides(config, args.base_url);
            run_interactive(&config, args.transcript).await
        }
    }
}

async fn run_interactive(
    config: &Config,
    transcript: Option<PathBuf>,
) -> Result<(), Box<dyn Error>> {
    let store = SessionStore::default_location()?;
    let session = require_session(&store)?;

    let mut client = StreamingChatClient::new(
        build_http_client()?,
        session,
        ChatOptions::from_config(config),
    );
    let mut view = terminal_view(config, transcript)?;

    let exit = run_chat(
        BufReader::new(tokio::io::stdin()),
        &mut client,
        &store,
        &mut view,
    )
    .await?;
    debug!(?exit, "chat loop finished");

    if exit == LoopExit::Redirect(Route::Login) {
        println!("{LOGIN_HINT}");
    }
    Ok(())
}

fn parse_key(name: &str) -> ConfigKey {
    match ConfigKey::parse(name) {
        Some(key) => key,
        None => {
            eprintln!("❌ Unknown config key: {name}");
            let known: Vec<&str> = ConfigKey::ALL.iter().map(|key| key.as_str()).collect();
            eprintln!("Known keys: {}", known.join(", "));
            std::process::exit(1);
        }
    }
}

/// Applies command-line overrides that are not persisted.
fn with_overrides(mut config: Config, base_url: Option<String>) -> Config {
    if let Some(base_url) = base_url {
        config.base_url = Some(base_url);
    }
    config
}

/// Loads the remembered session, or exits with a hint to log in first.
pub(crate) fn require_session(store: &SessionStore) -> Result<Session, Box<dyn Error>> {
    match initial_route(store)? {
        (Route::Chat, Some(session)) => Ok(session),
        _ => {
            eprintln!("❌ Not signed in. {LOGIN_HINT}");
            std::process::exit(1);
        }
    }
}

pub(crate) fn build_http_client() -> Result<reqwest::Client, Box<dyn Error>> {
    Ok(reqwest::Client::builder()
        .user_agent(concat!("starchat/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

/// Colors and the live status region only when stdout is a terminal.
pub(crate) fn terminal_view(
    config: &Config,
    transcript: Option<PathBuf>,
) -> Result<TerminalView<Stdout>, Box<dyn Error>> {
    let stdout = io::stdout();
    let interactive = stdout.is_terminal();
    let theme = if interactive {
        Theme::dark_default()
    } else {
        Theme::monochrome()
    };
    let render = RenderConfig::new(config.rich_images(), config.base_url());
    let log = TranscriptLog::new(transcript)?;
    debug!(interactive, transcript = %log.get_status_string(), "terminal view ready");
    Ok(TerminalView::new(stdout, theme, render, interactive).with_log(log))
}
