//! Starchat is a terminal client for a retrieval-augmented chat backend that
//! streams its answers as newline-delimited JSON events.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`api`] defines the wire payloads and the HTTP calls to the backend.
//! - [`core`] owns the session, the transcript, NDJSON decoding and the
//!   streaming chat client that ties them together.
//! - [`ui`] renders transcript entries to the terminal and runs the
//!   interactive line-mode loop.
//! - [`cli`] parses arguments and dispatches commands.
//! - [`utils`] holds URL helpers and logging setup.
//!
//! The binary (`src/main.rs`) only calls [`crate::cli::main`].

pub mod api;
pub mod cli;
pub mod core;
pub mod ui;
pub mod utils;
