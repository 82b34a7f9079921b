//! Terminal presentation of the conversation.
//!
//! - [`renderer`] and [`summary`] turn transcript entries into styled lines.
//! - [`terminal`] writes those lines to stdout and keeps the live progress
//!   and typing region current.
//! - [`chat_loop`] reads input lines and dispatches questions and commands.
//!
//! Ownership boundary: this layer presents state, while [`crate::core`] owns
//! the transcript and backend coordination.

pub mod chat_loop;
pub mod renderer;
pub mod summary;
pub mod terminal;
pub mod theme;
