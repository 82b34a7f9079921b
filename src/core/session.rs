//! Who is signed in, and where that is remembered between runs.

use std::error::Error as StdError;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::config::data::path_display;
use crate::core::config::io::{project_dirs, write_atomically};

/// An authenticated user. Every backend request carries its id in the
/// `x-user-id` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    user_id: String,
}

impl Session {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }
}

/// Where the client goes next after a session change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
    Chat,
}

#[derive(Debug)]
pub enum SessionError {
    NoDataDir,
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    Write {
        path: PathBuf,
        source: Box<dyn StdError + Send + Sync>,
    },
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::NoDataDir => write!(f, "Failed to determine data directory"),
            SessionError::Io { path, source } => {
                write!(f, "Failed to access session at {}: {}", path_display(path), source)
            }
            SessionError::Parse { path, source } => {
                write!(f, "Failed to parse session at {}: {}", path_display(path), source)
            }
            SessionError::Write { path, source } => {
                write!(f, "Failed to write session at {}: {}", path_display(path), source)
            }
        }
    }
}

impl StdError for SessionError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            SessionError::NoDataDir => None,
            SessionError::Io { source, .. } => Some(source),
            SessionError::Parse { source, .. } => Some(source),
            SessionError::Write { source, .. } => Some(source.as_ref()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct SessionFile {
    user_id: Option<String>,
}

/// File-backed store for the signed-in user id.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `session.toml` in the platform data directory.
    pub fn default_location() -> Result<Self, SessionError> {
        project_dirs()
            .map(|dirs| Self::new(dirs.data_dir().join("session.toml")))
            .ok_or(SessionError::NoDataDir)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Option<Session>, SessionError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&self.path).map_err(|source| SessionError::Io {
            path: self.path.clone(),
            source,
        })?;
        let file: SessionFile = toml::from_str(&contents).map_err(|source| SessionError::Parse {
            path: self.path.clone(),
            source,
        })?;
        Ok(file
            .user_id
            .filter(|id| !id.trim().is_empty())
            .map(Session::new))
    }

    pub fn save(&self, session: &Session) -> Result<(), SessionError> {
        let write_error = |source: Box<dyn StdError + Send + Sync>| SessionError::Write {
            path: self.path.clone(),
            source,
        };
        let file = SessionFile {
            user_id: Some(session.user_id().to_string()),
        };
        let contents = toml::to_string_pretty(&file).map_err(|err| write_error(err.into()))?;
        write_atomically(&self.path, contents.as_bytes()).map_err(write_error)?;
        debug!(path = %self.path.display(), "session saved");
        Ok(())
    }

    pub fn clear(&self) -> Result<(), SessionError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(SessionError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

/// Forgets the stored user id and sends the user back to the login step.
pub fn logout(store: &SessionStore) -> Result<Route, SessionError> {
    store.clear()?;
    debug!("logged out");
    Ok(Route::Login)
}

/// The route a fresh start lands on: chat when a user id is remembered,
/// login otherwise.
pub fn initial_route(store: &SessionStore) -> Result<(Route, Option<Session>), SessionError> {
    Ok(match store.load()? {
        Some(session) => (Route::Chat, Some(session)),
        None => (Route::Login, None),
    })
}
