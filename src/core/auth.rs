use std::error::Error as StdError;
use std::fmt;

use crate::api::backend::{verify_user, BackendError};
use crate::core::session::{Route, Session, SessionError, SessionStore};

#[derive(Debug)]
pub enum LoginError {
    EmptyUserId,
    /// The backend refused the id; carries its `detail` when it sent one.
    Rejected(Option<String>),
    Unreachable(BackendError),
    Store(SessionError),
}

impl fmt::Display for LoginError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoginError::EmptyUserId => write!(f, "Enter a user id."),
            LoginError::Rejected(Some(detail)) => write!(f, "{detail}"),
            LoginError::Rejected(None) => write!(f, "Login failed"),
            LoginError::Unreachable(_) => write!(f, "Could not connect to the server"),
            LoginError::Store(err) => write!(f, "{err}"),
        }
    }
}

impl StdError for LoginError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            LoginError::Unreachable(err) => Some(err),
            LoginError::Store(err) => Some(err),
            _ => None,
        }
    }
}

/// Verifies `user_id` against `GET /auth/verify` and remembers it on success.
pub async fn login(
    client: &reqwest::Client,
    base_url: &str,
    store: &SessionStore,
    user_id: &str,
) -> Result<(Session, Route), LoginError> {
    let user_id = user_id.trim();
    if user_id.is_empty() {
        return Err(LoginError::EmptyUserId);
    }

    match verify_user(client, base_url, user_id).await {
        Ok(()) => {}
        Err(BackendError::Status { detail, .. }) => return Err(LoginError::Rejected(detail)),
        Err(err) => return Err(LoginError::Unreachable(err)),
    }

    let session = Session::new(user_id);
    store.save(&session).map_err(LoginError::Store)?;
    Ok((session, Route::Chat))
}
