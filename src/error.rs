use serde_json::Value;
use thiserror::Error;

/// Message every response-less failure is normalized to.
pub const CONNECTIVITY_MESSAGE: &str = "Unable to reach the server. Please check your connection.";

/// Errors produced by the client stack.
///
/// The HTTP layer normalizes transport failures into [`ApiError::Network`] and
/// non-2xx responses into [`ApiError::Http`]; resource services forward them
/// untouched. Backend validation failures and missing records arrive as
/// `Http` with a 4xx status (see [`ApiError::is_validation`] and
/// [`ApiError::is_not_found`]).
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// No response was received (connect failure, timeout, dropped body).
    #[error("{message}")]
    Network { message: String },

    /// The backend answered with a non-2xx status other than 401.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The backend rejected the session (401).
    #[error("Unauthorized: {body}")]
    Unauthorized { body: String },

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Token storage error: {0}")]
    Storage(String),
}

impl ApiError {
    pub fn network() -> Self {
        Self::Network {
            message: CONNECTIVITY_MESSAGE.to_string(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    /// HTTP status carried by the error, if a response was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::Unauthorized { .. } => Some(401),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Field-level rejection reported by the backend (4xx other than 401/404).
    pub fn is_validation(&self) -> bool {
        matches!(self.status(), Some(s) if (400..500).contains(&s) && s != 401 && s != 404)
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }

    /// Short message fit for an operator.
    ///
    /// Pulls `detail` (string or list of `{msg}` entries) or `message` out of a
    /// JSON error body when the backend sent one.
    pub fn user_message(&self) -> String {
        let body = match self {
            Self::Http { body, .. } | Self::Unauthorized { body } => body,
            other => return other.to_string(),
        };

        let detail = serde_json::from_str::<Value>(body).ok().and_then(|json| {
            match json.get("detail").or_else(|| json.get("message")) {
                Some(Value::String(s)) => Some(s.clone()),
                Some(Value::Array(items)) => {
                    let msgs: Vec<String> = items
                        .iter()
                        .filter_map(|item| {
                            let msg = item.get("msg")?.as_str()?;
                            let field = item
                                .get("loc")
                                .and_then(Value::as_array)
                                .and_then(|loc| loc.last())
                                .and_then(Value::as_str);
                            Some(match field {
                                Some(field) => format!("{}: {}", field, msg),
                                None => msg.to_string(),
                            })
                        })
                        .collect();
                    (!msgs.is_empty()).then(|| msgs.join("; "))
                }
                _ => None,
            }
        });

        match (detail, self.status()) {
            (Some(detail), _) => detail,
            (None, Some(status)) if body.trim().is_empty() => format!("HTTP {}", status),
            (None, _) => self.to_string(),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}
