/// Error surfaced by every network-backed feed operation.
///
/// All failures are caught at the mutation boundary and converted into one of
/// these; nothing past the engine sees a raw transport error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FeedError {
    #[error("Request rejected{}: {}", status_suffix(.status), .message.as_deref().unwrap_or("no message"))]
    RemoteRejected {
        status: Option<u16>,
        message: Option<String>,
    },
    #[error("Backend unreachable: {0}")]
    Disconnected(String),
    #[error("Unexpected response: {0}")]
    InvalidResponse(String),
}

impl FeedError {
    pub fn rejected(message: impl Into<String>) -> Self {
        FeedError::RemoteRejected {
            status: None,
            message: Some(message.into()),
        }
    }

    /// Text meant for the UI element that triggered the action.
    pub fn user_message(&self) -> String {
        match self {
            FeedError::RemoteRejected {
                message: Some(msg), ..
            } => msg.clone(),
            FeedError::RemoteRejected { message: None, .. } => {
                "The server rejected the request".to_string()
            }
            FeedError::Disconnected(_) => "Connection to the server was lost".to_string(),
            FeedError::InvalidResponse(_) => "The server sent an unexpected response".to_string(),
        }
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" ({s})")).unwrap_or_default()
}

pub type FeedResult<T> = Result<T, FeedError>;
