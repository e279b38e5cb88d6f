use thiserror::Error;

/// Failure of a single call to the opt-out API.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },
    #[error("Network error: {0}")]
    Network(String),
    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl TransportError {
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// 4xx responses are permanent; everything else may succeed on retry.
    pub fn is_client_error(&self) -> bool {
        matches!(self.status(), Some(status) if (400..500).contains(&status))
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return TransportError::Status {
                status: status.as_u16(),
                url: err.url().map(|u| u.to_string()).unwrap_or_default(),
            };
        }
        if err.is_decode() {
            TransportError::Decode(err.to_string())
        } else {
            TransportError::Network(err.to_string())
        }
    }
}

/// Outcome classes of opt-out key resolution.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("Opt-out key not found: {0}")]
    NotFound(TransportError),
    #[error("Failed to communicate with server while fetching CampaignMailer: {0}")]
    Unavailable(String),
}

impl ResolveError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ResolveError::Unavailable(_))
    }
}

impl From<TransportError> for ResolveError {
    fn from(err: TransportError) -> Self {
        if err.is_client_error() {
            ResolveError::NotFound(err)
        } else {
            ResolveError::Unavailable(err.to_string())
        }
    }
}

/// Errors that block the landing page from rendering a form.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum FatalError {
    #[error("Not found")]
    NotFound,
    #[error("This opt-out link is no longer active")]
    LinkInactive,
}
