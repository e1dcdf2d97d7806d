use thiserror::Error;

use crate::ai::AiError;
use crate::feed::{BatchError, FetchError, OpmlError};

/// Coarse classification of a pipeline failure, used to pick the
/// user-facing treatment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Transport failure; excluded from batches, surfaced only when nothing worked.
    Network,
    /// Rejected credentials or a broken authorization round trip.
    Auth,
    /// Input or response with a specific, named defect.
    Format,
    /// The AI service answered with an error.
    Upstream,
}

/// Failure of a digest or headlines cycle.
#[derive(Debug, Error)]
pub enum DigestError {
    #[error(transparent)]
    Batch(#[from] BatchError),
    #[error(transparent)]
    Opml(#[from] OpmlError),
    #[error(transparent)]
    Ai(#[from] AiError),
    #[error("Feed is empty or could not be read.")]
    EmptyFeed,
    #[error("Storage error: {0}")]
    Storage(#[source] anyhow::Error),
}

impl DigestError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DigestError::Batch(e) => match e {
                BatchError::NoUrls => ErrorKind::Format,
                BatchError::Feed(e) => fetch_kind(e),
                BatchError::CredentialsRejected(_) => ErrorKind::Auth,
                BatchError::NoFeedsAvailable(_) => ErrorKind::Network,
            },
            DigestError::Opml(OpmlError::Io(_)) => ErrorKind::Network,
            DigestError::Opml(_) => ErrorKind::Format,
            DigestError::Ai(e) => match e {
                AiError::Network(_) | AiError::Timeout | AiError::ResponseTooLarge(_) => {
                    ErrorKind::Network
                }
                AiError::Upstream { .. } => ErrorKind::Upstream,
                AiError::EmptyResponse | AiError::Malformed(_) | AiError::InsecureBaseUrl => {
                    ErrorKind::Format
                }
                AiError::MissingApiKey => ErrorKind::Auth,
            },
            DigestError::EmptyFeed => ErrorKind::Format,
            DigestError::Storage(_) => ErrorKind::Network,
        }
    }
}

fn fetch_kind(e: &FetchError) -> ErrorKind {
    match e {
        FetchError::AuthRejected(_) => ErrorKind::Auth,
        FetchError::UnsupportedStreamUrl(_)
        | FetchError::UnexpectedFormat
        | FetchError::EmptyBody
        | FetchError::InvalidUrl(_)
        | FetchError::InsecureBaseUrl => ErrorKind::Format,
        FetchError::Network(_)
        | FetchError::HttpStatus(_)
        | FetchError::Timeout
        | FetchError::ResponseTooLarge => ErrorKind::Network,
    }
}
