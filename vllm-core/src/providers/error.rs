//! Provider error types and handling

use crate::client::ClientError;
use thiserror::Error;

/// Result type for provider operations
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Failure to map between the neutral and wire schemas
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranslateError {
    /// Role string outside system/user/assistant/tool
    #[error("untranslatable message role '{role}'")]
    UnknownRole { role: String },
}

/// Errors surfaced by a provider
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Transport or protocol failure in the underlying client
    #[error("error calling client chat method: {0}")]
    Client(#[from] ClientError),

    /// A message could not be translated
    #[error("translation failed: {0}")]
    Translate(#[from] TranslateError),

    /// The backend answered with an empty choices list
    #[error("no choices returned from model")]
    NoChoices,

    /// The backend answered 200 without a single frame
    #[error("empty response from model")]
    EmptyResponse,

    /// The first choice carried neither a message nor a delta
    #[error("choice {index} carried no message")]
    MissingMessage { index: u32 },

    /// `generate` was called before any model was selected
    #[error("no model selected; call use_model first or pass a model explicitly")]
    NoModelSelected,

    /// The model passed to `use_model` is unusable
    #[error("invalid model: {0}")]
    InvalidModel(String),

    /// The consumer of a generation stream went away
    #[error("generation stream receivers were dropped")]
    StreamClosed,
}

impl ProviderError {
    /// Domain errors, as opposed to transport or protocol failures
    pub fn is_semantic(&self) -> bool {
        matches!(
            self,
            ProviderError::Translate(_)
                | ProviderError::NoChoices
                | ProviderError::EmptyResponse
                | ProviderError::MissingMessage { .. }
        )
    }

    /// The underlying client error, if any
    pub fn client_error(&self) -> Option<&ClientError> {
        match self {
            ProviderError::Client(err) => Some(err),
            _ => None,
        }
    }
}
