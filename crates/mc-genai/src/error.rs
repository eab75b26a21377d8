//! Error kinds for collaborator calls.
//!
//! Every failure a generation or segmentation request can end in is one of
//! these. The orchestrator shows [`GenAiError::user_message`] and returns
//! the canvas to idle; nothing here is fatal.

use mc_core::DataUriError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GenAiError {
    /// The transport failed (network, HTTP status, quota).
    #[error("request failed: {0}")]
    Request(String),

    /// Every retry attempt failed.
    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        last: Box<GenAiError>,
    },

    /// The model answered, but not in the expected shape.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// A generation response carried text only.
    #[error("response contained no image")]
    NoImage,

    /// A variation fan-out produced nothing.
    #[error("all {requested} variations failed; last error: {last}")]
    AllVariationsFailed {
        requested: usize,
        last: Box<GenAiError>,
    },
}

pub type GenAiResult<T> = Result<T, GenAiError>;

impl GenAiError {
    /// Whether another attempt of the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            GenAiError::Exhausted { .. } | GenAiError::AllVariationsFailed { .. }
        )
    }

    /// The one line shown to the user.
    pub fn user_message(&self) -> String {
        match self {
            GenAiError::Request(_) => {
                "The image service could not be reached. Please try again.".to_string()
            }
            GenAiError::Exhausted { last, .. } => last.user_message(),
            GenAiError::MalformedResponse(_) => {
                "The model returned a response that could not be read.".to_string()
            }
            GenAiError::NoImage => {
                "The model did not return an image. Try rephrasing the instructions.".to_string()
            }
            GenAiError::AllVariationsFailed { requested, .. } => {
                format!("None of the {requested} variations could be generated.")
            }
        }
    }
}

impl From<DataUriError> for GenAiError {
    fn from(e: DataUriError) -> Self {
        GenAiError::MalformedResponse(e.to_string())
    }
}

impl From<serde_json::Error> for GenAiError {
    fn from(e: serde_json::Error) -> Self {
        GenAiError::MalformedResponse(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exhausted_surfaces_the_underlying_message() {
        let e = GenAiError::Exhausted {
            attempts: 3,
            last: Box::new(GenAiError::NoImage),
        };
        assert_eq!(e.user_message(), GenAiError::NoImage.user_message());
        assert!(e.to_string().contains("3 attempts"));
        assert!(!e.is_retryable());
    }

    #[test]
    fn malformed_from_json_error() {
        let json_err = serde_json::from_str::<Vec<u8>>("{").unwrap_err();
        let e: GenAiError = json_err.into();
        assert!(matches!(e, GenAiError::MalformedResponse(_)));
        assert!(e.is_retryable());
    }
}
