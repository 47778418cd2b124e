use thiserror::Error;

#[derive(Error, Debug)]
pub enum RaghuError {
    #[error("config error: {0}")]
    Config(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RaghuError>;

/// Failure modes of a single advice call.  None of these reach the farmer
/// as an error; each one has a fixed apology text instead.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The request never produced an HTTP response (DNS, connect, timeout).
    #[error("transport failure: {0}")]
    Transport(String),

    /// The provider answered with a non-success status.
    #[error("provider returned {status}: {message}")]
    Status { status: u16, message: String },

    /// Success status, but no candidate text in the body.
    #[error("provider response had no candidate text")]
    MissingText,
}

pub const TRANSPORT_APOLOGY: &str =
    "Raghu had a problem contacting the AI server. Please try again later.";
pub const MISSING_TEXT_APOLOGY: &str = "Sorry, Raghu could not generate a reply right now.";
const STATUS_APOLOGY_PREFIX: &str = "Raghu could not answer right now. Error from Gemini: ";

impl ProviderError {
    /// Text shown to the farmer in place of advice.
    pub fn user_message(&self) -> String {
        match self {
            Self::Transport(_) => TRANSPORT_APOLOGY.to_string(),
            Self::Status { message, .. } => format!("{STATUS_APOLOGY_PREFIX}{message}"),
            Self::MissingText => MISSING_TEXT_APOLOGY.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_message_embeds_provider_text() {
        let err = ProviderError::Status {
            status: 400,
            message: "API key not valid".into(),
        };
        let text = err.user_message();
        assert!(text.starts_with("Raghu could not answer right now."));
        assert!(text.ends_with("API key not valid"));
    }

    #[test]
    fn transport_and_missing_text_use_fixed_apologies() {
        assert_eq!(
            ProviderError::Transport("connection refused".into()).user_message(),
            TRANSPORT_APOLOGY
        );
        assert_eq!(ProviderError::MissingText.user_message(), MISSING_TEXT_APOLOGY);
    }

    #[test]
    fn provider_error_converts_into_crate_error() {
        let err: RaghuError = ProviderError::MissingText.into();
        assert!(matches!(err, RaghuError::Provider(_)));
    }
}
