// Error types for a single chat submission

use std::time::Duration;

use thiserror::Error;

/// Why a submission did not produce an answer.
///
/// The `Display` text is what ends up in the error banner, so every variant
/// reads as a complete user-facing sentence.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChatError {
    #[error("The question is too long ({len}/{max} characters).")]
    InputTooLong { len: usize, max: usize },

    #[error("An error occurred. Status: {status}, Message: {message}")]
    Server { status: u16, message: String },

    #[error("An error occurred. No response from server.")]
    NoResponse,

    #[error("An error occurred. No response from server after {}s.", .0.as_secs())]
    TimedOut(Duration),

    #[error("An error occurred. {0}")]
    Request(String),

    #[error("Request cancelled.")]
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_error_mentions_status_and_message() {
        let err = ChatError::Server {
            status: 500,
            message: "overloaded".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("500"));
        assert!(text.contains("overloaded"));
    }

    #[test]
    fn test_timeout_reads_as_no_response() {
        let text = ChatError::TimedOut(Duration::from_secs(30)).to_string();
        assert!(text.contains("No response from server"));
        assert!(text.contains("30s"));
    }
}
