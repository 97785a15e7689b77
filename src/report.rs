// Error surface: turns a failed generation into the messages shown to the
// user.
//
// The invalid-key hint is chosen by a case-insensitive substring match on
// the error text. It can fire on unrelated errors that echo the word and
// miss auth failures worded differently; a status code from the service
// (`RemoteError::status`) would be the sturdier signal.

use std::fmt::Display;

pub const INVALID_KEY_HINT: &str = "Invalid API key. Please check your API key and try again.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorReport {
    pub message: String,
    pub invalid_key_hint: bool,
}

impl ErrorReport {
    /// Lines to display, generic message first.
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![self.message.clone()];
        if self.invalid_key_hint {
            lines.push(INVALID_KEY_HINT.to_string());
        }
        lines
    }
}

pub fn report<E: Display + ?Sized>(error: &E) -> ErrorReport {
    let text = error.to_string();
    ErrorReport {
        message: format!("Error generating image: {text}"),
        invalid_key_hint: text.to_lowercase().contains("unauthorized"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RemoteError;
    use reqwest::StatusCode;

    #[test]
    fn unauthorized_in_any_case_adds_hint() {
        for msg in ["Unauthorized", "401 UNAUTHORIZED", "request unauthorized by gateway"] {
            let r = report(msg);
            assert!(r.invalid_key_hint, "{msg}");
            assert_eq!(r.lines().len(), 2);
            assert_eq!(r.lines()[0], format!("Error generating image: {msg}"));
            assert_eq!(r.lines()[1], INVALID_KEY_HINT);
        }
    }

    #[test]
    fn other_errors_only_show_message() {
        let r = report("connection reset by peer");
        assert!(!r.invalid_key_hint);
        assert_eq!(r.lines(), vec!["Error generating image: connection reset by peer".to_string()]);
    }

    #[test]
    fn http_401_from_remote_triggers_hint() {
        let err = RemoteError::Http {
            status: StatusCode::UNAUTHORIZED,
            body: "{\"detail\":\"Invalid key\"}".into(),
        };
        assert!(report(&err).invalid_key_hint);
    }
}
