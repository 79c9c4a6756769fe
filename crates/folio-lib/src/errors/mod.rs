use thiserror::Error;

#[derive(Error, Debug)]
pub enum FolioError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The token exchange was rejected by the provider.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// The provider kept answering 401 after the credential was refreshed.
    #[error("Unauthorized: {operation} still rejected after refreshing the credential")]
    Unauthorized { operation: String },

    /// Any other non-2xx answer from the storage provider.
    #[error("Request failed ({operation}, {status}): {message}")]
    Request {
        operation: String,
        status: u16,
        message: String,
    },

    #[error("Gallery is locked")]
    Locked,

    #[error("Invalid access key")]
    InvalidPasscode,

    #[error("Invalid gallery transition: {event} while {from}")]
    InvalidTransition { from: String, event: String },

    #[error("No cached response for {0}")]
    CacheMiss(String),

    #[error("Command error: {0}")]
    Command(String),

    #[error("{0}")]
    Application(String),
}

pub type Result<T> = std::result::Result<T, FolioError>;

impl FolioError {
    /// Build a `Request` error from a failed provider response, consuming its body.
    pub async fn from_response(operation: &str, resp: reqwest::Response) -> Self {
        let status = resp.status().as_u16();
        let message = resp.text().await.unwrap_or_default();
        FolioError::Request {
            operation: operation.to_string(),
            status,
            message,
        }
    }
}

/// Logs a fatal error and exits the process with code 1.
pub fn handle_fatal(err: FolioError) -> ! {
    tracing::error!("Fatal error: {}", err);
    std::process::exit(1)
}

/// Maps a `FolioError` to user-facing CLI output with a hint where one helps.
pub fn handle_command_error(err: &FolioError) {
    use crate::output;

    match err {
        FolioError::Auth(msg) => {
            output::error(&format!("Authentication error: {}", msg));
            output::info(
                "Check FOLIO_DROPBOX_APP_KEY, FOLIO_DROPBOX_APP_SECRET and FOLIO_DROPBOX_REFRESH_TOKEN.",
            );
        }
        FolioError::Unauthorized { operation } => {
            output::error(&format!("Dropbox rejected {} after a token refresh", operation));
            output::info("The refresh token may have been revoked. Generate a new one.");
        }
        FolioError::Request {
            operation, status, ..
        } => {
            output::error(&format!("Dropbox {} failed ({})", operation, status));
        }
        FolioError::Http(e) => {
            output::error(&format!("Network error: {}", e));
            output::info("Check your internet connection.");
        }
        FolioError::Locked => {
            output::error("Gallery is locked");
            output::info("Pass --passcode or enter the access key when prompted.");
        }
        FolioError::InvalidPasscode => {
            output::error("Invalid access key");
        }
        FolioError::CacheMiss(url) => {
            output::error(&format!("Offline and nothing cached for {}", url));
            output::info("Run `folio cache install` while online.");
        }
        FolioError::Io(e) => {
            output::error(&format!("File error: {}", e));
        }
        FolioError::Config(msg) => {
            output::error(&format!("Configuration error: {}", msg));
        }
        FolioError::Command(msg) => {
            output::error(&format!("Error: {}", msg));
        }
        _ => {
            output::error(&format!("{}", err));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_error_display() {
        let err = FolioError::Request {
            operation: "list_folder".into(),
            status: 409,
            message: "path/not_found".into(),
        };
        assert_eq!(
            err.to_string(),
            "Request failed (list_folder, 409): path/not_found"
        );
    }

    #[test]
    fn test_unauthorized_names_operation() {
        let err = FolioError::Unauthorized {
            operation: "upload".into(),
        };
        assert!(err.to_string().contains("upload"));
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: FolioError = io.into();
        assert!(matches!(err, FolioError::Io(_)));
    }

    #[test]
    fn test_handle_command_error_does_not_panic() {
        handle_command_error(&FolioError::Locked);
        handle_command_error(&FolioError::CacheMiss("https://example.com/".into()));
        handle_command_error(&FolioError::Application("boom".into()));
    }
}
