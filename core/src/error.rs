//! Error types for the TestRail client.
//!
//! # Design
//! Configuration failures (`MissingProjectId`, `MissingEntityId`) are raised
//! before any request is built, so a caller can recover by supplying the
//! missing identifier. Transport errors are carried as their original source.
//! A non-JSON body on a 2xx response is not an error; see `ApiResponse::Raw`.

use thiserror::Error as ThisError;

/// Boxed error returned by a `Transport` implementation.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors returned by `TestRailClient` and the model layer.
#[derive(Debug, ThisError)]
pub enum Error {
    /// No project id was passed and the client has no default.
    #[error("provide project id")]
    MissingProjectId,

    /// An update call received an entity that was never persisted.
    #[error("{entity} has no id")]
    MissingEntityId { entity: &'static str },

    /// The transport collaborator failed before a response was produced.
    #[error("transport failed: {0}")]
    Transport(#[source] BoxError),

    /// The server answered with a non-2xx status.
    #[error("HTTP {status}: {message}")]
    Api { status: u16, message: String },

    /// A payload could not be hydrated into the named entity.
    #[error("cannot build {entity} from payload: {source}")]
    Decode {
        entity: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// Strict hydration met a key the entity does not declare.
    #[error("{entity} has no field `{field}`")]
    UnknownField { entity: &'static str, field: String },

    /// The response was raw or had the wrong JSON shape.
    #[error("unexpected response, expected {expected}")]
    UnexpectedResponse { expected: &'static str },

    /// A request body could not be serialized.
    #[error("serialization failed: {0}")]
    Serialize(#[source] serde_json::Error),

    /// Environment configuration is missing or malformed.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// True for the errors raised before any network call was attempted.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::MissingProjectId | Error::MissingEntityId { .. } | Error::Config(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_displays_status_and_message() {
        let err = Error::Api {
            status: 400,
            message: "Field :run_id is not a valid test run.".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 400: Field :run_id is not a valid test run.");
    }

    #[test]
    fn configuration_errors_are_classified() {
        assert!(Error::MissingProjectId.is_configuration());
        assert!(Error::MissingEntityId { entity: "Run" }.is_configuration());
        assert!(!Error::UnexpectedResponse { expected: "JSON" }.is_configuration());
    }

    #[test]
    fn transport_error_keeps_source() {
        use std::error::Error as _;

        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = Error::Transport(Box::new(io));
        assert_eq!(err.source().unwrap().to_string(), "refused");
    }
}
