/*!
 * Error types for the resxforge application.
 *
 * This module contains custom error types for different parts of the application,
 * using the thiserror crate for ergonomic error definitions.
 */

use thiserror::Error;

/// Errors that can occur when talking to the inference backend
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The request did not complete within the configured timeout
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// The backend answers but lacks model variants the run needs
    #[error("Backend is missing required models: {}", .0.join(", "))]
    ModelMissing(Vec<String>),
}

impl From<reqwest::Error> for ProviderError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout(error.to_string())
        } else if error.is_connect() {
            Self::ConnectionError(error.to_string())
        } else if error.is_decode() {
            Self::ParseError(error.to_string())
        } else {
            Self::RequestFailed(error.to_string())
        }
    }
}

/// Errors that can occur while persisting a translation cache
#[derive(Error, Debug)]
pub enum CacheError {
    /// Reading or writing the cache file failed
    #[error("Cache I/O error on {path}: {source}")]
    Io {
        /// Cache file involved
        path: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The in-memory table could not be serialized
    #[error("Failed to serialize cache: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Errors that can occur while loading configuration files
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Reading a configuration file failed
    #[error("Failed to read {path}: {source}")]
    Io {
        /// File involved
        path: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// A configuration file that was being watched has disappeared
    #[error("{path} not found")]
    NotFound {
        /// File involved
        path: String,
    },

    /// A configuration file is not valid JSON for its schema
    #[error("Failed to parse {path}: {message}")]
    Parse {
        /// File involved
        path: String,
        /// Parser message
        message: String,
    },

    /// The configuration is structurally valid but unusable
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Errors that can occur while reading or writing resource documents
#[derive(Error, Debug)]
pub enum ResxError {
    /// Reading or writing the document failed
    #[error("Resource file I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The document is not well-formed XML
    #[error("Malformed resource document: {0}")]
    Xml(String),

    /// The translated values do not line up with the document's entries
    #[error("Expected {expected} translated values but got {actual}")]
    EntryCountMismatch {
        /// Entries found in the document
        expected: usize,
        /// Values supplied by the caller
        actual: usize,
    },
}

impl From<quick_xml::Error> for ResxError {
    fn from(error: quick_xml::Error) -> Self {
        Self::Xml(error.to_string())
    }
}
