//! Error taxonomy for translation requests
//!
//! Every failure surfaced by the engine carries exactly one kind:
//! - XLATE_NOT_FOUND: path names no schema node, or addressed data is absent
//! - XLATE_INVALID_ARGS: malformed path, payload or query parameter, or a rule violation
//! - XLATE_NOT_SUPPORTED: a hook or the engine refuses the operation
//! - XLATE_ALREADY_EXISTS: create on an exclusive list entry that is present
//! - XLATE_INTERNAL: store failure or schema/hook inconsistency
//!
//! Messages are meant for operators and are returned verbatim to clients.

use std::fmt;

use crate::store::StoreError;

/// Error kinds surfaced to transport collaborators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum XlateErrorCode {
    /// Unknown path element or missing data
    NotFound,
    /// Malformed input or rule violation
    InvalidArgs,
    /// Operation refused at this node
    NotSupported,
    /// Exclusive create on an existing entry
    AlreadyExists,
    /// Store or schema inconsistency
    Internal,
}

impl XlateErrorCode {
    /// Returns the stable string code
    pub fn code(&self) -> &'static str {
        match self {
            XlateErrorCode::NotFound => "XLATE_NOT_FOUND",
            XlateErrorCode::InvalidArgs => "XLATE_INVALID_ARGS",
            XlateErrorCode::NotSupported => "XLATE_NOT_SUPPORTED",
            XlateErrorCode::AlreadyExists => "XLATE_ALREADY_EXISTS",
            XlateErrorCode::Internal => "XLATE_INTERNAL",
        }
    }

    /// HTTP status a RESTCONF front end would answer with
    pub fn status_code(&self) -> u16 {
        match self {
            XlateErrorCode::NotFound => 404,
            XlateErrorCode::InvalidArgs => 400,
            XlateErrorCode::NotSupported => 405,
            XlateErrorCode::AlreadyExists => 409,
            XlateErrorCode::Internal => 500,
        }
    }
}

impl fmt::Display for XlateErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Translation error with kind, message and the offending path when known
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XlateError {
    code: XlateErrorCode,
    message: String,
    path: Option<String>,
}

impl XlateError {
    pub fn new(code: XlateErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            path: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(XlateErrorCode::NotFound, message)
    }

    pub fn invalid_args(message: impl Into<String>) -> Self {
        Self::new(XlateErrorCode::InvalidArgs, message)
    }

    pub fn not_supported(message: impl Into<String>) -> Self {
        Self::new(XlateErrorCode::NotSupported, message)
    }

    pub fn already_exists(message: impl Into<String>) -> Self {
        Self::new(XlateErrorCode::AlreadyExists, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(XlateErrorCode::Internal, message)
    }

    /// Requested node exists in the schema but has no data source
    pub fn not_implemented() -> Self {
        Self::not_supported("Not implemented")
    }

    /// Generic missing-resource error
    pub fn resource_not_found() -> Self {
        Self::not_found("Resource not found")
    }

    /// Attach the offending path
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn code(&self) -> XlateErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn status_code(&self) -> u16 {
        self.code.status_code()
    }

    /// True when this error carries the given kind
    pub fn is(&self, code: XlateErrorCode) -> bool {
        self.code == code
    }
}

impl fmt::Display for XlateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(ref path) = self.path {
            write!(f, " (path: {})", path)?;
        }
        Ok(())
    }
}

impl std::error::Error for XlateError {}

impl From<StoreError> for XlateError {
    fn from(e: StoreError) -> Self {
        Self::internal(format!("Store failure: {}", e))
    }
}

impl From<serde_json::Error> for XlateError {
    fn from(e: serde_json::Error) -> Self {
        Self::invalid_args(format!("Malformed JSON: {}", e))
    }
}

/// Result type used throughout the crate
pub type XlateResult<T> = Result<T, XlateError>;
