//! Error types for CAML view parsing and mutation.

use thiserror::Error;

/// A specialized Result type for CAML view operations.
pub type CamlResult<T> = Result<T, CamlError>;

/// Errors that can occur while parsing or mutating a CAML view.
///
/// Only hard failures are represented here. Unsupported filter shapes,
/// missing attributes and similar soft conditions are never errors; they are
/// reported as dropped/`None` results by the parsing functions.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CamlError {
    /// The view XML string is not well-formed.
    #[error("malformed view XML: {detail}")]
    MalformedXml {
        /// Description of the underlying XML parse failure.
        detail: String,
    },

    /// The document root element is not `View` (matched case-sensitively).
    #[error("expected root element 'View', found '{found}'")]
    WrongRootElement {
        /// The tag name that was found at the root.
        found: String,
    },

    /// `add_filters` was called with no usable filter fragments.
    #[error("no filter fragments provided")]
    EmptyFilterInput,

    /// The in-memory tree could not be serialized back to XML.
    #[error("failed to serialize view XML: {detail}")]
    Serialize {
        /// Description of the underlying serialization failure.
        detail: String,
    },

    /// An in-memory DOM operation failed.
    ///
    /// These failures come from the underlying tree library (for example an
    /// attempt to attach a node to itself) and indicate a bug in this crate
    /// rather than bad input.
    #[error("view DOM operation failed: {detail}")]
    Dom {
        /// Description of the underlying tree failure.
        detail: String,
    },
}

impl CamlError {
    /// Creates a malformed-XML error.
    pub fn malformed(detail: impl Into<String>) -> Self {
        CamlError::MalformedXml {
            detail: detail.into(),
        }
    }

    /// Creates a wrong-root-element error.
    pub fn wrong_root(found: impl Into<String>) -> Self {
        CamlError::WrongRootElement {
            found: found.into(),
        }
    }

    /// Creates a serialization error.
    pub fn serialize(detail: impl Into<String>) -> Self {
        CamlError::Serialize {
            detail: detail.into(),
        }
    }

    /// Creates an internal DOM operation error.
    pub fn dom(detail: impl Into<String>) -> Self {
        CamlError::Dom {
            detail: detail.into(),
        }
    }
}
