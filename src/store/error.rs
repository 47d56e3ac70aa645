//! Structured store errors with operation context

use std::fmt;

use crate::error::Error;

/// Store operation being performed when the error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOperation {
    /// Inserting a document
    Insert,
    /// Fetching a document by id
    Get,
    /// Executing a query plan
    Find,
    /// Replacing or patching a document
    Update,
    /// Deleting a document
    Delete,
}

impl fmt::Display for StoreOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Insert => write!(f, "insert"),
            Self::Get => write!(f, "get"),
            Self::Find => write!(f, "find"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// Category of store error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorKind {
    /// Document not found
    NotFound,
    /// Unique constraint violated
    AlreadyExists,
    /// Other/unknown error
    Other,
}

impl fmt::Display for StoreErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::AlreadyExists => write!(f, "already_exists"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// Structured store error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreError {
    /// The operation being performed when the error occurred
    pub operation: StoreOperation,
    /// The category of error
    pub kind: StoreErrorKind,
    /// Human-readable error message
    pub message: String,
    /// The collection involved
    pub collection: Option<String>,
    /// The document id involved
    pub id: Option<String>,
}

impl StoreError {
    /// Create a new store error
    pub fn new(operation: StoreOperation, kind: StoreErrorKind, message: impl Into<String>) -> Self {
        Self {
            operation,
            kind,
            message: message.into(),
            collection: None,
            id: None,
        }
    }

    /// A document lookup came up empty
    pub fn not_found(
        operation: StoreOperation,
        collection: impl Into<String>,
        id: impl Into<String>,
    ) -> Self {
        Self {
            operation,
            kind: StoreErrorKind::NotFound,
            message: "No document found with that ID".to_string(),
            collection: Some(collection.into()),
            id: Some(id.into()),
        }
    }

    /// A unique field group already holds the given values
    pub fn already_exists(
        operation: StoreOperation,
        collection: impl Into<String>,
        fields: &[&str],
    ) -> Self {
        Self {
            operation,
            kind: StoreErrorKind::AlreadyExists,
            message: format!("Duplicate value for field(s): {}", fields.join(", ")),
            collection: Some(collection.into()),
            id: None,
        }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Store {} error during {}: {}",
            self.kind, self.operation, self.message
        )?;
        if let Some(ref collection) = self.collection {
            write!(f, " [collection: {}]", collection)?;
        }
        if let Some(ref id) = self.id {
            write!(f, " [id: {}]", id)?;
        }
        Ok(())
    }
}

impl std::error::Error for StoreError {}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        match err.kind {
            StoreErrorKind::NotFound => Error::NotFound(err.message),
            StoreErrorKind::AlreadyExists => Error::Conflict(err.message),
            StoreErrorKind::Other => Error::Internal(err.to_string()),
        }
    }
}
