use thiserror::Error;

use crate::model::UnknownDataType;

/// Errors reported by a [`SearchService`](crate::SearchService) implementation.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    Conflict(String),

    #[error("Rejected by search service: {0}")]
    Rejected(String),

    #[error("Search service unavailable: {0}")]
    Unavailable(String),

    #[error("Failed to access service snapshot: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to (de)serialize service snapshot: {0}")]
    Snapshot(#[from] serde_json::Error),
}

/// Why creating a crawled or managed property failed.
#[derive(Debug, Error)]
pub enum CreateFailure {
    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error(transparent)]
    DataType(#[from] UnknownDataType),

    #[error("\"{0}\" attribute is missing")]
    MissingAttribute(&'static str),

    #[error("invalid PropSetId \"{value}\": {source}")]
    PropSetId {
        value: String,
        #[source]
        source: uuid::Error,
    },

    #[error("invalid VariantType \"{value}\": {source}")]
    VariantType {
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },
}

/// Fatal errors. Any of these aborts the reconciliation pass; changes
/// applied before the error stay in place.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("Search service application was not found: {0}")]
    ServiceUnavailable(#[source] ServiceError),

    #[error("Exception has been thrown while creating crawled property {name}: {source}")]
    CreateCrawledProperty {
        name: String,
        #[source]
        source: CreateFailure,
    },

    #[error("Exception has been thrown while creating managed property {name}: {source}")]
    CreateManagedProperty {
        name: String,
        #[source]
        source: CreateFailure,
    },

    #[error("Content source of type \"{0}\" is not supported.")]
    UnsupportedContentSourceType(String),

    #[error("Start address \"{address}\" is not a valid URI: {reason}")]
    InvalidStartAddress { address: String, reason: String },

    #[error("Start address \"{0}\" uses {{sitecollection}} but no site context was supplied")]
    MissingSiteContext(String),

    #[error("Attribute \"{attribute}\" has invalid value \"{value}\"")]
    InvalidAttribute {
        attribute: &'static str,
        value: String,
    },

    #[error("Search service error: {0}")]
    Service(#[from] ServiceError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_failure_message_carries_cause() {
        let err = ReconcileError::CreateManagedProperty {
            name: "Title".to_string(),
            source: CreateFailure::from(UnknownDataType("FooBar".to_string())),
        };
        assert_eq!(
            err.to_string(),
            "Exception has been thrown while creating managed property Title: unknown managed data type \"FooBar\""
        );
    }

    #[test]
    fn test_site_context_message_keeps_placeholder() {
        let err = ReconcileError::MissingSiteContext("{sitecollection}/".to_string());
        assert!(err.to_string().contains("uses {sitecollection}"));
    }
}
