//! Domain-level error taxonomy for refcheck.

/// Errors produced while evaluating a guideline against a result set.
#[derive(Debug, thiserror::Error)]
pub enum ComplianceError {
    #[error("guideline schema version '{version}' is not supported (supported: 1.2, 1.3, 1.4, 1.5)")]
    UnsupportedSchema { version: String },

    #[error("guideline document is missing the 'schema' field")]
    MissingSchema,

    #[error("capability '{capability}' is listed by a component but not defined in the guideline")]
    MissingCapability { capability: String },

    #[error("capability '{capability}' could not be decoded: {source}")]
    InvalidCapability {
        capability: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for refcheck domain operations.
pub type Result<T> = std::result::Result<T, ComplianceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_schema_names_version_and_supported_set() {
        let err = ComplianceError::UnsupportedSchema {
            version: "2.0".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("'2.0'"));
        assert!(msg.contains("1.2, 1.3, 1.4, 1.5"));
    }

    #[test]
    fn missing_capability_names_capability() {
        let err = ComplianceError::MissingCapability {
            capability: "compute-servers-create".to_string(),
        };
        assert!(err.to_string().contains("compute-servers-create"));
    }

    #[test]
    fn invalid_capability_names_capability_and_cause() {
        let source = serde_json::from_str::<Vec<String>>("{}").unwrap_err();
        let err = ComplianceError::InvalidCapability {
            capability: "compute-images-list".to_string(),
            source,
        };
        let msg = err.to_string();
        assert!(msg.contains("'compute-images-list'"));
        assert!(msg.contains("invalid type"));
    }

    #[test]
    fn serde_error_converts() {
        let parse = serde_json::from_str::<serde_json::Value>("{not json");
        let err: ComplianceError = parse.unwrap_err().into();
        assert!(err.to_string().starts_with("serialization error"));
    }
}
