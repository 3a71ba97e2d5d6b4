//! Error types for the configuration core.

use thiserror::Error;

/// Main error type for configuration operations.
///
/// Every failure surfaces to the caller as one of these variants;
/// nothing is recovered inside the core. Overlay and validation are
/// all-or-nothing, so when an error is returned the configuration has
/// not been mutated or re-serialized.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Disk I/O failure while loading or saving the configuration file.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML/JSON processing failure outside the env channel.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The env channel supplied a value the field type cannot decode.
    #[error("failed to parse {value:?} for {key} ({reason})")]
    Parse {
        key: String,
        value: String,
        reason: String,
    },

    /// The embedded config document contained a field not in the schema.
    #[error("unknown field in config document: {0}")]
    UnknownField(String),

    /// The env channel attempted to set a read-only field.
    #[error("{key}={value:?} sets read-only field {field:?}; must not be set")]
    ReadOnlyField {
        key: String,
        value: String,
        field: String,
    },

    /// The env channel hit a field type the overlay engine cannot parse.
    #[error("{key} (field {field:?}) is not supported as an env")]
    UnsupportedFieldType { key: String, field: String },

    /// An add-on requires another add-on that is not enabled.
    #[error("{add_on} enabled but requires {dependency}, which is not enabled")]
    MissingDependency { add_on: String, dependency: String },

    /// An add-on requires a cloud resource reference that is empty.
    #[error("{add_on} requires {resource} but it is empty")]
    MissingResource { add_on: String, resource: String },

    /// A field value or field relationship violates an invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// The cluster version is below an add-on's minimum, or the upgrade
    /// delta is not exactly one minor step.
    #[error("version compatibility error: {0}")]
    VersionCompatibility(String),
}

impl Error {
    /// Create a serialization error with the given message.
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    /// Create a validation error with the given message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a version-compatibility error with the given message.
    pub fn version_compatibility(msg: impl Into<String>) -> Self {
        Self::VersionCompatibility(msg.into())
    }

    /// Create a parse error for an env key/value pair.
    pub fn parse(key: impl Into<String>, value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Parse {
            key: key.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a missing-dependency error.
    pub fn missing_dependency(add_on: impl Into<String>, dependency: impl Into<String>) -> Self {
        Self::MissingDependency {
            add_on: add_on.into(),
            dependency: dependency.into(),
        }
    }

    /// Create a missing-resource error.
    pub fn missing_resource(add_on: impl Into<String>, resource: impl Into<String>) -> Self {
        Self::MissingResource {
            add_on: add_on.into(),
            resource: resource.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Story: validation catches misconfigurations before any cloud call.
    ///
    /// When a user enables a workload add-on without a node group, the
    /// error names both sides so the fix is obvious.
    #[test]
    fn story_missing_dependency_names_both_add_ons() {
        let err = Error::missing_dependency("add-on-configmaps-local", "a node group add-on");
        let msg = err.to_string();
        assert!(msg.contains("add-on-configmaps-local"));
        assert!(msg.contains("node group"));
    }

    /// Story: read-only violations echo the offending env key.
    ///
    /// Operators drive the harness from CI env blocks; the error must
    /// point at the exact variable to delete.
    #[test]
    fn story_read_only_violation_points_at_env_key() {
        let err = Error::ReadOnlyField {
            key: "AWS_K8S_TESTER_EKS_ADD_ON_NODE_GROUPS_CREATED".to_string(),
            value: "true".to_string(),
            field: "created".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("AWS_K8S_TESTER_EKS_ADD_ON_NODE_GROUPS_CREATED"));
        assert!(msg.contains("read-only"));
    }

    /// Story: parse errors carry key, observed value, and reason.
    #[test]
    fn story_parse_error_carries_context() {
        let err = Error::parse("AWS_K8S_TESTER_EKS_CLIENTS", "many", "invalid digit");
        let msg = err.to_string();
        assert!(msg.contains("AWS_K8S_TESTER_EKS_CLIENTS"));
        assert!(msg.contains("many"));
        assert!(msg.contains("invalid digit"));
    }
}
