//! Fluentd log collector daemonset.

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::schema::{EnvSchema, FieldKind, FieldSpec};
use crate::timeutil::TimeFrame;

use super::{require_node_group, ClusterCtx};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct AddOnFluentd {
    pub enable: bool,
    pub created: bool,
    #[serde(skip_serializing_if = "TimeFrame::is_unset")]
    pub time_frame_create: TimeFrame,
    #[serde(skip_serializing_if = "TimeFrame::is_unset")]
    pub time_frame_delete: TimeFrame,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub namespace: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub repository_busybox_account_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub repository_busybox_region: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub repository_busybox_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub repository_busybox_image_tag: String,

    pub threads: i64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub metadata_log_level: String,
    pub metadata_cache_size: i64,
    pub metadata_watch: bool,
    pub metadata_skip_labels: bool,
    pub metadata_skip_master_url: bool,
    pub metadata_skip_container_metadata: bool,
    pub metadata_skip_namespace_metadata: bool,
}

impl EnvSchema for AddOnFluentd {
    const ENV_PREFIX: &'static str = "ADD_ON_FLUENTD_";

    fn field_specs() -> &'static [FieldSpec] {
        const SPECS: &[FieldSpec] = &[
            FieldSpec::writable("enable", FieldKind::Bool),
            FieldSpec::read_only("created", FieldKind::Bool),
            FieldSpec::read_only("time-frame-create", FieldKind::Nested),
            FieldSpec::read_only("time-frame-delete", FieldKind::Nested),
            FieldSpec::writable("namespace", FieldKind::String),
            FieldSpec::writable("repository-busybox-account-id", FieldKind::String),
            FieldSpec::writable("repository-busybox-region", FieldKind::String),
            FieldSpec::writable("repository-busybox-name", FieldKind::String),
            FieldSpec::writable("repository-busybox-image-tag", FieldKind::String),
            FieldSpec::writable("threads", FieldKind::I64),
            FieldSpec::writable("metadata-log-level", FieldKind::String),
            FieldSpec::writable("metadata-cache-size", FieldKind::I64),
            FieldSpec::writable("metadata-watch", FieldKind::Bool),
            FieldSpec::writable("metadata-skip-labels", FieldKind::Bool),
            FieldSpec::writable("metadata-skip-master-url", FieldKind::Bool),
            FieldSpec::writable("metadata-skip-container-metadata", FieldKind::Bool),
            FieldSpec::writable("metadata-skip-namespace-metadata", FieldKind::Bool),
        ];
        SPECS
    }
}

impl AddOnFluentd {
    pub fn new_default() -> Self {
        Self {
            threads: 8,
            metadata_log_level: "warn".to_string(),
            metadata_cache_size: 20_000,
            metadata_skip_labels: true,
            metadata_skip_master_url: true,
            metadata_skip_container_metadata: true,
            metadata_skip_namespace_metadata: true,
            ..Default::default()
        }
    }

    pub fn validate(&mut self, ctx: &ClusterCtx) -> Result<(), Error> {
        require_node_group("add-on-fluentd", ctx)?;
        if self.namespace.is_empty() {
            self.namespace = ctx.namespace("fluentd");
        }
        if self.threads <= 0 {
            self.threads = 8;
        }
        if self.metadata_log_level.is_empty() {
            self.metadata_log_level = "warn".to_string();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn story_env_table_matches_struct() {
        crate::schema::verify::<super::AddOnFluentd>().unwrap();
    }
}
