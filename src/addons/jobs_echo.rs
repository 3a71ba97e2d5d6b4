//! Echo batch jobs writing fixed-size payloads.

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::schema::{EnvSchema, FieldKind, FieldSpec};
use crate::timeutil::TimeFrame;

use super::{require_node_group, ClusterCtx, MAX_ECHO_SIZE};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct AddOnJobsEcho {
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

    pub completes: i32,
    pub parallels: i32,
    pub echo_size: i32,
}

impl EnvSchema for AddOnJobsEcho {
    const ENV_PREFIX: &'static str = "ADD_ON_JOBS_ECHO_";

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
            FieldSpec::writable("completes", FieldKind::I64),
            FieldSpec::writable("parallels", FieldKind::I64),
            FieldSpec::writable("echo-size", FieldKind::I64),
        ];
        SPECS
    }
}

impl AddOnJobsEcho {
    pub fn new_default() -> Self {
        Self {
            completes: 10,
            parallels: 10,
            echo_size: 100 * 1024,
            ..Default::default()
        }
    }

    pub fn validate(&mut self, ctx: &ClusterCtx) -> Result<(), Error> {
        require_node_group("add-on-jobs-echo", ctx)?;
        if self.namespace.is_empty() {
            self.namespace = ctx.namespace("jobs-echo");
        }
        if self.echo_size as usize > MAX_ECHO_SIZE {
            return Err(Error::validation(format!(
                "echo size limit is 0.25 MB, got {}",
                self.echo_size
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::addons::ClusterCtx;

    #[test]
    fn story_env_table_matches_struct() {
        crate::schema::verify::<AddOnJobsEcho>().unwrap();
    }

    #[test]
    fn story_echo_size_is_bounded() {
        let mut add_on = AddOnJobsEcho::new_default();
        add_on.enable = true;
        add_on.echo_size = 300_000;
        let ctx = ClusterCtx {
            cluster_name: "c1".to_string(),
            node_group_enabled: true,
            ..Default::default()
        };
        let err = add_on.validate(&ctx).unwrap_err();
        assert!(err.to_string().contains("limit is 0.25 MB"));
    }
}
