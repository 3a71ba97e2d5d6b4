//! Echo cron jobs on a fixed schedule.

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::schema::{EnvSchema, FieldKind, FieldSpec};
use crate::timeutil::TimeFrame;

use super::{require_node_group, ClusterCtx, MAX_ECHO_SIZE};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct AddOnCronJobs {
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

    /// Cron schedule expression.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub schedule: String,
    pub completes: i32,
    pub parallels: i32,
    pub successful_jobs_history_limit: i32,
    pub failed_jobs_history_limit: i32,
    pub echo_size: i32,
}

impl EnvSchema for AddOnCronJobs {
    const ENV_PREFIX: &'static str = "ADD_ON_CRON_JOBS_";

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
            FieldSpec::writable("schedule", FieldKind::String),
            FieldSpec::writable("completes", FieldKind::I64),
            FieldSpec::writable("parallels", FieldKind::I64),
            FieldSpec::writable("successful-jobs-history-limit", FieldKind::I64),
            FieldSpec::writable("failed-jobs-history-limit", FieldKind::I64),
            FieldSpec::writable("echo-size", FieldKind::I64),
        ];
        SPECS
    }
}

impl AddOnCronJobs {
    pub fn new_default() -> Self {
        Self {
            schedule: "*/10 * * * *".to_string(),
            completes: 10,
            parallels: 10,
            successful_jobs_history_limit: 3,
            failed_jobs_history_limit: 1,
            echo_size: 100 * 1024,
            ..Default::default()
        }
    }

    pub fn validate(&mut self, ctx: &ClusterCtx) -> Result<(), Error> {
        require_node_group("add-on-cron-jobs", ctx)?;
        if self.namespace.is_empty() {
            self.namespace = format!("{}-cronjob", ctx.cluster_name);
        }
        if self.schedule.is_empty() {
            self.schedule = "*/10 * * * *".to_string();
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
    #[test]
    fn story_env_table_matches_struct() {
        crate::schema::verify::<super::AddOnCronJobs>().unwrap();
    }
}
