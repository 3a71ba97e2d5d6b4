//! Read/write stressers against configmaps and secrets, run from the
//! host ("local"), as an in-cluster deployment ("remote"), or as
//! scheduled cron jobs ("remote-v2").

use serde::{Deserialize, Serialize};

use crate::duration::HumanDuration;
use crate::error::Error;
use crate::metrics::{RequestsCompare, RequestsSummary};
use crate::randutil;
use crate::schema::{EnvSchema, FieldKind, FieldSpec};
use crate::timeutil::TimeFrame;

use super::{
    fill_summary_slots, require_node_group, require_repository, ClusterCtx, SummarySlots,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct AddOnStresserLocal {
    pub enable: bool,
    pub created: bool,
    #[serde(skip_serializing_if = "TimeFrame::is_unset")]
    pub time_frame_create: TimeFrame,
    #[serde(skip_serializing_if = "TimeFrame::is_unset")]
    pub time_frame_delete: TimeFrame,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    pub object_size: i32,
    /// List page size; 0 lets the API server choose.
    pub list_limit: i64,
    #[serde(skip_serializing_if = "HumanDuration::is_zero")]
    pub duration: HumanDuration,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub duration_string: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub s3_dir: String,

    #[serde(skip_serializing_if = "RequestsSummary::is_empty")]
    pub requests_summary_writes: RequestsSummary,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub requests_summary_writes_json_path: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub requests_summary_writes_json_s3_key: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub requests_summary_writes_table_path: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub requests_summary_writes_table_s3_key: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub requests_summary_writes_compare_s3_dir: String,
    pub requests_summary_writes_compare: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub requests_summary_writes_compare_json_path: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub requests_summary_writes_compare_json_s3_key: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub requests_summary_writes_compare_table_path: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub requests_summary_writes_compare_table_s3_key: String,
    #[serde(skip_serializing_if = "RequestsCompare::is_empty")]
    pub requests_summary_writes_compare_result: RequestsCompare,

    #[serde(skip_serializing_if = "RequestsSummary::is_empty")]
    pub requests_summary_reads: RequestsSummary,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub requests_summary_reads_json_path: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub requests_summary_reads_json_s3_key: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub requests_summary_reads_table_path: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub requests_summary_reads_table_s3_key: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub requests_summary_reads_compare_s3_dir: String,
    pub requests_summary_reads_compare: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub requests_summary_reads_compare_json_path: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub requests_summary_reads_compare_json_s3_key: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub requests_summary_reads_compare_table_path: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub requests_summary_reads_compare_table_s3_key: String,
    #[serde(skip_serializing_if = "RequestsCompare::is_empty")]
    pub requests_summary_reads_compare_result: RequestsCompare,
}

impl EnvSchema for AddOnStresserLocal {
    const ENV_PREFIX: &'static str = "ADD_ON_STRESSER_LOCAL_";

    fn field_specs() -> &'static [FieldSpec] {
        const SPECS: &[FieldSpec] = &[
            FieldSpec::writable("enable", FieldKind::Bool),
            FieldSpec::read_only("created", FieldKind::Bool),
            FieldSpec::read_only("time-frame-create", FieldKind::Nested),
            FieldSpec::read_only("time-frame-delete", FieldKind::Nested),
            FieldSpec::writable("namespace", FieldKind::String),
            FieldSpec::writable("object-size", FieldKind::I64),
            FieldSpec::writable("list-limit", FieldKind::I64),
            FieldSpec::writable("duration", FieldKind::Duration),
            FieldSpec::read_only("duration-string", FieldKind::String),
            FieldSpec::writable("s3-dir", FieldKind::String),
            FieldSpec::read_only("requests-summary-writes", FieldKind::Nested),
            FieldSpec::read_only("requests-summary-writes-json-path", FieldKind::String),
            FieldSpec::read_only("requests-summary-writes-json-s3-key", FieldKind::String),
            FieldSpec::read_only("requests-summary-writes-table-path", FieldKind::String),
            FieldSpec::read_only("requests-summary-writes-table-s3-key", FieldKind::String),
            FieldSpec::writable("requests-summary-writes-compare-s3-dir", FieldKind::String),
            FieldSpec::writable("requests-summary-writes-compare", FieldKind::Bool),
            FieldSpec::read_only("requests-summary-writes-compare-json-path", FieldKind::String),
            FieldSpec::read_only(
                "requests-summary-writes-compare-json-s3-key",
                FieldKind::String,
            ),
            FieldSpec::read_only(
                "requests-summary-writes-compare-table-path",
                FieldKind::String,
            ),
            FieldSpec::read_only(
                "requests-summary-writes-compare-table-s3-key",
                FieldKind::String,
            ),
            FieldSpec::read_only("requests-summary-writes-compare-result", FieldKind::Nested),
            FieldSpec::read_only("requests-summary-reads", FieldKind::Nested),
            FieldSpec::read_only("requests-summary-reads-json-path", FieldKind::String),
            FieldSpec::read_only("requests-summary-reads-json-s3-key", FieldKind::String),
            FieldSpec::read_only("requests-summary-reads-table-path", FieldKind::String),
            FieldSpec::read_only("requests-summary-reads-table-s3-key", FieldKind::String),
            FieldSpec::writable("requests-summary-reads-compare-s3-dir", FieldKind::String),
            FieldSpec::writable("requests-summary-reads-compare", FieldKind::Bool),
            FieldSpec::read_only("requests-summary-reads-compare-json-path", FieldKind::String),
            FieldSpec::read_only(
                "requests-summary-reads-compare-json-s3-key",
                FieldKind::String,
            ),
            FieldSpec::read_only(
                "requests-summary-reads-compare-table-path",
                FieldKind::String,
            ),
            FieldSpec::read_only(
                "requests-summary-reads-compare-table-s3-key",
                FieldKind::String,
            ),
            FieldSpec::read_only("requests-summary-reads-compare-result", FieldKind::Nested),
        ];
        SPECS
    }
}

impl AddOnStresserLocal {
    pub fn new_default() -> Self {
        Self {
            duration: HumanDuration::from_secs(60),
            ..Default::default()
        }
    }

    pub fn validate(&mut self, ctx: &ClusterCtx) -> Result<(), Error> {
        require_node_group("add-on-stresser-local", ctx)?;
        if self.namespace.is_empty() {
            self.namespace = ctx.namespace("stresser-local");
        }
        if self.duration.is_zero() {
            self.duration = HumanDuration::from_secs(60);
        }
        self.duration_string = self.duration.to_string();
        if self.s3_dir.is_empty() {
            self.s3_dir = ctx.s3_dir("stresser-local");
        }
        let s3_dir = self.s3_dir.clone();
        fill_summary_slots(
            SummarySlots {
                json_path: &mut self.requests_summary_writes_json_path,
                json_s3_key: &mut self.requests_summary_writes_json_s3_key,
                table_path: &mut self.requests_summary_writes_table_path,
                table_s3_key: &mut self.requests_summary_writes_table_s3_key,
                compare_s3_dir: &mut self.requests_summary_writes_compare_s3_dir,
                compare_json_path: &mut self.requests_summary_writes_compare_json_path,
                compare_json_s3_key: &mut self.requests_summary_writes_compare_json_s3_key,
                compare_table_path: &mut self.requests_summary_writes_compare_table_path,
                compare_table_s3_key: &mut self.requests_summary_writes_compare_table_s3_key,
            },
            ctx,
            "stresser-local",
            "writes",
            &s3_dir,
        );
        fill_summary_slots(
            SummarySlots {
                json_path: &mut self.requests_summary_reads_json_path,
                json_s3_key: &mut self.requests_summary_reads_json_s3_key,
                table_path: &mut self.requests_summary_reads_table_path,
                table_s3_key: &mut self.requests_summary_reads_table_s3_key,
                compare_s3_dir: &mut self.requests_summary_reads_compare_s3_dir,
                compare_json_path: &mut self.requests_summary_reads_compare_json_path,
                compare_json_s3_key: &mut self.requests_summary_reads_compare_json_s3_key,
                compare_table_path: &mut self.requests_summary_reads_compare_table_path,
                compare_table_s3_key: &mut self.requests_summary_reads_compare_table_s3_key,
            },
            ctx,
            "stresser-local",
            "reads",
            &s3_dir,
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct AddOnStresserRemote {
    pub enable: bool,
    pub created: bool,
    #[serde(skip_serializing_if = "TimeFrame::is_unset")]
    pub time_frame_create: TimeFrame,
    #[serde(skip_serializing_if = "TimeFrame::is_unset")]
    pub time_frame_delete: TimeFrame,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub namespace: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub repository_account_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub repository_region: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub repository_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub repository_image_tag: String,

    pub deployment_replicas: i32,
    pub object_size: i32,
    pub list_limit: i64,
    #[serde(skip_serializing_if = "HumanDuration::is_zero")]
    pub duration: HumanDuration,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub duration_string: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub s3_dir: String,

    #[serde(skip_serializing_if = "RequestsSummary::is_empty")]
    pub requests_summary_writes: RequestsSummary,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub requests_summary_writes_json_path: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub requests_summary_writes_json_s3_key: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub requests_summary_writes_table_path: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub requests_summary_writes_table_s3_key: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub requests_summary_writes_compare_s3_dir: String,
    pub requests_summary_writes_compare: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub requests_summary_writes_compare_json_path: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub requests_summary_writes_compare_json_s3_key: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub requests_summary_writes_compare_table_path: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub requests_summary_writes_compare_table_s3_key: String,
    #[serde(skip_serializing_if = "RequestsCompare::is_empty")]
    pub requests_summary_writes_compare_result: RequestsCompare,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub requests_summary_writes_output_name_prefix: String,

    #[serde(skip_serializing_if = "RequestsSummary::is_empty")]
    pub requests_summary_reads: RequestsSummary,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub requests_summary_reads_json_path: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub requests_summary_reads_json_s3_key: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub requests_summary_reads_table_path: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub requests_summary_reads_table_s3_key: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub requests_summary_reads_compare_s3_dir: String,
    pub requests_summary_reads_compare: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub requests_summary_reads_compare_json_path: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub requests_summary_reads_compare_json_s3_key: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub requests_summary_reads_compare_table_path: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub requests_summary_reads_compare_table_s3_key: String,
    #[serde(skip_serializing_if = "RequestsCompare::is_empty")]
    pub requests_summary_reads_compare_result: RequestsCompare,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub requests_summary_reads_output_name_prefix: String,
}

impl EnvSchema for AddOnStresserRemote {
    const ENV_PREFIX: &'static str = "ADD_ON_STRESSER_REMOTE_";

    fn field_specs() -> &'static [FieldSpec] {
        const SPECS: &[FieldSpec] = &[
            FieldSpec::writable("enable", FieldKind::Bool),
            FieldSpec::read_only("created", FieldKind::Bool),
            FieldSpec::read_only("time-frame-create", FieldKind::Nested),
            FieldSpec::read_only("time-frame-delete", FieldKind::Nested),
            FieldSpec::writable("namespace", FieldKind::String),
            FieldSpec::writable("repository-account-id", FieldKind::String),
            FieldSpec::writable("repository-region", FieldKind::String),
            FieldSpec::writable("repository-name", FieldKind::String),
            FieldSpec::writable("repository-image-tag", FieldKind::String),
            FieldSpec::writable("deployment-replicas", FieldKind::I64),
            FieldSpec::writable("object-size", FieldKind::I64),
            FieldSpec::writable("list-limit", FieldKind::I64),
            FieldSpec::writable("duration", FieldKind::Duration),
            FieldSpec::read_only("duration-string", FieldKind::String),
            FieldSpec::writable("s3-dir", FieldKind::String),
            FieldSpec::read_only("requests-summary-writes", FieldKind::Nested),
            FieldSpec::read_only("requests-summary-writes-json-path", FieldKind::String),
            FieldSpec::read_only("requests-summary-writes-json-s3-key", FieldKind::String),
            FieldSpec::read_only("requests-summary-writes-table-path", FieldKind::String),
            FieldSpec::read_only("requests-summary-writes-table-s3-key", FieldKind::String),
            FieldSpec::writable("requests-summary-writes-compare-s3-dir", FieldKind::String),
            FieldSpec::writable("requests-summary-writes-compare", FieldKind::Bool),
            FieldSpec::read_only("requests-summary-writes-compare-json-path", FieldKind::String),
            FieldSpec::read_only(
                "requests-summary-writes-compare-json-s3-key",
                FieldKind::String,
            ),
            FieldSpec::read_only(
                "requests-summary-writes-compare-table-path",
                FieldKind::String,
            ),
            FieldSpec::read_only(
                "requests-summary-writes-compare-table-s3-key",
                FieldKind::String,
            ),
            FieldSpec::read_only("requests-summary-writes-compare-result", FieldKind::Nested),
            FieldSpec::writable(
                "requests-summary-writes-output-name-prefix",
                FieldKind::String,
            ),
            FieldSpec::read_only("requests-summary-reads", FieldKind::Nested),
            FieldSpec::read_only("requests-summary-reads-json-path", FieldKind::String),
            FieldSpec::read_only("requests-summary-reads-json-s3-key", FieldKind::String),
            FieldSpec::read_only("requests-summary-reads-table-path", FieldKind::String),
            FieldSpec::read_only("requests-summary-reads-table-s3-key", FieldKind::String),
            FieldSpec::writable("requests-summary-reads-compare-s3-dir", FieldKind::String),
            FieldSpec::writable("requests-summary-reads-compare", FieldKind::Bool),
            FieldSpec::read_only("requests-summary-reads-compare-json-path", FieldKind::String),
            FieldSpec::read_only(
                "requests-summary-reads-compare-json-s3-key",
                FieldKind::String,
            ),
            FieldSpec::read_only(
                "requests-summary-reads-compare-table-path",
                FieldKind::String,
            ),
            FieldSpec::read_only(
                "requests-summary-reads-compare-table-s3-key",
                FieldKind::String,
            ),
            FieldSpec::read_only("requests-summary-reads-compare-result", FieldKind::Nested),
            FieldSpec::writable(
                "requests-summary-reads-output-name-prefix",
                FieldKind::String,
            ),
        ];
        SPECS
    }
}

impl AddOnStresserRemote {
    pub fn new_default() -> Self {
        Self {
            deployment_replicas: 5,
            duration: HumanDuration::from_secs(60),
            requests_summary_writes_output_name_prefix: format!(
                "stresser-writes-{}",
                randutil::string(10)
            ),
            requests_summary_reads_output_name_prefix: format!(
                "stresser-reads-{}",
                randutil::string(10)
            ),
            ..Default::default()
        }
    }

    pub fn validate(&mut self, ctx: &ClusterCtx) -> Result<(), Error> {
        require_node_group("add-on-stresser-remote", ctx)?;
        require_repository(
            "add-on-stresser-remote",
            &self.repository_account_id,
            &self.repository_name,
            &self.repository_image_tag,
        )?;
        if self.namespace.is_empty() {
            self.namespace = ctx.namespace("stresser-remote");
        }
        if self.deployment_replicas == 0 {
            self.deployment_replicas = 5;
        }
        if self.duration.is_zero() {
            self.duration = HumanDuration::from_secs(60);
        }
        self.duration_string = self.duration.to_string();
        if self.s3_dir.is_empty() {
            self.s3_dir = ctx.s3_dir("stresser-remote");
        }
        let s3_dir = self.s3_dir.clone();
        fill_summary_slots(
            SummarySlots {
                json_path: &mut self.requests_summary_writes_json_path,
                json_s3_key: &mut self.requests_summary_writes_json_s3_key,
                table_path: &mut self.requests_summary_writes_table_path,
                table_s3_key: &mut self.requests_summary_writes_table_s3_key,
                compare_s3_dir: &mut self.requests_summary_writes_compare_s3_dir,
                compare_json_path: &mut self.requests_summary_writes_compare_json_path,
                compare_json_s3_key: &mut self.requests_summary_writes_compare_json_s3_key,
                compare_table_path: &mut self.requests_summary_writes_compare_table_path,
                compare_table_s3_key: &mut self.requests_summary_writes_compare_table_s3_key,
            },
            ctx,
            "stresser-remote",
            "writes",
            &s3_dir,
        );
        fill_summary_slots(
            SummarySlots {
                json_path: &mut self.requests_summary_reads_json_path,
                json_s3_key: &mut self.requests_summary_reads_json_s3_key,
                table_path: &mut self.requests_summary_reads_table_path,
                table_s3_key: &mut self.requests_summary_reads_table_s3_key,
                compare_s3_dir: &mut self.requests_summary_reads_compare_s3_dir,
                compare_json_path: &mut self.requests_summary_reads_compare_json_path,
                compare_json_s3_key: &mut self.requests_summary_reads_compare_json_s3_key,
                compare_table_path: &mut self.requests_summary_reads_compare_table_path,
                compare_table_s3_key: &mut self.requests_summary_reads_compare_table_s3_key,
            },
            ctx,
            "stresser-remote",
            "reads",
            &s3_dir,
        );
        if self.requests_summary_writes_output_name_prefix.is_empty() {
            self.requests_summary_writes_output_name_prefix =
                format!("stresser-writes-{}", randutil::string(10));
        }
        if self.requests_summary_reads_output_name_prefix.is_empty() {
            self.requests_summary_reads_output_name_prefix =
                format!("stresser-reads-{}", randutil::string(10));
        }
        Ok(())
    }
}

/// Cron-scheduled stresser; each run writes configmaps and secrets
/// with several coroutines per pod.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct AddOnStresserRemoteV2 {
    pub enable: bool,
    pub created: bool,
    #[serde(skip_serializing_if = "TimeFrame::is_unset")]
    pub time_frame_create: TimeFrame,
    #[serde(skip_serializing_if = "TimeFrame::is_unset")]
    pub time_frame_delete: TimeFrame,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub namespace: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub repository_account_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub repository_region: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub repository_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub repository_image_tag: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub repository_busybox_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub repository_busybox_image_tag: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub schedule: String,
    pub completes: i32,
    pub parallels: i32,
    pub successful_jobs_history_limit: i32,
    pub failed_jobs_history_limit: i32,

    pub object_size: i32,
    #[serde(skip_serializing_if = "HumanDuration::is_zero")]
    pub duration: HumanDuration,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub duration_string: String,
    pub coroutines: i32,
    pub secrets: i32,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub s3_dir: String,
}

impl EnvSchema for AddOnStresserRemoteV2 {
    const ENV_PREFIX: &'static str = "ADD_ON_STRESSER_REMOTE_V2_";

    fn field_specs() -> &'static [FieldSpec] {
        const SPECS: &[FieldSpec] = &[
            FieldSpec::writable("enable", FieldKind::Bool),
            FieldSpec::read_only("created", FieldKind::Bool),
            FieldSpec::read_only("time-frame-create", FieldKind::Nested),
            FieldSpec::read_only("time-frame-delete", FieldKind::Nested),
            FieldSpec::writable("namespace", FieldKind::String),
            FieldSpec::writable("repository-account-id", FieldKind::String),
            FieldSpec::writable("repository-region", FieldKind::String),
            FieldSpec::writable("repository-name", FieldKind::String),
            FieldSpec::writable("repository-image-tag", FieldKind::String),
            FieldSpec::writable("repository-busybox-name", FieldKind::String),
            FieldSpec::writable("repository-busybox-image-tag", FieldKind::String),
            FieldSpec::writable("schedule", FieldKind::String),
            FieldSpec::writable("completes", FieldKind::I64),
            FieldSpec::writable("parallels", FieldKind::I64),
            FieldSpec::writable("successful-jobs-history-limit", FieldKind::I64),
            FieldSpec::writable("failed-jobs-history-limit", FieldKind::I64),
            FieldSpec::writable("object-size", FieldKind::I64),
            FieldSpec::writable("duration", FieldKind::Duration),
            FieldSpec::read_only("duration-string", FieldKind::String),
            FieldSpec::writable("coroutines", FieldKind::I64),
            FieldSpec::writable("secrets", FieldKind::I64),
            FieldSpec::writable("s3-dir", FieldKind::String),
        ];
        SPECS
    }
}

impl AddOnStresserRemoteV2 {
    pub fn new_default() -> Self {
        Self {
            schedule: "0 */6 * * *".to_string(),
            completes: 10,
            parallels: 10,
            successful_jobs_history_limit: 3,
            failed_jobs_history_limit: 1,
            object_size: 8,
            duration: HumanDuration::from_secs(600),
            coroutines: 10,
            secrets: 10,
            ..Default::default()
        }
    }

    pub fn validate(&mut self, ctx: &ClusterCtx) -> Result<(), Error> {
        require_node_group("add-on-stresser-remote-v2", ctx)?;
        require_repository(
            "add-on-stresser-remote-v2",
            &self.repository_account_id,
            &self.repository_name,
            &self.repository_image_tag,
        )?;
        if self.namespace.is_empty() {
            self.namespace = ctx.namespace("stresser-remote-v2");
        }
        if self.schedule.is_empty() {
            self.schedule = "0 */6 * * *".to_string();
        }
        if self.duration.is_zero() {
            self.duration = HumanDuration::from_secs(600);
        }
        self.duration_string = self.duration.to_string();
        if self.coroutines <= 0 {
            self.coroutines = 10;
        }
        if self.s3_dir.is_empty() {
            self.s3_dir = ctx.s3_dir("stresser-remote-v2");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::addons::ClusterCtx;

    fn ctx() -> ClusterCtx {
        ClusterCtx {
            cluster_name: "c1".to_string(),
            config_path: "/tmp/c1.yaml".to_string(),
            version: "1.17".to_string(),
            version_value: 1.17,
            node_group_enabled: true,
            ..Default::default()
        }
    }

    #[test]
    fn story_env_tables_match_structs() {
        crate::schema::verify::<AddOnStresserLocal>().unwrap();
        crate::schema::verify::<AddOnStresserRemote>().unwrap();
        crate::schema::verify::<AddOnStresserRemoteV2>().unwrap();
    }

    /// Story: duration-string is a derived echo of the parsed duration,
    /// refreshed on every validation.
    #[test]
    fn story_duration_string_echoes_duration() {
        let mut add_on = AddOnStresserLocal::new_default();
        add_on.enable = true;
        add_on.duration = "5m".parse().unwrap();
        add_on.validate(&ctx()).unwrap();
        assert_eq!(add_on.duration_string, "5m");
    }
}
