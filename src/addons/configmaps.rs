//! Configmap writers, run from the host ("local") or from an
//! in-cluster deployment ("remote").

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::metrics::{RequestsCompare, RequestsSummary};
use crate::randutil;
use crate::schema::{EnvSchema, FieldKind, FieldSpec};
use crate::timeutil::TimeFrame;

use super::{
    fill_summary_slots, require_node_group, require_repository, ClusterCtx, SummarySlots,
    MAX_OBJECT_SIZE,
};

fn check_object_size(size: i32) -> Result<(), Error> {
    if size as usize > MAX_OBJECT_SIZE {
        return Err(Error::validation(format!(
            "ObjectSize limit is 0.9 MB, got {size}"
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct AddOnConfigmapsLocal {
    pub enable: bool,
    pub created: bool,
    #[serde(skip_serializing_if = "TimeFrame::is_unset")]
    pub time_frame_create: TimeFrame,
    #[serde(skip_serializing_if = "TimeFrame::is_unset")]
    pub time_frame_delete: TimeFrame,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    pub objects: i32,
    /// Bytes per configmap value, capped at 0.9 MB by the API server.
    pub object_size: i32,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub created_names: Vec<String>,

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
}

impl EnvSchema for AddOnConfigmapsLocal {
    const ENV_PREFIX: &'static str = "ADD_ON_CONFIGMAPS_LOCAL_";

    fn field_specs() -> &'static [FieldSpec] {
        const SPECS: &[FieldSpec] = &[
            FieldSpec::writable("enable", FieldKind::Bool),
            FieldSpec::read_only("created", FieldKind::Bool),
            FieldSpec::read_only("time-frame-create", FieldKind::Nested),
            FieldSpec::read_only("time-frame-delete", FieldKind::Nested),
            FieldSpec::writable("namespace", FieldKind::String),
            FieldSpec::writable("objects", FieldKind::I64),
            FieldSpec::writable("object-size", FieldKind::I64),
            FieldSpec::read_only("created-names", FieldKind::StringVec),
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
        ];
        SPECS
    }
}

impl AddOnConfigmapsLocal {
    pub fn new_default() -> Self {
        Self {
            objects: 10,
            object_size: 10 * 1024,
            ..Default::default()
        }
    }

    pub fn validate(&mut self, ctx: &ClusterCtx) -> Result<(), Error> {
        require_node_group("add-on-configmaps-local", ctx)?;
        check_object_size(self.object_size)?;
        if self.namespace.is_empty() {
            self.namespace = ctx.namespace("configmaps-local");
        }
        if self.objects == 0 {
            self.objects = 10;
        }
        if self.s3_dir.is_empty() {
            self.s3_dir = ctx.s3_dir("configmaps-local");
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
            "configmaps-local",
            "writes",
            &s3_dir,
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct AddOnConfigmapsRemote {
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
    pub objects: i32,
    pub object_size: i32,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub created_names: Vec<String>,

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
}

impl EnvSchema for AddOnConfigmapsRemote {
    const ENV_PREFIX: &'static str = "ADD_ON_CONFIGMAPS_REMOTE_";

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
            FieldSpec::writable("objects", FieldKind::I64),
            FieldSpec::writable("object-size", FieldKind::I64),
            FieldSpec::read_only("created-names", FieldKind::StringVec),
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
        ];
        SPECS
    }
}

impl AddOnConfigmapsRemote {
    pub fn new_default() -> Self {
        Self {
            deployment_replicas: 5,
            objects: 10,
            object_size: 10 * 1024,
            requests_summary_writes_output_name_prefix: format!(
                "configmaps-writes-{}",
                randutil::string(10)
            ),
            ..Default::default()
        }
    }

    pub fn validate(&mut self, ctx: &ClusterCtx) -> Result<(), Error> {
        require_node_group("add-on-configmaps-remote", ctx)?;
        require_repository(
            "add-on-configmaps-remote",
            &self.repository_account_id,
            &self.repository_name,
            &self.repository_image_tag,
        )?;
        check_object_size(self.object_size)?;
        if self.namespace.is_empty() {
            self.namespace = ctx.namespace("configmaps-remote");
        }
        if self.deployment_replicas == 0 {
            self.deployment_replicas = 5;
        }
        if self.objects == 0 {
            self.objects = 10;
        }
        if self.s3_dir.is_empty() {
            self.s3_dir = ctx.s3_dir("configmaps-remote");
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
            "configmaps-remote",
            "writes",
            &s3_dir,
        );
        if self.requests_summary_writes_output_name_prefix.is_empty() {
            self.requests_summary_writes_output_name_prefix =
                format!("configmaps-writes-{}", randutil::string(10));
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
            config_path: "/tmp/c1.doc".to_string(),
            version: "1.17".to_string(),
            version_value: 1.17,
            node_group_enabled: true,
            ..Default::default()
        }
    }

    #[test]
    fn story_env_tables_match_structs() {
        crate::schema::verify::<AddOnConfigmapsLocal>().unwrap();
        crate::schema::verify::<AddOnConfigmapsRemote>().unwrap();
    }

    /// Story: namespace and artifact paths fall out of the cluster name
    /// and the config file location, whatever its extension.
    #[test]
    fn story_defaults_derive_from_cluster_identity() {
        let mut add_on = AddOnConfigmapsLocal::new_default();
        add_on.enable = true;
        add_on.object_size = 1024;
        add_on.validate(&ctx()).unwrap();
        assert_eq!(add_on.namespace, "c1-configmaps-local");
        assert_eq!(
            add_on.requests_summary_writes_json_path,
            "/tmp/c1-configmaps-local-requests-summary-writes.json"
        );
    }

    #[test]
    fn story_object_size_is_bounded() {
        let mut add_on = AddOnConfigmapsLocal::new_default();
        add_on.enable = true;
        add_on.object_size = 1_000_000;
        let err = add_on.validate(&ctx()).unwrap_err();
        assert!(err.to_string().contains("ObjectSize limit is 0.9 MB"));
    }
}
