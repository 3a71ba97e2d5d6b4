//! Conformance runs via sonobuoy.
//!
//! ref. https://github.com/cncf/k8s-conformance/blob/master/instructions.md
//! ref. https://github.com/vmware-tanzu/sonobuoy

use serde::{Deserialize, Serialize};

use crate::duration::HumanDuration;
use crate::error::Error;
use crate::schema::{EnvSchema, FieldKind, FieldSpec};
use crate::timeutil::TimeFrame;

use super::{require_node_group, s3_key, ClusterCtx};

pub const DEFAULT_SONOBUOY_PATH: &str = "/tmp/sonobuoy";
pub const DEFAULT_SONOBUOY_DOWNLOAD_URL: &str =
    "https://github.com/vmware-tanzu/sonobuoy/releases/download/v0.56.16/sonobuoy_0.56.16_linux_amd64.tar.gz";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct AddOnConformance {
    pub enable: bool,
    pub created: bool,
    #[serde(skip_serializing_if = "TimeFrame::is_unset")]
    pub time_frame_create: TimeFrame,
    #[serde(skip_serializing_if = "TimeFrame::is_unset")]
    pub time_frame_delete: TimeFrame,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub s3_dir: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub namespace: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub sonobuoy_path: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub sonobuoy_download_url: String,
    /// File path to the e2e registry config, for air-gapped runs.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub sonobuoy_e2e_repo_config: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub sonobuoy_image: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub systemd_logs_image: String,

    #[serde(skip_serializing_if = "HumanDuration::is_zero")]
    pub sonobuoy_delete_timeout: HumanDuration,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub sonobuoy_delete_timeout_string: String,
    #[serde(skip_serializing_if = "HumanDuration::is_zero")]
    pub sonobuoy_run_timeout: HumanDuration,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub sonobuoy_run_timeout_string: String,

    /// One of "non-disruptive-conformance", "quick",
    /// "certified-conformance".
    #[serde(skip_serializing_if = "String::is_empty")]
    pub sonobuoy_run_mode: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub sonobuoy_run_kube_conformance_image: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub sonobuoy_run_e2e_focus: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub sonobuoy_run_e2e_skip: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub sonobuoy_result_tar_gz_path: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub sonobuoy_result_tar_gz_s3_key: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub sonobuoy_result_dir: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub sonobuoy_result_e2e_log_path: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub sonobuoy_result_e2e_log_s3_key: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub sonobuoy_result_junit_xml_path: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub sonobuoy_result_junit_xml_s3_key: String,
}

impl EnvSchema for AddOnConformance {
    const ENV_PREFIX: &'static str = "ADD_ON_CONFORMANCE_";

    fn field_specs() -> &'static [FieldSpec] {
        const SPECS: &[FieldSpec] = &[
            FieldSpec::writable("enable", FieldKind::Bool),
            FieldSpec::read_only("created", FieldKind::Bool),
            FieldSpec::read_only("time-frame-create", FieldKind::Nested),
            FieldSpec::read_only("time-frame-delete", FieldKind::Nested),
            FieldSpec::writable("s3-dir", FieldKind::String),
            FieldSpec::writable("namespace", FieldKind::String),
            FieldSpec::writable("sonobuoy-path", FieldKind::String),
            FieldSpec::writable("sonobuoy-download-url", FieldKind::String),
            FieldSpec::writable("sonobuoy-e2e-repo-config", FieldKind::String),
            FieldSpec::writable("sonobuoy-image", FieldKind::String),
            FieldSpec::writable("systemd-logs-image", FieldKind::String),
            FieldSpec::writable("sonobuoy-delete-timeout", FieldKind::Duration),
            FieldSpec::read_only("sonobuoy-delete-timeout-string", FieldKind::String),
            FieldSpec::writable("sonobuoy-run-timeout", FieldKind::Duration),
            FieldSpec::read_only("sonobuoy-run-timeout-string", FieldKind::String),
            FieldSpec::writable("sonobuoy-run-mode", FieldKind::String),
            FieldSpec::writable("sonobuoy-run-kube-conformance-image", FieldKind::String),
            FieldSpec::writable("sonobuoy-run-e2e-focus", FieldKind::String),
            FieldSpec::writable("sonobuoy-run-e2e-skip", FieldKind::String),
            FieldSpec::read_only("sonobuoy-result-tar-gz-path", FieldKind::String),
            FieldSpec::read_only("sonobuoy-result-tar-gz-s3-key", FieldKind::String),
            FieldSpec::read_only("sonobuoy-result-dir", FieldKind::String),
            FieldSpec::read_only("sonobuoy-result-e2e-log-path", FieldKind::String),
            FieldSpec::read_only("sonobuoy-result-e2e-log-s3-key", FieldKind::String),
            FieldSpec::read_only("sonobuoy-result-junit-xml-path", FieldKind::String),
            FieldSpec::read_only("sonobuoy-result-junit-xml-s3-key", FieldKind::String),
        ];
        SPECS
    }
}

fn valid_run_mode(mode: &str) -> bool {
    matches!(
        mode,
        "non-disruptive-conformance" | "quick" | "certified-conformance"
    )
}

impl AddOnConformance {
    pub fn new_default() -> Self {
        Self {
            sonobuoy_path: DEFAULT_SONOBUOY_PATH.to_string(),
            sonobuoy_download_url: DEFAULT_SONOBUOY_DOWNLOAD_URL.to_string(),
            ..Default::default()
        }
    }

    pub fn validate(&mut self, ctx: &ClusterCtx) -> Result<(), Error> {
        require_node_group("add-on-conformance", ctx)?;
        // conformance against managed node groups still fails a handful
        // of sig-network cases
        if ctx.managed_node_group_enabled {
            return Err(Error::validation(
                "add-on-conformance cannot run against managed node groups",
            ));
        }
        if self.s3_dir.is_empty() {
            self.s3_dir = ctx.s3_dir("conformance");
        }
        if self.namespace.is_empty() {
            self.namespace = ctx.namespace("conformance");
        }
        if self.sonobuoy_delete_timeout.is_zero() {
            self.sonobuoy_delete_timeout = HumanDuration::from_secs(5 * 60);
        }
        self.sonobuoy_delete_timeout_string = self.sonobuoy_delete_timeout.to_string();
        // "certified-conformance" takes >=3-hour
        if self.sonobuoy_run_timeout.is_zero() {
            self.sonobuoy_run_timeout = HumanDuration::from_secs(5 * 60 * 60);
        }
        self.sonobuoy_run_timeout_string = self.sonobuoy_run_timeout.to_string();
        if self.sonobuoy_run_mode.is_empty() {
            self.sonobuoy_run_mode = "certified-conformance".to_string();
        }
        if !valid_run_mode(&self.sonobuoy_run_mode) {
            return Err(Error::validation(format!(
                "unknown sonobuoy-run-mode {:?}",
                self.sonobuoy_run_mode
            )));
        }
        if self.sonobuoy_run_kube_conformance_image.is_empty() {
            self.sonobuoy_run_kube_conformance_image =
                format!("k8s.gcr.io/conformance:v{}.0", ctx.version);
        }
        self.sonobuoy_result_dir =
            ctx.sibling_path(&format!("{}-sonobuoy-results", ctx.cluster_name));
        if self.sonobuoy_result_e2e_log_path.is_empty() {
            self.sonobuoy_result_e2e_log_path =
                ctx.sibling_path(&format!("{}-sonobuoy-result.e2e.log", ctx.cluster_name));
        }
        if !self.sonobuoy_result_e2e_log_path.ends_with(".log") {
            return Err(Error::validation(format!(
                "sonobuoy-result-e2e-log-path {:?} must have '.log' extension",
                self.sonobuoy_result_e2e_log_path
            )));
        }
        if self.sonobuoy_result_e2e_log_s3_key.is_empty() {
            self.sonobuoy_result_e2e_log_s3_key =
                key_under_dir(&self.s3_dir, &self.sonobuoy_result_e2e_log_path);
        }
        if self.sonobuoy_result_tar_gz_path.is_empty() {
            self.sonobuoy_result_tar_gz_path =
                ctx.sibling_path(&format!("{}-sonobuoy-result.tar.gz", ctx.cluster_name));
        }
        if !self.sonobuoy_result_tar_gz_path.ends_with(".tar.gz") {
            return Err(Error::validation(format!(
                "sonobuoy-result-tar-gz-path {:?} must have '.tar.gz' extension",
                self.sonobuoy_result_tar_gz_path
            )));
        }
        if self.sonobuoy_result_tar_gz_s3_key.is_empty() {
            self.sonobuoy_result_tar_gz_s3_key =
                key_under_dir(&self.s3_dir, &self.sonobuoy_result_tar_gz_path);
        }
        if self.sonobuoy_result_junit_xml_path.is_empty() {
            self.sonobuoy_result_junit_xml_path =
                ctx.sibling_path(&format!("{}-sonobuoy-result.junit.xml", ctx.cluster_name));
        }
        if !self.sonobuoy_result_junit_xml_path.ends_with(".xml") {
            return Err(Error::validation(format!(
                "sonobuoy-result-junit-xml-path {:?} must have '.xml' extension",
                self.sonobuoy_result_junit_xml_path
            )));
        }
        if self.sonobuoy_result_junit_xml_s3_key.is_empty() {
            self.sonobuoy_result_junit_xml_s3_key =
                key_under_dir(&self.s3_dir, &self.sonobuoy_result_junit_xml_path);
        }
        Ok(())
    }
}

/// Results land directly under the add-on's S3 directory.
fn key_under_dir(s3_dir: &str, local_path: &str) -> String {
    let key = s3_key(s3_dir, "", local_path);
    key.replace("//", "/")
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
    fn story_env_table_matches_struct() {
        crate::schema::verify::<AddOnConformance>().unwrap();
    }

    #[test]
    fn story_run_mode_is_checked() {
        let mut add_on = AddOnConformance::new_default();
        add_on.enable = true;
        add_on.sonobuoy_run_mode = "slow".to_string();
        assert!(add_on.validate(&ctx()).is_err());

        add_on.sonobuoy_run_mode.clear();
        add_on.validate(&ctx()).unwrap();
        assert_eq!(add_on.sonobuoy_run_mode, "certified-conformance");
        assert_eq!(
            add_on.sonobuoy_run_kube_conformance_image,
            "k8s.gcr.io/conformance:v1.17.0"
        );
        assert_eq!(
            add_on.sonobuoy_result_e2e_log_path,
            "/tmp/c1-sonobuoy-result.e2e.log"
        );
        assert_eq!(
            add_on.sonobuoy_result_e2e_log_s3_key,
            "c1/add-on-conformance/c1-sonobuoy-result.e2e.log"
        );
    }

    #[test]
    fn story_managed_node_groups_rejected() {
        let mut add_on = AddOnConformance::new_default();
        add_on.enable = true;
        let mut c = ctx();
        c.managed_node_group_enabled = true;
        assert!(add_on.validate(&c).is_err());
    }
}
