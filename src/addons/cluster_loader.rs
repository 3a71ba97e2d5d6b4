//! clusterloader2 runs, from the host ("local") or from an in-cluster
//! pod ("remote").
//!
//! ref. https://github.com/kubernetes/perf-tests/tree/master/clusterloader2

use serde::{Deserialize, Serialize};

use crate::duration::HumanDuration;
use crate::error::Error;
use crate::schema::{EnvSchema, FieldKind, FieldSpec};
use crate::timeutil::TimeFrame;

use super::{require_node_group, require_repository, s3_key, ClusterCtx};

pub const DEFAULT_CLUSTER_LOADER_PATH: &str = "/tmp/clusterloader2";
pub const DEFAULT_CLUSTER_LOADER_DOWNLOAD_URL: &str =
    "https://github.com/aws/aws-k8s-tester/releases/download/v1.3.9/clusterloader2-linux-amd64";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct AddOnClusterLoaderLocal {
    pub enable: bool,
    pub created: bool,
    #[serde(skip_serializing_if = "TimeFrame::is_unset")]
    pub time_frame_create: TimeFrame,
    #[serde(skip_serializing_if = "TimeFrame::is_unset")]
    pub time_frame_delete: TimeFrame,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub s3_dir: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub cluster_loader_path: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub cluster_loader_download_url: String,
    /// clusterloader2 test config file, required.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub test_config_path: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub report_dir: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub report_tar_gz_path: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub report_tar_gz_s3_key: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub log_path: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub log_s3_key: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub pod_startup_latency_path: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub pod_startup_latency_s3_key: String,

    pub runs: i32,
    #[serde(skip_serializing_if = "HumanDuration::is_zero")]
    pub timeout: HumanDuration,

    pub nodes: i32,
    pub nodes_per_namespace: i32,
    pub pods_per_node: i32,
    pub big_group_size: i32,
    pub medium_group_size: i32,
    pub small_group_size: i32,
    pub small_stateful_sets_per_namespace: i32,
    pub medium_stateful_sets_per_namespace: i32,
    pub cl2_load_test_throughput: i32,
    pub cl2_enable_pvs: bool,
    pub prometheus_scrape_kube_proxy: bool,
    pub enable_system_pod_metrics: bool,
}

impl EnvSchema for AddOnClusterLoaderLocal {
    const ENV_PREFIX: &'static str = "ADD_ON_CLUSTER_LOADER_LOCAL_";

    fn field_specs() -> &'static [FieldSpec] {
        const SPECS: &[FieldSpec] = &[
            FieldSpec::writable("enable", FieldKind::Bool),
            FieldSpec::read_only("created", FieldKind::Bool),
            FieldSpec::read_only("time-frame-create", FieldKind::Nested),
            FieldSpec::read_only("time-frame-delete", FieldKind::Nested),
            FieldSpec::writable("s3-dir", FieldKind::String),
            FieldSpec::writable("cluster-loader-path", FieldKind::String),
            FieldSpec::writable("cluster-loader-download-url", FieldKind::String),
            FieldSpec::writable("test-config-path", FieldKind::String),
            FieldSpec::writable("report-dir", FieldKind::String),
            FieldSpec::read_only("report-tar-gz-path", FieldKind::String),
            FieldSpec::read_only("report-tar-gz-s3-key", FieldKind::String),
            FieldSpec::read_only("log-path", FieldKind::String),
            FieldSpec::read_only("log-s3-key", FieldKind::String),
            FieldSpec::read_only("pod-startup-latency-path", FieldKind::String),
            FieldSpec::read_only("pod-startup-latency-s3-key", FieldKind::String),
            FieldSpec::writable("runs", FieldKind::I64),
            FieldSpec::writable("timeout", FieldKind::Duration),
            FieldSpec::writable("nodes", FieldKind::I64),
            FieldSpec::writable("nodes-per-namespace", FieldKind::I64),
            FieldSpec::writable("pods-per-node", FieldKind::I64),
            FieldSpec::writable("big-group-size", FieldKind::I64),
            FieldSpec::writable("medium-group-size", FieldKind::I64),
            FieldSpec::writable("small-group-size", FieldKind::I64),
            FieldSpec::writable("small-stateful-sets-per-namespace", FieldKind::I64),
            FieldSpec::writable("medium-stateful-sets-per-namespace", FieldKind::I64),
            FieldSpec::writable("cl2-load-test-throughput", FieldKind::I64),
            FieldSpec::writable("cl2-enable-pvs", FieldKind::Bool),
            FieldSpec::writable("prometheus-scrape-kube-proxy", FieldKind::Bool),
            FieldSpec::writable("enable-system-pod-metrics", FieldKind::Bool),
        ];
        SPECS
    }
}

impl AddOnClusterLoaderLocal {
    pub fn new_default() -> Self {
        Self {
            cluster_loader_path: DEFAULT_CLUSTER_LOADER_PATH.to_string(),
            cluster_loader_download_url: DEFAULT_CLUSTER_LOADER_DOWNLOAD_URL.to_string(),
            runs: 2,
            timeout: HumanDuration::from_secs(30 * 60),
            nodes: 10,
            nodes_per_namespace: 10,
            pods_per_node: 10,
            big_group_size: 25,
            medium_group_size: 10,
            small_group_size: 5,
            cl2_load_test_throughput: 20,
            ..Default::default()
        }
    }

    pub fn validate(&mut self, ctx: &ClusterCtx) -> Result<(), Error> {
        require_node_group("add-on-cluster-loader-local", ctx)?;
        if self.cluster_loader_path.is_empty() && self.cluster_loader_download_url.is_empty() {
            return Err(Error::validation(
                "add-on-cluster-loader-local needs cluster-loader-path or download URL",
            ));
        }
        if self.test_config_path.is_empty() {
            return Err(Error::validation(
                "add-on-cluster-loader-local test-config-path is empty",
            ));
        }
        if self.runs == 0 {
            return Err(Error::validation(
                "add-on-cluster-loader-local runs must be non-zero",
            ));
        }
        if self.timeout.is_zero() {
            return Err(Error::validation(
                "add-on-cluster-loader-local timeout must be non-zero",
            ));
        }
        if self.nodes == 0 {
            return Err(Error::validation(
                "add-on-cluster-loader-local nodes must be non-zero",
            ));
        }
        if self.prometheus_scrape_kube_proxy {
            return Err(Error::validation(
                "prometheus-scrape-kube-proxy is not supported yet",
            ));
        }
        if self.enable_system_pod_metrics {
            return Err(Error::validation(
                "enable-system-pod-metrics is not supported yet",
            ));
        }
        if self.s3_dir.is_empty() {
            self.s3_dir = ctx.s3_dir("cluster-loader-local");
        }
        if self.report_dir.is_empty() {
            self.report_dir =
                ctx.sibling_path(&format!("{}-cluster-loader-local-report", ctx.cluster_name));
        }
        if self.report_tar_gz_path.is_empty() {
            self.report_tar_gz_path = ctx.artifact_path("cluster-loader-local.tar.gz");
        }
        if self.report_tar_gz_s3_key.is_empty() {
            self.report_tar_gz_s3_key = s3_key(&self.s3_dir, "reports", &self.report_tar_gz_path);
        }
        if self.log_path.is_empty() {
            self.log_path = ctx.artifact_path("cluster-loader-local.log");
        }
        if self.log_s3_key.is_empty() {
            self.log_s3_key = s3_key(&self.s3_dir, "logs", &self.log_path);
        }
        if self.pod_startup_latency_path.is_empty() {
            self.pod_startup_latency_path =
                ctx.artifact_path("cluster-loader-local-pod-startup-latency.json");
        }
        if self.pod_startup_latency_s3_key.is_empty() {
            self.pod_startup_latency_s3_key =
                s3_key(&self.s3_dir, "pod-startup-latency", &self.pod_startup_latency_path);
        }
        if self.cl2_load_test_throughput == 0 {
            self.cl2_load_test_throughput = 20;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct AddOnClusterLoaderRemote {
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
    pub repository_account_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub repository_region: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub repository_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub repository_image_tag: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub cluster_loader_path: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub cluster_loader_download_url: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub report_tar_gz_path: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub report_tar_gz_s3_key: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub log_path: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub log_s3_key: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub pod_startup_latency_path: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub pod_startup_latency_s3_key: String,

    pub runs: i32,
    #[serde(skip_serializing_if = "HumanDuration::is_zero")]
    pub timeout: HumanDuration,

    pub nodes: i32,
    pub nodes_per_namespace: i32,
    pub pods_per_node: i32,
    pub big_group_size: i32,
    pub medium_group_size: i32,
    pub small_group_size: i32,
    pub small_stateful_sets_per_namespace: i32,
    pub medium_stateful_sets_per_namespace: i32,
    pub cl2_use_host_network_pods: bool,
    pub cl2_load_test_throughput: i32,
    pub cl2_enable_pvs: bool,
    pub prometheus_scrape_kube_proxy: bool,
    pub enable_system_pod_metrics: bool,
}

impl EnvSchema for AddOnClusterLoaderRemote {
    const ENV_PREFIX: &'static str = "ADD_ON_CLUSTER_LOADER_REMOTE_";

    fn field_specs() -> &'static [FieldSpec] {
        const SPECS: &[FieldSpec] = &[
            FieldSpec::writable("enable", FieldKind::Bool),
            FieldSpec::read_only("created", FieldKind::Bool),
            FieldSpec::read_only("time-frame-create", FieldKind::Nested),
            FieldSpec::read_only("time-frame-delete", FieldKind::Nested),
            FieldSpec::writable("s3-dir", FieldKind::String),
            FieldSpec::writable("namespace", FieldKind::String),
            FieldSpec::writable("repository-account-id", FieldKind::String),
            FieldSpec::writable("repository-region", FieldKind::String),
            FieldSpec::writable("repository-name", FieldKind::String),
            FieldSpec::writable("repository-image-tag", FieldKind::String),
            FieldSpec::writable("cluster-loader-path", FieldKind::String),
            FieldSpec::writable("cluster-loader-download-url", FieldKind::String),
            FieldSpec::read_only("report-tar-gz-path", FieldKind::String),
            FieldSpec::read_only("report-tar-gz-s3-key", FieldKind::String),
            FieldSpec::read_only("log-path", FieldKind::String),
            FieldSpec::read_only("log-s3-key", FieldKind::String),
            FieldSpec::read_only("pod-startup-latency-path", FieldKind::String),
            FieldSpec::read_only("pod-startup-latency-s3-key", FieldKind::String),
            FieldSpec::writable("runs", FieldKind::I64),
            FieldSpec::writable("timeout", FieldKind::Duration),
            FieldSpec::writable("nodes", FieldKind::I64),
            FieldSpec::writable("nodes-per-namespace", FieldKind::I64),
            FieldSpec::writable("pods-per-node", FieldKind::I64),
            FieldSpec::writable("big-group-size", FieldKind::I64),
            FieldSpec::writable("medium-group-size", FieldKind::I64),
            FieldSpec::writable("small-group-size", FieldKind::I64),
            FieldSpec::writable("small-stateful-sets-per-namespace", FieldKind::I64),
            FieldSpec::writable("medium-stateful-sets-per-namespace", FieldKind::I64),
            FieldSpec::writable("cl2-use-host-network-pods", FieldKind::Bool),
            FieldSpec::writable("cl2-load-test-throughput", FieldKind::I64),
            FieldSpec::writable("cl2-enable-pvs", FieldKind::Bool),
            FieldSpec::writable("prometheus-scrape-kube-proxy", FieldKind::Bool),
            FieldSpec::writable("enable-system-pod-metrics", FieldKind::Bool),
        ];
        SPECS
    }
}

impl AddOnClusterLoaderRemote {
    pub fn new_default() -> Self {
        Self {
            cluster_loader_path: DEFAULT_CLUSTER_LOADER_PATH.to_string(),
            cluster_loader_download_url: DEFAULT_CLUSTER_LOADER_DOWNLOAD_URL.to_string(),
            runs: 2,
            timeout: HumanDuration::from_secs(30 * 60),
            nodes: 10,
            nodes_per_namespace: 10,
            pods_per_node: 10,
            big_group_size: 25,
            medium_group_size: 10,
            small_group_size: 5,
            cl2_load_test_throughput: 20,
            ..Default::default()
        }
    }

    pub fn validate(&mut self, ctx: &ClusterCtx) -> Result<(), Error> {
        require_node_group("add-on-cluster-loader-remote", ctx)?;
        require_repository(
            "add-on-cluster-loader-remote",
            &self.repository_account_id,
            &self.repository_name,
            &self.repository_image_tag,
        )?;
        if self.runs == 0 {
            return Err(Error::validation(
                "add-on-cluster-loader-remote runs must be non-zero",
            ));
        }
        if self.nodes == 0 {
            return Err(Error::validation(
                "add-on-cluster-loader-remote nodes must be non-zero",
            ));
        }
        if self.prometheus_scrape_kube_proxy {
            return Err(Error::validation(
                "prometheus-scrape-kube-proxy is not supported yet",
            ));
        }
        if self.enable_system_pod_metrics {
            return Err(Error::validation(
                "enable-system-pod-metrics is not supported yet",
            ));
        }
        if self.namespace.is_empty() {
            self.namespace = ctx.namespace("cluster-loader-remote");
        }
        if self.s3_dir.is_empty() {
            self.s3_dir = ctx.s3_dir("cluster-loader-remote");
        }
        if self.report_tar_gz_path.is_empty() {
            self.report_tar_gz_path = ctx.artifact_path("cluster-loader-remote.tar.gz");
        }
        if self.report_tar_gz_s3_key.is_empty() {
            self.report_tar_gz_s3_key = s3_key(&self.s3_dir, "reports", &self.report_tar_gz_path);
        }
        if self.log_path.is_empty() {
            self.log_path = ctx.artifact_path("cluster-loader-remote.log");
        }
        if self.log_s3_key.is_empty() {
            self.log_s3_key = s3_key(&self.s3_dir, "logs", &self.log_path);
        }
        if self.pod_startup_latency_path.is_empty() {
            self.pod_startup_latency_path =
                ctx.artifact_path("cluster-loader-remote-pod-startup-latency.json");
        }
        if self.pod_startup_latency_s3_key.is_empty() {
            self.pod_startup_latency_s3_key =
                s3_key(&self.s3_dir, "pod-startup-latency", &self.pod_startup_latency_path);
        }
        if self.cl2_load_test_throughput == 0 {
            self.cl2_load_test_throughput = 20;
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
            node_group_enabled: true,
            ..Default::default()
        }
    }

    #[test]
    fn story_env_tables_match_structs() {
        crate::schema::verify::<AddOnClusterLoaderLocal>().unwrap();
        crate::schema::verify::<AddOnClusterLoaderRemote>().unwrap();
    }

    #[test]
    fn story_local_requires_test_config() {
        let mut add_on = AddOnClusterLoaderLocal::new_default();
        add_on.enable = true;
        assert!(add_on.validate(&ctx()).is_err());

        add_on.test_config_path = "/tmp/load-config.yaml".to_string();
        add_on.validate(&ctx()).unwrap();
        assert_eq!(
            add_on.report_tar_gz_path,
            "/tmp/c1-cluster-loader-local.tar.gz"
        );
    }
}
