//! Add-on sub-configurations.
//!
//! Each module declares one or more add-on structs: an `enable` flag,
//! read-only `created` / time-frame fields, the add-on's own knobs, an
//! env table, and a `validate` that populates defaults and checks the
//! add-on's invariants against the shared cluster context.

use std::path::Path;

use crate::error::Error;

pub mod alb_2048;
pub mod ami_soft_lockup;
pub mod app_mesh;
pub mod cluster_loader;
pub mod cluster_version_upgrade;
pub mod cni_vpc;
pub mod configmaps;
pub mod conformance;
pub mod cron_jobs;
pub mod csi_ebs;
pub mod csrs;
pub mod cuda_vector_add;
pub mod cw_agent;
pub mod fargate;
pub mod fluentd;
pub mod hollow_nodes;
pub mod irsa;
pub mod irsa_fargate;
pub mod jobs_echo;
pub mod jobs_pi;
pub mod jupyter_hub;
pub mod kubeflow;
pub mod kubernetes_dashboard;
pub mod managed_node_groups;
pub mod metrics_server;
pub mod nlb_guestbook;
pub mod nlb_hello_world;
pub mod node_groups;
pub mod php_apache;
pub mod prometheus_grafana;
pub mod secrets;
pub mod stresser;
pub mod wordpress;

pub use alb_2048::AddOnAlb2048;
pub use ami_soft_lockup::AddOnAmiSoftLockupIssue454;
pub use app_mesh::AddOnAppMesh;
pub use cluster_loader::{AddOnClusterLoaderLocal, AddOnClusterLoaderRemote};
pub use cluster_version_upgrade::AddOnClusterVersionUpgrade;
pub use cni_vpc::AddOnCniVpc;
pub use configmaps::{AddOnConfigmapsLocal, AddOnConfigmapsRemote};
pub use conformance::AddOnConformance;
pub use cron_jobs::AddOnCronJobs;
pub use csi_ebs::AddOnCsiEbs;
pub use csrs::{AddOnCsrsLocal, AddOnCsrsRemote};
pub use cuda_vector_add::AddOnCudaVectorAdd;
pub use cw_agent::AddOnCwAgent;
pub use fargate::AddOnFargate;
pub use fluentd::AddOnFluentd;
pub use hollow_nodes::{AddOnHollowNodesLocal, AddOnHollowNodesRemote};
pub use irsa::AddOnIrsa;
pub use irsa_fargate::AddOnIrsaFargate;
pub use jobs_echo::AddOnJobsEcho;
pub use jobs_pi::AddOnJobsPi;
pub use jupyter_hub::AddOnJupyterHub;
pub use kubeflow::AddOnKubeflow;
pub use kubernetes_dashboard::AddOnKubernetesDashboard;
pub use managed_node_groups::{AddOnManagedNodeGroups, Mng};
pub use metrics_server::AddOnMetricsServer;
pub use nlb_guestbook::AddOnNlbGuestbook;
pub use nlb_hello_world::AddOnNlbHelloWorld;
pub use node_groups::{AddOnNodeGroups, Asg};
pub use php_apache::AddOnPhpApache;
pub use prometheus_grafana::AddOnPrometheusGrafana;
pub use secrets::{AddOnSecretsLocal, AddOnSecretsRemote};
pub use stresser::{AddOnStresserLocal, AddOnStresserRemote, AddOnStresserRemoteV2};
pub use wordpress::AddOnWordpress;

/// Minimum cluster version any add-on that talks to modern EKS APIs
/// accepts.
pub const MIN_CLUSTER_VERSION: f64 = 1.14;

/// Upper bound for configmap/secret object values.
pub const MAX_OBJECT_SIZE: usize = 900_000;

/// Upper bound for echo job payloads.
pub const MAX_ECHO_SIZE: usize = 250_000;

/// Cluster facts each add-on validator reads. Built once per
/// validation pass after the root and node-group stages have been
/// normalized, so the flags already reflect pruning.
#[derive(Debug, Clone, Default)]
pub struct ClusterCtx {
    pub cluster_name: String,
    pub config_path: String,
    pub version: String,
    pub version_value: f64,
    pub s3_bucket: String,
    pub node_group_enabled: bool,
    pub managed_node_group_enabled: bool,
    pub gpu_ami_present: bool,
    pub x86_ami_present: bool,
    pub csi_ebs_enabled: bool,
}

impl ClusterCtx {
    pub(crate) fn namespace(&self, slug: &str) -> String {
        format!("{}-{}", self.cluster_name, slug)
    }

    pub(crate) fn s3_dir(&self, slug: &str) -> String {
        format!("{}/add-on-{}", self.cluster_name, slug)
    }

    /// Local artifact path: configuration path with its extension
    /// stripped, then `-{suffix}` appended.
    pub(crate) fn artifact_path(&self, suffix: &str) -> String {
        format!("{}-{}", path_without_extension(&self.config_path), suffix)
    }

    /// Object-store prefix shared across clusters of the same version.
    pub(crate) fn compare_s3_dir(&self, slug: &str, role: &str) -> String {
        format!("add-on-{}/{}-compare/{}", slug, role, self.version)
    }

    /// File placed next to the configuration file.
    pub(crate) fn sibling_path(&self, file_name: &str) -> String {
        Path::new(&self.config_path)
            .parent()
            .map(|dir| dir.join(file_name).to_string_lossy().into_owned())
            .unwrap_or_else(|| file_name.to_string())
    }
}

/// `/tmp/c1.yaml` and `/tmp/c1.doc` both map to `/tmp/c1`.
pub(crate) fn path_without_extension(p: &str) -> String {
    let path = Path::new(p);
    match (path.parent(), path.file_stem()) {
        (Some(dir), Some(stem)) => dir.join(stem).to_string_lossy().into_owned(),
        _ => p.to_string(),
    }
}

/// Object-store key under the result bucket: `{s3_dir}/{subdir}/{basename(local)}`.
pub(crate) fn s3_key(s3_dir: &str, subdir: &str, local_path: &str) -> String {
    let base = Path::new(local_path)
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("{s3_dir}/{subdir}/{base}")
}

pub(crate) fn require_node_group(add_on: &str, ctx: &ClusterCtx) -> Result<(), Error> {
    if ctx.node_group_enabled {
        Ok(())
    } else {
        Err(Error::missing_dependency(add_on, "a node group add-on"))
    }
}

pub(crate) fn require_bucket(add_on: &str, ctx: &ClusterCtx) -> Result<(), Error> {
    if ctx.s3_bucket.is_empty() {
        Err(Error::missing_resource(add_on, "s3-bucket-name"))
    } else {
        Ok(())
    }
}

pub(crate) fn require_min_version(add_on: &str, ctx: &ClusterCtx) -> Result<(), Error> {
    if ctx.version_value < MIN_CLUSTER_VERSION {
        Err(Error::version_compatibility(format!(
            "version {:?} not supported for {}",
            ctx.version, add_on
        )))
    } else {
        Ok(())
    }
}

pub(crate) fn require_gpu_ami(add_on: &str, ctx: &ClusterCtx) -> Result<(), Error> {
    if ctx.gpu_ami_present {
        Ok(())
    } else {
        Err(Error::missing_dependency(add_on, "a GPU AMI node group"))
    }
}

/// Remote workers pull their image from a registry; all three
/// coordinates are required.
pub(crate) fn require_repository(
    add_on: &str,
    account_id: &str,
    name: &str,
    image_tag: &str,
) -> Result<(), Error> {
    if account_id.is_empty() {
        return Err(Error::validation(format!(
            "{add_on} repository-account-id empty"
        )));
    }
    if name.is_empty() {
        return Err(Error::validation(format!("{add_on} repository-name empty")));
    }
    if image_tag.is_empty() {
        return Err(Error::validation(format!(
            "{add_on} repository-image-tag empty"
        )));
    }
    Ok(())
}

/// Mutable view over one `requests-summary-{role}` artifact block,
/// used by the scale add-ons to share the derivation rules.
pub(crate) struct SummarySlots<'a> {
    pub json_path: &'a mut String,
    pub json_s3_key: &'a mut String,
    pub table_path: &'a mut String,
    pub table_s3_key: &'a mut String,
    pub compare_s3_dir: &'a mut String,
    pub compare_json_path: &'a mut String,
    pub compare_json_s3_key: &'a mut String,
    pub compare_table_path: &'a mut String,
    pub compare_table_s3_key: &'a mut String,
}

/// Populate empty artifact fields for one role ("writes" or "reads").
/// Explicitly set values are left untouched.
pub(crate) fn fill_summary_slots(
    slots: SummarySlots<'_>,
    ctx: &ClusterCtx,
    slug: &str,
    role: &str,
    s3_dir: &str,
) {
    let kind = format!("requests-summary-{role}");
    if slots.json_path.is_empty() {
        *slots.json_path = ctx.artifact_path(&format!("{slug}-{kind}.json"));
    }
    if slots.json_s3_key.is_empty() {
        *slots.json_s3_key = s3_key(s3_dir, &kind, slots.json_path);
    }
    if slots.table_path.is_empty() {
        *slots.table_path = ctx.artifact_path(&format!("{slug}-{kind}.txt"));
    }
    if slots.table_s3_key.is_empty() {
        *slots.table_s3_key = s3_key(s3_dir, &kind, slots.table_path);
    }
    if slots.compare_s3_dir.is_empty() {
        *slots.compare_s3_dir = ctx.compare_s3_dir(slug, &kind);
    }
    if slots.compare_json_path.is_empty() {
        *slots.compare_json_path = ctx.artifact_path(&format!("{slug}-{kind}-compare.json"));
    }
    if slots.compare_json_s3_key.is_empty() {
        *slots.compare_json_s3_key =
            s3_key(s3_dir, &format!("{kind}-compare"), slots.compare_json_path);
    }
    if slots.compare_table_path.is_empty() {
        *slots.compare_table_path = ctx.artifact_path(&format!("{slug}-{kind}-compare.txt"));
    }
    if slots.compare_table_s3_key.is_empty() {
        *slots.compare_table_s3_key =
            s3_key(s3_dir, &format!("{kind}-compare"), slots.compare_table_path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> ClusterCtx {
        ClusterCtx {
            cluster_name: "c1".to_string(),
            config_path: "/tmp/c1.doc".to_string(),
            version: "1.17".to_string(),
            version_value: 1.17,
            s3_bucket: "bucket".to_string(),
            node_group_enabled: true,
            ..Default::default()
        }
    }

    /// Story: the config file can carry any extension; derived artifact
    /// paths strip it before appending the add-on suffix.
    #[test]
    fn story_artifact_paths_strip_any_extension() {
        assert_eq!(path_without_extension("/tmp/c1.yaml"), "/tmp/c1");
        assert_eq!(path_without_extension("/tmp/c1.doc"), "/tmp/c1");
        assert_eq!(path_without_extension("/tmp/c1"), "/tmp/c1");
        assert_eq!(
            ctx().artifact_path("configmaps-local-requests-summary-writes.json"),
            "/tmp/c1-configmaps-local-requests-summary-writes.json"
        );
    }

    /// Story: compare directories are keyed by cluster version, not
    /// cluster name, so separate clusters share regression corpora.
    #[test]
    fn story_compare_dirs_keyed_by_version() {
        let dir = ctx().compare_s3_dir("configmaps-local", "requests-summary-writes");
        assert_eq!(
            dir,
            "add-on-configmaps-local/requests-summary-writes-compare/1.17"
        );
        assert!(!dir.contains("c1"));
    }

    #[test]
    fn story_s3_keys_use_basename_of_local_path() {
        assert_eq!(
            s3_key("c1/add-on-configmaps-local", "requests-summary-writes", "/tmp/c1-out.json"),
            "c1/add-on-configmaps-local/requests-summary-writes/c1-out.json"
        );
    }

    #[test]
    fn story_dependency_helpers_build_taxonomy_errors() {
        let mut c = ctx();
        c.node_group_enabled = false;
        assert!(matches!(
            require_node_group("add-on-configmaps-local", &c),
            Err(Error::MissingDependency { .. })
        ));
        c.s3_bucket.clear();
        assert!(matches!(
            require_bucket("add-on-irsa", &c),
            Err(Error::MissingResource { .. })
        ));
        c.version_value = 1.13;
        assert!(matches!(
            require_min_version("add-on-irsa", &c),
            Err(Error::VersionCompatibility(_))
        ));
    }
}
