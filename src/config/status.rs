//! Read-only cluster status written by the provisioning code.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timeutil::TimeFrame;

/// Cluster status recorded by EKS API calls when the cluster is not
/// found.
pub const CLUSTER_STATUS_DELETED_OR_NOT_EXIST: &str = "DELETED/NOT-EXIST";
pub const CLUSTER_STATUS_ACTIVE: &str = "ACTIVE";

/// Server version as reported by the kube-apiserver.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct ServerVersionInfo {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub major: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub minor: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub git_version: String,
    pub version_value: f64,
}

/// One entry in the cluster status history, newest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct ClusterStatusEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub status: String,
}

/// SSH access coordinates for one worker node, keyed by its private
/// DNS name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct SshConfig {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub public_ip: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub public_dns_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub user_name: String,
}

/// Current state of the provisioned cloud resources. Entirely
/// read-only from the overlay channel; only downstream provisioning
/// code writes here, through [`crate::SharedConfig`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct Status {
    pub up: bool,
    #[serde(skip_serializing_if = "TimeFrame::is_unset")]
    pub time_frame_create: TimeFrame,
    #[serde(skip_serializing_if = "TimeFrame::is_unset")]
    pub time_frame_delete: TimeFrame,

    #[serde(skip_serializing_if = "is_default_server_version")]
    pub server_version_info: ServerVersionInfo,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub aws_account_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub aws_user_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub aws_iam_role_arn: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub aws_credential_path: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub cluster_arn: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub cluster_cfn_stack_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub cluster_cfn_stack_yaml_file_path: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub cluster_control_plane_security_group_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub cluster_api_server_endpoint: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub cluster_oidc_issuer_url: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub cluster_oidc_issuer_host_path: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub cluster_oidc_issuer_arn: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub cluster_oidc_issuer_ca_thumbprint: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub cluster_ca: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub cluster_ca_decoded: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub cluster_status_current: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cluster_status: Vec<ClusterStatusEntry>,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub private_dns_to_ssh_config: BTreeMap<String, SshConfig>,
}

fn is_default_server_version(v: &ServerVersionInfo) -> bool {
    *v == ServerVersionInfo::default()
}

impl Status {
    /// Prepend a status observation and fold it into the `up` flag.
    pub fn record(&mut self, status: &str) {
        self.cluster_status_current = status.to_string();
        match status {
            CLUSTER_STATUS_DELETED_OR_NOT_EXIST => self.up = false,
            CLUSTER_STATUS_ACTIVE => self.up = true,
            _ => {}
        }
        self.cluster_status.insert(
            0,
            ClusterStatusEntry {
                time: Some(Utc::now()),
                status: status.to_string(),
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn story_status_history_is_newest_first() {
        let mut s = Status::default();
        s.record("CREATING");
        s.record(CLUSTER_STATUS_ACTIVE);
        assert!(s.up);
        assert_eq!(s.cluster_status[0].status, CLUSTER_STATUS_ACTIVE);
        assert_eq!(s.cluster_status[1].status, "CREATING");

        s.record(CLUSTER_STATUS_DELETED_OR_NOT_EXIST);
        assert!(!s.up);
    }
}
