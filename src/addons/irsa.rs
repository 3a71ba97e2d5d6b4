//! IAM roles for service accounts, exercised with a test deployment.

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::schema::{EnvSchema, FieldKind, FieldSpec};
use crate::timeutil::TimeFrame;

use super::{require_bucket, require_min_version, require_node_group, ClusterCtx};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct AddOnIrsa {
    pub enable: bool,
    pub created: bool,
    #[serde(skip_serializing_if = "TimeFrame::is_unset")]
    pub time_frame_create: TimeFrame,
    #[serde(skip_serializing_if = "TimeFrame::is_unset")]
    pub time_frame_delete: TimeFrame,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub role_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub role_arn: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub role_managed_policy_arns: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub service_account_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub config_map_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub config_map_script_file_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub s3_key: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub deployment_name: String,
    pub deployment_replicas: i32,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub deployment_result_path: String,
}

impl EnvSchema for AddOnIrsa {
    const ENV_PREFIX: &'static str = "ADD_ON_IRSA_";

    fn field_specs() -> &'static [FieldSpec] {
        const SPECS: &[FieldSpec] = &[
            FieldSpec::writable("enable", FieldKind::Bool),
            FieldSpec::read_only("created", FieldKind::Bool),
            FieldSpec::read_only("time-frame-create", FieldKind::Nested),
            FieldSpec::read_only("time-frame-delete", FieldKind::Nested),
            FieldSpec::writable("namespace", FieldKind::String),
            FieldSpec::writable("role-name", FieldKind::String),
            FieldSpec::writable("role-arn", FieldKind::String),
            FieldSpec::writable("role-managed-policy-arns", FieldKind::StringVec),
            FieldSpec::writable("service-account-name", FieldKind::String),
            FieldSpec::writable("config-map-name", FieldKind::String),
            FieldSpec::writable("config-map-script-file-name", FieldKind::String),
            FieldSpec::writable("s3-key", FieldKind::String),
            FieldSpec::writable("deployment-name", FieldKind::String),
            FieldSpec::writable("deployment-replicas", FieldKind::I64),
            FieldSpec::writable("deployment-result-path", FieldKind::String),
        ];
        SPECS
    }
}

impl AddOnIrsa {
    pub fn new_default() -> Self {
        Self {
            deployment_replicas: 10,
            ..Default::default()
        }
    }

    pub fn validate(&mut self, ctx: &ClusterCtx) -> Result<(), Error> {
        require_node_group("add-on-irsa", ctx)?;
        require_min_version("add-on-irsa", ctx)?;
        require_bucket("add-on-irsa", ctx)?;
        let name = &ctx.cluster_name;
        if self.namespace.is_empty() {
            self.namespace = format!("{name}-irsa");
        }
        if self.role_name.is_empty() {
            self.role_name = format!("{name}-role-irsa");
        }
        if self.service_account_name.is_empty() {
            self.service_account_name = format!("{name}-service-account-irsa");
        }
        if self.config_map_name.is_empty() {
            self.config_map_name = format!("{name}-configmap-irsa");
        }
        if self.config_map_script_file_name.is_empty() {
            self.config_map_script_file_name = format!("{name}-configmap-irsa.sh");
        }
        if self.s3_key.is_empty() {
            self.s3_key = format!("{name}/s3-key-irsa");
        }
        if self.deployment_name.is_empty() {
            self.deployment_name = format!("{name}-deployment-irsa");
        }
        if self.deployment_replicas <= 0 {
            self.deployment_replicas = 10;
        }
        if self.deployment_result_path.is_empty() {
            self.deployment_result_path =
                ctx.sibling_path(&format!("{name}-deployment-irsa-result.log"));
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
        crate::schema::verify::<AddOnIrsa>().unwrap();
    }

    #[test]
    fn story_requires_bucket() {
        let mut add_on = AddOnIrsa::new_default();
        add_on.enable = true;
        let ctx = ClusterCtx {
            cluster_name: "c1".to_string(),
            node_group_enabled: true,
            version_value: 1.16,
            ..Default::default()
        };
        assert!(add_on.validate(&ctx).is_err());
    }
}
