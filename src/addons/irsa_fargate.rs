//! IAM roles for service accounts exercised on a Fargate profile.

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::randutil;
use crate::schema::{EnvSchema, FieldKind, FieldSpec};
use crate::timeutil::TimeFrame;

use super::{require_bucket, require_min_version, require_node_group, ClusterCtx};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct AddOnIrsaFargate {
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
    pub role_service_principals: Vec<String>,
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
    pub profile_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub pod_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub container_name: String,
}

impl EnvSchema for AddOnIrsaFargate {
    const ENV_PREFIX: &'static str = "ADD_ON_IRSA_FARGATE_";

    fn field_specs() -> &'static [FieldSpec] {
        const SPECS: &[FieldSpec] = &[
            FieldSpec::writable("enable", FieldKind::Bool),
            FieldSpec::read_only("created", FieldKind::Bool),
            FieldSpec::read_only("time-frame-create", FieldKind::Nested),
            FieldSpec::read_only("time-frame-delete", FieldKind::Nested),
            FieldSpec::writable("namespace", FieldKind::String),
            FieldSpec::writable("role-name", FieldKind::String),
            FieldSpec::writable("role-arn", FieldKind::String),
            FieldSpec::writable("role-service-principals", FieldKind::StringVec),
            FieldSpec::writable("role-managed-policy-arns", FieldKind::StringVec),
            FieldSpec::writable("service-account-name", FieldKind::String),
            FieldSpec::writable("config-map-name", FieldKind::String),
            FieldSpec::writable("config-map-script-file-name", FieldKind::String),
            FieldSpec::writable("s3-key", FieldKind::String),
            FieldSpec::writable("profile-name", FieldKind::String),
            FieldSpec::writable("pod-name", FieldKind::String),
            FieldSpec::writable("container-name", FieldKind::String),
        ];
        SPECS
    }
}

impl AddOnIrsaFargate {
    pub fn validate(&mut self, ctx: &ClusterCtx) -> Result<(), Error> {
        require_node_group("add-on-irsa-fargate", ctx)?;
        require_min_version("add-on-irsa-fargate", ctx)?;
        require_bucket("add-on-irsa-fargate", ctx)?;
        let name = &ctx.cluster_name;
        if self.namespace.is_empty() {
            self.namespace = format!("{name}-irsa-fargate");
        }
        if self.role_name.is_empty() {
            self.role_name = format!("{name}-role-irsa-fargate");
        }
        if self.service_account_name.is_empty() {
            self.service_account_name = format!("{name}-service-account-irsa-fargate");
        }
        if self.config_map_name.is_empty() {
            self.config_map_name = format!("{name}-configmap-irsa-fargate");
        }
        if self.config_map_script_file_name.is_empty() {
            self.config_map_script_file_name = format!("{name}-configmap-irsa-fargate.sh");
        }
        if self.s3_key.is_empty() {
            self.s3_key = format!("{name}/s3-key-irsa-fargate");
        }
        // "eks-" prefixed profile names are reserved by the service
        if self.profile_name.is_empty() {
            self.profile_name = format!("{name}-irsa-fargate-profile");
        }
        if let Some(rest) = self.profile_name.strip_prefix("eks-") {
            self.profile_name = rest.to_string();
        }
        if self.pod_name.is_empty() {
            self.pod_name = format!("{name}-pod-irsa-fargate");
        }
        if self.container_name.is_empty() {
            self.container_name = format!("{name}-{}", randutil::string(10));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn story_env_table_matches_struct() {
        crate::schema::verify::<super::AddOnIrsaFargate>().unwrap();
    }
}
