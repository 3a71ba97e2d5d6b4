//! Fargate profile with a secret-reading test pod.

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::randutil;
use crate::schema::{EnvSchema, FieldKind, FieldSpec};
use crate::timeutil::TimeFrame;

use super::{node_groups::name_from_arn, require_node_group, ClusterCtx};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct AddOnFargate {
    pub enable: bool,
    pub created: bool,
    #[serde(skip_serializing_if = "TimeFrame::is_unset")]
    pub time_frame_create: TimeFrame,
    #[serde(skip_serializing_if = "TimeFrame::is_unset")]
    pub time_frame_delete: TimeFrame,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub namespace: String,

    pub role_create: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub role_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub role_arn: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub role_service_principals: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub role_managed_policy_arns: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub role_cfn_stack_id: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub profile_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub secret_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub pod_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub container_name: String,
}

impl EnvSchema for AddOnFargate {
    const ENV_PREFIX: &'static str = "ADD_ON_FARGATE_";

    fn field_specs() -> &'static [FieldSpec] {
        const SPECS: &[FieldSpec] = &[
            FieldSpec::writable("enable", FieldKind::Bool),
            FieldSpec::read_only("created", FieldKind::Bool),
            FieldSpec::read_only("time-frame-create", FieldKind::Nested),
            FieldSpec::read_only("time-frame-delete", FieldKind::Nested),
            FieldSpec::writable("namespace", FieldKind::String),
            FieldSpec::writable("role-create", FieldKind::Bool),
            FieldSpec::writable("role-name", FieldKind::String),
            FieldSpec::writable("role-arn", FieldKind::String),
            FieldSpec::writable("role-service-principals", FieldKind::StringVec),
            FieldSpec::writable("role-managed-policy-arns", FieldKind::StringVec),
            FieldSpec::read_only("role-cfn-stack-id", FieldKind::String),
            FieldSpec::writable("profile-name", FieldKind::String),
            FieldSpec::writable("secret-name", FieldKind::String),
            FieldSpec::writable("pod-name", FieldKind::String),
            FieldSpec::writable("container-name", FieldKind::String),
        ];
        SPECS
    }
}

impl AddOnFargate {
    pub fn new_default() -> Self {
        Self {
            role_create: true,
            ..Default::default()
        }
    }

    pub fn validate(&mut self, ctx: &ClusterCtx) -> Result<(), Error> {
        require_node_group("add-on-fargate", ctx)?;
        let name = &ctx.cluster_name;
        if self.namespace.is_empty() {
            self.namespace = format!("{name}-fargate");
        }
        // "eks-" prefixed profile names are reserved by the service
        if self.profile_name.is_empty() {
            self.profile_name = format!("{name}-fargate-profile");
        }
        if let Some(rest) = self.profile_name.strip_prefix("eks-") {
            self.profile_name = rest.to_string();
        }
        if self.secret_name.is_empty() {
            self.secret_name = format!("{name}addonfargatesecret");
        }
        // secret key names only allow lowercase letters and digits
        self.secret_name = self
            .secret_name
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        if self.pod_name.is_empty() {
            self.pod_name = format!("{name}-pod-fargate");
        }
        if self.container_name.is_empty() {
            self.container_name = format!("{name}-{}", randutil::string(10));
        }
        if self.role_create {
            if self.role_name.is_empty() {
                self.role_name = format!("{name}-role-fargate");
            }
            if !self.role_arn.is_empty() {
                return Err(Error::validation(
                    "add-on-fargate role-create true; expected empty role-arn",
                ));
            }
        } else {
            if self.role_arn.is_empty() {
                return Err(Error::validation(
                    "add-on-fargate role-create false; expected non-empty role-arn",
                ));
            }
            if self.role_name.is_empty() {
                self.role_name = name_from_arn(&self.role_arn);
            }
            if !self.role_managed_policy_arns.is_empty() {
                return Err(Error::validation(
                    "add-on-fargate role-create false; expected empty role-managed-policy-arns",
                ));
            }
            if !self.role_service_principals.is_empty() {
                return Err(Error::validation(
                    "add-on-fargate role-create false; expected empty role-service-principals",
                ));
            }
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
            node_group_enabled: true,
            ..Default::default()
        }
    }

    #[test]
    fn story_env_table_matches_struct() {
        crate::schema::verify::<AddOnFargate>().unwrap();
    }

    #[test]
    fn story_reserved_profile_prefix_is_stripped() {
        let mut add_on = AddOnFargate::new_default();
        add_on.enable = true;
        add_on.profile_name = "eks-my-profile".to_string();
        add_on.validate(&ctx()).unwrap();
        assert_eq!(add_on.profile_name, "my-profile");
    }

    #[test]
    fn story_secret_name_is_lowercase_alphanumeric() {
        let mut add_on = AddOnFargate::new_default();
        add_on.enable = true;
        add_on.secret_name = "My-Secret_01".to_string();
        add_on.validate(&ctx()).unwrap();
        assert_eq!(add_on.secret_name, "mysecret01");
    }

    #[test]
    fn story_adopted_role_requires_arn() {
        let mut add_on = AddOnFargate {
            enable: true,
            role_create: false,
            ..Default::default()
        };
        assert!(add_on.validate(&ctx()).is_err());
    }
}
