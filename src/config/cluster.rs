//! Cluster creation parameters: role and VPC lifecycle, Kubernetes
//! version, envelope encryption key, control-plane tuning.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::schema::{EnvSchema, FieldKind, FieldSpec};

/// Parameters for the cluster itself, nested under the root object.
///
/// Role, VPC, and encryption key each follow the create-or-adopt
/// pattern: with `*_create` true the harness provisions the resource
/// and derives its name; with `*_create` false the user must supply an
/// existing identifier and the provisioning inputs must stay empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct Parameters {
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

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub request_header_key: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub request_header_value: String,

    /// Alternate EKS endpoint; empty for the production service.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub resolver_url: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub signing_name: String,

    pub vpc_create: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub vpc_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub vpc_cfn_stack_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub vpc_cidr: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub public_subnet_cidr_1: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub public_subnet_cidr_2: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub public_subnet_cidr_3: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub private_subnet_cidr_1: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub private_subnet_cidr_2: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub public_subnet_ids: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub private_subnet_ids: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub dhcp_options_domain_name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dhcp_options_domain_name_servers: Vec<String>,

    /// Kubernetes minor version, e.g. "1.17".
    #[serde(skip_serializing_if = "String::is_empty")]
    pub version: String,
    pub version_value: f64,

    pub encryption_cmk_create: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub encryption_cmk_arn: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub encryption_cmk_id: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub max_requests_inflight: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub kube_controller_manager_qps: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub kube_controller_manager_burst: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub kube_scheduler_qps: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub kube_scheduler_burst: String,
}

impl EnvSchema for Parameters {
    const ENV_PREFIX: &'static str = "PARAMETERS_";

    fn field_specs() -> &'static [FieldSpec] {
        const SPECS: &[FieldSpec] = &[
            FieldSpec::writable("role-create", FieldKind::Bool),
            FieldSpec::writable("role-name", FieldKind::String),
            FieldSpec::writable("role-arn", FieldKind::String),
            FieldSpec::writable("role-service-principals", FieldKind::StringVec),
            FieldSpec::writable("role-managed-policy-arns", FieldKind::StringVec),
            FieldSpec::read_only("role-cfn-stack-id", FieldKind::String),
            FieldSpec::writable("tags", FieldKind::StringMap),
            FieldSpec::writable("request-header-key", FieldKind::String),
            FieldSpec::writable("request-header-value", FieldKind::String),
            FieldSpec::writable("resolver-url", FieldKind::String),
            FieldSpec::writable("signing-name", FieldKind::String),
            FieldSpec::writable("vpc-create", FieldKind::Bool),
            FieldSpec::writable("vpc-id", FieldKind::String),
            FieldSpec::read_only("vpc-cfn-stack-id", FieldKind::String),
            FieldSpec::writable("vpc-cidr", FieldKind::String),
            FieldSpec::writable("public-subnet-cidr-1", FieldKind::String),
            FieldSpec::writable("public-subnet-cidr-2", FieldKind::String),
            FieldSpec::writable("public-subnet-cidr-3", FieldKind::String),
            FieldSpec::writable("private-subnet-cidr-1", FieldKind::String),
            FieldSpec::writable("private-subnet-cidr-2", FieldKind::String),
            FieldSpec::read_only("public-subnet-ids", FieldKind::StringVec),
            FieldSpec::read_only("private-subnet-ids", FieldKind::StringVec),
            FieldSpec::writable("dhcp-options-domain-name", FieldKind::String),
            FieldSpec::writable("dhcp-options-domain-name-servers", FieldKind::StringVec),
            FieldSpec::writable("version", FieldKind::String),
            FieldSpec::read_only("version-value", FieldKind::F64),
            FieldSpec::writable("encryption-cmk-create", FieldKind::Bool),
            FieldSpec::writable("encryption-cmk-arn", FieldKind::String),
            FieldSpec::read_only("encryption-cmk-id", FieldKind::String),
            FieldSpec::writable("max-requests-inflight", FieldKind::String),
            FieldSpec::writable("kube-controller-manager-qps", FieldKind::String),
            FieldSpec::writable("kube-controller-manager-burst", FieldKind::String),
            FieldSpec::writable("kube-scheduler-qps", FieldKind::String),
            FieldSpec::writable("kube-scheduler-burst", FieldKind::String),
        ];
        SPECS
    }
}

impl Parameters {
    pub fn new_default() -> Self {
        Self {
            role_create: true,
            vpc_create: true,
            signing_name: "eks".to_string(),
            version: "1.17".to_string(),
            encryption_cmk_create: true,
            ..Default::default()
        }
    }

    /// Parse the version and normalize role/VPC/CMK lifecycles.
    pub fn validate(&mut self, cluster_name: &str) -> Result<(), Error> {
        if self.version.is_empty() {
            return Err(Error::validation("parameters version is empty"));
        }
        self.version_value = self
            .version
            .parse::<f64>()
            .map_err(|e| Error::parse("version", self.version.as_str(), e.to_string()))?;

        if self.role_create {
            if self.role_name.is_empty() {
                self.role_name = format!("{cluster_name}-role-cluster");
            }
            // a role-arn left over from a previous run is harmless
        } else {
            if self.role_arn.is_empty() {
                return Err(Error::validation(
                    "role-create false requires a non-empty role-arn",
                ));
            }
            if self.role_name.is_empty() {
                self.role_name = name_from_arn(&self.role_arn);
            }
            if !self.role_managed_policy_arns.is_empty() {
                return Err(Error::validation(
                    "role-create false forbids role-managed-policy-arns",
                ));
            }
            if !self.role_service_principals.is_empty() {
                return Err(Error::validation(
                    "role-create false forbids role-service-principals",
                ));
            }
        }

        if !self.vpc_create && self.vpc_id.is_empty() {
            return Err(Error::validation(
                "vpc-create false requires a non-empty vpc-id",
            ));
        }

        // subnet CIDRs are all-or-nothing with the VPC CIDR
        if self.vpc_cidr.is_empty() {
            for (field, value) in [
                ("public-subnet-cidr-1", &self.public_subnet_cidr_1),
                ("public-subnet-cidr-2", &self.public_subnet_cidr_2),
                ("public-subnet-cidr-3", &self.public_subnet_cidr_3),
                ("private-subnet-cidr-1", &self.private_subnet_cidr_1),
                ("private-subnet-cidr-2", &self.private_subnet_cidr_2),
            ] {
                if !value.is_empty() {
                    return Err(Error::validation(format!(
                        "non-empty {field} {value:?} when vpc-cidr is empty"
                    )));
                }
            }
        } else {
            for (field, value) in [
                ("public-subnet-cidr-1", &self.public_subnet_cidr_1),
                ("public-subnet-cidr-2", &self.public_subnet_cidr_2),
                ("public-subnet-cidr-3", &self.public_subnet_cidr_3),
                ("private-subnet-cidr-1", &self.private_subnet_cidr_1),
                ("private-subnet-cidr-2", &self.private_subnet_cidr_2),
            ] {
                if value.is_empty() {
                    return Err(Error::validation(format!(
                        "empty {field} when vpc-cidr is {:?}",
                        self.vpc_cidr
                    )));
                }
            }
        }

        if self.signing_name.is_empty() {
            self.signing_name = "eks".to_string();
        }
        Ok(())
    }
}

fn name_from_arn(arn: &str) -> String {
    arn.rsplit('/').next().unwrap_or(arn).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn story_env_table_matches_struct() {
        crate::schema::verify::<Parameters>().unwrap();
    }

    #[test]
    fn story_version_parses_to_float() {
        let mut p = Parameters::new_default();
        p.validate("c1").unwrap();
        assert_eq!(p.version_value, 1.17);
        assert_eq!(p.role_name, "c1-role-cluster");
    }

    #[test]
    fn story_adopted_role_forbids_provisioning_inputs() {
        let mut p = Parameters::new_default();
        p.role_create = false;
        assert!(p.validate("c1").is_err());

        p.role_arn = "arn:aws:iam::123:role/adopted".to_string();
        p.validate("c1").unwrap();
        assert_eq!(p.role_name, "adopted");

        p.role_service_principals = vec!["ec2.amazonaws.com".to_string()];
        assert!(p.validate("c1").is_err());
    }

    #[test]
    fn story_subnet_cidrs_travel_with_vpc_cidr() {
        let mut p = Parameters::new_default();
        p.vpc_cidr = "10.0.0.0/16".to_string();
        assert!(p.validate("c1").is_err());

        p.public_subnet_cidr_1 = "10.0.0.0/19".to_string();
        p.public_subnet_cidr_2 = "10.0.32.0/19".to_string();
        p.public_subnet_cidr_3 = "10.0.64.0/19".to_string();
        p.private_subnet_cidr_1 = "10.0.96.0/19".to_string();
        p.private_subnet_cidr_2 = "10.0.128.0/19".to_string();
        p.validate("c1").unwrap();

        let mut p = Parameters::new_default();
        p.private_subnet_cidr_1 = "10.0.96.0/19".to_string();
        assert!(p.validate("c1").is_err());
    }
}
