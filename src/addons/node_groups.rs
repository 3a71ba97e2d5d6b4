//! Self-managed node groups.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::schema::{EnvSchema, FieldKind, FieldSpec};
use crate::timeutil::TimeFrame;

use super::{require_min_version, ClusterCtx};

/// Amazon Linux 2 CPU image family.
pub const AMI_TYPE_AL2_X86_64: &str = "AL2_x86_64";
/// Amazon Linux 2 GPU image family.
pub const AMI_TYPE_AL2_X86_64_GPU: &str = "AL2_x86_64_GPU";
/// Bottlerocket CPU image family; self-managed groups only.
pub const AMI_TYPE_BOTTLEROCKET: &str = "BOTTLEROCKET_x86_64";

/// Placeholder the config file may use anywhere a group name appears;
/// expanded to the cluster name during validation.
pub const NAME_PLACEHOLDER: &str = "GetRef.Name";

pub const DEFAULT_INSTANCE_TYPE_CPU: &str = "c5.xlarge";
pub const DEFAULT_INSTANCE_TYPE_GPU: &str = "p3.8xlarge";
pub const DEFAULT_VOLUME_SIZE_GB: u32 = 40;

/// Maximum number of self-managed node groups per cluster.
pub const MAX_GROUPS: usize = 10;
/// Maximum nodes per self-managed node group.
pub const MAX_NODES_PER_GROUP: u32 = 300;

/// One auto-scaling group of worker nodes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct Asg {
    pub name: String,
    /// SSH user; every supported image family uses `ec2-user`.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub remote_access_user_name: String,
    pub ami_type: String,

    /// Explicit image ID; ignored when the SSM parameter is also set.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub image_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub image_id_ssm_parameter: String,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub instance_types: Vec<String>,
    pub volume_size: u32,

    pub asg_min_size: u32,
    pub asg_max_size: u32,
    pub asg_desired_capacity: u32,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub kubelet_extra_args: String,

    pub ssm_document_create: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub ssm_document_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub ssm_document_cfn_stack_name: String,
    pub ssm_document_execution_timeout_seconds: u32,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub asg_cfn_stack_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub ssm_document_cfn_stack_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub status: String,
    pub created: bool,
}

impl Asg {
    pub fn is_gpu(&self) -> bool {
        self.ami_type == AMI_TYPE_AL2_X86_64_GPU
    }

    /// Entry table used when the whole map arrives on the env channel:
    /// read-only sub-fields are blanked before insertion.
    pub fn field_specs() -> &'static [FieldSpec] {
        const SPECS: &[FieldSpec] = &[
            FieldSpec::writable("name", FieldKind::String),
            FieldSpec::writable("remote-access-user-name", FieldKind::String),
            FieldSpec::writable("ami-type", FieldKind::String),
            FieldSpec::writable("image-id", FieldKind::String),
            FieldSpec::writable("image-id-ssm-parameter", FieldKind::String),
            FieldSpec::writable("instance-types", FieldKind::StringVec),
            FieldSpec::writable("volume-size", FieldKind::U64),
            FieldSpec::writable("asg-min-size", FieldKind::U64),
            FieldSpec::writable("asg-max-size", FieldKind::U64),
            FieldSpec::writable("asg-desired-capacity", FieldKind::U64),
            FieldSpec::writable("kubelet-extra-args", FieldKind::String),
            FieldSpec::writable("ssm-document-create", FieldKind::Bool),
            FieldSpec::writable("ssm-document-name", FieldKind::String),
            FieldSpec::writable("ssm-document-cfn-stack-name", FieldKind::String),
            FieldSpec::writable("ssm-document-execution-timeout-seconds", FieldKind::U64),
            FieldSpec::read_only("asg-cfn-stack-id", FieldKind::String),
            FieldSpec::read_only("ssm-document-cfn-stack-id", FieldKind::String),
            FieldSpec::read_only("status", FieldKind::String),
            FieldSpec::read_only("created", FieldKind::Bool),
        ];
        SPECS
    }

    fn validate(&mut self, key: &str, ctx: &ClusterCtx, lb_addon_enabled: bool) -> Result<(), Error> {
        if self.instance_types.len() > 4 {
            return Err(Error::validation(format!(
                "asgs[{key:?}] declares too many instance types {:?}",
                self.instance_types
            )));
        }
        if self.volume_size == 0 {
            self.volume_size = DEFAULT_VOLUME_SIZE_GB;
        }
        if self.remote_access_user_name.is_empty() {
            self.remote_access_user_name = "ec2-user".to_string();
        }
        if self.image_id.is_empty() && self.image_id_ssm_parameter.is_empty() {
            return Err(Error::validation(format!(
                "asgs[{key:?}] has neither image-id nor image-id-ssm-parameter"
            )));
        }

        match self.ami_type.as_str() {
            AMI_TYPE_AL2_X86_64 | AMI_TYPE_AL2_X86_64_GPU => {
                if self.remote_access_user_name != "ec2-user" {
                    return Err(Error::validation(format!(
                        "ami-type {:?} expects remote-access-user-name \"ec2-user\", got {:?}",
                        self.ami_type, self.remote_access_user_name
                    )));
                }
            }
            AMI_TYPE_BOTTLEROCKET => {
                if self.remote_access_user_name != "ec2-user" {
                    return Err(Error::validation(format!(
                        "ami-type {:?} expects remote-access-user-name \"ec2-user\", got {:?}",
                        self.ami_type, self.remote_access_user_name
                    )));
                }
                if !self.kubelet_extra_args.is_empty() {
                    return Err(Error::validation(format!(
                        "ami-type {:?} does not support kubelet-extra-args {:?}",
                        self.ami_type, self.kubelet_extra_args
                    )));
                }
                if !self.ssm_document_name.is_empty() && ctx.s3_bucket.is_empty() {
                    return Err(Error::missing_resource(
                        "add-on-node-groups",
                        "s3-bucket-name (required by ssm-document-name)",
                    ));
                }
            }
            other => {
                return Err(Error::validation(format!(
                    "asgs[{key:?}] has unknown ami-type {other:?}"
                )));
            }
        }

        if self.instance_types.is_empty() {
            self.instance_types = vec![if self.is_gpu() {
                DEFAULT_INSTANCE_TYPE_GPU.to_string()
            } else {
                DEFAULT_INSTANCE_TYPE_CPU.to_string()
            }];
        }

        // m3/c4 families are not valid NLB/ALB targets.
        if lb_addon_enabled {
            for it in &self.instance_types {
                if it.starts_with("m3.") || it.starts_with("c4.") {
                    return Err(Error::validation(format!(
                        "instance type {it:?} for {key:?} is not supported with NLB/ALB add-ons"
                    )));
                }
            }
        }

        if self.asg_min_size > self.asg_max_size {
            return Err(Error::validation(format!(
                "asgs[{key:?}] asg-min-size {} > asg-max-size {}",
                self.asg_min_size, self.asg_max_size
            )));
        }
        if self.asg_min_size > self.asg_desired_capacity {
            return Err(Error::validation(format!(
                "asgs[{key:?}] asg-min-size {} > asg-desired-capacity {}",
                self.asg_min_size, self.asg_desired_capacity
            )));
        }
        if self.asg_desired_capacity > self.asg_max_size {
            return Err(Error::validation(format!(
                "asgs[{key:?}] asg-desired-capacity {} > asg-max-size {}",
                self.asg_desired_capacity, self.asg_max_size
            )));
        }
        if self.asg_desired_capacity == 0 {
            return Err(Error::validation(format!(
                "asgs[{key:?}] asg-desired-capacity must be positive"
            )));
        }
        if self.asg_max_size > MAX_NODES_PER_GROUP {
            return Err(Error::validation(format!(
                "asgs[{key:?}] asg-max-size {} > limit {}",
                self.asg_max_size, MAX_NODES_PER_GROUP
            )));
        }

        if self.ssm_document_create {
            if self.ssm_document_cfn_stack_name.is_empty() {
                self.ssm_document_cfn_stack_name = format!("{}-ssm-document", self.name);
            }
            if self.ssm_document_name.is_empty() {
                self.ssm_document_name = format!("{}SSMDocument", self.name);
            }
            if self.ssm_document_execution_timeout_seconds == 0 {
                self.ssm_document_execution_timeout_seconds = 3600;
            }
        }
        self.ssm_document_cfn_stack_name = self
            .ssm_document_cfn_stack_name
            .replace(NAME_PLACEHOLDER, &ctx.cluster_name);
        self.ssm_document_name = self
            .ssm_document_name
            .replace(NAME_PLACEHOLDER, &ctx.cluster_name);
        self.ssm_document_name.retain(|c| c.is_ascii_alphanumeric());

        Ok(())
    }
}

/// Self-managed node group add-on: a map of ASGs plus the node role
/// lifecycle and log collection knobs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct AddOnNodeGroups {
    pub enable: bool,
    pub created: bool,
    #[serde(skip_serializing_if = "TimeFrame::is_unset")]
    pub time_frame_create: TimeFrame,
    #[serde(skip_serializing_if = "TimeFrame::is_unset")]
    pub time_frame_delete: TimeFrame,

    pub fetch_logs: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub logs_dir: String,

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
    pub asgs: BTreeMap<String, Asg>,
}

impl EnvSchema for AddOnNodeGroups {
    const ENV_PREFIX: &'static str = "ADD_ON_NODE_GROUPS_";

    fn field_specs() -> &'static [FieldSpec] {
        const SPECS: &[FieldSpec] = &[
            FieldSpec::writable("enable", FieldKind::Bool),
            FieldSpec::read_only("created", FieldKind::Bool),
            FieldSpec::read_only("time-frame-create", FieldKind::Nested),
            FieldSpec::read_only("time-frame-delete", FieldKind::Nested),
            FieldSpec::writable("fetch-logs", FieldKind::Bool),
            FieldSpec::writable("logs-dir", FieldKind::String),
            FieldSpec::writable("role-create", FieldKind::Bool),
            FieldSpec::writable("role-name", FieldKind::String),
            FieldSpec::writable("role-arn", FieldKind::String),
            FieldSpec::writable("role-service-principals", FieldKind::StringVec),
            FieldSpec::writable("role-managed-policy-arns", FieldKind::StringVec),
            FieldSpec::read_only("role-cfn-stack-id", FieldKind::String),
            FieldSpec::writable("asgs", FieldKind::EntryMap(Asg::field_specs)),
        ];
        SPECS
    }
}

impl AddOnNodeGroups {
    pub fn new_default(cluster_name: &str) -> Self {
        let asg_name = format!("{cluster_name}-ng-asg-cpu");
        let mut asgs = BTreeMap::new();
        asgs.insert(
            asg_name.clone(),
            Asg {
                name: asg_name,
                remote_access_user_name: "ec2-user".to_string(),
                ami_type: AMI_TYPE_AL2_X86_64.to_string(),
                image_id_ssm_parameter:
                    "/aws/service/eks/optimized-ami/1.17/amazon-linux-2/recommended/image_id"
                        .to_string(),
                instance_types: vec![DEFAULT_INSTANCE_TYPE_CPU.to_string()],
                volume_size: DEFAULT_VOLUME_SIZE_GB,
                asg_min_size: 1,
                asg_max_size: 1,
                asg_desired_capacity: 1,
                ..Default::default()
            },
        );
        Self {
            enable: false,
            fetch_logs: true,
            role_create: true,
            asgs,
            ..Default::default()
        }
    }

    /// True if any group declares the GPU image family.
    pub fn gpu_ami_present(&self) -> bool {
        self.asgs.values().any(Asg::is_gpu)
    }

    pub fn x86_ami_present(&self) -> bool {
        self.asgs
            .values()
            .any(|a| a.ami_type == AMI_TYPE_AL2_X86_64 || a.ami_type == AMI_TYPE_AL2_X86_64_GPU)
    }

    pub fn max_desired_capacity(&self) -> u32 {
        self.asgs
            .values()
            .map(|a| a.asg_desired_capacity)
            .max()
            .unwrap_or(0)
    }

    pub fn total_nodes(&self) -> u64 {
        self.asgs
            .values()
            .map(|a| u64::from(a.asg_desired_capacity))
            .sum()
    }

    pub fn validate(&mut self, ctx: &ClusterCtx, lb_addon_enabled: bool) -> Result<(), Error> {
        if self.asgs.is_empty() {
            return Err(Error::validation("add-on-node-groups asgs is empty"));
        }
        if self.asgs.len() > MAX_GROUPS {
            return Err(Error::validation(format!(
                "{} node groups exceeds the limit {}",
                self.asgs.len(),
                MAX_GROUPS
            )));
        }
        require_min_version("add-on-node-groups", ctx)?;

        if self.logs_dir.is_empty() {
            self.logs_dir = ctx.artifact_path("logs-ngs");
        }

        if self.role_create {
            if self.role_name.is_empty() {
                self.role_name = format!("{}-role-ng", ctx.cluster_name);
            }
            if !self.role_service_principals.is_empty()
                && !self
                    .role_service_principals
                    .iter()
                    .any(|p| p == "ec2.amazonaws.com")
            {
                return Err(Error::validation(format!(
                    "role-service-principals {:?} must include \"ec2.amazonaws.com\"",
                    self.role_service_principals
                )));
            }
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

        // Expand the name placeholder, enforce key == name, and keep
        // names unique across the map.
        let mut processed: BTreeMap<String, Asg> = BTreeMap::new();
        for (key, mut asg) in std::mem::take(&mut self.asgs) {
            let key = key.replace(NAME_PLACEHOLDER, &ctx.cluster_name);
            asg.name = asg.name.replace(NAME_PLACEHOLDER, &ctx.cluster_name);
            if asg.name.is_empty() {
                return Err(Error::validation(format!("asgs[{key:?}] name is empty")));
            }
            if key != asg.name {
                return Err(Error::validation(format!(
                    "asgs[{key:?}] name field {:?} does not match its key",
                    asg.name
                )));
            }
            asg.validate(&key, ctx, lb_addon_enabled)?;
            if processed.insert(key.clone(), asg).is_some() {
                return Err(Error::validation(format!(
                    "asgs[{key:?}] name is redundant"
                )));
            }
        }
        self.asgs = processed;
        Ok(())
    }
}

/// `arn:aws:iam::123:role/role-eks` yields `role-eks`.
pub(crate) fn name_from_arn(arn: &str) -> String {
    arn.rsplit('/').next().unwrap_or(arn).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> ClusterCtx {
        ClusterCtx {
            cluster_name: "c1".to_string(),
            config_path: "/tmp/c1.yaml".to_string(),
            version: "1.17".to_string(),
            version_value: 1.17,
            s3_bucket: "bucket".to_string(),
            node_group_enabled: true,
            ..Default::default()
        }
    }

    fn add_on_with(key: &str, asg: Asg) -> AddOnNodeGroups {
        let mut ngs = AddOnNodeGroups {
            enable: true,
            role_create: true,
            ..Default::default()
        };
        ngs.asgs.insert(key.to_string(), asg);
        ngs
    }

    fn gpu_asg(name: &str) -> Asg {
        Asg {
            name: name.to_string(),
            remote_access_user_name: "ec2-user".to_string(),
            ami_type: AMI_TYPE_AL2_X86_64_GPU.to_string(),
            image_id_ssm_parameter: "/aws/service/eks/gpu/image_id".to_string(),
            asg_min_size: 1,
            asg_max_size: 2,
            asg_desired_capacity: 1,
            ..Default::default()
        }
    }

    /// Story: a config file keyed by the placeholder token is expanded
    /// to the cluster name, and key/name stay in sync.
    #[test]
    fn story_placeholder_expands_to_cluster_name() {
        let mut ngs = AddOnNodeGroups {
            enable: true,
            role_create: true,
            ..Default::default()
        };
        ngs.asgs
            .insert("GetRef.Name-ng-gpu".to_string(), gpu_asg("GetRef.Name-ng-gpu"));
        ngs.validate(&ctx(), false).unwrap();
        let asg = &ngs.asgs["c1-ng-gpu"];
        assert_eq!(asg.name, "c1-ng-gpu");
        // GPU family gets the GPU instance type default.
        assert_eq!(asg.instance_types, vec![DEFAULT_INSTANCE_TYPE_GPU]);
        assert!(ngs.gpu_ami_present());
    }

    #[test]
    fn story_key_name_mismatch_is_rejected() {
        let mut ngs = add_on_with("c1-ng-a", gpu_asg("c1-ng-b"));
        let err = ngs.validate(&ctx(), false).unwrap_err();
        assert!(err.to_string().contains("does not match"));
    }

    #[test]
    fn story_capacity_ordering_is_enforced() {
        // min above max
        let mut asg = gpu_asg("c1-ng-gpu");
        asg.asg_min_size = 3;
        asg.asg_max_size = 2;
        let mut ngs = add_on_with("c1-ng-gpu", asg);
        assert!(ngs.validate(&ctx(), false).is_err());

        // min above desired, both under max
        let mut asg = gpu_asg("c1-ng-gpu");
        asg.asg_min_size = 3;
        asg.asg_desired_capacity = 1;
        asg.asg_max_size = 5;
        let mut ngs = add_on_with("c1-ng-gpu", asg);
        let err = ngs.validate(&ctx(), false).unwrap_err();
        assert!(err.to_string().contains("asg-min-size 3 > asg-desired-capacity 1"));

        // full ordering is accepted
        let mut asg = gpu_asg("c1-ng-gpu");
        asg.asg_min_size = 1;
        asg.asg_desired_capacity = 3;
        asg.asg_max_size = 5;
        let mut ngs = add_on_with("c1-ng-gpu", asg);
        assert!(ngs.validate(&ctx(), false).is_ok());
    }

    #[test]
    fn story_old_instance_families_rejected_with_lb_add_ons() {
        let mut asg = gpu_asg("c1-ng-gpu");
        asg.instance_types = vec!["m3.xlarge".to_string()];
        let mut ngs = add_on_with("c1-ng-gpu", asg.clone());
        assert!(ngs.validate(&ctx(), true).is_err());

        // Same group is fine when no LB add-on is enabled.
        let mut ngs = add_on_with("c1-ng-gpu", asg);
        assert!(ngs.validate(&ctx(), false).is_ok());
    }

    #[test]
    fn story_bottlerocket_forbids_kubelet_extra_args() {
        let mut asg = gpu_asg("c1-ng-br");
        asg.ami_type = AMI_TYPE_BOTTLEROCKET.to_string();
        asg.kubelet_extra_args = "--max-pods=100".to_string();
        let mut ngs = add_on_with("c1-ng-br", asg);
        assert!(ngs.validate(&ctx(), false).is_err());
    }

    #[test]
    fn story_env_table_matches_struct() {
        crate::schema::verify::<AddOnNodeGroups>().unwrap();
    }
}
