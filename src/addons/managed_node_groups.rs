//! EKS-managed node groups.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::schema::{EnvSchema, FieldKind, FieldSpec};
use crate::timeutil::TimeFrame;

use super::node_groups::{
    name_from_arn, AMI_TYPE_AL2_X86_64, AMI_TYPE_AL2_X86_64_GPU, DEFAULT_INSTANCE_TYPE_CPU,
    DEFAULT_INSTANCE_TYPE_GPU, DEFAULT_VOLUME_SIZE_GB, NAME_PLACEHOLDER,
};
use super::{require_min_version, ClusterCtx};

/// Maximum number of managed node groups per cluster.
pub const MAX_GROUPS: usize = 10;
/// Maximum nodes per managed node group; lower than the self-managed
/// limit, enforced by the EKS API.
pub const MAX_NODES_PER_GROUP: u32 = 100;

/// One managed node group. Bottlerocket is not valid here; the managed
/// API only offers the AL2 families.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct Mng {
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub remote_access_user_name: String,
    /// Auto-filled by the EKS API when left empty.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub release_version: String,
    pub ami_type: String,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub instance_types: Vec<String>,
    pub volume_size: u32,

    pub asg_min_size: u32,
    pub asg_max_size: u32,
    pub asg_desired_capacity: u32,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub cfn_stack_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub remote_access_security_group_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub status: String,
    pub created: bool,
}

impl Mng {
    pub fn is_gpu(&self) -> bool {
        self.ami_type == AMI_TYPE_AL2_X86_64_GPU
    }

    pub fn field_specs() -> &'static [FieldSpec] {
        const SPECS: &[FieldSpec] = &[
            FieldSpec::writable("name", FieldKind::String),
            FieldSpec::writable("remote-access-user-name", FieldKind::String),
            FieldSpec::writable("release-version", FieldKind::String),
            FieldSpec::writable("ami-type", FieldKind::String),
            FieldSpec::writable("instance-types", FieldKind::StringVec),
            FieldSpec::writable("volume-size", FieldKind::U64),
            FieldSpec::writable("asg-min-size", FieldKind::U64),
            FieldSpec::writable("asg-max-size", FieldKind::U64),
            FieldSpec::writable("asg-desired-capacity", FieldKind::U64),
            FieldSpec::read_only("cfn-stack-id", FieldKind::String),
            FieldSpec::read_only("remote-access-security-group-id", FieldKind::String),
            FieldSpec::read_only("status", FieldKind::String),
            FieldSpec::read_only("created", FieldKind::Bool),
        ];
        SPECS
    }

    fn validate(&mut self, key: &str, lb_addon_enabled: bool) -> Result<(), Error> {
        if self.instance_types.len() > 4 {
            return Err(Error::validation(format!(
                "mngs[{key:?}] declares too many instance types {:?}",
                self.instance_types
            )));
        }
        if self.volume_size == 0 {
            self.volume_size = DEFAULT_VOLUME_SIZE_GB;
        }
        if self.remote_access_user_name.is_empty() {
            self.remote_access_user_name = "ec2-user".to_string();
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
            other => {
                return Err(Error::validation(format!(
                    "mngs[{key:?}] has unknown ami-type {other:?}"
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
                "mngs[{key:?}] asg-min-size {} > asg-max-size {}",
                self.asg_min_size, self.asg_max_size
            )));
        }
        if self.asg_min_size > self.asg_desired_capacity {
            return Err(Error::validation(format!(
                "mngs[{key:?}] asg-min-size {} > asg-desired-capacity {}",
                self.asg_min_size, self.asg_desired_capacity
            )));
        }
        if self.asg_desired_capacity > self.asg_max_size {
            return Err(Error::validation(format!(
                "mngs[{key:?}] asg-desired-capacity {} > asg-max-size {}",
                self.asg_desired_capacity, self.asg_max_size
            )));
        }
        if self.asg_desired_capacity == 0 {
            return Err(Error::validation(format!(
                "mngs[{key:?}] asg-desired-capacity must be positive"
            )));
        }
        if self.asg_max_size > MAX_NODES_PER_GROUP {
            return Err(Error::validation(format!(
                "mngs[{key:?}] asg-max-size {} > limit {}",
                self.asg_max_size, MAX_NODES_PER_GROUP
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct AddOnManagedNodeGroups {
    pub enable: bool,
    pub created: bool,
    #[serde(skip_serializing_if = "TimeFrame::is_unset")]
    pub time_frame_create: TimeFrame,
    #[serde(skip_serializing_if = "TimeFrame::is_unset")]
    pub time_frame_delete: TimeFrame,

    pub fetch_logs: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub logs_dir: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub signing_name: String,

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
    pub mngs: BTreeMap<String, Mng>,
}

impl EnvSchema for AddOnManagedNodeGroups {
    const ENV_PREFIX: &'static str = "ADD_ON_MANAGED_NODE_GROUPS_";

    fn field_specs() -> &'static [FieldSpec] {
        const SPECS: &[FieldSpec] = &[
            FieldSpec::writable("enable", FieldKind::Bool),
            FieldSpec::read_only("created", FieldKind::Bool),
            FieldSpec::read_only("time-frame-create", FieldKind::Nested),
            FieldSpec::read_only("time-frame-delete", FieldKind::Nested),
            FieldSpec::writable("fetch-logs", FieldKind::Bool),
            FieldSpec::writable("logs-dir", FieldKind::String),
            FieldSpec::writable("signing-name", FieldKind::String),
            FieldSpec::writable("role-create", FieldKind::Bool),
            FieldSpec::writable("role-name", FieldKind::String),
            FieldSpec::writable("role-arn", FieldKind::String),
            FieldSpec::writable("role-service-principals", FieldKind::StringVec),
            FieldSpec::writable("role-managed-policy-arns", FieldKind::StringVec),
            FieldSpec::read_only("role-cfn-stack-id", FieldKind::String),
            FieldSpec::writable("mngs", FieldKind::EntryMap(Mng::field_specs)),
        ];
        SPECS
    }
}

impl AddOnManagedNodeGroups {
    pub fn new_default(cluster_name: &str) -> Self {
        let mng_name = format!("{cluster_name}-mng-cpu");
        let mut mngs = BTreeMap::new();
        mngs.insert(
            mng_name.clone(),
            Mng {
                name: mng_name,
                remote_access_user_name: "ec2-user".to_string(),
                ami_type: AMI_TYPE_AL2_X86_64.to_string(),
                instance_types: vec![DEFAULT_INSTANCE_TYPE_CPU.to_string()],
                volume_size: DEFAULT_VOLUME_SIZE_GB,
                asg_min_size: 2,
                asg_max_size: 2,
                asg_desired_capacity: 2,
                ..Default::default()
            },
        );
        Self {
            enable: false,
            fetch_logs: true,
            signing_name: "eks".to_string(),
            role_create: true,
            mngs,
            ..Default::default()
        }
    }

    pub fn gpu_ami_present(&self) -> bool {
        self.mngs.values().any(Mng::is_gpu)
    }

    pub fn x86_ami_present(&self) -> bool {
        // Both managed families are x86.
        !self.mngs.is_empty()
    }

    pub fn max_desired_capacity(&self) -> u32 {
        self.mngs
            .values()
            .map(|m| m.asg_desired_capacity)
            .max()
            .unwrap_or(0)
    }

    pub fn total_nodes(&self) -> u64 {
        self.mngs
            .values()
            .map(|m| u64::from(m.asg_desired_capacity))
            .sum()
    }

    /// `asg_names` carries the self-managed group names so the two
    /// add-ons cannot collide.
    pub fn validate(
        &mut self,
        ctx: &ClusterCtx,
        lb_addon_enabled: bool,
        asg_names: &[String],
    ) -> Result<(), Error> {
        if self.mngs.is_empty() {
            return Err(Error::validation("add-on-managed-node-groups mngs is empty"));
        }
        if self.mngs.len() > MAX_GROUPS {
            return Err(Error::validation(format!(
                "{} managed node groups exceeds the limit {}",
                self.mngs.len(),
                MAX_GROUPS
            )));
        }
        require_min_version("add-on-managed-node-groups", ctx)?;

        if self.logs_dir.is_empty() {
            self.logs_dir = ctx.artifact_path("logs-mngs");
        }
        if self.signing_name.is_empty() {
            self.signing_name = "eks".to_string();
        }

        if self.role_create {
            if self.role_name.is_empty() {
                self.role_name = format!("{}-role-mng", ctx.cluster_name);
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

        let mut processed: BTreeMap<String, Mng> = BTreeMap::new();
        for (key, mut mng) in std::mem::take(&mut self.mngs) {
            let key = key.replace(NAME_PLACEHOLDER, &ctx.cluster_name);
            mng.name = mng.name.replace(NAME_PLACEHOLDER, &ctx.cluster_name);
            if mng.name.is_empty() {
                return Err(Error::validation(format!("mngs[{key:?}] name is empty")));
            }
            if key != mng.name {
                return Err(Error::validation(format!(
                    "mngs[{key:?}] name field {:?} does not match its key",
                    mng.name
                )));
            }
            if asg_names.contains(&mng.name) {
                return Err(Error::validation(format!(
                    "mngs[{key:?}] name conflicts with a self-managed node group"
                )));
            }
            mng.validate(&key, lb_addon_enabled)?;
            if processed.insert(key.clone(), mng).is_some() {
                return Err(Error::validation(format!(
                    "mngs[{key:?}] name is redundant"
                )));
            }
        }
        self.mngs = processed;
        Ok(())
    }
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
            node_group_enabled: true,
            ..Default::default()
        }
    }

    fn add_on_with(key: &str, mng: Mng) -> AddOnManagedNodeGroups {
        let mut add_on = AddOnManagedNodeGroups {
            enable: true,
            role_create: true,
            ..Default::default()
        };
        add_on.mngs.insert(key.to_string(), mng);
        add_on
    }

    fn mng(name: &str, desired: u32) -> Mng {
        Mng {
            name: name.to_string(),
            ami_type: AMI_TYPE_AL2_X86_64.to_string(),
            asg_min_size: 1,
            asg_max_size: desired.max(1),
            asg_desired_capacity: desired,
            ..Default::default()
        }
    }

    /// Story: the managed group limit is lower than the self-managed
    /// one; 100 nodes per group is the ceiling.
    #[test]
    fn story_managed_group_node_limit() {
        let mut add_on = add_on_with("c1-mng", mng("c1-mng", 101));
        assert!(add_on.validate(&ctx(), false, &[]).is_err());

        let mut add_on = add_on_with("c1-mng", mng("c1-mng", 100));
        assert!(add_on.validate(&ctx(), false, &[]).is_ok());
    }

    #[test]
    fn story_capacity_ordering_is_enforced() {
        let mut entry = mng("c1-mng", 1);
        entry.asg_min_size = 3;
        entry.asg_max_size = 5;
        let mut add_on = add_on_with("c1-mng", entry);
        let err = add_on.validate(&ctx(), false, &[]).unwrap_err();
        assert!(err.to_string().contains("asg-min-size 3 > asg-desired-capacity 1"));
    }

    #[test]
    fn story_name_conflict_with_self_managed_groups() {
        let mut add_on = add_on_with("c1-ng", mng("c1-ng", 1));
        let err = add_on
            .validate(&ctx(), false, &["c1-ng".to_string()])
            .unwrap_err();
        assert!(err.to_string().contains("conflicts"));
    }

    #[test]
    fn story_env_table_matches_struct() {
        crate::schema::verify::<AddOnManagedNodeGroups>().unwrap();
    }
}
