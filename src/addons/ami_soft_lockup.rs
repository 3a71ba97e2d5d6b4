//! Reproducer for the kernel soft-lockup reported against the EKS
//! worker AMI.
//!
//! ref. https://github.com/awslabs/amazon-eks-ami/issues/454

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::schema::{EnvSchema, FieldKind, FieldSpec};
use crate::timeutil::TimeFrame;

use super::{require_node_group, ClusterCtx};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct AddOnAmiSoftLockupIssue454 {
    pub enable: bool,
    pub created: bool,
    #[serde(skip_serializing_if = "TimeFrame::is_unset")]
    pub time_frame_create: TimeFrame,
    #[serde(skip_serializing_if = "TimeFrame::is_unset")]
    pub time_frame_delete: TimeFrame,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub namespace: String,

    pub deployment_replicas: i32,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub deployment_node_selector: BTreeMap<String, String>,
}

impl EnvSchema for AddOnAmiSoftLockupIssue454 {
    const ENV_PREFIX: &'static str = "ADD_ON_AMI_SOFT_LOCKUP_ISSUE_454_";

    fn field_specs() -> &'static [FieldSpec] {
        const SPECS: &[FieldSpec] = &[
            FieldSpec::writable("enable", FieldKind::Bool),
            FieldSpec::read_only("created", FieldKind::Bool),
            FieldSpec::read_only("time-frame-create", FieldKind::Nested),
            FieldSpec::read_only("time-frame-delete", FieldKind::Nested),
            FieldSpec::writable("namespace", FieldKind::String),
            FieldSpec::writable("deployment-replicas", FieldKind::I64),
            FieldSpec::writable("deployment-node-selector", FieldKind::StringMap),
        ];
        SPECS
    }
}

impl AddOnAmiSoftLockupIssue454 {
    pub fn new_default() -> Self {
        Self {
            deployment_replicas: 2,
            ..Default::default()
        }
    }

    pub fn validate(&mut self, ctx: &ClusterCtx) -> Result<(), Error> {
        require_node_group("add-on-ami-soft-lockup-issue-454", ctx)?;
        if self.namespace.is_empty() {
            self.namespace = ctx.namespace("ami-soft-lockup-issue-454");
        }
        if self.deployment_replicas == 0 {
            self.deployment_replicas = 2;
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
        crate::schema::verify::<AddOnAmiSoftLockupIssue454>().unwrap();
    }

    #[test]
    fn story_namespace_defaults_from_cluster_name() {
        let mut add_on = AddOnAmiSoftLockupIssue454::new_default();
        add_on.enable = true;
        let ctx = ClusterCtx {
            cluster_name: "c1".to_string(),
            node_group_enabled: true,
            ..Default::default()
        };
        add_on.validate(&ctx).unwrap();
        assert_eq!(add_on.namespace, "c1-ami-soft-lockup-issue-454");
    }
}
