//! 2048 game behind an application load balancer, with the ALB
//! ingress controller.

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::schema::{EnvSchema, FieldKind, FieldSpec};
use crate::timeutil::TimeFrame;

use super::{require_node_group, ClusterCtx};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct AddOnAlb2048 {
    pub enable: bool,
    pub created: bool,
    #[serde(skip_serializing_if = "TimeFrame::is_unset")]
    pub time_frame_create: TimeFrame,
    #[serde(skip_serializing_if = "TimeFrame::is_unset")]
    pub time_frame_delete: TimeFrame,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    pub deployment_replicas_alb: i32,
    #[serde(rename = "deployment-replicas-2048")]
    pub deployment_replicas_2048: i32,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub deployment_node_selector_2048: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub alb_arn: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub alb_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub url: String,
}

impl EnvSchema for AddOnAlb2048 {
    const ENV_PREFIX: &'static str = "ADD_ON_ALB_2048_";

    fn field_specs() -> &'static [FieldSpec] {
        const SPECS: &[FieldSpec] = &[
            FieldSpec::writable("enable", FieldKind::Bool),
            FieldSpec::read_only("created", FieldKind::Bool),
            FieldSpec::read_only("time-frame-create", FieldKind::Nested),
            FieldSpec::read_only("time-frame-delete", FieldKind::Nested),
            FieldSpec::writable("namespace", FieldKind::String),
            FieldSpec::writable("deployment-replicas-alb", FieldKind::I64),
            FieldSpec::writable("deployment-replicas-2048", FieldKind::I64),
            FieldSpec::writable("deployment-node-selector-2048", FieldKind::String),
            FieldSpec::read_only("alb-arn", FieldKind::String),
            FieldSpec::read_only("alb-name", FieldKind::String),
            FieldSpec::read_only("url", FieldKind::String),
        ];
        SPECS
    }
}

impl AddOnAlb2048 {
    pub fn new_default() -> Self {
        Self {
            deployment_replicas_alb: 3,
            deployment_replicas_2048: 3,
            ..Default::default()
        }
    }

    pub fn validate(&mut self, ctx: &ClusterCtx) -> Result<(), Error> {
        require_node_group("add-on-alb-2048", ctx)?;
        if self.namespace.is_empty() {
            self.namespace = ctx.namespace("alb-2048");
        }
        if self.deployment_replicas_alb <= 0 {
            self.deployment_replicas_alb = 3;
        }
        if self.deployment_replicas_2048 <= 0 {
            self.deployment_replicas_2048 = 3;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn story_env_table_matches_struct() {
        crate::schema::verify::<super::AddOnAlb2048>().unwrap();
    }
}
