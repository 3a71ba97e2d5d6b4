//! Hello-world deployment behind a network load balancer.

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::schema::{EnvSchema, FieldKind, FieldSpec};
use crate::timeutil::TimeFrame;

use super::{require_node_group, ClusterCtx};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct AddOnNlbHelloWorld {
    pub enable: bool,
    pub created: bool,
    #[serde(skip_serializing_if = "TimeFrame::is_unset")]
    pub time_frame_create: TimeFrame,
    #[serde(skip_serializing_if = "TimeFrame::is_unset")]
    pub time_frame_delete: TimeFrame,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    pub deployment_replicas: i32,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub deployment_node_selector: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub nlb_arn: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub nlb_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub url: String,
}

impl EnvSchema for AddOnNlbHelloWorld {
    const ENV_PREFIX: &'static str = "ADD_ON_NLB_HELLO_WORLD_";

    fn field_specs() -> &'static [FieldSpec] {
        const SPECS: &[FieldSpec] = &[
            FieldSpec::writable("enable", FieldKind::Bool),
            FieldSpec::read_only("created", FieldKind::Bool),
            FieldSpec::read_only("time-frame-create", FieldKind::Nested),
            FieldSpec::read_only("time-frame-delete", FieldKind::Nested),
            FieldSpec::writable("namespace", FieldKind::String),
            FieldSpec::writable("deployment-replicas", FieldKind::I64),
            FieldSpec::writable("deployment-node-selector", FieldKind::String),
            FieldSpec::read_only("nlb-arn", FieldKind::String),
            FieldSpec::read_only("nlb-name", FieldKind::String),
            FieldSpec::read_only("url", FieldKind::String),
        ];
        SPECS
    }
}

impl AddOnNlbHelloWorld {
    pub fn new_default() -> Self {
        Self {
            deployment_replicas: 3,
            ..Default::default()
        }
    }

    pub fn validate(&mut self, ctx: &ClusterCtx) -> Result<(), Error> {
        require_node_group("add-on-nlb-hello-world", ctx)?;
        if self.namespace.is_empty() {
            self.namespace = ctx.namespace("nlb-hello-world");
        }
        if self.deployment_replicas <= 0 {
            self.deployment_replicas = 3;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn story_env_table_matches_struct() {
        crate::schema::verify::<super::AddOnNlbHelloWorld>().unwrap();
    }
}
