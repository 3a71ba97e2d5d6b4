//! CloudWatch agent daemonset.

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::schema::{EnvSchema, FieldKind, FieldSpec};
use crate::timeutil::TimeFrame;

use super::{require_node_group, ClusterCtx};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct AddOnCwAgent {
    pub enable: bool,
    pub created: bool,
    #[serde(skip_serializing_if = "TimeFrame::is_unset")]
    pub time_frame_create: TimeFrame,
    #[serde(skip_serializing_if = "TimeFrame::is_unset")]
    pub time_frame_delete: TimeFrame,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub namespace: String,
}

impl EnvSchema for AddOnCwAgent {
    const ENV_PREFIX: &'static str = "ADD_ON_CW_AGENT_";

    fn field_specs() -> &'static [FieldSpec] {
        const SPECS: &[FieldSpec] = &[
            FieldSpec::writable("enable", FieldKind::Bool),
            FieldSpec::read_only("created", FieldKind::Bool),
            FieldSpec::read_only("time-frame-create", FieldKind::Nested),
            FieldSpec::read_only("time-frame-delete", FieldKind::Nested),
            FieldSpec::writable("namespace", FieldKind::String),
        ];
        SPECS
    }
}

impl AddOnCwAgent {
    pub fn validate(&mut self, ctx: &ClusterCtx) -> Result<(), Error> {
        require_node_group("add-on-cw-agent", ctx)?;
        if self.namespace.is_empty() {
            self.namespace = ctx.namespace("cw-agent");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn story_env_table_matches_struct() {
        crate::schema::verify::<super::AddOnCwAgent>().unwrap();
    }
}
