//! Wordpress with a MariaDB persistent volume.

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::randutil;
use crate::schema::{EnvSchema, FieldKind, FieldSpec};
use crate::timeutil::TimeFrame;

use super::{require_node_group, ClusterCtx};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct AddOnWordpress {
    pub enable: bool,
    pub created: bool,
    #[serde(skip_serializing_if = "TimeFrame::is_unset")]
    pub time_frame_create: TimeFrame,
    #[serde(skip_serializing_if = "TimeFrame::is_unset")]
    pub time_frame_delete: TimeFrame,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub user_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub password: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub nlb_arn: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub nlb_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub url: String,
}

impl EnvSchema for AddOnWordpress {
    const ENV_PREFIX: &'static str = "ADD_ON_WORDPRESS_";

    fn field_specs() -> &'static [FieldSpec] {
        const SPECS: &[FieldSpec] = &[
            FieldSpec::writable("enable", FieldKind::Bool),
            FieldSpec::read_only("created", FieldKind::Bool),
            FieldSpec::read_only("time-frame-create", FieldKind::Nested),
            FieldSpec::read_only("time-frame-delete", FieldKind::Nested),
            FieldSpec::writable("namespace", FieldKind::String),
            FieldSpec::writable("user-name", FieldKind::String),
            FieldSpec::writable("password", FieldKind::String),
            FieldSpec::read_only("nlb-arn", FieldKind::String),
            FieldSpec::read_only("nlb-name", FieldKind::String),
            FieldSpec::read_only("url", FieldKind::String),
        ];
        SPECS
    }
}

impl AddOnWordpress {
    pub fn new_default() -> Self {
        Self {
            user_name: "user".to_string(),
            ..Default::default()
        }
    }

    pub fn validate(&mut self, ctx: &ClusterCtx) -> Result<(), Error> {
        require_node_group("add-on-wordpress", ctx)?;
        if !ctx.csi_ebs_enabled {
            return Err(Error::missing_dependency(
                "add-on-wordpress",
                "add-on-csi-ebs",
            ));
        }
        // persistent volumes cannot mount on Bottlerocket-only fleets
        if !ctx.x86_ami_present {
            return Err(Error::missing_dependency(
                "add-on-wordpress",
                "an x86 AMI node group",
            ));
        }
        if self.namespace.is_empty() {
            self.namespace = ctx.namespace("wordpress");
        }
        if self.user_name.is_empty() {
            self.user_name = "user".to_string();
        }
        if self.password.is_empty() {
            self.password = randutil::string(10);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn story_env_table_matches_struct() {
        crate::schema::verify::<super::AddOnWordpress>().unwrap();
    }
}
