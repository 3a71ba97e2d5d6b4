//! VPC CNI network plug-in overrides.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::schema::{EnvSchema, FieldKind, FieldSpec};
use crate::timeutil::TimeFrame;

use super::ClusterCtx;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct AddOnCniVpc {
    pub enable: bool,
    pub created: bool,
    #[serde(skip_serializing_if = "TimeFrame::is_unset")]
    pub time_frame_create: TimeFrame,
    #[serde(skip_serializing_if = "TimeFrame::is_unset")]
    pub time_frame_delete: TimeFrame,

    /// Plug-in release branch, e.g. "v1.7".
    #[serde(skip_serializing_if = "String::is_empty")]
    pub version: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub repository_init_account_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub repository_init_region: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub repository_init_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub repository_init_image_tag: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub repository_account_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub repository_region: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub repository_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub repository_image_tag: String,

    pub minimum_ip_target: i64,
    pub warm_ip_target: i64,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub node_selector: BTreeMap<String, String>,
}

impl EnvSchema for AddOnCniVpc {
    const ENV_PREFIX: &'static str = "ADD_ON_CNI_VPC_";

    fn field_specs() -> &'static [FieldSpec] {
        const SPECS: &[FieldSpec] = &[
            FieldSpec::writable("enable", FieldKind::Bool),
            FieldSpec::read_only("created", FieldKind::Bool),
            FieldSpec::read_only("time-frame-create", FieldKind::Nested),
            FieldSpec::read_only("time-frame-delete", FieldKind::Nested),
            FieldSpec::writable("version", FieldKind::String),
            FieldSpec::writable("repository-init-account-id", FieldKind::String),
            FieldSpec::writable("repository-init-region", FieldKind::String),
            FieldSpec::writable("repository-init-name", FieldKind::String),
            FieldSpec::writable("repository-init-image-tag", FieldKind::String),
            FieldSpec::writable("repository-account-id", FieldKind::String),
            FieldSpec::writable("repository-region", FieldKind::String),
            FieldSpec::writable("repository-name", FieldKind::String),
            FieldSpec::writable("repository-image-tag", FieldKind::String),
            FieldSpec::writable("minimum-ip-target", FieldKind::I64),
            FieldSpec::writable("warm-ip-target", FieldKind::I64),
            FieldSpec::writable("node-selector", FieldKind::StringMap),
        ];
        SPECS
    }
}

impl AddOnCniVpc {
    pub fn new_default() -> Self {
        let mut node_selector = BTreeMap::new();
        // never schedule the CNI daemonset onto hollow nodes
        node_selector.insert("NodeType".to_string(), "regular".to_string());
        Self {
            version: "v1.7".to_string(),
            node_selector,
            ..Default::default()
        }
    }

    pub fn validate(&mut self, _ctx: &ClusterCtx) -> Result<(), Error> {
        if self.version.is_empty() {
            self.version = "v1.7".to_string();
        }
        if self.minimum_ip_target < 0 || self.warm_ip_target < 0 {
            return Err(Error::validation(
                "cni-vpc ip targets must be non-negative",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn story_env_table_matches_struct() {
        crate::schema::verify::<AddOnCniVpc>().unwrap();
    }

    #[test]
    fn story_default_avoids_hollow_nodes() {
        let add_on = AddOnCniVpc::new_default();
        assert_eq!(add_on.node_selector["NodeType"], "regular");
    }
}
