//! Hollow nodes: kubelets without machines, registered from the host
//! ("local") or from in-cluster pods ("remote").

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::randutil;
use crate::schema::{EnvSchema, FieldKind, FieldSpec};
use crate::timeutil::TimeFrame;

use super::{require_node_group, ClusterCtx};

// node label values are capped at 63 characters; the prefix gets
// "-ami-type" etc. appended
const MAX_LABEL_PREFIX_LEN: usize = 55;

fn default_labels(prefix: &str) -> BTreeMap<String, String> {
    let mut m = BTreeMap::new();
    m.insert("NodeType".to_string(), "hollow-node".to_string());
    m.insert("AMIType".to_string(), format!("{prefix}-ami-type"));
    m.insert("NGType".to_string(), format!("{prefix}-ng-type"));
    m.insert("NGName".to_string(), format!("{prefix}-ng-name"));
    m
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct AddOnHollowNodesLocal {
    pub enable: bool,
    pub created: bool,
    #[serde(skip_serializing_if = "TimeFrame::is_unset")]
    pub time_frame_create: TimeFrame,
    #[serde(skip_serializing_if = "TimeFrame::is_unset")]
    pub time_frame_delete: TimeFrame,

    pub nodes: i32,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub node_name_prefix: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub node_label_prefix: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub node_labels: BTreeMap<String, String>,

    pub max_open_files: i64,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub created_node_names: Vec<String>,
}

impl EnvSchema for AddOnHollowNodesLocal {
    const ENV_PREFIX: &'static str = "ADD_ON_HOLLOW_NODES_LOCAL_";

    fn field_specs() -> &'static [FieldSpec] {
        const SPECS: &[FieldSpec] = &[
            FieldSpec::writable("enable", FieldKind::Bool),
            FieldSpec::read_only("created", FieldKind::Bool),
            FieldSpec::read_only("time-frame-create", FieldKind::Nested),
            FieldSpec::read_only("time-frame-delete", FieldKind::Nested),
            FieldSpec::writable("nodes", FieldKind::I64),
            FieldSpec::writable("node-name-prefix", FieldKind::String),
            FieldSpec::writable("node-label-prefix", FieldKind::String),
            FieldSpec::read_only("node-labels", FieldKind::StringMap),
            FieldSpec::writable("max-open-files", FieldKind::I64),
            FieldSpec::read_only("created-node-names", FieldKind::StringVec),
        ];
        SPECS
    }
}

impl AddOnHollowNodesLocal {
    pub fn new_default() -> Self {
        Self {
            nodes: 2,
            node_name_prefix: format!("hollow{}", randutil::string(5)),
            max_open_files: 1_000_000,
            ..Default::default()
        }
    }

    pub fn validate(&mut self, _ctx: &ClusterCtx) -> Result<(), Error> {
        if self.nodes == 0 {
            self.nodes = 2;
        }
        if self.node_name_prefix.is_empty() {
            self.node_name_prefix = format!("hollow{}", randutil::string(5));
        }
        if self.node_label_prefix.is_empty() {
            self.node_label_prefix = format!("hollow{}", randutil::string(5));
        }
        if self.node_label_prefix.len() > MAX_LABEL_PREFIX_LEN {
            return Err(Error::validation(format!(
                "invalid node label prefix {:?} ({} characters)",
                self.node_label_prefix,
                self.node_label_prefix.len()
            )));
        }
        self.node_labels = default_labels(&self.node_label_prefix);
        if self.max_open_files == 0 {
            self.max_open_files = 1_000_000;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct AddOnHollowNodesRemote {
    pub enable: bool,
    pub created: bool,
    #[serde(skip_serializing_if = "TimeFrame::is_unset")]
    pub time_frame_create: TimeFrame,
    #[serde(skip_serializing_if = "TimeFrame::is_unset")]
    pub time_frame_delete: TimeFrame,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub namespace: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub node_label_prefix: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub node_labels: BTreeMap<String, String>,

    /// Hollow nodes per pod; total is `nodes * deployment_replicas`.
    pub nodes: i32,
    pub deployment_replicas: i32,
    pub max_open_files: i64,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub repository_account_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub repository_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub repository_uri: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub repository_image_tag: String,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub created_node_names: Vec<String>,
}

impl EnvSchema for AddOnHollowNodesRemote {
    const ENV_PREFIX: &'static str = "ADD_ON_HOLLOW_NODES_REMOTE_";

    fn field_specs() -> &'static [FieldSpec] {
        const SPECS: &[FieldSpec] = &[
            FieldSpec::writable("enable", FieldKind::Bool),
            FieldSpec::read_only("created", FieldKind::Bool),
            FieldSpec::read_only("time-frame-create", FieldKind::Nested),
            FieldSpec::read_only("time-frame-delete", FieldKind::Nested),
            FieldSpec::writable("namespace", FieldKind::String),
            FieldSpec::writable("node-label-prefix", FieldKind::String),
            FieldSpec::read_only("node-labels", FieldKind::StringMap),
            FieldSpec::writable("nodes", FieldKind::I64),
            FieldSpec::writable("deployment-replicas", FieldKind::I64),
            FieldSpec::writable("max-open-files", FieldKind::I64),
            FieldSpec::writable("repository-account-id", FieldKind::String),
            FieldSpec::writable("repository-name", FieldKind::String),
            FieldSpec::writable("repository-uri", FieldKind::String),
            FieldSpec::writable("repository-image-tag", FieldKind::String),
            FieldSpec::read_only("created-node-names", FieldKind::StringVec),
        ];
        SPECS
    }
}

impl AddOnHollowNodesRemote {
    pub fn new_default() -> Self {
        Self {
            nodes: 2,
            deployment_replicas: 5,
            max_open_files: 1_000_000,
            ..Default::default()
        }
    }

    /// Number of fake nodes this add-on registers.
    pub fn total_nodes(&self) -> i64 {
        self.nodes as i64 * self.deployment_replicas as i64
    }

    pub fn validate(&mut self, ctx: &ClusterCtx) -> Result<(), Error> {
        require_node_group("add-on-hollow-nodes-remote", ctx)?;
        if self.repository_account_id.is_empty()
            || self.repository_name.is_empty()
            || self.repository_image_tag.is_empty()
        {
            return Err(Error::validation(
                "add-on-hollow-nodes-remote requires repository coordinates",
            ));
        }
        if self.namespace.is_empty() {
            self.namespace = ctx.namespace("hollow-nodes-remote");
        }
        if self.nodes == 0 {
            self.nodes = 2;
        }
        if self.deployment_replicas == 0 {
            self.deployment_replicas = 5;
        }
        if self.node_label_prefix.is_empty() {
            self.node_label_prefix = format!("hollow{}", randutil::string(5));
        }
        if self.node_label_prefix.len() > MAX_LABEL_PREFIX_LEN {
            return Err(Error::validation(format!(
                "invalid node label prefix {:?} ({} characters)",
                self.node_label_prefix,
                self.node_label_prefix.len()
            )));
        }
        self.node_labels = default_labels(&self.node_label_prefix);
        if self.max_open_files == 0 {
            self.max_open_files = 1_000_000;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn story_env_tables_match_structs() {
        crate::schema::verify::<AddOnHollowNodesLocal>().unwrap();
        crate::schema::verify::<AddOnHollowNodesRemote>().unwrap();
    }

    #[test]
    fn story_label_prefix_is_bounded() {
        let mut add_on = AddOnHollowNodesLocal::new_default();
        add_on.enable = true;
        add_on.node_label_prefix = "p".repeat(56);
        assert!(add_on.validate(&Default::default()).is_err());
    }

    #[test]
    fn story_remote_nodes_multiply_by_replicas() {
        let add_on = AddOnHollowNodesRemote {
            nodes: 5,
            deployment_replicas: 10,
            ..Default::default()
        };
        assert_eq!(add_on.total_nodes(), 50);
    }
}
