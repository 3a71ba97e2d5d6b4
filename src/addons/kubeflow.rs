//! Kubeflow installed with kfctl.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::schema::{EnvSchema, FieldKind, FieldSpec};
use crate::timeutil::TimeFrame;

use super::{require_node_group, ClusterCtx};

pub const DEFAULT_KFCTL_PATH: &str = "/tmp/kfctl-test-v1.0.2";
pub const DEFAULT_KFCTL_DOWNLOAD_URL: &str = "https://github.com/kubeflow/kfctl/releases/download/v1.0.2/kfctl_v1.0.2-0-ga476281_linux.tar.gz";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct AddOnKubeflow {
    pub enable: bool,
    pub created: bool,
    #[serde(skip_serializing_if = "TimeFrame::is_unset")]
    pub time_frame_create: TimeFrame,
    #[serde(skip_serializing_if = "TimeFrame::is_unset")]
    pub time_frame_delete: TimeFrame,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub kfctl_path: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub kfctl_download_url: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub base_dir: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub kf_dir: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub kfctl_config_path: String,
}

impl EnvSchema for AddOnKubeflow {
    const ENV_PREFIX: &'static str = "ADD_ON_KUBEFLOW_";

    fn field_specs() -> &'static [FieldSpec] {
        const SPECS: &[FieldSpec] = &[
            FieldSpec::writable("enable", FieldKind::Bool),
            FieldSpec::read_only("created", FieldKind::Bool),
            FieldSpec::read_only("time-frame-create", FieldKind::Nested),
            FieldSpec::read_only("time-frame-delete", FieldKind::Nested),
            FieldSpec::writable("kfctl-path", FieldKind::String),
            FieldSpec::writable("kfctl-download-url", FieldKind::String),
            FieldSpec::writable("base-dir", FieldKind::String),
            FieldSpec::read_only("kf-dir", FieldKind::String),
            FieldSpec::read_only("kfctl-config-path", FieldKind::String),
        ];
        SPECS
    }
}

impl AddOnKubeflow {
    pub fn new_default() -> Self {
        Self {
            kfctl_path: DEFAULT_KFCTL_PATH.to_string(),
            kfctl_download_url: DEFAULT_KFCTL_DOWNLOAD_URL.to_string(),
            ..Default::default()
        }
    }

    pub fn validate(&mut self, ctx: &ClusterCtx) -> Result<(), Error> {
        require_node_group("add-on-kubeflow", ctx)?;
        if self.kfctl_path.is_empty() {
            self.kfctl_path = DEFAULT_KFCTL_PATH.to_string();
        }
        if self.kfctl_download_url.is_empty() {
            self.kfctl_download_url = DEFAULT_KFCTL_DOWNLOAD_URL.to_string();
        }
        if self.base_dir.is_empty() {
            self.base_dir = ctx.sibling_path(&format!("{}-kubeflow", ctx.cluster_name));
        }
        self.kf_dir = Path::new(&self.base_dir)
            .join(&ctx.cluster_name)
            .to_string_lossy()
            .into_owned();
        self.kfctl_config_path = Path::new(&self.kf_dir)
            .join("kfctl_aws.yaml")
            .to_string_lossy()
            .into_owned();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::addons::ClusterCtx;

    #[test]
    fn story_env_table_matches_struct() {
        crate::schema::verify::<AddOnKubeflow>().unwrap();
    }

    #[test]
    fn story_kf_dir_derived_from_base_dir() {
        let mut add_on = AddOnKubeflow::new_default();
        add_on.enable = true;
        let ctx = ClusterCtx {
            cluster_name: "c1".to_string(),
            config_path: "/tmp/c1.yaml".to_string(),
            node_group_enabled: true,
            ..Default::default()
        };
        add_on.validate(&ctx).unwrap();
        assert_eq!(add_on.base_dir, "/tmp/c1-kubeflow");
        assert_eq!(add_on.kf_dir, "/tmp/c1-kubeflow/c1");
        assert_eq!(add_on.kfctl_config_path, "/tmp/c1-kubeflow/c1/kfctl_aws.yaml");
    }
}
