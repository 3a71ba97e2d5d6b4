//! JupyterHub on GPU nodes.

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::randutil;
use crate::schema::{EnvSchema, FieldKind, FieldSpec};
use crate::timeutil::TimeFrame;

use super::{require_gpu_ami, require_node_group, ClusterCtx};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct AddOnJupyterHub {
    pub enable: bool,
    pub created: bool,
    #[serde(skip_serializing_if = "TimeFrame::is_unset")]
    pub time_frame_create: TimeFrame,
    #[serde(skip_serializing_if = "TimeFrame::is_unset")]
    pub time_frame_delete: TimeFrame,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    /// Hex token shared between the hub and its proxy.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub proxy_secret_token: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub nlb_arn: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub nlb_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub url: String,
}

impl EnvSchema for AddOnJupyterHub {
    const ENV_PREFIX: &'static str = "ADD_ON_JUPYTER_HUB_";

    fn field_specs() -> &'static [FieldSpec] {
        const SPECS: &[FieldSpec] = &[
            FieldSpec::writable("enable", FieldKind::Bool),
            FieldSpec::read_only("created", FieldKind::Bool),
            FieldSpec::read_only("time-frame-create", FieldKind::Nested),
            FieldSpec::read_only("time-frame-delete", FieldKind::Nested),
            FieldSpec::writable("namespace", FieldKind::String),
            FieldSpec::writable("proxy-secret-token", FieldKind::String),
            FieldSpec::read_only("nlb-arn", FieldKind::String),
            FieldSpec::read_only("nlb-name", FieldKind::String),
            FieldSpec::read_only("url", FieldKind::String),
        ];
        SPECS
    }
}

impl AddOnJupyterHub {
    pub fn validate(&mut self, ctx: &ClusterCtx) -> Result<(), Error> {
        require_node_group("add-on-jupyter-hub", ctx)?;
        require_gpu_ami("add-on-jupyter-hub", ctx)?;
        if self.namespace.is_empty() {
            self.namespace = ctx.namespace("jupyter-hub");
        }
        if self.proxy_secret_token.is_empty() {
            self.proxy_secret_token = randutil::hex_string(32);
        }
        if !randutil::is_hex(&self.proxy_secret_token) {
            return Err(Error::validation(format!(
                "cannot hex decode proxy-secret-token {:?}",
                self.proxy_secret_token
            )));
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
        crate::schema::verify::<AddOnJupyterHub>().unwrap();
    }

    #[test]
    fn story_proxy_token_must_be_hex() {
        let mut add_on = AddOnJupyterHub {
            enable: true,
            proxy_secret_token: "zz-not-hex".to_string(),
            ..Default::default()
        };
        let ctx = ClusterCtx {
            cluster_name: "c1".to_string(),
            node_group_enabled: true,
            gpu_ami_present: true,
            ..Default::default()
        };
        assert!(add_on.validate(&ctx).is_err());
    }
}
