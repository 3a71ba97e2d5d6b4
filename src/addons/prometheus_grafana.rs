//! Prometheus and Grafana, backed by EBS persistent volumes.

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::randutil;
use crate::schema::{EnvSchema, FieldKind, FieldSpec};
use crate::timeutil::TimeFrame;

use super::{require_node_group, ClusterCtx};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct AddOnPrometheusGrafana {
    pub enable: bool,
    pub created: bool,
    #[serde(skip_serializing_if = "TimeFrame::is_unset")]
    pub time_frame_create: TimeFrame,
    #[serde(skip_serializing_if = "TimeFrame::is_unset")]
    pub time_frame_delete: TimeFrame,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub grafana_admin_user_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub grafana_admin_password: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub grafana_nlb_arn: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub grafana_nlb_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub grafana_url: String,
}

impl EnvSchema for AddOnPrometheusGrafana {
    const ENV_PREFIX: &'static str = "ADD_ON_PROMETHEUS_GRAFANA_";

    fn field_specs() -> &'static [FieldSpec] {
        const SPECS: &[FieldSpec] = &[
            FieldSpec::writable("enable", FieldKind::Bool),
            FieldSpec::read_only("created", FieldKind::Bool),
            FieldSpec::read_only("time-frame-create", FieldKind::Nested),
            FieldSpec::read_only("time-frame-delete", FieldKind::Nested),
            FieldSpec::writable("grafana-admin-user-name", FieldKind::String),
            FieldSpec::writable("grafana-admin-password", FieldKind::String),
            FieldSpec::read_only("grafana-nlb-arn", FieldKind::String),
            FieldSpec::read_only("grafana-nlb-name", FieldKind::String),
            FieldSpec::read_only("grafana-url", FieldKind::String),
        ];
        SPECS
    }
}

impl AddOnPrometheusGrafana {
    pub fn new_default() -> Self {
        Self {
            grafana_admin_user_name: "admin".to_string(),
            ..Default::default()
        }
    }

    pub fn validate(&mut self, ctx: &ClusterCtx) -> Result<(), Error> {
        require_node_group("add-on-prometheus-grafana", ctx)?;
        if !ctx.csi_ebs_enabled {
            return Err(Error::missing_dependency(
                "add-on-prometheus-grafana",
                "add-on-csi-ebs",
            ));
        }
        // persistent volumes cannot mount on Bottlerocket-only fleets
        if !ctx.x86_ami_present {
            return Err(Error::missing_dependency(
                "add-on-prometheus-grafana",
                "an x86 AMI node group",
            ));
        }
        if self.grafana_admin_user_name.is_empty() {
            self.grafana_admin_user_name = randutil::string(10);
        }
        if self.grafana_admin_password.is_empty() {
            self.grafana_admin_password = randutil::string(10);
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
        crate::schema::verify::<AddOnPrometheusGrafana>().unwrap();
    }

    #[test]
    fn story_requires_csi_ebs() {
        let mut add_on = AddOnPrometheusGrafana::new_default();
        add_on.enable = true;
        let ctx = ClusterCtx {
            cluster_name: "c1".to_string(),
            node_group_enabled: true,
            x86_ami_present: true,
            csi_ebs_enabled: false,
            ..Default::default()
        };
        assert!(matches!(
            add_on.validate(&ctx),
            Err(Error::MissingDependency { .. })
        ));
    }
}
