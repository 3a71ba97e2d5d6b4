//! Kubernetes dashboard with a local kubectl proxy.

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::schema::{EnvSchema, FieldKind, FieldSpec};
use crate::timeutil::TimeFrame;

use super::{require_node_group, ClusterCtx};

pub const DEFAULT_DASHBOARD_URL: &str = "http://localhost:8001/api/v1/namespaces/kubernetes-dashboard/services/https:kubernetes-dashboard:/proxy/#/login";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct AddOnKubernetesDashboard {
    pub enable: bool,
    pub created: bool,
    #[serde(skip_serializing_if = "TimeFrame::is_unset")]
    pub time_frame_create: TimeFrame,
    #[serde(skip_serializing_if = "TimeFrame::is_unset")]
    pub time_frame_delete: TimeFrame,

    /// Login token; written after the dashboard is installed.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub authentication_token: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub url: String,
}

impl EnvSchema for AddOnKubernetesDashboard {
    const ENV_PREFIX: &'static str = "ADD_ON_KUBERNETES_DASHBOARD_";

    fn field_specs() -> &'static [FieldSpec] {
        const SPECS: &[FieldSpec] = &[
            FieldSpec::writable("enable", FieldKind::Bool),
            FieldSpec::read_only("created", FieldKind::Bool),
            FieldSpec::read_only("time-frame-create", FieldKind::Nested),
            FieldSpec::read_only("time-frame-delete", FieldKind::Nested),
            FieldSpec::read_only("authentication-token", FieldKind::String),
            FieldSpec::read_only("url", FieldKind::String),
        ];
        SPECS
    }
}

impl AddOnKubernetesDashboard {
    pub fn validate(&mut self, ctx: &ClusterCtx) -> Result<(), Error> {
        require_node_group("add-on-kubernetes-dashboard", ctx)?;
        if self.url.is_empty() {
            self.url = DEFAULT_DASHBOARD_URL.to_string();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn story_env_table_matches_struct() {
        crate::schema::verify::<super::AddOnKubernetesDashboard>().unwrap();
    }
}
