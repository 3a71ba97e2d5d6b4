//! EBS CSI driver, installed with helm.

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::schema::{EnvSchema, FieldKind, FieldSpec};
use crate::timeutil::TimeFrame;

use super::{require_node_group, ClusterCtx};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct AddOnCsiEbs {
    pub enable: bool,
    pub created: bool,
    #[serde(skip_serializing_if = "TimeFrame::is_unset")]
    pub time_frame_create: TimeFrame,
    #[serde(skip_serializing_if = "TimeFrame::is_unset")]
    pub time_frame_delete: TimeFrame,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub chart_repo_url: String,
}

impl EnvSchema for AddOnCsiEbs {
    const ENV_PREFIX: &'static str = "ADD_ON_CSI_EBS_";

    fn field_specs() -> &'static [FieldSpec] {
        const SPECS: &[FieldSpec] = &[
            FieldSpec::writable("enable", FieldKind::Bool),
            FieldSpec::read_only("created", FieldKind::Bool),
            FieldSpec::read_only("time-frame-create", FieldKind::Nested),
            FieldSpec::read_only("time-frame-delete", FieldKind::Nested),
            FieldSpec::writable("chart-repo-url", FieldKind::String),
        ];
        SPECS
    }
}

impl AddOnCsiEbs {
    pub fn new_default() -> Self {
        Self {
            chart_repo_url: "https://kubernetes-sigs.github.io/aws-ebs-csi-driver"
                .to_string(),
            ..Default::default()
        }
    }

    pub fn validate(&mut self, ctx: &ClusterCtx) -> Result<(), Error> {
        require_node_group("add-on-csi-ebs", ctx)?;
        if self.chart_repo_url.is_empty() {
            return Err(Error::validation("add-on-csi-ebs chart-repo-url is empty"));
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
        crate::schema::verify::<AddOnCsiEbs>().unwrap();
    }

    #[test]
    fn story_chart_repo_url_is_required() {
        let mut add_on = AddOnCsiEbs {
            enable: true,
            ..Default::default()
        };
        let ctx = ClusterCtx {
            node_group_enabled: true,
            ..Default::default()
        };
        assert!(add_on.validate(&ctx).is_err());
    }
}
