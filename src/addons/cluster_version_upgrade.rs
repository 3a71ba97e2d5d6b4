//! In-place cluster version upgrade, driven after every other add-on
//! has been created against the original version.

use serde::{Deserialize, Serialize};

use crate::duration::HumanDuration;
use crate::error::Error;
use crate::schema::{EnvSchema, FieldKind, FieldSpec};
use crate::timeutil::TimeFrame;

use super::ClusterCtx;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct AddOnClusterVersionUpgrade {
    pub enable: bool,
    pub created: bool,
    #[serde(skip_serializing_if = "TimeFrame::is_unset")]
    pub time_frame_create: TimeFrame,
    #[serde(skip_serializing_if = "TimeFrame::is_unset")]
    pub time_frame_delete: TimeFrame,

    /// Wait before sending the upgrade request, so the control plane
    /// settles after add-on creation.
    #[serde(skip_serializing_if = "HumanDuration::is_zero")]
    pub initial_wait: HumanDuration,

    /// Target Kubernetes version, e.g. "1.18".
    #[serde(skip_serializing_if = "String::is_empty")]
    pub version: String,
    pub version_value: f64,
}

impl EnvSchema for AddOnClusterVersionUpgrade {
    const ENV_PREFIX: &'static str = "ADD_ON_CLUSTER_VERSION_UPGRADE_";

    fn field_specs() -> &'static [FieldSpec] {
        const SPECS: &[FieldSpec] = &[
            FieldSpec::writable("enable", FieldKind::Bool),
            FieldSpec::read_only("created", FieldKind::Bool),
            FieldSpec::read_only("time-frame-create", FieldKind::Nested),
            FieldSpec::read_only("time-frame-delete", FieldKind::Nested),
            FieldSpec::writable("initial-wait", FieldKind::Duration),
            FieldSpec::writable("version", FieldKind::String),
            FieldSpec::read_only("version-value", FieldKind::F64),
        ];
        SPECS
    }
}

impl AddOnClusterVersionUpgrade {
    pub fn new_default() -> Self {
        Self {
            initial_wait: HumanDuration::from_secs(3 * 60),
            ..Default::default()
        }
    }

    /// Runs after the cluster version has been parsed, so the delta
    /// check sees the final `version_value`.
    pub fn validate(&mut self, ctx: &ClusterCtx) -> Result<(), Error> {
        if self.version.is_empty() {
            return Err(Error::validation(
                "add-on-cluster-version-upgrade version is empty",
            ));
        }
        self.version_value = self
            .version
            .parse::<f64>()
            .map_err(|e| Error::parse("version", self.version.as_str(), e.to_string()))?;
        let delta = self.version_value - ctx.version_value;
        if format!("{delta:.2}") != "0.01" {
            return Err(Error::version_compatibility(format!(
                "upgrade from {:?} to {:?} not supported, only one minor version step is",
                ctx.version, self.version
            )));
        }
        if self.initial_wait.is_zero() {
            self.initial_wait = HumanDuration::from_secs(3 * 60);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::addons::ClusterCtx;

    fn ctx() -> ClusterCtx {
        ClusterCtx {
            version: "1.17".to_string(),
            version_value: 1.17,
            ..Default::default()
        }
    }

    #[test]
    fn story_env_table_matches_struct() {
        crate::schema::verify::<AddOnClusterVersionUpgrade>().unwrap();
    }

    #[test]
    fn story_single_minor_step_allowed() {
        let mut add_on = AddOnClusterVersionUpgrade::new_default();
        add_on.enable = true;
        add_on.version = "1.18".to_string();
        add_on.validate(&ctx()).unwrap();
        assert_eq!(add_on.version_value, 1.18);
    }

    #[test]
    fn story_version_skip_rejected() {
        let mut add_on = AddOnClusterVersionUpgrade::new_default();
        add_on.enable = true;
        add_on.version = "1.19".to_string();
        assert!(matches!(
            add_on.validate(&ctx()),
            Err(Error::VersionCompatibility(_))
        ));
    }
}
