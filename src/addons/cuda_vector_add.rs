//! CUDA vector-add smoke test pod, requires a GPU node group.

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::schema::{EnvSchema, FieldKind, FieldSpec};
use crate::timeutil::TimeFrame;

use super::{require_gpu_ami, require_node_group, ClusterCtx};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct AddOnCudaVectorAdd {
    pub enable: bool,
    pub created: bool,
    #[serde(skip_serializing_if = "TimeFrame::is_unset")]
    pub time_frame_create: TimeFrame,
    #[serde(skip_serializing_if = "TimeFrame::is_unset")]
    pub time_frame_delete: TimeFrame,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub namespace: String,
}

impl EnvSchema for AddOnCudaVectorAdd {
    const ENV_PREFIX: &'static str = "ADD_ON_CUDA_VECTOR_ADD_";

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

impl AddOnCudaVectorAdd {
    pub fn validate(&mut self, ctx: &ClusterCtx) -> Result<(), Error> {
        require_node_group("add-on-cuda-vector-add", ctx)?;
        require_gpu_ami("add-on-cuda-vector-add", ctx)?;
        if self.namespace.is_empty() {
            self.namespace = ctx.namespace("cuda-vector-add");
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
        crate::schema::verify::<AddOnCudaVectorAdd>().unwrap();
    }

    #[test]
    fn story_requires_gpu_ami() {
        let mut add_on = AddOnCudaVectorAdd {
            enable: true,
            ..Default::default()
        };
        let ctx = ClusterCtx {
            cluster_name: "c1".to_string(),
            node_group_enabled: true,
            gpu_ami_present: false,
            ..Default::default()
        };
        assert!(add_on.validate(&ctx).is_err());
    }
}
