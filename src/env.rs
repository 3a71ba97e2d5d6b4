//! Environment overlay for the whole configuration tree.
//!
//! Three stages, committed atomically: the embedded YAML document under
//! the bare prefix key, then the root scalars, then parameters and
//! every add-on in catalog order. Any failure leaves the receiver
//! untouched.

use serde_json::Value;

use crate::config::Config;
use crate::error::Error;
use crate::schema::{self, overlay, EnvSchema, EnvVars, ENV_PREFIX};

impl Config {
    /// Overlay this configuration from an environment snapshot.
    pub fn update_from_env(&mut self, env: &EnvVars) -> Result<(), Error> {
        let mut next = self.clone();

        // stage 1: whole-document YAML under the bare prefix key
        if let Some(raw) = env.get(ENV_PREFIX) {
            if !raw.is_empty() {
                next = merge_document(&next, raw)?;
            }
        }

        // stage 2: root scalars
        next = overlay(&next, env)?;

        // stage 3: nested objects, in catalog order
        next.parameters = overlay(&next.parameters, env)?;

        overlay_add_on(&mut next.add_on_cni_vpc, env)?;
        overlay_add_on(&mut next.add_on_node_groups, env)?;
        overlay_add_on(&mut next.add_on_managed_node_groups, env)?;
        overlay_add_on(&mut next.add_on_cw_agent, env)?;
        overlay_add_on(&mut next.add_on_fluentd, env)?;
        overlay_add_on(&mut next.add_on_metrics_server, env)?;
        overlay_add_on(&mut next.add_on_conformance, env)?;
        overlay_add_on(&mut next.add_on_app_mesh, env)?;
        overlay_add_on(&mut next.add_on_csi_ebs, env)?;
        overlay_add_on(&mut next.add_on_kubernetes_dashboard, env)?;
        overlay_add_on(&mut next.add_on_prometheus_grafana, env)?;
        overlay_add_on(&mut next.add_on_php_apache, env)?;
        overlay_add_on(&mut next.add_on_nlb_hello_world, env)?;
        overlay_add_on(&mut next.add_on_nlb_guestbook, env)?;
        overlay_add_on(&mut next.add_on_alb_2048, env)?;
        overlay_add_on(&mut next.add_on_jobs_pi, env)?;
        overlay_add_on(&mut next.add_on_jobs_echo, env)?;
        overlay_add_on(&mut next.add_on_cron_jobs, env)?;
        overlay_add_on(&mut next.add_on_csrs_local, env)?;
        overlay_add_on(&mut next.add_on_csrs_remote, env)?;
        overlay_add_on(&mut next.add_on_configmaps_local, env)?;
        overlay_add_on(&mut next.add_on_configmaps_remote, env)?;
        overlay_add_on(&mut next.add_on_secrets_local, env)?;
        overlay_add_on(&mut next.add_on_secrets_remote, env)?;
        overlay_add_on(&mut next.add_on_fargate, env)?;
        overlay_add_on(&mut next.add_on_irsa, env)?;
        overlay_add_on(&mut next.add_on_irsa_fargate, env)?;
        overlay_add_on(&mut next.add_on_wordpress, env)?;
        overlay_add_on(&mut next.add_on_jupyter_hub, env)?;
        overlay_add_on(&mut next.add_on_kubeflow, env)?;
        overlay_add_on(&mut next.add_on_cuda_vector_add, env)?;
        overlay_add_on(&mut next.add_on_cluster_loader_local, env)?;
        overlay_add_on(&mut next.add_on_cluster_loader_remote, env)?;
        overlay_add_on(&mut next.add_on_hollow_nodes_local, env)?;
        overlay_add_on(&mut next.add_on_hollow_nodes_remote, env)?;
        overlay_add_on(&mut next.add_on_stresser_local, env)?;
        overlay_add_on(&mut next.add_on_stresser_remote, env)?;
        overlay_add_on(&mut next.add_on_stresser_remote_v2, env)?;
        overlay_add_on(&mut next.add_on_cluster_version_upgrade, env)?;
        overlay_add_on(&mut next.add_on_ami_soft_lockup_issue_454, env)?;

        *self = next;
        Ok(())
    }
}

/// Deep-merge the embedded YAML document over the current value, then
/// re-type strictly so unknown fields are rejected.
fn merge_document(cur: &Config, raw: &str) -> Result<Config, Error> {
    let mut base =
        serde_json::to_value(cur).map_err(|e| Error::serialization(e.to_string()))?;
    let doc: Value =
        serde_yaml::from_str(raw).map_err(|e| Error::serialization(e.to_string()))?;
    merge_value(&mut base, doc);
    schema::typed_from_value(base)
}

fn merge_value(base: &mut Value, incoming: Value) {
    match (base, incoming) {
        (Value::Object(base_map), Value::Object(incoming_map)) => {
            for (k, v) in incoming_map {
                match base_map.get_mut(&k) {
                    Some(slot) => merge_value(slot, v),
                    None => {
                        base_map.insert(k, v);
                    }
                }
            }
        }
        (slot, v) => *slot = v,
    }
}

/// Overlay one optional add-on. An absent add-on is materialized only
/// when the environment actually names one of its keys; otherwise it
/// stays out of the document.
fn overlay_add_on<T: EnvSchema + Clone + Default>(
    slot: &mut Option<T>,
    env: &EnvVars,
) -> Result<(), Error> {
    if slot.is_none() && !declared_in_env::<T>(env) {
        return Ok(());
    }
    let cur = slot.clone().unwrap_or_default();
    *slot = Some(overlay(&cur, env)?);
    Ok(())
}

fn declared_in_env<T: EnvSchema>(env: &EnvVars) -> bool {
    T::field_specs().iter().any(|spec| {
        let key = format!("{ENV_PREFIX}{}{}", T::ENV_PREFIX, spec.env_suffix());
        env.get(&key).map_or(false, |v| !v.is_empty())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::addons::AddOnNlbHelloWorld;

    #[test]
    fn story_embedded_document_applies_before_discrete_keys() {
        let mut cfg = Config::default();
        let env = EnvVars::from_pairs([
            (
                "AWS_K8S_TESTER_EKS_",
                "name: from-doc\nregion: us-east-1\n",
            ),
            ("AWS_K8S_TESTER_EKS_REGION", "eu-west-1"),
        ]);
        cfg.update_from_env(&env).unwrap();
        assert_eq!(cfg.name, "from-doc");
        assert_eq!(cfg.region, "eu-west-1");
    }

    #[test]
    fn story_embedded_document_rejects_unknown_fields() {
        let mut cfg = Config::default();
        let env = EnvVars::from_pairs([("AWS_K8S_TESTER_EKS_", "no-such-field: true\n")]);
        assert!(matches!(
            cfg.update_from_env(&env),
            Err(Error::UnknownField(_))
        ));
    }

    #[test]
    fn story_add_on_is_materialized_when_named() {
        let mut cfg = Config::default();
        assert!(cfg.add_on_nlb_hello_world.is_none());
        let env = EnvVars::from_pairs([(
            "AWS_K8S_TESTER_EKS_ADD_ON_NLB_HELLO_WORLD_ENABLE",
            "true",
        )]);
        cfg.update_from_env(&env).unwrap();
        assert!(cfg.add_on_nlb_hello_world.as_ref().unwrap().enable);
        // add-ons the env never mentions stay absent
        assert!(cfg.add_on_wordpress.is_none());
    }

    #[test]
    fn story_existing_add_on_keeps_untouched_fields() {
        let mut cfg = Config::default();
        cfg.add_on_nlb_hello_world = Some(AddOnNlbHelloWorld {
            deployment_replicas: 7,
            ..AddOnNlbHelloWorld::new_default()
        });
        let env = EnvVars::from_pairs([(
            "AWS_K8S_TESTER_EKS_ADD_ON_NLB_HELLO_WORLD_ENABLE",
            "true",
        )]);
        cfg.update_from_env(&env).unwrap();
        let add_on = cfg.add_on_nlb_hello_world.as_ref().unwrap();
        assert!(add_on.enable);
        assert_eq!(add_on.deployment_replicas, 7);
    }

    #[test]
    fn story_any_stage_failure_leaves_the_receiver_untouched() {
        let mut cfg = Config::default();
        cfg.name = "before".to_string();
        let env = EnvVars::from_pairs([
            ("AWS_K8S_TESTER_EKS_NAME", "after"),
            // read-only key, fails the last stage
            (
                "AWS_K8S_TESTER_EKS_ADD_ON_AMI_SOFT_LOCKUP_ISSUE_454_CREATED",
                "true",
            ),
        ]);
        assert!(matches!(
            cfg.update_from_env(&env),
            Err(Error::ReadOnlyField { .. })
        ));
        assert_eq!(cfg.name, "before");
    }

    #[test]
    fn story_read_only_root_roll_ups_are_rejected() {
        let mut cfg = Config::default();
        let env = EnvVars::from_pairs([("AWS_K8S_TESTER_EKS_TOTAL_NODES", "100")]);
        assert!(matches!(
            cfg.update_from_env(&env),
            Err(Error::ReadOnlyField { .. })
        ));
    }
}
