//! Default population and validation for the whole configuration.
//!
//! One pass, dependency ordered: root identity and paths, cluster
//! parameters, node groups, then every workload add-on against a
//! cluster context snapshot, then the roll-ups and the version upgrade
//! check, and finally a re-serialization to disk.

use std::path::Path;

use crate::addons::{path_without_extension, ClusterCtx};
use crate::config::{
    absolute_path, Config, DEFAULT_CLIENTS, DEFAULT_CLIENT_BURST, DEFAULT_CLIENT_QPS,
    DEFAULT_CLIENT_TIMEOUT_SECS, DEFAULT_COMMAND_AFTER_CREATE_TIMEOUT_SECS,
    DEFAULT_KUBECTL_DOWNLOAD_URL, DEFAULT_KUBECTL_PATH,
};
use crate::duration::HumanDuration;
use crate::error::Error;
use crate::logutil;
use crate::randutil;

/// S3 objects under the expiration lifecycle live at least this long,
/// so in-flight test runs do not lose their artifacts.
const MIN_S3_LIFECYCLE_DAYS: i64 = 3;

const DEFAULT_ON_FAILURE_DELETE_WAIT_SECONDS: u64 = 120;

impl Config {
    /// Populate defaults and validate the whole document in dependency
    /// order, then re-serialize to `config_path`.
    pub fn validate_and_set_defaults(&mut self) -> Result<(), Error> {
        self.prune_disabled();
        self.validate_config()?;

        let name = self.name.clone();
        self.parameters.validate(&name)?;

        let mut ctx = ClusterCtx {
            cluster_name: self.name.clone(),
            config_path: self.config_path.clone(),
            version: self.parameters.version.clone(),
            version_value: self.parameters.version_value,
            s3_bucket: self.s3_bucket_name.clone(),
            node_group_enabled: self.add_on_node_groups.is_some()
                || self.add_on_managed_node_groups.is_some(),
            managed_node_group_enabled: self.add_on_managed_node_groups.is_some(),
            csi_ebs_enabled: self.add_on_csi_ebs.is_some(),
            ..Default::default()
        };

        let lb_addon_enabled = self.add_on_nlb_hello_world.is_some()
            || self.add_on_nlb_guestbook.is_some()
            || self.add_on_alb_2048.is_some()
            || self.add_on_wordpress.is_some()
            || self.add_on_jupyter_hub.is_some();

        let mut asg_names: Vec<String> = Vec::new();
        if let Some(ngs) = self.add_on_node_groups.as_mut() {
            ngs.validate(&ctx, lb_addon_enabled)?;
            asg_names = ngs.asgs.keys().cloned().collect();
        }
        if let Some(mngs) = self.add_on_managed_node_groups.as_mut() {
            mngs.validate(&ctx, lb_addon_enabled, &asg_names)?;
        }

        ctx.gpu_ami_present = self
            .add_on_node_groups
            .as_ref()
            .map_or(false, |a| a.gpu_ami_present())
            || self
                .add_on_managed_node_groups
                .as_ref()
                .map_or(false, |a| a.gpu_ami_present());
        ctx.x86_ami_present = self
            .add_on_node_groups
            .as_ref()
            .map_or(false, |a| a.x86_ami_present())
            || self
                .add_on_managed_node_groups
                .as_ref()
                .map_or(false, |a| a.x86_ami_present());

        // load balancer backends scale with the largest group
        let max_desired = self
            .add_on_node_groups
            .as_ref()
            .map_or(0, |a| a.max_desired_capacity())
            .max(
                self.add_on_managed_node_groups
                    .as_ref()
                    .map_or(0, |a| a.max_desired_capacity()),
            );
        if let Some(a) = self.add_on_nlb_hello_world.as_mut() {
            if a.deployment_replicas < max_desired as i32 {
                a.deployment_replicas = max_desired as i32;
            }
        }

        if let Some(a) = self.add_on_cni_vpc.as_mut() {
            a.validate(&ctx)?;
        }
        if let Some(a) = self.add_on_cw_agent.as_mut() {
            a.validate(&ctx)?;
        }
        if let Some(a) = self.add_on_fluentd.as_mut() {
            a.validate(&ctx)?;
        }
        if let Some(a) = self.add_on_metrics_server.as_mut() {
            a.validate(&ctx)?;
        }
        if let Some(a) = self.add_on_conformance.as_mut() {
            a.validate(&ctx)?;
        }
        if let Some(a) = self.add_on_app_mesh.as_mut() {
            a.validate(&ctx)?;
        }
        if let Some(a) = self.add_on_csi_ebs.as_mut() {
            a.validate(&ctx)?;
        }
        if let Some(a) = self.add_on_kubernetes_dashboard.as_mut() {
            a.validate(&ctx)?;
        }
        if let Some(a) = self.add_on_prometheus_grafana.as_mut() {
            a.validate(&ctx)?;
        }
        if let Some(a) = self.add_on_php_apache.as_mut() {
            a.validate(&ctx)?;
        }
        if let Some(a) = self.add_on_nlb_hello_world.as_mut() {
            a.validate(&ctx)?;
        }
        if let Some(a) = self.add_on_nlb_guestbook.as_mut() {
            a.validate(&ctx)?;
        }
        if let Some(a) = self.add_on_alb_2048.as_mut() {
            a.validate(&ctx)?;
        }
        if let Some(a) = self.add_on_jobs_pi.as_mut() {
            a.validate(&ctx)?;
        }
        if let Some(a) = self.add_on_jobs_echo.as_mut() {
            a.validate(&ctx)?;
        }
        if let Some(a) = self.add_on_cron_jobs.as_mut() {
            a.validate(&ctx)?;
        }
        if let Some(a) = self.add_on_csrs_local.as_mut() {
            a.validate(&ctx)?;
        }
        if let Some(a) = self.add_on_csrs_remote.as_mut() {
            a.validate(&ctx)?;
        }
        if let Some(a) = self.add_on_configmaps_local.as_mut() {
            a.validate(&ctx)?;
        }
        if let Some(a) = self.add_on_configmaps_remote.as_mut() {
            a.validate(&ctx)?;
        }
        if let Some(a) = self.add_on_secrets_local.as_mut() {
            a.validate(&ctx)?;
        }
        if let Some(a) = self.add_on_secrets_remote.as_mut() {
            a.validate(&ctx)?;
        }
        if let Some(a) = self.add_on_fargate.as_mut() {
            a.validate(&ctx)?;
        }
        if let Some(a) = self.add_on_irsa.as_mut() {
            a.validate(&ctx)?;
        }
        if let Some(a) = self.add_on_irsa_fargate.as_mut() {
            a.validate(&ctx)?;
        }
        if let Some(a) = self.add_on_wordpress.as_mut() {
            a.validate(&ctx)?;
        }
        if let Some(a) = self.add_on_jupyter_hub.as_mut() {
            a.validate(&ctx)?;
        }
        if let Some(a) = self.add_on_kubeflow.as_mut() {
            a.validate(&ctx)?;
        }
        if let Some(a) = self.add_on_cuda_vector_add.as_mut() {
            a.validate(&ctx)?;
        }
        if let Some(a) = self.add_on_cluster_loader_local.as_mut() {
            a.validate(&ctx)?;
        }
        if let Some(a) = self.add_on_cluster_loader_remote.as_mut() {
            a.validate(&ctx)?;
        }
        if let Some(a) = self.add_on_hollow_nodes_local.as_mut() {
            a.validate(&ctx)?;
        }
        if let Some(a) = self.add_on_hollow_nodes_remote.as_mut() {
            a.validate(&ctx)?;
        }
        if let Some(a) = self.add_on_stresser_local.as_mut() {
            a.validate(&ctx)?;
        }
        if let Some(a) = self.add_on_stresser_remote.as_mut() {
            a.validate(&ctx)?;
        }
        if let Some(a) = self.add_on_stresser_remote_v2.as_mut() {
            a.validate(&ctx)?;
        }
        if let Some(a) = self.add_on_ami_soft_lockup_issue_454.as_mut() {
            a.validate(&ctx)?;
        }

        // runs last so the delta check sees the final cluster version
        if let Some(a) = self.add_on_cluster_version_upgrade.as_mut() {
            a.validate(&ctx)?;
        }

        self.total_nodes = self
            .add_on_node_groups
            .as_ref()
            .map_or(0, |a| a.total_nodes())
            + self
                .add_on_managed_node_groups
                .as_ref()
                .map_or(0, |a| a.total_nodes());
        self.total_hollow_nodes = self
            .add_on_hollow_nodes_local
            .as_ref()
            .map_or(0, |a| a.nodes as u64)
            + self
                .add_on_hollow_nodes_remote
                .as_ref()
                .map_or(0, |a| a.total_nodes() as u64);

        self.evaluate_command_refs();
        self.sync()
    }

    /// Disabled add-ons drop out of the document entirely.
    fn prune_disabled(&mut self) {
        macro_rules! prune {
            ($($field:ident),* $(,)?) => {
                $(
                    if self.$field.as_ref().map_or(false, |a| !a.enable) {
                        self.$field = None;
                    }
                )*
            };
        }
        prune!(
            add_on_cni_vpc,
            add_on_node_groups,
            add_on_managed_node_groups,
            add_on_cw_agent,
            add_on_fluentd,
            add_on_metrics_server,
            add_on_conformance,
            add_on_app_mesh,
            add_on_csi_ebs,
            add_on_kubernetes_dashboard,
            add_on_prometheus_grafana,
            add_on_php_apache,
            add_on_nlb_hello_world,
            add_on_nlb_guestbook,
            add_on_alb_2048,
            add_on_jobs_pi,
            add_on_jobs_echo,
            add_on_cron_jobs,
            add_on_csrs_local,
            add_on_csrs_remote,
            add_on_configmaps_local,
            add_on_configmaps_remote,
            add_on_secrets_local,
            add_on_secrets_remote,
            add_on_fargate,
            add_on_irsa,
            add_on_irsa_fargate,
            add_on_wordpress,
            add_on_jupyter_hub,
            add_on_kubeflow,
            add_on_cuda_vector_add,
            add_on_cluster_loader_local,
            add_on_cluster_loader_remote,
            add_on_hollow_nodes_local,
            add_on_hollow_nodes_remote,
            add_on_stresser_local,
            add_on_stresser_remote,
            add_on_stresser_remote_v2,
            add_on_cluster_version_upgrade,
            add_on_ami_soft_lockup_issue_454,
        );
    }

    /// Root identity, logging, tool paths, S3, remote access, clients.
    fn validate_config(&mut self) -> Result<(), Error> {
        if self.name.is_empty() {
            return Err(Error::validation("name is empty"));
        }
        if self.name != self.name.to_lowercase() {
            return Err(Error::validation(format!(
                "name {:?} must be in lower-case",
                self.name
            )));
        }
        if self.partition.is_empty() {
            self.partition = "aws".to_string();
        }
        if self.region.is_empty() {
            return Err(Error::validation("region is empty"));
        }

        if self.log_level.is_empty() {
            self.log_level = logutil::DEFAULT_LOG_LEVEL.to_string();
        }
        logutil::validate_log_level(&self.log_level)?;
        if self.log_outputs.is_empty() {
            self.log_outputs = logutil::default_log_outputs();
        }

        if self.config_path.is_empty() {
            self.config_path = std::env::temp_dir()
                .join(format!("{}.yaml", self.name))
                .to_string_lossy()
                .into_owned();
        }
        self.config_path = absolute_path(Path::new(&self.config_path))?;
        let noext = path_without_extension(&self.config_path);

        // a lone standard stream also gets a file sink next to the document
        if self.log_outputs.len() == 1
            && (self.log_outputs[0] == "stderr" || self.log_outputs[0] == "stdout")
        {
            self.log_outputs.push(format!("{}.log", self.config_path));
        }

        if self.kubectl_commands_output_path.is_empty() {
            self.kubectl_commands_output_path = format!("{noext}.kubectl.sh");
        }
        if !self.kubectl_commands_output_path.ends_with(".sh") {
            self.kubectl_commands_output_path.push_str(".sh");
        }
        if self.remote_access_commands_output_path.is_empty() {
            self.remote_access_commands_output_path = format!("{noext}.ssh.sh");
        }
        if !self.remote_access_commands_output_path.ends_with(".sh") {
            self.remote_access_commands_output_path.push_str(".sh");
        }
        if self.kubeconfig_path.is_empty() {
            self.kubeconfig_path = format!("{noext}.kubeconfig.yaml");
        }
        if self.kubectl_path.is_empty() {
            self.kubectl_path = DEFAULT_KUBECTL_PATH.to_string();
        }
        if self.kubectl_download_url.is_empty() {
            self.kubectl_download_url = DEFAULT_KUBECTL_DOWNLOAD_URL.to_string();
        }

        if !self.command_after_create_cluster.is_empty() {
            if self.command_after_create_cluster_output_path.is_empty() {
                self.command_after_create_cluster_output_path =
                    format!("{noext}.after-create-cluster.out.log");
            }
            if !self.command_after_create_cluster_output_path.ends_with(".log") {
                self.command_after_create_cluster_output_path.push_str(".log");
            }
            if self.command_after_create_cluster_timeout.is_zero() {
                self.command_after_create_cluster_timeout =
                    HumanDuration::from_secs(DEFAULT_COMMAND_AFTER_CREATE_TIMEOUT_SECS);
            }
            self.command_after_create_cluster_timeout_string =
                self.command_after_create_cluster_timeout.to_string();
        }
        if !self.command_after_create_add_ons.is_empty() {
            if self.command_after_create_add_ons_output_path.is_empty() {
                self.command_after_create_add_ons_output_path =
                    format!("{noext}.after-create-add-ons.out.log");
            }
            if !self.command_after_create_add_ons_output_path.ends_with(".log") {
                self.command_after_create_add_ons_output_path.push_str(".log");
            }
            if self.command_after_create_add_ons_timeout.is_zero() {
                self.command_after_create_add_ons_timeout =
                    HumanDuration::from_secs(DEFAULT_COMMAND_AFTER_CREATE_TIMEOUT_SECS);
            }
            self.command_after_create_add_ons_timeout_string =
                self.command_after_create_add_ons_timeout.to_string();
        }

        if self.on_failure_delete && self.on_failure_delete_wait_seconds == 0 {
            self.on_failure_delete_wait_seconds = DEFAULT_ON_FAILURE_DELETE_WAIT_SECONDS;
        }

        if self.s3_bucket_create {
            if self.s3_bucket_name.is_empty() {
                self.s3_bucket_name = format!("{}-s3-bucket", self.name);
            }
            if self.s3_bucket_lifecycle_expiration_days > 0
                && self.s3_bucket_lifecycle_expiration_days < MIN_S3_LIFECYCLE_DAYS
            {
                self.s3_bucket_lifecycle_expiration_days = MIN_S3_LIFECYCLE_DAYS;
            }
        } else if self.s3_bucket_create_keep {
            return Err(Error::validation(
                "s3-bucket-create-keep requires s3-bucket-create",
            ));
        }

        if self.remote_access_key_create {
            if self.remote_access_key_name.is_empty() {
                self.remote_access_key_name = format!("{}-key-nodes", self.name);
            }
            if self.remote_access_private_key_path.is_empty() {
                self.remote_access_private_key_path = std::env::temp_dir()
                    .join(format!("{}.insecure.key", randutil::string(10)))
                    .to_string_lossy()
                    .into_owned();
            }
        } else {
            if self.remote_access_key_name.is_empty() {
                return Err(Error::validation(
                    "remote-access-key-create false requires a non-empty remote-access-key-name",
                ));
            }
            if self.remote_access_private_key_path.is_empty() {
                return Err(Error::validation(
                    "remote-access-key-create false requires a non-empty remote-access-private-key-path",
                ));
            }
        }

        if self.clients == 0 {
            self.clients = DEFAULT_CLIENTS;
        }
        if self.client_qps == 0.0 {
            self.client_qps = DEFAULT_CLIENT_QPS;
        }
        if self.client_burst == 0 {
            self.client_burst = DEFAULT_CLIENT_BURST;
        }
        if self.client_timeout.is_zero() {
            self.client_timeout = HumanDuration::from_secs(DEFAULT_CLIENT_TIMEOUT_SECS);
        }
        self.client_timeout_string = self.client_timeout.to_string();

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::addons::AddOnNlbHelloWorld;

    fn base(dir: &std::path::Path) -> Config {
        let mut cfg = Config::new_default();
        cfg.name = "c1".to_string();
        cfg.config_path = dir.join("c1.yaml").to_string_lossy().into_owned();
        cfg
    }

    #[test]
    fn story_upper_case_names_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = base(dir.path());
        cfg.name = "C1".to_string();
        assert!(cfg.validate_and_set_defaults().is_err());
    }

    #[test]
    fn story_derived_paths_sit_next_to_the_document() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = base(dir.path());
        cfg.validate_and_set_defaults().unwrap();

        let noext = dir.path().join("c1").to_string_lossy().into_owned();
        assert_eq!(cfg.kubectl_commands_output_path, format!("{noext}.kubectl.sh"));
        assert_eq!(
            cfg.remote_access_commands_output_path,
            format!("{noext}.ssh.sh")
        );
        assert_eq!(cfg.kubeconfig_path, format!("{noext}.kubeconfig.yaml"));
        assert_eq!(cfg.log_outputs.len(), 2);
        assert_eq!(cfg.log_outputs[1], format!("{}.log", cfg.config_path));
    }

    #[test]
    fn story_client_defaults_are_refilled() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = base(dir.path());
        cfg.clients = 0;
        cfg.client_qps = 0.0;
        cfg.client_burst = 0;
        cfg.client_timeout = HumanDuration::default();
        cfg.validate_and_set_defaults().unwrap();
        assert_eq!(cfg.clients, 3);
        assert_eq!(cfg.client_qps, 5.0);
        assert_eq!(cfg.client_burst, 10);
        assert_eq!(cfg.client_timeout_string, "30s");
    }

    #[test]
    fn story_s3_lifecycle_days_have_a_floor() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = base(dir.path());
        cfg.s3_bucket_create = true;
        cfg.s3_bucket_lifecycle_expiration_days = 1;
        cfg.validate_and_set_defaults().unwrap();
        assert_eq!(cfg.s3_bucket_name, "c1-s3-bucket");
        assert_eq!(cfg.s3_bucket_lifecycle_expiration_days, 3);
    }

    #[test]
    fn story_disabled_add_ons_drop_out_of_the_document() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = base(dir.path());
        assert!(cfg.add_on_node_groups.is_some());
        cfg.validate_and_set_defaults().unwrap();
        // new_default seeds them disabled, so validation prunes them
        assert!(cfg.add_on_node_groups.is_none());
        assert!(cfg.add_on_managed_node_groups.is_none());
        assert_eq!(cfg.total_nodes, 0);
    }

    #[test]
    fn story_lb_replicas_scale_with_the_largest_group() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = base(dir.path());
        let mut ngs = cfg.add_on_node_groups.take().unwrap();
        ngs.enable = true;
        for asg in ngs.asgs.values_mut() {
            asg.asg_min_size = 5;
            asg.asg_max_size = 5;
            asg.asg_desired_capacity = 5;
        }
        cfg.add_on_node_groups = Some(ngs);
        cfg.add_on_managed_node_groups = None;
        cfg.add_on_nlb_hello_world = Some(AddOnNlbHelloWorld {
            enable: true,
            deployment_replicas: 2,
            ..AddOnNlbHelloWorld::new_default()
        });
        cfg.validate_and_set_defaults().unwrap();
        assert_eq!(
            cfg.add_on_nlb_hello_world.as_ref().unwrap().deployment_replicas,
            5
        );
        assert_eq!(cfg.total_nodes, 5);
    }

    #[test]
    fn story_hollow_node_totals_roll_up() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = base(dir.path());
        let mut ngs = cfg.add_on_node_groups.take().unwrap();
        ngs.enable = true;
        cfg.add_on_node_groups = Some(ngs);
        cfg.add_on_managed_node_groups = None;

        let mut local = crate::addons::AddOnHollowNodesLocal::new_default();
        local.enable = true;
        local.nodes = 10;
        cfg.add_on_hollow_nodes_local = Some(local);

        let mut remote = crate::addons::AddOnHollowNodesRemote::new_default();
        remote.enable = true;
        remote.nodes = 2;
        remote.deployment_replicas = 5;
        remote.repository_account_id = "123456789012".to_string();
        remote.repository_name = "hollow".to_string();
        remote.repository_image_tag = "latest".to_string();
        cfg.add_on_hollow_nodes_remote = Some(remote);

        cfg.validate_and_set_defaults().unwrap();
        assert_eq!(cfg.total_hollow_nodes, 20);
    }
}
