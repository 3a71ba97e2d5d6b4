//! End-to-end stories: environment overlay into validation into the
//! re-serialized document, the way the harness drives the crate.

use ekstester::{Config, EnvVars, Error};

const GPU_ASG: &str = r#"{"c1-ng-gpu":{"name":"c1-ng-gpu","ami-type":"AL2_x86_64_GPU","image-id-ssm-parameter":"/aws/service/eks/optimized-ami/1.17/amazon-linux-2-gpu/recommended/image_id","asg-min-size":1,"asg-max-size":1,"asg-desired-capacity":1}}"#;

fn ci_env(object_size: &str) -> EnvVars {
    EnvVars::from_pairs([
        ("AWS_K8S_TESTER_EKS_NAME", "c1"),
        ("AWS_K8S_TESTER_EKS_CONFIG_PATH", "/tmp/c1.doc"),
        ("AWS_K8S_TESTER_EKS_ADD_ON_NODE_GROUPS_ENABLE", "true"),
        ("AWS_K8S_TESTER_EKS_ADD_ON_NODE_GROUPS_ASGS", GPU_ASG),
        ("AWS_K8S_TESTER_EKS_ADD_ON_CONFIGMAPS_LOCAL_ENABLE", "true"),
        (
            "AWS_K8S_TESTER_EKS_ADD_ON_CONFIGMAPS_LOCAL_OBJECT_SIZE",
            object_size,
        ),
    ])
}

#[test]
fn story_ci_env_block_derives_workload_artifacts() {
    let mut cfg = Config::new_default();
    cfg.update_from_env(&ci_env("1024")).unwrap();
    cfg.validate_and_set_defaults().unwrap();

    assert_eq!(cfg.name, "c1");
    let ngs = cfg.add_on_node_groups.as_ref().unwrap();
    assert_eq!(ngs.asgs.len(), 1);
    assert!(ngs.asgs.contains_key("c1-ng-gpu"));
    assert!(ngs.gpu_ami_present());
    assert_eq!(cfg.total_nodes, 1);

    let cm = cfg.add_on_configmaps_local.as_ref().unwrap();
    assert_eq!(cm.object_size, 1024);
    assert_eq!(cm.namespace, "c1-configmaps-local");
    assert_eq!(
        cm.requests_summary_writes_json_path,
        "/tmp/c1-configmaps-local-requests-summary-writes.json"
    );
}

#[test]
fn story_oversized_objects_fail_validation() {
    let mut cfg = Config::new_default();
    cfg.update_from_env(&ci_env("1000000")).unwrap();
    let err = cfg.validate_and_set_defaults().unwrap_err();
    assert!(err.to_string().contains("ObjectSize limit is 0.9 MB"));
}

#[test]
fn story_workloads_without_node_groups_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = Config::new_default();
    cfg.name = "c1".to_string();
    cfg.config_path = dir
        .path()
        .join("c1.yaml")
        .to_string_lossy()
        .into_owned();
    let env = EnvVars::from_pairs([(
        "AWS_K8S_TESTER_EKS_ADD_ON_CONFIGMAPS_LOCAL_ENABLE",
        "true",
    )]);
    cfg.update_from_env(&env).unwrap();
    // node-group add-ons stay at their disabled defaults
    let err = cfg.validate_and_set_defaults().unwrap_err();
    assert!(matches!(err, Error::MissingDependency { .. }));
    assert!(err.to_string().contains("add-on-configmaps-local"));
}

#[test]
fn story_read_only_env_keys_leave_no_trace() {
    let mut cfg = Config::new_default();
    let before = cfg.clone();
    let env = EnvVars::from_pairs([(
        "AWS_K8S_TESTER_EKS_ADD_ON_NODE_GROUPS_CREATED",
        "true",
    )]);
    let err = cfg.update_from_env(&env).unwrap_err();
    assert!(matches!(err, Error::ReadOnlyField { .. }));
    assert_eq!(cfg, before);
}

#[test]
fn story_upgrade_accepts_exactly_one_minor_step() {
    let dir = tempfile::tempdir().unwrap();
    for (target, ok) in [("1.18", true), ("1.19", false)] {
        let mut cfg = Config::new_default();
        cfg.name = "c1".to_string();
        cfg.config_path = dir
            .path()
            .join(format!("c1-{target}.yaml"))
            .to_string_lossy()
            .into_owned();
        let env = EnvVars::from_pairs([
            (
                "AWS_K8S_TESTER_EKS_ADD_ON_CLUSTER_VERSION_UPGRADE_ENABLE",
                "true",
            ),
            (
                "AWS_K8S_TESTER_EKS_ADD_ON_CLUSTER_VERSION_UPGRADE_VERSION",
                target,
            ),
        ]);
        cfg.update_from_env(&env).unwrap();
        let res = cfg.validate_and_set_defaults();
        if ok {
            res.unwrap();
            let up = cfg.add_on_cluster_version_upgrade.as_ref().unwrap();
            assert_eq!(
                format!("{:.2}", up.version_value - cfg.parameters.version_value),
                "0.01"
            );
        } else {
            assert!(matches!(res, Err(Error::VersionCompatibility(_))));
        }
    }
}

#[test]
fn story_validated_documents_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = Config::new_default();
    cfg.name = "c1".to_string();
    cfg.config_path = dir
        .path()
        .join("c1.yaml")
        .to_string_lossy()
        .into_owned();
    cfg.validate_and_set_defaults().unwrap();

    let loaded = Config::load(&cfg.config_path).unwrap();
    assert_eq!(loaded, cfg);
}

#[test]
fn story_overlay_is_idempotent_across_the_whole_tree() {
    let env = ci_env("1024");
    let mut once = Config::new_default();
    once.name = "c0".to_string();
    let mut twice = once.clone();

    once.update_from_env(&env).unwrap();
    twice.update_from_env(&env).unwrap();
    twice.update_from_env(&env).unwrap();
    assert_eq!(once, twice);
}

#[test]
fn story_disabled_add_ons_are_omitted_from_the_document() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = Config::new_default();
    cfg.name = "c1".to_string();
    cfg.config_path = dir
        .path()
        .join("c1.yaml")
        .to_string_lossy()
        .into_owned();
    cfg.validate_and_set_defaults().unwrap();

    let doc = std::fs::read_to_string(&cfg.config_path).unwrap();
    assert!(!doc.contains("add-on-node-groups"));
    assert!(!doc.contains("add-on-nlb-hello-world"));
}

#[test]
fn story_explicit_paths_win_over_derivation() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = Config::new_default();
    cfg.name = "c1".to_string();
    cfg.config_path = dir
        .path()
        .join("c1.yaml")
        .to_string_lossy()
        .into_owned();
    cfg.kubectl_commands_output_path = dir
        .path()
        .join("custom.sh")
        .to_string_lossy()
        .into_owned();
    cfg.validate_and_set_defaults().unwrap();
    assert!(cfg.kubectl_commands_output_path.ends_with("custom.sh"));
    assert!(cfg.kubeconfig_path.ends_with("c1.kubeconfig.yaml"));
}
