//! Release pipeline wirer.
//!
//! One deployment application with a single group spanning both
//! autoscaling groups, rolled out one instance at a time. The explicit
//! ordering edges live here too: bootstrap scripts expect the log group,
//! the web-app secret and the database to exist before any pool boots.
//!
//! Where release packages come from (bucket, branch, env file) is read by the
//! external packager, so it travels as deployment-group metadata rather than
//! as a platform property.

use super::LogicalIds;
use crate::core::resource::{
    AutoRollback, DeployApplication, DeploymentGroup, Pool, Secret, Value,
};
use crate::core::types::StackConfig;

pub const DEPLOYMENT_CONFIG: &str = "CodeDeployDefault.OneAtATime";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleasePlan {
    pub env_secret: Secret,
    pub application: DeployApplication,
    pub deployment_group: DeploymentGroup,
    /// Metadata entries for the deployment group
    pub package_metadata: Vec<(&'static str, Value)>,
}

pub fn wire(config: &StackConfig, ids: &LogicalIds) -> ReleasePlan {
    let env_secret = Secret {
        name: Some(format!("{}-polis-web-app-env-vars", config.slug())),
        description: format!(
            "Environment variables for the {} Polis web application",
            config.name
        ),
        generate: None,
    };

    let application = DeployApplication {
        application_name: format!("{}PolisApplication", config.name),
        compute_platform: "Server".to_string(),
    };

    let deployment_group = DeploymentGroup {
        application: Value::reference(&ids.application),
        deployment_group_name: format!("{}PolisDeploymentGroup", config.name),
        auto_scaling_groups: Pool::ALL
            .iter()
            .map(|&pool| Value::reference(&ids.auto_scaling_group(pool)))
            .collect(),
        deployment_config: DEPLOYMENT_CONFIG.to_string(),
        service_role: Value::reference(&ids.deploy_role),
        install_agent: true,
        auto_rollback: AutoRollback {
            failed_deployment: true,
            stopped_deployment: true,
            deployment_in_alarm: true,
        },
    };

    ReleasePlan {
        env_secret,
        application,
        deployment_group,
        package_metadata: package_metadata(config, ids),
    }
}

fn package_metadata(config: &StackConfig, ids: &LogicalIds) -> Vec<(&'static str, Value)> {
    let mut entries = vec![("PackageBucket", Value::reference(&ids.deployment_bucket))];
    if let Some(ref branch) = config.branch {
        entries.push(("Branch", Value::literal(branch.clone())));
    }
    // Non-UTF-8 bytes become U+FFFD.
    entries.push((
        "EnvFile",
        Value::literal(config.env_file.to_string_lossy().into_owned()),
    ));
    entries
}

/// `(dependent, dependency)` pairs no reference implies.
///
/// Every pool node, singleton instance and autoscaling group alike, waits
/// on the log group, the web-app secret and the database.
pub fn ordering_constraints(ids: &LogicalIds) -> Vec<(String, String)> {
    let prerequisites = [&ids.log_group, &ids.env_secret, &ids.database];
    let mut pairs = Vec::new();
    for pool in Pool::ALL {
        for dependent in [ids.instance(pool), ids.auto_scaling_group(pool)] {
            for dependency in prerequisites {
                pairs.push((dependent.clone(), dependency.clone()));
            }
        }
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deployment_group_spans_both_pools() {
        let plan = wire(&StackConfig::new(".env"), &LogicalIds::new("Preprod"));
        let dg = plan.deployment_group;
        assert_eq!(
            dg.auto_scaling_groups,
            vec![
                Value::reference("PreprodWebAsg"),
                Value::reference("PreprodMathWorkerAsg")
            ]
        );
        assert_eq!(dg.deployment_config, "CodeDeployDefault.OneAtATime");
        assert_eq!(dg.deployment_group_name, "PreprodPolisDeploymentGroup");
        assert!(dg.install_agent);
        assert_eq!(dg.auto_rollback.events().len(), 3);
    }

    #[test]
    fn test_package_metadata() {
        let mut config = StackConfig::new(".env.preprod");
        config.branch = Some("edge".to_string());
        let plan = wire(&config, &LogicalIds::new("Preprod"));
        assert_eq!(
            plan.package_metadata,
            vec![
                ("PackageBucket", Value::reference("PreprodDeploymentPackageBucket")),
                ("Branch", Value::literal("edge")),
                ("EnvFile", Value::literal(".env.preprod")),
            ]
        );
        let properties = serde_json::to_value(&plan.deployment_group).unwrap();
        assert!(properties.get("package").is_none());
    }

    #[test]
    fn test_package_metadata_without_branch() {
        let plan = wire(&StackConfig::new(".env"), &LogicalIds::new("Preprod"));
        let keys: Vec<&str> = plan.package_metadata.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec!["PackageBucket", "EnvFile"]);
    }

    #[test]
    fn test_env_secret_name() {
        let plan = wire(&StackConfig::new(".env"), &LogicalIds::new("Preprod"));
        assert_eq!(
            plan.env_secret.name.as_deref(),
            Some("preprod-polis-web-app-env-vars")
        );
        assert!(plan.env_secret.generate.is_none());
        assert_eq!(plan.application.application_name, "PreprodPolisApplication");
    }

    #[test]
    fn test_ordering_constraints() {
        let pairs = ordering_constraints(&LogicalIds::new("Preprod"));
        assert_eq!(pairs.len(), 12);
        assert!(pairs.contains(&(
            "PreprodWebInstance".to_string(),
            "PreprodDatabase".to_string()
        )));
        assert!(pairs.contains(&(
            "PreprodMathWorkerAsg".to_string(),
            "PreprodWebAppEnvVarsSecret".to_string()
        )));
        assert!(pairs.iter().all(|(_, dep)| dep != "PreprodVpc"));
    }
}
