//! Topology builder: one forward pass from configuration to resource graph.
//!
//! Sub-builders are pure functions over the configuration and the logical
//! ids below. `build` runs them in dependency order:
//! network → identity → security → compute → data tier → edge → release,
//! registers their output on a [`GraphBuilder`] and seals it.

pub mod bootstrap;
pub mod compute;
pub mod database;
pub mod edge;
pub mod identity;
pub mod network;
pub mod release;
pub mod security;

use crate::core::error::Result;
use crate::core::graph::{GraphBuilder, ResourceGraph};
use crate::core::parser;
use crate::core::resource::{AlarmTopic, LogGroup, Pool, RemovalPolicy, Resource, Subscription};
use crate::core::types::StackConfig;

/// Fixed notification address for alarm subscriptions.
pub const ALARM_EMAIL: &str = "tim@compdemocracy.org";

/// Default retention of the shared log group.
pub const LOG_RETENTION_DAYS: u32 = 731;

/// Logical ids of every resource in the plan, derived from the stack name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalIds {
    pub prefix: String,
    pub vpc: String,
    pub alarm_topic: String,
    pub log_group: String,
    pub web_security_group: String,
    pub math_worker_security_group: String,
    pub lb_security_group: String,
    pub db_security_group: String,
    pub instance_role: String,
    pub deploy_role: String,
    pub deployment_bucket: String,
    pub db_subnet_group: String,
    pub db_secret: String,
    pub database: String,
    pub db_secret_param: String,
    pub db_host_param: String,
    pub db_port_param: String,
    pub load_balancer: String,
    pub target_group: String,
    pub http_listener: String,
    pub https_listener: String,
    pub certificate: String,
    pub application: String,
    pub deployment_group: String,
    pub env_secret: String,
}

impl LogicalIds {
    pub fn new(prefix: &str) -> Self {
        let id = |suffix: &str| format!("{}{}", prefix, suffix);
        Self {
            prefix: prefix.to_string(),
            vpc: id("Vpc"),
            alarm_topic: id("AlarmTopic"),
            log_group: id("LogGroup"),
            web_security_group: id("WebSecurityGroup"),
            math_worker_security_group: id("MathWorkerSG"),
            lb_security_group: id("LBSecurityGroup"),
            db_security_group: id("DatabaseSecurityGroup"),
            instance_role: id("InstanceRole"),
            deploy_role: id("CodeDeployRole"),
            deployment_bucket: id("DeploymentPackageBucket"),
            db_subnet_group: id("DatabaseSubnetGroup"),
            db_secret: id("DatabaseSecret"),
            database: id("Database"),
            db_secret_param: id("DBSecretArnParameter"),
            db_host_param: id("DBHostParameter"),
            db_port_param: id("DBPortParameter"),
            load_balancer: id("Lb"),
            target_group: id("WebAppTargetGroup"),
            http_listener: id("HttpListener"),
            https_listener: id("HttpsListener"),
            certificate: id("WebAppCertificate"),
            application: id("CodeDeployApplication"),
            deployment_group: id("DeploymentGroup"),
            env_secret: id("WebAppEnvVarsSecret"),
        }
    }

    pub fn security_group(&self, pool: Pool) -> &str {
        match pool {
            Pool::Web => &self.web_security_group,
            Pool::MathWorker => &self.math_worker_security_group,
        }
    }

    pub fn key_pair(&self, pool: Pool) -> String {
        format!("{}{}KeyPair", self.prefix, pool.id_stem())
    }

    pub fn launch_template(&self, pool: Pool) -> String {
        format!("{}{}LaunchTemplate", self.prefix, pool.id_stem())
    }

    pub fn instance(&self, pool: Pool) -> String {
        format!("{}{}Instance", self.prefix, pool.id_stem())
    }

    pub fn auto_scaling_group(&self, pool: Pool) -> String {
        format!("{}{}Asg", self.prefix, pool.id_stem())
    }
}

/// Build the complete, sealed resource graph for a configuration.
///
/// The configuration is validated first; nothing is registered if any check
/// fails.
pub fn build(config: &StackConfig) -> Result<ResourceGraph> {
    parser::ensure_valid(config)?;
    let ids = LogicalIds::new(&config.name);
    let mut graph = GraphBuilder::new(&config.name);

    let vpc = network::partition(&config.network)?;
    tracing::debug!(
        subnets = vpc.subnet_groups.iter().map(|g| g.subnets.len()).sum::<usize>(),
        "network partitioned"
    );
    graph.add(&ids.vpc, Resource::Vpc(vpc))?;
    graph.add(&ids.alarm_topic, Resource::AlarmTopic(alarm_topic(config)))?;
    graph.add(
        &ids.log_group,
        Resource::LogGroup(LogGroup {
            retention_days: LOG_RETENTION_DAYS,
        }),
    )?;

    let identity = identity::compose(config, &ids)?;
    graph.add(&ids.deployment_bucket, Resource::Bucket(identity.deployment_bucket))?;
    graph.add(&ids.instance_role, Resource::Role(identity.instance_role))?;
    graph.add(&ids.deploy_role, Resource::Role(identity.deploy_role))?;
    tracing::debug!("identity composed");

    let groups = security::derive(config, &ids);
    graph.add(&ids.web_security_group, Resource::SecurityGroup(groups.web))?;
    graph.add(
        &ids.math_worker_security_group,
        Resource::SecurityGroup(groups.math_worker),
    )?;
    graph.add(
        &ids.lb_security_group,
        Resource::SecurityGroup(groups.load_balancer),
    )?;
    tracing::debug!(ssh = config.enable_ssh_access, "security groups derived");

    for pool in Pool::ALL {
        let built = compute::build_pool(config, &ids, pool)?;
        if let Some(key) = built.generated_key {
            graph.add(&built.ids.key_pair, Resource::KeyPair(key))?;
        }
        graph.add(
            &built.ids.launch_template,
            Resource::LaunchTemplate(built.launch_template),
        )?;
        graph.add(&built.ids.instance, Resource::Instance(built.instance))?;
        graph.add(
            &built.ids.auto_scaling_group,
            Resource::AutoScalingGroup(built.auto_scaling_group),
        )?;
        tracing::debug!(%pool, "compute pool built");
    }

    let data = database::provision(config, &ids);
    graph.add(&ids.db_subnet_group, Resource::DbSubnetGroup(data.subnet_group))?;
    graph.add(&ids.db_security_group, Resource::SecurityGroup(data.security_group))?;
    graph.add(&ids.db_secret, Resource::Secret(data.secret))?;
    graph.add_with_policy(
        &ids.database,
        Resource::Database(data.instance),
        RemovalPolicy::Snapshot,
    )?;
    for (id, param) in data.parameters {
        graph.add(&id, Resource::Parameter(param))?;
    }
    tracing::debug!("data tier provisioned");

    let edge = edge::compose(&ids);
    graph.add(&ids.certificate, Resource::Certificate(edge.certificate))?;
    graph.add(&ids.load_balancer, Resource::LoadBalancer(edge.load_balancer))?;
    graph.add(&ids.target_group, Resource::TargetGroup(edge.target_group))?;
    graph.add(&ids.http_listener, Resource::Listener(edge.http_listener))?;
    graph.add(&ids.https_listener, Resource::Listener(edge.https_listener))?;
    tracing::debug!("edge composed");

    let pipeline = release::wire(config, &ids);
    graph.add(&ids.env_secret, Resource::Secret(pipeline.env_secret))?;
    graph.add(&ids.application, Resource::Application(pipeline.application))?;
    graph.add(
        &ids.deployment_group,
        Resource::DeploymentGroup(pipeline.deployment_group),
    )?;
    for (key, value) in pipeline.package_metadata {
        graph.annotate(&ids.deployment_group, key, value)?;
    }
    for (dependent, dependency) in release::ordering_constraints(&ids) {
        graph.depend(&dependent, &dependency)?;
    }

    let sealed = graph.seal()?;
    tracing::info!(
        stack = %config.name,
        resources = sealed.len(),
        edges = sealed.edges().len(),
        "plan built"
    );
    Ok(sealed)
}

fn alarm_topic(config: &StackConfig) -> AlarmTopic {
    AlarmTopic {
        display_name: format!("{} Polis Application Alarms", config.name),
        subscriptions: vec![Subscription {
            protocol: "email".to_string(),
            endpoint: ALARM_EMAIL.to_string(),
        }],
    }
}
