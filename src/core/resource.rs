//! Resource definitions and cross-resource references.
//!
//! Every resource the builder emits is one variant of [`Resource`]. Fields
//! that point at another resource hold a [`Value`]; [`Resource::references`]
//! collects those targets so the graph can derive producer/consumer edges
//! without inspecting attribute access.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical id of a resource within one plan.
pub type LogicalId = String;

// ============================================================================
// Values and references
// ============================================================================

/// A property value: literal, or resolved by the apply engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Literal(String),
    Ref {
        #[serde(rename = "Ref")]
        target: LogicalId,
    },
    GetAtt {
        #[serde(rename = "Fn::GetAtt")]
        target: (LogicalId, String),
    },
    /// `${Id}` / `${Id.Attr}` substitution; `${AWS::*}` are pseudo parameters.
    Sub {
        #[serde(rename = "Fn::Sub")]
        template: String,
    },
}

impl Value {
    pub fn literal(s: impl Into<String>) -> Self {
        Self::Literal(s.into())
    }

    pub fn reference(id: &str) -> Self {
        Self::Ref {
            target: id.to_string(),
        }
    }

    pub fn attr(id: &str, attribute: &str) -> Self {
        Self::GetAtt {
            target: (id.to_string(), attribute.to_string()),
        }
    }

    pub fn sub(template: impl Into<String>) -> Self {
        Self::Sub {
            template: template.into(),
        }
    }

    /// Logical ids this value resolves against.
    pub fn references(&self) -> Vec<&str> {
        match self {
            Self::Literal(_) => Vec::new(),
            Self::Ref { target } => vec![target.as_str()],
            Self::GetAtt { target } => vec![target.0.as_str()],
            Self::Sub { template } => sub_references(template),
        }
    }

    /// The logical id of a plain `Ref`, if that is what this is.
    pub fn ref_target(&self) -> Option<&str> {
        match self {
            Self::Ref { target } => Some(target),
            _ => None,
        }
    }
}

/// Extract logical ids from `${...}` tokens. Pseudo parameters (`AWS::`) and
/// escaped literals (`${!...}`) are skipped.
pub fn sub_references(template: &str) -> Vec<&str> {
    let mut refs = Vec::new();
    let mut rest = template;
    while let Some(open) = rest.find("${") {
        let after = &rest[open + 2..];
        let Some(close) = after.find('}') else {
            break;
        };
        let token = after[..close].trim();
        if !token.starts_with('!') && !token.starts_with("AWS::") && !token.is_empty() {
            let id = token.split('.').next().unwrap_or(token);
            if !refs.contains(&id) {
                refs.push(id);
            }
        }
        rest = &after[close + 1..];
    }
    refs
}

// ============================================================================
// Policies and pools
// ============================================================================

/// What the apply engine does with a resource removed from the plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalPolicy {
    #[default]
    Destroy,
    Retain,
    /// Take a final snapshot, then delete.
    Snapshot,
}

impl fmt::Display for RemovalPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Destroy => write!(f, "Delete"),
            Self::Retain => write!(f, "Retain"),
            Self::Snapshot => write!(f, "Snapshot"),
        }
    }
}

/// The two compute pools of the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Pool {
    Web,
    MathWorker,
}

impl Pool {
    pub const ALL: [Pool; 2] = [Pool::Web, Pool::MathWorker];

    /// Owner label used on security groups.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Web => "web",
            Self::MathWorker => "math-worker",
        }
    }

    /// Service label written by the bootstrap script and used as log stream.
    pub fn service_label(&self) -> &'static str {
        match self {
            Self::Web => "server",
            Self::MathWorker => "math",
        }
    }

    /// PascalCase stem used in logical ids.
    pub fn id_stem(&self) -> &'static str {
        match self {
            Self::Web => "Web",
            Self::MathWorker => "MathWorker",
        }
    }
}

impl fmt::Display for Pool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// Network
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubnetType {
    Public,
    /// No route to the internet in either direction.
    Isolated,
}

impl fmt::Display for SubnetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Public => write!(f, "public"),
            Self::Isolated => write!(f, "isolated"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkTopology {
    pub cidr_block: String,
    pub max_azs: u8,
    pub nat_gateways: u8,
    pub subnet_groups: Vec<SubnetGroup>,
}

impl NetworkTopology {
    pub fn group(&self, subnet_type: SubnetType) -> Option<&SubnetGroup> {
        self.subnet_groups
            .iter()
            .find(|g| g.subnet_type == subnet_type)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubnetGroup {
    pub name: String,
    pub subnet_type: SubnetType,
    pub cidr_mask: u8,
    pub subnets: Vec<Subnet>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subnet {
    /// Index into the region's availability zones
    pub availability_zone: u8,
    pub cidr_block: String,
}

// ============================================================================
// Security
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    Tcp,
}

/// Where ingress traffic may originate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Peer {
    CidrIp(String),
    SourceSecurityGroup(Value),
}

impl Peer {
    pub fn cidr(range: &str) -> Self {
        Self::CidrIp(range.to_string())
    }

    pub fn group(id: &str) -> Self {
        Self::SourceSecurityGroup(Value::reference(id))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngressRule {
    pub protocol: Protocol,
    pub port: u16,
    pub source: Peer,
    pub description: String,
}

impl IngressRule {
    pub fn tcp(port: u16, source: Peer, description: &str) -> Self {
        Self {
            protocol: Protocol::Tcp,
            port,
            source,
            description: description.to_string(),
        }
    }

    fn same_grant(&self, other: &IngressRule) -> bool {
        self.protocol == other.protocol && self.port == other.port && self.source == other.source
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityGroup {
    /// Pool or tier the group guards
    pub owner: String,
    pub description: String,
    pub vpc: Value,
    pub ingress: Vec<IngressRule>,
    pub allow_all_outbound: bool,
}

impl SecurityGroup {
    pub fn new(owner: &str, description: &str, vpc_id: &str) -> Self {
        Self {
            owner: owner.to_string(),
            description: description.to_string(),
            vpc: Value::reference(vpc_id),
            ingress: Vec::new(),
            allow_all_outbound: true,
        }
    }

    /// Add a rule unless an identical grant (protocol, port, source) exists.
    pub fn allow(&mut self, rule: IngressRule) {
        if !self.ingress.iter().any(|r| r.same_grant(&rule)) {
            self.ingress.push(rule);
        }
    }

    pub fn rules_on_port(&self, port: u16) -> impl Iterator<Item = &IngressRule> {
        self.ingress.iter().filter(move |r| r.port == port)
    }
}

// ============================================================================
// Identity
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyStatement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
    pub effect: String,
    pub action: Vec<String>,
    pub resource: Vec<Value>,
}

impl PolicyStatement {
    pub fn allow(sid: &str, actions: &[&str], resources: Vec<Value>) -> Self {
        Self {
            sid: Some(sid.to_string()),
            effect: "Allow".to_string(),
            action: actions.iter().map(|a| a.to_string()).collect(),
            resource: resources,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    pub version: String,
    pub statement: Vec<PolicyStatement>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IamRole {
    /// Service principal allowed to assume the role
    pub assumed_by: String,
    pub managed_policy_arns: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_policy: Option<PolicyDocument>,
}

/// A key pair created by the plan. Its private key lands in the parameter
/// store under `/ec2/keypair/<key pair id>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyPair {
    pub key_type: String,
    pub key_format: String,
}

impl KeyPair {
    /// Parameter holding the private key of the key pair `key_pair_id`.
    pub fn private_key_parameter(key_pair_id: &str) -> Value {
        Value::sub(format!("/ec2/keypair/${{{}.KeyPairId}}", key_pair_id))
    }
}

// ============================================================================
// Storage, secrets, parameters
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlarmTopic {
    pub display_name: String,
    pub subscriptions: Vec<Subscription>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub protocol: String,
    pub endpoint: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogGroup {
    pub retention_days: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bucket {
    pub bucket_name: Value,
    pub versioned: bool,
    pub public_read_access: bool,
    pub block_public_access: bool,
    pub auto_delete_objects: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedCredential {
    pub username: String,
    pub password_length: u8,
    pub exclude_characters: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Secret {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generate: Option<GeneratedCredential>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    pub name: String,
    pub value: Value,
    pub description: String,
}

// ============================================================================
// Database
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbSubnetGroup {
    pub name: String,
    pub description: String,
    pub vpc: Value,
    pub subnet_type: SubnetType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseInstance {
    pub engine: String,
    pub engine_version: String,
    pub instance_class: String,
    pub allocated_storage_gib: u32,
    pub storage_type: String,
    pub database_name: String,
    pub port: u16,
    /// Generated secret holding the master credentials
    pub credentials: Value,
    pub subnet_group: Value,
    pub security_groups: Vec<Value>,
    pub deletion_protection: bool,
    pub publicly_accessible: bool,
}

// ============================================================================
// Compute
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CpuArchitecture {
    X86_64,
    Arm64,
}

impl fmt::Display for CpuArchitecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::X86_64 => write!(f, "x86_64"),
            Self::Arm64 => write!(f, "arm64"),
        }
    }
}

/// An instance type such as `t3.medium` or `r8g.xlarge`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceShape(pub String);

impl InstanceShape {
    pub fn of(family: &str, size: &str) -> Self {
        Self(format!("{}.{}", family, size))
    }

    pub fn family(&self) -> &str {
        self.0.split('.').next().unwrap_or(&self.0)
    }

    /// Graviton families carry a `g` in the suffix after the generation
    /// digit (`t4g`, `r8g`, `c7gn`); GPU families like `g5` do not.
    pub fn architecture(&self) -> CpuArchitecture {
        let family = self.family();
        match family.find(|c: char| c.is_ascii_digit()) {
            Some(pos) if family[pos..].contains('g') => CpuArchitecture::Arm64,
            _ => CpuArchitecture::X86_64,
        }
    }
}

impl fmt::Display for InstanceShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineImage {
    pub name: String,
    pub architecture: CpuArchitecture,
    /// Public parameter resolving to the latest image id
    pub ssm_parameter: String,
}

impl MachineImage {
    pub fn amazon_linux_2023(architecture: CpuArchitecture) -> Self {
        Self {
            name: "amazon-linux-2023".to_string(),
            architecture,
            ssm_parameter: format!(
                "/aws/service/ami-amazon-linux-latest/al2023-ami-kernel-default-{}",
                architecture
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchTemplate {
    pub image: MachineImage,
    pub instance_type: InstanceShape,
    pub user_data: Value,
    pub security_group: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_name: Option<Value>,
    pub iam_role: Value,
}

/// The pool's singleton instance, launched from the pool's template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instance {
    pub launch_template: Value,
    pub vpc: Value,
    pub subnet_type: SubnetType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthCheckKind {
    /// Health as reported by the load balancer's target group
    Elb,
    /// Platform-level instance status only
    Ec2,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AsgHealthCheck {
    pub kind: HealthCheckKind,
    pub grace_seconds: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoScalingGroup {
    pub launch_template: Value,
    pub vpc: Value,
    pub subnet_type: SubnetType,
    pub min_capacity: u32,
    pub max_capacity: u32,
    pub health_check: AsgHealthCheck,
}

// ============================================================================
// Edge
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AppProtocol {
    Http,
    Https,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadBalancer {
    pub internet_facing: bool,
    pub security_group: Value,
    pub vpc: Value,
    pub subnet_type: SubnetType,
    pub idle_timeout_seconds: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetHealthCheck {
    pub path: String,
    pub interval_seconds: u32,
    pub timeout_seconds: u32,
    pub healthy_threshold: u32,
    pub unhealthy_threshold: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetGroup {
    pub port: u16,
    pub protocol: AppProtocol,
    pub vpc: Value,
    /// Autoscaling groups registered as targets
    pub targets: Vec<Value>,
    pub health_check: TargetHealthCheck,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listener {
    pub load_balancer: Value,
    pub port: u16,
    pub protocol: AppProtocol,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub certificates: Vec<Value>,
    pub default_target_group: Value,
    pub open: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Certificate {
    pub domain_name: String,
    pub validation: String,
}

// ============================================================================
// Release
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployApplication {
    pub application_name: String,
    pub compute_platform: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoRollback {
    pub failed_deployment: bool,
    pub stopped_deployment: bool,
    pub deployment_in_alarm: bool,
}

impl AutoRollback {
    /// Platform event names of the enabled triggers.
    pub fn events(&self) -> Vec<&'static str> {
        let mut events = Vec::new();
        if self.failed_deployment {
            events.push("DEPLOYMENT_FAILURE");
        }
        if self.stopped_deployment {
            events.push("DEPLOYMENT_STOP_ON_REQUEST");
        }
        if self.deployment_in_alarm {
            events.push("DEPLOYMENT_STOP_ON_ALARM");
        }
        events
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentGroup {
    pub application: Value,
    pub deployment_group_name: String,
    pub auto_scaling_groups: Vec<Value>,
    pub deployment_config: String,
    pub service_role: Value,
    pub install_agent: bool,
    pub auto_rollback: AutoRollback,
}

// ============================================================================
// Resource
// ============================================================================

/// Every resource kind a plan can contain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "properties", rename_all = "snake_case")]
pub enum Resource {
    Vpc(NetworkTopology),
    AlarmTopic(AlarmTopic),
    LogGroup(LogGroup),
    SecurityGroup(SecurityGroup),
    KeyPair(KeyPair),
    Role(IamRole),
    Bucket(Bucket),
    Secret(Secret),
    Parameter(Parameter),
    DbSubnetGroup(DbSubnetGroup),
    Database(DatabaseInstance),
    LaunchTemplate(LaunchTemplate),
    Instance(Instance),
    AutoScalingGroup(AutoScalingGroup),
    LoadBalancer(LoadBalancer),
    TargetGroup(TargetGroup),
    Listener(Listener),
    Certificate(Certificate),
    Application(DeployApplication),
    DeploymentGroup(DeploymentGroup),
}

impl Resource {
    /// Platform type name.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Vpc(_) => "AWS::EC2::VPC",
            Self::AlarmTopic(_) => "AWS::SNS::Topic",
            Self::LogGroup(_) => "AWS::Logs::LogGroup",
            Self::SecurityGroup(_) => "AWS::EC2::SecurityGroup",
            Self::KeyPair(_) => "AWS::EC2::KeyPair",
            Self::Role(_) => "AWS::IAM::Role",
            Self::Bucket(_) => "AWS::S3::Bucket",
            Self::Secret(_) => "AWS::SecretsManager::Secret",
            Self::Parameter(_) => "AWS::SSM::Parameter",
            Self::DbSubnetGroup(_) => "AWS::RDS::DBSubnetGroup",
            Self::Database(_) => "AWS::RDS::DBInstance",
            Self::LaunchTemplate(_) => "AWS::EC2::LaunchTemplate",
            Self::Instance(_) => "AWS::EC2::Instance",
            Self::AutoScalingGroup(_) => "AWS::AutoScaling::AutoScalingGroup",
            Self::LoadBalancer(_) => "AWS::ElasticLoadBalancingV2::LoadBalancer",
            Self::TargetGroup(_) => "AWS::ElasticLoadBalancingV2::TargetGroup",
            Self::Listener(_) => "AWS::ElasticLoadBalancingV2::Listener",
            Self::Certificate(_) => "AWS::CertificateManager::Certificate",
            Self::Application(_) => "AWS::CodeDeploy::Application",
            Self::DeploymentGroup(_) => "AWS::CodeDeploy::DeploymentGroup",
        }
    }

    /// Logical ids this resource consumes, in first-seen order.
    pub fn references(&self) -> Vec<&str> {
        let values: Vec<&Value> = match self {
            Self::Vpc(_)
            | Self::AlarmTopic(_)
            | Self::LogGroup(_)
            | Self::KeyPair(_)
            | Self::Secret(_)
            | Self::Certificate(_)
            | Self::Application(_) => Vec::new(),
            Self::SecurityGroup(sg) => std::iter::once(&sg.vpc)
                .chain(sg.ingress.iter().filter_map(|r| match &r.source {
                    Peer::SourceSecurityGroup(v) => Some(v),
                    Peer::CidrIp(_) => None,
                }))
                .collect(),
            Self::Role(role) => role
                .inline_policy
                .iter()
                .flat_map(|doc| doc.statement.iter())
                .flat_map(|s| s.resource.iter())
                .collect(),
            Self::Bucket(b) => vec![&b.bucket_name],
            Self::Parameter(p) => vec![&p.value],
            Self::DbSubnetGroup(g) => vec![&g.vpc],
            Self::Database(db) => [&db.credentials, &db.subnet_group]
                .into_iter()
                .chain(db.security_groups.iter())
                .collect(),
            Self::LaunchTemplate(lt) => [&lt.user_data, &lt.security_group, &lt.iam_role]
                .into_iter()
                .chain(lt.key_name.iter())
                .collect(),
            Self::Instance(i) => vec![&i.launch_template, &i.vpc],
            Self::AutoScalingGroup(asg) => vec![&asg.launch_template, &asg.vpc],
            Self::LoadBalancer(lb) => vec![&lb.security_group, &lb.vpc],
            Self::TargetGroup(tg) => std::iter::once(&tg.vpc).chain(tg.targets.iter()).collect(),
            Self::Listener(l) => [&l.load_balancer, &l.default_target_group]
                .into_iter()
                .chain(l.certificates.iter())
                .collect(),
            Self::DeploymentGroup(dg) => [&dg.application, &dg.service_role]
                .into_iter()
                .chain(dg.auto_scaling_groups.iter())
                .collect(),
        };

        let mut refs: Vec<&str> = Vec::new();
        for id in values.into_iter().flat_map(Value::references) {
            if !refs.contains(&id) {
                refs.push(id);
            }
        }
        refs
    }
}
