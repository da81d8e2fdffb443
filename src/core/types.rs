//! Configuration, address, plan and lock types.
//!
//! `StackConfig` is the single immutable input to the topology builder. Keys
//! follow the names operators already use (`enableSSHAccess`, `envFile`, ...);
//! snake_case aliases are accepted so hand-written files can use either.

use super::resource::RemovalPolicy;
use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::str::FromStr;

/// Source range used for SSH ingress when `sshAllowedIpRange` is absent.
/// Open to every IPv4 address.
pub const DEFAULT_SSH_RANGE: &str = "0.0.0.0/0";

/// Any IPv4 source, used for public HTTP/HTTPS ingress.
pub const ANY_IPV4: &str = "0.0.0.0/0";

/// Fixed middle part of the deployment-package bucket name.
pub const DEPLOYMENT_BUCKET_INFIX: &str = "-polis-deployment-packages-";

/// Length of the account id substituted into the bucket name.
pub const ACCOUNT_ID_LEN: usize = 12;

/// Longest bucket name the platform accepts.
pub const MAX_BUCKET_NAME_LEN: usize = 63;

// ============================================================================
// Top-level tierplan.yaml
// ============================================================================

/// Root configuration. Flags and names that select the shape of the plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct StackConfig {
    /// Logical-id prefix for every resource (e.g. "Preprod")
    #[serde(default = "default_name")]
    pub name: String,

    /// Deployment region, written into instance log-driver settings
    #[serde(default = "default_region")]
    pub region: String,

    /// Open port 22 on the compute pools and attach key pairs
    #[serde(rename = "enableSSHAccess", alias = "enable_ssh_access", default)]
    pub enable_ssh_access: bool,

    /// Environment file bundled with each release package
    #[serde(rename = "envFile", alias = "env_file")]
    pub env_file: PathBuf,

    /// Source branch recorded on the release pipeline
    #[serde(default)]
    pub branch: Option<String>,

    /// CIDR allowed to reach port 22 (defaults to open)
    #[serde(rename = "sshAllowedIpRange", alias = "ssh_allowed_ip_range", default)]
    pub ssh_allowed_ip_range: Option<String>,

    /// Existing key pair to import for the web pool
    #[serde(rename = "webKeyPairName", alias = "web_key_pair_name", default)]
    pub web_key_pair_name: Option<String>,

    /// Existing key pair to import for the math-worker pool
    #[serde(
        rename = "mathWorkerKeyPairName",
        alias = "math_worker_key_pair_name",
        default
    )]
    pub math_worker_key_pair_name: Option<String>,

    /// Subnet partitioning
    #[serde(default)]
    pub network: NetworkSettings,
}

impl StackConfig {
    /// Minimal configuration: every optional field at its default.
    pub fn new(env_file: impl Into<PathBuf>) -> Self {
        Self {
            name: default_name(),
            region: default_region(),
            enable_ssh_access: false,
            env_file: env_file.into(),
            branch: None,
            ssh_allowed_ip_range: None,
            web_key_pair_name: None,
            math_worker_key_pair_name: None,
            network: NetworkSettings::default(),
        }
    }

    /// Effective SSH source range.
    pub fn ssh_source(&self) -> &str {
        self.ssh_allowed_ip_range
            .as_deref()
            .unwrap_or(DEFAULT_SSH_RANGE)
    }

    /// Lowercase form of the name, used in physical names and parameter paths.
    pub fn slug(&self) -> String {
        self.name.to_ascii_lowercase()
    }

    /// Length of the deployment-package bucket name once the account id is
    /// substituted: `<slug><infix><account id>-<region>`.
    pub fn deployment_bucket_name_len(&self) -> usize {
        self.name.len() + DEPLOYMENT_BUCKET_INFIX.len() + ACCOUNT_ID_LEN + 1 + self.region.len()
    }
}

fn default_name() -> String {
    "Preprod".to_string()
}

fn default_region() -> String {
    "us-east-1".to_string()
}

/// Subnet partitioning settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct NetworkSettings {
    /// Availability zones to spread subnets across
    #[serde(rename = "maxAzs", alias = "max_azs", default = "default_max_azs")]
    pub max_azs: u8,

    /// Prefix length of every subnet
    #[serde(rename = "cidrMask", alias = "cidr_mask", default = "default_cidr_mask")]
    pub cidr_mask: u8,

    /// Address range of the VPC
    #[serde(rename = "vpcCidr", alias = "vpc_cidr", default = "default_vpc_cidr")]
    pub vpc_cidr: String,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            max_azs: default_max_azs(),
            cidr_mask: default_cidr_mask(),
            vpc_cidr: default_vpc_cidr(),
        }
    }
}

fn default_max_azs() -> u8 {
    2
}

fn default_cidr_mask() -> u8 {
    24
}

fn default_vpc_cidr() -> String {
    "10.0.0.0/16".to_string()
}

// ============================================================================
// IPv4 CIDR
// ============================================================================

/// An IPv4 block in CIDR notation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ipv4Cidr {
    addr: Ipv4Addr,
    prefix: u8,
}

impl Ipv4Cidr {
    pub fn new(addr: Ipv4Addr, prefix: u8) -> Option<Self> {
        (prefix <= 32).then_some(Self { addr, prefix })
    }

    pub fn addr(&self) -> Ipv4Addr {
        self.addr
    }

    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    fn mask(prefix: u8) -> u32 {
        if prefix == 0 {
            0
        } else {
            u32::MAX << (32 - prefix)
        }
    }

    /// True when no host bits are set.
    pub fn is_network_address(&self) -> bool {
        u32::from(self.addr) & !Self::mask(self.prefix) == 0
    }

    /// Number of `/mask` blocks that fit inside this range.
    pub fn capacity(&self, mask: u8) -> u64 {
        if mask < self.prefix || mask > 32 {
            return 0;
        }
        1u64 << (mask - self.prefix)
    }

    /// The `index`-th `/mask` block of this range, if it fits.
    pub fn subnet(&self, index: u32, mask: u8) -> Option<Self> {
        if u64::from(index) >= self.capacity(mask) {
            return None;
        }
        let base = u32::from(self.addr) & Self::mask(self.prefix);
        let step = 1u64 << (32 - mask);
        let addr = u32::try_from(u64::from(base) + u64::from(index) * step).ok()?;
        Self::new(Ipv4Addr::from(addr), mask)
    }
}

impl fmt::Display for Ipv4Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.addr, self.prefix)
    }
}

impl FromStr for Ipv4Cidr {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr, prefix) = s
            .split_once('/')
            .ok_or_else(|| format!("'{}' is not in CIDR notation", s))?;
        let addr: Ipv4Addr = addr
            .parse()
            .map_err(|_| format!("'{}' has an invalid IPv4 address", s))?;
        let prefix: u8 = prefix
            .parse()
            .map_err(|_| format!("'{}' has an invalid prefix length", s))?;
        Self::new(addr, prefix).ok_or_else(|| format!("'{}' prefix exceeds 32", s))
    }
}

// ============================================================================
// Plan
// ============================================================================

/// Action to take on a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanAction {
    Create,
    Update,
    Destroy,
    NoOp,
}

impl fmt::Display for PlanAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "CREATE"),
            Self::Update => write!(f, "UPDATE"),
            Self::Destroy => write!(f, "DESTROY"),
            Self::NoOp => write!(f, "NO-OP"),
        }
    }
}

/// A single planned change.
#[derive(Debug, Clone)]
pub struct PlannedChange {
    /// Logical id
    pub resource_id: String,

    /// Platform resource type (e.g. "AWS::EC2::Instance")
    pub resource_type: String,

    /// Action to take
    pub action: PlanAction,

    /// Human-readable description
    pub description: String,
}

/// Diff of a freshly built graph against the last synthesized lock.
#[derive(Debug, Clone)]
pub struct ChangeSet {
    /// Stack name
    pub name: String,

    /// Changes in execution order, destroys last
    pub changes: Vec<PlannedChange>,

    /// Topological creation order (logical ids)
    pub execution_order: Vec<String>,

    /// Summary counts
    pub to_create: u32,
    pub to_update: u32,
    pub to_destroy: u32,
    pub unchanged: u32,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.to_create == 0 && self.to_update == 0 && self.to_destroy == 0
    }
}

// ============================================================================
// Lock
// ============================================================================

/// Snapshot of the last synthesized plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanLock {
    /// Lock schema version
    pub schema: String,

    /// Stack name
    pub name: String,

    /// When this lock was generated (RFC 3339)
    pub generated_at: String,

    /// Generator version
    pub generator: String,

    /// Fingerprint of the whole graph
    pub fingerprint: String,

    /// Per-resource entries, in creation order
    pub resources: IndexMap<String, ResourceLock>,
}

/// Lock entry for one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLock {
    /// Platform resource type
    #[serde(rename = "type")]
    pub resource_type: String,

    /// BLAKE3 hash of the rendered node
    pub hash: String,

    /// What removal does to the resource
    #[serde(default)]
    pub removal_policy: RemovalPolicy,
}
