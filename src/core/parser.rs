//! YAML parsing and validation of `tierplan.yaml`.
//!
//! Validation collects every problem instead of stopping at the first one:
//! - `envFile` must be set
//! - `sshAllowedIpRange` must be an IPv4 CIDR
//! - key-pair names require `enableSSHAccess` and must be valid names
//! - the subnet layout must fit the VPC range
//! - `name` and `region` must leave the deployment bucket name within limits

use super::error::{PlanError, Result};
use super::types::*;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

/// Upper bound on availability zones a single region offers.
pub const MAX_AZS: u8 = 6;

static KEY_PAIR_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._\-]{1,255}$").expect("static regex"));

static STACK_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z][A-Za-z0-9]{0,63}$").expect("static regex"));

static REGION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z]{2}(-[a-z]+)+-\d$").expect("static regex"));

/// Validation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl ValidationError {
    fn new(message: String) -> Self {
        Self { message }
    }
}

/// Parse a tierplan.yaml file from disk.
pub fn parse_config_file(path: &Path) -> Result<StackConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| PlanError::io(path, e))?;
    parse_config(&content)
}

/// Parse a tierplan.yaml from a string.
pub fn parse_config(yaml: &str) -> Result<StackConfig> {
    Ok(serde_yaml_ng::from_str(yaml)?)
}

/// Parse and validate in one step; any validation error rejects the config.
pub fn load_config(path: &Path) -> Result<StackConfig> {
    let config = parse_config_file(path)?;
    ensure_valid(&config)?;
    Ok(config)
}

/// Reject a config with any validation errors.
pub fn ensure_valid(config: &StackConfig) -> Result<()> {
    let errors = validate_config(config);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(PlanError::Config(errors))
    }
}

/// Validate a parsed config. Returns a list of errors (empty = valid).
pub fn validate_config(config: &StackConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if !STACK_NAME.is_match(&config.name) {
        errors.push(ValidationError::new(format!(
            "name '{}' must start with an uppercase letter and be alphanumeric",
            config.name
        )));
    }

    if !REGION.is_match(&config.region) {
        errors.push(ValidationError::new(format!(
            "region '{}' is not a valid region name",
            config.region
        )));
    }

    let bucket_len = config.deployment_bucket_name_len();
    if bucket_len > MAX_BUCKET_NAME_LEN {
        errors.push(ValidationError::new(format!(
            "name '{}' with region '{}' gives a {}-character deployment bucket name, at most {} allowed",
            config.name, config.region, bucket_len, MAX_BUCKET_NAME_LEN
        )));
    }

    if config.env_file.as_os_str().is_empty() {
        errors.push(ValidationError::new(
            "envFile must not be empty".to_string(),
        ));
    }

    if let Some(ref branch) = config.branch {
        if branch.trim().is_empty() {
            errors.push(ValidationError::new(
                "branch must not be empty when set".to_string(),
            ));
        }
    }

    if let Some(ref range) = config.ssh_allowed_ip_range {
        if let Err(e) = range.parse::<Ipv4Cidr>() {
            errors.push(ValidationError::new(format!("sshAllowedIpRange: {}", e)));
        }
    }

    validate_key_pair(
        "webKeyPairName",
        config.web_key_pair_name.as_deref(),
        config.enable_ssh_access,
        &mut errors,
    );
    validate_key_pair(
        "mathWorkerKeyPairName",
        config.math_worker_key_pair_name.as_deref(),
        config.enable_ssh_access,
        &mut errors,
    );

    validate_network(&config.network, &mut errors);

    errors
}

fn validate_key_pair(
    field: &str,
    name: Option<&str>,
    ssh_enabled: bool,
    errors: &mut Vec<ValidationError>,
) {
    let Some(name) = name else {
        return;
    };
    if !ssh_enabled {
        errors.push(ValidationError::new(format!(
            "{} is set but enableSSHAccess is false",
            field
        )));
    }
    if !KEY_PAIR_NAME.is_match(name) {
        errors.push(ValidationError::new(format!(
            "{} '{}' is not a valid key pair name",
            field, name
        )));
    }
}

fn validate_network(network: &NetworkSettings, errors: &mut Vec<ValidationError>) {
    if network.max_azs == 0 || network.max_azs > MAX_AZS {
        errors.push(ValidationError::new(format!(
            "network.maxAzs must be between 1 and {}, got {}",
            MAX_AZS, network.max_azs
        )));
    }

    if !(16..=28).contains(&network.cidr_mask) {
        errors.push(ValidationError::new(format!(
            "network.cidrMask must be between 16 and 28, got {}",
            network.cidr_mask
        )));
    }

    let vpc = match network.vpc_cidr.parse::<Ipv4Cidr>() {
        Ok(vpc) => vpc,
        Err(e) => {
            errors.push(ValidationError::new(format!("network.vpcCidr: {}", e)));
            return;
        }
    };
    if !vpc.is_network_address() {
        errors.push(ValidationError::new(format!(
            "network.vpcCidr '{}' has host bits set",
            network.vpc_cidr
        )));
    }
    if network.cidr_mask < vpc.prefix() {
        errors.push(ValidationError::new(format!(
            "network.cidrMask /{} is wider than the VPC range {}",
            network.cidr_mask, network.vpc_cidr
        )));
        return;
    }

    // One public and one isolated subnet per availability zone.
    let needed = 2 * u64::from(network.max_azs);
    if vpc.capacity(network.cidr_mask) < needed {
        errors.push(ValidationError::new(format!(
            "network.vpcCidr {} cannot hold {} /{} subnets",
            network.vpc_cidr, needed, network.cidr_mask
        )));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn messages(config: &StackConfig) -> Vec<String> {
        validate_config(config)
            .into_iter()
            .map(|e| e.message)
            .collect()
    }

    #[test]
    fn test_parse_valid() {
        let yaml = r#"
enableSSHAccess: true
envFile: .env
sshAllowedIpRange: 10.0.0.0/16
webKeyPairName: wkey
"#;
        let config = parse_config(yaml).unwrap();
        let errors = messages(&config);
        assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(messages(&StackConfig::new(".env")).is_empty());
    }

    #[test]
    fn test_empty_env_file() {
        let config = StackConfig::new("");
        assert!(messages(&config).iter().any(|m| m.contains("envFile")));
    }

    #[test]
    fn test_invalid_ssh_cidr() {
        let mut config = StackConfig::new(".env");
        config.enable_ssh_access = true;
        config.ssh_allowed_ip_range = Some("10.0.0.0/40".to_string());
        assert!(messages(&config)
            .iter()
            .any(|m| m.contains("sshAllowedIpRange")));
    }

    #[test]
    fn test_key_pair_without_ssh_conflicts() {
        let mut config = StackConfig::new(".env");
        config.web_key_pair_name = Some("wkey".to_string());
        config.math_worker_key_pair_name = Some("mkey".to_string());
        let errors = messages(&config);
        assert_eq!(
            errors
                .iter()
                .filter(|m| m.contains("enableSSHAccess is false"))
                .count(),
            2
        );
    }

    #[test]
    fn test_bad_key_pair_name() {
        let mut config = StackConfig::new(".env");
        config.enable_ssh_access = true;
        config.web_key_pair_name = Some("has space".to_string());
        assert!(messages(&config)
            .iter()
            .any(|m| m.contains("not a valid key pair name")));
    }

    #[test]
    fn test_bad_name_and_region() {
        let mut config = StackConfig::new(".env");
        config.name = "pre-prod".to_string();
        config.region = "moon".to_string();
        let errors = messages(&config);
        assert!(errors.iter().any(|m| m.contains("name 'pre-prod'")));
        assert!(errors.iter().any(|m| m.contains("region 'moon'")));
    }

    #[test]
    fn test_bucket_name_length_boundary() {
        let mut config = StackConfig::new(".env");
        config.name = "Abcdefghijklmn".to_string();
        assert_eq!(config.deployment_bucket_name_len(), MAX_BUCKET_NAME_LEN);
        assert!(messages(&config).is_empty());

        config.name = "Abcdefghijklmno".to_string();
        let errors = messages(&config);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("64-character deployment bucket name"));
    }

    #[test]
    fn test_bucket_name_long_region() {
        let mut config = StackConfig::new(".env");
        config.name = "PreprodStagingEnv".to_string();
        config.region = "ap-southeast-2".to_string();
        assert!(matches!(ensure_valid(&config), Err(PlanError::Config(_))));
    }

    #[test]
    fn test_network_bounds() {
        let mut config = StackConfig::new(".env");
        config.network.max_azs = 0;
        config.network.cidr_mask = 30;
        let errors = messages(&config);
        assert!(errors.iter().any(|m| m.contains("maxAzs")));
        assert!(errors.iter().any(|m| m.contains("cidrMask must be between")));
    }

    #[test]
    fn test_network_capacity() {
        let mut config = StackConfig::new(".env");
        config.network.vpc_cidr = "10.0.0.0/24".to_string();
        config.network.cidr_mask = 26;
        config.network.max_azs = 3;
        // /24 holds four /26 blocks; three AZs need six.
        assert!(messages(&config).iter().any(|m| m.contains("cannot hold 6")));
    }

    #[test]
    fn test_network_host_bits() {
        let mut config = StackConfig::new(".env");
        config.network.vpc_cidr = "10.0.0.1/16".to_string();
        assert!(messages(&config).iter().any(|m| m.contains("host bits")));
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = StackConfig::new("");
        config.ssh_allowed_ip_range = Some("nope".to_string());
        config.web_key_pair_name = Some("k".to_string());
        assert!(validate_config(&config).len() >= 3);
    }

    #[test]
    fn test_ensure_valid_maps_to_config_error() {
        let config = StackConfig::new("");
        match ensure_valid(&config) {
            Err(PlanError::Config(errors)) => assert_eq!(errors.len(), 1),
            other => panic!("expected config error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tierplan.yaml");
        std::fs::write(&path, "name: Staging\nenvFile: staging.env\n").unwrap();
        let config = load_config(&path).unwrap();
        assert_eq!(config.name, "Staging");
    }

    #[test]
    fn test_parse_missing_file() {
        let result = parse_config_file(Path::new("/nonexistent/tierplan.yaml"));
        assert!(matches!(result, Err(PlanError::Io { .. })));
    }

    #[test]
    fn test_parse_invalid_yaml() {
        let result = parse_config("not: [valid: yaml: {{");
        assert!(matches!(result, Err(PlanError::Yaml(_))));
    }
}
