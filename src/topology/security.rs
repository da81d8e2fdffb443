//! Security rule deriver.
//!
//! One group per pool plus one for the load balancer. SSH reaches the
//! pools only when `enableSSHAccess` is set. HTTP and HTTPS are open on the
//! load balancer and also directly on the web group, since the web pool's
//! singleton instance is reached without the load balancer too.

use super::LogicalIds;
use crate::core::resource::{IngressRule, Peer, Pool, SecurityGroup};
use crate::core::types::{StackConfig, ANY_IPV4};

pub const SSH_PORT: u16 = 22;
pub const HTTP_PORT: u16 = 80;
pub const HTTPS_PORT: u16 = 443;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityGroups {
    pub web: SecurityGroup,
    pub math_worker: SecurityGroup,
    pub load_balancer: SecurityGroup,
}

impl SecurityGroups {
    pub fn pool(&self, pool: Pool) -> &SecurityGroup {
        match pool {
            Pool::Web => &self.web,
            Pool::MathWorker => &self.math_worker,
        }
    }
}

/// SSH ingress for a pool, present iff the flag is enabled.
pub fn ssh_rule(config: &StackConfig) -> Option<IngressRule> {
    config.enable_ssh_access.then(|| {
        IngressRule::tcp(SSH_PORT, Peer::cidr(config.ssh_source()), "Allow SSH access")
    })
}

fn public_web_rules(group: &mut SecurityGroup) {
    group.allow(IngressRule::tcp(
        HTTP_PORT,
        Peer::cidr(ANY_IPV4),
        "Allow HTTP from anywhere",
    ));
    group.allow(IngressRule::tcp(
        HTTPS_PORT,
        Peer::cidr(ANY_IPV4),
        "Allow HTTPS from anywhere",
    ));
}

pub fn derive(config: &StackConfig, ids: &LogicalIds) -> SecurityGroups {
    let ssh = ssh_rule(config);
    if ssh.is_some() && config.ssh_source() == ANY_IPV4 {
        tracing::warn!(
            stack = %config.name,
            "SSH ingress is open to {}; set sshAllowedIpRange to restrict it",
            ANY_IPV4
        );
    }

    let mut web = SecurityGroup::new(
        Pool::Web.label(),
        "Allow HTTP and SSH access to web instances",
        &ids.vpc,
    );
    let mut math_worker = SecurityGroup::new(
        Pool::MathWorker.label(),
        "Security group for the math worker",
        &ids.vpc,
    );
    if let Some(rule) = ssh {
        web.allow(rule.clone());
        math_worker.allow(rule);
    }
    public_web_rules(&mut web);

    let mut load_balancer = SecurityGroup::new(
        "load-balancer",
        "Security group for the load balancer",
        &ids.vpc,
    );
    public_web_rules(&mut load_balancer);

    SecurityGroups {
        web,
        math_worker,
        load_balancer,
    }
}
