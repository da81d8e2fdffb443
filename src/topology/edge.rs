//! Edge and routing composer.

use super::{security, LogicalIds};
use crate::core::resource::{
    AppProtocol, Certificate, Listener, LoadBalancer, Pool, SubnetType, TargetGroup,
    TargetHealthCheck, Value,
};

/// Domain the HTTPS listener's certificate is issued for.
pub const DOMAIN_NAME: &str = "preprod.pol.is";

pub const HEALTH_CHECK_PATH: &str = "/api/v3/testConnection";

pub const IDLE_TIMEOUT_SECONDS: u32 = 300;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgePlan {
    pub certificate: Certificate,
    pub load_balancer: LoadBalancer,
    pub target_group: TargetGroup,
    pub http_listener: Listener,
    pub https_listener: Listener,
}

/// Slow to mark unhealthy, quick to mark healthy.
pub fn target_health_check() -> TargetHealthCheck {
    TargetHealthCheck {
        path: HEALTH_CHECK_PATH.to_string(),
        interval_seconds: 300,
        timeout_seconds: 10,
        healthy_threshold: 2,
        unhealthy_threshold: 10,
    }
}

pub fn compose(ids: &LogicalIds) -> EdgePlan {
    let listener = |port: u16, protocol: AppProtocol, certificates: Vec<Value>| Listener {
        load_balancer: Value::reference(&ids.load_balancer),
        port,
        protocol,
        certificates,
        default_target_group: Value::reference(&ids.target_group),
        open: true,
    };

    EdgePlan {
        certificate: Certificate {
            domain_name: DOMAIN_NAME.to_string(),
            validation: "DNS".to_string(),
        },
        load_balancer: LoadBalancer {
            internet_facing: true,
            security_group: Value::reference(&ids.lb_security_group),
            vpc: Value::reference(&ids.vpc),
            subnet_type: SubnetType::Public,
            idle_timeout_seconds: IDLE_TIMEOUT_SECONDS,
        },
        target_group: TargetGroup {
            port: security::HTTP_PORT,
            protocol: AppProtocol::Http,
            vpc: Value::reference(&ids.vpc),
            targets: vec![Value::reference(&ids.auto_scaling_group(Pool::Web))],
            health_check: target_health_check(),
        },
        http_listener: listener(security::HTTP_PORT, AppProtocol::Http, Vec::new()),
        https_listener: listener(
            security::HTTPS_PORT,
            AppProtocol::Https,
            vec![Value::reference(&ids.certificate)],
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan() -> EdgePlan {
        compose(&LogicalIds::new("Preprod"))
    }

    #[test]
    fn test_health_check_values() {
        let hc = plan().target_group.health_check;
        assert_eq!(hc.path, "/api/v3/testConnection");
        assert_eq!(hc.interval_seconds, 300);
        assert_eq!(hc.timeout_seconds, 10);
        assert_eq!(hc.healthy_threshold, 2);
        assert_eq!(hc.unhealthy_threshold, 10);
    }

    #[test]
    fn test_listeners_share_target_group() {
        let plan = plan();
        assert_eq!(plan.http_listener.port, 80);
        assert_eq!(plan.https_listener.port, 443);
        assert_eq!(
            plan.http_listener.default_target_group,
            plan.https_listener.default_target_group
        );
        assert!(plan.http_listener.certificates.is_empty());
        assert_eq!(
            plan.https_listener.certificates,
            vec![Value::reference("PreprodWebAppCertificate")]
        );
    }

    #[test]
    fn test_target_group_fed_by_web_asg_only() {
        let tg = plan().target_group;
        assert_eq!(tg.targets, vec![Value::reference("PreprodWebAsg")]);
        assert_eq!(tg.protocol, AppProtocol::Http);
    }

    #[test]
    fn test_load_balancer() {
        let plan = plan();
        assert!(plan.load_balancer.internet_facing);
        assert_eq!(plan.load_balancer.idle_timeout_seconds, 300);
        assert_eq!(
            plan.load_balancer.security_group.ref_target(),
            Some("PreprodLBSecurityGroup")
        );
        assert_eq!(plan.certificate.domain_name, "preprod.pol.is");
        assert_eq!(plan.certificate.validation, "DNS");
    }
}
