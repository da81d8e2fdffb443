//! Data tier provisioner.
//!
//! A single database in the isolated subnets. Credentials are generated
//! into a managed secret, and three discovery parameters publish the secret
//! locator, host and port. Only the two pool security groups may connect,
//! and only on the database port.

use super::LogicalIds;
use crate::core::resource::{
    DatabaseInstance, DbSubnetGroup, GeneratedCredential, IngressRule, Parameter, Peer, Pool,
    Secret, SecurityGroup, SubnetType, Value,
};
use crate::core::types::StackConfig;

pub const DB_PORT: u16 = 5432;
pub const DB_USER: &str = "dbUser";
pub const DB_NAME: &str = "polisdb";

/// Characters kept out of generated passwords so they survive connection URLs.
const EXCLUDED_PASSWORD_CHARS: &str = " %+~`#$&*()|[]{}:;<>?!'/@\"\\";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataTier {
    pub subnet_group: DbSubnetGroup,
    pub security_group: SecurityGroup,
    pub secret: Secret,
    pub instance: DatabaseInstance,
    /// Discovery parameters keyed by logical id
    pub parameters: Vec<(String, Parameter)>,
}

pub fn provision(config: &StackConfig, ids: &LogicalIds) -> DataTier {
    let subnet_group = DbSubnetGroup {
        name: format!("{}PolisDatabaseSubnetGroup", config.name),
        description: format!("Subnet group for the {} postgres database", config.slug()),
        vpc: Value::reference(&ids.vpc),
        subnet_type: SubnetType::Isolated,
    };

    let mut security_group =
        SecurityGroup::new("database", "Security group for the database", &ids.vpc);
    for pool in Pool::ALL {
        security_group.allow(IngressRule::tcp(
            DB_PORT,
            Peer::group(ids.security_group(pool)),
            &format!("Allow database access from {} instances", pool),
        ));
    }

    let secret = Secret {
        name: None,
        description: format!("Generated credentials for the {} Polis database", config.name),
        generate: Some(GeneratedCredential {
            username: DB_USER.to_string(),
            password_length: 30,
            exclude_characters: EXCLUDED_PASSWORD_CHARS.to_string(),
        }),
    };

    let instance = DatabaseInstance {
        engine: "postgres".to_string(),
        engine_version: "17".to_string(),
        instance_class: "db.t3.large".to_string(),
        allocated_storage_gib: 20,
        storage_type: "gp2".to_string(),
        database_name: DB_NAME.to_string(),
        port: DB_PORT,
        credentials: Value::reference(&ids.db_secret),
        subnet_group: Value::reference(&ids.db_subnet_group),
        security_groups: vec![Value::reference(&ids.db_security_group)],
        deletion_protection: true,
        publicly_accessible: false,
    };

    DataTier {
        subnet_group,
        security_group,
        secret,
        instance,
        parameters: discovery_parameters(config, ids),
    }
}

fn discovery_parameters(config: &StackConfig, ids: &LogicalIds) -> Vec<(String, Parameter)> {
    let path = |leaf: &str| format!("/{}/polis/{}", config.slug(), leaf);
    vec![
        (
            ids.db_secret_param.clone(),
            Parameter {
                name: path("db-secret-arn"),
                value: Value::reference(&ids.db_secret),
                description: format!("ARN of the {} Polis database secret", config.name),
            },
        ),
        (
            ids.db_host_param.clone(),
            Parameter {
                name: path("db-host"),
                value: Value::attr(&ids.database, "Endpoint.Address"),
                description: format!("{} Polis database host", config.name),
            },
        ),
        (
            ids.db_port_param.clone(),
            Parameter {
                name: path("db-port"),
                value: Value::attr(&ids.database, "Endpoint.Port"),
                description: format!("{} Polis database port", config.name),
            },
        ),
    ]
}
