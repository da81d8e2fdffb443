//! Compute pool factory.
//!
//! Each pool gets one launch template consumed by both a singleton instance
//! and an autoscaling group. Key material is attached only when SSH is
//! enabled: a named key pair is imported, otherwise one is generated and its
//! private key published once under [`KeyPair::private_key_parameter`].

use super::{bootstrap, LogicalIds};
use crate::core::error::{PlanError, Result};
use crate::core::resource::{
    AsgHealthCheck, AutoScalingGroup, CpuArchitecture, HealthCheckKind, Instance, InstanceShape,
    KeyPair, LaunchTemplate, MachineImage, Pool, SubnetType, Value,
};
use crate::core::types::StackConfig;

/// Grace period before health checks count against a new instance.
pub const HEALTH_CHECK_GRACE_SECONDS: u32 = 15 * 60;

pub const MIN_CAPACITY: u32 = 1;
pub const MAX_CAPACITY: u32 = 2;

/// Instance shape and image a pool runs on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolShape {
    pub shape: InstanceShape,
    pub image: MachineImage,
}

impl PoolShape {
    pub fn for_pool(pool: Pool) -> Self {
        match pool {
            Pool::Web => Self {
                shape: InstanceShape::of("t3", "medium"),
                image: MachineImage::amazon_linux_2023(CpuArchitecture::X86_64),
            },
            Pool::MathWorker => Self {
                shape: InstanceShape::of("r8g", "xlarge"),
                image: MachineImage::amazon_linux_2023(CpuArchitecture::Arm64),
            },
        }
    }

    /// Reject shapes that cannot boot the image.
    pub fn check(&self, pool: Pool) -> Result<()> {
        let shape_arch = self.shape.architecture();
        if shape_arch == self.image.architecture {
            return Ok(());
        }
        Err(PlanError::ArchitectureMismatch {
            pool: pool.to_string(),
            shape: self.shape.to_string(),
            shape_arch: shape_arch.to_string(),
            image: self.image.name.clone(),
            image_arch: self.image.architecture.to_string(),
        })
    }
}

/// Where a pool's SSH key comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyChoice {
    /// An existing key pair, referenced by name
    Imported(String),
    /// A key pair created by the plan
    Generated,
}

pub fn key_choice(config: &StackConfig, pool: Pool) -> Option<KeyChoice> {
    if !config.enable_ssh_access {
        return None;
    }
    let name = match pool {
        Pool::Web => config.web_key_pair_name.as_ref(),
        Pool::MathWorker => config.math_worker_key_pair_name.as_ref(),
    };
    Some(match name {
        Some(name) => KeyChoice::Imported(name.clone()),
        None => KeyChoice::Generated,
    })
}

pub fn health_check(pool: Pool) -> AsgHealthCheck {
    let kind = match pool {
        // Waits on target-group registration.
        Pool::Web => HealthCheckKind::Elb,
        Pool::MathWorker => HealthCheckKind::Ec2,
    };
    AsgHealthCheck {
        kind,
        grace_seconds: HEALTH_CHECK_GRACE_SECONDS,
    }
}

/// Logical ids of one pool's resources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolIds {
    pub key_pair: String,
    pub launch_template: String,
    pub instance: String,
    pub auto_scaling_group: String,
}

impl PoolIds {
    pub fn new(ids: &LogicalIds, pool: Pool) -> Self {
        Self {
            key_pair: ids.key_pair(pool),
            launch_template: ids.launch_template(pool),
            instance: ids.instance(pool),
            auto_scaling_group: ids.auto_scaling_group(pool),
        }
    }
}

/// Everything a pool contributes to the plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolPlan {
    pub pool: Pool,
    pub ids: PoolIds,
    pub generated_key: Option<KeyPair>,
    pub launch_template: LaunchTemplate,
    pub instance: Instance,
    pub auto_scaling_group: AutoScalingGroup,
}

pub fn build_pool(config: &StackConfig, ids: &LogicalIds, pool: Pool) -> Result<PoolPlan> {
    let shape = PoolShape::for_pool(pool);
    shape.check(pool)?;
    let pool_ids = PoolIds::new(ids, pool);

    let (key_name, generated_key) = match key_choice(config, pool) {
        None => (None, None),
        Some(KeyChoice::Imported(name)) => (Some(Value::literal(name)), None),
        Some(KeyChoice::Generated) => (
            Some(Value::reference(&pool_ids.key_pair)),
            Some(KeyPair {
                key_type: "rsa".to_string(),
                key_format: "pem".to_string(),
            }),
        ),
    };

    let launch_template = LaunchTemplate {
        image: shape.image,
        instance_type: shape.shape,
        user_data: bootstrap::user_data(&ids.log_group, pool),
        security_group: Value::reference(ids.security_group(pool)),
        key_name,
        iam_role: Value::reference(&ids.instance_role),
    };
    let instance = Instance {
        launch_template: Value::reference(&pool_ids.launch_template),
        vpc: Value::reference(&ids.vpc),
        subnet_type: SubnetType::Public,
    };
    let auto_scaling_group = AutoScalingGroup {
        launch_template: Value::reference(&pool_ids.launch_template),
        vpc: Value::reference(&ids.vpc),
        subnet_type: SubnetType::Public,
        min_capacity: MIN_CAPACITY,
        max_capacity: MAX_CAPACITY,
        health_check: health_check(pool),
    };

    Ok(PoolPlan {
        pool,
        ids: pool_ids,
        generated_key,
        launch_template,
        instance,
        auto_scaling_group,
    })
}
