//! Identity and access composer.
//!
//! Two roles: the instance role shared by both compute pools, and the
//! deployment role assumed by the release service. The deployment-package
//! bucket is built here because the instance role's read grant targets it.

use super::LogicalIds;
use crate::core::error::{PlanError, Result};
use crate::core::resource::{Bucket, IamRole, PolicyDocument, PolicyStatement, Value};
use crate::core::types::{StackConfig, DEPLOYMENT_BUCKET_INFIX};

/// Maximum managed policies attachable to one role.
pub const MAX_MANAGED_POLICIES: usize = 10;

/// Maximum size of a role's inline policy document, in characters.
pub const MAX_INLINE_POLICY_CHARS: usize = 10_240;

/// Managed capability bundles every compute instance receives.
pub const INSTANCE_MANAGED_POLICIES: [&str; 5] = [
    "AmazonSSMManagedInstanceCore",
    "service-role/AmazonEC2RoleforAWSCodeDeploy",
    "SecretsManagerReadWrite",
    "AmazonEC2ContainerRegistryReadOnly",
    "CloudWatchLogsFullAccess",
];

pub const DEPLOY_MANAGED_POLICIES: [&str; 1] = ["service-role/AWSCodeDeployRole"];

const POLICY_VERSION: &str = "2012-10-17";

/// Roles and the bucket they grant on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityPlan {
    pub instance_role: IamRole,
    pub deploy_role: IamRole,
    pub deployment_bucket: Bucket,
}

pub fn managed_policy_arn(name: &str) -> String {
    format!("arn:aws:iam::aws:policy/{}", name)
}

/// Build both roles and the deployment bucket, checking platform limits.
pub fn compose(config: &StackConfig, ids: &LogicalIds) -> Result<IdentityPlan> {
    let instance_role = IamRole {
        assumed_by: "ec2.amazonaws.com".to_string(),
        managed_policy_arns: INSTANCE_MANAGED_POLICIES
            .iter()
            .map(|p| managed_policy_arn(p))
            .collect(),
        inline_policy: Some(PolicyDocument {
            version: POLICY_VERSION.to_string(),
            statement: vec![
                PolicyStatement::allow(
                    "ObjectWrite",
                    &["s3:PutObject", "s3:PutObjectAcl", "s3:AbortMultipartUpload"],
                    vec![Value::literal("arn:aws:s3:::*"), Value::literal("arn:aws:s3:::*/*")],
                ),
                PolicyStatement::allow(
                    "DeploymentPackageRead",
                    &["s3:GetObject*", "s3:GetBucket*", "s3:List*"],
                    vec![
                        Value::attr(&ids.deployment_bucket, "Arn"),
                        Value::sub(format!("${{{}.Arn}}/*", ids.deployment_bucket)),
                    ],
                ),
            ],
        }),
    };
    check_policy_limits(&ids.instance_role, &instance_role)?;

    let deploy_role = IamRole {
        assumed_by: "codedeploy.amazonaws.com".to_string(),
        managed_policy_arns: DEPLOY_MANAGED_POLICIES
            .iter()
            .map(|p| managed_policy_arn(p))
            .collect(),
        inline_policy: None,
    };
    check_policy_limits(&ids.deploy_role, &deploy_role)?;

    Ok(IdentityPlan {
        instance_role,
        deploy_role,
        deployment_bucket: deployment_bucket(config),
    })
}

fn deployment_bucket(config: &StackConfig) -> Bucket {
    Bucket {
        bucket_name: Value::sub(format!(
            "{}{}${{AWS::AccountId}}-{}",
            config.slug(),
            DEPLOYMENT_BUCKET_INFIX,
            config.region
        )),
        versioned: true,
        public_read_access: false,
        block_public_access: true,
        auto_delete_objects: true,
    }
}

/// Fail when a role would be rejected by the platform for its size.
pub fn check_policy_limits(role_id: &str, role: &IamRole) -> Result<()> {
    if role.managed_policy_arns.len() > MAX_MANAGED_POLICIES {
        return Err(PlanError::PolicyLimit {
            role: role_id.to_string(),
            detail: format!(
                "{} managed policies attached, at most {} allowed",
                role.managed_policy_arns.len(),
                MAX_MANAGED_POLICIES
            ),
        });
    }
    if let Some(ref doc) = role.inline_policy {
        let size = serde_json::to_string(doc)?.chars().count();
        if size > MAX_INLINE_POLICY_CHARS {
            return Err(PlanError::PolicyLimit {
                role: role_id.to_string(),
                detail: format!(
                    "inline policy is {} characters, at most {} allowed",
                    size, MAX_INLINE_POLICY_CHARS
                ),
            });
        }
    }
    Ok(())
}
