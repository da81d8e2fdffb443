//! Network partitioner.
//!
//! Carves one public and one isolated subnet per availability zone out of
//! the VPC range, public blocks first. No NAT gateway is planned, so the
//! isolated group has no outbound path to the internet.

use crate::core::error::{PlanError, Result};
use crate::core::resource::{NetworkTopology, Subnet, SubnetGroup, SubnetType};
use crate::core::types::{Ipv4Cidr, NetworkSettings};

/// Subnet group layout, in carving order.
const GROUPS: [(&str, SubnetType); 2] = [
    ("Public", SubnetType::Public),
    ("Isolated", SubnetType::Isolated),
];

/// Derive the subnet layout for the configured VPC.
pub fn partition(settings: &NetworkSettings) -> Result<NetworkTopology> {
    let vpc: Ipv4Cidr = settings.vpc_cidr.parse().map_err(PlanError::Network)?;

    let mut next = 0u32;
    let mut subnet_groups = Vec::with_capacity(GROUPS.len());
    for (name, subnet_type) in GROUPS {
        let mut subnets = Vec::with_capacity(usize::from(settings.max_azs));
        for az in 0..settings.max_azs {
            let block = vpc.subnet(next, settings.cidr_mask).ok_or_else(|| {
                PlanError::Network(format!(
                    "{} cannot hold subnet #{} of /{}",
                    vpc, next, settings.cidr_mask
                ))
            })?;
            subnets.push(Subnet {
                availability_zone: az,
                cidr_block: block.to_string(),
            });
            next += 1;
        }
        subnet_groups.push(SubnetGroup {
            name: name.to_string(),
            subnet_type,
            cidr_mask: settings.cidr_mask,
            subnets,
        });
    }

    Ok(NetworkTopology {
        cidr_block: vpc.to_string(),
        max_azs: settings.max_azs,
        nat_gateways: 0,
        subnet_groups,
    })
}
