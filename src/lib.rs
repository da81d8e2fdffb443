//! tierplan: declarative topology builder for a tiered application stack.
//!
//! One configuration in, one immutable resource graph out: network,
//! identity, security groups, two compute pools, a database, a load
//! balancer and a release pipeline, with every creation-order edge explicit.

pub mod cli;
pub mod core;
pub mod topology;
