//! Provision a fixed AWS network and a single EC2 instance.
//!
//! The [Driver] issues one EC2 call (plus follow-ups) per resource type in a fixed order:
//! VPC, private subnets, public subnet, internet gateway, route table, default route,
//! security group, key pair, and finally an instance reachable over SSH from the caller's
//! public IP. Every created resource is tagged with `Name` and `Owner`, and the identifiers
//! of created resources are appended to a [Record] file.
//!
//! There is no reconciliation, retry, or rollback: the first failing call aborts the remaining
//! sequence and anything already created is left behind.
//!
//! # Status
//!
//! `provisioner` is **ALPHA** software and is not yet recommended for production use. Developers should
//! expect breaking changes and occasional instability.

use thiserror::Error;

mod cloud;
pub use cloud::{Cloud, IngressRule, InstanceRequest, IpLookup, KeyPair};
mod config;
pub use config::{
    Config, Credentials, InstanceConfig, KeyPairConfig, SshConfig, SubnetConfig, VpcConfig,
};
mod driver;
pub use driver::{Driver, Infrastructure};
mod record;
pub use record::Record;
pub mod mocks;
mod utils;
pub use utils::{exact_cidr, parse_public_ip, DEFAULT_ROUTE_CIDR, INGRESS_PROTOCOL};

cfg_if::cfg_if! {
    if #[cfg(feature = "aws")] {
        pub mod aws;
    }
}

/// Key of the tag carrying a resource's display name.
pub const NAME_TAG: &str = "Name";

/// Key of the tag carrying a resource's owner.
pub const OWNER_TAG: &str = "Owner";

/// Errors that can occur while provisioning.
#[derive(Error, Debug)]
pub enum Error {
    #[cfg(feature = "aws")]
    #[error("AWS EC2 error: {0}")]
    AwsEc2(#[from] aws_sdk_ec2::Error),
    #[cfg(feature = "aws")]
    #[error("HTTP error: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("{operation} response missing {field}")]
    MissingField {
        operation: &'static str,
        field: &'static str,
    },
    #[error("invalid public IP: {0}")]
    InvalidPublicIp(String),
    #[error("invalid instance type: {0}")]
    InvalidInstanceType(String),
    #[error("provider error: {0}")]
    Provider(String),
}
