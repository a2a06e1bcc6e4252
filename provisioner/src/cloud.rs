//! Interfaces to the cloud provider and the public IP lookup service.

use crate::Error;
use std::future::Future;

/// Key pair returned by the provider on creation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyPair {
    pub id: String,
    pub name: String,
    /// Unencrypted private key (PEM) returned exactly once by the provider
    pub material: String,
}

/// Parameters of a single instance launch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InstanceRequest {
    pub image_id: String,
    pub instance_type: String,
    pub subnet_id: String,
    pub security_group_id: String,
    pub key_name: String,
    pub min_count: i32,
    pub max_count: i32,
}

/// Single-port ingress permission restricted to one CIDR block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IngressRule {
    pub protocol: String,
    pub from_port: i32,
    pub to_port: i32,
    pub cidr: String,
    pub description: String,
}

/// Operations the provisioning driver issues against the provider.
///
/// Each method maps onto exactly one API call and returns the identifier (or flag) the
/// provider reports. Implementations must not retry or deduplicate: calling a creation
/// method twice creates two resources.
pub trait Cloud {
    /// Create a VPC with default tenancy and return its ID.
    fn create_vpc(&self, cidr: &str) -> impl Future<Output = Result<String, Error>> + Send;

    /// Create a subnet in `zone` and return its ID.
    fn create_subnet(
        &self,
        vpc_id: &str,
        zone: &str,
        cidr: &str,
    ) -> impl Future<Output = Result<String, Error>> + Send;

    /// Create a detached internet gateway and return its ID.
    fn create_internet_gateway(&self) -> impl Future<Output = Result<String, Error>> + Send;

    fn attach_internet_gateway(
        &self,
        vpc_id: &str,
        gateway_id: &str,
    ) -> impl Future<Output = Result<(), Error>> + Send;

    /// Create a route table scoped to `vpc_id` and return its ID.
    fn create_route_table(&self, vpc_id: &str)
        -> impl Future<Output = Result<String, Error>> + Send;

    /// Add a route to `destination` via `gateway_id` and return the provider's result flag.
    fn create_route(
        &self,
        route_table_id: &str,
        destination: &str,
        gateway_id: &str,
    ) -> impl Future<Output = Result<bool, Error>> + Send;

    /// Associate a route table with a subnet and return the association ID.
    fn associate_route_table(
        &self,
        route_table_id: &str,
        subnet_id: &str,
    ) -> impl Future<Output = Result<String, Error>> + Send;

    /// Assign a public IPv4 address to every instance launched into the subnet.
    fn enable_public_ip_on_launch(
        &self,
        subnet_id: &str,
    ) -> impl Future<Output = Result<(), Error>> + Send;

    /// Create a security group and return its ID.
    fn create_security_group(
        &self,
        vpc_id: &str,
        name: &str,
        description: &str,
    ) -> impl Future<Output = Result<String, Error>> + Send;

    fn create_key_pair(&self, name: &str) -> impl Future<Output = Result<KeyPair, Error>> + Send;

    /// Launch instances and return the ID of the first one.
    fn run_instance(
        &self,
        request: &InstanceRequest,
    ) -> impl Future<Output = Result<String, Error>> + Send;

    /// Authorize ingress on a security group and return the IDs of the created rules.
    fn authorize_ingress(
        &self,
        group_id: &str,
        rule: &IngressRule,
    ) -> impl Future<Output = Result<Vec<String>, Error>> + Send;

    fn create_tags(
        &self,
        resource_id: &str,
        tags: &[(&str, &str)],
    ) -> impl Future<Output = Result<(), Error>> + Send;
}

/// Source of the caller's public IPv4 address.
pub trait IpLookup {
    fn public_ip(&self) -> impl Future<Output = Result<String, Error>> + Send;
}
