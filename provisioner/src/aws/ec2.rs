//! AWS EC2 SDK function wrappers

use crate::{Cloud, Credentials, Error, IngressRule, InstanceRequest, KeyPair};
use aws_config::BehaviorVersion;
pub use aws_config::Region;
use aws_sdk_ec2::{
    config::Credentials as StaticCredentials,
    types::{AttributeBooleanValue, InstanceType, IpPermission, IpRange, Tag, Tenancy},
    Client as Ec2Client,
};
use tracing::debug;

/// Name reported by the static credentials provider
const CREDENTIALS_PROVIDER: &str = "provisioner-config";

/// Creates an EC2 client for the specified AWS region
///
/// Static credentials take precedence over the SDK's default provider chain.
pub async fn create_client(region: Region, credentials: Option<&Credentials>) -> Ec2Client {
    let mut loader = aws_config::defaults(BehaviorVersion::latest()).region(region);
    if let Some(credentials) = credentials {
        loader = loader.credentials_provider(StaticCredentials::new(
            &credentials.access_key_id,
            &credentials.secret_access_key,
            None,
            None,
            CREDENTIALS_PROVIDER,
        ));
    }
    let config = loader.load().await;
    Ec2Client::new(&config)
}

fn missing(operation: &'static str, field: &'static str) -> Error {
    Error::MissingField { operation, field }
}

/// [Cloud] backed by the EC2 API of a single region.
#[derive(Clone)]
pub struct Ec2 {
    client: Ec2Client,
}

impl Ec2 {
    pub fn new(client: Ec2Client) -> Self {
        Self { client }
    }
}

impl Cloud for Ec2 {
    async fn create_vpc(&self, cidr: &str) -> Result<String, Error> {
        let resp = self
            .client
            .create_vpc()
            .cidr_block(cidr)
            .instance_tenancy(Tenancy::Default)
            .send()
            .await
            .map_err(aws_sdk_ec2::Error::from)?;
        resp.vpc()
            .and_then(|vpc| vpc.vpc_id())
            .map(str::to_string)
            .ok_or_else(|| missing("CreateVpc", "VpcId"))
    }

    async fn create_subnet(&self, vpc_id: &str, zone: &str, cidr: &str) -> Result<String, Error> {
        let resp = self
            .client
            .create_subnet()
            .vpc_id(vpc_id)
            .availability_zone(zone)
            .cidr_block(cidr)
            .send()
            .await
            .map_err(aws_sdk_ec2::Error::from)?;
        resp.subnet()
            .and_then(|subnet| subnet.subnet_id())
            .map(str::to_string)
            .ok_or_else(|| missing("CreateSubnet", "SubnetId"))
    }

    async fn create_internet_gateway(&self) -> Result<String, Error> {
        let resp = self
            .client
            .create_internet_gateway()
            .send()
            .await
            .map_err(aws_sdk_ec2::Error::from)?;
        resp.internet_gateway()
            .and_then(|igw| igw.internet_gateway_id())
            .map(str::to_string)
            .ok_or_else(|| missing("CreateInternetGateway", "InternetGatewayId"))
    }

    async fn attach_internet_gateway(&self, vpc_id: &str, gateway_id: &str) -> Result<(), Error> {
        self.client
            .attach_internet_gateway()
            .vpc_id(vpc_id)
            .internet_gateway_id(gateway_id)
            .send()
            .await
            .map_err(aws_sdk_ec2::Error::from)?;
        Ok(())
    }

    async fn create_route_table(&self, vpc_id: &str) -> Result<String, Error> {
        let resp = self
            .client
            .create_route_table()
            .vpc_id(vpc_id)
            .send()
            .await
            .map_err(aws_sdk_ec2::Error::from)?;
        resp.route_table()
            .and_then(|rt| rt.route_table_id())
            .map(str::to_string)
            .ok_or_else(|| missing("CreateRouteTable", "RouteTableId"))
    }

    async fn create_route(
        &self,
        route_table_id: &str,
        destination: &str,
        gateway_id: &str,
    ) -> Result<bool, Error> {
        let resp = self
            .client
            .create_route()
            .route_table_id(route_table_id)
            .destination_cidr_block(destination)
            .gateway_id(gateway_id)
            .send()
            .await
            .map_err(aws_sdk_ec2::Error::from)?;
        Ok(resp.r#return().unwrap_or_default())
    }

    async fn associate_route_table(
        &self,
        route_table_id: &str,
        subnet_id: &str,
    ) -> Result<String, Error> {
        let resp = self
            .client
            .associate_route_table()
            .route_table_id(route_table_id)
            .subnet_id(subnet_id)
            .send()
            .await
            .map_err(aws_sdk_ec2::Error::from)?;
        resp.association_id()
            .map(str::to_string)
            .ok_or_else(|| missing("AssociateRouteTable", "AssociationId"))
    }

    async fn enable_public_ip_on_launch(&self, subnet_id: &str) -> Result<(), Error> {
        self.client
            .modify_subnet_attribute()
            .subnet_id(subnet_id)
            .map_public_ip_on_launch(AttributeBooleanValue::builder().value(true).build())
            .send()
            .await
            .map_err(aws_sdk_ec2::Error::from)?;
        Ok(())
    }

    async fn create_security_group(
        &self,
        vpc_id: &str,
        name: &str,
        description: &str,
    ) -> Result<String, Error> {
        let resp = self
            .client
            .create_security_group()
            .group_name(name)
            .description(description)
            .vpc_id(vpc_id)
            .send()
            .await
            .map_err(aws_sdk_ec2::Error::from)?;
        resp.group_id()
            .map(str::to_string)
            .ok_or_else(|| missing("CreateSecurityGroup", "GroupId"))
    }

    async fn create_key_pair(&self, name: &str) -> Result<KeyPair, Error> {
        let resp = self
            .client
            .create_key_pair()
            .key_name(name)
            .send()
            .await
            .map_err(aws_sdk_ec2::Error::from)?;
        let id = resp
            .key_pair_id()
            .ok_or_else(|| missing("CreateKeyPair", "KeyPairId"))?;
        let material = resp
            .key_material()
            .ok_or_else(|| missing("CreateKeyPair", "KeyMaterial"))?;
        Ok(KeyPair {
            id: id.to_string(),
            name: resp.key_name().unwrap_or(name).to_string(),
            material: material.to_string(),
        })
    }

    async fn run_instance(&self, request: &InstanceRequest) -> Result<String, Error> {
        let instance_type = InstanceType::try_parse(&request.instance_type)
            .map_err(|_| Error::InvalidInstanceType(request.instance_type.clone()))?;
        let resp = self
            .client
            .run_instances()
            .image_id(&request.image_id)
            .instance_type(instance_type)
            .min_count(request.min_count)
            .max_count(request.max_count)
            .key_name(&request.key_name)
            .subnet_id(&request.subnet_id)
            .security_group_ids(&request.security_group_id)
            .send()
            .await
            .map_err(aws_sdk_ec2::Error::from)?;
        resp.instances()
            .first()
            .and_then(|instance| instance.instance_id())
            .map(str::to_string)
            .ok_or_else(|| missing("RunInstances", "InstanceId"))
    }

    async fn authorize_ingress(
        &self,
        group_id: &str,
        rule: &IngressRule,
    ) -> Result<Vec<String>, Error> {
        let resp = self
            .client
            .authorize_security_group_ingress()
            .group_id(group_id)
            .ip_permissions(
                IpPermission::builder()
                    .ip_protocol(&rule.protocol)
                    .from_port(rule.from_port)
                    .to_port(rule.to_port)
                    .ip_ranges(
                        IpRange::builder()
                            .cidr_ip(&rule.cidr)
                            .description(&rule.description)
                            .build(),
                    )
                    .build(),
            )
            .send()
            .await
            .map_err(aws_sdk_ec2::Error::from)?;
        Ok(resp
            .security_group_rules()
            .iter()
            .filter_map(|r| r.security_group_rule_id())
            .map(str::to_string)
            .collect())
    }

    async fn create_tags(&self, resource_id: &str, tags: &[(&str, &str)]) -> Result<(), Error> {
        let tags = tags
            .iter()
            .map(|(key, value)| Tag::builder().key(*key).value(*value).build())
            .collect();
        self.client
            .create_tags()
            .resources(resource_id)
            .set_tags(Some(tags))
            .send()
            .await
            .map_err(aws_sdk_ec2::Error::from)?;
        debug!(resource = resource_id, "created tags");
        Ok(())
    }
}
