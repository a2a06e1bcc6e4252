//! Issue resource creation calls in a fixed order.

use crate::{
    utils::{exact_cidr, parse_public_ip, DEFAULT_ROUTE_CIDR, INGRESS_PROTOCOL},
    Cloud, Config, Error, IngressRule, InstanceRequest, IpLookup, Record, NAME_TAG, OWNER_TAG,
};
use std::{fs, io::Write, path::Path};
use tracing::{debug, info};

/// Identifiers of every resource created by [Driver::create_infra].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Infrastructure {
    pub vpc_id: String,
    pub private_subnet_ids: Vec<String>,
    pub public_subnet_id: String,
    pub internet_gateway_id: String,
    pub route_table_id: String,
    pub route_created: bool,
    pub security_group_id: String,
    pub key_name: String,
    pub instance_id: String,
}

/// Provisions resources described by a [Config] through a [Cloud].
pub struct Driver<C: Cloud, L: IpLookup> {
    cloud: C,
    lookup: L,
    config: Config,
}

impl<C: Cloud, L: IpLookup> Driver<C, L> {
    pub fn new(cloud: C, lookup: L, config: Config) -> Self {
        Self {
            cloud,
            lookup,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Tags a resource with its display name and the configured owner
    async fn tag(&self, resource_id: &str, name: &str) -> Result<(), Error> {
        self.cloud
            .create_tags(
                resource_id,
                &[(NAME_TAG, name), (OWNER_TAG, self.config.owner.as_str())],
            )
            .await?;
        debug!(resource = resource_id, name, "tagged resource");
        Ok(())
    }

    /// Creates the VPC and returns its ID
    pub async fn create_vpc(&self) -> Result<String, Error> {
        let vpc = &self.config.vpc;
        let vpc_id = self.cloud.create_vpc(&vpc.cidr).await?;
        self.tag(&vpc_id, &vpc.name).await?;
        info!(vpc = vpc_id.as_str(), cidr = vpc.cidr.as_str(), "created VPC");
        Ok(vpc_id)
    }

    /// Creates a subnet in `zone` and returns its ID
    pub async fn create_subnet(
        &self,
        vpc_id: &str,
        zone: &str,
        cidr: &str,
        name: &str,
    ) -> Result<String, Error> {
        let subnet_id = self.cloud.create_subnet(vpc_id, zone, cidr).await?;
        self.tag(&subnet_id, name).await?;
        info!(
            subnet = subnet_id.as_str(),
            vpc = vpc_id,
            zone,
            cidr,
            "created subnet"
        );
        Ok(subnet_id)
    }

    pub async fn create_public_subnet(&self, vpc_id: &str) -> Result<String, Error> {
        let subnet = &self.config.public_subnet;
        self.create_subnet(vpc_id, &subnet.zone, &subnet.cidr, &subnet.name)
            .await
    }

    /// Creates one private subnet per configured zone, returning IDs in configuration order
    pub async fn create_private_subnets(&self, vpc_id: &str) -> Result<Vec<String>, Error> {
        let mut subnet_ids = Vec::with_capacity(self.config.private_subnets.len());
        for subnet in &self.config.private_subnets {
            let subnet_id = self
                .create_subnet(vpc_id, &subnet.zone, &subnet.cidr, &subnet.name)
                .await?;
            subnet_ids.push(subnet_id);
        }
        Ok(subnet_ids)
    }

    /// Creates an internet gateway and attaches it to the VPC
    pub async fn create_internet_gateway(&self, vpc_id: &str) -> Result<String, Error> {
        let gateway_id = self.cloud.create_internet_gateway().await?;
        self.tag(&gateway_id, &self.config.internet_gateway).await?;
        self.cloud
            .attach_internet_gateway(vpc_id, &gateway_id)
            .await?;
        info!(
            igw = gateway_id.as_str(),
            vpc = vpc_id,
            "created and attached IGW"
        );
        Ok(gateway_id)
    }

    pub async fn create_route_table(&self, vpc_id: &str) -> Result<String, Error> {
        let route_table_id = self.cloud.create_route_table(vpc_id).await?;
        self.tag(&route_table_id, &self.config.route_table).await?;
        info!(
            route_table = route_table_id.as_str(),
            vpc = vpc_id,
            "created route table"
        );
        Ok(route_table_id)
    }

    /// Routes all traffic through the gateway, associates the route table with the subnet, and
    /// enables public IP assignment on the subnet
    pub async fn create_route(
        &self,
        gateway_id: &str,
        route_table_id: &str,
        subnet_id: &str,
    ) -> Result<bool, Error> {
        let created = self
            .cloud
            .create_route(route_table_id, DEFAULT_ROUTE_CIDR, gateway_id)
            .await?;
        let association_id = self
            .cloud
            .associate_route_table(route_table_id, subnet_id)
            .await?;
        self.cloud.enable_public_ip_on_launch(subnet_id).await?;
        info!(
            route_table = route_table_id,
            igw = gateway_id,
            subnet = subnet_id,
            association = association_id.as_str(),
            "created default route"
        );
        Ok(created)
    }

    /// Creates a security group using `name` as its name, description, and tag
    pub async fn create_security_group(&self, vpc_id: &str, name: &str) -> Result<String, Error> {
        let group_id = self.cloud.create_security_group(vpc_id, name, name).await?;
        self.tag(&group_id, name).await?;
        info!(sg = group_id.as_str(), vpc = vpc_id, "created security group");
        Ok(group_id)
    }

    /// Creates a key pair and writes its private key to a file named after the key
    pub async fn create_key_pair(&self, name: &str) -> Result<String, Error> {
        let key_pair = self.cloud.create_key_pair(name).await?;
        let path = self.config.key_path(&key_pair.name);
        write_private(&path, &key_pair.material)?;
        self.tag(&key_pair.id, &self.config.key_pair.tag).await?;
        info!(key = key_pair.name.as_str(), path = ?path, "created key pair");
        Ok(key_pair.name)
    }

    /// Opens `port` on the security group to the caller's public IP and returns the rule ID
    pub async fn authorize_inbound(
        &self,
        security_group_id: &str,
        port: u16,
    ) -> Result<String, Error> {
        let ip = parse_public_ip(&self.lookup.public_ip().await?)?;
        info!(ip = %ip, "recovered public IP");
        let rule = IngressRule {
            protocol: INGRESS_PROTOCOL.to_string(),
            from_port: port.into(),
            to_port: port.into(),
            cidr: exact_cidr(&ip.to_string()),
            description: self.config.ssh.description.clone(),
        };
        let rule_ids = self.cloud.authorize_ingress(security_group_id, &rule).await?;
        let Some(rule_id) = rule_ids.into_iter().next() else {
            return Err(Error::MissingField {
                operation: "AuthorizeSecurityGroupIngress",
                field: "SecurityGroupRules",
            });
        };
        self.tag(&rule_id, &self.config.ssh.name).await?;
        info!(
            sg = security_group_id,
            rule = rule_id.as_str(),
            cidr = rule.cidr.as_str(),
            port,
            "authorized inbound rule"
        );
        Ok(rule_id)
    }

    /// Launches a single instance reachable over SSH from the caller's public IP
    ///
    /// Returns the instance ID along with the security group it was launched into.
    pub async fn create_instance(
        &self,
        subnet_id: &str,
        security_group_id: &str,
        key_name: &str,
    ) -> Result<(String, String), Error> {
        self.cloud.enable_public_ip_on_launch(subnet_id).await?;
        let instance = &self.config.instance;
        let request = InstanceRequest {
            image_id: instance.image_id.clone(),
            instance_type: instance.instance_type.clone(),
            subnet_id: subnet_id.to_string(),
            security_group_id: security_group_id.to_string(),
            key_name: key_name.to_string(),
            min_count: 1,
            max_count: 1,
        };
        let instance_id = self.cloud.run_instance(&request).await?;
        info!(
            instance = instance_id.as_str(),
            image = request.image_id.as_str(),
            instance_type = request.instance_type.as_str(),
            subnet = subnet_id,
            "launched instance"
        );
        self.authorize_inbound(security_group_id, self.config.ssh.port)
            .await?;
        self.tag(&instance_id, &instance.name).await?;
        Ok((instance_id, security_group_id.to_string()))
    }

    /// Creates every resource in order, appending identifiers to `record` as they are created
    pub async fn create_infra(&self, record: &mut Record) -> Result<Infrastructure, Error> {
        let vpc_id = self.create_vpc().await?;
        record.write("vpc_id", &vpc_id)?;

        let private_subnet_ids = self.create_private_subnets(&vpc_id).await?;
        record.write("private_subnet_id_list", format!("{private_subnet_ids:?}"))?;

        let public_subnet_id = self.create_public_subnet(&vpc_id).await?;
        record.write("public_subnet_id", &public_subnet_id)?;

        let internet_gateway_id = self.create_internet_gateway(&vpc_id).await?;
        record.write("internet_gateway_id", &internet_gateway_id)?;

        let route_table_id = self.create_route_table(&vpc_id).await?;
        record.write("route_table_id", &route_table_id)?;

        let route_created = self
            .create_route(&internet_gateway_id, &route_table_id, &public_subnet_id)
            .await?;
        record.write("create_route", route_created)?;

        let security_group_id = self
            .create_security_group(&vpc_id, &self.config.security_group)
            .await?;
        record.write("security_group_id", &security_group_id)?;

        let key_name = self.create_key_pair(&self.config.key_pair.name).await?;
        record.write("key_name", &key_name)?;

        let (instance_id, security_group_id) = self
            .launch(&public_subnet_id, &security_group_id, &key_name, record)
            .await?;

        let infrastructure = Infrastructure {
            vpc_id,
            private_subnet_ids,
            public_subnet_id,
            internet_gateway_id,
            route_table_id,
            route_created,
            security_group_id,
            key_name,
            instance_id,
        };
        info!(?infrastructure, "created infrastructure");
        Ok(infrastructure)
    }

    /// Creates only the instance, against existing subnet, security group, and key pair
    pub async fn launch(
        &self,
        subnet_id: &str,
        security_group_id: &str,
        key_name: &str,
        record: &mut Record,
    ) -> Result<(String, String), Error> {
        let (instance_id, security_group_id) = self
            .create_instance(subnet_id, security_group_id, key_name)
            .await?;
        record.write("instance_id", &instance_id)?;
        record.write("security_group_id", &security_group_id)?;
        Ok((instance_id, security_group_id))
    }
}

/// Writes `contents` to a file readable only by the current user
fn write_private(path: &Path, contents: &str) -> Result<(), Error> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;

    // The creation mode is ignored when the file already exists
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(0o600))?;
    }
    file.write_all(contents.as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{self, Call};
    use std::path::PathBuf;

    const IP: &str = "203.0.113.10";

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir()
            .join(format!("provisioner_driver_tests_{}", std::process::id()))
            .join(name);
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn driver(cloud: &mocks::Cloud, dir: &Path) -> Driver<mocks::Cloud, mocks::IpLookup> {
        let mut config = Config::default();
        config.owner = "ops".to_string();
        config.key_pair.directory = dir.to_path_buf();
        config.output = dir.join("test.txt");
        Driver::new(cloud.clone(), mocks::IpLookup::new(IP), config)
    }

    fn tags(resource_id: &str, name: &str) -> Call {
        Call::CreateTags {
            resource_id: resource_id.to_string(),
            tags: vec![
                ("Name".to_string(), name.to_string()),
                ("Owner".to_string(), "ops".to_string()),
            ],
        }
    }

    #[tokio::test]
    async fn test_create_vpc() {
        let dir = scratch("create_vpc");
        let cloud = mocks::Cloud::new();
        let vpc_id = driver(&cloud, &dir).create_vpc().await.unwrap();
        assert_eq!(
            cloud.calls(),
            vec![
                Call::CreateVpc {
                    cidr: "10.0.0.0/16".to_string()
                },
                tags(&vpc_id, "test-vpc"),
            ]
        );
    }

    #[tokio::test]
    async fn test_create_private_subnets() {
        let dir = scratch("private_subnets");
        let cloud = mocks::Cloud::new();
        let ids = driver(&cloud, &dir)
            .create_private_subnets("vpc-1")
            .await
            .unwrap();
        assert_eq!(ids.len(), 2);
        assert_eq!(
            cloud.calls(),
            vec![
                Call::CreateSubnet {
                    vpc_id: "vpc-1".to_string(),
                    zone: "ap-northeast-1a".to_string(),
                    cidr: "10.0.2.0/24".to_string(),
                },
                tags(&ids[0], "private_subnet_1a"),
                Call::CreateSubnet {
                    vpc_id: "vpc-1".to_string(),
                    zone: "ap-northeast-1c".to_string(),
                    cidr: "10.0.20.0/24".to_string(),
                },
                tags(&ids[1], "private_subnet_1c"),
            ]
        );
    }

    #[tokio::test]
    async fn test_create_public_subnet() {
        let dir = scratch("public_subnet");
        let cloud = mocks::Cloud::new();
        let id = driver(&cloud, &dir)
            .create_public_subnet("vpc-1")
            .await
            .unwrap();
        assert_eq!(
            cloud.calls(),
            vec![
                Call::CreateSubnet {
                    vpc_id: "vpc-1".to_string(),
                    zone: "ap-northeast-1a".to_string(),
                    cidr: "10.0.1.0/24".to_string(),
                },
                tags(&id, "public_subnet_1a"),
            ]
        );
    }

    #[tokio::test]
    async fn test_create_internet_gateway_attaches() {
        let dir = scratch("igw");
        let cloud = mocks::Cloud::new();
        let igw = driver(&cloud, &dir)
            .create_internet_gateway("vpc-1")
            .await
            .unwrap();
        assert_eq!(
            cloud.calls(),
            vec![
                Call::CreateInternetGateway,
                tags(&igw, "test-igw"),
                Call::AttachInternetGateway {
                    vpc_id: "vpc-1".to_string(),
                    gateway_id: igw.clone(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_create_route() {
        let dir = scratch("route");
        let cloud = mocks::Cloud::new();
        let created = driver(&cloud, &dir)
            .create_route("igw-1", "rtb-1", "subnet-1")
            .await
            .unwrap();
        assert!(created);
        assert_eq!(
            cloud.calls(),
            vec![
                Call::CreateRoute {
                    route_table_id: "rtb-1".to_string(),
                    destination: "0.0.0.0/0".to_string(),
                    gateway_id: "igw-1".to_string(),
                },
                Call::AssociateRouteTable {
                    route_table_id: "rtb-1".to_string(),
                    subnet_id: "subnet-1".to_string(),
                },
                Call::EnablePublicIpOnLaunch {
                    subnet_id: "subnet-1".to_string(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_create_security_group() {
        let dir = scratch("security_group");
        let cloud = mocks::Cloud::new();
        let sg = driver(&cloud, &dir)
            .create_security_group("vpc-1", "web")
            .await
            .unwrap();
        assert_eq!(
            cloud.calls(),
            vec![
                Call::CreateSecurityGroup {
                    vpc_id: "vpc-1".to_string(),
                    name: "web".to_string(),
                    description: "web".to_string(),
                },
                tags(&sg, "web"),
            ]
        );
    }

    #[tokio::test]
    async fn test_create_key_pair_writes_material() {
        let dir = scratch("key_pair");
        let cloud = mocks::Cloud::new();
        let name = driver(&cloud, &dir)
            .create_key_pair("test-key.pem")
            .await
            .unwrap();
        assert_eq!(name, "test-key.pem");

        // The file holds exactly what the provider returned
        let calls = cloud.calls();
        let Call::CreateTags { resource_id, .. } = &calls[1] else {
            panic!("expected tag call, got {:?}", calls[1]);
        };
        let expected = format!(
            "{}-{resource_id}\n-----END RSA PRIVATE KEY-----",
            mocks::KEY_MATERIAL
        );
        assert_eq!(fs::read_to_string(dir.join(&name)).unwrap(), expected);
        assert_eq!(calls[1], tags(resource_id, "test-key-pair"));

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(dir.join(&name)).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_create_key_pair_replaces_readable_file() {
        use std::os::unix::fs::PermissionsExt;

        let dir = scratch("key_pair_existing");
        let path = dir.join("test-key.pem");
        fs::write(&path, "stale key material that is longer than the new key").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

        let cloud = mocks::Cloud::new();
        driver(&cloud, &dir)
            .create_key_pair("test-key.pem")
            .await
            .unwrap();
        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with(mocks::KEY_MATERIAL));
        assert!(contents.ends_with("-----END RSA PRIVATE KEY-----"));
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[tokio::test]
    async fn test_create_instance() {
        let dir = scratch("instance");
        let cloud = mocks::Cloud::new();
        let (instance_id, sg) = driver(&cloud, &dir)
            .create_instance("subnet-1", "sg-1", "test-key.pem")
            .await
            .unwrap();
        assert_eq!(sg, "sg-1");

        let calls = cloud.calls();
        let Call::CreateTags {
            resource_id: rule_id,
            ..
        } = &calls[3]
        else {
            panic!("expected tag call, got {:?}", calls[3]);
        };
        assert_eq!(
            calls,
            vec![
                Call::EnablePublicIpOnLaunch {
                    subnet_id: "subnet-1".to_string(),
                },
                Call::RunInstance(InstanceRequest {
                    image_id: "ami-04204a8960917fd92".to_string(),
                    instance_type: "t2.micro".to_string(),
                    subnet_id: "subnet-1".to_string(),
                    security_group_id: "sg-1".to_string(),
                    key_name: "test-key.pem".to_string(),
                    min_count: 1,
                    max_count: 1,
                }),
                Call::AuthorizeIngress {
                    group_id: "sg-1".to_string(),
                    rule: IngressRule {
                        protocol: "tcp".to_string(),
                        from_port: 22,
                        to_port: 22,
                        cidr: format!("{IP}/32"),
                        description: "test inbound rule".to_string(),
                    },
                },
                tags(rule_id, "test-inbound-rule-ssh"),
                tags(&instance_id, "test-web-server"),
            ]
        );
    }

    #[tokio::test]
    async fn test_authorize_inbound_cidr() {
        for (body, cidr) in [
            (" 198.51.100.4\n", "198.51.100.4/32"),
            ("192.0.2.1", "192.0.2.1/32"),
        ] {
            let cloud = mocks::Cloud::new();
            let lookup = mocks::IpLookup::new(body);
            let driver = Driver::new(cloud.clone(), lookup, Config::default());
            let rule_id = driver.authorize_inbound("sg-1", 22).await.unwrap();
            let calls = cloud.calls();
            let Call::AuthorizeIngress { rule, .. } = &calls[0] else {
                panic!("expected ingress call, got {:?}", calls[0]);
            };
            assert_eq!(rule.cidr, cidr);
            assert!(matches!(
                &calls[1],
                Call::CreateTags { resource_id, .. } if *resource_id == rule_id
            ));
        }
    }

    #[tokio::test]
    async fn test_authorize_inbound_rejects_ipv6() {
        let cloud = mocks::Cloud::new();
        let driver = Driver::new(
            cloud.clone(),
            mocks::IpLookup::new("2001:db8::1"),
            Config::default(),
        );
        let err = driver.authorize_inbound("sg-1", 22).await.unwrap_err();
        assert!(matches!(err, Error::InvalidPublicIp(_)));
        assert!(cloud.calls().is_empty());
    }

    #[tokio::test]
    async fn test_authorize_inbound_missing_rule_id() {
        let cloud = mocks::Cloud::without_rule_ids();
        let driver = Driver::new(cloud.clone(), mocks::IpLookup::new(IP), Config::default());
        let err = driver.authorize_inbound("sg-1", 22).await.unwrap_err();
        assert!(matches!(
            err,
            Error::MissingField {
                operation: "AuthorizeSecurityGroupIngress",
                field: "SecurityGroupRules",
            }
        ));

        // Nothing is tagged once the rule ID is missing
        let operations: Vec<&str> = cloud.calls().iter().map(Call::operation).collect();
        assert_eq!(operations, ["authorize_ingress"]);
    }
}
