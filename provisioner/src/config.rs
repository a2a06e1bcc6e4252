//! Static configuration of a provisioning run.
//!
//! Every field has a default, so an empty (or absent) YAML file provisions the reference
//! network in `ap-northeast-1`.

use crate::Error;
use serde::Deserialize;
use std::{
    fs::File,
    path::{Path, PathBuf},
};

/// Static access keys used instead of the SDK's default credential chain.
#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct VpcConfig {
    pub cidr: String,
    pub name: String,
}

#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct SubnetConfig {
    pub zone: String,
    pub cidr: String,
    pub name: String,
}

#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct KeyPairConfig {
    /// Name of the key pair, also used as the file name of the private key
    pub name: String,
    /// Value of the `Name` tag on the key pair
    pub tag: String,
    /// Directory the private key is written to
    pub directory: PathBuf,
}

impl Default for KeyPairConfig {
    fn default() -> Self {
        Self {
            name: "test-key.pem".to_string(),
            tag: "test-key-pair".to_string(),
            directory: PathBuf::from("."),
        }
    }
}

#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct InstanceConfig {
    pub image_id: String,
    pub instance_type: String,
    pub name: String,
}

impl Default for InstanceConfig {
    fn default() -> Self {
        Self {
            image_id: "ami-04204a8960917fd92".to_string(),
            instance_type: "t2.micro".to_string(),
            name: "test-web-server".to_string(),
        }
    }
}

/// Inbound SSH rule opened to the caller's public IP.
#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct SshConfig {
    pub port: u16,
    pub description: String,
    /// Value of the `Name` tag on the security group rule
    pub name: String,
    /// Service returning the caller's public IPv4 as plain text
    pub lookup_url: String,
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            port: 22,
            description: "test inbound rule".to_string(),
            name: "test-inbound-rule-ssh".to_string(),
            lookup_url: "https://ipv4.icanhazip.com".to_string(),
        }
    }
}

#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub region: String,
    /// Value of the `Owner` tag on every resource
    pub owner: String,
    pub credentials: Option<Credentials>,
    pub vpc: VpcConfig,
    pub public_subnet: SubnetConfig,
    pub private_subnets: Vec<SubnetConfig>,
    pub internet_gateway: String,
    pub route_table: String,
    pub security_group: String,
    pub key_pair: KeyPairConfig,
    pub instance: InstanceConfig,
    pub ssh: SshConfig,
    /// File the identifiers of created resources are appended to
    pub output: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            region: "ap-northeast-1".to_string(),
            owner: String::new(),
            credentials: None,
            vpc: VpcConfig {
                cidr: "10.0.0.0/16".to_string(),
                name: "test-vpc".to_string(),
            },
            public_subnet: SubnetConfig {
                zone: "ap-northeast-1a".to_string(),
                cidr: "10.0.1.0/24".to_string(),
                name: "public_subnet_1a".to_string(),
            },
            private_subnets: vec![
                SubnetConfig {
                    zone: "ap-northeast-1a".to_string(),
                    cidr: "10.0.2.0/24".to_string(),
                    name: "private_subnet_1a".to_string(),
                },
                SubnetConfig {
                    zone: "ap-northeast-1c".to_string(),
                    cidr: "10.0.20.0/24".to_string(),
                    name: "private_subnet_1c".to_string(),
                },
            ],
            internet_gateway: "test-igw".to_string(),
            route_table: "test-public-route-table".to_string(),
            security_group: "test-security-group".to_string(),
            key_pair: KeyPairConfig::default(),
            instance: InstanceConfig::default(),
            ssh: SshConfig::default(),
            output: PathBuf::from("test.txt"),
        }
    }
}

impl Config {
    /// Loads configuration from a YAML file, or the defaults if no path is given
    pub fn load(path: Option<&Path>) -> Result<Self, Error> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let file = File::open(path)?;
        Ok(serde_yaml::from_reader(file)?)
    }

    /// Returns the path the private key of the configured key pair is written to
    pub fn key_path(&self, key_name: &str) -> PathBuf {
        self.key_pair.directory.join(key_name)
    }
}
