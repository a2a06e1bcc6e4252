//! Provision resources against AWS.

use crate::{Config, Driver};
use tracing::info;

mod create;
pub use create::create;
pub mod ec2;
mod launch;
pub use launch::launch;
pub mod utils;

pub const CMD: &str = "aws";
pub const CREATE_CMD: &str = "create";
pub const LAUNCH_CMD: &str = "launch";

/// Builds a [Driver] issuing calls against the configured region
pub async fn connect(config: Config) -> Driver<ec2::Ec2, utils::PublicIp> {
    let client = ec2::create_client(
        ec2::Region::new(config.region.clone()),
        config.credentials.as_ref(),
    )
    .await;
    info!(region = config.region.as_str(), "created EC2 client");
    let lookup = utils::PublicIp::new(&config.ssh.lookup_url);
    Driver::new(ec2::Ec2::new(client), lookup, config)
}
