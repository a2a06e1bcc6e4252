//! `create` subcommand for `aws`

use crate::{aws::connect, Config, Error, Record};
use std::path::PathBuf;
use tracing::info;

/// Creates the VPC, subnets, gateway, route, security group, key pair, and instance
pub async fn create(config: Option<&PathBuf>) -> Result<(), Error> {
    // Load configuration (defaults if no file is given)
    let config = Config::load(config.map(PathBuf::as_path))?;
    info!(region = config.region.as_str(), "loaded configuration");

    // Open the record before issuing any call so every identifier lands somewhere
    let mut record = Record::open(&config.output)?;
    let driver = connect(config).await;

    let infrastructure = driver.create_infra(&mut record).await?;
    info!(
        instance = infrastructure.instance_id.as_str(),
        path = ?record.path(),
        "recorded created resources"
    );
    Ok(())
}
