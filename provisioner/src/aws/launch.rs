//! `launch` subcommand for `aws`

use crate::{aws::connect, Config, Error, Record};
use std::path::PathBuf;
use tracing::info;

/// Launches an instance into an existing subnet and security group
///
/// When `key_name` is not provided, the configured key pair name is used.
pub async fn launch(
    config: Option<&PathBuf>,
    subnet_id: &str,
    security_group_id: &str,
    key_name: Option<&str>,
) -> Result<(), Error> {
    let config = Config::load(config.map(PathBuf::as_path))?;
    info!(region = config.region.as_str(), "loaded configuration");
    let key_name = key_name.unwrap_or(config.key_pair.name.as_str()).to_string();

    let mut record = Record::open(&config.output)?;
    let driver = connect(config).await;

    let (instance_id, _) = driver
        .launch(subnet_id, security_group_id, &key_name, &mut record)
        .await?;
    info!(
        instance = instance_id.as_str(),
        path = ?record.path(),
        "recorded created resources"
    );
    Ok(())
}
