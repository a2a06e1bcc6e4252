use crate::{Error, IpLookup};
use tracing::debug;

/// Fetch the public IPv4 address of a machine from a plain-text lookup service
pub async fn get_public_ip(url: &str) -> Result<String, Error> {
    let result = reqwest::get(url)
        .await?
        .error_for_status()?
        .text()
        .await?
        .trim()
        .to_string();
    debug!(url, ip = result.as_str(), "fetched public IP");
    Ok(result)
}

/// [IpLookup] that queries an HTTP service for the caller's address.
#[derive(Clone)]
pub struct PublicIp {
    url: String,
}

impl PublicIp {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
        }
    }
}

impl IpLookup for PublicIp {
    async fn public_ip(&self) -> Result<String, Error> {
        get_public_ip(&self.url).await
    }
}
