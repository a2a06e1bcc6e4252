use crate::Error;
use std::net::Ipv4Addr;

/// Destination of the route sending all traffic through the internet gateway
pub const DEFAULT_ROUTE_CIDR: &str = "0.0.0.0/0";

/// Protocol of the SSH ingress rule
pub const INGRESS_PROTOCOL: &str = "tcp";

/// Restricts a CIDR block to a single IPv4 address
pub fn exact_cidr(ip: &str) -> String {
    format!("{ip}/32")
}

/// Parses the plain-text body returned by an IP lookup service
pub fn parse_public_ip(body: &str) -> Result<Ipv4Addr, Error> {
    let trimmed = body.trim();
    trimmed
        .parse()
        .map_err(|_| Error::InvalidPublicIp(trimmed.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_exact_cidr() {
        assert_eq!(exact_cidr("203.0.113.7"), "203.0.113.7/32");
    }

    #[test]
    fn test_parse_public_ip_trims_newline() {
        let ip = parse_public_ip("198.51.100.23\n").unwrap();
        assert_eq!(ip, Ipv4Addr::new(198, 51, 100, 23));
    }

    #[test_case("2001:db8::1"; "ipv6")]
    #[test_case("<html>rate limited</html>"; "html body")]
    #[test_case(""; "empty body")]
    #[test_case("10.0.0.1/32"; "cidr")]
    fn test_parse_public_ip_rejects(body: &str) {
        let err = parse_public_ip(body).unwrap_err();
        assert!(matches!(err, Error::InvalidPublicIp(ip) if ip == body.trim()));
    }
}
