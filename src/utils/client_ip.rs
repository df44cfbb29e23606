//! 客户端身份提取
//!
//! The admission limiter keys buckets by client address. Behind a reverse
//! proxy the peer address is the proxy, so `X-Forwarded-For` is honoured
//! when the peer is private/loopback or listed in `server.trusted_proxies`.

use std::net::{IpAddr, SocketAddr};

use actix_web::http::header::HeaderMap;
use tracing::{debug, warn};

/// Identity used when no address can be determined (e.g. test requests).
pub const UNKNOWN_CLIENT: &str = "unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Cidr {
    network: IpAddr,
    prefix: u8,
}

impl Cidr {
    fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let (addr, prefix) = match raw.split_once('/') {
            Some((addr, prefix)) => (addr.parse::<IpAddr>().ok()?, prefix.parse::<u8>().ok()?),
            None => {
                let addr = raw.parse::<IpAddr>().ok()?;
                let full = if addr.is_ipv4() { 32 } else { 128 };
                (addr, full)
            }
        };
        let max = if addr.is_ipv4() { 32 } else { 128 };
        (prefix <= max).then_some(Self {
            network: addr,
            prefix,
        })
    }

    fn contains(&self, ip: &IpAddr) -> bool {
        match (self.network, ip) {
            (IpAddr::V4(net), IpAddr::V4(ip)) => {
                let mask = u32::MAX.checked_shl(32 - self.prefix as u32).unwrap_or(0);
                (u32::from(net) & mask) == (u32::from(*ip) & mask)
            }
            (IpAddr::V6(net), IpAddr::V6(ip)) => {
                let mask = u128::MAX.checked_shl(128 - self.prefix as u32).unwrap_or(0);
                (u128::from(net) & mask) == (u128::from(*ip) & mask)
            }
            _ => false,
        }
    }
}

/// Parsed `server.trusted_proxies`, built once at startup.
#[derive(Debug, Clone, Default)]
pub struct TrustedProxies {
    ranges: Vec<Cidr>,
}

impl TrustedProxies {
    pub fn new(entries: &[String]) -> Self {
        let ranges = entries
            .iter()
            .filter_map(|entry| {
                let parsed = Cidr::parse(entry);
                if parsed.is_none() {
                    warn!("Ignoring invalid trusted proxy entry '{}'", entry);
                }
                parsed
            })
            .collect();
        Self { ranges }
    }

    pub fn contains(&self, ip: &IpAddr) -> bool {
        self.ranges.iter().any(|range| range.contains(ip))
    }
}

/// 检查 IP 是否为私有地址或 localhost
pub fn is_private_or_local(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_private() || v4.is_loopback(),
        IpAddr::V6(v6) => {
            v6.is_loopback()
                || (v6.segments()[0] & 0xfe00) == 0xfc00 // fc00::/7
                || (v6.segments()[0] & 0xffc0) == 0xfe80 // fe80::/10
        }
    }
}

fn parse_peer(peer: &str) -> Option<IpAddr> {
    peer.parse::<SocketAddr>()
        .map(|s| s.ip())
        .or_else(|_| peer.parse::<IpAddr>())
        .ok()
}

/// First hop of `X-Forwarded-For`, else `X-Real-IP`.
pub fn forwarded_client(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|h| h.to_str().ok())
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        })
}

/// Resolve the limiter identity for a request.
///
/// `peer` is the raw socket peer (`ip` or `ip:port`). Forwarded headers from
/// public peers that are not explicitly trusted are ignored so clients
/// cannot pick their own bucket.
pub fn client_identity(peer: Option<&str>, headers: &HeaderMap, trusted: &TrustedProxies) -> String {
    let Some(peer) = peer else {
        return forwarded_client(headers).unwrap_or_else(|| UNKNOWN_CLIENT.to_string());
    };
    let Some(peer_ip) = parse_peer(peer) else {
        return peer.to_string();
    };

    if (trusted.contains(&peer_ip) || is_private_or_local(&peer_ip))
        && let Some(forwarded) = forwarded_client(headers)
    {
        debug!("Client {} forwarded by proxy {}", forwarded, peer_ip);
        return forwarded;
    }

    peer_ip.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::header::{HeaderName, HeaderValue};

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (k, v) in pairs {
            map.insert(HeaderName::from_static(k), HeaderValue::from_static(v));
        }
        map
    }

    #[test]
    fn test_is_private_or_local() {
        assert!(is_private_or_local(&"10.0.0.1".parse().unwrap()));
        assert!(is_private_or_local(&"192.168.1.1".parse().unwrap()));
        assert!(is_private_or_local(&"127.0.0.1".parse().unwrap()));
        assert!(is_private_or_local(&"::1".parse().unwrap()));
        assert!(is_private_or_local(&"fd00::1".parse().unwrap()));
        assert!(is_private_or_local(&"fe80::1".parse().unwrap()));
        assert!(!is_private_or_local(&"8.8.8.8".parse().unwrap()));
        assert!(!is_private_or_local(&"2001:4860:4860::8888".parse().unwrap()));
    }

    #[test]
    fn test_trusted_proxies_cidr_and_single() {
        let trusted = TrustedProxies::new(&[
            "203.0.113.0/24".to_string(),
            "198.51.100.7".to_string(),
            "2001:db8::/32".to_string(),
            "not-an-ip".to_string(),
        ]);
        assert!(trusted.contains(&"203.0.113.99".parse().unwrap()));
        assert!(trusted.contains(&"198.51.100.7".parse().unwrap()));
        assert!(!trusted.contains(&"198.51.100.8".parse().unwrap()));
        assert!(trusted.contains(&"2001:db8::1".parse().unwrap()));
        assert!(!trusted.contains(&"2001:db9::1".parse().unwrap()));
    }

    #[test]
    fn test_public_peer_ignores_forwarded_header() {
        let h = headers(&[("x-forwarded-for", "1.2.3.4")]);
        let id = client_identity(Some("8.8.8.8:5555"), &h, &TrustedProxies::default());
        assert_eq!(id, "8.8.8.8");
    }

    #[test]
    fn test_private_peer_uses_first_forwarded_hop() {
        let h = headers(&[("x-forwarded-for", "1.2.3.4, 10.0.0.2")]);
        let id = client_identity(Some("127.0.0.1:5555"), &h, &TrustedProxies::default());
        assert_eq!(id, "1.2.3.4");
    }

    #[test]
    fn test_trusted_public_proxy_uses_real_ip_header() {
        let h = headers(&[("x-real-ip", "5.6.7.8")]);
        let trusted = TrustedProxies::new(&["203.0.113.0/24".to_string()]);
        assert_eq!(client_identity(Some("203.0.113.5"), &h, &trusted), "5.6.7.8");
    }

    #[test]
    fn test_missing_peer() {
        let id = client_identity(None, &HeaderMap::new(), &TrustedProxies::default());
        assert_eq!(id, UNKNOWN_CLIENT);
    }
}
