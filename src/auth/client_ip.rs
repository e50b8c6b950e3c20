use axum::http::HeaderMap;
use std::net::SocketAddr;

pub const FORWARDED_FOR: &str = "x-forwarded-for";

/// Originating client address of a request.
///
/// `X-Forwarded-For` is only trusted when the peer is a loopback proxy; its
/// first entry is used. Otherwise the peer IP is returned without its port.
#[must_use]
pub fn client_ip(headers: &HeaderMap, peer: SocketAddr) -> String {
    let peer_ip = peer.ip().to_canonical();
    if peer_ip.is_loopback() {
        let forwarded = headers
            .get(FORWARDED_FOR)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|value| !value.is_empty());
        if let Some(forwarded) = forwarded {
            return forwarded.to_string();
        }
    }
    peer_ip.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn forwarded(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(FORWARDED_FOR, HeaderValue::from_static(value));
        headers
    }

    fn peer(addr: &str) -> SocketAddr {
        addr.parse().unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], 0)))
    }

    #[test]
    fn peer_address_without_port() {
        let ip = client_ip(&HeaderMap::new(), peer("11.11.11.11:43210"));
        assert_eq!(ip, "11.11.11.11");
    }

    #[test]
    fn forwarded_for_trusted_from_loopback() {
        let headers = forwarded("22.22.22.22, 10.0.0.1");
        assert_eq!(client_ip(&headers, peer("127.0.0.1:5000")), "22.22.22.22");
        assert_eq!(client_ip(&headers, peer("[::1]:5000")), "22.22.22.22");
    }

    #[test]
    fn forwarded_for_ignored_from_other_peers() {
        let headers = forwarded("22.22.22.22");
        assert_eq!(client_ip(&headers, peer("33.33.33.33:5000")), "33.33.33.33");
    }

    #[test]
    fn empty_forwarded_for_falls_back_to_peer() {
        let headers = forwarded(" , 22.22.22.22");
        assert_eq!(client_ip(&headers, peer("127.0.0.1:5000")), "127.0.0.1");
    }

    #[test]
    fn ipv4_mapped_peer_is_canonicalised() {
        let ip = client_ip(&HeaderMap::new(), peer("[::ffff:11.11.11.11]:8080"));
        assert_eq!(ip, "11.11.11.11");

        let headers = forwarded("22.22.22.22");
        assert_eq!(
            client_ip(&headers, peer("[::ffff:127.0.0.1]:8080")),
            "22.22.22.22"
        );
    }
}
