use axum::http::{HeaderMap, Request, StatusCode};
use ipnetwork::IpNetwork;
use opentelemetry::{KeyValue, global, metrics::Counter};
use std::net::IpAddr;
use tower_governor::GovernorError;
use tower_governor::key_extractor::KeyExtractor;

#[derive(Clone, Debug)]
pub struct Metrics {
    pub admissions_total: Counter<u64>,
}

impl Metrics {
    #[must_use]
    pub fn new() -> Self {
        let meter = global::meter("haven-relay");
        Self {
            admissions_total: meter
                .u64_counter("haven_relay_admissions_total")
                .with_description("Relay requests admitted or throttled by the per-client limiter, by route")
                .build(),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of the per-client limiter for one relay request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Admission {
    Admitted,
    Throttled,
}

impl Admission {
    #[must_use]
    pub fn from_status(status: StatusCode) -> Self {
        if status == StatusCode::TOO_MANY_REQUESTS { Self::Throttled } else { Self::Admitted }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admitted => "admitted",
            Self::Throttled => "throttled",
        }
    }
}

/// Buckets relay clients by address. A forwarded address is believed only when the socket peer
/// is one of our own proxies.
#[derive(Clone, Debug)]
pub struct ClientAddressKey {
    proxies: Vec<IpNetwork>,
}

impl ClientAddressKey {
    #[must_use]
    pub const fn new(proxies: Vec<IpNetwork>) -> Self {
        Self { proxies }
    }

    /// Resolves the address a relay client is limited under.
    #[must_use]
    pub fn client_address(&self, headers: &HeaderMap, peer: IpAddr) -> IpAddr {
        if !self.is_proxy(peer) {
            return peer;
        }

        // Walk the hops from the nearest proxy outwards; the first address we don't operate is the client.
        headers
            .get("x-forwarded-for")
            .and_then(|value| value.to_str().ok())
            .and_then(|chain| {
                chain.rsplit(',').filter_map(|hop| hop.trim().parse::<IpAddr>().ok()).find(|ip| !self.is_proxy(*ip))
            })
            .unwrap_or(peer)
    }

    fn is_proxy(&self, ip: IpAddr) -> bool {
        self.proxies.iter().any(|net| net.contains(ip))
    }
}

impl KeyExtractor for ClientAddressKey {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        use axum::extract::ConnectInfo;
        use std::net::SocketAddr;

        let peer = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip())
            .ok_or(GovernorError::UnableToExtractKey)?;

        Ok(self.client_address(req.headers(), peer))
    }
}

#[derive(Clone, Debug)]
pub struct RateLimitService {
    pub key: ClientAddressKey,
    pub metrics: Metrics,
}

impl RateLimitService {
    #[must_use]
    pub fn new(trusted_proxies: Vec<IpNetwork>) -> Self {
        Self { key: ClientAddressKey::new(trusted_proxies), metrics: Metrics::new() }
    }

    /// Counts the limiter's verdict for `route` and warns when a relay client was turned away.
    pub fn record(&self, route: &str, status: StatusCode, retry_after: Option<&str>) -> Admission {
        let admission = Admission::from_status(status);
        if admission == Admission::Throttled {
            tracing::warn!(
                route,
                retry_after_secs = retry_after.unwrap_or("unknown"),
                "Relay client throttled"
            );
        }

        self.metrics
            .admissions_total
            .add(1, &[KeyValue::new("route", route.to_owned()), KeyValue::new("outcome", admission.as_str())]);
        admission
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> ClientAddressKey {
        ClientAddressKey::new(vec!["10.0.0.0/8".parse().unwrap(), "127.0.0.1/32".parse().unwrap()])
    }

    #[test]
    fn test_direct_client_cannot_spoof_forwarded_address() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "1.2.3.4".parse().unwrap());
        let peer: IpAddr = "8.8.8.8".parse().unwrap();
        assert_eq!(key().client_address(&headers, peer), peer);
    }

    #[test]
    fn test_proxied_client_is_first_hop_we_do_not_operate() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "1.2.3.4, 5.6.7.8, 10.0.0.2".parse().unwrap());
        let peer: IpAddr = "127.0.0.1".parse().unwrap();
        assert_eq!(key().client_address(&headers, peer), "5.6.7.8".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_proxy_without_forwarded_header_is_the_client() {
        let peer: IpAddr = "10.1.2.3".parse().unwrap();
        assert_eq!(key().client_address(&HeaderMap::new(), peer), peer);
    }

    #[test]
    fn test_record_classifies_verdicts() {
        let service = RateLimitService::new(Vec::new());
        assert_eq!(service.record("/messages", StatusCode::CREATED, None), Admission::Admitted);
        assert_eq!(service.record("/messages/{roomId}", StatusCode::BAD_REQUEST, None), Admission::Admitted);
        assert_eq!(service.record("/rooms", StatusCode::TOO_MANY_REQUESTS, Some("1")), Admission::Throttled);
    }
}
