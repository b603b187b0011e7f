//! Rate-limit subject extraction

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;

const FORWARDED_FOR: &str = "x-forwarded-for";

/// Identifies a client for rate limiting.
///
/// First entry of `X-Forwarded-For`, else the peer IP, else `"unknown"`.
/// Not validated as an address; it is only a map key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientKey(pub String);

impl ClientKey {
    pub const UNKNOWN: &'static str = "unknown";

    pub fn from_parts(parts: &Parts) -> Self {
        let forwarded = parts
            .headers
            .get(FORWARDED_FOR)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());

        if let Some(first) = forwarded {
            return Self(first.to_string());
        }

        match parts.extensions.get::<ConnectInfo<SocketAddr>>() {
            Some(ConnectInfo(addr)) => Self(addr.ip().to_string()),
            None => Self(Self::UNKNOWN.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ClientKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for ClientKey
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_parts(parts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(builder: axum::http::request::Builder) -> Parts {
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_forwarded_for_first_entry() {
        let p = parts(Request::builder().header("X-Forwarded-For", " 10.0.0.1 , 172.16.0.2"));
        assert_eq!(ClientKey::from_parts(&p).as_str(), "10.0.0.1");
    }

    #[test]
    fn test_peer_address_fallback() {
        let mut p = parts(Request::builder());
        p.extensions
            .insert(ConnectInfo(SocketAddr::from(([192, 168, 1, 7], 51234))));
        assert_eq!(ClientKey::from_parts(&p).as_str(), "192.168.1.7");
    }

    #[test]
    fn test_empty_forwarded_for_falls_through() {
        let p = parts(Request::builder().header("X-Forwarded-For", ""));
        assert_eq!(ClientKey::from_parts(&p).as_str(), ClientKey::UNKNOWN);
    }
}
