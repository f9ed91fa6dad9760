//! Transport contract for web frameworks.
//!
//! The crate never touches a framework type: adapters implement
//! [`SessionRequest`] and [`SessionResponse`] over their own request and
//! response objects. Cookie value encoding and `Set-Cookie` serialization stay
//! on the adapter side.

pub mod cookies;
mod flow;

use std::time::Duration;

/// Read side of an incoming request.
pub trait SessionRequest {
    /// Decoded value of the named cookie.
    fn cookie(&self, name: &str) -> Option<String>;

    fn header(&self, name: &str) -> Option<String>;
}

/// Write side of an outgoing response.
pub trait SessionResponse {
    fn set_cookie(&mut self, cookie: SetCookie);

    /// Current value of a header already set on the response.
    fn header(&self, name: &str) -> Option<String>;

    /// Set a header, replacing any previous value.
    fn set_header(&mut self, name: &str, value: String);

    /// Append to a list-valued header (`, ` separated).
    fn append_header(&mut self, name: &str, value: &str) {
        let value = match self.header(name) {
            Some(existing) if !existing.is_empty() => format!("{existing}, {value}"),
            _ => value.to_string(),
        };
        self.set_header(name, value);
    }
}

/// A cookie to set on the response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetCookie {
    pub name: String,
    pub value: String,
    pub max_age: Duration,
    pub path: String,
    pub domain: Option<String>,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: String,
}


#[cfg(test)]
mod tests {
    use super::testing::FakeResponse;
    use super::*;

    #[test]
    fn test_append_header() {
        let mut response = FakeResponse::default();
        response.append_header("Access-Control-Expose-Headers", "anti-csrf");
        response.append_header("Access-Control-Expose-Headers", "id-refresh-token");
        assert_eq!(
            response.header("Access-Control-Expose-Headers").as_deref(),
            Some("anti-csrf, id-refresh-token")
        );
    }
}
