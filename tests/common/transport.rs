//! In-memory request and response for the framework-facing flows.

use std::collections::HashMap;

use sessionkit::http::{SessionRequest, SessionResponse, SetCookie};

#[derive(Debug, Default)]
pub struct TestRequest {
    pub cookies: HashMap<String, String>,
    pub headers: HashMap<String, String>,
}

impl TestRequest {
    #[must_use]
    pub fn with_cookie(mut self, name: &str, value: &str) -> Self {
        self.cookies.insert(name.to_string(), value.to_string());
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers
            .insert(name.to_ascii_lowercase(), value.to_string());
        self
    }
}

impl SessionRequest for TestRequest {
    fn cookie(&self, name: &str) -> Option<String> {
        self.cookies.get(name).cloned()
    }

    fn header(&self, name: &str) -> Option<String> {
        self.headers.get(&name.to_ascii_lowercase()).cloned()
    }
}

#[derive(Debug, Default)]
pub struct TestResponse {
    pub cookies: Vec<SetCookie>,
    pub headers: HashMap<String, String>,
}

impl TestResponse {
    /// The last cookie set under `name`.
    #[must_use]
    pub fn cookie(&self, name: &str) -> Option<&SetCookie> {
        self.cookies.iter().rev().find(|cookie| cookie.name == name)
    }
}

impl SessionResponse for TestResponse {
    fn set_cookie(&mut self, cookie: SetCookie) {
        self.cookies.push(cookie);
    }

    fn header(&self, name: &str) -> Option<String> {
        self.headers.get(&name.to_ascii_lowercase()).cloned()
    }

    fn set_header(&mut self, name: &str, value: String) {
        self.headers.insert(name.to_ascii_lowercase(), value);
    }
}
