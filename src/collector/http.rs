//! HTTP plumbing shared by the built-in collectors.
//!
//! - [`HttpTarget`]: address and credentials, flattened into each collector's options
//! - [`HttpSource`]: client bound to one target, fetching a body per pass

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::collector::{CollectorError, Deadline};

/// Where and how to fetch readings.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HttpTarget {
    /// Host, optional port and path, without scheme (e.g. `10.0.0.7/temp`).
    #[serde(default)]
    pub address: String,
    /// Use plain `http` instead of `https`.
    #[serde(default)]
    pub insecure: bool,
    /// Basic auth user. Only sent together with a password.
    #[serde(default)]
    pub username: String,
    /// Basic auth password.
    #[serde(default)]
    pub password: String,
}

impl HttpTarget {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Self::default()
        }
    }

    pub fn with_insecure(mut self, insecure: bool) -> Self {
        self.insecure = insecure;
        self
    }

    pub fn with_basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    /// Full URL of the target.
    pub fn url(&self) -> String {
        let scheme = if self.insecure { "http" } else { "https" };
        format!("{}://{}", scheme, self.address)
    }

    /// Problems with the target; empty when valid.
    pub fn validate(&self) -> Vec<String> {
        if self.address.is_empty() {
            return vec!["address is required".to_string()];
        }
        match url::Url::parse(&self.url()) {
            Ok(_) => Vec::new(),
            Err(e) => vec![format!("invalid address '{}': {}", self.address, e)],
        }
    }

    fn basic_auth(&self) -> Option<(&str, &str)> {
        if self.username.is_empty() || self.password.is_empty() {
            None
        } else {
            Some((self.username.as_str(), self.password.as_str()))
        }
    }
}

impl std::fmt::Debug for HttpTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTarget")
            .field("address", &self.address)
            .field("insecure", &self.insecure)
            .field("username", &self.username)
            .field("password", &"*".repeat(self.password.len()))
            .finish()
    }
}

/// HTTP client bound to one [`HttpTarget`].
pub struct HttpSource {
    client: Client,
    url: String,
    target: HttpTarget,
}

impl HttpSource {
    /// Build a client whose requests time out after `timeout`.
    ///
    /// # Errors
    /// Returns `CollectorError::Config` if the HTTP client cannot be built.
    pub fn new(target: &HttpTarget, timeout: Duration) -> Result<Self, CollectorError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CollectorError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: target.url(),
            target: target.clone(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// GET the target and return the body of a `200 OK` response.
    ///
    /// # Errors
    /// - `CollectorError::Http` on transport failures
    /// - `CollectorError::Status` on any status other than 200
    /// - `CollectorError::Timeout` / `CollectorError::Cancelled` from `deadline`
    pub async fn fetch_text(&self, deadline: &Deadline) -> Result<String, CollectorError> {
        deadline.run(self.request()).await?
    }

    /// GET the target and decode the body as JSON.
    ///
    /// # Errors
    /// As [`HttpSource::fetch_text`], plus `CollectorError::Parse` if the
    /// body does not match `T`.
    pub async fn fetch_json<T: DeserializeOwned>(
        &self,
        deadline: &Deadline,
    ) -> Result<T, CollectorError> {
        let body = self.fetch_text(deadline).await?;
        serde_json::from_str(&body)
            .map_err(|e| CollectorError::Parse(format!("invalid JSON body: {}", e)))
    }

    async fn request(&self) -> Result<String, CollectorError> {
        let mut request = self.client.get(&self.url);
        if let Some((username, password)) = self.target.basic_auth() {
            request = request.basic_auth(username, Some(password));
        }

        let response = request.send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(CollectorError::Status(status));
        }

        Ok(response.text().await?)
    }
}

impl std::fmt::Debug for HttpSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpSource")
            .field("url", &self.url)
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_scheme() {
        assert_eq!(HttpTarget::new("10.0.0.7/temp").url(), "https://10.0.0.7/temp");
        assert_eq!(
            HttpTarget::new("10.0.0.7:8080").with_insecure(true).url(),
            "http://10.0.0.7:8080"
        );
    }

    #[test]
    fn test_validate_requires_address() {
        assert_eq!(HttpTarget::default().validate(), vec!["address is required"]);
        assert!(HttpTarget::new("sensor.lan").validate().is_empty());
    }

    #[test]
    fn test_validate_rejects_malformed_address() {
        let problems = HttpTarget::new("sensor.lan:notaport").validate();
        assert_eq!(problems.len(), 1);
        assert!(problems[0].starts_with("invalid address 'sensor.lan:notaport'"));
    }

    #[test]
    fn test_basic_auth_needs_both_parts() {
        assert!(HttpTarget::new("a").basic_auth().is_none());
        assert!(
            HttpTarget::new("a")
                .with_basic_auth("admin", "")
                .basic_auth()
                .is_none()
        );
        assert_eq!(
            HttpTarget::new("a").with_basic_auth("admin", "pw").basic_auth(),
            Some(("admin", "pw"))
        );
    }

    #[test]
    fn test_debug_masks_password() {
        let target = HttpTarget::new("a").with_basic_auth("admin", "secret");
        let debug = format!("{:?}", target);
        assert!(debug.contains("admin"));
        assert!(debug.contains("******"));
        assert!(!debug.contains("secret"));
    }

    #[tokio::test]
    async fn test_source_url() {
        let source = HttpSource::new(
            &HttpTarget::new("127.0.0.1:9/temp").with_insecure(true),
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(source.url(), "http://127.0.0.1:9/temp");
    }
}
