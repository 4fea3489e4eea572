//! Backend location.
//!
//! Resolves the single upstream base URL. The configured value and the
//! fallback are injected at construction, so resolution never touches the
//! process environment.

use url::Url;

use crate::config::BackendConfig;
use crate::error::ProxyError;

/// Resolves the upstream base URL for each request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendLocator {
    configured: Option<Url>,
    fallback: Option<Url>,
}

impl BackendLocator {
    /// Create a locator from an optional configured URL and an optional fallback.
    pub fn new(configured: Option<Url>, fallback: Option<Url>) -> Self {
        Self {
            configured,
            fallback,
        }
    }

    /// Build a locator from configuration. The fallback only participates
    /// when `use_fallback` is set.
    pub fn from_config(config: &BackendConfig) -> Result<Self, url::ParseError> {
        let configured = config.url.as_deref().map(Url::parse).transpose()?;
        let fallback = if config.use_fallback {
            Some(Url::parse(&config.fallback_url)?)
        } else {
            None
        };
        Ok(Self::new(configured, fallback))
    }

    /// Whether a missing configured URL is covered by a fallback.
    pub fn has_fallback(&self) -> bool {
        self.fallback.is_some()
    }

    /// The base URL to forward to.
    pub fn resolve(&self) -> Result<&Url, ProxyError> {
        self.configured
            .as_ref()
            .or(self.fallback.as_ref())
            .ok_or(ProxyError::NotConfigured)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn configured_wins_over_fallback() {
        let locator = BackendLocator::new(
            Some(url("http://10.0.0.5:5000")),
            Some(url("https://fallback.example.com")),
        );
        assert_eq!(locator.resolve().unwrap().as_str(), "http://10.0.0.5:5000/");
    }

    #[test]
    fn fallback_used_when_unset() {
        let locator = BackendLocator::new(None, Some(url("https://fallback.example.com")));
        assert!(locator.has_fallback());
        assert_eq!(
            locator.resolve().unwrap().host_str(),
            Some("fallback.example.com")
        );
    }

    #[test]
    fn unset_without_fallback_is_not_configured() {
        let locator = BackendLocator::new(None, None);
        assert!(matches!(locator.resolve(), Err(ProxyError::NotConfigured)));
    }

    #[test]
    fn from_config_respects_use_fallback() {
        let mut config = BackendConfig::default();
        let locator = BackendLocator::from_config(&config).unwrap();
        assert!(!locator.has_fallback());
        assert!(locator.resolve().is_err());

        config.use_fallback = true;
        let locator = BackendLocator::from_config(&config).unwrap();
        assert_eq!(
            locator.resolve().unwrap().host_str(),
            Some("incentive-production.up.railway.app")
        );
    }
}
