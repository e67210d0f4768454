use std::fmt;

/// TLS settings for HTTPS connections
///
/// Applied on top of the platform defaults of the enabled TLS backend.
/// Only available with the `native-tls` or `rustls-tls` feature.
#[derive(Clone, Default)]
pub struct TlsConfig {
    pub(crate) root_certificates: Vec<reqwest::Certificate>,
    pub(crate) identity: Option<reqwest::Identity>,
    pub(crate) min_version: Option<reqwest::tls::Version>,
    pub(crate) accept_invalid_certs: bool,
}

impl TlsConfig {
    /// Create an empty TLS configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Trust an additional root certificate (e.g. a private CA)
    #[must_use]
    pub fn with_root_certificate(mut self, cert: reqwest::Certificate) -> Self {
        self.root_certificates.push(cert);
        self
    }

    /// Present a client certificate (mutual TLS)
    #[must_use]
    pub fn with_identity(mut self, identity: reqwest::Identity) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Minimum accepted TLS protocol version
    #[must_use]
    pub fn with_min_version(mut self, version: reqwest::tls::Version) -> Self {
        self.min_version = Some(version);
        self
    }

    /// Disable certificate verification. Only for tests against self-signed servers.
    #[must_use]
    pub fn danger_accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }

    pub(crate) fn apply(&self, mut builder: reqwest::ClientBuilder) -> reqwest::ClientBuilder {
        for cert in &self.root_certificates {
            builder = builder.add_root_certificate(cert.clone());
        }
        if let Some(identity) = &self.identity {
            builder = builder.identity(identity.clone());
        }
        if let Some(version) = self.min_version {
            builder = builder.min_tls_version(version);
        }
        builder.danger_accept_invalid_certs(self.accept_invalid_certs)
    }
}

impl fmt::Debug for TlsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsConfig")
            .field("root_certificates", &self.root_certificates.len())
            .field("identity", &self.identity.as_ref().map(|_| "<redacted>"))
            .field("min_version", &self.min_version)
            .field("accept_invalid_certs", &self.accept_invalid_certs)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_settings() {
        let tls = TlsConfig::new()
            .with_min_version(reqwest::tls::Version::TLS_1_2)
            .danger_accept_invalid_certs(true);

        assert_eq!(tls.min_version, Some(reqwest::tls::Version::TLS_1_2));
        assert!(tls.accept_invalid_certs);
        assert!(tls.root_certificates.is_empty());
        assert!(tls.identity.is_none());
    }

    #[test]
    fn test_apply_builds_client() {
        let tls = TlsConfig::new()
            .with_min_version(reqwest::tls::Version::TLS_1_2)
            .danger_accept_invalid_certs(true);

        assert!(tls.apply(reqwest::Client::builder()).build().is_ok());
    }

    #[test]
    fn test_debug_hides_identity() {
        let debug = format!("{:?}", TlsConfig::new());
        assert!(debug.contains("root_certificates: 0"));
        assert!(debug.contains("identity: None"));
    }
}
