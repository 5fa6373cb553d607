//! Process-wide TLS configuration consumed by the handshake when the origin
//! scheme is secure.

use parking_lot::RwLock;
use reqwest::Certificate;

static TLS_CONFIG: RwLock<Option<TlsConfig>> = RwLock::new(None);

/// TLS settings applied to secure handshake requests.
#[derive(Debug, Clone, Default)]
pub struct TlsConfig {
    root_certificates: Vec<Certificate>,
    danger_accept_invalid_certs: bool,
}

impl TlsConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trust an additional root certificate.
    pub fn add_root_certificate(mut self, certificate: Certificate) -> Self {
        self.root_certificates.push(certificate);
        self
    }

    /// Disable certificate validation. Only for development servers.
    pub fn danger_accept_invalid_certs(mut self, accept: bool) -> Self {
        self.danger_accept_invalid_certs = accept;
        self
    }
}

/// Install the process-wide TLS configuration. Read-only once connections
/// start handshaking.
pub fn set_tls_config(config: TlsConfig) {
    *TLS_CONFIG.write() = Some(config);
}

/// Apply the installed configuration to a handshake client builder.
pub(crate) fn apply(
    builder: reqwest::blocking::ClientBuilder,
) -> reqwest::blocking::ClientBuilder {
    let Some(config) = TLS_CONFIG.read().clone() else {
        return builder;
    };
    let mut builder = builder.danger_accept_invalid_certs(config.danger_accept_invalid_certs);
    for certificate in config.root_certificates {
        builder = builder.add_root_certificate(certificate);
    }
    builder
}
