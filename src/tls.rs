//! AutoMTLS support for the plugin handshake.
//!
//! When Terraform launches a plugin it passes its own client certificate in
//! `PLUGIN_CLIENT_CERT`, which asks the plugin to serve TLS. The plugin
//! answers with a fresh self-signed `localhost` certificate, advertised in
//! the handshake line so Terraform can pin it.
//!
//! Only the server side of the connection is authenticated. Terraform's
//! client certificate is marked as a CA, which rustls refuses as an
//! end-entity certificate, so it is not used to verify clients; the
//! listener only accepts connections on loopback.

use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;
use rcgen::{
    BasicConstraints, CertificateParams, DistinguishedName, DnType, ExtendedKeyUsagePurpose,
    IsCa, KeyPair, KeyUsagePurpose,
};
use tonic::transport::{Identity, ServerTlsConfig};

use crate::error::ProviderError;

/// Environment variable carrying Terraform's client certificate (PEM).
pub const CLIENT_CERT_ENV_VAR: &str = "PLUGIN_CLIENT_CERT";

/// A generated server identity.
pub struct AutoTls {
    /// TLS configuration for the gRPC server.
    pub config: ServerTlsConfig,
    /// Certificate DER in unpadded standard base64, as the handshake expects.
    pub cert_base64: String,
    /// Certificate PEM.
    pub cert_pem: String,
}

impl std::fmt::Debug for AutoTls {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutoTls")
            .field("cert_base64", &self.cert_base64)
            .finish_non_exhaustive()
    }
}

/// Generate a self-signed `localhost` certificate and its TLS config.
pub fn generate() -> Result<AutoTls, ProviderError> {
    let tls_err = |e: rcgen::Error| ProviderError::Tls(e.to_string());

    let mut params = CertificateParams::new(vec!["localhost".to_string()]).map_err(tls_err)?;
    params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    params.key_usages = vec![
        KeyUsagePurpose::DigitalSignature,
        KeyUsagePurpose::KeyEncipherment,
        KeyUsagePurpose::KeyCertSign,
    ];
    params.extended_key_usages = vec![
        ExtendedKeyUsagePurpose::ServerAuth,
        ExtendedKeyUsagePurpose::ClientAuth,
    ];

    let mut dn = DistinguishedName::new();
    dn.push(DnType::OrganizationName, "terraform-provider-petstore");
    dn.push(DnType::CommonName, "localhost");
    params.distinguished_name = dn;

    let key = KeyPair::generate().map_err(tls_err)?;
    let cert = params.self_signed(&key).map_err(tls_err)?;

    let cert_pem = cert.pem();
    let identity = Identity::from_pem(&cert_pem, key.serialize_pem());

    Ok(AutoTls {
        config: ServerTlsConfig::new().identity(identity),
        cert_base64: STANDARD_NO_PAD.encode(cert.der()),
        cert_pem,
    })
}
