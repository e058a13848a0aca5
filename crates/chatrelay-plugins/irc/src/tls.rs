//! TLS client configuration for IRC connections.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use rustls::client::danger::{
    HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier,
};
use rustls::crypto::WebPkiSupportedAlgorithms;
use rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};
use tracing::debug;

use crate::transport::{TlsOptions, TransportError};

/// Builds a client config from the per-server TLS settings.
///
/// With verification on, trust comes from either the configured CA bundle or
/// the platform store. With verification off every certificate is accepted.
pub(crate) fn client_config(options: &TlsOptions) -> Result<ClientConfig, TransportError> {
    let builder = ClientConfig::builder();
    let builder = if options.verify {
        let mut roots = RootCertStore::empty();
        match &options.ca_certificates {
            Some(path) => {
                for cert in load_certs(path)? {
                    roots.add(cert)?;
                }
                debug!(path = %path.display(), "using configured CA bundle");
            }
            None => {
                for cert in rustls_native_certs::load_native_certs().certs {
                    let _ = roots.add(cert);
                }
            }
        }
        builder.with_root_certificates(roots)
    } else {
        builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(AcceptAnyCert::new()))
    };
    match &options.client_certificate {
        Some(path) => {
            let chain = load_certs(path)?;
            let key = load_key(path)?;
            Ok(builder.with_client_auth_cert(chain, key)?)
        }
        None => Ok(builder.with_no_client_auth()),
    }
}

fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>, TransportError> {
    let file = File::open(path).map_err(|source| TransportError::CertRead {
        path: path.to_path_buf(),
        source,
    })?;
    let certs: Vec<_> = rustls_pemfile::certs(&mut BufReader::new(file))
        .collect::<Result<_, _>>()
        .map_err(|source| TransportError::CertRead {
            path: path.to_path_buf(),
            source,
        })?;
    if certs.is_empty() {
        return Err(TransportError::InvalidPem {
            path: path.to_path_buf(),
            message: "no certificates found".to_string(),
        });
    }
    Ok(certs)
}

fn load_key(path: &Path) -> Result<PrivateKeyDer<'static>, TransportError> {
    let file = File::open(path).map_err(|source| TransportError::CertRead {
        path: path.to_path_buf(),
        source,
    })?;
    rustls_pemfile::private_key(&mut BufReader::new(file))
        .map_err(|source| TransportError::CertRead {
            path: path.to_path_buf(),
            source,
        })?
        .ok_or_else(|| TransportError::InvalidPem {
            path: path.to_path_buf(),
            message: "no private key found".to_string(),
        })
}

/// Verifier used when `tls_verify = false`: accepts any server certificate.
#[derive(Debug)]
struct AcceptAnyCert {
    supported: WebPkiSupportedAlgorithms,
}

impl AcceptAnyCert {
    fn new() -> Self {
        Self {
            supported: rustls::crypto::ring::default_provider().signature_verification_algorithms,
        }
    }
}

impl ServerCertVerifier for AcceptAnyCert {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls12_signature(message, cert, dss, &self.supported)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls13_signature(message, cert, dss, &self.supported)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.supported.supported_schemes()
    }
}
