use std::sync::Arc;

use rustls::pki_types::CertificateDer;
use rustls::{ClientConfig, RootCertStore};

use crate::KubeClientError;

/// TLS settings trusting only the cluster CA, optionally presenting a client
/// certificate.
pub fn client_config(
    certificate_authority: &[u8],
    client_identity: Option<(&[u8], &[u8])>,
) -> Result<ClientConfig, KubeClientError> {
    let mut roots = RootCertStore::empty();
    let (added, _) = roots.add_parsable_certificates(read_certificates(certificate_authority)?);
    if added == 0 {
        return Err(KubeClientError::InvalidKubeconfig {
            reason: "certificate authority contains no usable certificate".to_string(),
        });
    }

    let builder = ClientConfig::builder_with_provider(Arc::new(
        rustls::crypto::ring::default_provider(),
    ))
    .with_safe_default_protocol_versions()
    .map_err(|e| KubeClientError::Tls(Box::new(e)))?
    .with_root_certificates(roots);

    let config = match client_identity {
        Some((certificate, key)) => {
            let chain = read_certificates(certificate)?;
            if chain.is_empty() {
                return Err(KubeClientError::InvalidKubeconfig {
                    reason: "client certificate contains no certificate".to_string(),
                });
            }
            let key = rustls_pemfile::private_key(&mut &key[..])
                .map_err(|e| KubeClientError::IO(Box::new(e)))?
                .ok_or_else(|| KubeClientError::InvalidKubeconfig {
                    reason: "client key contains no private key".to_string(),
                })?;
            builder
                .with_client_auth_cert(chain, key)
                .map_err(|e| KubeClientError::Tls(Box::new(e)))?
        }
        None => builder.with_no_client_auth(),
    };
    Ok(config)
}

fn read_certificates(pem: &[u8]) -> Result<Vec<CertificateDer<'static>>, KubeClientError> {
    rustls_pemfile::certs(&mut &pem[..])
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| KubeClientError::IO(Box::new(e)))
}
