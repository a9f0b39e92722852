use std::{convert::TryFrom, path::Path, sync::Arc};

use log::{debug, warn};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_rustls::{
    rustls::{
        crypto::ring,
        pki_types::{pem::PemObject, CertificateDer, PrivateKeyDer, ServerName},
        ClientConfig, RootCertStore, ServerConfig,
    },
    TlsAcceptor, TlsConnector,
};

use crate::error::{Error, Result};

/// Byte stream that may or may not be wrapped in TLS.
pub trait Io: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> Io for T {}

pub type BoxedIo = Box<dyn Io>;

/// Builds the listener's security context from a PEM keystore holding the
/// certificate chain followed by the private key.
pub fn acceptor(keystore: &Path) -> Result<TlsAcceptor> {
    let certs = CertificateDer::pem_file_iter(keystore)?.collect::<std::result::Result<Vec<_>, _>>()?;
    if certs.is_empty() {
        return Err(Error::Tls(format!("no certificate in {}", keystore.display())));
    }
    let key = PrivateKeyDer::from_pem_file(keystore)?;

    let config = ServerConfig::builder_with_provider(Arc::new(ring::default_provider()))
        .with_safe_default_protocol_versions()?
        .with_no_client_auth()
        .with_single_cert(certs, key)?;

    debug!("Loaded keystore {}", keystore.display());

    Ok(TlsAcceptor::from(Arc::new(config)))
}

pub fn connector() -> Result<TlsConnector> {
    let mut roots = RootCertStore::empty();

    let native = rustls_native_certs::load_native_certs();
    for error in native.errors {
        warn!("Skipping native certificate: {}", error);
    }
    let (added, ignored) = roots.add_parsable_certificates(native.certs);
    debug!("Loaded {} native root certificates ({} ignored)", added, ignored);

    let config = ClientConfig::builder_with_provider(Arc::new(ring::default_provider()))
        .with_safe_default_protocol_versions()?
        .with_root_certificates(roots)
        .with_no_client_auth();

    Ok(TlsConnector::from(Arc::new(config)))
}

pub fn server_name(host: &str) -> Result<ServerName<'static>> {
    ServerName::try_from(host.to_owned()).map_err(|e| Error::Tls(format!("{}: {}", host, e)))
}
