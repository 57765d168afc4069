//! Server-side TLS policy of the control channel.
//!
//! TLS 1.3 only, ALPN `http/1.1`. Key exchange and cipher preferences are
//! matched against what the crypto provider implements; entries it lacks are
//! logged and skipped.
use std::{path::Path, sync::Arc};

use rustls::{
    CipherSuite, NamedGroup, ServerConfig, SupportedCipherSuite,
    crypto::{CryptoProvider, SupportedKxGroup, ring},
    pki_types::{CertificateDer, PrivateKeyDer, pem::PemObject},
    version::TLS13,
};
use tracing::{debug, warn};

use crate::error::ApiError;

const KX_PREFERENCE: [NamedGroup; 3] = [
    NamedGroup::secp521r1,
    NamedGroup::secp384r1,
    NamedGroup::secp256r1,
];

/// Legacy suites kept in the policy. TLS 1.3 negotiation never selects them.
const LEGACY_SUITES: [CipherSuite; 4] = [
    CipherSuite::TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384,
    CipherSuite::TLS_ECDHE_RSA_WITH_AES_256_CBC_SHA,
    CipherSuite::TLS_RSA_WITH_AES_256_GCM_SHA384,
    CipherSuite::TLS_RSA_WITH_AES_256_CBC_SHA,
];

/// Loads the PEM certificate chain and key and builds the server configuration.
pub fn load_server_config(cert: &Path, key: &Path) -> Result<Arc<ServerConfig>, ApiError> {
    let certs = load_certs(cert)?;
    let key = PrivateKeyDer::from_pem_file(key).map_err(|source| ApiError::Pem {
        path: key.to_path_buf(),
        source,
    })?;

    let mut config = ServerConfig::builder_with_provider(Arc::new(provider()?))
        .with_protocol_versions(&[&TLS13])?
        .with_no_client_auth()
        .with_single_cert(certs, key)?;
    config.alpn_protocols = vec![b"http/1.1".to_vec()];

    Ok(Arc::new(config))
}

fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>, ApiError> {
    let pem_err = |source| ApiError::Pem {
        path: path.to_path_buf(),
        source,
    };
    let certs = CertificateDer::pem_file_iter(path)
        .map_err(pem_err)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(pem_err)?;
    if certs.is_empty() {
        return Err(ApiError::NoCertificates(path.to_path_buf()));
    }
    Ok(certs)
}

fn provider() -> Result<CryptoProvider, ApiError> {
    let base = ring::default_provider();

    let kx_groups = select_kx_groups(&base.kx_groups);
    if kx_groups.is_empty() {
        return Err(ApiError::NoKeyExchangeGroup);
    }

    let mut cipher_suites: Vec<SupportedCipherSuite> = base
        .cipher_suites
        .iter()
        .copied()
        .filter(|s| matches!(s, SupportedCipherSuite::Tls13(_)))
        .collect();
    cipher_suites.extend(select_legacy_suites(&base.cipher_suites));

    Ok(CryptoProvider {
        kx_groups,
        cipher_suites,
        ..base
    })
}

fn select_kx_groups(available: &[&'static dyn SupportedKxGroup]) -> Vec<&'static dyn SupportedKxGroup> {
    KX_PREFERENCE
        .iter()
        .filter_map(|want| {
            let found = available.iter().copied().find(|g| g.name() == *want);
            if found.is_none() {
                warn!(group = ?want, "key exchange group not supported by crypto provider; skipped");
            }
            found
        })
        .collect()
}

fn select_legacy_suites(available: &[SupportedCipherSuite]) -> Vec<SupportedCipherSuite> {
    LEGACY_SUITES
        .iter()
        .filter_map(|want| {
            let found = available.iter().copied().find(|s| s.suite() == *want);
            match found {
                Some(_) => debug!(suite = ?want, "legacy cipher suite installed"),
                None => warn!(suite = ?want, "cipher suite not supported by crypto provider; skipped"),
            }
            found
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn self_signed(dir: &Path) -> (std::path::PathBuf, std::path::PathBuf) {
        let cert = rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
        let cert_path = dir.join("server.crt");
        let key_path = dir.join("server.key");
        fs::write(&cert_path, cert.serialize_pem().unwrap()).unwrap();
        fs::write(&key_path, cert.serialize_private_key_pem()).unwrap();
        (cert_path, key_path)
    }

    #[test]
    fn loads_self_signed_pair() {
        let dir = tempfile::tempdir().unwrap();
        let (cert, key) = self_signed(dir.path());

        let config = load_server_config(&cert, &key).unwrap();
        assert_eq!(config.alpn_protocols, vec![b"http/1.1".to_vec()]);
    }

    #[test]
    fn missing_cert_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let (_, key) = self_signed(dir.path());

        let err = load_server_config(&dir.path().join("absent.crt"), &key).unwrap_err();
        assert!(matches!(err, ApiError::Pem { .. }));
    }

    #[test]
    fn cert_file_without_certificates_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let (_, key) = self_signed(dir.path());
        let empty = dir.path().join("empty.crt");
        fs::write(&empty, "").unwrap();

        let err = load_server_config(&empty, &key).unwrap_err();
        assert!(matches!(err, ApiError::NoCertificates(_)));
    }

    #[test]
    fn kx_preference_skips_p521() {
        let groups = select_kx_groups(&ring::default_provider().kx_groups);
        let names: Vec<NamedGroup> = groups.iter().map(|g| g.name()).collect();
        assert_eq!(names, vec![NamedGroup::secp384r1, NamedGroup::secp256r1]);
    }

    #[test]
    fn only_tls13_and_supported_legacy_suites() {
        let p = provider().unwrap();
        assert!(p.cipher_suites.iter().any(|s| matches!(s, SupportedCipherSuite::Tls13(_))));
        let legacy: Vec<CipherSuite> = p
            .cipher_suites
            .iter()
            .filter(|s| !matches!(s, SupportedCipherSuite::Tls13(_)))
            .map(|s| s.suite())
            .collect();
        assert_eq!(legacy, vec![CipherSuite::TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384]);
    }
}
