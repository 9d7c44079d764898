// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Transport security for the HTTPS listener.
//!
//! The key must be RSA (2048 bits or more, enforced by the ring signer) or
//! ECDSA. The leaf certificate must be signed with SHA-256/384/512 by an
//! algorithm of the same family as its public key. Only forward-secret AEAD
//! cipher suites are offered.

use std::path::Path;
use std::sync::Arc;

use rustls::crypto::CryptoProvider;
use rustls::crypto::ring::{self, cipher_suite};
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::{ServerConfig, SignatureAlgorithm, SupportedCipherSuite};
use thiserror::Error;
use tracing::info;
use x509_parser::oid_registry::{
    OID_KEY_TYPE_EC_PUBLIC_KEY, OID_PKCS1_RSAENCRYPTION, OID_PKCS1_SHA256WITHRSA,
    OID_PKCS1_SHA384WITHRSA, OID_PKCS1_SHA512WITHRSA, OID_SIG_ECDSA_WITH_SHA256,
    OID_SIG_ECDSA_WITH_SHA384, OID_SIG_ECDSA_WITH_SHA512, Oid,
};
use x509_parser::prelude::{FromDer, X509Certificate};

/// Errors from building the TLS configuration.
#[derive(Debug, Error)]
pub enum TlsError {
    /// A PEM file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// File that failed.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The certificate file contains no certificates.
    #[error("no certificates found")]
    NoCertificates,

    /// The key file contains no private key.
    #[error("no private key found")]
    NoPrivateKey,

    /// PEM content could not be parsed.
    #[error("failed to parse PEM: {0}")]
    Pem(std::io::Error),

    /// The key is not an accepted type or is too weak.
    #[error("unsupported private key: {0}")]
    UnsupportedKey(String),

    /// The certificate is malformed or signed with a rejected algorithm.
    #[error("unsupported certificate: {0}")]
    UnsupportedCertificate(String),

    /// rustls rejected the configuration.
    #[error("TLS configuration error: {0}")]
    Rustls(#[from] rustls::Error),
}

/// Cipher suites offered to clients.
pub fn allowed_cipher_suites() -> Vec<SupportedCipherSuite> {
    vec![
        cipher_suite::TLS13_AES_256_GCM_SHA384,
        cipher_suite::TLS13_AES_128_GCM_SHA256,
        cipher_suite::TLS13_CHACHA20_POLY1305_SHA256,
        cipher_suite::TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384,
        cipher_suite::TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256,
        cipher_suite::TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256,
        cipher_suite::TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384,
        cipher_suite::TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256,
    ]
}

/// Check that `key` is an accepted RSA or ECDSA key.
pub fn check_private_key(key: &PrivateKeyDer<'_>) -> Result<SignatureAlgorithm, TlsError> {
    let signing_key = ring::sign::any_supported_type(key)
        .map_err(|e| TlsError::UnsupportedKey(e.to_string()))?;

    match signing_key.algorithm() {
        algorithm @ (SignatureAlgorithm::RSA | SignatureAlgorithm::ECDSA) => Ok(algorithm),
        other => Err(TlsError::UnsupportedKey(format!(
            "{:?} keys are not accepted",
            other
        ))),
    }
}

/// Key family of a signature or public key algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyFamily {
    Rsa,
    Ecdsa,
}

fn signature_family(oid: &Oid<'_>) -> Option<KeyFamily> {
    if *oid == OID_PKCS1_SHA256WITHRSA
        || *oid == OID_PKCS1_SHA384WITHRSA
        || *oid == OID_PKCS1_SHA512WITHRSA
    {
        Some(KeyFamily::Rsa)
    } else if *oid == OID_SIG_ECDSA_WITH_SHA256
        || *oid == OID_SIG_ECDSA_WITH_SHA384
        || *oid == OID_SIG_ECDSA_WITH_SHA512
    {
        Some(KeyFamily::Ecdsa)
    } else {
        None
    }
}

fn public_key_family(oid: &Oid<'_>) -> Option<KeyFamily> {
    if *oid == OID_PKCS1_RSAENCRYPTION {
        Some(KeyFamily::Rsa)
    } else if *oid == OID_KEY_TYPE_EC_PUBLIC_KEY {
        Some(KeyFamily::Ecdsa)
    } else {
        None
    }
}

/// Check that `cert` is signed with SHA-256/384/512 RSA or ECDSA, and that
/// the signature family matches the certificate's public key.
pub fn check_certificate(cert: &CertificateDer<'_>) -> Result<(), TlsError> {
    let (_, parsed) = X509Certificate::from_der(cert.as_ref())
        .map_err(|e| TlsError::UnsupportedCertificate(e.to_string()))?;

    let signature_oid = &parsed.signature_algorithm.algorithm;
    let signature = signature_family(signature_oid).ok_or_else(|| {
        TlsError::UnsupportedCertificate(format!(
            "signature algorithm {} is not accepted",
            signature_oid
        ))
    })?;

    let key_oid = &parsed.public_key().algorithm.algorithm;
    let key = public_key_family(key_oid).ok_or_else(|| {
        TlsError::UnsupportedCertificate(format!(
            "public key algorithm {} is not accepted",
            key_oid
        ))
    })?;

    if signature != key {
        return Err(TlsError::UnsupportedCertificate(format!(
            "{:?} signature over {:?} public key",
            signature, key
        )));
    }

    Ok(())
}

/// Build a server configuration from PEM-encoded certificate chain and key.
pub fn server_config_from_pem(cert_pem: &[u8], key_pem: &[u8]) -> Result<ServerConfig, TlsError> {
    let certs: Vec<CertificateDer<'static>> = rustls_pemfile::certs(&mut &cert_pem[..])
        .collect::<Result<Vec<_>, _>>()
        .map_err(TlsError::Pem)?;
    if certs.is_empty() {
        return Err(TlsError::NoCertificates);
    }

    let key = rustls_pemfile::private_key(&mut &key_pem[..])
        .map_err(TlsError::Pem)?
        .ok_or(TlsError::NoPrivateKey)?;

    let algorithm = check_private_key(&key)?;
    check_certificate(&certs[0])?;

    let provider = CryptoProvider {
        cipher_suites: allowed_cipher_suites(),
        ..ring::default_provider()
    };

    let mut config = ServerConfig::builder_with_provider(Arc::new(provider))
        .with_safe_default_protocol_versions()?
        .with_no_client_auth()
        .with_single_cert(certs, key)?;
    config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];

    info!(key_algorithm = ?algorithm, "TLS configuration loaded");

    Ok(config)
}

/// Load the certificate chain and key from PEM files.
pub fn load_server_config(cert_path: &Path, key_path: &Path) -> Result<ServerConfig, TlsError> {
    let read = |path: &Path| {
        std::fs::read(path).map_err(|source| TlsError::Io {
            path: path.display().to_string(),
            source,
        })
    };

    server_config_from_pem(&read(cert_path)?, &read(key_path)?)
}
