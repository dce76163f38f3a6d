//! use certcheck::error::CertCheckError;

use thiserror::Error;

/// Represents errors that can occur while building requests or checking
/// certificates and CRLs.
///
/// Every variant carries a human-readable detail naming the failed check or
/// the underlying cause.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CertCheckError {
    /// The certificate is missing, malformed, or does not match expectations.
    #[error("Invalid certificate: {0}")]
    InvalidCertificate(String),

    /// The certificate signing request could not be built or signed.
    #[error("Invalid CSR: {0}")]
    InvalidCsr(String),

    /// Error during key generation.
    #[error("Key generation error: {0}")]
    KeyGeneration(String),

    /// The CRL is malformed, expired, or fails signature verification.
    #[error("Invalid CRL: {0}")]
    InvalidCrl(String),

    /// A distinguished name attribute carries a value that is not a string.
    #[error("Unsupported attribute value: {0}")]
    UnsupportedValue(String),

    /// A signature did not verify, or its algorithm does not fit the key.
    #[error("Signature verification failed: {0}")]
    SignatureError(String),

    /// Error during data encoding.
    #[error("Failed to encode data: {0}")]
    EncodingError(String),

    /// Error during data decoding.
    #[error("Failed to decode data: {0}")]
    DecodingError(String),
}

pub type Result<T> = std::result::Result<T, CertCheckError>;

impl From<der::Error> for CertCheckError {
    /// Converts a `der::Error` into a `CertCheckError`.
    fn from(err: der::Error) -> Self {
        CertCheckError::DecodingError(err.to_string())
    }
}

impl CertCheckError {
    pub(crate) fn invalid_cert(detail: impl Into<String>) -> Self {
        CertCheckError::InvalidCertificate(detail.into())
    }

    pub(crate) fn invalid_crl(detail: impl Into<String>) -> Self {
        CertCheckError::InvalidCrl(detail.into())
    }
}
