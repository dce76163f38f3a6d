use der::Encode;
use ecdsa::signature::hazmat::PrehashVerifier;
use ecdsa::signature::{SignatureEncoding, Signer, Verifier};
use ed25519_dalek::{SigningKey as Ed25519SigningKey, VerifyingKey as Ed25519VerifyingKey};
use p256::ecdsa::{SigningKey as P256SigningKey, VerifyingKey as P256VerifyingKey};
use p384::ecdsa::{SigningKey as P384SigningKey, VerifyingKey as P384VerifyingKey};
use pkcs8::DecodePublicKey;
use rsa::pkcs1v15::{
    Signature as RsaSignature, SigningKey as RsaSigningKey, VerifyingKey as RsaVerifyingKey,
};
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha384, Sha512};
use x509_cert::spki::{AlgorithmIdentifierOwned, ObjectIdentifier, SubjectPublicKeyInfoOwned};

use crate::error::{CertCheckError, Result};

type P521VerifyingKey = ecdsa::VerifyingKey<p521::NistP521>;

/// Byte length of a P-521 field element.
const P521_FIELD_BYTES: usize = 66;

/// Key algorithms available for generated key pairs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum KeyAlgorithm {
    /// RSA with a 2048-bit modulus, signing with SHA-256.
    #[default]
    Rsa2048,
    /// ECDSA over P-256, signing with SHA-256.
    EcdsaP256,
    /// ECDSA over P-384, signing with SHA-384.
    EcdsaP384,
    /// Ed25519.
    Ed25519,
}

/// Supported key types for request and certificate signing.
#[derive(Debug, Clone)]
pub enum KeyPair {
    Rsa {
        private: Box<RsaPrivateKey>,
        public: RsaPublicKey,
    },
    EcdsaP256 {
        signing_key: P256SigningKey,
        verifying_key: P256VerifyingKey,
    },
    EcdsaP384 {
        signing_key: P384SigningKey,
        verifying_key: P384VerifyingKey,
    },
    Ed25519 {
        signing_key: Ed25519SigningKey,
    },
}

impl KeyPair {
    /// Generate a fresh key pair for `algorithm`.
    pub fn generate(algorithm: KeyAlgorithm) -> Result<Self> {
        match algorithm {
            KeyAlgorithm::Rsa2048 => Self::generate_rsa(2048),
            KeyAlgorithm::EcdsaP256 => Ok(Self::generate_ecdsa_p256()),
            KeyAlgorithm::EcdsaP384 => Ok(Self::generate_ecdsa_p384()),
            KeyAlgorithm::Ed25519 => Ok(Self::generate_ed25519()),
        }
    }

    /// Generate an RSA key pair with the specified number of bits.
    pub fn generate_rsa(bits: usize) -> Result<Self> {
        let mut rng = rand_core::OsRng;
        let private = RsaPrivateKey::new(&mut rng, bits)
            .map_err(|e| CertCheckError::KeyGeneration(e.to_string()))?;
        let public = RsaPublicKey::from(&private);
        Ok(KeyPair::Rsa {
            private: Box::new(private),
            public,
        })
    }

    /// Generate an ECDSA P-256 key pair.
    pub fn generate_ecdsa_p256() -> Self {
        let mut rng = rand_core::OsRng;
        let signing_key = P256SigningKey::random(&mut rng);
        let verifying_key = signing_key.verifying_key().to_owned();
        KeyPair::EcdsaP256 {
            signing_key,
            verifying_key,
        }
    }

    /// Generate an ECDSA P-384 key pair.
    pub fn generate_ecdsa_p384() -> Self {
        let mut rng = rand_core::OsRng;
        let signing_key = P384SigningKey::random(&mut rng);
        let verifying_key = signing_key.verifying_key().to_owned();
        KeyPair::EcdsaP384 {
            signing_key,
            verifying_key,
        }
    }

    /// Generate an Ed25519 key pair.
    pub fn generate_ed25519() -> Self {
        let mut rng = rand_core::OsRng;
        let signing_key: Ed25519SigningKey = Ed25519SigningKey::generate(&mut rng);
        KeyPair::Ed25519 { signing_key }
    }

    /// The algorithm this key pair was generated for.
    pub fn algorithm(&self) -> KeyAlgorithm {
        match self {
            KeyPair::Rsa { .. } => KeyAlgorithm::Rsa2048,
            KeyPair::EcdsaP256 { .. } => KeyAlgorithm::EcdsaP256,
            KeyPair::EcdsaP384 { .. } => KeyAlgorithm::EcdsaP384,
            KeyPair::Ed25519 { .. } => KeyAlgorithm::Ed25519,
        }
    }

    /// Encodes the public half as a `SubjectPublicKeyInfo`.
    pub fn as_spki(&self) -> Result<SubjectPublicKeyInfoOwned> {
        let spki = match self {
            KeyPair::Rsa { public, .. } => SubjectPublicKeyInfoOwned::from_key(public.clone()),
            KeyPair::EcdsaP256 { verifying_key, .. } => {
                SubjectPublicKeyInfoOwned::from_key(*verifying_key)
            }
            KeyPair::EcdsaP384 { verifying_key, .. } => {
                SubjectPublicKeyInfoOwned::from_key(*verifying_key)
            }
            KeyPair::Ed25519 { signing_key } => {
                SubjectPublicKeyInfoOwned::from_key(signing_key.verifying_key())
            }
        };
        spki.map_err(|e| CertCheckError::EncodingError(e.to_string()))
    }

    /// Identifier of the signature algorithm produced by [`KeyPair::sign_data`].
    pub fn signature_algorithm(&self) -> AlgorithmIdentifierOwned {
        use const_oid::db::{rfc5912, rfc8410};

        match self {
            KeyPair::Rsa { .. } => AlgorithmIdentifierOwned {
                oid: rfc5912::SHA_256_WITH_RSA_ENCRYPTION,
                parameters: Some(der::Any::null()),
            },
            KeyPair::EcdsaP256 { .. } => AlgorithmIdentifierOwned {
                oid: rfc5912::ECDSA_WITH_SHA_256,
                parameters: None,
            },
            KeyPair::EcdsaP384 { .. } => AlgorithmIdentifierOwned {
                oid: rfc5912::ECDSA_WITH_SHA_384,
                parameters: None,
            },
            KeyPair::Ed25519 { .. } => AlgorithmIdentifierOwned {
                oid: rfc8410::ID_ED_25519,
                parameters: None,
            },
        }
    }

    /// Signs `data`. ECDSA signatures are DER encoded as X.509 expects.
    pub fn sign_data(&self, data: &[u8]) -> Result<Vec<u8>> {
        let signing_failed = |e: ecdsa::signature::Error| CertCheckError::EncodingError(e.to_string());
        match self {
            KeyPair::Rsa { private, .. } => {
                let signing_key: RsaSigningKey<Sha256> = RsaSigningKey::new(*private.clone());
                let signature = signing_key.try_sign(data).map_err(signing_failed)?;
                Ok(signature.to_vec())
            }
            KeyPair::EcdsaP256 { signing_key, .. } => {
                let signature: p256::ecdsa::Signature =
                    signing_key.try_sign(data).map_err(signing_failed)?;
                Ok(signature.to_der().as_bytes().to_vec())
            }
            KeyPair::EcdsaP384 { signing_key, .. } => {
                let signature: p384::ecdsa::Signature =
                    signing_key.try_sign(data).map_err(signing_failed)?;
                Ok(signature.to_der().as_bytes().to_vec())
            }
            KeyPair::Ed25519 { signing_key } => {
                let signature = signing_key.try_sign(data).map_err(signing_failed)?;
                Ok(signature.to_bytes().to_vec())
            }
        }
    }
}

/// Public half of a key pair, as found in a certificate or request.
///
/// P-521 keys are only ever read from certificates issued elsewhere, so they
/// have no [`KeyPair`] counterpart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicKey {
    Rsa(RsaPublicKey),
    EcdsaP256(P256VerifyingKey),
    EcdsaP384(P384VerifyingKey),
    EcdsaP521(P521VerifyingKey),
    Ed25519(Ed25519VerifyingKey),
}

impl PublicKey {
    pub fn from_key_pair(key_pair: &KeyPair) -> Self {
        match key_pair {
            KeyPair::Rsa { public, .. } => PublicKey::Rsa(public.clone()),
            KeyPair::EcdsaP256 { verifying_key, .. } => PublicKey::EcdsaP256(*verifying_key),
            KeyPair::EcdsaP384 { verifying_key, .. } => PublicKey::EcdsaP384(*verifying_key),
            KeyPair::Ed25519 { signing_key } => PublicKey::Ed25519(signing_key.verifying_key()),
        }
    }

    /// Decodes a `SubjectPublicKeyInfo` into one of the supported key types.
    pub fn from_x509spki(spki: &SubjectPublicKeyInfoOwned) -> Result<Self> {
        use const_oid::db::{rfc5912, rfc8410};

        let der = spki.to_der()?;
        let decode_failed = |e: pkcs8::spki::Error| CertCheckError::DecodingError(e.to_string());

        match spki.algorithm.oid {
            rfc5912::RSA_ENCRYPTION => RsaPublicKey::from_public_key_der(&der)
                .map(PublicKey::Rsa)
                .map_err(decode_failed),
            rfc5912::ID_EC_PUBLIC_KEY => {
                let curve = spki
                    .algorithm
                    .parameters
                    .as_ref()
                    .and_then(|params| params.decode_as::<ObjectIdentifier>().ok());
                match curve {
                    Some(rfc5912::SECP_256_R_1) => P256VerifyingKey::from_public_key_der(&der)
                        .map(PublicKey::EcdsaP256)
                        .map_err(decode_failed),
                    Some(rfc5912::SECP_384_R_1) => P384VerifyingKey::from_public_key_der(&der)
                        .map(PublicKey::EcdsaP384)
                        .map_err(decode_failed),
                    Some(rfc5912::SECP_521_R_1) => P521VerifyingKey::from_public_key_der(&der)
                        .map(PublicKey::EcdsaP521)
                        .map_err(decode_failed),
                    _ => Err(CertCheckError::DecodingError(
                        "Unsupported elliptic curve".to_string(),
                    )),
                }
            }
            rfc8410::ID_ED_25519 => Ed25519VerifyingKey::from_public_key_der(&der)
                .map(PublicKey::Ed25519)
                .map_err(decode_failed),
            other => Err(CertCheckError::DecodingError(format!(
                "Unsupported public key algorithm {other}"
            ))),
        }
    }

    /// Verifies `signature` over `message` under the signature `algorithm`.
    ///
    /// ECDSA keys accept any of the SHA-256, SHA-384 and SHA-512 variants,
    /// whatever the curve. RSA keys accept PKCS#1 v1.5 with the same digests.
    pub fn verify(
        &self,
        message: &[u8],
        signature: &[u8],
        algorithm: &AlgorithmIdentifierOwned,
    ) -> Result<()> {
        use const_oid::db::{rfc5912, rfc8410};

        let mismatch = |e: ecdsa::signature::Error| CertCheckError::SignatureError(e.to_string());

        if let Some(prehash) = ecdsa_prehash(algorithm.oid, message) {
            return self.verify_ecdsa_prehash(&prehash, signature, algorithm.oid);
        }

        match (self, algorithm.oid) {
            (PublicKey::Rsa(key), rfc5912::SHA_256_WITH_RSA_ENCRYPTION) => {
                let signature = RsaSignature::try_from(signature).map_err(mismatch)?;
                RsaVerifyingKey::<Sha256>::new(key.clone())
                    .verify(message, &signature)
                    .map_err(mismatch)
            }
            (PublicKey::Rsa(key), rfc5912::SHA_384_WITH_RSA_ENCRYPTION) => {
                let signature = RsaSignature::try_from(signature).map_err(mismatch)?;
                RsaVerifyingKey::<Sha384>::new(key.clone())
                    .verify(message, &signature)
                    .map_err(mismatch)
            }
            (PublicKey::Rsa(key), rfc5912::SHA_512_WITH_RSA_ENCRYPTION) => {
                let signature = RsaSignature::try_from(signature).map_err(mismatch)?;
                RsaVerifyingKey::<Sha512>::new(key.clone())
                    .verify(message, &signature)
                    .map_err(mismatch)
            }
            (PublicKey::Ed25519(key), rfc8410::ID_ED_25519) => {
                let signature =
                    ed25519_dalek::Signature::from_slice(signature).map_err(mismatch)?;
                key.verify(message, &signature).map_err(mismatch)
            }
            (_, oid) => Err(algorithm_mismatch(oid)),
        }
    }

    fn verify_ecdsa_prehash(
        &self,
        prehash: &[u8],
        signature: &[u8],
        algorithm: ObjectIdentifier,
    ) -> Result<()> {
        let mismatch = |e: ecdsa::signature::Error| CertCheckError::SignatureError(e.to_string());

        match self {
            PublicKey::EcdsaP256(key) => {
                let signature = p256::ecdsa::Signature::from_der(signature).map_err(mismatch)?;
                key.verify_prehash(prehash, &signature).map_err(mismatch)
            }
            PublicKey::EcdsaP384(key) => {
                let signature = p384::ecdsa::Signature::from_der(signature).map_err(mismatch)?;
                key.verify_prehash(prehash, &signature).map_err(mismatch)
            }
            PublicKey::EcdsaP521(key) => {
                let signature = p521::ecdsa::Signature::from_der(signature).map_err(mismatch)?;
                // Left padding keeps the digest value and meets the minimum
                // prehash length of the curve.
                let mut padded = vec![0u8; P521_FIELD_BYTES.saturating_sub(prehash.len())];
                padded.extend_from_slice(prehash);
                key.verify_prehash(&padded, &signature).map_err(mismatch)
            }
            _ => Err(algorithm_mismatch(algorithm)),
        }
    }
}

fn algorithm_mismatch(oid: ObjectIdentifier) -> CertCheckError {
    CertCheckError::SignatureError(format!(
        "Signature algorithm {oid} does not match the public key"
    ))
}

/// Digest of `message` for an ECDSA signature algorithm, `None` for any
/// other algorithm.
fn ecdsa_prehash(algorithm: ObjectIdentifier, message: &[u8]) -> Option<Vec<u8>> {
    use const_oid::db::rfc5912;

    match algorithm {
        rfc5912::ECDSA_WITH_SHA_256 => Some(Sha256::digest(message).to_vec()),
        rfc5912::ECDSA_WITH_SHA_384 => Some(Sha384::digest(message).to_vec()),
        rfc5912::ECDSA_WITH_SHA_512 => Some(Sha512::digest(message).to_vec()),
        _ => None,
    }
}

/// SHA-1 over the subject public key bits, as used for key identifiers.
pub fn key_identifier(spki: &SubjectPublicKeyInfoOwned) -> Vec<u8> {
    <Sha1 as sha1::Digest>::digest(spki.subject_public_key.raw_bytes()).to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign_and_verify(key_pair: &KeyPair) {
        let message = b"to be signed";
        let signature = key_pair.sign_data(message).unwrap();
        let algorithm = key_pair.signature_algorithm();

        let public = PublicKey::from_x509spki(&key_pair.as_spki().unwrap()).unwrap();
        assert_eq!(public, PublicKey::from_key_pair(key_pair));
        public.verify(message, &signature, &algorithm).unwrap();

        let err = public.verify(b"tampered", &signature, &algorithm).unwrap_err();
        assert!(matches!(err, CertCheckError::SignatureError(_)));
    }

    #[test]
    fn test_ecdsa_p256_sign_verify() {
        sign_and_verify(&KeyPair::generate_ecdsa_p256());
    }

    #[test]
    fn test_ecdsa_p384_sign_verify() {
        sign_and_verify(&KeyPair::generate_ecdsa_p384());
    }

    #[test]
    fn test_ed25519_sign_verify() {
        sign_and_verify(&KeyPair::generate_ed25519());
    }

    #[test]
    fn test_rsa_sign_verify() {
        let key_pair = KeyPair::generate(KeyAlgorithm::Rsa2048).unwrap();
        assert_eq!(key_pair.algorithm(), KeyAlgorithm::Rsa2048);
        sign_and_verify(&key_pair);
    }

    #[test]
    fn test_verify_rejects_mismatched_algorithm() {
        let key_pair = KeyPair::generate_ecdsa_p256();
        let signature = key_pair.sign_data(b"data").unwrap();
        let public = PublicKey::from_key_pair(&key_pair);
        let ed25519 = KeyPair::generate_ed25519().signature_algorithm();
        assert!(public.verify(b"data", &signature, &ed25519).is_err());
    }

    #[test]
    fn test_ecdsa_accepts_other_sha2_digests() {
        use const_oid::db::rfc5912;
        use ecdsa::signature::hazmat::PrehashSigner;

        let signing_key = P256SigningKey::random(&mut rand_core::OsRng);
        let public = PublicKey::EcdsaP256(*signing_key.verifying_key());
        let message = b"signed with a longer digest";

        for (oid, prehash) in [
            (rfc5912::ECDSA_WITH_SHA_384, Sha384::digest(message).to_vec()),
            (rfc5912::ECDSA_WITH_SHA_512, Sha512::digest(message).to_vec()),
        ] {
            let signature: p256::ecdsa::Signature = signing_key.sign_prehash(&prehash).unwrap();
            let algorithm = AlgorithmIdentifierOwned {
                oid,
                parameters: None,
            };
            public
                .verify(message, signature.to_der().as_bytes(), &algorithm)
                .unwrap();
            assert!(public
                .verify(b"tampered", signature.to_der().as_bytes(), &algorithm)
                .is_err());
        }
    }

    #[test]
    fn test_ecdsa_algorithm_rejected_for_ed25519_key() {
        let key_pair = KeyPair::generate_ed25519();
        let signature = key_pair.sign_data(b"data").unwrap();
        let public = PublicKey::from_key_pair(&key_pair);
        let ecdsa = KeyPair::generate_ecdsa_p256().signature_algorithm();
        assert!(matches!(
            public.verify(b"data", &signature, &ecdsa),
            Err(CertCheckError::SignatureError(detail)) if detail.contains("does not match")
        ));
    }

    #[test]
    fn test_key_identifier_is_sha1_sized() {
        let spki = KeyPair::generate_ed25519().as_spki().unwrap();
        assert_eq!(key_identifier(&spki).len(), 20);
    }
}
