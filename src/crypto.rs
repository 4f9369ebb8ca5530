use ed25519_dalek::{Keypair, PublicKey, Signature, Signer, Verifier};
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use x509_parser::prelude::*;

use crate::errors::{LedgerError, LedgerResult};

/// Fresh Ed25519 keypair, as a client enrollment would mint one.
pub fn generate_keypair() -> Keypair {
    Keypair::generate(&mut OsRng)
}

pub fn sign_message(keypair: &Keypair, message: &[u8]) -> Signature {
    keypair.sign(message)
}

pub fn verify_signature(
    public_key: &PublicKey,
    message: &[u8],
    signature: &[u8],
) -> LedgerResult<()> {
    let signature = Signature::from_bytes(signature)
        .map_err(|err| LedgerError::Crypto(format!("malformed signature: {err}")))?;
    public_key
        .verify(message, &signature)
        .map_err(|err| LedgerError::Crypto(format!("signature verification failed: {err}")))
}

pub fn sha256(data: &[u8]) -> Vec<u8> {
    Sha256::digest(data).to_vec()
}

/// Checks that the bytes form a well-formed DER-encoded X.509 certificate.
pub fn parse_certificate(der: &[u8]) -> LedgerResult<()> {
    X509Certificate::from_der(der)
        .map(|_| ())
        .map_err(|err| LedgerError::Crypto(format!("invalid certificate: {err}")))
}

/// Extracts the Ed25519 public key carried in a certificate's subject public
/// key info.
pub fn certificate_public_key(der: &[u8]) -> LedgerResult<PublicKey> {
    let (_, certificate) = X509Certificate::from_der(der)
        .map_err(|err| LedgerError::Crypto(format!("invalid certificate: {err}")))?;
    let key_bytes: &[u8] = &certificate.public_key().subject_public_key.data;
    PublicKey::from_bytes(key_bytes)
        .map_err(|err| LedgerError::Crypto(format!("unsupported certificate key: {err}")))
}
