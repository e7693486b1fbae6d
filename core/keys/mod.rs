//! Key material and credential helpers for static (provider-less) resources.
//!

use openssl::bn::BigNumRef;
use openssl::pkey::Private;
use openssl::rsa::Rsa;
use rand::distributions::Alphanumeric;
use rand::Rng;
use sha2::{Digest, Sha512};
use thiserror::*;

pub const DEFAULT_KEY_BITS: u32 = 2048;

/// An RSA key-pair in the three forms a deployment stores: PEM private key,
/// PEM public key, and the one-line `ssh-rsa` authorized-keys form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPair {
    private_pem: String,
    public_pem: String,
    public_ssh: String,
}

impl KeyPair {
    pub fn generate(bits: u32) -> Result<Self, KeysError> {
        let rsa = Rsa::generate(bits)?;
        Self::from_rsa(rsa)
    }

    /// Re-derive the public forms from a stored private key. Used to keep
    /// materialization idempotent: existing private keys are never replaced,
    /// only completed.
    pub fn from_private_pem(pem: &str) -> Result<Self, KeysError> {
        let rsa = Rsa::private_key_from_pem(pem.as_bytes())?;
        Self::from_rsa(rsa)
    }

    fn from_rsa(rsa: Rsa<Private>) -> Result<Self, KeysError> {
        let private_pem = String::from_utf8(rsa.private_key_to_pem()?)
            .map_err(|_| KeysError::MalformedPem)?;
        let public_pem = String::from_utf8(rsa.public_key_to_pem()?)
            .map_err(|_| KeysError::MalformedPem)?;
        let public_ssh = ssh_public_key(rsa.e(), rsa.n());
        Ok(KeyPair {
            private_pem,
            public_pem,
            public_ssh,
        })
    }

    pub fn private_pem(&self) -> &str {
        self.private_pem.as_ref()
    }

    pub fn public_pem(&self) -> &str {
        self.public_pem.as_ref()
    }

    pub fn public_ssh(&self) -> &str {
        self.public_ssh.as_ref()
    }
}

// RFC 4253 public key blob: length-prefixed "ssh-rsa", exponent, modulus.
fn ssh_public_key(e: &BigNumRef, n: &BigNumRef) -> String {
    let mut blob = vec![];
    write_ssh_string(&mut blob, b"ssh-rsa");
    write_ssh_mpint(&mut blob, &e.to_vec());
    write_ssh_mpint(&mut blob, &n.to_vec());
    let encoded = openssl::base64::encode_block(&blob);
    format!("ssh-rsa {}", encoded)
}

fn write_ssh_string(out: &mut Vec<u8>, data: &[u8]) {
    out.extend_from_slice(&(data.len() as u32).to_be_bytes());
    out.extend_from_slice(data);
}

fn write_ssh_mpint(out: &mut Vec<u8>, data: &[u8]) {
    // mpints are signed; a leading high bit needs a zero pad byte.
    if data.first().map(|b| b & 0x80 != 0).unwrap_or(false) {
        out.extend_from_slice(&((data.len() + 1) as u32).to_be_bytes());
        out.push(0);
        out.extend_from_slice(data);
    } else {
        write_ssh_string(out, data);
    }
}

pub fn generate_password(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

/// Salted SHA-512 hash in `$6$<salt>$<hex digest>` form, as stored next to a
/// generated user password.
pub fn hash_password(password: &str, salt: Option<&str>) -> String {
    let salt = match salt {
        Some(salt) => salt.to_string(),
        None => generate_password(8),
    };
    let mut hasher = Sha512::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    let digest = hasher.finalize();
    let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
    format!("$6${}${}", salt, hex)
}

#[derive(Error, Debug)]
pub enum KeysError {
    #[error(transparent)]
    OpensslError(openssl::error::ErrorStack),

    #[error("Key material is not valid UTF-8 PEM")]
    MalformedPem,
}

impl From<openssl::error::ErrorStack> for KeysError {
    fn from(value: openssl::error::ErrorStack) -> Self {
        KeysError::OpensslError(value)
    }
}
