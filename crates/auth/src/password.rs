//! PBKDF2-HMAC-SHA256 credential hashes.
//!
//! Encoded form: `pbkdf2-sha256$<iterations>$<salt hex>$<digest hex>`.

use core::str::FromStr;

use rand::RngCore;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

const SCHEME: &str = "pbkdf2-sha256";
const SALT_LEN: usize = 16;
const DIGEST_LEN: usize = 32;
pub const DEFAULT_ITERATIONS: u32 = 10_000;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PasswordError {
    #[error("malformed password hash: {0}")]
    Malformed(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordHash {
    iterations: u32,
    salt: Vec<u8>,
    digest: [u8; DIGEST_LEN],
}

impl PasswordHash {
    /// Hash `password` with a fresh random salt.
    pub fn create(password: &str) -> Self {
        Self::create_with_iterations(password, DEFAULT_ITERATIONS)
    }

    pub fn create_with_iterations(password: &str, iterations: u32) -> Self {
        let mut salt = vec![0u8; SALT_LEN];
        rand::thread_rng().fill_bytes(&mut salt);
        let iterations = iterations.max(1);
        let digest = derive(&salt, password, iterations);
        Self {
            iterations,
            salt,
            digest,
        }
    }

    /// Constant-time comparison of the derived digest.
    pub fn verify(&self, password: &str) -> bool {
        let candidate = derive(&self.salt, password, self.iterations);
        candidate[..].ct_eq(&self.digest[..]).into()
    }

    pub fn encode(&self) -> String {
        format!(
            "{SCHEME}${}${}${}",
            self.iterations,
            hex::encode(&self.salt),
            hex::encode(self.digest)
        )
    }
}

impl core::fmt::Display for PasswordHash {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for PasswordHash {
    type Err = PasswordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('$');
        if parts.next() != Some(SCHEME) {
            return Err(PasswordError::Malformed("unknown scheme"));
        }
        let iterations = parts
            .next()
            .and_then(|v| v.parse::<u32>().ok())
            .filter(|n| *n > 0)
            .ok_or(PasswordError::Malformed("iterations"))?;
        let salt = parts
            .next()
            .and_then(|v| hex::decode(v).ok())
            .filter(|v| !v.is_empty())
            .ok_or(PasswordError::Malformed("salt"))?;
        let digest = parts
            .next()
            .and_then(|v| hex::decode(v).ok())
            .and_then(|v| <[u8; DIGEST_LEN]>::try_from(v).ok())
            .ok_or(PasswordError::Malformed("digest"))?;
        if parts.next().is_some() {
            return Err(PasswordError::Malformed("trailing segments"));
        }
        Ok(Self {
            iterations,
            salt,
            digest,
        })
    }
}

fn derive(salt: &[u8], password: &str, iterations: u32) -> [u8; DIGEST_LEN] {
    let mut out = [0u8; DIGEST_LEN];
    pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut out);
    out
}
