//! The process-wide Ed25519 signing key pair.
//!
//! The key store owns key lifecycle only: loading a PKCS#8 PEM key from
//! disk, generating and persisting one on first run, and exposing the
//! public half for external verifiers. It is initialised once at startup,
//! lives in rocket's managed state, and is never mutated afterwards, so it
//! is safe to share across concurrent signing and verifying requests.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use ed25519_dalek::{
    pkcs8::{spki::der::pem::LineEnding, DecodePrivateKey, EncodePrivateKey, EncodePublicKey},
    SigningKey, VerifyingKey,
};
use rand::rngs::OsRng;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KeyStoreError {
    /// The key location could not be read or written.
    #[error("Signing key at '{path}' is unavailable: {source}")]
    Unavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// An existing key file is not a valid Ed25519 PKCS#8 PEM.
    #[error("Signing key at '{path}' is corrupt: {reason}")]
    FormatInvalid { path: PathBuf, reason: String },
}

/// Holder of the signing key and the matching public key.
#[derive(Debug)]
pub struct KeyStore {
    signing_key: SigningKey,
    public_key_pem: String,
}

impl KeyStore {
    /// Load the signing key from `path`, or generate and persist a fresh
    /// key pair if no file exists there yet.
    pub fn load_or_generate(path: &Path) -> Result<Self, KeyStoreError> {
        let signing_key = match fs::read_to_string(path) {
            Ok(pem) => {
                SigningKey::from_pkcs8_pem(&pem).map_err(|err| KeyStoreError::FormatInvalid {
                    path: path.to_owned(),
                    reason: err.to_string(),
                })?
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                info!("No signing key at '{}', generating one", path.display());
                let signing_key = SigningKey::generate(&mut OsRng);
                write_private_pem(path, &signing_key)?;
                signing_key
            }
            Err(source) => {
                return Err(KeyStoreError::Unavailable {
                    path: path.to_owned(),
                    source,
                })
            }
        };

        Ok(Self::new(signing_key))
    }

    /// Wrap an in-memory key, e.g. a freshly generated one.
    pub fn new(signing_key: SigningKey) -> Self {
        let public_key_pem = signing_key
            .verifying_key()
            .to_public_key_pem(LineEnding::LF)
            .expect("PEM encoding of a valid key is infallible");
        Self {
            signing_key,
            public_key_pem,
        }
    }

    /// Generate a random in-memory key pair, without persisting it.
    pub fn generate() -> Self {
        Self::new(SigningKey::generate(&mut OsRng))
    }

    /// The private half, for the token signer.
    pub fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }

    /// The public half, for verification.
    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// The PEM-encoded public key, for publication.
    pub fn public_key_pem(&self) -> &str {
        &self.public_key_pem
    }
}

/// Persist a fresh private key, owner-readable only where supported.
fn write_private_pem(path: &Path, signing_key: &SigningKey) -> Result<(), KeyStoreError> {
    let unavailable = |source| KeyStoreError::Unavailable {
        path: path.to_owned(),
        source,
    };

    let pem = signing_key
        .to_pkcs8_pem(LineEnding::LF)
        .expect("PEM encoding of a fresh key is infallible");
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(unavailable)?;
        }
    }
    fs::write(path, pem.as_bytes()).map_err(unavailable)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(unavailable)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_then_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("signing_key.pem");

        // First call generates and persists.
        let first = KeyStore::load_or_generate(&path).unwrap();
        assert!(path.is_file());

        // Second call loads the same key back.
        let second = KeyStore::load_or_generate(&path).unwrap();
        assert_eq!(first.verifying_key(), second.verifying_key());
        assert_eq!(first.public_key_pem(), second.public_key_pem());
    }

    #[test]
    fn public_key_is_pem() {
        let keys = KeyStore::generate();
        assert!(keys.public_key_pem().starts_with("-----BEGIN PUBLIC KEY-----"));
        assert!(keys.public_key_pem().trim_end().ends_with("-----END PUBLIC KEY-----"));
    }

    #[test]
    fn corrupt_key_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("signing_key.pem");
        fs::write(&path, "not a pem").unwrap();

        let err = KeyStore::load_or_generate(&path).unwrap_err();
        assert!(matches!(err, KeyStoreError::FormatInvalid { .. }));
    }

    #[test]
    fn unreadable_location_is_unavailable() {
        // A directory at the key path is unreadable as a key file.
        let dir = tempfile::tempdir().unwrap();
        let err = KeyStore::load_or_generate(dir.path()).unwrap_err();
        assert!(matches!(err, KeyStoreError::Unavailable { .. }));
    }
}
