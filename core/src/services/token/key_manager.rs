//! Key material for signing and verifying tokens
//!
//! Identity tokens are signed with an RSA private key and verified with the
//! matching public key. Refresh tokens use a shared HMAC secret. All of it is
//! loaded once at startup and never mutated afterwards.

use std::fs;
use std::path::{Path, PathBuf};

use base64::Engine;
use gp_shared::config::KeyConfig;
use jsonwebtoken::{DecodingKey, EncodingKey};
use rand::RngCore;
use rsa::pkcs1::EncodeRsaPrivateKey;
use rsa::pkcs8::{EncodePublicKey, LineEnding};
use rsa::{RsaPrivateKey, RsaPublicKey};
use tracing::{info, warn};

use crate::errors::DomainError;

/// Length of a generated refresh secret in bytes
const GENERATED_SECRET_BYTES: usize = 32;

/// Immutable key material shared by the codec
#[derive(Clone)]
pub struct KeyMaterial {
    /// Private key for signing identity tokens
    encoding_key: EncodingKey,
    /// Public key for verifying identity tokens
    decoding_key: DecodingKey,
    /// HMAC key for signing refresh tokens
    refresh_encoding_key: EncodingKey,
    /// HMAC key for verifying refresh tokens
    refresh_decoding_key: DecodingKey,
    refresh_secret: Vec<u8>,
    /// Path to private key file
    private_key_path: PathBuf,
    /// Path to public key file
    public_key_path: PathBuf,
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("private_key_path", &self.private_key_path)
            .field("public_key_path", &self.public_key_path)
            .finish_non_exhaustive()
    }
}

impl KeyMaterial {
    /// Loads key material as described by `config`
    ///
    /// When neither key file exists and `generate_if_missing` is set, a fresh
    /// RSA keypair is generated and written to the configured paths. When only
    /// one of the two files exists, loading fails rather than overwriting it.
    /// A missing refresh secret is replaced by a random one.
    ///
    /// # Returns
    ///
    /// * `Ok(KeyMaterial)` - Keys loaded successfully
    /// * `Err(DomainError::KeyMaterial)` - Keys unreadable or malformed; fatal at startup
    ///
    /// # Example
    ///
    /// ```no_run
    /// use gp_core::services::token::KeyMaterial;
    /// use gp_shared::config::KeyConfig;
    ///
    /// let keys = KeyMaterial::load(&KeyConfig::from_env()).expect("Failed to load keys");
    /// ```
    pub fn load(config: &KeyConfig) -> Result<Self, DomainError> {
        let private_key_path = PathBuf::from(&config.private_key_path);
        let public_key_path = PathBuf::from(&config.public_key_path);

        if config.generate_if_missing && !private_key_path.exists() && !public_key_path.exists() {
            info!(
                "No key files found, generating a {}-bit RSA keypair at {}",
                config.rsa_bits,
                private_key_path.display()
            );
            let (private_pem, public_pem) = generate_rsa_pem_pair(config.rsa_bits)?;
            write_pem(&private_key_path, &private_pem, true)?;
            write_pem(&public_key_path, &public_pem, false)?;
        }

        let private_key_pem = fs::read(&private_key_path).map_err(|e| DomainError::KeyMaterial {
            message: format!(
                "Failed to read private key {}: {}",
                private_key_path.display(),
                e
            ),
        })?;
        let public_key_pem = fs::read(&public_key_path).map_err(|e| DomainError::KeyMaterial {
            message: format!(
                "Failed to read public key {}: {}",
                public_key_path.display(),
                e
            ),
        })?;

        let refresh_secret = match &config.refresh_secret {
            Some(secret) => {
                if secret.len() < GENERATED_SECRET_BYTES {
                    warn!(
                        "Refresh secret is shorter than {} bytes; consider a longer one",
                        GENERATED_SECRET_BYTES
                    );
                }
                secret.as_bytes().to_vec()
            }
            None => {
                warn!("REFRESH_SECRET not provided, generating a random secret; refresh tokens will not survive a restart");
                generate_refresh_secret().into_bytes()
            }
        };

        let mut material = Self::from_pem(&private_key_pem, &public_key_pem, &refresh_secret)?;
        material.private_key_path = private_key_path;
        material.public_key_path = public_key_path;

        info!("Key material loaded from {}", material.private_key_path.display());
        Ok(material)
    }

    /// Creates key material from PEM strings (useful for testing or embedded keys)
    ///
    /// # Arguments
    ///
    /// * `private_key_pem` - PEM-encoded RSA private key (PKCS#1 or PKCS#8)
    /// * `public_key_pem` - PEM-encoded RSA public key
    /// * `refresh_secret` - HMAC secret for refresh tokens
    pub fn from_pem_strings(
        private_key_pem: &str,
        public_key_pem: &str,
        refresh_secret: &[u8],
    ) -> Result<Self, DomainError> {
        Self::from_pem(
            private_key_pem.as_bytes(),
            public_key_pem.as_bytes(),
            refresh_secret,
        )
    }

    fn from_pem(
        private_key_pem: &[u8],
        public_key_pem: &[u8],
        refresh_secret: &[u8],
    ) -> Result<Self, DomainError> {
        let encoding_key =
            EncodingKey::from_rsa_pem(private_key_pem).map_err(|e| DomainError::KeyMaterial {
                message: format!("Invalid private key format: {}", e),
            })?;

        let decoding_key =
            DecodingKey::from_rsa_pem(public_key_pem).map_err(|e| DomainError::KeyMaterial {
                message: format!("Invalid public key format: {}", e),
            })?;

        if refresh_secret.is_empty() {
            return Err(DomainError::KeyMaterial {
                message: "Refresh secret must not be empty".to_string(),
            });
        }

        Ok(Self {
            encoding_key,
            decoding_key,
            refresh_encoding_key: EncodingKey::from_secret(refresh_secret),
            refresh_decoding_key: DecodingKey::from_secret(refresh_secret),
            refresh_secret: refresh_secret.to_vec(),
            private_key_path: PathBuf::from("memory"),
            public_key_path: PathBuf::from("memory"),
        })
    }

    /// Returns the encoding key for signing identity tokens
    pub fn private_signing_key(&self) -> &EncodingKey {
        &self.encoding_key
    }

    /// Returns the decoding key for verifying identity tokens
    pub fn public_verifying_key(&self) -> &DecodingKey {
        &self.decoding_key
    }

    /// Returns the raw refresh secret
    pub fn refresh_secret(&self) -> &[u8] {
        &self.refresh_secret
    }

    pub(crate) fn refresh_encoding_key(&self) -> &EncodingKey {
        &self.refresh_encoding_key
    }

    pub(crate) fn refresh_decoding_key(&self) -> &DecodingKey {
        &self.refresh_decoding_key
    }

    /// Returns the paths to the key files
    pub fn key_paths(&self) -> (&Path, &Path) {
        (&self.private_key_path, &self.public_key_path)
    }
}

/// Generates an RSA keypair, returned as (PKCS#1 private PEM, SPKI public PEM)
pub fn generate_rsa_pem_pair(bits: usize) -> Result<(String, String), DomainError> {
    let mut rng = rand::thread_rng();
    let private_key = RsaPrivateKey::new(&mut rng, bits).map_err(|e| DomainError::KeyMaterial {
        message: format!("Failed to generate RSA private key: {}", e),
    })?;
    let public_key = RsaPublicKey::from(&private_key);

    let private_pem = private_key
        .to_pkcs1_pem(LineEnding::LF)
        .map_err(|e| DomainError::KeyMaterial {
            message: format!("Failed to encode private key: {}", e),
        })?;
    let public_pem = public_key
        .to_public_key_pem(LineEnding::LF)
        .map_err(|e| DomainError::KeyMaterial {
            message: format!("Failed to encode public key: {}", e),
        })?;

    Ok((private_pem.to_string(), public_pem))
}

fn generate_refresh_secret() -> String {
    let mut bytes = [0u8; GENERATED_SECRET_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

fn write_pem(path: &Path, pem: &str, private: bool) -> Result<(), DomainError> {
    let to_error = |e: std::io::Error| DomainError::KeyMaterial {
        message: format!("Failed to write key file {}: {}", path.display(), e),
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(to_error)?;
    }
    fs::write(path, pem).map_err(to_error)?;

    #[cfg(unix)]
    if private {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(to_error)?;
    }
    #[cfg(not(unix))]
    let _ = private;

    Ok(())
}
