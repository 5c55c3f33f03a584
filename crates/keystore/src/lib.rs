//! Sigil Keystore
//!
//! File-based persistence of the ledger signing key with platform-aware
//! default paths. Each worker process owns exactly one ledger account key;
//! the key doubles as the seal-signature issuer key.

use std::fs;
use std::path::{Path, PathBuf};

use sigil_crypto::SigningKeypair;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum KeystoreError {
    #[error("Failed to read key file: {0}")]
    ReadError(String),
    #[error("Failed to write key file: {0}")]
    WriteError(String),
    #[error("Invalid key format")]
    InvalidFormat,
    #[error("Failed to create directory: {0}")]
    CreateDirError(String),
}

pub type Result<T> = std::result::Result<T, KeystoreError>;

/// Load or generate the ledger signing keypair at a file path.
///
/// If the file exists, loads the 32-byte secret key.
/// If not, generates a new keypair and saves it.
pub fn load_or_generate_keypair(path: &Path) -> Result<SigningKeypair> {
    if path.exists() {
        debug!("Loading ledger key from {}", path.display());
        let bytes = fs::read(path).map_err(|e| KeystoreError::ReadError(e.to_string()))?;
        if bytes.len() != 32 {
            return Err(KeystoreError::InvalidFormat);
        }
        let mut secret = [0u8; 32];
        secret.copy_from_slice(&bytes);
        Ok(SigningKeypair::from_secret_bytes(&secret))
    } else {
        info!("Generating new ledger key at {}", path.display());
        let keypair = SigningKeypair::generate();
        save_key_bytes(path, &keypair.secret_key_bytes())?;
        Ok(keypair)
    }
}

/// Save raw key bytes to a file, creating parent directories as needed.
pub fn save_key_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| KeystoreError::CreateDirError(e.to_string()))?;
    }
    fs::write(path, bytes).map_err(|e| KeystoreError::WriteError(e.to_string()))
}

/// Default key file path for a worker service name.
pub fn default_key_path_for(service: &str) -> PathBuf {
    default_config_dir_for(service).join("keys").join("ledger.key")
}

/// Default config directory for a service name.
///
/// - macOS: `~/Library/Application Support/{service}`
/// - Linux: `$XDG_CONFIG_HOME/{service}` or `~/.config/{service}`
/// - elsewhere: `~/.{service}`
pub fn default_config_dir_for(service: &str) -> PathBuf {
    #[cfg(target_os = "macos")]
    {
        home_dir()
            .join("Library")
            .join("Application Support")
            .join(service.to_lowercase())
    }
    #[cfg(target_os = "linux")]
    {
        let xdg = std::env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| home_dir().join(".config"));
        xdg.join(service.to_lowercase())
    }
    #[cfg(not(any(target_os = "macos", target_os = "linux")))]
    {
        home_dir().join(format!(".{}", service.to_lowercase()))
    }
}

fn home_dir() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}
