//! Sigil App
//!
//! Unified initialization for Sigil services: logging + keystore + settings.
//! Every worker binary starts by building an [`App`] over its own config
//! type, then wires the queue, store, and ledger backends itself.

use std::path::Path;

use serde::{de::DeserializeOwned, Serialize};
use sigil_crypto::SigningKeypair;
use sigil_logging::LogLevel;
use sigil_settings::{Settings, SettingsError};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Settings error: {0}")]
    SettingsError(#[from] SettingsError),
    #[error("Keystore error: {0}")]
    KeystoreError(#[from] sigil_keystore::KeystoreError),
}

/// How the service is being run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppType {
    /// Interactive invocation (one-off tooling).
    Cli,
    /// Long-running worker process.
    Daemon,
}

impl AppType {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Cli => "CLI",
            Self::Daemon => "Daemon",
        }
    }
}

/// Initialized application context. The keypair doubles as the batch
/// issuer key for issue workers.
pub struct App<T> {
    pub service: String,
    pub app_type: AppType,
    pub keypair: SigningKeypair,
    pub settings: Settings<T>,
}

/// Builder for constructing an App with configurable options.
pub struct AppBuilder<T> {
    service: String,
    app_type: AppType,
    log_level: LogLevel,
    skip_logging: bool,
    skip_banner: bool,
    config_path: Option<String>,
    _phantom: std::marker::PhantomData<T>,
}

impl<T: Serialize + DeserializeOwned + Default> AppBuilder<T> {
    pub fn new(service: &str) -> Self {
        Self {
            service: service.to_string(),
            app_type: AppType::Daemon,
            log_level: LogLevel::Info,
            skip_logging: false,
            skip_banner: false,
            config_path: None,
            _phantom: std::marker::PhantomData,
        }
    }

    pub fn app_type(mut self, app_type: AppType) -> Self {
        self.app_type = app_type;
        self
    }

    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.log_level = LogLevel::from_verbose(verbose);
        self
    }

    pub fn skip_logging(mut self) -> Self {
        self.skip_logging = true;
        self
    }

    pub fn skip_banner(mut self) -> Self {
        self.skip_banner = true;
        self
    }

    pub fn config_path(mut self, path: &str) -> Self {
        self.config_path = Some(path.to_string());
        self
    }

    pub fn build(self) -> Result<App<T>, AppError> {
        if !self.skip_logging {
            let _ = sigil_logging::try_init(self.log_level);
        }

        let key_path = sigil_keystore::default_key_path_for(&self.service);
        let keypair = sigil_keystore::load_or_generate_keypair(&key_path)?;

        let config_path = self.config_path.as_deref().map(Path::new);
        let settings = Settings::load_or_default(&self.service, config_path)?;

        if !self.skip_banner {
            info!(
                "{} {} ({}) starting — issuer key: {}",
                self.service,
                env!("CARGO_PKG_VERSION"),
                self.app_type.name(),
                hex::encode(keypair.public_key_bytes()),
            );
        }

        Ok(App {
            service: self.service,
            app_type: self.app_type,
            keypair,
            settings,
        })
    }
}
