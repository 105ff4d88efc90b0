//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{net::IpAddr, net::SocketAddr, path::PathBuf, str::FromStr, time::Duration};

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::domain::types::StorageBackend;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "innesto";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PUBLIC_PORT: u16 = 3000;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_SITE_ROOT: &str = "public";
const DEFAULT_SOURCE_DIR: &str = "source/_posts";

/// Command-line arguments for the Innesto binary.
#[derive(Debug, Parser)]
#[command(name = "innesto", version, about = "Hybrid blog content server")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "INNESTO_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the HTTP service.
    Serve(ServeArgs),
    /// Export stored posts into the static generator's source tree.
    Sync(SyncArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct SyncArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the public listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the public listener port.
    #[arg(long = "server-public-port", value_name = "PORT")]
    pub public_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the storage backend (kv|blob).
    #[arg(long = "storage-backend", value_name = "BACKEND")]
    pub storage_backend: Option<String>,

    /// Override the storage data directory.
    #[arg(long = "storage-data-dir", value_name = "PATH")]
    pub storage_data_dir: Option<PathBuf>,

    /// Override the static site output directory served to readers.
    #[arg(long = "site-root", value_name = "PATH")]
    pub site_root: Option<PathBuf>,

    /// Override the generator source directory used by `sync`.
    #[arg(long = "site-source-dir", value_name = "PATH")]
    pub site_source_dir: Option<PathBuf>,
}

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub storage: StorageSettings,
    pub site: SiteSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub public_addr: SocketAddr,
    pub graceful_shutdown: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct StorageSettings {
    pub backend: StorageBackend,
    pub data_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct SiteSettings {
    pub root: PathBuf,
    pub source_dir: PathBuf,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Parse CLI arguments and load settings in one step.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let cli = CliArgs::parse();
    let settings = load(&cli)?;
    Ok((cli, settings))
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("INNESTO").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_overrides(&args.overrides),
        Some(Command::Sync(args)) => raw.apply_overrides(&args.overrides),
        None => raw.apply_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    storage: RawStorageSettings,
    site: RawSiteSettings,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    public_port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawStorageSettings {
    backend: Option<String>,
    data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSiteSettings {
    root: Option<PathBuf>,
    source_dir: Option<PathBuf>,
}

impl RawSettings {
    fn apply_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.public_port {
            self.server.public_port = Some(port);
        }
        if let Some(seconds) = overrides.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(backend) = overrides.storage_backend.as_ref() {
            self.storage.backend = Some(backend.clone());
        }
        if let Some(dir) = overrides.storage_data_dir.as_ref() {
            self.storage.data_dir = Some(dir.clone());
        }
        if let Some(root) = overrides.site_root.as_ref() {
            self.site.root = Some(root.clone());
        }
        if let Some(dir) = overrides.site_source_dir.as_ref() {
            self.site.source_dir = Some(dir.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            storage,
            site,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            storage: build_storage_settings(storage)?,
            site: build_site_settings(site)?,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let public_port = server.public_port.unwrap_or(DEFAULT_PUBLIC_PORT);
    if public_port == 0 {
        return Err(LoadError::invalid(
            "server.public_port",
            "port must be greater than zero",
        ));
    }

    let public_addr = parse_socket_addr(&host, public_port)
        .map_err(|reason| LoadError::invalid("server.public_addr", reason))?;

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    if graceful_secs == 0 {
        return Err(LoadError::invalid(
            "server.graceful_shutdown_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ServerSettings {
        public_addr,
        graceful_shutdown: Duration::from_secs(graceful_secs),
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_storage_settings(storage: RawStorageSettings) -> Result<StorageSettings, LoadError> {
    let backend = match storage.backend.as_deref() {
        Some(value) => StorageBackend::try_from(value).map_err(|_| {
            LoadError::invalid("storage.backend", format!("unknown backend `{value}`"))
        })?,
        None => StorageBackend::Kv,
    };

    let data_dir = storage
        .data_dir
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
    if data_dir.as_os_str().is_empty() {
        return Err(LoadError::invalid(
            "storage.data_dir",
            "path must not be empty",
        ));
    }

    Ok(StorageSettings { backend, data_dir })
}

fn build_site_settings(site: RawSiteSettings) -> Result<SiteSettings, LoadError> {
    let root = site
        .root
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SITE_ROOT));
    if root.as_os_str().is_empty() {
        return Err(LoadError::invalid("site.root", "path must not be empty"));
    }

    let source_dir = site
        .source_dir
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SOURCE_DIR));
    if source_dir.as_os_str().is_empty() {
        return Err(LoadError::invalid(
            "site.source_dir",
            "path must not be empty",
        ));
    }

    Ok(SiteSettings { root, source_dir })
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let ip = IpAddr::from_str(host).map_err(|err| format!("invalid host `{host}`: {err}"))?;
    Ok(SocketAddr::new(ip, port))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw() -> RawSettings {
        RawSettings::default()
    }

    #[test]
    fn defaults_resolve_to_local_kv_deployment() {
        let settings = Settings::from_raw(raw()).expect("settings");

        assert_eq!(settings.server.public_addr.port(), DEFAULT_PUBLIC_PORT);
        assert_eq!(settings.storage.backend, StorageBackend::Kv);
        assert_eq!(settings.storage.data_dir, PathBuf::from(DEFAULT_DATA_DIR));
        assert_eq!(settings.site.root, PathBuf::from(DEFAULT_SITE_ROOT));
        assert!(matches!(settings.logging.format, LogFormat::Compact));
    }

    #[test]
    fn overrides_take_precedence_over_defaults() {
        let mut settings = raw();
        settings.apply_overrides(&ServeOverrides {
            server_host: Some("0.0.0.0".to_string()),
            public_port: Some(8080),
            storage_backend: Some("blob".to_string()),
            log_json: Some(true),
            ..Default::default()
        });

        let settings = Settings::from_raw(settings).expect("settings");
        assert_eq!(settings.server.public_addr.to_string(), "0.0.0.0:8080");
        assert_eq!(settings.storage.backend, StorageBackend::Blob);
        assert!(matches!(settings.logging.format, LogFormat::Json));
    }

    #[test]
    fn zero_port_is_rejected() {
        let mut settings = raw();
        settings.server.public_port = Some(0);
        assert!(Settings::from_raw(settings).is_err());
    }

    #[test]
    fn unknown_backend_is_rejected() {
        let mut settings = raw();
        settings.storage.backend = Some("postgres".to_string());
        assert!(Settings::from_raw(settings).is_err());
    }
}
