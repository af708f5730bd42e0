use anyhow::{Context, Result, anyhow};
use dotenvy::dotenv;
use keyring::Entry;
use nhost_storage::Auth;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use url::Url;

pub const KEYRING_SERVICE: &str = "nhost-storage-admin-secret";
pub const KEYRING_USER: &str = "Nhost";

#[derive(Debug, Deserialize, Serialize, Default, PartialEq)]
pub struct ConfigFile {
    pub storage_url: Option<Url>,
    pub default_bucket_id: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct ConfigEnv {
    nhost_storage_url: Option<Url>,
    nhost_default_bucket_id: Option<String>,
    nhost_admin_secret: Option<String>,
    nhost_access_token: Option<String>,
}

pub struct Config {
    pub storage_url: Url,
    pub default_bucket_id: Option<String>,
    pub auth: Option<Auth>,
}

fn merge_config(
    base: ConfigFile,
    override_config: ConfigEnv,
    keyring_secret: impl FnOnce() -> Option<String>,
) -> Result<Config> {
    let storage_url = override_config
        .nhost_storage_url
        .or(base.storage_url)
        .ok_or(anyhow!("No storage URL provided"))?;

    let default_bucket_id = override_config
        .nhost_default_bucket_id
        .or(base.default_bucket_id);

    let auth = if let Some(token) = override_config.nhost_access_token {
        Some(Auth::Bearer(token))
    } else if let Some(secret) = override_config.nhost_admin_secret {
        Some(Auth::AdminSecret(secret))
    } else {
        keyring_secret().map(Auth::AdminSecret)
    };

    if auth.is_none() {
        debug!("no credentials configured, sending anonymous requests");
    }

    Ok(Config {
        storage_url,
        default_bucket_id,
        auth,
    })
}

fn keyring_admin_secret() -> Option<String> {
    let secret = Entry::new(KEYRING_SERVICE, KEYRING_USER).and_then(|entry| entry.get_secret());
    admin_secret_from_keyring(secret)
}

fn admin_secret_from_keyring(secret: keyring::Result<Vec<u8>>) -> Option<String> {
    match secret {
        Ok(bytes) => match String::from_utf8(bytes) {
            Ok(secret) => Some(secret),
            Err(err) => {
                warn!(error = %err, "admin secret in OS keyring is not valid UTF-8, ignoring it");
                None
            }
        },
        Err(keyring::Error::NoEntry) => None,
        Err(err) => {
            warn!(error = %err, "unable to read admin secret from OS keyring");
            None
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let project_dirs = directories::ProjectDirs::from("io", "nhost", "nhost-storage")
        .ok_or(anyhow!("Unable to determine home directory"))?;
    Ok(project_dirs.config_dir().join("config.toml"))
}

pub fn read_config_file(path: &Path) -> Result<ConfigFile> {
    if let Ok(config) = fs::read_to_string(path) {
        toml::from_str(&config).with_context(|| format!("Invalid config file {}", path.display()))
    } else {
        Ok(ConfigFile::default())
    }
}

pub fn write_config_file(path: &Path, config: &ConfigFile) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("Failed to create config directory")?;
    }
    let contents = toml::to_string_pretty(config)?;
    fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

pub fn read_config() -> Result<Config> {
    let _ = dotenv();
    let env_config = envy::from_env::<ConfigEnv>().unwrap_or_default();
    let file_config = read_config_file(&config_path()?)?;

    merge_config(file_config, env_config, keyring_admin_secret)
}

pub fn write_config(config: ConfigFile) -> Result<()> {
    write_config_file(&config_path()?, &config)
}

pub fn set_admin_secret_keyring(admin_secret: String) -> Result<()> {
    let entry = Entry::new(KEYRING_SERVICE, KEYRING_USER)?;
    entry.set_secret(admin_secret.as_bytes())?;
    println!("Admin secret set for use with nhost-storage");
    Ok(())
}
