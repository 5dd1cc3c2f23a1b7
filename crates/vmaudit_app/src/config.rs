//! `vmaudit.ron` loading.
//!
//! Passwords never live in the config file: each endpoint names the
//! environment variable that holds its password, and a `.env` file next to
//! the working directory is loaded first when present.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context};
use secrecy::SecretString;
use serde::Deserialize;
use vmaudit_engine::{ClientSettings, Endpoint, DEFAULT_CAPACITY};

const DEFAULT_CLOUD_ID_KEY: &str = "vCloud.uuid";

#[derive(Debug, Clone, Deserialize)]
pub struct EndpointConfig {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub fallback_url: Option<String>,
    pub username: String,
    /// Environment variable holding the password.
    pub password_env: String,
}

impl EndpointConfig {
    pub fn resolve(&self, lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Endpoint> {
        let Some(password) = lookup(&self.password_env) else {
            bail!(
                "environment variable {} (password for {}) is not set",
                self.password_env,
                self.name
            );
        };
        Ok(Endpoint {
            name: self.name.clone(),
            url: self.url.clone(),
            fallback_url: self.fallback_url.clone(),
            username: self.username.clone(),
            password: SecretString::from(password),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub vcenters: Vec<EndpointConfig>,
    #[serde(default)]
    pub cloud_director: Option<EndpointConfig>,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_cloud_id_key")]
    pub cloud_id_key: String,
    /// Accept self-signed certificates on every endpoint.
    #[serde(default)]
    pub insecure: bool,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_concurrency() -> usize {
    DEFAULT_CAPACITY
}

fn default_cloud_id_key() -> String {
    DEFAULT_CLOUD_ID_KEY.to_string()
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("reports")
}

impl AppConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parsing config file {}", path.display()))
    }

    pub fn parse(text: &str) -> anyhow::Result<Self> {
        let config: AppConfig = ron::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.vcenters.is_empty() {
            bail!("at least one vCenter must be configured");
        }
        if self.concurrency == 0 {
            bail!("concurrency must be at least 1");
        }
        let mut seen = HashSet::new();
        for vcenter in &self.vcenters {
            if !seen.insert(vcenter.name.to_ascii_lowercase()) {
                bail!("vCenter name {:?} is configured twice", vcenter.name);
            }
        }
        Ok(())
    }

    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            accept_invalid_certs: self.insecure,
        }
    }

    /// Picks the vCenter a single-endpoint report should use.
    pub fn select_vcenter(&self, name: Option<&str>) -> anyhow::Result<&EndpointConfig> {
        match name {
            Some(name) => self
                .vcenters
                .iter()
                .find(|vcenter| vcenter.name.eq_ignore_ascii_case(name))
                .with_context(|| format!("no vCenter named {name:?} in the config")),
            None if self.vcenters.len() == 1 => Ok(&self.vcenters[0]),
            None => bail!(
                "{} vCenters are configured; choose one with --vcenter",
                self.vcenters.len()
            ),
        }
    }
}

/// Reads a password from the process environment.
pub fn env_lookup(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    const SAMPLE: &str = r#"(
        vcenters: [
            (
                name: "vc01",
                url: "https://vc01.example.com",
                fallback_url: Some("https://vc01-b.example.com"),
                username: "audit@vsphere.local",
                password_env: "VC01_PASSWORD",
            ),
            (
                name: "vc02",
                url: "https://vc02.example.com",
                username: "audit@vsphere.local",
                password_env: "VC02_PASSWORD",
            ),
        ],
        cloud_director: Some((
            name: "vcd",
            url: "https://vcd.example.com",
            username: "audit@System",
            password_env: "VCD_PASSWORD",
        )),
        concurrency: 16,
        insecure: true,
    )"#;

    #[test]
    fn parses_sample_and_applies_defaults() {
        let config = AppConfig::parse(SAMPLE).unwrap();
        assert_eq!(config.vcenters.len(), 2);
        assert_eq!(config.concurrency, 16);
        assert_eq!(config.cloud_id_key, "vCloud.uuid");
        assert_eq!(config.output_dir, PathBuf::from("reports"));
        assert!(config.cloud_director.is_some());

        let settings = config.client_settings();
        assert!(settings.accept_invalid_certs);
        assert_eq!(settings.request_timeout, Duration::from_secs(60));
    }

    #[test]
    fn resolves_passwords_through_lookup() {
        let config = AppConfig::parse(SAMPLE).unwrap();
        let env = HashMap::from([("VC01_PASSWORD".to_string(), "pw1".to_string())]);
        let lookup = |name: &str| env.get(name).cloned();

        let endpoint = config.vcenters[0].resolve(lookup).unwrap();
        assert_eq!(endpoint.password.expose_secret(), "pw1");
        assert_eq!(
            endpoint.fallback_url.as_deref(),
            Some("https://vc01-b.example.com")
        );

        let err = config.vcenters[1].resolve(lookup).unwrap_err();
        assert!(err.to_string().contains("VC02_PASSWORD"));
    }

    #[test]
    fn vcenter_selection() {
        let config = AppConfig::parse(SAMPLE).unwrap();
        assert_eq!(config.select_vcenter(Some("VC02")).unwrap().name, "vc02");
        assert!(config.select_vcenter(Some("vc09")).is_err());
        assert!(config.select_vcenter(None).is_err());
    }

    #[test]
    fn rejects_invalid_configs() {
        assert!(AppConfig::parse("(vcenters: [])").is_err());
        let zero = SAMPLE.replace("concurrency: 16", "concurrency: 0");
        assert!(AppConfig::parse(&zero).is_err());
        let twice = SAMPLE.replace("\"vc02\"", "\"VC01\"");
        assert!(AppConfig::parse(&twice).is_err());
    }

    #[test]
    fn shipped_sample_config_parses() {
        let config = AppConfig::parse(include_str!("../../../docs/vmaudit.ron")).unwrap();
        assert_eq!(config.vcenters.len(), 2);
        assert_eq!(config.concurrency, DEFAULT_CAPACITY);
    }

    #[test]
    fn load_reports_missing_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let err = AppConfig::load(&temp.path().join("absent.ron")).unwrap_err();
        assert!(err.to_string().contains("reading config file"));

        let path = temp.path().join("vmaudit.ron");
        fs::write(&path, SAMPLE).unwrap();
        assert_eq!(AppConfig::load(&path).unwrap().vcenters[0].name, "vc01");
    }
}
