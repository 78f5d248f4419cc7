use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;

use crate::error::ConfigError;

/// Longest accepted renewal interval (one year)
pub const MAX_RENEWAL_INTERVAL_HOURS: u64 = 24 * 365;

/// Control surface and scheduler settings (`config/system.json`)
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct SystemConfig {
    #[serde(rename = "web_enable")]
    pub web_enabled: bool,
    pub web_user: String,
    pub web_pass: String,
    #[serde(rename = "listen")]
    pub listen_addr: String,
    #[serde(rename = "cron_hours")]
    pub renewal_interval_hours: u64,
}

/// Single IP certificate installed to many destinations (`config/ip.json`)
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct IpCertConfig {
    #[serde(rename = "enable")]
    pub enabled: bool,
    pub ip_addr: String,
    pub webroot: String,
    #[serde(rename = "email")]
    pub contact_email: String,
    #[serde(rename = "renew_days")]
    pub validity_days: u32,
    #[serde(rename = "install_paths")]
    pub install_targets: Vec<String>,
}

/// One certificate per domain, one destination each (`config/domain.json`)
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct DomainCertConfig {
    #[serde(rename = "enable")]
    pub enabled: bool,
    #[serde(rename = "email")]
    pub contact_email: String,
    #[serde(rename = "renew_days")]
    pub validity_days: u32,
    pub domains: Vec<DomainEntry>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct DomainEntry {
    #[serde(rename = "domain")]
    pub domain_name: String,
    pub webroot: String,
    pub install_path: String,
}

/// A document that can be validated after it has been parsed
pub trait Validate {
    fn validate(&self) -> Result<(), ConfigError>;
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            web_enabled: true,
            web_user: "admin".to_string(),
            web_pass: "123456".to_string(),
            listen_addr: ":8089".to_string(),
            renewal_interval_hours: 6,
        }
    }
}

impl Default for IpCertConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ip_addr: "203.0.113.5".to_string(),
            webroot: "/www/wwwroot/203.0.113.5".to_string(),
            contact_email: "admin@example.com".to_string(),
            validity_days: 3,
            install_targets: vec!["/www/server/panel/vhost/cert/203.0.113.5".to_string()],
        }
    }
}

impl Default for DomainCertConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            contact_email: "admin@example.com".to_string(),
            validity_days: 60,
            domains: vec![DomainEntry {
                domain_name: "example.com".to_string(),
                webroot: "/www/wwwroot/example.com".to_string(),
                install_path: "/www/server/panel/vhost/cert/example.com".to_string(),
            }],
        }
    }
}

impl SystemConfig {
    /// Resolve `listen` into a bindable address. `:8089` means every interface.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        parse_listen_addr(&self.listen_addr)
    }
}

impl Validate for SystemConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.socket_addr()?;
        if self.renewal_interval_hours == 0 {
            return Err(ConfigError::validation("cron_hours", "must be at least 1"));
        }
        if self.renewal_interval_hours > MAX_RENEWAL_INTERVAL_HOURS {
            return Err(ConfigError::validation(
                "cron_hours",
                format!("must be at most {}", MAX_RENEWAL_INTERVAL_HOURS),
            ));
        }
        if self.web_enabled && self.web_user.is_empty() {
            return Err(ConfigError::validation("web_user", "must not be empty while web_enable is set"));
        }
        Ok(())
    }
}

impl Validate for IpCertConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.ip_addr.trim().is_empty() {
            return Err(ConfigError::validation("ip_addr", "must not be empty"));
        }
        check_validity_days(self.validity_days)?;
        check_absolute("webroot", &self.webroot)?;
        for target in &self.install_targets {
            check_absolute("install_paths", target)?;
        }
        Ok(())
    }
}

impl Validate for DomainCertConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        check_validity_days(self.validity_days)?;
        for entry in &self.domains {
            if entry.domain_name.trim().is_empty() {
                return Err(ConfigError::validation("domain", "must not be empty"));
            }
            check_absolute("webroot", &entry.webroot)?;
            check_absolute("install_path", &entry.install_path)?;
        }
        Ok(())
    }
}

fn check_validity_days(days: u32) -> Result<(), ConfigError> {
    if days == 0 {
        return Err(ConfigError::validation("renew_days", "must be a positive number of days"));
    }
    Ok(())
}

fn check_absolute(field: &str, path: &str) -> Result<(), ConfigError> {
    if !Path::new(path).is_absolute() {
        return Err(ConfigError::validation(field, format!("`{}` is not an absolute path", path)));
    }
    Ok(())
}

pub fn parse_listen_addr(listen: &str) -> Result<SocketAddr, ConfigError> {
    let normalized = if listen.starts_with(':') {
        format!("0.0.0.0{}", listen)
    } else {
        listen.to_string()
    };
    normalized
        .parse()
        .map_err(|_| ConfigError::validation("listen", format!("`{}` is not a socket address", listen)))
}

/// Parse and validate a submitted document
pub fn parse_document<T>(bytes: &[u8]) -> Result<T, ConfigError>
where
    T: DeserializeOwned + Validate,
{
    let doc: T = serde_json::from_slice(bytes)?;
    doc.validate()?;
    Ok(doc)
}

pub fn load_document<T>(path: &Path) -> Result<T, ConfigError>
where
    T: DeserializeOwned + Validate,
{
    let bytes = std::fs::read(path).map_err(|e| ConfigError::io(path, e))?;
    parse_document(&bytes)
}

/// Write `doc` as pretty JSON via a temporary sibling file and an atomic rename
pub fn save_document<T: Serialize>(path: &Path, doc: &T) -> Result<(), ConfigError> {
    let mut body = serde_json::to_vec_pretty(doc)?;
    body.push(b'\n');

    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, &body).map_err(|e| ConfigError::io(&tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| ConfigError::io(path, e))?;
    Ok(())
}
