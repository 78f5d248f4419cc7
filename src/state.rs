use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

use crate::config::{
    load_document, save_document, DomainCertConfig, IpCertConfig, SystemConfig, Validate,
};
use crate::error::ConfigError;
use crate::web;

/// On-disk layout beneath the base directory
#[derive(Debug, Clone)]
pub struct Layout {
    base: PathBuf,
}

impl Layout {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn config_dir(&self) -> PathBuf {
        self.base.join("config")
    }

    pub fn system_file(&self) -> PathBuf {
        self.config_dir().join("system.json")
    }

    pub fn ip_file(&self) -> PathBuf {
        self.config_dir().join("ip.json")
    }

    pub fn domain_file(&self) -> PathBuf {
        self.config_dir().join("domain.json")
    }

    pub fn web_dir(&self) -> PathBuf {
        self.base.join("web")
    }

    pub fn index_page(&self) -> PathBuf {
        self.web_dir().join("index.html")
    }

    pub fn log_dir(&self) -> PathBuf {
        self.base.join("logs")
    }

    pub fn run_dir(&self) -> PathBuf {
        self.base.join("run")
    }

    /// Create the directory tree and write defaults for anything missing
    pub fn ensure(&self) -> Result<(), ConfigError> {
        for dir in [self.config_dir(), self.web_dir(), self.log_dir(), self.run_dir()] {
            std::fs::create_dir_all(&dir).map_err(|e| ConfigError::io(&dir, e))?;
        }

        write_default_if_absent(&self.system_file(), &SystemConfig::default())?;
        write_default_if_absent(&self.ip_file(), &IpCertConfig::default())?;
        write_default_if_absent(&self.domain_file(), &DomainCertConfig::default())?;

        let page = self.index_page();
        if !page.exists() {
            std::fs::write(&page, web::INDEX_HTML).map_err(|e| ConfigError::io(&page, e))?;
            info!("Wrote default control page to {}", page.display());
        }
        Ok(())
    }
}

fn write_default_if_absent<T: serde::Serialize>(path: &Path, doc: &T) -> Result<(), ConfigError> {
    if path.exists() {
        return Ok(());
    }
    save_document(path, doc)?;
    info!("Wrote default configuration to {}", path.display());
    Ok(())
}

/// Shared holder of the three configuration documents.
///
/// Reads hand out owned snapshots. Writes validate, persist, and only then
/// replace the in-memory copy, so a failed write changes nothing.
#[derive(Clone)]
pub struct ConfigStore {
    layout: Layout,
    system: Arc<RwLock<SystemConfig>>,
    ip: Arc<RwLock<IpCertConfig>>,
    domain: Arc<RwLock<DomainCertConfig>>,
}

impl ConfigStore {
    pub fn new(
        layout: Layout,
        system: SystemConfig,
        ip: IpCertConfig,
        domain: DomainCertConfig,
    ) -> Self {
        Self {
            layout,
            system: Arc::new(RwLock::new(system)),
            ip: Arc::new(RwLock::new(ip)),
            domain: Arc::new(RwLock::new(domain)),
        }
    }

    /// Prepare the layout and load all three documents from disk
    pub fn open(layout: Layout) -> Result<Self, ConfigError> {
        layout.ensure()?;
        let system = load_document(&layout.system_file())?;
        let ip = load_document(&layout.ip_file())?;
        let domain = load_document(&layout.domain_file())?;
        Ok(Self::new(layout, system, ip, domain))
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub async fn system(&self) -> SystemConfig {
        self.system.read().await.clone()
    }

    pub async fn ip(&self) -> IpCertConfig {
        self.ip.read().await.clone()
    }

    pub async fn domain(&self) -> DomainCertConfig {
        self.domain.read().await.clone()
    }

    pub async fn replace_system(&self, doc: SystemConfig) -> Result<(), ConfigError> {
        replace(&self.system, &self.layout.system_file(), doc).await
    }

    pub async fn replace_ip(&self, doc: IpCertConfig) -> Result<(), ConfigError> {
        replace(&self.ip, &self.layout.ip_file(), doc).await
    }

    pub async fn replace_domain(&self, doc: DomainCertConfig) -> Result<(), ConfigError> {
        replace(&self.domain, &self.layout.domain_file(), doc).await
    }
}

async fn replace<T>(slot: &RwLock<T>, path: &Path, doc: T) -> Result<(), ConfigError>
where
    T: serde::Serialize + Validate,
{
    doc.validate()?;
    // Holding the write lock across the save keeps disk and memory in the same order.
    let mut current = slot.write().await;
    save_document(path, &doc)?;
    *current = doc;
    info!("Persisted configuration to {}", path.display());
    Ok(())
}
