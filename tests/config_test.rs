use cert_renewer::config::{
    load_document, parse_document, save_document, DomainCertConfig, IpCertConfig, SystemConfig,
};
use cert_renewer::state::{ConfigStore, Layout};
use serde::{de::DeserializeOwned, Serialize};
use std::path::Path;

fn assert_fixed_point<T>(path: &Path)
where
    T: DeserializeOwned + Serialize + cert_renewer::config::Validate,
{
    let before = std::fs::read(path).unwrap();
    let doc: T = load_document(path).unwrap();
    save_document(path, &doc).unwrap();
    let after = std::fs::read(path).unwrap();
    assert_eq!(before, after, "{} changed on save(load())", path.display());
}

#[tokio::test]
async fn test_save_load_idempotent_for_all_documents() {
    let dir = tempfile::tempdir().unwrap();
    let store = ConfigStore::open(Layout::new(dir.path())).unwrap();
    let layout = store.layout().clone();

    assert_fixed_point::<SystemConfig>(&layout.system_file());
    assert_fixed_point::<IpCertConfig>(&layout.ip_file());
    assert_fixed_point::<DomainCertConfig>(&layout.domain_file());
}

#[tokio::test]
async fn test_store_write_then_reload_matches() {
    let dir = tempfile::tempdir().unwrap();
    let store = ConfigStore::open(Layout::new(dir.path())).unwrap();

    let mut domain = store.domain().await;
    domain.validity_days = 30;
    domain.domains.push(cert_renewer::config::DomainEntry {
        domain_name: "example.org".to_string(),
        webroot: "/srv/www/example.org".to_string(),
        install_path: "/etc/certs/example.org".to_string(),
    });
    store.replace_domain(domain.clone()).await.unwrap();

    let reopened = ConfigStore::open(Layout::new(dir.path())).unwrap();
    assert_eq!(reopened.domain().await, domain);
    assert_fixed_point::<DomainCertConfig>(&reopened.layout().domain_file());
}

#[test]
fn test_hand_written_document_with_other_key_order_loads() {
    let body = br#"{
        "install_paths": ["/etc/certs/ip"],
        "renew_days": 5,
        "email": "ops@example.com",
        "webroot": "/srv/www/ip",
        "ip_addr": "198.51.100.7",
        "enable": false
    }"#;
    let doc: IpCertConfig = parse_document(body).unwrap();
    assert!(!doc.enabled);
    assert_eq!(doc.validity_days, 5);
    assert_eq!(doc.install_targets, vec!["/etc/certs/ip"]);
}

#[test]
fn test_missing_field_in_system_document() {
    let body = br#"{"web_enable":true,"web_user":"admin","listen":":8089","cron_hours":6}"#;
    let err = parse_document::<SystemConfig>(body).unwrap_err();
    assert!(err.is_client_error());
    assert!(err.to_string().contains("web_pass"));
}
