//! Integration tests for TOML + env configuration loading.
//!
//! Uses figment::Jail for sandboxed file and env var manipulation.

use campus_config::{CampusConfig, StorageBackend};
use campus_core::Role;
use figment::{
    Figment, Jail,
    providers::{Env, Format, Serialized, Toml},
};
use pretty_assertions::assert_eq;

#[test]
fn loads_storage_config_from_toml() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            r#"
[storage]
backend = "memory"
path = "/var/lib/campus/identity.json"
legacy_keys = ["token", "jwt"]
"#,
        )?;

        let config: CampusConfig = Figment::from(Serialized::defaults(CampusConfig::default()))
            .merge(Toml::file("config.toml"))
            .extract()?;

        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.storage.path, "/var/lib/campus/identity.json");
        assert_eq!(config.storage.legacy_keys, vec!["token", "jwt"]);
        Ok(())
    });
}

#[test]
fn loads_assistant_config_from_toml() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            r#"
[assistant]
poll_interval_ms = 1500
guest_sessions = false
portal = "faculty"
"#,
        )?;

        let config: CampusConfig = Figment::from(Serialized::defaults(CampusConfig::default()))
            .merge(Toml::file("config.toml"))
            .extract()?;

        assert_eq!(config.assistant.poll_interval_ms, 1500);
        assert!(!config.assistant.guest_sessions);
        assert_eq!(config.assistant.portal, Role::Faculty);
        Ok(())
    });
}

#[test]
fn partial_toml_keeps_defaults() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            r#"
[api]
base_url = "https://erp.example.edu/api"
"#,
        )?;

        let config: CampusConfig = Figment::from(Serialized::defaults(CampusConfig::default()))
            .merge(Toml::file("config.toml"))
            .extract()?;

        assert_eq!(config.api.base_url, "https://erp.example.edu/api");
        assert_eq!(config.api.timeout_secs, 10);
        assert_eq!(config.assistant.poll_interval_ms, 5000);
        assert_eq!(config.storage.legacy_keys.len(), 4);
        Ok(())
    });
}

#[test]
fn env_overrides_project_toml() {
    Jail::expect_with(|jail| {
        jail.create_dir(".campus")?;
        jail.create_file(
            ".campus/config.toml",
            r#"
[assistant]
poll_interval_ms = 1000
"#,
        )?;
        jail.set_env("CAMPUS_ASSISTANT__POLL_INTERVAL_MS", "250");
        jail.set_env("CAMPUS_API__TIMEOUT_SECS", "3");

        let config = CampusConfig::load().expect("config loads");
        assert_eq!(config.assistant.poll_interval_ms, 250);
        assert_eq!(config.api.timeout_secs, 3);
        Ok(())
    });
}

#[test]
fn project_toml_is_picked_up_by_load() {
    Jail::expect_with(|jail| {
        jail.create_dir(".campus")?;
        jail.create_file(
            ".campus/config.toml",
            r#"
[session]
credential_max_age_days = 30
"#,
        )?;

        let config = CampusConfig::load().expect("config loads");
        assert_eq!(config.session.credential_max_age_days, 30);
        Ok(())
    });
}

#[test]
fn load_rejects_zero_poll_interval_from_env() {
    Jail::expect_with(|jail| {
        jail.set_env("CAMPUS_ASSISTANT__POLL_INTERVAL_MS", "0");
        let err = CampusConfig::load().unwrap_err();
        assert!(err.to_string().contains("poll_interval_ms"));
        Ok(())
    });
}

#[test]
fn figment_env_layer_uses_double_underscore() {
    Jail::expect_with(|jail| {
        jail.set_env("CAMPUS_STORAGE__BACKEND", "memory");
        let config: CampusConfig = Figment::from(Serialized::defaults(CampusConfig::default()))
            .merge(Env::prefixed("CAMPUS_").split("__"))
            .extract()?;
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        Ok(())
    });
}
