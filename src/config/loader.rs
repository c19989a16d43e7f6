//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ProxyConfig;
use crate::config::validation::{validate_config, ValidationError};

pub const ENV_SECRET: &str = "IMAGE_PROXY_SECRET";
pub const ENV_TOKEN_TTL: &str = "IMAGE_PROXY_TOKEN_TTL_SECS";
pub const ENV_MAX_TOKEN_TTL: &str = "IMAGE_PROXY_MAX_TOKEN_TTL_SECS";
pub const ENV_ALLOWED_HOSTS: &str = "IMAGE_PROXY_ALLOWED_HOSTS";
pub const ENV_BIND: &str = "IMAGE_PROXY_BIND";
pub const ENV_PUBLIC_BASE_URL: &str = "IMAGE_PROXY_PUBLIC_BASE_URL";
pub const ENV_API_KEYS: &str = "IMAGE_PROXY_API_KEYS";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("{name} is not a valid number: {value}")]
    Env { name: &'static str, value: String },

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration from an optional TOML file, overlay the process
/// environment, and validate the result.
pub fn load_config(path: Option<&Path>) -> Result<ProxyConfig, ConfigError> {
    load_config_with(path, |name| std::env::var(name).ok())
}

/// Same as [`load_config`] with an explicit variable lookup.
pub fn load_config_with<F>(path: Option<&Path>, env: F) -> Result<ProxyConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => ProxyConfig::default(),
    };

    apply_env(&mut config, env)?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Overlay environment variables onto `config`. Unset or blank variables are
/// ignored.
pub fn apply_env<F>(config: &mut ProxyConfig, env: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |name: &str| env(name).filter(|v| !v.trim().is_empty());

    if let Some(secret) = var(ENV_SECRET) {
        config.signing.secret = secret;
    }
    if let Some(ttl) = var(ENV_TOKEN_TTL) {
        config.signing.default_ttl_secs = parse_secs(ENV_TOKEN_TTL, &ttl)?;
    }
    if let Some(ttl) = var(ENV_MAX_TOKEN_TTL) {
        config.signing.max_ttl_secs = parse_secs(ENV_MAX_TOKEN_TTL, &ttl)?;
    }
    if let Some(hosts) = var(ENV_ALLOWED_HOSTS) {
        config.signing.allowed_hosts = split_list(&hosts);
    }
    if let Some(bind) = var(ENV_BIND) {
        config.listener.bind_address = bind.trim().to_string();
    }
    if let Some(base) = var(ENV_PUBLIC_BASE_URL) {
        config.origin.public_base_url = Some(base.trim().to_string());
    }
    if let Some(keys) = var(ENV_API_KEYS) {
        config.auth.api_keys = split_list(&keys);
    }
    Ok(())
}

fn parse_secs(name: &'static str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Env {
        name,
        value: value.to_string(),
    })
}

/// Split a comma-separated list, dropping blanks.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn env_only_configuration() {
        let config = load_config_with(
            None,
            env(&[
                (ENV_SECRET, "from-env"),
                (ENV_TOKEN_TTL, "120"),
                (ENV_ALLOWED_HOSTS, " cdn.example.com, ,img.example.com "),
                (ENV_PUBLIC_BASE_URL, "https://shop.example.com"),
                (ENV_API_KEYS, "k1,k2"),
            ]),
        )
        .unwrap();

        assert_eq!(config.signing.secret, "from-env");
        assert_eq!(config.signing.default_ttl_secs, 120);
        assert_eq!(
            config.signing.allowed_hosts,
            vec!["cdn.example.com".to_string(), "img.example.com".to_string()]
        );
        assert_eq!(config.auth.api_keys.len(), 2);
    }

    #[test]
    fn missing_secret_fails_to_load() {
        let err = load_config_with(None, env(&[])).unwrap_err();
        match err {
            ConfigError::Validation(errors) => {
                assert!(errors.contains(&ValidationError::MissingSecret))
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn allow_list_without_public_origin_fails_to_load() {
        let err = load_config_with(
            None,
            env(&[(ENV_SECRET, "s"), (ENV_ALLOWED_HOSTS, "cdn.example.com")]),
        )
        .unwrap_err();
        match err {
            ConfigError::Validation(errors) => {
                assert_eq!(errors, vec![ValidationError::MissingPublicBaseUrl])
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn bad_number_in_env_is_reported() {
        let err = load_config_with(
            None,
            env(&[(ENV_SECRET, "s"), (ENV_TOKEN_TTL, "five minutes")]),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Env { name: ENV_TOKEN_TTL, .. }));
    }

    #[test]
    fn file_values_are_overridden_by_env() {
        let path = std::env::temp_dir().join(format!("image-proxy-{}.toml", uuid::Uuid::new_v4()));
        let mut file = fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
[signing]
secret = "from-file"
default_ttl_secs = 60
allowed_hosts = ["cdn.example.com"]

[origin]
public_base_url = "https://shop.example.com"

[upstream]
total_timeout_secs = 45
"#
        )
        .unwrap();

        let config = load_config_with(Some(&path), env(&[(ENV_SECRET, "from-env")])).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(config.signing.secret, "from-env");
        assert_eq!(config.signing.default_ttl_secs, 60);
        assert_eq!(config.signing.allowed_hosts, vec!["cdn.example.com".to_string()]);
        assert_eq!(config.upstream.total_timeout_secs, 45);
        assert_eq!(config.upstream.connect_timeout_secs, 5);
    }
}
