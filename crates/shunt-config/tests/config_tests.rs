#[cfg(test)]
mod tests {
    use shunt_config::schema::*;
    use shunt_config::ConfigLoader;
    use std::io::Write;

    // ── Defaults ───────────────────────────────────────────────

    #[test]
    fn test_gateway_defaults() {
        let config = ShuntConfig::default();
        assert_eq!(config.gateway.access_token, "");
        assert_eq!(config.gateway.timeout, 60);
        assert_eq!(config.gateway.circuit_breaker.failure_threshold, 5);
        assert_eq!(config.gateway.circuit_breaker.reset_timeout, 600);
        assert_eq!(config.gateway.circuit_breaker.probe_probability, 0.05);
        assert!(config.providers.is_empty());
    }

    #[test]
    fn test_server_and_logging_defaults() {
        let config = ShuntConfig::default();
        assert_eq!(config.server.listen, "0.0.0.0:8080");
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, "json");
    }

    // ── Parsing ────────────────────────────────────────────────

    const SAMPLE: &str = r#"
[gateway]
access_token = "secret"
timeout = 30

[gateway.circuit_breaker]
failure_threshold = 3
reset_timeout = 120
probe_probability = 0.1

[[providers]]
name = "primary"
base_url = "https://api.primary.com"
token = "sk-primary"

[[providers]]
name = "backup"
base_url = "https://api.backup.com/"
token = "sk-backup"

[server]
listen = "127.0.0.1:9000"
"#;

    #[test]
    fn test_parse_sample() {
        let config: ShuntConfig = toml::from_str(SAMPLE).unwrap();
        assert_eq!(config.gateway.access_token, "secret");
        assert_eq!(config.gateway.timeout, 30);
        assert_eq!(config.gateway.circuit_breaker.failure_threshold, 3);
        assert_eq!(config.providers.len(), 2);
        assert_eq!(config.providers[0].name, "primary");
        assert_eq!(config.providers[1].token, "sk-backup");
        assert_eq!(config.server.listen, "127.0.0.1:9000");
    }

    #[test]
    fn test_loader_trims_trailing_slash() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let loader = ConfigLoader::load(Some(file.path())).unwrap();
        let config = loader.get();
        assert_eq!(config.providers[1].base_url, "https://api.backup.com");
    }

    #[test]
    fn test_loader_missing_file_is_error() {
        let result = ConfigLoader::load(Some(std::path::Path::new(
            "/nonexistent/shunt.toml",
        )));
        assert!(result.is_err());
    }

    // ── Validation ─────────────────────────────────────────────

    #[test]
    fn test_validate_requires_providers() {
        let config = ShuntConfig::default();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_sample_passes() {
        let config: ShuntConfig = toml::from_str(SAMPLE).unwrap();
        let warnings = config.validate().unwrap();
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_validate_empty_access_token_warns() {
        let mut config: ShuntConfig = toml::from_str(SAMPLE).unwrap();
        config.gateway.access_token.clear();
        let warnings = config.validate().unwrap();
        assert!(warnings
            .iter()
            .any(|w| w.field == "gateway.access_token"));
    }

    #[test]
    fn test_validate_rejects_bad_probe_probability() {
        let mut config: ShuntConfig = toml::from_str(SAMPLE).unwrap();
        config.gateway.circuit_breaker.probe_probability = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_threshold() {
        let mut config: ShuntConfig = toml::from_str(SAMPLE).unwrap();
        config.gateway.circuit_breaker.failure_threshold = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_duplicate_provider_names() {
        let mut config: ShuntConfig = toml::from_str(SAMPLE).unwrap();
        config.providers[1].name = "primary".into();
        assert!(config.validate().is_err());
    }

    // ── TOML roundtrip ─────────────────────────────────────────

    #[test]
    fn test_config_toml_roundtrip() {
        let config: ShuntConfig = toml::from_str(SAMPLE).unwrap();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let restored: ShuntConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(restored.gateway.access_token, config.gateway.access_token);
        assert_eq!(restored.providers, config.providers);
    }
}
