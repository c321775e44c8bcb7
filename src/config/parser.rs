use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// Every section is optional; missing keys take their defaults.
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use sumi_glean::config::load_config;
///
/// let config = load_config(Path::new("glean.toml")).unwrap();
/// println!("Workers: {}", config.crawl.workers);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses and validates configuration from TOML text
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// The hash is logged with every job so results can be traced back to the
/// settings that produced them.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    Ok(hash_content(&content))
}

fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

/// Loads a configuration and returns both the config and its hash
///
/// Without a path the built-in defaults are used and the hash is computed
/// over an empty document.
pub fn load_config_with_hash(path: Option<&Path>) -> Result<(Config, String), ConfigError> {
    match path {
        Some(path) => {
            let config = load_config(path)?;
            let hash = compute_config_hash(path)?;
            Ok((config, hash))
        }
        None => Ok((Config::default(), hash_content(""))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_valid_config() {
        let config_content = r#"
[fetch]
user-agent = "TestGleaner/1.0"
timeout-secs = 20
connect-timeout-secs = 5

[crawl]
workers = 4
max-depth = 3
max-consecutive-failures = 5
request-delay-ms = 250
job-deadline-secs = 120

[output]
download-dir = "./out"
database-path = "./results.db"
"#;

        let file = create_temp_config(config_content);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.fetch.user_agent, "TestGleaner/1.0");
        assert_eq!(config.fetch.timeout_secs, 20);
        assert_eq!(config.crawl.workers, 4);
        assert_eq!(config.crawl.max_depth, 3);
        assert_eq!(config.crawl.request_delay_ms, 250);
        assert_eq!(config.output.database_path.as_deref(), Some("./results.db"));
        // untouched sections keep defaults
        assert_eq!(config.render.page_timeout_secs, 30);
        assert_eq!(config.crawl.sitemap_max_depth, 3);
        assert_eq!(config.output.download_url_prefix, "/download");
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.crawl.workers, 2);
        assert_eq!(config.fetch.timeout_secs, 30);
        assert_eq!(config.crawl.request_delay_ms, 1000);
        assert!(config.output.database_path.is_none());
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/glean.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let file = create_temp_config("this is not valid TOML {{{");
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_config_with_validation_error() {
        let file = create_temp_config("[crawl]\nworkers = 0\n");
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_compute_config_hash() {
        let file = create_temp_config("test content");

        let hash1 = compute_config_hash(file.path()).unwrap();
        let hash2 = compute_config_hash(file.path()).unwrap();

        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_different_content_different_hash() {
        let file1 = create_temp_config("content 1");
        let file2 = create_temp_config("content 2");

        let hash1 = compute_config_hash(file1.path()).unwrap();
        let hash2 = compute_config_hash(file2.path()).unwrap();

        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_defaults_without_path() {
        let (config, hash) = load_config_with_hash(None).unwrap();
        assert_eq!(config.crawl.workers, 2);
        assert_eq!(hash.len(), 64);
    }
}
