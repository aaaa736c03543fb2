use serde::Deserialize;
use std::path::Path;

/// How identities reaching this proxy were authenticated upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustMode {
    Offline,
    Online,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub trust_mode: TrustMode,
    pub allow_third_party_capes: bool,
    pub cape_provider_retry_factor: u32,
    pub debug_logging: bool,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            trust_mode: TrustMode::Online,
            allow_third_party_capes: true,
            cape_provider_retry_factor: 3,
            debug_logging: false,
        }
    }
}

impl ProxyConfig {
    /// Loads the pipeline configuration from a YAML file. A missing file is
    /// not an error; the defaults apply.
    pub fn load(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .map_err(|err| format!("failed to read {}: {}", path.display(), err))?;
        serde_yaml::from_str(&contents)
            .map_err(|err| format!("failed to parse {}: {}", path.display(), err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_file_missing() {
        let config = ProxyConfig::load(Path::new("/nonexistent/prism.yml")).expect("config");
        assert_eq!(config, ProxyConfig::default());
        assert_eq!(config.trust_mode, TrustMode::Online);
        assert_eq!(config.cape_provider_retry_factor, 3);
        assert!(config.allow_third_party_capes);
    }

    #[test]
    fn parses_yaml_overrides() {
        let config: ProxyConfig = serde_yaml::from_str(
            "trust_mode: offline\nallow_third_party_capes: false\ndebug_logging: true\n",
        )
        .expect("yaml");
        assert_eq!(config.trust_mode, TrustMode::Offline);
        assert!(!config.allow_third_party_capes);
        assert!(config.debug_logging);
        assert_eq!(config.cape_provider_retry_factor, 3);
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config: ProxyConfig =
            serde_yaml::from_str("cape_provider_retry_factor: 1\n").expect("yaml");
        assert_eq!(config.cape_provider_retry_factor, 1);
        assert_eq!(config.trust_mode, TrustMode::Online);
    }
}
