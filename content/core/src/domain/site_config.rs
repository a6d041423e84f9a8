// Copyright (c) 2026 Alpheric Digital
// SPDX-License-Identifier: AGPL-3.0

// Site Configuration Types
//
// Defines the configuration schema for the content layer, including:
// - Kubernetes-style manifest format (apiVersion/kind/metadata/spec)
// - CMS endpoint, content host and credentials
// - Slug resolution policy
// - Fallback candidate names for kinds that are not listed from the CMS

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use crate::domain::entity::EntityKind;
use crate::domain::resource::ApiToken;

pub const API_VERSION: &str = "alpheric.com/v1";
pub const KIND: &str = "SiteConfig";

/// Top-level site configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfigManifest {
    /// API version (must be "alpheric.com/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "SiteConfig")
    pub kind: String,

    pub metadata: ManifestMetadata,

    pub spec: SiteConfigSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    /// Site name, e.g. "alpheric-web"
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SiteConfigSpec {
    #[serde(default)]
    pub cms: CmsConfig,

    #[serde(default)]
    pub slugs: SlugConfig,

    /// Display names tried when a kind's cache is empty and the kind is
    /// resolved from a fixed list rather than a CMS listing
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fallback_names: BTreeMap<EntityKind, Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CmsConfig {
    /// REST API base URL (requests go to `<base_url>/api/...`)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Host that relative attachment paths are served from
    #[serde(default = "default_base_url")]
    pub content_host: String,

    /// "key:secret" token (supports "env:VAR_NAME")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,

    /// Per-request timeout
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// `limit_page_length` for list requests; 0 lists everything
    #[serde(default)]
    pub list_page_length: u32,
}

impl Default for CmsConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            content_host: default_base_url(),
            api_token: None,
            timeout_seconds: default_timeout_seconds(),
            list_page_length: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlugConfig {
    /// Accept "hyphens as spaces" display-name matches after an exact miss
    #[serde(default = "default_true")]
    pub lenient_fallback: bool,

    /// Suffix colliding slugs with a short name hash
    #[serde(default = "default_true")]
    pub disambiguate_collisions: bool,
}

impl Default for SlugConfig {
    fn default() -> Self {
        Self {
            lenient_fallback: true,
            disambiguate_collisions: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_base_url() -> String {
    "https://cms.alpheric.com".to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

impl Default for SiteConfigManifest {
    fn default() -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ManifestMetadata {
                name: "alpheric-web".to_string(),
                labels: None,
            },
            spec: SiteConfigSpec::default(),
        }
    }
}

impl SiteConfigManifest {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover configuration file using precedence order
    /// 1. ALPHERIC_CONFIG_PATH environment variable
    /// 2. ./alpheric-config.yaml (working directory)
    /// 3. ~/.alpheric/config.yaml (user home)
    /// 4. /etc/alpheric/config.yaml (system, Unix) or C:\ProgramData\Alpheric\config.yaml (Windows)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("ALPHERIC_CONFIG_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./alpheric-config.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".alpheric").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        #[cfg(unix)]
        let system_config = PathBuf::from("/etc/alpheric/config.yaml");
        #[cfg(windows)]
        let system_config = PathBuf::from("C:\\ProgramData\\Alpheric\\config.yaml");

        if system_config.exists() {
            return Some(system_config);
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // An explicit path must exist and parse
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path)
                .map_err(|e| anyhow::anyhow!("Failed to load config at {:?}: {}", path, e))?;
            config.apply_env_overrides();
            return Ok(config);
        }

        if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            let mut config = Self::from_yaml_file(config_path)?;
            config.apply_env_overrides();
            Ok(config)
        } else {
            tracing::warn!("No configuration file found in standard locations. Using defaults.");
            let mut config = Self::default();
            config.apply_env_overrides();
            Ok(config)
        }
    }

    /// Apply environment variable overrides so deployments can inject
    /// credentials and endpoints without editing the file
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(token) = lookup("ALPHERIC_API_TOKEN").filter(|t| !t.trim().is_empty()) {
            tracing::info!("Environment override: ALPHERIC_API_TOKEN=***");
            self.spec.cms.api_token = Some(token);
        }

        if let Some(url) = lookup("ALPHERIC_CMS_BASE_URL") {
            tracing::info!("Environment override: ALPHERIC_CMS_BASE_URL={}", url);
            self.spec.cms.base_url = url;
        }

        if let Some(host) = lookup("ALPHERIC_CONTENT_HOST") {
            tracing::info!("Environment override: ALPHERIC_CONTENT_HOST={}", host);
            self.spec.cms.content_host = host;
        }

        if let Some(val) = lookup("ALPHERIC_LENIENT_SLUGS") {
            match val.to_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => self.spec.slugs.lenient_fallback = true,
                "false" | "0" | "no" | "off" => self.spec.slugs.lenient_fallback = false,
                _ => {
                    tracing::warn!(
                        "Invalid value for ALPHERIC_LENIENT_SLUGS: '{}'. Expected true/false. Ignoring.",
                        val
                    );
                }
            }
        }
    }

    /// Token from config, resolving "env:VAR_NAME" indirection
    pub fn api_token(&self) -> Option<ApiToken> {
        let raw = self.spec.cms.api_token.as_deref()?.trim();
        let value = match raw.strip_prefix("env:") {
            Some(var) => std::env::var(var).ok()?,
            None => raw.to_string(),
        };
        if value.trim().is_empty() {
            None
        } else {
            Some(ApiToken::new(value))
        }
    }

    pub fn fallback_names(&self, kind: EntityKind) -> &[String] {
        self.spec
            .fallback_names
            .get(&kind)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != API_VERSION {
            anyhow::bail!(
                "Invalid apiVersion: '{}'. Must be '{}'",
                self.api_version,
                API_VERSION
            );
        }

        if self.kind != KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, KIND);
        }

        if self.metadata.name.is_empty() {
            anyhow::bail!("metadata.name cannot be empty");
        }

        for (field, value) in [
            ("spec.cms.base_url", &self.spec.cms.base_url),
            ("spec.cms.content_host", &self.spec.cms.content_host),
        ] {
            let parsed = url::Url::parse(value)
                .map_err(|e| anyhow::anyhow!("{} is not a valid URL ('{}'): {}", field, value, e))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                anyhow::bail!("{} must be an http(s) URL, got '{}'", field, value);
            }
        }

        if self.spec.cms.timeout_seconds == 0 {
            anyhow::bail!("spec.cms.timeout_seconds must be greater than zero");
        }

        for (kind, names) in &self.spec.fallback_names {
            if names.iter().any(|name| name.trim().is_empty()) {
                anyhow::bail!("fallback_names for {} contains a blank name", kind);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_manifest() {
        let manifest = SiteConfigManifest::default();
        assert_eq!(manifest.api_version, "alpheric.com/v1");
        assert_eq!(manifest.kind, "SiteConfig");
        assert!(manifest.spec.slugs.lenient_fallback);
        assert_eq!(manifest.spec.cms.list_page_length, 0);
        assert!(manifest.validate().is_ok());
    }

    #[test]
    fn test_parse_minimal_yaml_with_fallbacks() {
        let yaml = r#"
apiVersion: alpheric.com/v1
kind: SiteConfig
metadata:
  name: staging
spec:
  cms:
    base_url: https://staging-cms.alpheric.com
    api_token: "abc:def"
  fallback_names:
    Pilot: ["Dreamers", "Makers"]
"#;
        let manifest = SiteConfigManifest::from_yaml_str(yaml).unwrap();
        assert_eq!(manifest.metadata.name, "staging");
        assert_eq!(manifest.spec.cms.timeout_seconds, 30);
        assert_eq!(manifest.spec.cms.content_host, "https://cms.alpheric.com");
        assert_eq!(manifest.fallback_names(EntityKind::Pilot), ["Dreamers", "Makers"]);
        assert!(manifest.fallback_names(EntityKind::CaseStudy).is_empty());
        assert_eq!(manifest.api_token().unwrap().as_str(), "abc:def");
        assert!(manifest.validate().is_ok());
    }

    #[test]
    fn test_load_from_explicit_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "apiVersion: alpheric.com/v1\nkind: SiteConfig\nmetadata:\n  name: from-file\nspec: {{}}"
        )
        .unwrap();

        let manifest = SiteConfigManifest::load_or_default(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(manifest.metadata.name, "from-file");
    }

    #[test]
    fn test_missing_explicit_file_fails() {
        let result = SiteConfigManifest::load_or_default(Some(PathBuf::from(
            "/nonexistent/alpheric-config.yaml",
        )));
        assert!(result.is_err());
    }

    #[test]
    fn test_env_overrides() {
        let mut manifest = SiteConfigManifest::default();
        let env: HashMap<&str, &str> = HashMap::from([
            ("ALPHERIC_API_TOKEN", "k:s"),
            ("ALPHERIC_CONTENT_HOST", "https://files.alpheric.com"),
            ("ALPHERIC_LENIENT_SLUGS", "off"),
        ]);
        manifest.apply_overrides_from(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(manifest.spec.cms.api_token.as_deref(), Some("k:s"));
        assert_eq!(manifest.spec.cms.content_host, "https://files.alpheric.com");
        assert_eq!(manifest.spec.cms.base_url, "https://cms.alpheric.com");
        assert!(!manifest.spec.slugs.lenient_fallback);
    }

    #[test]
    fn test_validation() {
        let mut manifest = SiteConfigManifest::default();

        manifest.api_version = "wrong/v1".to_string();
        assert!(manifest.validate().is_err());
        manifest.api_version = API_VERSION.to_string();

        manifest.spec.cms.base_url = "ftp://cms".to_string();
        assert!(manifest.validate().is_err());
        manifest.spec.cms.base_url = "https://cms.alpheric.com".to_string();

        manifest.spec.cms.timeout_seconds = 0;
        assert!(manifest.validate().is_err());
        manifest.spec.cms.timeout_seconds = 10;

        manifest
            .spec
            .fallback_names
            .insert(EntityKind::Pilot, vec!["Dreamers".into(), " ".into()]);
        assert!(manifest.validate().is_err());
    }

    #[test]
    fn test_blank_token_is_absent() {
        let mut manifest = SiteConfigManifest::default();
        manifest.spec.cms.api_token = Some("   ".to_string());
        assert!(manifest.api_token().is_none());
    }
}
