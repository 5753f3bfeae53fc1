use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::path::Path;

const DEFAULT_LISTEN_ADDR: &str = "localhost:8082";
const DEFAULT_CORS_ORIGIN: &str = "http://localhost:3000";
const DEFAULT_SESSION_TTL_HOURS: u32 = 24;

const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;
const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 4;
const USER_AGENT_DEFAULT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Outbound YouTube lookups.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VideoConfig {
    /// Per-request timeout for oEmbed and watch page calls
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    /// Upper bound on song creations fetching metadata at the same time
    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,

    /// Fail song creation when no view count can be scraped
    /// instead of storing 0
    #[serde(default)]
    pub require_view_count: bool,

    /// Browser User-Agent sent with watch page requests
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            max_concurrent_fetches: DEFAULT_MAX_CONCURRENT_FETCHES,
            require_view_count: false,
            user_agent: USER_AGENT_DEFAULT.to_string(),
        }
    }
}

fn default_fetch_timeout_secs() -> u64 {
    DEFAULT_FETCH_TIMEOUT_SECS
}

fn default_max_concurrent_fetches() -> usize {
    DEFAULT_MAX_CONCURRENT_FETCHES
}

fn default_user_agent() -> String {
    USER_AGENT_DEFAULT.to_string()
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Frontend origin allowed by CORS
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,

    #[serde(default = "default_session_ttl_hours")]
    pub session_ttl_hours: u32,

    /// bcrypt work factor
    #[serde(default = "default_password_cost")]
    pub password_cost: u32,

    /// Insert a few albums when the catalog is empty
    #[serde(default = "default_seed_albums")]
    pub seed_albums: bool,

    #[serde(default)]
    pub video: VideoConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            cors_origin: DEFAULT_CORS_ORIGIN.to_string(),
            session_ttl_hours: DEFAULT_SESSION_TTL_HOURS,
            password_cost: bcrypt::DEFAULT_COST,
            seed_albums: true,
            video: VideoConfig::default(),
        }
    }
}

fn default_listen_addr() -> String {
    DEFAULT_LISTEN_ADDR.to_string()
}

fn default_cors_origin() -> String {
    DEFAULT_CORS_ORIGIN.to_string()
}

fn default_session_ttl_hours() -> u32 {
    DEFAULT_SESSION_TTL_HOURS
}

fn default_password_cost() -> u32 {
    bcrypt::DEFAULT_COST
}

fn default_seed_albums() -> bool {
    true
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.listen_addr.trim().is_empty() {
            bail!("listen_addr cannot be empty");
        }

        if self.session_ttl_hours == 0 {
            bail!("session_ttl_hours must be greater than 0");
        }

        if !(4..=31).contains(&self.password_cost) {
            bail!(
                "password_cost must be between 4 and 31, got {}",
                self.password_cost
            );
        }

        let video = &self.video;
        if video.fetch_timeout_secs == 0 {
            bail!("video.fetch_timeout_secs must be greater than 0");
        }

        if video.max_concurrent_fetches == 0 {
            bail!("video.max_concurrent_fetches must be greater than 0");
        }

        if video.user_agent.trim().is_empty() {
            bail!("video.user_agent cannot be empty");
        }

        Ok(())
    }

    /// Read `config.yaml` from `base_path`, writing defaults on first run.
    pub fn load_with(base_path: &str) -> anyhow::Result<Self> {
        let path = Path::new(base_path).join("config.yaml");

        // create new if does not exist
        if !path.exists() {
            log::info!("Creating default config at {}", path.display());
            std::fs::create_dir_all(base_path)?;
            std::fs::write(&path, serde_yml::to_string(&Self::default())?)?;
        }

        let config_str = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: Self = serde_yml::from_str(&config_str).context("config is malformed")?;

        config.validate()?;

        // resave in case config version needs an upgrade
        let current = serde_yml::to_string(&config)?;
        if config_str != current {
            std::fs::write(&path, current)?;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_writes_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let base_path = tmp.path().to_str().unwrap();

        let config = Config::load_with(base_path).unwrap();
        assert_eq!(config.listen_addr, DEFAULT_LISTEN_ADDR);
        assert_eq!(config.video.max_concurrent_fetches, DEFAULT_MAX_CONCURRENT_FETCHES);
        assert!(!config.video.require_view_count);
        assert!(tmp.path().join("config.yaml").exists());
    }

    #[test]
    fn test_load_fills_missing_fields() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(
            tmp.path().join("config.yaml"),
            "listen_addr: 0.0.0.0:9000\nvideo:\n  require_view_count: true\n",
        )
        .unwrap();

        let config = Config::load_with(tmp.path().to_str().unwrap()).unwrap();
        assert_eq!(config.listen_addr, "0.0.0.0:9000");
        assert!(config.video.require_view_count);
        assert_eq!(config.video.fetch_timeout_secs, DEFAULT_FETCH_TIMEOUT_SECS);
        assert_eq!(config.session_ttl_hours, DEFAULT_SESSION_TTL_HOURS);

        let saved = std::fs::read_to_string(tmp.path().join("config.yaml")).unwrap();
        assert!(saved.contains("session_ttl_hours"));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(
            tmp.path().join("config.yaml"),
            "video:\n  max_concurrent_fetches: 0\n",
        )
        .unwrap();

        assert!(Config::load_with(tmp.path().to_str().unwrap()).is_err());
    }
}
