use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{NextWaveError, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Address the HTTP functions listen on.
    /// Can be overridden with the `BIND_ADDR` env var.
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Name used in outgoing contact-form emails.
    #[serde(default = "default_site_name")]
    pub site_name: String,

    #[serde(default)]
    pub blog: BlogConfig,

    #[serde(default)]
    pub checkout: CheckoutConfig,

    #[serde(default)]
    pub contact: ContactConfig,
}

// -- Blog generation -----------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct BlogConfig {
    /// Chat model used for generation.
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Wall-clock budget for one provider call.
    #[serde(default = "default_blog_timeout_secs")]
    pub timeout_secs: u64,

    /// OpenAI-compatible API root (without `/chat/completions`).
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    /// System instruction sent ahead of every generated prompt.
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
}

// -- Checkout --------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutConfig {
    #[serde(default = "default_stripe_base_url")]
    pub base_url: String,

    #[serde(default = "default_checkout_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub prices: PlanPrices,
}

/// Stripe price ids for each pricing plan.
#[derive(Debug, Clone, Deserialize)]
pub struct PlanPrices {
    #[serde(default = "default_starter_price")]
    pub starter: String,
    #[serde(default = "default_pro_price")]
    pub pro: String,
    #[serde(default = "default_infinite_price")]
    pub infinite: String,
}

// -- Contact -----------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ContactConfig {
    /// Port used when `SMTP_PORT` is not set.
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,

    #[serde(default = "default_contact_timeout_secs")]
    pub timeout_secs: u64,
}

/// SMTP relay settings, read from the environment only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
}

// -- Defaults ------------------------------------------------------------------

fn default_bind() -> String {
    "127.0.0.1:8787".to_string()
}

fn default_site_name() -> String {
    "NextWave Digital Solutions".to_string()
}

fn default_model() -> String {
    "gpt-4".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    2000
}

fn default_blog_timeout_secs() -> u64 {
    30
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_system_prompt() -> String {
    "You are a professional content writer specializing in creating engaging, \
     SEO-optimized blog posts."
        .to_string()
}

fn default_stripe_base_url() -> String {
    "https://api.stripe.com/v1".to_string()
}

fn default_checkout_timeout_secs() -> u64 {
    20
}

fn default_starter_price() -> String {
    "price_starter".to_string()
}

fn default_pro_price() -> String {
    "price_pro".to_string()
}

fn default_infinite_price() -> String {
    "price_infinite".to_string()
}

fn default_smtp_port() -> u16 {
    587
}

fn default_contact_timeout_secs() -> u64 {
    30
}

impl Default for BlogConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_blog_timeout_secs(),
            base_url: default_openai_base_url(),
            system_prompt: default_system_prompt(),
        }
    }
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            base_url: default_stripe_base_url(),
            timeout_secs: default_checkout_timeout_secs(),
            prices: PlanPrices::default(),
        }
    }
}

impl Default for PlanPrices {
    fn default() -> Self {
        Self {
            starter: default_starter_price(),
            pro: default_pro_price(),
            infinite: default_infinite_price(),
        }
    }
}

impl Default for ContactConfig {
    fn default() -> Self {
        Self {
            smtp_port: default_smtp_port(),
            timeout_secs: default_contact_timeout_secs(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            site_name: default_site_name(),
            blog: BlogConfig::default(),
            checkout: CheckoutConfig::default(),
            contact: ContactConfig::default(),
        }
    }
}

// -- Config impl ---------------------------------------------------------

impl Config {
    /// Load config from the given path, or the default XDG config location.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_config_path(),
        };

        let mut config = if config_path.exists() {
            info!("loading config from {}", config_path.display());
            let contents = std::fs::read_to_string(&config_path).map_err(NextWaveError::Io)?;
            toml::from_str(&contents)
                .map_err(|e| NextWaveError::Config(format!("parse error: {e}")))?
        } else {
            info!("no config file found, using defaults");
            Config::default()
        };

        if let Some(bind) = non_empty_env("BIND_ADDR") {
            config.bind = bind;
        }

        Ok(config)
    }

    /// Returns the default config file path: `$XDG_CONFIG_HOME/nextwave/config.toml`
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join("nextwave")
            .join("config.toml")
    }

    /// OpenAI credential. Absence is not a startup failure.
    pub fn openai_api_key() -> Option<String> {
        non_empty_env("OPENAI_API_KEY")
    }

    pub fn stripe_secret_key() -> Option<String> {
        non_empty_env("STRIPE_SECRET_KEY")
    }

    /// Token callers must present, when the deployment pins one.
    pub fn functions_bearer_token() -> Option<String> {
        non_empty_env("FUNCTIONS_BEARER_TOKEN")
    }

    /// Read SMTP settings from `SMTP_HOST`, `SMTP_PORT`, `SMTP_USER` and
    /// `SMTP_PASS`.  Host, user and password are required.
    pub fn smtp_settings(&self) -> Result<SmtpSettings> {
        let (Some(host), Some(user), Some(password)) = (
            non_empty_env("SMTP_HOST"),
            non_empty_env("SMTP_USER"),
            non_empty_env("SMTP_PASS"),
        ) else {
            return Err(NextWaveError::Config("SMTP credentials not configured".into()));
        };

        let port = match non_empty_env("SMTP_PORT") {
            Some(p) => p
                .parse::<u16>()
                .map_err(|_| NextWaveError::Config(format!("invalid SMTP_PORT: {p}")))?,
            None => self.contact.smtp_port,
        };

        Ok(SmtpSettings {
            host,
            port,
            user,
            password,
        })
    }

    /// Generate the default config file contents.
    pub fn default_config_contents() -> &'static str {
        include_str!("../config.example.toml")
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let c = Config::default();
        assert_eq!(c.bind, "127.0.0.1:8787");
        assert_eq!(c.site_name, "NextWave Digital Solutions");
    }

    #[test]
    fn default_blog_config() {
        let blog = BlogConfig::default();
        assert_eq!(blog.model, "gpt-4");
        assert!((blog.temperature - 0.7).abs() < 0.001);
        assert_eq!(blog.max_tokens, 2000);
        assert_eq!(blog.timeout_secs, 30);
        assert_eq!(blog.base_url, "https://api.openai.com/v1");
        assert!(blog.system_prompt.contains("SEO-optimized blog posts"));
    }

    #[test]
    fn default_checkout_config() {
        let c = CheckoutConfig::default();
        assert_eq!(c.base_url, "https://api.stripe.com/v1");
        assert_eq!(c.prices.starter, "price_starter");
        assert_eq!(c.prices.pro, "price_pro");
        assert_eq!(c.prices.infinite, "price_infinite");
    }

    #[test]
    fn default_contact_config() {
        let c = ContactConfig::default();
        assert_eq!(c.smtp_port, 587);
        assert_eq!(c.timeout_secs, 30);
    }

    #[test]
    fn parse_minimal_toml() {
        let c: Config = toml::from_str(r#"site_name = "Acme Web""#).unwrap();
        assert_eq!(c.site_name, "Acme Web");
        assert_eq!(c.bind, "127.0.0.1:8787");
        assert_eq!(c.blog.timeout_secs, 30);
    }

    #[test]
    fn parse_blog_section() {
        let toml_str = r#"
        [blog]
        model = "gpt-4o-mini"
        temperature = 0.2
        timeout_secs = 10
        "#;
        let c: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(c.blog.model, "gpt-4o-mini");
        assert!((c.blog.temperature - 0.2).abs() < 0.001);
        assert_eq!(c.blog.timeout_secs, 10);
        assert_eq!(c.blog.max_tokens, 2000);
    }

    #[test]
    fn parse_checkout_prices() {
        let toml_str = r#"
        [checkout.prices]
        starter = "price_1AbC"
        "#;
        let c: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(c.checkout.prices.starter, "price_1AbC");
        assert_eq!(c.checkout.prices.pro, "price_pro");
    }

    #[test]
    fn load_nonexistent_returns_defaults() {
        let c = Config::load(Some(Path::new("/tmp/nonexistent-nextwave-test.toml"))).unwrap();
        assert_eq!(c.blog.model, "gpt-4");
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[contact]\nsmtp_port = 2525\n").unwrap();
        let c = Config::load(Some(&path)).unwrap();
        assert_eq!(c.contact.smtp_port, 2525);
    }

    #[test]
    fn load_invalid_toml_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "this is not valid %%% toml").unwrap();
        let result = Config::load(Some(&path));
        assert!(matches!(result, Err(NextWaveError::Config(_))));
    }

    #[test]
    fn default_config_path_has_nextwave() {
        let path = Config::default_config_path();
        assert!(path.to_string_lossy().contains("nextwave"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn default_config_contents_parse() {
        let c: Config = toml::from_str(Config::default_config_contents()).unwrap();
        assert_eq!(c.blog.model, "gpt-4");
        assert_eq!(c.checkout.prices.infinite, "price_infinite");
    }
}
