//! Runtime configuration, read from command-line flags with environment fallbacks.

use clap::Args;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Base URL of the local development API.
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000/api/";

#[derive(Debug, Clone, Args)]
pub struct StorefrontConfig {
    /// Storefront API base URL
    #[arg(long, env = "STOREFRONT_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: Url,

    /// Directory holding the guest cart and session tokens
    #[arg(long, env = "STOREFRONT_DATA_DIR", default_value = ".storefront")]
    pub data_dir: PathBuf,

    /// Per-request timeout in seconds
    #[arg(long, env = "STOREFRONT_TIMEOUT_SECS", default_value_t = 10)]
    pub timeout_secs: u64,
}

impl StorefrontConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Debug, Parser)]
    struct TestCli {
        #[command(flatten)]
        config: StorefrontConfig,
    }

    #[test]
    fn test_flags_override_defaults() {
        let cli = TestCli::parse_from([
            "storefront",
            "--api-url",
            "https://shop.example.com/api/",
            "--timeout-secs",
            "3",
        ]);
        assert_eq!(cli.config.api_url.as_str(), "https://shop.example.com/api/");
        assert_eq!(cli.config.timeout(), Duration::from_secs(3));
    }

    #[test]
    fn test_invalid_url_is_rejected() {
        let result = TestCli::try_parse_from(["storefront", "--api-url", "not a url"]);
        assert!(result.is_err());
    }
}
