//! Where the two services live.
//!
//! See [`Config`].

use reqwest::Client;
pub use validator::Validate;

use crate::nekos::{self, Nekos};
use crate::otaku::{self, Otaku};

/// The base urls of both services, defaulting to the public deployments.
///
/// Nothing is read from the environment or from disk: build it in code,
/// or let [`crate::cli`] fill it from command line flags.
#[non_exhaustive]
#[derive(Debug, Clone, Validate)]
pub struct Config {
    /// See [`nekos::url::BASE_URL`].
    #[validate(url(message = "nekos base url must be a valid url"))]
    pub nekos_base_url: String,
    /// See [`otaku::url::BASE_URL`].
    #[validate(url(message = "otaku base url must be a valid url"))]
    pub otaku_base_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            nekos_base_url: nekos::url::BASE_URL.to_string(),
            otaku_base_url: otaku::url::BASE_URL.to_string(),
        }
    }
}

impl Config {
    /// Not validated until [`Validate::validate`] or one of the constructors below.
    pub fn new(nekos_base_url: impl Into<String>, otaku_base_url: impl Into<String>) -> Self {
        Self {
            nekos_base_url: nekos_base_url.into(),
            otaku_base_url: otaku_base_url.into(),
        }
    }

    /// # Errors
    ///
    /// If the config is invalid, or the url can not be used as a base.
    pub fn nekos(&self, client: Client) -> anyhow::Result<Nekos> {
        self.validate()?;
        Nekos::with_base_url(client, &self.nekos_base_url)
    }

    /// # Errors
    ///
    /// If the config is invalid, or the url can not be used as a base.
    pub fn otaku(&self, client: Client) -> anyhow::Result<Otaku> {
        self.validate()?;
        Otaku::with_base_url(client, &self.otaku_base_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() -> anyhow::Result<()> {
        let config = Config::default();
        config.validate()?;
        assert_eq!(
            config.nekos(Client::new())?.endpoints_url().as_str(),
            "https://nekos.best/api/v2/endpoints"
        );
        assert_eq!(
            config.otaku(Client::new())?.reactions_url().as_str(),
            "https://api.otakugifs.xyz/gif/allreactions"
        );
        Ok(())
    }

    #[test]
    fn test_invalid_urls() {
        let config = Config::new("", otaku::url::BASE_URL);
        config.validate().expect_err("empty url should be invalid");
        assert!(config.nekos(Client::new()).is_err());

        let config = Config::new(nekos::url::BASE_URL, "api.otakugifs.xyz/gif");
        config.validate().expect_err("relative url should be invalid");
        assert!(config.otaku(Client::new()).is_err());
    }
}
