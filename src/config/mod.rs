mod basic;
mod upstream;

pub use basic::BasicConfig;
pub use upstream::UpstreamConfig;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, sync::LazyLock};

/// Application configuration managed by Figment.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// Core server configuration (see `basic` table in config.toml).
    #[serde(default)]
    pub basic: BasicConfig,

    /// Upstream model endpoints, secret key and retry settings (see `upstream` table).
    #[serde(default)]
    pub upstream: UpstreamConfig,
}

const DEFAULT_CONFIG_FILE: &str = "config.toml";
const ENV_PREFIX: &str = "GROUNDCHAT_";
const RAW_API_KEY_ENV: &str = "GEMINI_API_KEY";

impl Config {
    /// Builds a Figment that merges defaults, an optional config TOML file and the environment.
    ///
    /// `GROUNDCHAT_UPSTREAM__API_KEY` style variables address nested keys; the conventional
    /// `GEMINI_API_KEY` variable is accepted as an alias for `upstream.api_key`.
    pub fn figment() -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));
        if PathBuf::from(DEFAULT_CONFIG_FILE).is_file() {
            figment = figment.merge(Toml::file(DEFAULT_CONFIG_FILE));
        }
        figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .merge(
                Env::raw()
                    .only(&[RAW_API_KEY_ENV])
                    .map(|_| "upstream.api_key".into()),
            )
    }

    /// Loads configuration from all sources.
    ///
    /// A missing API key is not an error here: every entry point reports it at request time.
    pub fn from_optional_toml() -> Self {
        Self::figment().extract().unwrap_or_else(|err| {
            panic!("failed to extract configuration (defaults + config.toml + env): {err}")
        })
    }
}

/// Global, lazily-initialized configuration instance.
pub static CONFIG: LazyLock<Config> = LazyLock::new(Config::from_optional_toml);
