use faresight_catalog::{RouteEntry, VocabularyConfig, DEFAULT_DURATION_MINUTES};
use serde::Deserialize;
use std::collections::HashMap;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub artifacts: ArtifactsConfig,
    #[serde(default)]
    pub reference: ReferenceConfig,
    #[serde(default)]
    pub vocabulary: VocabularyConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ArtifactsConfig {
    /// JSON model artifacts, one predictor each
    pub models: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReferenceConfig {
    /// Historical flights CSV; optional
    pub history_csv: Option<String>,
    #[serde(default = "default_duration")]
    pub default_duration_minutes: u32,
    #[serde(default)]
    pub routes: Vec<RouteEntry>,
    #[serde(default)]
    pub fees: Vec<FeeEntry>,
    #[serde(default)]
    pub default_fee: f64,
}

fn default_duration() -> u32 { DEFAULT_DURATION_MINUTES }

impl Default for ReferenceConfig {
    fn default() -> Self {
        Self {
            history_csv: None,
            default_duration_minutes: DEFAULT_DURATION_MINUTES,
            routes: Vec::new(),
            fees: Vec::new(),
            default_fee: 0.0,
        }
    }
}

// Airline names contain spaces and capitals, so fees are a list rather than a table keyed by name
#[derive(Debug, Deserialize, Clone)]
pub struct FeeEntry {
    pub airline: String,
    pub fee: f64,
}

impl ReferenceConfig {
    pub fn fee_map(&self) -> HashMap<String, f64> {
        self.fees.iter().map(|e| (e.airline.clone(), e.fee)).collect()
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from("config")
    }

    pub fn load_from(dir: &str) -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            // Start off by merging in the "default" configuration file
            .add_source(config::File::with_name(&format!("{}/default", dir)))
            // Environment specific overrides, optional
            .add_source(config::File::with_name(&format!("{}/{}", dir, run_mode)).required(false))
            // Local overrides, not checked in
            .add_source(config::File::with_name(&format!("{}/local", dir)).required(false))
            // Eg.. `FARESIGHT__SERVER__PORT=9000` would set `server.port`
            .add_source(config::Environment::with_prefix("FARESIGHT").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
