// Settings for the trainer, the history store and the log sinks

use anyhow::bail;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where historical candles come from
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub db_path: PathBuf,
    pub exchange: String,
    pub market: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("data/market_data.sqlite"),
            exchange: "coinbasepro".to_string(),
            market: "BTC-USD".to_string(),
        }
    }
}

/// Evolution engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub population_size: usize,
    /// Length of the labeled window; one candle per minute is expected.
    pub window_seconds: i64,
    /// `None` starts at the earliest stored candle of the market.
    pub window_start: Option<i64>,
    /// 0 keeps the same window every generation.
    pub window_advance_seconds: i64,
    pub min_mutations: usize,
    pub max_mutations: usize,
    pub elite_divisor: usize,
    pub seed: Option<u64>,
    pub max_generations: Option<u64>,
    pub threads: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            population_size: 100,
            window_seconds: 60 * 60 * 60,
            window_start: None,
            window_advance_seconds: 0,
            min_mutations: 10,
            max_mutations: 39,
            elite_divisor: 10,
            seed: None,
            max_generations: None,
            threads: 0,
        }
    }
}

/// Shape of freshly generated networks
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub input_size: usize,
    pub hidden_layers: Vec<usize>,
    pub output_size: usize,
    pub initial_range: f64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            input_size: 14,
            hidden_layers: vec![12, 12, 12],
            output_size: 3,
            initial_range: 5.0,
        }
    }
}

/// Chat log sink configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    pub webhook_url: Option<String>,
    pub bot_name: String,
    pub timeout_seconds: u64,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            bot_name: "Quaestor".to_string(),
            timeout_seconds: 10,
        }
    }
}

/// Main settings structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub data: DataConfig,
    pub training: TrainingConfig,
    pub network: NetworkConfig,
    pub sink: SinkConfig,
}

impl Settings {
    /// Load settings from YAML config file
    pub fn from_yaml(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let settings: Settings = serde_yaml_ng::from_str(&content)?;
        Ok(settings)
    }

    /// Load settings from QUAESTOR_CONFIG or the default config.yaml
    pub fn load() -> anyhow::Result<Self> {
        let config_file =
            std::env::var("QUAESTOR_CONFIG").unwrap_or_else(|_| "config.yaml".to_string());
        Self::from_yaml(&config_file)
    }

    /// Load settings and apply environment variable overrides
    pub fn load_with_env() -> anyhow::Result<Self> {
        let mut settings = Self::load()?;
        settings.apply_env_overrides()?;
        Ok(settings)
    }

    pub fn apply_env_overrides(&mut self) -> anyhow::Result<()> {
        if let Ok(market) = std::env::var("QUAESTOR_MARKET") {
            self.data.market = market;
        }

        if let Ok(db) = std::env::var("QUAESTOR_DB") {
            self.data.db_path = PathBuf::from(db);
        }

        if let Ok(seed) = std::env::var("QUAESTOR_SEED") {
            let seed = seed
                .parse::<u64>()
                .map_err(|e| anyhow::anyhow!("QUAESTOR_SEED is not a number: {}", e))?;
            self.training.seed = Some(seed);
        }

        Ok(())
    }

    /// Save settings to YAML file
    pub fn save(&self, path: impl AsRef<std::path::Path>) -> anyhow::Result<()> {
        let yaml = serde_yaml_ng::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let t = &self.training;
        if t.population_size < 2 {
            bail!("population_size must be at least 2, got {}", t.population_size);
        }
        if t.elite_divisor == 0 {
            bail!("elite_divisor must be > 0");
        }
        if t.min_mutations > t.max_mutations {
            bail!(
                "min_mutations ({}) exceeds max_mutations ({})",
                t.min_mutations,
                t.max_mutations
            );
        }
        if t.window_seconds < 60 {
            bail!("window_seconds must cover at least one minute, got {}", t.window_seconds);
        }
        if t.window_advance_seconds < 0 {
            bail!("window_advance_seconds cannot be negative");
        }

        let n = &self.network;
        if n.hidden_layers.is_empty() || n.hidden_layers.contains(&0) {
            bail!("hidden_layers must be non-empty with non-zero sizes: {:?}", n.hidden_layers);
        }
        if n.input_size == 0 || n.output_size == 0 {
            bail!("input_size and output_size must be > 0");
        }
        if n.initial_range.is_nan() || n.initial_range <= 0.0 {
            bail!("initial_range must be positive");
        }
        Ok(())
    }
}
