// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::load_config::find_in_parent;
use crate::load_config::resolve_config_path;
use anyhow::Context;
use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::{env, path::Path, path::PathBuf};
use tracing::info;

pub const DEFAULT_CONFIG_NAME: &str = "hefl.config.yaml";
pub const ENV_PREFIX: &str = "HEFL_";

/// Named encryption parameter sets
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FhePreset {
    /// Degree 8192, for real deployments
    #[default]
    Secure8192,
    /// Degree 2048. Fast but offers no meaningful security, tests only
    Insecure2048,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct FheConfig {
    pub preset: FhePreset,
    /// Fixed point scale applied to every encoded real value
    pub scale: f64,
}

impl Default for FheConfig {
    fn default() -> Self {
        Self {
            preset: FhePreset::Secure8192,
            scale: 4096.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct GatewayConfig {
    /// How many ciphertext chunks fit into a single ledger transaction
    pub max_chunks_per_tx: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            max_chunks_per_tx: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct DefenderConfig {
    /// Relative spread under which a decrypted vector counts as flat
    pub flat_tolerance: f64,
}

impl Default for DefenderConfig {
    fn default() -> Self {
        Self {
            flat_tolerance: 0.05,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    /// Bound of the uniform factor a masking offset is drawn with. The offset is this factor
    /// times the standard deviation of the submitted values. Large bounds overflow the
    /// plaintext space once norms are squared.
    pub noise_range: f64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self { noise_range: 1.0 }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct DataConfig {
    pub db_path: PathBuf,
    pub in_mem: bool,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(".hefl/db"),
            in_mem: false,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ModelsConfig {
    /// Directory holding initial models as `<name>.json`
    pub dir: Option<PathBuf>,
    /// Extra layer templates keyed by model type
    pub templates: BTreeMap<String, Vec<String>>,
}

/// The config actually used throughout the app
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub fhe: FheConfig,
    pub gateway: GatewayConfig,
    pub defender: DefenderConfig,
    pub client: ClientConfig,
    pub data: DataConfig,
    pub models: ModelsConfig,
    /// The config file that was read, if any
    found_config_file: Option<PathBuf>,
}

impl AppConfig {
    pub fn config_file(&self) -> Option<&PathBuf> {
        self.found_config_file.as_ref()
    }

    /// Database path, resolved against the config file location when relative
    pub fn db_path(&self) -> PathBuf {
        self.relative_to_config(&self.data.db_path)
    }

    pub fn models_dir(&self) -> Option<PathBuf> {
        self.models.dir.as_ref().map(|d| self.relative_to_config(d))
    }

    fn relative_to_config(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            return path.to_path_buf();
        }
        match self.found_config_file.as_ref().and_then(|f| f.parent()) {
            Some(dir) => path_clean::clean(dir.join(path)),
            None => path.to_path_buf(),
        }
    }
}

/// Load the configuration.
///
/// Layers, lowest precedence first: built-in defaults, the YAML file (given explicitly or found
/// by walking up from the working directory), then `HEFL_` prefixed environment variables using
/// `__` to separate nested keys, e.g. `HEFL_GATEWAY__MAX_CHUNKS_PER_TX=30`.
pub fn load_config(config_file: Option<&str>) -> Result<AppConfig> {
    let cwd = env::current_dir()?;
    let resolved = resolve_config_path(
        find_in_parent,
        &cwd,
        DEFAULT_CONFIG_NAME,
        config_file.map(Path::new),
    );

    let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));

    if let Some(path) = &resolved {
        // Explicitly named files must exist
        std::fs::metadata(path)?;
        info!("Loading configuration from {}", path.display());
        figment = figment.merge(Yaml::file(path));
    }

    let mut config: AppConfig = figment
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()
        .context("Could not parse configuration")?;

    config.found_config_file = resolved;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use figment::Jail;

    #[test]
    fn test_deserialization() -> Result<()> {
        let config_str = r#"
fhe:
  preset: insecure_2048
  scale: 1024
gateway:
  max_chunks_per_tx: 2
client:
  noise_range: 0.5
models:
  dir: ./models
  templates:
    Tiny:
      - fc.weight
      - fc.bias
"#;
        let config: AppConfig = serde_yaml::from_str(config_str)?;
        assert_eq!(config.fhe.preset, FhePreset::Insecure2048);
        assert_eq!(config.fhe.scale, 1024.0);
        assert_eq!(config.gateway.max_chunks_per_tx, 2);
        assert_eq!(config.defender.flat_tolerance, 0.05);
        assert_eq!(config.client.noise_range, 0.5);
        assert!(!config.data.in_mem);
        assert_eq!(
            config.models.templates.get("Tiny"),
            Some(&vec!["fc.weight".to_string(), "fc.bias".to_string()])
        );
        Ok(())
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.fhe.preset, FhePreset::Secure8192);
        assert_eq!(config.fhe.scale, 4096.0);
        assert_eq!(config.gateway.max_chunks_per_tx, 60);
        assert_eq!(config.client.noise_range, 1.0);
        assert_eq!(config.db_path(), PathBuf::from(".hefl/db"));
        assert_eq!(config.config_file(), None);
    }

    #[test]
    fn test_file_not_found() -> Result<()> {
        let Err(err) = load_config(Some("/nope/hefl.config.yaml")) else {
            bail!("error expected");
        };
        let Some(e) = err.downcast_ref::<std::io::Error>() else {
            bail!("io error expected");
        };

        assert_eq!(e.kind(), std::io::ErrorKind::NotFound);
        Ok(())
    }

    #[test]
    fn test_file_and_env() {
        Jail::expect_with(|jail| {
            jail.create_file(
                DEFAULT_CONFIG_NAME,
                r#"
fhe:
  preset: insecure_2048
gateway:
  max_chunks_per_tx: 5
data:
  db_path: ./state
"#,
            )?;
            jail.set_env("HEFL_GATEWAY__MAX_CHUNKS_PER_TX", "7");
            jail.set_env("HEFL_DEFENDER__FLAT_TOLERANCE", "0.1");

            let config = load_config(None).map_err(|e| e.to_string())?;

            assert_eq!(config.fhe.preset, FhePreset::Insecure2048);
            assert_eq!(config.gateway.max_chunks_per_tx, 7);
            assert_eq!(config.defender.flat_tolerance, 0.1);

            let Some(dir) = config.config_file().and_then(|f| f.parent()) else {
                return Err("config file should have been found".to_string().into());
            };
            assert_eq!(config.db_path(), dir.join("state"));
            Ok(())
        });
    }
}
