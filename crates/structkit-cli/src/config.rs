use crate::cli::{PcaArgs, PivotArgs, SuperimposeArgs};
use crate::error::{CliError, Result};
use crate::utils::parser;
use directories::ProjectDirs;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use structkit::engine::config::{
    FitMethod, PcaAlgorithm, PcaConfig, PcaConfigBuilder, PivotConfig, PivotConfigBuilder,
    SuperpositionConfig, SuperpositionConfigBuilder,
};
use tracing::debug;

const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialSuperimposeConfig {
    method: Option<FitMethod>,
    tolerance: Option<f64>,
    max_iterations: Option<usize>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialPcaConfig {
    algorithm: Option<PcaAlgorithm>,
    modes: Option<usize>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialPivotConfig {
    func_tol: Option<f64>,
    box_limit: Option<f64>,
    max_iterations: Option<usize>,
}

/// Analysis settings read from a TOML file, before command-line values are merged in.
#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct PartialConfig {
    superimpose: Option<PartialSuperimposeConfig>,
    pca: Option<PartialPcaConfig>,
    pivot: Option<PartialPivotConfig>,
}

fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("org", "structkit", "structkit")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

fn parse_value<T: FromStr>(key: &str, value: &str, kind: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| CliError::Config(format!("Invalid {} value for {}: {}", kind, key, value)))
}

fn parse_enum<T: for<'de> Deserialize<'de>>(key: &str, value: &str) -> Result<T> {
    use serde::de::IntoDeserializer;
    let deserializer: serde::de::value::StrDeserializer<'_, serde::de::value::Error> =
        value.into_deserializer();
    T::deserialize(deserializer)
        .map_err(|e| CliError::Config(format!("Invalid value for {}: {}", key, e)))
}

impl PartialConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    /// Reads `explicit` if given, else the user's configuration file if one exists,
    /// then applies the `-S` overrides.
    pub fn load(explicit: Option<&Path>, set_values: &[String]) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => match default_config_path() {
                Some(path) if path.is_file() => Self::from_file(&path)?,
                _ => {
                    debug!("No configuration file found, using built-in defaults.");
                    Self::default()
                }
            },
        };
        config.apply_set_values(set_values)?;
        Ok(config)
    }

    pub fn superposition(&self, args: &SuperimposeArgs) -> Result<SuperpositionConfig> {
        let file = self.superimpose.clone().unwrap_or_default();
        let mut builder = SuperpositionConfigBuilder::new();
        if let Some(method) = args.method.map(FitMethod::from).or(file.method) {
            builder = builder.method(method);
        }
        if let Some(centroid) = args.centroid {
            builder = builder.centroid(centroid);
        }
        if let Some(tolerance) = file.tolerance {
            builder = builder.tolerance(tolerance);
        }
        if let Some(iterations) = file.max_iterations {
            builder = builder.max_iterations(iterations);
        }
        Ok(builder.build()?)
    }

    pub fn pca(&self, args: &PcaArgs) -> Result<PcaConfig> {
        let file = self.pca.clone().unwrap_or_default();
        let mut builder = PcaConfigBuilder::new();
        if let Some(algorithm) = args.algorithm.map(PcaAlgorithm::from).or(file.algorithm) {
            builder = builder.algorithm(algorithm);
        }
        if let Some(modes) = args.modes.or(file.modes) {
            builder = builder.num_modes(modes);
        }
        Ok(builder.build()?)
    }

    pub fn pivot(&self, args: &PivotArgs) -> Result<PivotConfig> {
        let file = self.pivot.clone().unwrap_or_default();
        let mut builder = PivotConfigBuilder::new();
        if let Some(init) = args.init {
            builder = builder.init_pos(init);
        }
        if let Some(tol) = args.func_tol.or(file.func_tol) {
            builder = builder.func_tol(tol);
        }
        if let Some(limit) = args.box_limit.or(file.box_limit) {
            builder = builder.box_limit(limit);
        }
        if let Some(iterations) = file.max_iterations {
            builder = builder.max_iterations(iterations);
        }
        Ok(builder.build()?)
    }

    fn apply_set_values(&mut self, set_values: &[String]) -> Result<()> {
        for kv_pair in set_values {
            let (key, value_str) =
                parser::parse_key_value(kv_pair).map_err(|e| CliError::Config(e.to_string()))?;

            match key {
                "superimpose.method" => {
                    self.superimpose.get_or_insert_with(Default::default).method =
                        Some(parse_enum(key, value_str)?);
                }
                "superimpose.tolerance" => {
                    self.superimpose.get_or_insert_with(Default::default).tolerance =
                        Some(parse_value(key, value_str, "float")?);
                }
                "superimpose.max-iterations" => {
                    self.superimpose
                        .get_or_insert_with(Default::default)
                        .max_iterations = Some(parse_value(key, value_str, "integer")?);
                }
                "pca.algorithm" => {
                    self.pca.get_or_insert_with(Default::default).algorithm =
                        Some(parse_enum(key, value_str)?);
                }
                "pca.modes" => {
                    self.pca.get_or_insert_with(Default::default).modes =
                        Some(parse_value(key, value_str, "integer")?);
                }
                "pivot.func-tol" => {
                    self.pivot.get_or_insert_with(Default::default).func_tol =
                        Some(parse_value(key, value_str, "float")?);
                }
                "pivot.box-limit" => {
                    self.pivot.get_or_insert_with(Default::default).box_limit =
                        Some(parse_value(key, value_str, "float")?);
                }
                "pivot.max-iterations" => {
                    self.pivot.get_or_insert_with(Default::default).max_iterations =
                        Some(parse_value(key, value_str, "integer")?);
                }
                _ => {
                    return Err(CliError::Config(format!(
                        "Unsupported configuration key for --set: '{}'",
                        key
                    )));
                }
            }
        }
        Ok(())
    }
}
