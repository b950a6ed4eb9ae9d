use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Invalid value for '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

fn positive(name: &'static str, value: f64) -> Result<f64, ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::InvalidParameter {
            name,
            reason: format!("expected a positive finite number, got {value}"),
        })
    }
}

fn nonzero(name: &'static str, value: usize) -> Result<usize, ConfigError> {
    if value > 0 {
        Ok(value)
    } else {
        Err(ConfigError::InvalidParameter {
            name,
            reason: "must be at least 1".to_string(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitMethod {
    /// Fit every member onto the first one.
    #[default]
    First,
    /// Iteratively fit every member onto the ensemble mean.
    Mean,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PcaAlgorithm {
    /// Eigendecomposition of the covariance matrix.
    #[default]
    Eigen,
    /// Singular value decomposition of the weighted deviation matrix.
    Svd,
}

pub const DEFAULT_FIT_TOLERANCE: f64 = 1e-10;
pub const DEFAULT_FIT_MAX_ITERATIONS: usize = 10_000;
pub const DEFAULT_PCA_MODES: usize = 4;
pub const DEFAULT_PIVOT_FUNC_TOL: f64 = 1e-5;
pub const DEFAULT_PIVOT_BOX_LIMIT: f64 = 200.0;
pub const DEFAULT_PIVOT_MAX_ITERATIONS: usize = 100_000;

#[derive(Debug, Clone, PartialEq)]
pub struct SuperpositionConfig {
    pub method: FitMethod,
    /// A fixed centroid used instead of the per-member centroids.
    pub centroid: Option<Point3<f64>>,
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl Default for SuperpositionConfig {
    fn default() -> Self {
        Self {
            method: FitMethod::default(),
            centroid: None,
            tolerance: DEFAULT_FIT_TOLERANCE,
            max_iterations: DEFAULT_FIT_MAX_ITERATIONS,
        }
    }
}

#[derive(Default)]
pub struct SuperpositionConfigBuilder {
    method: Option<FitMethod>,
    centroid: Option<Point3<f64>>,
    tolerance: Option<f64>,
    max_iterations: Option<usize>,
}

impl SuperpositionConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: FitMethod) -> Self {
        self.method = Some(method);
        self
    }
    pub fn centroid(mut self, centroid: Point3<f64>) -> Self {
        self.centroid = Some(centroid);
        self
    }
    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = Some(tolerance);
        self
    }
    pub fn max_iterations(mut self, iterations: usize) -> Self {
        self.max_iterations = Some(iterations);
        self
    }

    pub fn build(self) -> Result<SuperpositionConfig, ConfigError> {
        Ok(SuperpositionConfig {
            method: self.method.unwrap_or_default(),
            centroid: self.centroid,
            tolerance: positive("tolerance", self.tolerance.unwrap_or(DEFAULT_FIT_TOLERANCE))?,
            max_iterations: nonzero(
                "max_iterations",
                self.max_iterations.unwrap_or(DEFAULT_FIT_MAX_ITERATIONS),
            )?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PcaConfig {
    pub algorithm: PcaAlgorithm,
    pub num_modes: usize,
}

impl Default for PcaConfig {
    fn default() -> Self {
        Self {
            algorithm: PcaAlgorithm::default(),
            num_modes: DEFAULT_PCA_MODES,
        }
    }
}

#[derive(Default)]
pub struct PcaConfigBuilder {
    algorithm: Option<PcaAlgorithm>,
    num_modes: Option<usize>,
}

impl PcaConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn algorithm(mut self, algorithm: PcaAlgorithm) -> Self {
        self.algorithm = Some(algorithm);
        self
    }
    pub fn num_modes(mut self, modes: usize) -> Self {
        self.num_modes = Some(modes);
        self
    }

    pub fn build(self) -> Result<PcaConfig, ConfigError> {
        Ok(PcaConfig {
            algorithm: self.algorithm.unwrap_or_default(),
            num_modes: nonzero("num_modes", self.num_modes.unwrap_or(DEFAULT_PCA_MODES))?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PivotConfig {
    pub init_pos: Point3<f64>,
    pub func_tol: f64,
    /// The pivot is confined to `|p_k| < box_limit` on every axis.
    pub box_limit: f64,
    /// Budget of simplex iterations across all barrier rounds.
    pub max_iterations: usize,
}

impl Default for PivotConfig {
    fn default() -> Self {
        Self {
            init_pos: Point3::origin(),
            func_tol: DEFAULT_PIVOT_FUNC_TOL,
            box_limit: DEFAULT_PIVOT_BOX_LIMIT,
            max_iterations: DEFAULT_PIVOT_MAX_ITERATIONS,
        }
    }
}

#[derive(Default)]
pub struct PivotConfigBuilder {
    init_pos: Option<Point3<f64>>,
    func_tol: Option<f64>,
    box_limit: Option<f64>,
    max_iterations: Option<usize>,
}

impl PivotConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn init_pos(mut self, pos: Point3<f64>) -> Self {
        self.init_pos = Some(pos);
        self
    }
    pub fn func_tol(mut self, tol: f64) -> Self {
        self.func_tol = Some(tol);
        self
    }
    pub fn box_limit(mut self, limit: f64) -> Self {
        self.box_limit = Some(limit);
        self
    }
    pub fn max_iterations(mut self, iterations: usize) -> Self {
        self.max_iterations = Some(iterations);
        self
    }

    pub fn build(self) -> Result<PivotConfig, ConfigError> {
        let box_limit = positive("box_limit", self.box_limit.unwrap_or(DEFAULT_PIVOT_BOX_LIMIT))?;
        let init_pos = self.init_pos.unwrap_or_else(Point3::origin);
        if init_pos.iter().any(|c| !c.is_finite() || c.abs() >= box_limit) {
            return Err(ConfigError::InvalidParameter {
                name: "init_pos",
                reason: format!(
                    "({:.3}, {:.3}, {:.3}) lies outside the ±{box_limit} box",
                    init_pos.x, init_pos.y, init_pos.z
                ),
            });
        }
        Ok(PivotConfig {
            init_pos,
            func_tol: positive("func_tol", self.func_tol.unwrap_or(DEFAULT_PIVOT_FUNC_TOL))?,
            box_limit,
            max_iterations: nonzero(
                "max_iterations",
                self.max_iterations.unwrap_or(DEFAULT_PIVOT_MAX_ITERATIONS),
            )?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_fall_back_to_defaults() {
        assert_eq!(SuperpositionConfigBuilder::new().build().unwrap(), SuperpositionConfig::default());
        assert_eq!(PcaConfigBuilder::new().build().unwrap(), PcaConfig::default());
        assert_eq!(PivotConfigBuilder::new().build().unwrap(), PivotConfig::default());
    }

    #[test]
    fn superposition_builder_applies_every_setter() {
        let config = SuperpositionConfigBuilder::new()
            .method(FitMethod::Mean)
            .centroid(Point3::new(1.0, 2.0, 3.0))
            .tolerance(1e-6)
            .max_iterations(50)
            .build()
            .unwrap();
        assert_eq!(config.method, FitMethod::Mean);
        assert_eq!(config.centroid, Some(Point3::new(1.0, 2.0, 3.0)));
        assert_eq!(config.tolerance, 1e-6);
        assert_eq!(config.max_iterations, 50);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            SuperpositionConfigBuilder::new().tolerance(0.0).build(),
            Err(ConfigError::InvalidParameter { name: "tolerance", .. })
        ));
        assert!(matches!(
            PcaConfigBuilder::new().num_modes(0).build(),
            Err(ConfigError::InvalidParameter { name: "num_modes", .. })
        ));
        assert!(matches!(
            PivotConfigBuilder::new().func_tol(f64::NAN).build(),
            Err(ConfigError::InvalidParameter { name: "func_tol", .. })
        ));
    }

    #[test]
    fn pivot_start_must_lie_inside_the_box() {
        assert!(matches!(
            PivotConfigBuilder::new()
                .box_limit(10.0)
                .init_pos(Point3::new(0.0, 10.0, 0.0))
                .build(),
            Err(ConfigError::InvalidParameter { name: "init_pos", .. })
        ));
        let config = PivotConfigBuilder::new()
            .box_limit(10.0)
            .init_pos(Point3::new(0.0, 9.5, 0.0))
            .build()
            .unwrap();
        assert_eq!(config.init_pos.y, 9.5);
    }

    #[test]
    fn enums_use_lowercase_names() {
        use serde::de::{IntoDeserializer, value::Error as ValueError};

        let method = FitMethod::deserialize(IntoDeserializer::<ValueError>::into_deserializer("mean")).unwrap();
        let algorithm =
            PcaAlgorithm::deserialize(IntoDeserializer::<ValueError>::into_deserializer("svd")).unwrap();
        assert_eq!(method, FitMethod::Mean);
        assert_eq!(algorithm, PcaAlgorithm::Svd);
    }
}
