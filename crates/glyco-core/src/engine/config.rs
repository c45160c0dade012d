use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
    #[error("Invalid value for '{parameter}': {reason}")]
    Invalid {
        parameter: &'static str,
        reason: String,
    },
}

/// Parameters of the geometry relaxation that follows assembly.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RelaxConfig {
    /// Upper bound on sculpting iterations; `0` disables sculpting.
    pub sculpt_cycles: usize,
    /// Sculpting stops once no restraint is violated by more than this many Angstroms.
    pub tolerance: f64,
    /// Fraction of the van der Waals contact distance below which non-bonded atoms are pushed
    /// apart.
    pub vdw_scale: f64,
    pub bond_weight: f64,
    pub angle_weight: f64,
    pub torsion_weight: f64,
    pub vdw_weight: f64,
    /// Request a minimization pass after sculpting when a backend is available.
    pub minimize: bool,
    pub minimize_steps: usize,
    pub minimize_step_size: f64,
    /// Minimization stops once the largest force component drops below this value.
    pub force_tolerance: f64,
}

impl Default for RelaxConfig {
    fn default() -> Self {
        Self {
            sculpt_cycles: 5000,
            tolerance: 0.01,
            vdw_scale: 0.8,
            bond_weight: 1.0,
            angle_weight: 0.5,
            torsion_weight: 0.2,
            vdw_weight: 0.3,
            minimize: true,
            minimize_steps: 500,
            minimize_step_size: 0.02,
            force_tolerance: 0.05,
        }
    }
}

impl RelaxConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_positive("relax.tolerance", self.tolerance)?;
        check_positive("relax.minimize_step_size", self.minimize_step_size)?;
        check_positive("relax.force_tolerance", self.force_tolerance)?;
        if !(self.vdw_scale > 0.0 && self.vdw_scale <= 1.5) {
            return Err(ConfigError::Invalid {
                parameter: "relax.vdw_scale",
                reason: format!("must lie in (0, 1.5], got {}", self.vdw_scale),
            });
        }
        for (parameter, weight) in [
            ("relax.bond_weight", self.bond_weight),
            ("relax.angle_weight", self.angle_weight),
            ("relax.torsion_weight", self.torsion_weight),
            ("relax.vdw_weight", self.vdw_weight),
        ] {
            if !(0.0..=1.0).contains(&weight) {
                return Err(ConfigError::Invalid {
                    parameter,
                    reason: format!("weights must lie in [0, 1], got {}", weight),
                });
            }
        }
        Ok(())
    }
}

fn check_positive(parameter: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            parameter,
            reason: format!("must be a positive number, got {}", value),
        })
    }
}

/// Everything a build can be tuned with.
///
/// Defaults reproduce the classic builder: phi = -60, psi = 120, 5000 sculpting cycles, and
/// transient structures removed again when a build fails.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Phi applied to every glycosidic bond, in degrees.
    pub phi: f64,
    /// Psi applied to every glycosidic bond, in degrees.
    pub psi: f64,
    /// Leave transient structures in the registry after a failed build, for inspection.
    pub keep_transients_on_failure: bool,
    pub relax: RelaxConfig,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            phi: -60.0,
            psi: 120.0,
            keep_transients_on_failure: false,
            relax: RelaxConfig::default(),
        }
    }
}

impl BuildConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::Toml {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (parameter, angle) in [("phi", self.phi), ("psi", self.psi)] {
            if !angle.is_finite() {
                return Err(ConfigError::Invalid {
                    parameter,
                    reason: format!("must be a finite angle, got {}", angle),
                });
            }
        }
        self.relax.validate()
    }
}

#[derive(Default)]
pub struct BuildConfigBuilder {
    phi: Option<f64>,
    psi: Option<f64>,
    keep_transients_on_failure: Option<bool>,
    relax: Option<RelaxConfig>,
    sculpt_cycles: Option<usize>,
    minimize: Option<bool>,
}

impl BuildConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phi(mut self, degrees: f64) -> Self {
        self.phi = Some(degrees);
        self
    }
    pub fn psi(mut self, degrees: f64) -> Self {
        self.psi = Some(degrees);
        self
    }
    pub fn keep_transients_on_failure(mut self, keep: bool) -> Self {
        self.keep_transients_on_failure = Some(keep);
        self
    }
    pub fn relax(mut self, relax: RelaxConfig) -> Self {
        self.relax = Some(relax);
        self
    }
    /// Overrides `relax.sculpt_cycles` after any [`relax`](Self::relax) value is applied.
    pub fn sculpt_cycles(mut self, cycles: usize) -> Self {
        self.sculpt_cycles = Some(cycles);
        self
    }
    /// Overrides `relax.minimize` after any [`relax`](Self::relax) value is applied.
    pub fn minimize(mut self, minimize: bool) -> Self {
        self.minimize = Some(minimize);
        self
    }

    pub fn build(self) -> Result<BuildConfig, ConfigError> {
        let defaults = BuildConfig::default();
        let mut relax = self.relax.unwrap_or(defaults.relax);
        if let Some(cycles) = self.sculpt_cycles {
            relax.sculpt_cycles = cycles;
        }
        if let Some(minimize) = self.minimize {
            relax.minimize = minimize;
        }
        let config = BuildConfig {
            phi: self.phi.unwrap_or(defaults.phi),
            psi: self.psi.unwrap_or(defaults.psi),
            keep_transients_on_failure: self
                .keep_transients_on_failure
                .unwrap_or(defaults.keep_transients_on_failure),
            relax,
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn defaults_match_classic_builder() {
        let config = BuildConfig::default();
        assert_eq!(config.phi, -60.0);
        assert_eq!(config.psi, 120.0);
        assert_eq!(config.relax.sculpt_cycles, 5000);
        assert!(!config.keep_transients_on_failure);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn builder_applies_overrides_on_top_of_defaults() {
        let config = BuildConfigBuilder::new()
            .phi(-75.0)
            .sculpt_cycles(0)
            .minimize(false)
            .keep_transients_on_failure(true)
            .build()
            .unwrap();

        assert_eq!(config.phi, -75.0);
        assert_eq!(config.psi, 120.0);
        assert_eq!(config.relax.sculpt_cycles, 0);
        assert!(!config.relax.minimize);
        assert!(config.keep_transients_on_failure);
    }

    #[test]
    fn builder_rejects_invalid_values() {
        let result = BuildConfigBuilder::new().psi(f64::NAN).build();
        assert!(matches!(
            result,
            Err(ConfigError::Invalid {
                parameter: "psi",
                ..
            })
        ));

        let relax = RelaxConfig {
            bond_weight: 1.5,
            ..RelaxConfig::default()
        };
        assert!(matches!(
            BuildConfigBuilder::new().relax(relax).build(),
            Err(ConfigError::Invalid {
                parameter: "relax.bond_weight",
                ..
            })
        ));
    }

    #[test]
    fn load_reads_partial_toml_and_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("build.toml");
        fs::write(
            &path,
            "phi = -70.0\n\n[relax]\nsculpt_cycles = 200\nminimize = false\n",
        )
        .unwrap();

        let config = BuildConfig::load(&path).unwrap();

        assert_eq!(config.phi, -70.0);
        assert_eq!(config.psi, 120.0);
        assert_eq!(config.relax.sculpt_cycles, 200);
        assert!(!config.relax.minimize);
        assert_eq!(config.relax.tolerance, 0.01);
    }

    #[test]
    fn load_rejects_unknown_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("build.toml");
        fs::write(&path, "omega = 60.0\n").unwrap();

        assert!(matches!(
            BuildConfig::load(&path),
            Err(ConfigError::Toml { .. })
        ));
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = BuildConfig::load(&dir.path().join("missing.toml"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }
}
