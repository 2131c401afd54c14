// ─────────────────────────────────────────────────────────────────────
// RTI Layer Core — Config
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use serde::{Deserialize, Serialize};

/// Top-level experiment description.
///
/// All values are unit-normalized SI (meters, seconds, amperes, m^2/s);
/// whatever front end produces this file is responsible for unit
/// conversion. Every section has defaults reproducing the standard
/// iontophoresis protocol (80 nA source, 10 s delay, 50 s pulse, probe
/// 120 um above the source, 50 um middle layer centered on it).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentConfig {
    pub experiment_name: String,
    #[serde(default)]
    pub grid: GridConfig,
    #[serde(default)]
    pub layers: LayersConfig,
    /// Free diffusion coefficient of the ion (m^2/s).
    #[serde(default = "default_d_free")]
    pub d_free: f64,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub probe: ProbeConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub span: SpanConfig,
    /// Stepping topology: "three-region" (default) or "single-region".
    #[serde(default = "default_mode")]
    pub mode: String,
    /// When true, the middle layer's kappa is copied to all layers
    /// (and tracked by the fitter when kappa is a free parameter).
    #[serde(default)]
    pub global_kappa: bool,
    #[serde(default)]
    pub fit: FitConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridConfig {
    /// Radial sample count; field arrays carry nr + 1 columns.
    #[serde(default = "default_nr")]
    pub nr: usize,
    /// Axial sample count.
    #[serde(default = "default_nz")]
    pub nz: usize,
    /// Cylinder radius (m).
    #[serde(default = "default_r_max")]
    pub r_max: f64,
    /// Cylinder length (m). Must be absent when span.ez1/ez2 are given,
    /// which derive the length instead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z_max: Option<f64>,
}

impl Default for GridConfig {
    fn default() -> Self {
        GridConfig {
            nr: default_nr(),
            nz: default_nz(),
            r_max: default_r_max(),
            z_max: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerConfig {
    pub alpha: f64,
    pub theta: f64,
    pub kappa: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayersConfig {
    #[serde(default = "default_outer_layer")]
    pub bottom: LayerConfig,
    #[serde(default = "default_middle_layer")]
    pub middle: LayerConfig,
    #[serde(default = "default_outer_layer")]
    pub top: LayerConfig,
}

impl Default for LayersConfig {
    fn default() -> Self {
        LayersConfig {
            bottom: default_outer_layer(),
            middle: default_middle_layer(),
            top: default_outer_layer(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Iontophoretic current (A).
    #[serde(default = "default_current")]
    pub current: f64,
    /// Electrode transport number.
    #[serde(default = "default_transport_number")]
    pub transport_number: f64,
    /// Quiet interval before the source switches on (s).
    #[serde(default = "default_delay")]
    pub delay: f64,
    /// Source-on interval (s).
    #[serde(default = "default_duration")]
    pub duration: f64,
    /// Additional point sources, positions relative to the primary source.
    #[serde(default)]
    pub extra: Vec<ExtraSourceConfig>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig {
            current: default_current(),
            transport_number: default_transport_number(),
            delay: default_delay(),
            duration: default_duration(),
            extra: Vec::new(),
        }
    }
}

/// One additional point source. z is measured from the primary source
/// along the axis, r from the axis; current in amperes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtraSourceConfig {
    pub z: f64,
    pub r: f64,
    pub current: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Axial probe offset from the source (m).
    #[serde(default = "default_probe_z")]
    pub z_offset: f64,
    /// Radial probe offset from the axis (m).
    #[serde(default)]
    pub r_offset: f64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        ProbeConfig {
            z_offset: default_probe_z(),
            r_offset: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Total simulated time (s).
    #[serde(default = "default_t_max")]
    pub t_max: f64,
    /// Explicit step count; when absent dt comes from the von Neumann bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nt: Option<usize>,
    /// Optional refinement factor applied to dt (dt /= nt_scale).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nt_scale: Option<f64>,
}

impl Default for TimingConfig {
    fn default() -> Self {
        TimingConfig {
            t_max: default_t_max(),
            nt: None,
            nt_scale: None,
        }
    }
}

/// Axial extents, all relative to the primary source at z = 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpanConfig {
    /// Lower edge of the middle layer (m).
    #[serde(default = "default_lz1")]
    pub lz1: f64,
    /// Upper edge of the middle layer (m).
    #[serde(default = "default_lz2")]
    pub lz2: f64,
    /// Optional explicit bottom end of the cylinder (m, <= 0).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ez1: Option<f64>,
    /// Optional explicit top end of the cylinder (m, >= 0).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ez2: Option<f64>,
}

impl Default for SpanConfig {
    fn default() -> Self {
        SpanConfig {
            lz1: default_lz1(),
            lz2: default_lz2(),
            ez1: None,
            ez2: None,
        }
    }
}

/// Simplex-fitting controls: initial step sizes, soft box bounds, stopping
/// criteria, and the linear penalty multiplier for bound violations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitConfig {
    #[serde(default = "default_alpha_step")]
    pub alpha_step: f64,
    #[serde(default = "default_theta_step")]
    pub theta_step: f64,
    #[serde(default = "default_kappa_step")]
    pub kappa_step: f64,
    #[serde(default = "default_min_alpha")]
    pub min_alpha: f64,
    #[serde(default = "default_max_alpha")]
    pub max_alpha: f64,
    #[serde(default = "default_min_theta")]
    pub min_theta: f64,
    #[serde(default = "default_max_theta")]
    pub max_theta: f64,
    #[serde(default = "default_min_kappa")]
    pub min_kappa: f64,
    #[serde(default = "default_max_kappa")]
    pub max_kappa: f64,
    #[serde(default = "default_fit_tolerance")]
    pub tolerance: f64,
    #[serde(default = "default_fit_max_iterations")]
    pub max_iterations: usize,
    #[serde(default = "default_penalty_factor")]
    pub penalty_factor: f64,
}

impl Default for FitConfig {
    fn default() -> Self {
        FitConfig {
            alpha_step: default_alpha_step(),
            theta_step: default_theta_step(),
            kappa_step: default_kappa_step(),
            min_alpha: default_min_alpha(),
            max_alpha: default_max_alpha(),
            min_theta: default_min_theta(),
            max_theta: default_max_theta(),
            min_kappa: default_min_kappa(),
            max_kappa: default_max_kappa(),
            tolerance: default_fit_tolerance(),
            max_iterations: default_fit_max_iterations(),
            penalty_factor: default_penalty_factor(),
        }
    }
}

fn default_nr() -> usize {
    500
}
fn default_nz() -> usize {
    1000
}
fn default_r_max() -> f64 {
    1.0e-3
}
fn default_d_free() -> f64 {
    1.24e-9
}
fn default_current() -> f64 {
    80.0e-9
}
fn default_transport_number() -> f64 {
    0.35
}
fn default_delay() -> f64 {
    10.0
}
fn default_duration() -> f64 {
    50.0
}
fn default_probe_z() -> f64 {
    120.0e-6
}
fn default_t_max() -> f64 {
    150.0
}
fn default_lz1() -> f64 {
    -25.0e-6
}
fn default_lz2() -> f64 {
    25.0e-6
}
fn default_mode() -> String {
    "three-region".to_string()
}
fn default_alpha_step() -> f64 {
    0.1
}
fn default_theta_step() -> f64 {
    0.2
}
fn default_kappa_step() -> f64 {
    0.002
}
fn default_min_alpha() -> f64 {
    0.001
}
fn default_max_alpha() -> f64 {
    0.25
}
fn default_min_theta() -> f64 {
    0.001
}
fn default_max_theta() -> f64 {
    0.75
}
fn default_min_kappa() -> f64 {
    0.0
}
fn default_max_kappa() -> f64 {
    0.1
}
fn default_fit_tolerance() -> f64 {
    crate::constants::DEFAULT_FIT_TOLERANCE
}
fn default_fit_max_iterations() -> usize {
    crate::constants::DEFAULT_FIT_MAX_ITERATIONS
}
fn default_penalty_factor() -> f64 {
    crate::constants::DEFAULT_PENALTY_FACTOR
}

fn default_outer_layer() -> LayerConfig {
    LayerConfig {
        alpha: 0.218,
        theta: 0.447,
        kappa: 0.007,
    }
}

fn default_middle_layer() -> LayerConfig {
    LayerConfig {
        alpha: 0.2,
        theta: 0.4,
        kappa: 0.01,
    }
}

impl ExperimentConfig {
    /// Load from a JSON file.
    pub fn from_file(path: &str) -> crate::error::RtiResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        Ok(config)
    }

    /// Minimal config with every section at its default.
    pub fn with_defaults(name: &str) -> Self {
        serde_json::from_str(&format!("{{\"experiment_name\": \"{name}\"}}"))
            .expect("default config must deserialize")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_json_gets_defaults() {
        let cfg: ExperimentConfig =
            serde_json::from_str("{\"experiment_name\": \"slice-04\"}").unwrap();
        assert_eq!(cfg.experiment_name, "slice-04");
        assert_eq!(cfg.grid.nr, 500);
        assert_eq!(cfg.grid.nz, 1000);
        assert!(cfg.grid.z_max.is_none());
        assert!((cfg.d_free - 1.24e-9).abs() < 1e-20);
        assert!((cfg.source.current - 80.0e-9).abs() < 1e-18);
        assert!((cfg.source.transport_number - 0.35).abs() < 1e-12);
        assert!((cfg.probe.z_offset - 120.0e-6).abs() < 1e-12);
        assert_eq!(cfg.probe.r_offset, 0.0);
        assert_eq!(cfg.mode, "three-region");
        assert!(!cfg.global_kappa);
        assert!(cfg.source.extra.is_empty());
        assert!((cfg.layers.middle.alpha - 0.2).abs() < 1e-12);
        assert!((cfg.layers.top.theta - 0.447).abs() < 1e-12);
    }

    #[test]
    fn test_fit_defaults() {
        let cfg = ExperimentConfig::with_defaults("fit");
        assert!((cfg.fit.alpha_step - 0.1).abs() < 1e-12);
        assert!((cfg.fit.theta_step - 0.2).abs() < 1e-12);
        assert!((cfg.fit.kappa_step - 0.002).abs() < 1e-12);
        assert!((cfg.fit.max_alpha - 0.25).abs() < 1e-12);
        assert!((cfg.fit.max_theta - 0.75).abs() < 1e-12);
        assert!((cfg.fit.max_kappa - 0.1).abs() < 1e-12);
        assert!((cfg.fit.tolerance - 1e-4).abs() < 1e-15);
        assert_eq!(cfg.fit.max_iterations, 100);
        assert!((cfg.fit.penalty_factor - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_explicit_sections_parse() {
        let cfg: ExperimentConfig = serde_json::from_str(
            r#"{
                "experiment_name": "edges",
                "grid": { "nr": 100, "nz": 200, "r_max": 5.0e-4 },
                "span": { "lz1": -3.0e-5, "lz2": 3.0e-5,
                          "ez1": -8.0e-4, "ez2": 1.2e-3 },
                "timing": { "t_max": 60.0, "nt_scale": 2.0 },
                "source": { "current": 1.0e-7,
                            "extra": [ { "z": 5.0e-5, "r": 0.0, "current": 2.0e-8 } ] },
                "mode": "single-region"
            }"#,
        )
        .unwrap();
        assert_eq!(cfg.grid.nr, 100);
        assert_eq!(cfg.span.ez1, Some(-8.0e-4));
        assert_eq!(cfg.timing.nt_scale, Some(2.0));
        assert_eq!(cfg.source.extra.len(), 1);
        assert_eq!(cfg.mode, "single-region");
        // Unset fields still fall back
        assert!((cfg.source.transport_number - 0.35).abs() < 1e-12);
        assert!((cfg.source.delay - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_roundtrip_serialization() {
        let cfg = ExperimentConfig::with_defaults("roundtrip");
        let json = serde_json::to_string_pretty(&cfg).unwrap();
        let cfg2: ExperimentConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(cfg.experiment_name, cfg2.experiment_name);
        assert_eq!(cfg.grid.nr, cfg2.grid.nr);
        assert!((cfg.fit.penalty_factor - cfg2.fit.penalty_factor).abs() < 1e-12);
    }
}
