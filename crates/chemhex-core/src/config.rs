//! Pipeline configuration.
//!
//! All structs serialize with serde and carry `Default` values matching the
//! published plots: flat-top hexagons of size 10 over logP -5..10 and mass
//! 0..1600, σ from 0 to 4 in steps of 0.25 and three tooltip contributors.

use crate::errors::{ChemhexError, Result};
use crate::sigma::{sigma_range, SigmaKey};
use crate::types::{Orientation, PlotBounds};
use serde::{Deserialize, Serialize};

/// How the vertical/horizontal aspect scale of the grid is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum AspectMode {
    /// Use the given scale and hex size as they are.
    Fixed { aspect_scale: f64 },
    /// Fit size and scale to explicit plot bounds shared by all queries.
    Bounds { bounds: PlotBounds },
    /// Fit size and scale to each query's own data range.
    FitData,
}

/// Largest accepted blur kernel extent in unit-hex distance.
pub const MAX_KERNEL_EXTENT: f64 = 32.0;

/// Plot range shared by all queries unless configured otherwise.
pub const DEFAULT_BOUNDS: PlotBounds = PlotBounds {
    x_min: -5.0,
    x_max: 10.0,
    y_min: 0.0,
    y_max: 1600.0,
};

impl Default for AspectMode {
    fn default() -> Self {
        AspectMode::Bounds {
            bounds: DEFAULT_BOUNDS,
        }
    }
}

/// Hexagon grid parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometryConfig {
    /// Base hexagon size before fitting
    pub hex_size: f64,
    pub orientation: Orientation,
    pub aspect: AspectMode,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            hex_size: 10.0,
            orientation: Orientation::FlatTop,
            aspect: AspectMode::default(),
        }
    }
}

impl GeometryConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.hex_size.is_finite() || self.hex_size <= 0.0 {
            return Err(ChemhexError::invalid_geometry(format!(
                "hex_size must be positive, got {}",
                self.hex_size
            )));
        }
        match self.aspect {
            AspectMode::Fixed { aspect_scale } => {
                if !aspect_scale.is_finite() || aspect_scale <= 0.0 {
                    return Err(ChemhexError::invalid_geometry(format!(
                        "aspect_scale must be positive, got {}",
                        aspect_scale
                    )));
                }
            }
            AspectMode::Bounds { bounds } => bounds.validate()?,
            AspectMode::FitData => {}
        }
        Ok(())
    }
}

/// Discrete σ range for the blur.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlurConfig {
    pub max_sigma: f64,
    pub step_size: f64,
}

impl Default for BlurConfig {
    fn default() -> Self {
        Self {
            max_sigma: 4.0,
            step_size: 0.25,
        }
    }
}

impl BlurConfig {
    /// The σ keys `0, step, …, max_sigma`.
    pub fn sigma_keys(&self) -> Result<Vec<SigmaKey>> {
        sigma_range(self.max_sigma, self.step_size)
    }
}

/// Everything the binning pipeline needs for one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub geometry: GeometryConfig,
    pub blur: BlurConfig,
    /// Number of contributor slots per hexagon
    pub top_k: usize,
    /// Footprint of the blur kernel in unit-hex distance (ellipse radius)
    pub kernel_extent: f64,
    /// Rescale the weighted channel so its total matches the raw counts
    pub rescale_weighted: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            geometry: GeometryConfig::default(),
            blur: BlurConfig::default(),
            top_k: 3,
            kernel_extent: 8.0,
            rescale_weighted: true,
        }
    }
}

impl PipelineConfig {
    /// Validates every section. Called once before any query is processed.
    pub fn validate(&self) -> Result<()> {
        self.geometry.validate()?;
        self.blur.sigma_keys()?;
        if self.top_k == 0 {
            return Err(ChemhexError::config("top_k must be at least 1"));
        }
        if !(1.0..=MAX_KERNEL_EXTENT).contains(&self.kernel_extent) {
            return Err(ChemhexError::config(format!(
                "kernel_extent must be within 1..={}, got {}",
                MAX_KERNEL_EXTENT, self.kernel_extent
            )));
        }
        log::debug!(
            "Pipeline config valid: size {}, {} sigmas, top_k {}",
            self.geometry.hex_size,
            self.blur.sigma_keys()?.len(),
            self.top_k
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.blur.sigma_keys().unwrap().len(), 17);
        assert_eq!(config.geometry.orientation, Orientation::FlatTop);
        assert_eq!(
            config.geometry.aspect,
            AspectMode::Bounds {
                bounds: DEFAULT_BOUNDS
            }
        );
    }

    #[test]
    fn test_invalid_geometry() {
        let mut config = PipelineConfig::default();
        config.geometry.hex_size = 0.0;
        assert!(matches!(
            config.validate(),
            Err(ChemhexError::InvalidGeometry(_))
        ));

        let mut config = PipelineConfig::default();
        config.geometry.aspect = AspectMode::Fixed { aspect_scale: -1.0 };
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.geometry.aspect = AspectMode::Bounds {
            bounds: PlotBounds::new(0.0, 0.0, 0.0, 1.0),
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_blur_and_top_k() {
        let mut config = PipelineConfig::default();
        config.blur.step_size = 0.0;
        assert!(matches!(config.validate(), Err(ChemhexError::ConfigError(_))));

        let mut config = PipelineConfig::default();
        config.top_k = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_kernel_extent_bounds() {
        let mut config = PipelineConfig::default();
        config.kernel_extent = MAX_KERNEL_EXTENT;
        assert!(config.validate().is_ok());

        for extent in [0.5, MAX_KERNEL_EXTENT + 1.0, 1e9, f64::NAN, f64::INFINITY] {
            config.kernel_extent = extent;
            assert!(matches!(config.validate(), Err(ChemhexError::ConfigError(_))));
        }
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"top_k": 5, "geometry": {"orientation": "pointytop"}}"#)
                .unwrap();
        assert_eq!(config.top_k, 5);
        assert_eq!(config.geometry.orientation, Orientation::PointyTop);
        assert_eq!(config.geometry.hex_size, 10.0);
        assert_eq!(config.blur, BlurConfig::default());
    }

    #[test]
    fn test_aspect_mode_json() {
        let json = serde_json::to_string(&AspectMode::Fixed { aspect_scale: 2.0 }).unwrap();
        assert_eq!(json, r#"{"mode":"fixed","aspect_scale":2.0}"#);
        let back: AspectMode = serde_json::from_str(r#"{"mode":"fit_data"}"#).unwrap();
        assert_eq!(back, AspectMode::FitData);
    }
}
