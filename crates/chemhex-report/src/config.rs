//! Configuration structures for the report pipeline

use crate::ratios::RatioOptions;
use anyhow::{Context, Result};
use chemhex_core::{Channel, PipelineConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main report configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Folder of query tables (`*.tsv`)
    pub input_dir: PathBuf,

    /// Output directory
    pub output_dir: PathBuf,

    /// Binning and blur parameters
    pub pipeline: PipelineConfig,

    /// Figure options
    pub figures: FigureOptions,

    /// Optional class highlighted in every query
    pub class_overlay: Option<ClassOverlayConfig>,

    /// Ratio comparison options
    pub ratio: RatioOptions,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("tables"),
            output_dir: PathBuf::from("results"),
            pipeline: PipelineConfig::default(),
            figures: FigureOptions::default(),
            class_overlay: None,
            ratio: RatioOptions::default(),
        }
    }
}

impl ReportConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), String> {
        self.pipeline.validate().map_err(|e| e.user_message())?;
        self.ratio.validate().map_err(|e| e.user_message())?;
        self.figures.validate()?;
        if let Some(overlay) = &self.class_overlay {
            if overlay.class_name.trim().is_empty() {
                return Err("class overlay needs a class name".to_string());
            }
        }
        Ok(())
    }
}

/// Figure output options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FigureOptions {
    /// Write SVG figures
    pub enabled: bool,
    /// σ values rendered per query ("0", "1", ...); unknown values are skipped
    pub sigmas: Vec<String>,
    /// Weight channels rendered per σ
    pub channels: Vec<Channel>,
    /// Colour scaling root: cells are coloured by weight^(1/saturation)
    pub saturation: f64,
    pub width: u32,
    pub height: u32,
}

impl Default for FigureOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            sigmas: vec!["0".to_string(), "1".to_string()],
            channels: vec![Channel::Raw],
            saturation: 1.0,
            width: 900,
            height: 700,
        }
    }
}

impl FigureOptions {
    pub fn validate(&self) -> Result<(), String> {
        if !self.saturation.is_finite() || self.saturation < 1.0 {
            return Err(format!("saturation must be >= 1, got {}", self.saturation));
        }
        if self.width < 100 || self.height < 100 {
            return Err(format!(
                "figure size {}x{} is too small",
                self.width, self.height
            ));
        }
        Ok(())
    }
}

/// Class overlay: highlight chemicals of one ontology class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassOverlayConfig {
    /// Two-column `id<TAB>name` table resolving class ids
    pub names_file: PathBuf,
    /// Class name to highlight
    pub class_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_validates() {
        assert!(ReportConfig::default().validate().is_ok());
    }

    #[test]
    fn test_save_load_round_trip() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.json");
        let mut config = ReportConfig::default();
        config.pipeline.top_k = 5;
        config.class_overlay = Some(ClassOverlayConfig {
            names_file: PathBuf::from("names.tsv"),
            class_name: "purines".to_string(),
        });
        config.save(&path).unwrap();
        assert_eq!(ReportConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_invalid_sections() {
        let mut config = ReportConfig::default();
        config.figures.saturation = 0.5;
        assert!(config.validate().is_err());

        let mut config = ReportConfig::default();
        config.pipeline.blur.step_size = -1.0;
        let err = config.validate().unwrap_err();
        assert!(err.contains("Configuration error"));

        let mut config = ReportConfig::default();
        config.ratio.lower_bound = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_file() {
        let tmp = TempDir::new().unwrap();
        assert!(ReportConfig::load(&tmp.path().join("absent.json")).is_err());
    }
}
