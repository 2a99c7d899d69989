//! Output contract structures and writers

use crate::classes::ClassOverlay;
use crate::ratios::RatioComparison;
use crate::sources::{HexRow, QueryDataset, SourceBundle};
use anyhow::{Context, Result};
use chemhex_core::{Channel, Orientation, PipelineConfig, SigmaKey};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Output directory contract
#[derive(Debug, Clone)]
pub struct OutputContract {
    /// Base output directory
    pub base_dir: PathBuf,
}

impl OutputContract {
    /// Create output contract and ensure directory structure
    pub fn new(base_dir: &Path) -> Result<Self> {
        let contract = Self {
            base_dir: base_dir.to_path_buf(),
        };
        contract.create_directories()?;
        Ok(contract)
    }

    fn create_directories(&self) -> Result<()> {
        for dir in [self.base_dir.clone(), self.figures_dir()] {
            fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        }
        Ok(())
    }

    // Path accessors
    pub fn datasets_json(&self) -> PathBuf {
        self.base_dir.join("datasets.json")
    }

    pub fn config_json(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    pub fn figures_dir(&self) -> PathBuf {
        self.base_dir.join("figures")
    }

    /// Figure of one query channel at one σ, e.g. `figures/coffee_raw_sigma_0.25.svg`
    pub fn query_figure(&self, query: &str, channel: Channel, sigma: SigmaKey) -> PathBuf {
        self.figures_dir().join(format!(
            "{}_{}_sigma_{}.svg",
            file_safe(query),
            channel.as_str(),
            sigma
        ))
    }

    pub fn ratio_json(&self, query_a: &str, query_b: &str) -> PathBuf {
        self.base_dir
            .join(format!("{}_vs_{}.json", file_safe(query_a), file_safe(query_b)))
    }

    pub fn ratio_figure(&self, query_a: &str, query_b: &str) -> PathBuf {
        self.figures_dir()
            .join(format!("{}_vs_{}.svg", file_safe(query_a), file_safe(query_b)))
    }
}

fn file_safe(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '.' { c } else { '_' })
        .collect()
}

// =============================================================================
// JSON DOCUMENTS
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct GeometryJson {
    pub size: f64,
    pub aspect_scale: f64,
    pub orientation: Orientation,
}

#[derive(Debug, Clone, Serialize)]
pub struct DatasetJson {
    pub name: String,
    pub title: String,
    pub metadata: Vec<String>,
    pub geometry: GeometryJson,
    pub sigmas: Vec<SigmaKey>,
    pub hexagon_count: usize,
    /// Largest blurred raw weight per σ, for colour mapping
    pub max_weight_by_sigma: BTreeMap<SigmaKey, f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_overlay: Option<ClassOverlay>,
    pub rows: Vec<HexRow>,
}

impl DatasetJson {
    pub fn from_dataset(dataset: &QueryDataset, overlay: Option<ClassOverlay>) -> Self {
        let geometry = dataset.geometry();
        let stack = dataset.stack();
        let max_weight_by_sigma = stack
            .sigmas()
            .iter()
            .filter_map(|&s| {
                stack
                    .lattice(s)
                    .map(|l| (s, l.max(Channel::Raw)))
            })
            .collect();
        Self {
            name: dataset.name().to_string(),
            title: dataset.title().to_string(),
            metadata: dataset.metadata().to_vec(),
            geometry: GeometryJson {
                size: geometry.size(),
                aspect_scale: geometry.aspect_scale(),
                orientation: geometry.orientation(),
            },
            sigmas: stack.sigmas().to_vec(),
            hexagon_count: dataset.table().len(),
            max_weight_by_sigma,
            class_overlay: overlay,
            rows: dataset.rows(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FailureJson {
    pub name: String,
    pub error: String,
}

/// `datasets.json`: every built query plus the selection list.
#[derive(Debug, Clone, Serialize)]
pub struct BundleJson {
    pub version: String,
    pub options: Vec<String>,
    pub default_query: Option<String>,
    pub pipeline: PipelineConfig,
    pub datasets: Vec<DatasetJson>,
    pub failures: Vec<FailureJson>,
}

impl BundleJson {
    /// `overlays` is keyed by query name.
    pub fn from_bundle(
        bundle: &SourceBundle,
        pipeline: &PipelineConfig,
        mut overlays: BTreeMap<String, ClassOverlay>,
    ) -> Self {
        Self {
            version: crate::VERSION.to_string(),
            options: bundle.options.clone(),
            default_query: bundle.default_query.clone(),
            pipeline: pipeline.clone(),
            datasets: bundle
                .ordered()
                .into_iter()
                .map(|d| DatasetJson::from_dataset(d, overlays.remove(d.name())))
                .collect(),
            failures: bundle
                .failures
                .iter()
                .map(|f| FailureJson {
                    name: f.name.clone(),
                    error: f.error.to_string(),
                })
                .collect(),
        }
    }
}

/// Writes any serializable document as pretty JSON.
pub fn write_json<T: Serialize>(path: &Path, document: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(document)?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    log::info!("  ✓ {}", path.display());
    Ok(())
}

pub fn write_bundle(contract: &OutputContract, document: &BundleJson) -> Result<PathBuf> {
    let path = contract.datasets_json();
    write_json(&path, document)?;
    Ok(path)
}

pub fn write_ratio(contract: &OutputContract, comparison: &RatioComparison) -> Result<PathBuf> {
    let path = contract.ratio_json(&comparison.query_a, &comparison.query_b);
    write_json(&path, comparison)?;
    Ok(path)
}
