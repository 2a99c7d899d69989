//! Report pipeline orchestration
//!
//! The production path is:
//! 1. Read every query table of the input folder
//! 2. Build all query datasets under one pipeline configuration
//! 3. Resolve the optional class overlay for each query
//! 4. Write `datasets.json`, the effective `config.json` and the SVG figures
//!
//! Ratio comparisons run separately through [`compare_queries`].

use crate::classes::ClassOverlay;
use crate::config::{FigureOptions, ReportConfig};
use crate::figures::{generate_query_figures, generate_ratio_figure};
use crate::inputs::{read_name_table, read_query_folder, read_query_table, QueryInput};
use crate::outputs::{write_bundle, write_ratio, BundleJson, OutputContract};
use crate::ratios::{RatioComparison, RatioOptions};
use crate::sources::{SourceBuilder, SourceBundle};
use anyhow::{Context, Result};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Pipeline result
#[derive(Debug)]
pub struct PipelineResult {
    /// Output directory
    pub output_dir: PathBuf,
    /// Queries built successfully, in input order
    pub queries: Vec<String>,
    /// Queries that failed, with their error message
    pub failed: Vec<(String, String)>,
    /// Occupied hexagons over all queries
    pub n_hexagons: usize,
    /// Files generated
    pub files_generated: Vec<PathBuf>,
}

/// Main report pipeline
pub struct ReportPipeline {
    config: ReportConfig,
    output: OutputContract,
}

impl ReportPipeline {
    /// Validates the configuration and prepares the output directory.
    pub fn new(config: ReportConfig) -> Result<Self> {
        config.validate().map_err(anyhow::Error::msg)?;
        let output = OutputContract::new(&config.output_dir)?;
        Ok(Self { config, output })
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    pub fn output(&self) -> &OutputContract {
        &self.output
    }

    /// Run the complete pipeline on the configured input folder.
    pub fn run(&self) -> Result<PipelineResult> {
        log::info!("Reading query tables from {}", self.config.input_dir.display());
        let queries = read_query_folder(&self.config.input_dir)?;
        self.run_queries(&queries)
    }

    /// Run the pipeline on queries that are already loaded.
    pub fn run_queries(&self, queries: &[QueryInput]) -> Result<PipelineResult> {
        let builder = SourceBuilder::new(self.config.pipeline.clone())?;
        log::info!(
            "Building {} queries ({} kernel offsets, {} sigma values)",
            queries.len(),
            builder.kernel().len(),
            builder.sigmas().len()
        );
        let bundle = builder.build(queries);
        let overlays = self.class_overlays(&bundle)?;

        let mut files_generated = Vec::new();
        let document = BundleJson::from_bundle(&bundle, &self.config.pipeline, overlays.clone());
        files_generated.push(write_bundle(&self.output, &document)?);

        self.config.save(&self.output.config_json())?;
        files_generated.push(self.output.config_json());

        if self.config.figures.enabled {
            let figures = self.render_figures(&bundle, &overlays)?;
            log::info!("Wrote {} figures to {}", figures.len(), self.output.figures_dir().display());
            files_generated.extend(figures);
        }

        let failed: Vec<(String, String)> = bundle
            .failures
            .iter()
            .map(|f| (f.name.clone(), f.error.user_message()))
            .collect();
        for (name, message) in &failed {
            log::warn!("Query '{}' failed: {}", name, message);
        }

        Ok(PipelineResult {
            output_dir: self.output.base_dir.clone(),
            queries: bundle.options.clone(),
            failed,
            n_hexagons: bundle.datasets.values().map(|d| d.table().len()).sum(),
            files_generated,
        })
    }

    fn class_overlays(&self, bundle: &SourceBundle) -> Result<BTreeMap<String, ClassOverlay>> {
        let Some(overlay) = &self.config.class_overlay else {
            return Ok(BTreeMap::new());
        };
        let class_names = read_name_table(&overlay.names_file)?;
        Ok(bundle
            .ordered()
            .into_iter()
            .map(|dataset| {
                (
                    dataset.name().to_string(),
                    ClassOverlay::build(dataset, &overlay.class_name, &class_names),
                )
            })
            .collect())
    }

    fn render_figures(
        &self,
        bundle: &SourceBundle,
        overlays: &BTreeMap<String, ClassOverlay>,
    ) -> Result<Vec<PathBuf>> {
        let per_query = bundle
            .ordered()
            .par_iter()
            .map(|dataset| {
                generate_query_figures(
                    &self.output,
                    dataset,
                    overlays.get(dataset.name()),
                    &self.config.figures,
                )
            })
            .collect::<Result<Vec<Vec<PathBuf>>>>()?;
        Ok(per_query.into_iter().flatten().collect())
    }
}

/// Compares two query tables and writes the ratio JSON (and figure).
pub fn compare_queries(
    table_a: &Path,
    table_b: &Path,
    output_dir: &Path,
    options: &RatioOptions,
    figures: &FigureOptions,
) -> Result<RatioComparison> {
    let a = read_query_table(table_a)?;
    let b = read_query_table(table_b)?;
    let comparison = RatioComparison::compare(&a, &b, options)
        .with_context(|| format!("Failed to compare {} with {}", a.name, b.name))?;

    let output = OutputContract::new(output_dir)?;
    write_ratio(&output, &comparison)?;
    if figures.enabled {
        generate_ratio_figure(&output.ratio_figure(&a.name, &b.name), &comparison, figures)?;
    }
    Ok(comparison)
}

// =============================================================================
// TESTS
// =============================================================================
