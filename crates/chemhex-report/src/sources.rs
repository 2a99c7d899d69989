//! Multi-query source building
//!
//! Each query runs map → aggregate → blur independently. Queries are built
//! in parallel and a failing query is reported next to the others instead
//! of aborting the batch.

use crate::inputs::QueryInput;
use chemhex_core::{
    Channel, ChemhexError, Contributor, EntityRecord, PipelineConfig, Result, Sample, SigmaKey,
};
use chemhex_hexbin::{BlurKernel, BlurStack, HexAggregator, HexGeometry, HexTable};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

// =============================================================================
// WEIGHTED CHANNEL
// =============================================================================

/// Weighted-channel value per record.
///
/// With rescaling the weighted counts are scaled so their total matches the
/// raw counts, then floored and offset by one so every chemical keeps a
/// visible weight: `floor(weighted · Σraw / Σweighted) + 1`. A zero weighted
/// total leaves the factor at 1.
pub fn weighted_channel(records: &[EntityRecord], rescale: bool) -> Vec<f64> {
    if !rescale {
        return records.iter().map(|r| r.weighted_count).collect();
    }
    let total_raw: f64 = records.iter().map(|r| r.raw_count as f64).sum();
    let total_weighted: f64 = records.iter().map(|r| r.weighted_count).sum();
    let factor = if total_weighted > 0.0 {
        total_raw / total_weighted
    } else {
        1.0
    };
    records
        .iter()
        .map(|r| (r.weighted_count * factor).floor() + 1.0)
        .collect()
}

/// Display title of a query dataset.
pub fn dataset_title(chemical_count: u64, query: &str) -> String {
    format!(
        "Hexbin plot for {} annotated chemicals with query {}",
        chemical_count, query
    )
}

// =============================================================================
// DATASET
// =============================================================================

/// One output row: a lattice cell with its base weights, contributors and
/// blurred weights per σ.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HexRow {
    pub q: i32,
    pub r: i32,
    pub base_weight: f64,
    pub weighted_weight: f64,
    pub top_k: Vec<Contributor>,
    pub top_k_weighted: Vec<Contributor>,
    pub blurred_weight_by_sigma: BTreeMap<SigmaKey, f64>,
    pub blurred_weighted_by_sigma: BTreeMap<SigmaKey, f64>,
}

/// Everything built for one query. Read-only after construction.
#[derive(Debug, Clone)]
pub struct QueryDataset {
    name: String,
    title: String,
    metadata: Vec<String>,
    geometry: HexGeometry,
    top_k: usize,
    records: Vec<EntityRecord>,
    names: HashMap<String, String>,
    table: HexTable,
    stack: BlurStack,
}

impl QueryDataset {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn metadata(&self) -> &[String] {
        &self.metadata
    }

    pub fn geometry(&self) -> &HexGeometry {
        &self.geometry
    }

    /// Records that entered binning (both properties present).
    pub fn records(&self) -> &[EntityRecord] {
        &self.records
    }

    pub fn table(&self) -> &HexTable {
        &self.table
    }

    pub fn stack(&self) -> &BlurStack {
        &self.stack
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Rows for every lattice cell in ascending (q, r) order. Spill-over
    /// cells carry zero base weight and empty contributor slots.
    pub fn rows(&self) -> Vec<HexRow> {
        let sigmas = self.stack.sigmas();
        let layers: Vec<(SigmaKey, &[chemhex_core::ChannelWeights])> = sigmas
            .iter()
            .filter_map(|&s| self.stack.layer(s).map(|layer| (s, layer)))
            .collect();
        let placeholder = vec![Contributor::empty(); self.top_k];

        self.stack
            .cells()
            .iter()
            .zip(self.stack.base())
            .enumerate()
            .map(|(i, (&coord, base))| {
                let (top_k, top_k_weighted) = match self.table.get(coord) {
                    Some(hexagon) => (
                        hexagon.top_k(Channel::Raw, self.top_k, &self.names),
                        hexagon.top_k(Channel::Weighted, self.top_k, &self.names),
                    ),
                    None => (placeholder.clone(), placeholder.clone()),
                };
                HexRow {
                    q: coord.q,
                    r: coord.r,
                    base_weight: base.raw,
                    weighted_weight: base.weighted,
                    top_k,
                    top_k_weighted,
                    blurred_weight_by_sigma: layers.iter().map(|(s, l)| (*s, l[i].raw)).collect(),
                    blurred_weighted_by_sigma: layers
                        .iter()
                        .map(|(s, l)| (*s, l[i].weighted))
                        .collect(),
                }
            })
            .collect()
    }
}

// =============================================================================
// SOURCE BUILDER
// =============================================================================

/// A query that could not be built.
#[derive(Debug)]
pub struct QueryFailure {
    pub name: String,
    pub error: ChemhexError,
}

/// Datasets keyed by query name, plus the selection list for a UI.
#[derive(Debug)]
pub struct SourceBundle {
    pub datasets: BTreeMap<String, QueryDataset>,
    /// Successfully built query names in input order
    pub options: Vec<String>,
    /// First successfully built query
    pub default_query: Option<String>,
    pub failures: Vec<QueryFailure>,
}

impl SourceBundle {
    pub fn get(&self, name: &str) -> Result<&QueryDataset> {
        self.datasets
            .get(name)
            .ok_or_else(|| ChemhexError::UnknownQuery(name.to_string()))
    }

    /// Datasets in option order.
    pub fn ordered(&self) -> Vec<&QueryDataset> {
        self.options
            .iter()
            .filter_map(|name| self.datasets.get(name))
            .collect()
    }
}

/// Builds query datasets under one validated pipeline configuration.
pub struct SourceBuilder {
    config: PipelineConfig,
    kernel: BlurKernel,
    sigmas: Vec<SigmaKey>,
}

impl SourceBuilder {
    /// Validates the configuration and builds the blur kernel once.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let kernel = BlurKernel::build(config.geometry.orientation, config.kernel_extent)?;
        let sigmas = config.blur.sigma_keys()?;
        Ok(Self {
            config,
            kernel,
            sigmas,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn kernel(&self) -> &BlurKernel {
        &self.kernel
    }

    pub fn sigmas(&self) -> &[SigmaKey] {
        &self.sigmas
    }

    /// Runs the full pipeline for one query.
    pub fn build_query(&self, query: &QueryInput) -> Result<QueryDataset> {
        let (records, dropped): (Vec<EntityRecord>, Vec<EntityRecord>) = query
            .records
            .iter()
            .cloned()
            .partition(|r| r.coordinates().is_some());
        if !dropped.is_empty() {
            log::warn!(
                "[{}] dropped {} records without logP or mass",
                query.name,
                dropped.len()
            );
        }

        let weighted = weighted_channel(&records, self.config.rescale_weighted);
        let samples = records
            .iter()
            .zip(&weighted)
            .map(|(record, &w)| record.to_sample(w))
            .collect::<Result<Vec<Sample>>>()?;

        let xs: Vec<f64> = samples.iter().map(Sample::x).collect();
        let ys: Vec<f64> = samples.iter().map(Sample::y).collect();
        let geometry = HexGeometry::from_config(&self.config.geometry, &xs, &ys)?;

        let table = HexAggregator::new(geometry).aggregate(&samples);
        let stack = BlurStack::build(&table, &self.kernel, &self.sigmas);

        let names: HashMap<String, String> = records
            .iter()
            .filter(|r| !r.display_name.is_empty())
            .map(|r| (r.entity_id.clone(), r.display_name.clone()))
            .collect();
        let chemical_count: u64 = records.iter().map(|r| r.raw_count).sum();

        log::info!(
            "[{}] {} chemicals in {} hexagons ({} cells after blur)",
            query.name,
            chemical_count,
            table.len(),
            stack.len()
        );

        Ok(QueryDataset {
            name: query.name.clone(),
            title: dataset_title(chemical_count, &query.name),
            metadata: query.metadata.clone(),
            geometry,
            top_k: self.config.top_k,
            records,
            names,
            table,
            stack,
        })
    }

    /// Builds all queries in parallel. Failures are collected per query.
    pub fn build(&self, queries: &[QueryInput]) -> SourceBundle {
        let results: Vec<Result<QueryDataset>> =
            queries.par_iter().map(|q| self.build_query(q)).collect();

        let mut datasets = BTreeMap::new();
        let mut options = Vec::new();
        let mut failures = Vec::new();

        for (query, result) in queries.iter().zip(results) {
            match result {
                Ok(_) if datasets.contains_key(&query.name) => {
                    log::warn!("[{}] duplicate query name, keeping the first", query.name);
                    failures.push(QueryFailure {
                        name: query.name.clone(),
                        error: ChemhexError::validation(format!(
                            "duplicate query name '{}'",
                            query.name
                        )),
                    });
                }
                Ok(dataset) => {
                    options.push(query.name.clone());
                    datasets.insert(query.name.clone(), dataset);
                }
                Err(error) => {
                    if error.is_data_error() {
                        log::warn!("[{}] failed: {}", query.name, error);
                    } else {
                        log::error!("[{}] failed: {}", query.name, error);
                    }
                    failures.push(QueryFailure {
                        name: query.name.clone(),
                        error,
                    });
                }
            }
        }

        SourceBundle {
            default_query: options.first().cloned(),
            datasets,
            options,
            failures,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chemhex_core::{AspectMode, PlotBounds};

    fn record(id: &str, raw: u64, weighted: f64, logp: f64, mass: f64) -> EntityRecord {
        EntityRecord::new(id, raw, weighted)
            .with_properties(logp, mass)
            .with_name(format!("name of {}", id))
    }

    fn fixed_config() -> PipelineConfig {
        let mut config = PipelineConfig::default();
        config.geometry.hex_size = 1.0;
        config.geometry.aspect = AspectMode::Fixed { aspect_scale: 1.0 };
        config.rescale_weighted = false;
        config
    }

    #[test]
    fn test_weighted_channel_rescaling() {
        let records = vec![record("A", 6, 1.0, 0.0, 0.0), record("B", 2, 3.0, 0.0, 0.0)];
        // factor = 8 / 4 = 2
        assert_eq!(weighted_channel(&records, true), vec![3.0, 7.0]);
        assert_eq!(weighted_channel(&records, false), vec![1.0, 3.0]);

        let zero = vec![record("A", 5, 0.0, 0.0, 0.0)];
        assert_eq!(weighted_channel(&zero, true), vec![1.0]);
    }

    #[test]
    fn test_title() {
        assert_eq!(
            dataset_title(42, "coffee"),
            "Hexbin plot for 42 annotated chemicals with query coffee"
        );
    }

    #[test]
    fn test_build_query_rows() {
        let builder = SourceBuilder::new(fixed_config()).unwrap();
        let query = QueryInput::new(
            "coffee",
            vec![record("C1", 5, 5.0, 1.0, 1.0), record("C2", 3, 3.0, 1.0, 1.0)],
        );
        let dataset = builder.build_query(&query).unwrap();
        assert_eq!(dataset.title(), dataset_title(8, "coffee"));
        assert_eq!(dataset.table().len(), 1);

        let rows = dataset.rows();
        assert_eq!(rows.len(), 41);
        let occupied: Vec<&HexRow> = rows.iter().filter(|r| r.base_weight > 0.0).collect();
        assert_eq!(occupied.len(), 1);
        let row = occupied[0];
        assert_eq!(row.base_weight, 8.0);
        assert_eq!(row.top_k[0].entity_id, "C1");
        assert_eq!(row.top_k[0].display_name, "name of C1");
        assert_eq!(row.blurred_weight_by_sigma[&SigmaKey::ZERO], 8.0);
        assert_eq!(row.blurred_weight_by_sigma.len(), 17);

        for row in rows.iter().filter(|r| r.base_weight == 0.0) {
            assert_eq!(row.top_k.len(), 3);
            assert!(row.top_k.iter().all(Contributor::is_empty));
            assert_eq!(row.blurred_weight_by_sigma[&SigmaKey::ZERO], 0.0);
        }
    }

    #[test]
    fn test_records_without_properties_are_dropped() {
        let builder = SourceBuilder::new(fixed_config()).unwrap();
        let mut missing = EntityRecord::new("X", 10, 1.0);
        missing.logp = Some(2.0);
        let query = QueryInput::new("q", vec![record("A", 1, 1.0, 0.0, 0.0), missing]);
        let dataset = builder.build_query(&query).unwrap();
        assert_eq!(dataset.records().len(), 1);
        assert_eq!(dataset.title(), dataset_title(1, "q"));
    }

    #[test]
    fn test_empty_query_is_empty_dataset() {
        let builder = SourceBuilder::new(PipelineConfig::default()).unwrap();
        let dataset = builder.build_query(&QueryInput::new("empty", vec![])).unwrap();
        assert!(dataset.is_empty());
        assert!(dataset.rows().is_empty());
    }

    #[test]
    fn test_failure_isolation() {
        let mut config = PipelineConfig::default();
        config.geometry.aspect = AspectMode::FitData;
        let builder = SourceBuilder::new(config).unwrap();

        let good = QueryInput::new(
            "good",
            vec![record("A", 1, 1.0, 0.0, 100.0), record("B", 2, 1.0, 3.0, 300.0)],
        );
        let flat = QueryInput::new(
            "flat",
            vec![record("A", 1, 1.0, 2.0, 100.0), record("B", 1, 1.0, 2.0, 200.0)],
        );
        let also_good = QueryInput::new(
            "other",
            vec![record("C", 4, 2.0, -1.0, 50.0), record("D", 1, 1.0, 4.0, 90.0)],
        );

        let bundle = builder.build(&[flat, good, also_good]);
        assert_eq!(bundle.options, vec!["good", "other"]);
        assert_eq!(bundle.default_query.as_deref(), Some("good"));
        assert_eq!(bundle.failures.len(), 1);
        assert_eq!(bundle.failures[0].name, "flat");
        assert!(matches!(bundle.failures[0].error, ChemhexError::InvalidGeometry(_)));
        assert!(bundle.get("good").is_ok());
        assert!(matches!(bundle.get("flat"), Err(ChemhexError::UnknownQuery(_))));
    }

    #[test]
    fn test_duplicate_query_names() {
        let builder = SourceBuilder::new(fixed_config()).unwrap();
        let a = QueryInput::new("same", vec![record("A", 1, 1.0, 0.0, 0.0)]);
        let b = QueryInput::new("same", vec![record("B", 1, 1.0, 5.0, 5.0)]);
        let bundle = builder.build(&[a, b]);
        assert_eq!(bundle.options, vec!["same"]);
        assert_eq!(bundle.failures.len(), 1);
        assert_eq!(bundle.get("same").unwrap().records()[0].entity_id, "A");
    }

    #[test]
    fn test_rejects_invalid_config() {
        let mut config = PipelineConfig::default();
        config.geometry.aspect = AspectMode::Bounds {
            bounds: PlotBounds::new(0.0, 1.0, 5.0, 5.0),
        };
        assert!(SourceBuilder::new(config).is_err());
    }
}
