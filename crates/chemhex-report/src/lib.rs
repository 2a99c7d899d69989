//! chemhex dataset and figure generator
//!
//! Turns literature-mining query tables into hexagonal density maps over
//! logP and mass: one dataset per query with blurred lattices for a range of
//! σ values, cross-query ratio comparisons and SVG figures.
//!
//! # Features
//!
//! - Parallel multi-query source building with per-query failure isolation
//! - Raw and weighted (TF-IDF style) channels with top-K contributors
//! - Ontology class overlays
//! - Log-ratio comparison of two queries on a shared grid
//!
//! # CLI Contract
//!
//! ```bash
//! chemhex build --input tables/ --out results/ \
//!     [--config chemhex.json] [--blur-max 4 --blur-step 0.25] \
//!     [--bounds -5,10,0,1600] [--class-names classes.tsv --class purines]
//!
//! chemhex compare --a tables/coffee_hits.tsv --b tables/tea_hits.tsv \
//!     --out results/ [--normalize] [--lower-bound 2]
//!
//! chemhex kernel [--orientation pointytop]
//! ```

pub mod classes;
pub mod config;
pub mod figures;
pub mod inputs;
pub mod outputs;
pub mod pipeline;
pub mod ratios;
pub mod sources;

// Re-exports
pub use classes::ClassOverlay;
pub use config::{ClassOverlayConfig, FigureOptions, ReportConfig};
pub use inputs::{parse_query_table, read_query_folder, read_query_table, QueryInput};
pub use outputs::{BundleJson, DatasetJson, OutputContract};
pub use pipeline::{compare_queries, PipelineResult, ReportPipeline};
pub use ratios::{RatioCell, RatioComparison, RatioOptions};
pub use sources::{HexRow, QueryDataset, QueryFailure, SourceBuilder, SourceBundle};

/// Crate version (from Cargo.toml)
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
