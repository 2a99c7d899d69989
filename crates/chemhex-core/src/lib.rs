//! # chemhex-core
//!
//! Core types, configuration and errors for chemhex density maps.
//!
//! - **Types**: samples, entity records, contributors, plot bounds
//! - **Config**: geometry, blur range and pipeline settings
//! - **Sigma**: fixed-point σ keys and their decimal string form
//! - **Errors**: unified error handling with `ChemhexError`
//!
//! ```text
//! ┌─────────────────┐
//! │  chemhex-core   │  ← types / config / errors
//! └─────────────────┘
//!         ▲
//! ┌───────┴─────────┐
//! │ chemhex-hexbin  │  ← mapper, aggregator, kernel, propagator
//! └─────────────────┘
//!         ▲
//! ┌───────┴─────────┐
//! │ chemhex-report  │  ← sources, inputs, outputs, figures, CLI
//! └─────────────────┘
//! ```

pub mod config;
pub mod errors;
pub mod sigma;
pub mod traits;
pub mod types;

pub use config::{
    AspectMode, BlurConfig, GeometryConfig, PipelineConfig, DEFAULT_BOUNDS,
    MAX_KERNEL_EXTENT,
};
pub use errors::{ChemhexError, Result};
pub use sigma::{sigma_range, SigmaKey};
pub use traits::{EntityNames, NoNames};
pub use types::{
    Channel, ChannelWeights, Contributor, EntityRecord, Orientation, PlotBounds, Sample,
};
