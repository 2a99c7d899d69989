//! # chemhex-hexbin
//!
//! Hexagonal binning and Gaussian blur for weighted (logP, mass) samples.
//!
//! - **axial**: Cartesian ↔ axial coordinates, geometry fitting, cell corners
//! - **aggregate**: per-hexagon totals, per-entity weights, top-K contributors
//! - **kernel**: orientation-specific neighbour footprint and σ coefficients
//! - **propagate**: multi-σ splatting onto neighbour cells

pub mod aggregate;
pub mod axial;
pub mod kernel;
pub mod propagate;

pub use aggregate::{HexAggregator, HexTable, Hexagon};
pub use axial::{fit_geometry, AxialCoord, HexGeometry};
pub use kernel::{blur_coefficient, BlurKernel, KernelEntry, DEFAULT_EXTENT};
pub use propagate::{BlurStack, BlurredLattice};
