//! Gaussian blur kernel.
//!
//! The footprint and its centre distances are derived from the unit
//! lattice of one orientation and built once. Coefficients for a given σ
//! are computed separately so one footprint serves the whole σ range.
//!
//! An offset belongs to the footprint when its unit-lattice displacement
//! lies inside the ellipse `dx² + (2·dy)² <= extent²`. The factor 2 on the
//! vertical axis matches the `σy = σx / 2` convention of the coefficients,
//! so the footprint follows the blur's own iso-density contours. With the
//! default extent of 8 the flat-top footprint has 40 offsets reaching five
//! columns to each side.

use crate::axial::HexGeometry;
use chemhex_core::{ChemhexError, Orientation, Result, SigmaKey, MAX_KERNEL_EXTENT};
use serde::{Deserialize, Serialize};

/// Default ellipse radius of the footprint in unit-lattice distance.
pub const DEFAULT_EXTENT: f64 = 8.0;

/// One neighbour offset and its centre-to-centre distance components.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KernelEntry {
    pub dq: i32,
    pub dr: i32,
    pub dx: f64,
    pub dy: f64,
}

/// Fixed neighbour footprint of one orientation.
#[derive(Debug, Clone, PartialEq)]
pub struct BlurKernel {
    orientation: Orientation,
    extent: f64,
    entries: Vec<KernelEntry>,
}

impl BlurKernel {
    /// Enumerates all offsets inside the footprint, ordered by (dq, dr).
    pub fn build(orientation: Orientation, extent: f64) -> Result<Self> {
        if !(1.0..=MAX_KERNEL_EXTENT).contains(&extent) {
            return Err(ChemhexError::config(format!(
                "kernel extent must be within 1..={}, got {}",
                MAX_KERNEL_EXTENT, extent
            )));
        }
        let unit = HexGeometry::unit(orientation);
        let bound = extent.ceil() as i32 + 1;
        let limit = extent * extent + 1e-9;

        let mut entries = Vec::new();
        for dq in -bound..=bound {
            for dr in -bound..=bound {
                if dq == 0 && dr == 0 {
                    continue;
                }
                let (dx, dy) = unit.displacement(dq, dr);
                let (dx, dy) = (dx.abs(), dy.abs());
                if dx * dx + 4.0 * dy * dy <= limit {
                    entries.push(KernelEntry { dq, dr, dx, dy });
                }
            }
        }
        log::debug!(
            "Built {} blur kernel: {} offsets (extent {})",
            orientation,
            entries.len(),
            extent
        );
        Ok(Self {
            orientation,
            extent,
            entries,
        })
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn extent(&self) -> f64 {
        self.extent
    }

    pub fn entries(&self) -> &[KernelEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Coefficient per entry for `sigma` (σx; σy is half of it).
    /// All zero at σ = 0.
    pub fn coefficients(&self, sigma: SigmaKey) -> Vec<f64> {
        let sigma_x = sigma.as_f64();
        self.entries
            .iter()
            .map(|entry| blur_coefficient(entry.dx, entry.dy, sigma_x))
            .collect()
    }
}

/// Anisotropic Gaussian `exp(-0.5·(dx²/σx² + dy²/σy²))` with `σy = σx/2`.
pub fn blur_coefficient(dx: f64, dy: f64, sigma_x: f64) -> f64 {
    if sigma_x <= 0.0 {
        return 0.0;
    }
    let sigma_y = sigma_x / 2.0;
    (-0.5 * (dx * dx / (sigma_x * sigma_x) + dy * dy / (sigma_y * sigma_y))).exp()
}
