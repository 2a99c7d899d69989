//! Blur propagation over a σ range.
//!
//! Every σ layer starts from the unblurred cell totals and receives each
//! occupied cell's totals times the kernel coefficient of every offset.
//! All layers share one cell set: the occupied cells plus every cell inside
//! an occupied cell's footprint. Spill-over cells have zero base weight.

use crate::aggregate::HexTable;
use crate::axial::AxialCoord;
use crate::kernel::BlurKernel;
use chemhex_core::{Channel, ChannelWeights, ChemhexError, Result, SigmaKey};
use rayon::prelude::*;
use std::collections::HashMap;

/// Blurred weights of one query for a set of σ values.
#[derive(Debug, Clone, PartialEq)]
pub struct BlurStack {
    cells: Vec<AxialCoord>,
    index: HashMap<u64, usize>,
    base: Vec<ChannelWeights>,
    sigmas: Vec<SigmaKey>,
    layers: HashMap<SigmaKey, Vec<ChannelWeights>>,
}

impl BlurStack {
    /// Precomputes one layer per σ. Layers are independent and computed in
    /// parallel; sources are visited in (q, r) order so the result does not
    /// depend on scheduling.
    pub fn build(table: &HexTable, kernel: &BlurKernel, sigmas: &[SigmaKey]) -> Self {
        let plan = SpreadPlan::new(table, kernel);

        let mut sigmas = sigmas.to_vec();
        sigmas.sort_unstable();
        sigmas.dedup();

        let order: Vec<usize> = (0..plan.routes.len()).collect();
        let layers: HashMap<SigmaKey, Vec<ChannelWeights>> = sigmas
            .par_iter()
            .map(|&sigma| (sigma, plan.layer(kernel, sigma, &order)))
            .collect();

        log::debug!(
            "Propagated {} sources over {} cells for {} sigma values",
            plan.routes.len(),
            plan.cells.len(),
            sigmas.len()
        );

        Self {
            cells: plan.cells,
            index: plan.index,
            base: plan.base,
            sigmas,
            layers,
        }
    }

    /// All cells in ascending (q, r) order.
    pub fn cells(&self) -> &[AxialCoord] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// σ values in ascending order.
    pub fn sigmas(&self) -> &[SigmaKey] {
        &self.sigmas
    }

    /// Unblurred totals aligned with `cells()`.
    pub fn base(&self) -> &[ChannelWeights] {
        &self.base
    }

    pub fn layer(&self, sigma: SigmaKey) -> Option<&[ChannelWeights]> {
        self.layers.get(&sigma).map(Vec::as_slice)
    }

    /// Looks up a layer by its decimal σ string ("0", "0.25", "1").
    pub fn select(&self, key: &str) -> Result<BlurredLattice<'_>> {
        let sigma: SigmaKey = key.parse()?;
        self.lattice(sigma)
            .ok_or_else(|| ChemhexError::UnknownSigma(key.to_string()))
    }

    pub fn lattice(&self, sigma: SigmaKey) -> Option<BlurredLattice<'_>> {
        self.layer(sigma).map(|weights| BlurredLattice {
            sigma,
            cells: &self.cells,
            index: &self.index,
            weights,
        })
    }

    pub fn weight_at(&self, sigma: SigmaKey, coord: AxialCoord) -> Option<ChannelWeights> {
        self.lattice(sigma)?.get(coord)
    }
}

/// Shared cell set and per-source routes, computed once for all σ.
struct SpreadPlan {
    cells: Vec<AxialCoord>,
    index: HashMap<u64, usize>,
    base: Vec<ChannelWeights>,
    /// per source: its totals and (cell index, kernel entry index) pairs
    routes: Vec<(ChannelWeights, Vec<(usize, usize)>)>,
}

impl SpreadPlan {
    fn new(table: &HexTable, kernel: &BlurKernel) -> Self {
        let sources = table.hexagons();

        let mut cells: Vec<AxialCoord> = Vec::with_capacity(sources.len() * (kernel.len() + 1));
        for hexagon in &sources {
            let coord = hexagon.coord();
            cells.push(coord);
            cells.extend(kernel.entries().iter().map(|e| coord.offset(e.dq, e.dr)));
        }
        cells.sort_unstable();
        cells.dedup();

        let index: HashMap<u64, usize> = cells
            .iter()
            .enumerate()
            .map(|(i, coord)| (coord.pack(), i))
            .collect();

        let base: Vec<ChannelWeights> = cells
            .iter()
            .map(|coord| table.get(*coord).map(|h| h.total()).unwrap_or_default())
            .collect();

        let routes = sources
            .iter()
            .map(|hexagon| {
                let coord = hexagon.coord();
                let targets = kernel
                    .entries()
                    .iter()
                    .enumerate()
                    .filter_map(|(k, e)| {
                        index
                            .get(&coord.offset(e.dq, e.dr).pack())
                            .map(|&target| (target, k))
                    })
                    .collect();
                (hexagon.total(), targets)
            })
            .collect();

        Self {
            cells,
            index,
            base,
            routes,
        }
    }

    /// One σ layer, spreading sources in the given route order.
    fn layer(&self, kernel: &BlurKernel, sigma: SigmaKey, order: &[usize]) -> Vec<ChannelWeights> {
        let mut weights = self.base.clone();
        if sigma.is_zero() {
            return weights;
        }
        let coefficients = kernel.coefficients(sigma);
        for &source in order {
            let (total, targets) = &self.routes[source];
            for &(target, k) in targets {
                weights[target] += total.scaled(coefficients[k]);
            }
        }
        weights
    }
}

/// Read-only view of one σ layer.
#[derive(Debug, Clone, Copy)]
pub struct BlurredLattice<'a> {
    sigma: SigmaKey,
    cells: &'a [AxialCoord],
    index: &'a HashMap<u64, usize>,
    weights: &'a [ChannelWeights],
}

impl<'a> BlurredLattice<'a> {
    pub fn sigma(&self) -> SigmaKey {
        self.sigma
    }

    pub fn get(&self, coord: AxialCoord) -> Option<ChannelWeights> {
        self.index.get(&coord.pack()).map(|&i| self.weights[i])
    }

    /// (cell, weights) in ascending (q, r) order.
    pub fn iter(&self) -> impl Iterator<Item = (AxialCoord, ChannelWeights)> + 'a {
        self.cells.iter().copied().zip(self.weights.iter().copied())
    }

    pub fn total(&self, channel: Channel) -> f64 {
        self.weights.iter().map(|w| w.get(channel)).sum()
    }

    pub fn max(&self, channel: Channel) -> f64 {
        self.weights
            .iter()
            .map(|w| w.get(channel))
            .fold(0.0, f64::max)
    }
}
