//! Per-hexagon aggregation of weighted samples.

use crate::axial::{AxialCoord, HexGeometry};
use chemhex_core::{Channel, ChannelWeights, Contributor, EntityNames, Sample};
use std::cmp::Ordering;
use std::collections::HashMap;

/// One cell of the lattice.
///
/// Cells created by blur spill-over have zero totals and no entities.
#[derive(Debug, Clone, PartialEq)]
pub struct Hexagon {
    coord: AxialCoord,
    total: ChannelWeights,
    entities: HashMap<String, ChannelWeights>,
}

impl Hexagon {
    pub fn new(coord: AxialCoord) -> Self {
        Self {
            coord,
            total: ChannelWeights::ZERO,
            entities: HashMap::new(),
        }
    }

    pub fn coord(&self) -> AxialCoord {
        self.coord
    }

    /// Sum of all sample weights in this cell.
    pub fn total(&self) -> ChannelWeights {
        self.total
    }

    pub fn entity_weights(&self) -> &HashMap<String, ChannelWeights> {
        &self.entities
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    fn add(&mut self, sample: &Sample) {
        let weight = sample.weight();
        self.total += weight;
        *self
            .entities
            .entry(sample.entity_id().to_string())
            .or_default() += weight;
    }

    /// The `k` heaviest entities in `channel`, ordered by weight descending
    /// then entity id ascending, padded with empty slots to exactly `k`.
    pub fn top_k(&self, channel: Channel, k: usize, names: &dyn EntityNames) -> Vec<Contributor> {
        let mut ranked: Vec<(&str, f64)> = self
            .entities
            .iter()
            .map(|(id, weight)| (id.as_str(), weight.get(channel)))
            .collect();
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.cmp(b.0))
        });

        let mut slots: Vec<Contributor> = ranked
            .into_iter()
            .take(k)
            .map(|(id, weight)| Contributor {
                entity_id: id.to_string(),
                weight,
                display_name: names.name_or_empty(id).to_string(),
            })
            .collect();
        slots.resize_with(k, Contributor::empty);
        slots
    }
}

/// Arena of hexagons keyed by packed axial coordinate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HexTable {
    cells: HashMap<u64, Hexagon>,
}

impl HexTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn get(&self, coord: AxialCoord) -> Option<&Hexagon> {
        self.cells.get(&coord.pack())
    }

    pub fn contains(&self, coord: AxialCoord) -> bool {
        self.cells.contains_key(&coord.pack())
    }

    fn entry(&mut self, coord: AxialCoord) -> &mut Hexagon {
        self.cells
            .entry(coord.pack())
            .or_insert_with(|| Hexagon::new(coord))
    }

    /// Occupied coordinates in ascending (q, r) order.
    pub fn coords(&self) -> Vec<AxialCoord> {
        let mut coords: Vec<AxialCoord> = self.cells.values().map(Hexagon::coord).collect();
        coords.sort_unstable();
        coords
    }

    /// Hexagons in ascending (q, r) order.
    pub fn hexagons(&self) -> Vec<&Hexagon> {
        let mut cells: Vec<&Hexagon> = self.cells.values().collect();
        cells.sort_unstable_by_key(|h| h.coord());
        cells
    }

    /// Sum over all cells.
    pub fn total(&self) -> ChannelWeights {
        let mut total = ChannelWeights::ZERO;
        for hexagon in self.hexagons() {
            total += hexagon.total();
        }
        total
    }
}

/// Groups samples into hexagons under a fixed geometry.
#[derive(Debug, Clone, Copy)]
pub struct HexAggregator {
    geometry: HexGeometry,
}

impl HexAggregator {
    pub fn new(geometry: HexGeometry) -> Self {
        Self { geometry }
    }

    pub fn geometry(&self) -> &HexGeometry {
        &self.geometry
    }

    /// One hexagon per distinct coordinate the samples land in.
    pub fn aggregate(&self, samples: &[Sample]) -> HexTable {
        let mut table = HexTable::new();
        for sample in samples {
            let coord = self.geometry.to_axial(sample.x(), sample.y());
            table.entry(coord).add(sample);
        }
        log::debug!(
            "Aggregated {} samples into {} hexagons",
            samples.len(),
            table.len()
        );
        table
    }
}
