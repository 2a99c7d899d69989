//! Cross-query ratio comparison
//!
//! Two queries are binned on one shared pointy-top grid fitted to their
//! combined range. Per-cell raw counts are compared as a log ratio: cells
//! where the first query dominates are "high", the rest "low".

use crate::inputs::QueryInput;
use chemhex_core::{ChannelWeights, ChemhexError, Orientation, PlotBounds, Result, Sample};
use chemhex_hexbin::{AxialCoord, HexAggregator, HexGeometry, HexTable};
use serde::{Deserialize, Serialize};

/// Options of a ratio comparison.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RatioOptions {
    /// Counts below this (including absent cells) are raised to it
    pub lower_bound: f64,
    /// Correct for different total counts of the two queries
    pub normalize: bool,
    pub hex_size: f64,
    pub orientation: Orientation,
}

impl Default for RatioOptions {
    fn default() -> Self {
        Self {
            lower_bound: 2.0,
            normalize: false,
            hex_size: 10.0,
            orientation: Orientation::PointyTop,
        }
    }
}

impl RatioOptions {
    pub fn validate(&self) -> Result<()> {
        if !self.lower_bound.is_finite() || self.lower_bound <= 0.0 {
            return Err(ChemhexError::config(format!(
                "ratio lower bound must be positive, got {}",
                self.lower_bound
            )));
        }
        if !self.hex_size.is_finite() || self.hex_size <= 0.0 {
            return Err(ChemhexError::invalid_geometry(format!(
                "hex_size must be positive, got {}",
                self.hex_size
            )));
        }
        Ok(())
    }
}

/// One compared cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatioCell {
    pub q: i32,
    pub r: i32,
    pub count_a: f64,
    pub count_b: f64,
    pub ratio: f64,
    pub log_ratio: f64,
}

/// Result of comparing query A with query B.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatioComparison {
    pub title: String,
    pub query_a: String,
    pub query_b: String,
    pub geometry: HexGeometry,
    pub bounds: Option<PlotBounds>,
    /// Cells with `log_ratio < 0`
    pub low: Vec<RatioCell>,
    /// Cells with `log_ratio >= 0`
    pub high: Vec<RatioCell>,
    pub minimum: f64,
    pub maximum: f64,
    /// Symmetric colour range: max(|minimum|, maximum)
    pub extreme: f64,
}

fn raw_samples(query: &QueryInput) -> Result<Vec<Sample>> {
    query
        .records
        .iter()
        .filter_map(|record| record.coordinates().map(|(x, y)| (record, x, y)))
        .map(|(record, x, y)| {
            Sample::new(
                record.entity_id.clone(),
                x,
                y,
                ChannelWeights::uniform(record.raw_count as f64),
            )
        })
        .collect()
}

/// Per-cell ratio `a / b` after the lower bound and optional normalization.
pub fn cell_ratio(a: f64, b: f64, total_a: f64, total_b: f64, options: &RatioOptions) -> f64 {
    let (mut a, mut b) = (a, b);
    if options.normalize {
        let factor = total_a / total_b;
        if total_a < total_b {
            if a > options.lower_bound {
                a /= factor;
            }
        } else if b > options.lower_bound {
            b *= factor;
        }
    }
    a / b
}

impl RatioComparison {
    pub fn compare(a: &QueryInput, b: &QueryInput, options: &RatioOptions) -> Result<Self> {
        options.validate()?;
        let samples_a = raw_samples(a)?;
        let samples_b = raw_samples(b)?;

        let xs: Vec<f64> = samples_a.iter().chain(&samples_b).map(Sample::x).collect();
        let ys: Vec<f64> = samples_a.iter().chain(&samples_b).map(Sample::y).collect();
        let bounds = PlotBounds::enclosing(&xs, &ys);
        let geometry = match &bounds {
            Some(bounds) => {
                HexGeometry::new(options.hex_size, options.orientation, bounds.ratio()?)?
            }
            None => HexGeometry::new(options.hex_size, options.orientation, 1.0)?,
        };

        let aggregator = HexAggregator::new(geometry);
        let table_a = aggregator.aggregate(&samples_a);
        let table_b = aggregator.aggregate(&samples_b);
        let cells = Self::merge(&table_a, &table_b, options);

        let minimum = cells.iter().map(|c| c.log_ratio).fold(f64::INFINITY, f64::min);
        let maximum = cells
            .iter()
            .map(|c| c.log_ratio)
            .fold(f64::NEG_INFINITY, f64::max);
        let (minimum, maximum) = if cells.is_empty() {
            (0.0, 0.0)
        } else {
            (minimum, maximum)
        };
        let (low, high): (Vec<RatioCell>, Vec<RatioCell>) =
            cells.into_iter().partition(|c| c.log_ratio < 0.0);

        log::info!(
            "Compared {} with {}: {} low cells, {} high cells",
            a.name,
            b.name,
            low.len(),
            high.len()
        );

        Ok(Self {
            title: format!("Hexbin plot comparing {} with {}", a.name, b.name),
            query_a: a.name.clone(),
            query_b: b.name.clone(),
            geometry,
            bounds,
            low,
            high,
            minimum,
            maximum,
            extreme: minimum.abs().max(maximum),
        })
    }

    /// Outer join of both tables with the lower bound applied.
    fn merge(table_a: &HexTable, table_b: &HexTable, options: &RatioOptions) -> Vec<RatioCell> {
        let mut coords: Vec<AxialCoord> = table_a.coords();
        coords.extend(table_b.coords());
        coords.sort_unstable();
        coords.dedup();

        let floor = |count: Option<f64>| count.unwrap_or(options.lower_bound).max(options.lower_bound);
        let counts: Vec<(AxialCoord, f64, f64)> = coords
            .into_iter()
            .map(|coord| {
                let a = floor(table_a.get(coord).map(|h| h.total().raw));
                let b = floor(table_b.get(coord).map(|h| h.total().raw));
                (coord, a, b)
            })
            .collect();

        let total_a: f64 = counts.iter().map(|c| c.1).sum();
        let total_b: f64 = counts.iter().map(|c| c.2).sum();

        counts
            .into_iter()
            .map(|(coord, a, b)| {
                let ratio = cell_ratio(a, b, total_a, total_b, options);
                RatioCell {
                    q: coord.q,
                    r: coord.r,
                    count_a: a,
                    count_b: b,
                    ratio,
                    log_ratio: ratio.ln(),
                }
            })
            .collect()
    }

    pub fn cell_count(&self) -> usize {
        self.low.len() + self.high.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chemhex_core::EntityRecord;

    fn query(name: &str, points: &[(&str, u64, f64, f64)]) -> QueryInput {
        QueryInput::new(
            name,
            points
                .iter()
                .map(|&(id, count, logp, mass)| {
                    EntityRecord::new(id, count, count as f64).with_properties(logp, mass)
                })
                .collect(),
        )
    }

    #[test]
    fn test_cell_ratio_normalization() {
        let options = RatioOptions {
            normalize: true,
            ..RatioOptions::default()
        };
        // total_a < total_b: a is scaled up when above the bound
        assert_eq!(cell_ratio(4.0, 4.0, 10.0, 20.0, &options), 2.0);
        // at the bound a is left alone
        assert_eq!(cell_ratio(2.0, 4.0, 10.0, 20.0, &options), 0.5);
        // total_a >= total_b: b is scaled up
        assert_eq!(cell_ratio(4.0, 4.0, 20.0, 10.0, &options), 0.5);

        let plain = RatioOptions::default();
        assert_eq!(cell_ratio(4.0, 4.0, 10.0, 20.0, &plain), 1.0);
    }

    #[test]
    fn test_compare_splits_low_and_high() {
        let a = query("coffee", &[("A", 10, 0.0, 100.0), ("B", 1, 5.0, 600.0)]);
        let b = query("tea", &[("C", 1, 0.0, 100.0), ("D", 8, 5.0, 600.0)]);
        let comparison = RatioComparison::compare(&a, &b, &RatioOptions::default()).unwrap();

        assert_eq!(comparison.title, "Hexbin plot comparing coffee with tea");
        assert_eq!(comparison.cell_count(), 2);
        assert_eq!(comparison.high.len(), 1);
        assert_eq!(comparison.low.len(), 1);

        // B's single count is raised to the lower bound
        let low = &comparison.low[0];
        assert_eq!(low.count_a, 2.0);
        assert_eq!(low.count_b, 8.0);
        assert!((low.log_ratio - (0.25f64).ln()).abs() < 1e-12);

        let high = &comparison.high[0];
        assert_eq!(high.count_a, 10.0);
        assert_eq!(high.count_b, 2.0);
        assert!((comparison.maximum - 5f64.ln()).abs() < 1e-12);
        assert!((comparison.extreme - 5f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn test_cells_present_in_one_query_only() {
        let a = query("a", &[("A", 6, 0.0, 100.0)]);
        let b = query("b", &[("B", 6, 9.0, 900.0)]);
        let comparison = RatioComparison::compare(&a, &b, &RatioOptions::default()).unwrap();
        assert_eq!(comparison.cell_count(), 2);
        let all: Vec<&RatioCell> = comparison.low.iter().chain(&comparison.high).collect();
        assert!(all.iter().all(|c| c.count_a >= 2.0 && c.count_b >= 2.0));
        assert!((comparison.extreme - 3f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn test_empty_comparison() {
        let comparison =
            RatioComparison::compare(&query("a", &[]), &query("b", &[]), &RatioOptions::default())
                .unwrap();
        assert_eq!(comparison.cell_count(), 0);
        assert_eq!(comparison.extreme, 0.0);
        assert!(comparison.bounds.is_none());
    }

    #[test]
    fn test_identical_range_is_invalid() {
        let a = query("a", &[("A", 1, 2.0, 100.0)]);
        let b = query("b", &[("B", 1, 2.0, 300.0)]);
        let err = RatioComparison::compare(&a, &b, &RatioOptions::default()).unwrap_err();
        assert!(matches!(err, ChemhexError::InvalidGeometry(_)));
    }
}
