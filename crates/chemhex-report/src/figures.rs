//! Figure generation using plotters (SVG output)
//!
//! Uses SVG backend to avoid system font dependencies.

use crate::classes::ClassOverlay;
use crate::config::FigureOptions;
use crate::outputs::OutputContract;
use crate::ratios::{RatioCell, RatioComparison};
use crate::sources::QueryDataset;
use anyhow::Result;
use chemhex_core::Channel;
use chemhex_hexbin::{AxialCoord, BlurredLattice, HexGeometry};
use plotters::prelude::*;
use plotters_svg::SVGBackend;
use std::path::{Path, PathBuf};

/// Plot background, the low end of the viridis ramp
const BACKGROUND: RGBColor = RGBColor(68, 1, 84);

const VIRIDIS: [(f64, f64, f64); 5] = [
    (68.0, 1.0, 84.0),
    (59.0, 82.0, 139.0),
    (33.0, 145.0, 140.0),
    (94.0, 201.0, 98.0),
    (253.0, 231.0, 37.0),
];

/// Viridis-like ramp over [0, 1]
fn viridis(value: f64) -> RGBColor {
    let v = if value.is_finite() { value.clamp(0.0, 1.0) } else { 0.0 };
    let scaled = v * (VIRIDIS.len() - 1) as f64;
    let i = (scaled.floor() as usize).min(VIRIDIS.len() - 2);
    let t = scaled - i as f64;
    let (a, b) = (VIRIDIS[i], VIRIDIS[i + 1]);
    let lerp = |x: f64, y: f64| (x + (y - x) * t).round() as u8;
    RGBColor(lerp(a.0, b.0), lerp(a.1, b.1), lerp(a.2, b.2))
}

/// Cell colour value: `weight^(1/saturation)` relative to the largest cell.
fn saturated(weight: f64, max_weight: f64, saturation: f64) -> f64 {
    if max_weight <= 0.0 {
        return 0.0;
    }
    let root = 1.0 / saturation;
    weight.max(0.0).powf(root) / max_weight.powf(root)
}

/// Blue (low) -> White (even) -> Red (high), symmetric around log ratio 0
fn ratio_color(log_ratio: f64, extreme: f64) -> RGBColor {
    let v = if extreme > 0.0 {
        (0.5 + 0.5 * log_ratio / extreme).clamp(0.0, 1.0)
    } else {
        0.5
    };
    if v < 0.5 {
        let t = v * 2.0;
        RGBColor((255.0 * t) as u8, (255.0 * t) as u8, 255)
    } else {
        let t = (v - 0.5) * 2.0;
        RGBColor(255, (255.0 * (1.0 - t)) as u8, (255.0 * (1.0 - t)) as u8)
    }
}

/// Data-space extent of a set of cells, padded by a small margin
fn cell_extent(geometry: &HexGeometry, coords: &[AxialCoord]) -> Option<((f64, f64), (f64, f64))> {
    let corners: Vec<(f64, f64)> = coords
        .iter()
        .flat_map(|&c| geometry.corners(c))
        .collect();
    if corners.is_empty() {
        return None;
    }
    let (x0, x1, y0, y1) = corners.iter().fold(
        (f64::INFINITY, f64::NEG_INFINITY, f64::INFINITY, f64::NEG_INFINITY),
        |(x0, x1, y0, y1), &(x, y)| (x0.min(x), x1.max(x), y0.min(y), y1.max(y)),
    );
    let px = (x1 - x0) * 0.02;
    let py = (y1 - y0) * 0.02;
    Some(((x0 - px, x1 + px), (y0 - py, y1 + py)))
}

fn draw_no_data(path: &Path, options: &FigureOptions) -> Result<()> {
    let root = SVGBackend::new(path, (options.width, options.height)).into_drawing_area();
    root.fill(&WHITE)?;
    root.draw(&Text::new(
        "No data",
        (options.width as i32 / 2, options.height as i32 / 2),
        ("sans-serif", 20).into_font().color(&BLACK),
    ))?;
    root.present()?;
    Ok(())
}

/// Generate the hexbin figure of one query channel at one σ
pub fn generate_hexbin_figure(
    path: &Path,
    dataset: &QueryDataset,
    lattice: &BlurredLattice<'_>,
    channel: Channel,
    overlay: Option<&ClassOverlay>,
    options: &FigureOptions,
) -> Result<()> {
    let geometry = dataset.geometry();
    let cells: Vec<(AxialCoord, f64)> = lattice
        .iter()
        .map(|(coord, w)| (coord, w.get(channel)))
        .filter(|(_, w)| *w > 0.0)
        .collect();
    let coords: Vec<AxialCoord> = cells.iter().map(|(c, _)| *c).collect();

    let Some(((x0, x1), (y0, y1))) = cell_extent(geometry, &coords) else {
        return draw_no_data(path, options);
    };

    let root = SVGBackend::new(path, (options.width, options.height)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(
            format!("{} (sigma = {}, {})", dataset.title(), lattice.sigma(), channel.as_str()),
            ("sans-serif", 16),
        )
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x0..x1, y0..y1)?;

    chart.plotting_area().fill(&BACKGROUND)?;
    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc("log(P)")
        .y_desc("mass in Da")
        .draw()?;

    let max_weight = lattice.max(channel);
    chart.draw_series(cells.iter().map(|&(coord, weight)| {
        let color = viridis(saturated(weight, max_weight, options.saturation));
        Polygon::new(geometry.corners(coord).to_vec(), color.filled())
    }))?;

    if let Some(overlay) = overlay {
        chart.draw_series(overlay.cells.iter().map(|&coord| {
            let mut outline = geometry.corners(coord).to_vec();
            outline.push(outline[0]);
            PathElement::new(outline, RED.stroke_width(2))
        }))?;
    }

    root.present()?;
    Ok(())
}

/// Generate the figures of one query for every configured σ and channel.
///
/// σ values the dataset does not carry are skipped with a warning.
pub fn generate_query_figures(
    contract: &OutputContract,
    dataset: &QueryDataset,
    overlay: Option<&ClassOverlay>,
    options: &FigureOptions,
) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    for key in &options.sigmas {
        let lattice = match dataset.stack().select(key) {
            Ok(lattice) => lattice,
            Err(e) => {
                log::warn!("[{}] skipping figure: {}", dataset.name(), e);
                continue;
            }
        };
        for &channel in &options.channels {
            let path = contract.query_figure(dataset.name(), channel, lattice.sigma());
            generate_hexbin_figure(&path, dataset, &lattice, channel, overlay, options)?;
            written.push(path);
        }
    }
    log::debug!("[{}] {} figures", dataset.name(), written.len());
    Ok(written)
}

/// Generate the ratio comparison figure
pub fn generate_ratio_figure(
    path: &Path,
    comparison: &RatioComparison,
    options: &FigureOptions,
) -> Result<()> {
    let geometry = &comparison.geometry;
    let cells: Vec<&RatioCell> = comparison.low.iter().chain(&comparison.high).collect();
    let coords: Vec<AxialCoord> = cells.iter().map(|c| AxialCoord::new(c.q, c.r)).collect();

    let Some(((x0, x1), (y0, y1))) = cell_extent(geometry, &coords) else {
        return draw_no_data(path, options);
    };

    let root = SVGBackend::new(path, (options.width, options.height)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(&comparison.title, ("sans-serif", 16))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x0..x1, y0..y1)?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc("log(P)")
        .y_desc("mass in Da")
        .draw()?;

    chart.draw_series(cells.iter().zip(&coords).map(|(cell, &coord)| {
        let color = ratio_color(cell.log_ratio, comparison.extreme);
        Polygon::new(geometry.corners(coord).to_vec(), color.filled())
    }))?;

    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inputs::QueryInput;
    use crate::ratios::RatioOptions;
    use crate::sources::SourceBuilder;
    use chemhex_core::{EntityRecord, PipelineConfig};
    use tempfile::TempDir;

    fn dataset(records: Vec<EntityRecord>) -> QueryDataset {
        SourceBuilder::new(PipelineConfig::default())
            .unwrap()
            .build_query(&QueryInput::new("coffee", records))
            .unwrap()
    }

    #[test]
    fn test_viridis_ends() {
        assert_eq!(viridis(0.0), BACKGROUND);
        assert_eq!(viridis(1.0), RGBColor(253, 231, 37));
        assert_eq!(viridis(f64::NAN), BACKGROUND);
    }

    #[test]
    fn test_saturation_lifts_small_cells() {
        let linear = saturated(1.0, 100.0, 1.0);
        let rooted = saturated(1.0, 100.0, 2.0);
        assert!((linear - 0.01).abs() < 1e-12);
        assert!((rooted - 0.1).abs() < 1e-12);
        assert_eq!(saturated(5.0, 0.0, 1.0), 0.0);
    }

    #[test]
    fn test_ratio_color() {
        assert_eq!(ratio_color(-1.0, 1.0).2, 255); // Blue
        assert_eq!(ratio_color(1.0, 1.0).0, 255); // Red
        let even = ratio_color(0.0, 1.0);
        assert!(even.0 > 200 && even.1 > 200 && even.2 > 200);
    }

    #[test]
    fn test_query_figures() {
        let tmp = TempDir::new().unwrap();
        let contract = OutputContract::new(tmp.path()).unwrap();
        let dataset = dataset(vec![
            EntityRecord::new("caffeine", 12, 3.0).with_properties(-0.1, 194.2),
            EntityRecord::new("quinic acid", 4, 1.0).with_properties(-2.3, 192.2),
        ]);
        let options = FigureOptions {
            sigmas: vec!["0".into(), "1".into(), "9".into()],
            channels: vec![Channel::Raw, Channel::Weighted],
            ..FigureOptions::default()
        };

        let written = generate_query_figures(&contract, &dataset, None, &options).unwrap();
        assert_eq!(written.len(), 4);
        for path in &written {
            let svg = std::fs::read_to_string(path).unwrap();
            assert!(svg.contains("<svg"));
            assert!(svg.contains("polygon"));
        }
    }

    #[test]
    fn test_empty_ratio_figure() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("ratio.svg");
        let comparison = RatioComparison::compare(
            &QueryInput::new("a", vec![]),
            &QueryInput::new("b", vec![]),
            &RatioOptions::default(),
        )
        .unwrap();
        generate_ratio_figure(&path, &comparison, &FigureOptions::default()).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("No data"));
    }
}
