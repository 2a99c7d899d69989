//! Cartesian ↔ axial hexagon coordinates.
//!
//! The forward transform uses cube rounding with round-half-to-even so that
//! identical input always lands in the same bucket. The y axis is flipped
//! (rows grow downwards), which keeps bucket assignment compatible with
//! existing hexbin plots built on the same convention.

use chemhex_core::{AspectMode, ChemhexError, GeometryConfig, Orientation, PlotBounds, Result};
use serde::{Deserialize, Serialize};

const SQRT_3: f64 = 1.732_050_807_568_877_2;

/// Integer axial address of one hexagon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AxialCoord {
    pub q: i32,
    pub r: i32,
}

impl AxialCoord {
    pub fn new(q: i32, r: i32) -> Self {
        Self { q, r }
    }

    /// Packs (q, r) into a single map key.
    pub fn pack(&self) -> u64 {
        ((self.q as u32 as u64) << 32) | (self.r as u32 as u64)
    }

    pub fn unpack(key: u64) -> Self {
        Self {
            q: (key >> 32) as u32 as i32,
            r: key as u32 as i32,
        }
    }

    /// Neighbour at the given axial offset.
    pub fn offset(&self, dq: i32, dr: i32) -> Self {
        Self::new(self.q.saturating_add(dq), self.r.saturating_add(dr))
    }
}

/// Size, aspect scale and orientation of a hexagon grid.
///
/// Deserialization goes through [`HexGeometry::new`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "GeometryFields")]
pub struct HexGeometry {
    size: f64,
    aspect_scale: f64,
    orientation: Orientation,
}

#[derive(Deserialize)]
struct GeometryFields {
    size: f64,
    aspect_scale: f64,
    orientation: Orientation,
}

impl TryFrom<GeometryFields> for HexGeometry {
    type Error = ChemhexError;

    fn try_from(fields: GeometryFields) -> Result<Self> {
        Self::new(fields.size, fields.orientation, fields.aspect_scale)
    }
}

impl HexGeometry {
    pub fn new(size: f64, orientation: Orientation, aspect_scale: f64) -> Result<Self> {
        if !size.is_finite() || size <= 0.0 {
            return Err(ChemhexError::invalid_geometry(format!(
                "hexagon size must be positive, got {}",
                size
            )));
        }
        if !aspect_scale.is_finite() || aspect_scale <= 0.0 {
            return Err(ChemhexError::invalid_geometry(format!(
                "aspect scale must be positive, got {}",
                aspect_scale
            )));
        }
        Ok(Self {
            size,
            aspect_scale,
            orientation,
        })
    }

    /// Size 1, aspect 1. The lattice the blur kernel is measured on.
    pub fn unit(orientation: Orientation) -> Self {
        Self {
            size: 1.0,
            aspect_scale: 1.0,
            orientation,
        }
    }

    /// Geometry stretched to a plot range: the aspect scale is the
    /// height/width ratio, and flat-top hexagons shrink their size by the
    /// same ratio so cells keep a comparable count per plot.
    pub fn fitted(base_size: f64, orientation: Orientation, bounds: &PlotBounds) -> Result<Self> {
        let ratio = bounds.ratio()?;
        let size = match orientation {
            Orientation::FlatTop => base_size / ratio,
            Orientation::PointyTop => base_size,
        };
        Self::new(size, orientation, ratio)
    }

    /// Geometry for one query's points under the configured aspect mode.
    ///
    /// Fitting to data with no points falls back to aspect 1; fitting to
    /// data whose x or y values are all identical is an error.
    pub fn from_config(config: &GeometryConfig, xs: &[f64], ys: &[f64]) -> Result<Self> {
        match config.aspect {
            AspectMode::Fixed { aspect_scale } => {
                Self::new(config.hex_size, config.orientation, aspect_scale)
            }
            AspectMode::Bounds { bounds } => {
                Self::fitted(config.hex_size, config.orientation, &bounds)
            }
            AspectMode::FitData => match PlotBounds::enclosing(xs, ys) {
                Some(bounds) => Self::fitted(config.hex_size, config.orientation, &bounds),
                None => Self::new(config.hex_size, config.orientation, 1.0),
            },
        }
    }

    pub fn size(&self) -> f64 {
        self.size
    }

    pub fn aspect_scale(&self) -> f64 {
        self.aspect_scale
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Fractional axial coordinates before rounding.
    fn fractional(&self, x: f64, y: f64) -> (f64, f64) {
        match self.orientation {
            Orientation::PointyTop => {
                let xs = x / self.size * self.aspect_scale;
                let ys = -y / self.size;
                (SQRT_3 / 3.0 * xs - ys / 3.0, 2.0 / 3.0 * ys)
            }
            Orientation::FlatTop => {
                let xs = x / self.size;
                let ys = -y / self.size / self.aspect_scale;
                (2.0 / 3.0 * xs, -xs / 3.0 + SQRT_3 / 3.0 * ys)
            }
        }
    }

    /// Maps a point to its hexagon.
    pub fn to_axial(&self, x: f64, y: f64) -> AxialCoord {
        let (q, r) = self.fractional(x, y);
        round_hex(q, r)
    }

    /// Maps paired coordinate arrays. Empty input yields empty output.
    pub fn map_points(&self, xs: &[f64], ys: &[f64]) -> Result<Vec<AxialCoord>> {
        if xs.len() != ys.len() {
            return Err(ChemhexError::validation(format!(
                "x and y arrays differ in length ({} vs {})",
                xs.len(),
                ys.len()
            )));
        }
        Ok(xs
            .iter()
            .zip(ys)
            .map(|(&x, &y)| self.to_axial(x, y))
            .collect())
    }

    /// Cartesian centre of a hexagon.
    pub fn center(&self, coord: AxialCoord) -> (f64, f64) {
        let q = coord.q as f64;
        let r = coord.r as f64;
        match self.orientation {
            Orientation::PointyTop => (
                self.size * SQRT_3 * (q + r / 2.0) / self.aspect_scale,
                -self.size * 1.5 * r,
            ),
            Orientation::FlatTop => (
                self.size * 1.5 * q,
                -self.size * SQRT_3 * (r + q / 2.0) * self.aspect_scale,
            ),
        }
    }

    /// The six corner points of a hexagon in data coordinates.
    pub fn corners(&self, coord: AxialCoord) -> [(f64, f64); 6] {
        let (cx, cy) = self.center(coord);
        let mut corners = [(0.0, 0.0); 6];
        for (i, corner) in corners.iter_mut().enumerate() {
            let angle = match self.orientation {
                Orientation::FlatTop => (60.0 * i as f64).to_radians(),
                Orientation::PointyTop => (60.0 * i as f64 + 30.0).to_radians(),
            };
            *corner = match self.orientation {
                Orientation::FlatTop => (
                    cx + self.size * angle.cos(),
                    cy + self.size * angle.sin() * self.aspect_scale,
                ),
                Orientation::PointyTop => (
                    cx + self.size * angle.cos() / self.aspect_scale,
                    cy + self.size * angle.sin(),
                ),
            };
        }
        corners
    }

    /// Centre-to-centre offset (dx, dy) for an axial displacement.
    pub fn displacement(&self, dq: i32, dr: i32) -> (f64, f64) {
        let (x0, y0) = self.center(AxialCoord::new(0, 0));
        let (x1, y1) = self.center(AxialCoord::new(dq, dr));
        (x1 - x0, y1 - y0)
    }
}

/// Cube rounding of fractional axial coordinates.
fn round_hex(q: f64, r: f64) -> AxialCoord {
    let x = q;
    let z = r;
    let y = -x - z;

    let rx = x.round_ties_even();
    let ry = y.round_ties_even();
    let rz = z.round_ties_even();

    let dx = (rx - x).abs();
    let dy = (ry - y).abs();
    let dz = (rz - z).abs();

    let x_worst = dx > dy && dx > dz;
    let q = if x_worst { -(ry + rz) } else { rx };
    let r = if !x_worst && !(dy > dz) {
        -(rx + ry)
    } else {
        rz
    };
    AxialCoord::new(q as i32, r as i32)
}

/// Fits a geometry to paired coordinate arrays.
pub fn fit_geometry(
    xs: &[f64],
    ys: &[f64],
    base_size: f64,
    orientation: Orientation,
) -> Result<HexGeometry> {
    let bounds = PlotBounds::enclosing(xs, ys)
        .ok_or_else(|| ChemhexError::invalid_geometry("cannot fit a geometry to zero points"))?;
    HexGeometry::fitted(base_size, orientation, &bounds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_unpack() {
        for coord in [
            AxialCoord::new(0, 0),
            AxialCoord::new(-5, 3),
            AxialCoord::new(i32::MIN, i32::MAX),
            AxialCoord::new(17, -1),
        ] {
            assert_eq!(AxialCoord::unpack(coord.pack()), coord);
        }
        assert_ne!(AxialCoord::new(1, 0).pack(), AxialCoord::new(0, 1).pack());
    }

    #[test]
    fn test_origin_maps_to_origin() {
        for orientation in [Orientation::FlatTop, Orientation::PointyTop] {
            let geometry = HexGeometry::new(1.0, orientation, 1.0).unwrap();
            assert_eq!(geometry.to_axial(0.0, 0.0), AxialCoord::new(0, 0));
        }
    }

    #[test]
    fn test_flat_top_known_cells() {
        let geometry = HexGeometry::new(1.0, Orientation::FlatTop, 1.0).unwrap();
        // one column to the right, shifted half a row up in y-down axial terms
        assert_eq!(geometry.to_axial(1.5, -SQRT_3 / 2.0), AxialCoord::new(1, 0));
        assert_eq!(geometry.to_axial(0.0, -SQRT_3), AxialCoord::new(0, 1));
        assert_eq!(geometry.to_axial(0.0, SQRT_3), AxialCoord::new(0, -1));
    }

    #[test]
    fn test_pointy_top_known_cells() {
        let geometry = HexGeometry::new(1.0, Orientation::PointyTop, 1.0).unwrap();
        assert_eq!(geometry.to_axial(SQRT_3, 0.0), AxialCoord::new(1, 0));
        assert_eq!(geometry.to_axial(SQRT_3 / 2.0, -1.5), AxialCoord::new(0, 1));
    }

    #[test]
    fn test_center_maps_back_to_cell() {
        for orientation in [Orientation::FlatTop, Orientation::PointyTop] {
            let geometry = HexGeometry::new(0.7, orientation, 35.0).unwrap();
            for q in -6..=6 {
                for r in -6..=6 {
                    let coord = AxialCoord::new(q, r);
                    let (x, y) = geometry.center(coord);
                    assert_eq!(geometry.to_axial(x, y), coord, "{:?} {:?}", orientation, coord);
                }
            }
        }
    }

    #[test]
    fn test_mapping_is_idempotent() {
        let geometry = HexGeometry::new(0.25, Orientation::FlatTop, 60.0).unwrap();
        let xs = [-2.3, 0.0, 1.7, 4.4, 4.4];
        let ys = [120.0, 18.0, 300.5, 250.0, 250.0];
        let first = geometry.map_points(&xs, &ys).unwrap();
        let second = geometry.map_points(&xs, &ys).unwrap();
        assert_eq!(first, second);
        assert_eq!(first[3], first[4]);
        for coord in &first {
            let (cx, cy) = geometry.center(*coord);
            assert_eq!(geometry.to_axial(cx, cy), *coord);
        }
    }

    #[test]
    fn test_empty_and_mismatched_input() {
        let geometry = HexGeometry::unit(Orientation::FlatTop);
        assert!(geometry.map_points(&[], &[]).unwrap().is_empty());
        assert!(geometry.map_points(&[1.0], &[]).is_err());
    }

    #[test]
    fn test_rejects_degenerate_geometry() {
        assert!(HexGeometry::new(0.0, Orientation::FlatTop, 1.0).is_err());
        assert!(HexGeometry::new(1.0, Orientation::FlatTop, f64::NAN).is_err());
        assert!(HexGeometry::new(1.0, Orientation::PointyTop, 0.0).is_err());
    }

    #[test]
    fn test_deserialize_validates() {
        let geometry = HexGeometry::new(10.0, Orientation::PointyTop, 2.5).unwrap();
        let json = serde_json::to_string(&geometry).unwrap();
        let back: HexGeometry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, geometry);

        let zero = r#"{"size":0.0,"aspect_scale":1.0,"orientation":"flattop"}"#;
        let err = serde_json::from_str::<HexGeometry>(zero).unwrap_err();
        assert!(err.to_string().contains("hexagon size must be positive"));

        let negative = r#"{"size":10.0,"aspect_scale":-2.0,"orientation":"flattop"}"#;
        assert!(serde_json::from_str::<HexGeometry>(negative).is_err());
    }

    #[test]
    fn test_identical_x_is_invalid_geometry() {
        let xs = [2.0, 2.0, 2.0];
        let ys = [100.0, 200.0, 300.0];
        let err = fit_geometry(&xs, &ys, 10.0, Orientation::FlatTop).unwrap_err();
        assert!(matches!(err, ChemhexError::InvalidGeometry(_)));
    }

    #[test]
    fn test_fitted_geometry() {
        let bounds = PlotBounds::new(-5.0, 15.0, 0.0, 1000.0);
        let flat = HexGeometry::fitted(10.0, Orientation::FlatTop, &bounds).unwrap();
        assert_eq!(flat.aspect_scale(), 50.0);
        assert!((flat.size() - 0.2).abs() < 1e-12);

        let pointy = HexGeometry::fitted(10.0, Orientation::PointyTop, &bounds).unwrap();
        assert_eq!(pointy.size(), 10.0);
        assert_eq!(pointy.aspect_scale(), 50.0);
    }

    #[test]
    fn test_from_config_fit_data_empty() {
        let config = GeometryConfig {
            aspect: AspectMode::FitData,
            ..GeometryConfig::default()
        };
        let geometry = HexGeometry::from_config(&config, &[], &[]).unwrap();
        assert_eq!(geometry.aspect_scale(), 1.0);
        assert_eq!(geometry.size(), 10.0);
    }

    #[test]
    fn test_default_config_uses_shared_bounds() {
        let geometry = HexGeometry::from_config(&GeometryConfig::default(), &[], &[]).unwrap();
        let ratio = 1600.0 / 15.0;
        assert!((geometry.aspect_scale() - ratio).abs() < 1e-9);
        assert!((geometry.size() - 10.0 / ratio).abs() < 1e-12);
    }

    #[test]
    fn test_corners_surround_center() {
        let geometry = HexGeometry::new(2.0, Orientation::FlatTop, 3.0).unwrap();
        let coord = AxialCoord::new(2, -1);
        let (cx, cy) = geometry.center(coord);
        let corners = geometry.corners(coord);
        assert!((corners[0].0 - (cx + 2.0)).abs() < 1e-12);
        assert!((corners[0].1 - cy).abs() < 1e-12);
        let mean_x: f64 = corners.iter().map(|c| c.0).sum::<f64>() / 6.0;
        let mean_y: f64 = corners.iter().map(|c| c.1).sum::<f64>() / 6.0;
        assert!((mean_x - cx).abs() < 1e-9);
        assert!((mean_y - cy).abs() < 1e-9);
    }

    #[test]
    fn test_unit_displacement() {
        let geometry = HexGeometry::unit(Orientation::FlatTop);
        let (dx, dy) = geometry.displacement(-4, 2);
        assert!((dx + 6.0).abs() < 1e-12);
        assert!(dy.abs() < 1e-12);
    }
}
