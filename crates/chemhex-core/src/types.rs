//! Core data types for chemhex density maps.
//!
//! Samples, entity records and plot bounds are validated when they are
//! built, so every value that reaches the binning core is finite.

use crate::errors::{ChemhexError, Result};
use serde::{Deserialize, Serialize};
use std::ops::AddAssign;

/// Which weight channel a quantity is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// Raw occurrence counts
    Raw,
    /// Background-normalized (TF-IDF style) counts
    Weighted,
}

impl Channel {
    pub const ALL: [Channel; 2] = [Channel::Raw, Channel::Weighted];

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Raw => "raw",
            Channel::Weighted => "weighted",
        }
    }
}

/// The two weight channels carried side by side through the pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelWeights {
    pub raw: f64,
    pub weighted: f64,
}

impl ChannelWeights {
    pub const ZERO: ChannelWeights = ChannelWeights {
        raw: 0.0,
        weighted: 0.0,
    };

    pub fn new(raw: f64, weighted: f64) -> Self {
        Self { raw, weighted }
    }

    /// Same value in both channels.
    pub fn uniform(weight: f64) -> Self {
        Self::new(weight, weight)
    }

    pub fn get(&self, channel: Channel) -> f64 {
        match channel {
            Channel::Raw => self.raw,
            Channel::Weighted => self.weighted,
        }
    }

    /// Both channels multiplied by `factor`.
    pub fn scaled(&self, factor: f64) -> Self {
        Self::new(self.raw * factor, self.weighted * factor)
    }

    pub fn is_valid(&self) -> bool {
        self.raw.is_finite() && self.weighted.is_finite() && self.raw >= 0.0 && self.weighted >= 0.0
    }
}

impl AddAssign for ChannelWeights {
    fn add_assign(&mut self, rhs: Self) {
        self.raw += rhs.raw;
        self.weighted += rhs.weighted;
    }
}

/// A weighted point in the (logP, mass) plane.
///
/// Immutable once built; construction rejects non-finite coordinates and
/// negative or non-finite weights.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    x: f64,
    y: f64,
    entity_id: String,
    weight: ChannelWeights,
}

impl Sample {
    pub fn new(entity_id: impl Into<String>, x: f64, y: f64, weight: ChannelWeights) -> Result<Self> {
        let entity_id = entity_id.into();
        if !x.is_finite() {
            return Err(ChemhexError::missing_property(entity_id, "logP"));
        }
        if !y.is_finite() {
            return Err(ChemhexError::missing_property(entity_id, "mass"));
        }
        if !weight.is_valid() {
            return Err(ChemhexError::validation(format!(
                "entity '{}' has invalid weights (raw={}, weighted={})",
                entity_id, weight.raw, weight.weighted
            )));
        }
        Ok(Self {
            x,
            y,
            entity_id,
            weight,
        })
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    pub fn weight(&self) -> ChannelWeights {
        self.weight
    }
}

/// One chemical as it arrives from a query result table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub entity_id: String,
    pub raw_count: u64,
    pub weighted_count: f64,
    pub logp: Option<f64>,
    pub mass: Option<f64>,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub class_labels: Vec<String>,
}

impl EntityRecord {
    pub fn new(entity_id: impl Into<String>, raw_count: u64, weighted_count: f64) -> Self {
        Self {
            entity_id: entity_id.into(),
            raw_count,
            weighted_count,
            logp: None,
            mass: None,
            display_name: String::new(),
            class_labels: Vec::new(),
        }
    }

    pub fn with_properties(mut self, logp: f64, mass: f64) -> Self {
        self.logp = Some(logp);
        self.mass = Some(mass);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    pub fn with_classes(mut self, classes: Vec<String>) -> Self {
        self.class_labels = classes;
        self
    }

    /// (logP, mass) when both properties are present and finite.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.logp, self.mass) {
            (Some(x), Some(y)) if x.is_finite() && y.is_finite() => Some((x, y)),
            _ => None,
        }
    }

    /// Builds the sample for this record with an explicit weighted channel value.
    pub fn to_sample(&self, weighted: f64) -> Result<Sample> {
        let x = self
            .logp
            .ok_or_else(|| ChemhexError::missing_property(&self.entity_id, "logP"))?;
        let y = self
            .mass
            .ok_or_else(|| ChemhexError::missing_property(&self.entity_id, "mass"))?;
        Sample::new(
            self.entity_id.clone(),
            x,
            y,
            ChannelWeights::new(self.raw_count as f64, weighted),
        )
    }
}

/// One slot of a hexagon's top-K contributor list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contributor {
    pub entity_id: String,
    pub weight: f64,
    pub display_name: String,
}

impl Contributor {
    /// Padding slot: empty id and name, zero weight.
    pub fn empty() -> Self {
        Self {
            entity_id: String::new(),
            weight: 0.0,
            display_name: String::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entity_id.is_empty()
    }
}

/// Hexagon orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[serde(alias = "pointy")]
    PointyTop,
    #[default]
    #[serde(alias = "flat")]
    FlatTop,
}

impl Orientation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Orientation::PointyTop => "pointytop",
            Orientation::FlatTop => "flattop",
        }
    }
}

impl std::fmt::Display for Orientation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Orientation {
    type Err = ChemhexError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "pointytop" | "pointy" => Ok(Orientation::PointyTop),
            "flattop" | "flat" => Ok(Orientation::FlatTop),
            other => Err(ChemhexError::config(format!(
                "unknown orientation '{}' (expected pointytop or flattop)",
                other
            ))),
        }
    }
}

/// Axis-aligned plot range in data coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlotBounds {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl PlotBounds {
    pub fn new(x_min: f64, x_max: f64, y_min: f64, y_max: f64) -> Self {
        Self {
            x_min,
            x_max,
            y_min,
            y_max,
        }
    }

    /// Smallest bounds enclosing all points. `None` for empty input.
    pub fn enclosing(xs: &[f64], ys: &[f64]) -> Option<Self> {
        if xs.is_empty() || ys.is_empty() {
            return None;
        }
        let fold = |values: &[f64]| {
            values
                .iter()
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                    (lo.min(v), hi.max(v))
                })
        };
        let (x_min, x_max) = fold(xs);
        let (y_min, y_max) = fold(ys);
        Some(Self::new(x_min, x_max, y_min, y_max))
    }

    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }

    /// Rejects non-finite or zero-width ranges.
    pub fn validate(&self) -> Result<()> {
        let values = [self.x_min, self.x_max, self.y_min, self.y_max];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(ChemhexError::invalid_geometry(format!(
                "non-finite plot bounds {:?}",
                values
            )));
        }
        if self.width() <= 0.0 {
            return Err(ChemhexError::invalid_geometry(format!(
                "x range [{}, {}] has zero width",
                self.x_min, self.x_max
            )));
        }
        if self.height() <= 0.0 {
            return Err(ChemhexError::invalid_geometry(format!(
                "y range [{}, {}] has zero width",
                self.y_min, self.y_max
            )));
        }
        Ok(())
    }

    /// Vertical over horizontal extent; the aspect scale of a fitted geometry.
    pub fn ratio(&self) -> Result<f64> {
        self.validate()?;
        Ok(self.height() / self.width())
    }
}

impl std::str::FromStr for PlotBounds {
    type Err = ChemhexError;

    /// Parses `x_min,x_max,y_min,y_max`.
    fn from_str(s: &str) -> Result<Self> {
        let parts = s
            .split(',')
            .map(|p| p.trim().parse::<f64>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| ChemhexError::config(format!("invalid bounds '{}': {}", s, e)))?;
        if parts.len() != 4 {
            return Err(ChemhexError::config(format!(
                "bounds need 4 values (x_min,x_max,y_min,y_max), got {}",
                parts.len()
            )));
        }
        let bounds = Self::new(parts[0], parts[1], parts[2], parts[3]);
        bounds.validate()?;
        Ok(bounds)
    }
}
