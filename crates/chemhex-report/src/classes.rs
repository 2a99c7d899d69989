//! Ontology class overlay
//!
//! Marks the cells that hold at least one chemical belonging to a named
//! class. Class ids on the records are resolved to names through a lookup
//! table; ids the table does not know are skipped.

use crate::sources::QueryDataset;
use chemhex_core::EntityNames;
use chemhex_hexbin::AxialCoord;
use serde::Serialize;

/// Cells of one query that contain members of a class.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassOverlay {
    pub class_name: String,
    /// Number of member chemicals
    pub member_count: usize,
    /// Member cells in ascending (q, r) order
    pub cells: Vec<AxialCoord>,
}

impl ClassOverlay {
    pub fn build(dataset: &QueryDataset, class_name: &str, class_names: &dyn EntityNames) -> Self {
        let geometry = dataset.geometry();
        let mut member_count = 0;
        let mut cells = Vec::new();

        for record in dataset.records() {
            let is_member = record
                .class_labels
                .iter()
                .filter_map(|label| class_names.display_name(label))
                .any(|name| name == class_name);
            if !is_member {
                continue;
            }
            if let Some((x, y)) = record.coordinates() {
                member_count += 1;
                cells.push(geometry.to_axial(x, y));
            }
        }
        cells.sort_unstable();
        cells.dedup();

        log::debug!(
            "[{}] class '{}': {} chemicals in {} cells",
            dataset.name(),
            class_name,
            member_count,
            cells.len()
        );

        Self {
            class_name: class_name.to_string(),
            member_count,
            cells,
        }
    }

    pub fn contains(&self, coord: AxialCoord) -> bool {
        self.cells.binary_search(&coord).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inputs::QueryInput;
    use crate::sources::SourceBuilder;
    use chemhex_core::{AspectMode, EntityRecord, PipelineConfig};
    use std::collections::HashMap;

    #[test]
    fn test_overlay_members() {
        let mut config = PipelineConfig::default();
        config.geometry.hex_size = 1.0;
        config.geometry.aspect = AspectMode::Fixed { aspect_scale: 1.0 };
        let builder = SourceBuilder::new(config).unwrap();

        let records = vec![
            EntityRecord::new("caffeine", 3, 3.0)
                .with_properties(0.0, 0.0)
                .with_classes(vec!["CHEBI:26385".into()]),
            EntityRecord::new("theobromine", 1, 1.0)
                .with_properties(20.0, 0.0)
                .with_classes(vec!["CHEBI:9999".into(), "CHEBI:26385".into()]),
            EntityRecord::new("ethanol", 5, 5.0)
                .with_properties(-10.0, 0.0)
                .with_classes(vec!["CHEBI:30879".into()]),
            EntityRecord::new("orphan", 5, 5.0)
                .with_properties(-30.0, 0.0)
                .with_classes(vec!["CHEBI:unknown".into()]),
        ];
        let dataset = builder.build_query(&QueryInput::new("coffee", records)).unwrap();

        let mut names = HashMap::new();
        names.insert("CHEBI:26385".to_string(), "purines".to_string());
        names.insert("CHEBI:30879".to_string(), "alcohol".to_string());

        let overlay = ClassOverlay::build(&dataset, "purines", &names);
        assert_eq!(overlay.member_count, 2);
        assert_eq!(overlay.cells.len(), 2);
        assert!(overlay.contains(dataset.geometry().to_axial(0.0, 0.0)));
        assert!(!overlay.contains(dataset.geometry().to_axial(-10.0, 0.0)));

        let none = ClassOverlay::build(&dataset, "steroids", &names);
        assert_eq!(none.member_count, 0);
        assert!(none.cells.is_empty());
    }
}
