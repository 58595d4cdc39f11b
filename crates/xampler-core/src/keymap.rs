//! Key/velocity lookup table.
//!
//! Every region's key range × velocity range is expanded into discrete
//! cells. A cell holds the entries of every region covering it, in region
//! order; lookups use the first one.

use crate::types::{KeyVelocityEntry, NoteKey, Region};
use std::collections::HashMap;
use std::sync::Arc;

/// Lookup table from (note, velocity) cells to region entries.
///
/// Built once from the consolidated regions and read-only afterwards.
#[derive(Clone, Debug, Default)]
pub struct KeyVelocityMap {
    cells: HashMap<NoteKey, Vec<KeyVelocityEntry>>,
}

impl KeyVelocityMap {
    /// Expand every region into the table.
    ///
    /// Inverted ranges contribute nothing. The work is proportional to the
    /// product of each region's key and velocity spans.
    pub fn build(regions: &[Region]) -> Self {
        let mut cells: HashMap<NoteKey, Vec<KeyVelocityEntry>> = HashMap::new();

        for region in regions {
            let region = Arc::new(region.clone());
            let (lokey, hikey) = region.key_range;
            let (lovel, hivel) = region.vel_range;
            let mid_velocity = region.mid_velocity();

            for key in lokey..=hikey {
                for velocity in lovel..=hivel {
                    cells
                        .entry(NoteKey::new(key, velocity))
                        .or_default()
                        .push(KeyVelocityEntry {
                            region: Arc::clone(&region),
                            velocity_modulation: velocity_modulation(
                                velocity,
                                mid_velocity,
                                lovel == hivel,
                            ),
                        });
                }
            }
        }

        log::debug!(
            "Built key/velocity map: {} cells from {} regions",
            cells.len(),
            regions.len()
        );

        Self { cells }
    }

    /// All entries for a cell, in region order.
    pub fn entries(&self, key: NoteKey) -> &[KeyVelocityEntry] {
        self.cells.get(&key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The entry a trigger on this cell plays: the first one registered.
    pub fn first(&self, key: NoteKey) -> Option<&KeyVelocityEntry> {
        self.cells.get(&key).and_then(|entries| entries.first())
    }

    /// Number of populated cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

fn velocity_modulation(velocity: i32, mid_velocity: i32, single_layer: bool) -> f64 {
    if single_layer || mid_velocity == 0 {
        return 1.0;
    }
    velocity as f64 / mid_velocity as f64
}
