//! Hit-testing over the draw-order list.
//!
//! The entity list's order is both z-order and collision precedence: the
//! last (topmost) solid entity occupying a cell decides its effective
//! collision layer, shadowing everything underneath.

use super::GameSession;
use super::entity::EntityId;
use super::grid::CollisionLayer;

/// Result of a spatial query at one cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Hit {
    pub entity: EntityId,
    pub layer: CollisionLayer,
    /// Which segment was hit, for snakes.
    pub segment_index: Option<usize>,
    /// Captured at query time so layer math needs no session lookups.
    pub solid: bool,
}

/// Options for [`GameSession::hit_test_all_entities`].
#[derive(Clone, Copy, Debug, Default)]
pub struct HitTestOptions {
    /// Exclude exactly the tail segment of this snake from its own results,
    /// so the snake can move onto the tile its tail is about to vacate.
    pub ignore_tail_of_snake: Option<EntityId>,
}

impl GameSession {
    /// Returns every entity occupying the cell, in draw order (bottom to
    /// top). Non-solid collectables are included; they are skipped by
    /// [`top_layer`] but callers still need them for eating and pushing.
    pub fn hit_test_all_entities(&self, x: i32, y: i32, opts: HitTestOptions) -> Vec<Hit> {
        self.entities()
            .iter()
            .filter_map(|entity| {
                let ignore_tail = opts.ignore_tail_of_snake == Some(entity.id());
                entity
                    .hit_at(x, y, ignore_tail)
                    .map(|(layer, segment_index)| Hit {
                        entity: entity.id(),
                        layer,
                        segment_index,
                        solid: entity.solid(),
                    })
            })
            .collect()
    }

    /// Convenience query with default options.
    pub fn hit_test(&self, x: i32, y: i32) -> Vec<Hit> {
        self.hit_test_all_entities(x, y, HitTestOptions::default())
    }
}

/// Layer of the topmost solid hit, or `NONE` when nothing solid is there.
/// This is the layer a destination tile presents to a prospective mover.
pub fn top_layer(hits: &[Hit]) -> CollisionLayer {
    hits.iter()
        .rev()
        .find(|hit| hit.solid)
        .map(|hit| hit.layer)
        .unwrap_or(CollisionLayer::NONE)
}
