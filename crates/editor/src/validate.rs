//! Advisory level validation.
//!
//! Warnings are rendered as editor overlays; they never block editing or
//! saving. The checks mirror what actually breaks levels in play: things
//! outside the board, snakes tangled into themselves, same-color stacking
//! that makes lower entities unreachable, and doubled-up collectables.

use std::collections::HashMap;

use snakeshift_core::{Entity, EntityId, GameSession};

/// One advisory finding, anchored to an entity or a tile.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValidationWarning {
    /// Entity (or one snake segment) lies outside the level bounds.
    OutOfBounds {
        entity: EntityId,
        segment_index: Option<usize>,
    },
    /// A snake occupies the same tile with two of its own segments.
    OverlappingSegments {
        snake: EntityId,
        segment_index: usize,
        other_index: usize,
    },
    /// A snake segment rests on a same-color solid entity lower in the draw
    /// order, so the segment could never legally have arrived there.
    SameLayerCollision { entity: EntityId, x: i32, y: i32 },
    /// More than one collectable shares a tile; pushing a crate over them
    /// only carries one along.
    DuplicateCollectables { x: i32, y: i32 },
}

/// Scans the whole board and returns every warning found.
pub fn validate_level(session: &GameSession) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();
    check_bounds(session, &mut warnings);
    check_snakes(session, &mut warnings);
    check_duplicate_collectables(session, &mut warnings);
    warnings
}

fn check_bounds(session: &GameSession, warnings: &mut Vec<ValidationWarning>) {
    for entity in session.entities() {
        match entity {
            Entity::Snake(snake) => {
                for (index, segment) in snake.segments.iter().enumerate() {
                    if !session.level_info.contains(&segment.tile()) {
                        warnings.push(ValidationWarning::OutOfBounds {
                            entity: snake.id,
                            segment_index: Some(index),
                        });
                    }
                }
            }
            other => {
                let rect = other.as_rect().expect("non-snake entities are rectangular");
                if !session.level_info.contains(&rect.tile()) {
                    warnings.push(ValidationWarning::OutOfBounds {
                        entity: other.id(),
                        segment_index: None,
                    });
                }
            }
        }
    }
}

fn check_snakes(session: &GameSession, warnings: &mut Vec<ValidationWarning>) {
    for (entity_index, entity) in session.entities().iter().enumerate() {
        let Entity::Snake(snake) = entity else {
            continue;
        };
        // Self-overlap.
        for (i, segment) in snake.segments.iter().enumerate() {
            for (j, other) in snake.segments.iter().enumerate().skip(i + 1) {
                if segment.x == other.x && segment.y == other.y {
                    warnings.push(ValidationWarning::OverlappingSegments {
                        snake: snake.id,
                        segment_index: i,
                        other_index: j,
                    });
                }
            }
        }
        // Same-color support underneath a segment.
        for segment in &snake.segments {
            let conflicting = session
                .hit_test(segment.x, segment.y)
                .iter()
                .any(|hit| {
                    hit.solid
                        && hit.entity != snake.id
                        && session
                            .index_of(hit.entity)
                            .is_some_and(|index| index < entity_index)
                        && hit.layer.collides_with(segment.layer)
                });
            if conflicting {
                warnings.push(ValidationWarning::SameLayerCollision {
                    entity: snake.id,
                    x: segment.x,
                    y: segment.y,
                });
            }
        }
    }
}

fn check_duplicate_collectables(session: &GameSession, warnings: &mut Vec<ValidationWarning>) {
    let mut per_tile: HashMap<(i32, i32), usize> = HashMap::new();
    for entity in session.entities() {
        if entity.is_collectable() {
            let rect = entity.as_rect().expect("collectables are rectangular");
            *per_tile.entry((rect.x, rect.y)).or_default() += 1;
        }
    }
    let mut tiles: Vec<(i32, i32)> = per_tile
        .into_iter()
        .filter(|&(_, count)| count > 1)
        .map(|(tile, _)| tile)
        .collect();
    tiles.sort_unstable();
    for (x, y) in tiles {
        warnings.push(ValidationWarning::DuplicateCollectables { x, y });
    }
}
