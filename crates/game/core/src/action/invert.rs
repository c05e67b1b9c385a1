//! Board inversion: the global color flip triggered by eating an inverter.

use std::collections::HashSet;

use crate::state::{CollisionLayer, Entity, EntityId, GameSession, RectEntity};

/// Flood-fill closure seeded by the eating snake.
///
/// Every entity transitively reachable through shared board positions has
/// its layer flipped exactly once, keeping collision relationships
/// consistent after the swap. Positions are expanded by hit-testing them and
/// handling every entity found there; snakes expand all of their segments.
///
/// Afterwards, every visited position not covered by an explicit wall gains
/// a new white block at the bottom of the draw order: those squares were
/// implicitly black background before the flip, and must now be physically
/// white.
pub(crate) fn invert_snake(session: &mut GameSession, snake_id: EntityId) {
    let mut handled_entities: HashSet<EntityId> = HashSet::new();
    let mut handled_positions: HashSet<(i32, i32)> = HashSet::new();
    // Visit order is recorded separately so block insertion is deterministic.
    let mut position_order: Vec<(i32, i32)> = Vec::new();

    handle_entity(
        session,
        snake_id,
        &mut handled_entities,
        &mut handled_positions,
        &mut position_order,
    );

    for &(x, y) in &position_order {
        let covered_by_wall = session
            .hit_test(x, y)
            .iter()
            .any(|hit| matches!(session.entity(hit.entity), Some(Entity::Wall(_))));
        if !covered_by_wall {
            let id = session.allocate_entity_id();
            session
                .entities
                .insert(0, Entity::Wall(RectEntity::new(id, x, y, CollisionLayer::WHITE)));
        }
    }
}

fn handle_entity(
    session: &mut GameSession,
    id: EntityId,
    handled_entities: &mut HashSet<EntityId>,
    handled_positions: &mut HashSet<(i32, i32)>,
    position_order: &mut Vec<(i32, i32)>,
) {
    if !handled_entities.insert(id) {
        return;
    }
    let snake_cells: Option<Vec<(i32, i32)>> = match session.entity(id) {
        Some(Entity::Snake(snake)) => {
            Some(snake.segments.iter().map(|s| (s.x, s.y)).collect())
        }
        Some(_) => None,
        None => return,
    };
    if let Some(cells) = snake_cells {
        for (x, y) in cells {
            handle_position(
                session,
                x,
                y,
                handled_entities,
                handled_positions,
                position_order,
            );
        }
    }
    if let Some(entity) = session.entity_mut(id) {
        entity.invert_layers();
    }
}

fn handle_position(
    session: &mut GameSession,
    x: i32,
    y: i32,
    handled_entities: &mut HashSet<EntityId>,
    handled_positions: &mut HashSet<(i32, i32)>,
    position_order: &mut Vec<(i32, i32)>,
) {
    if !handled_positions.insert((x, y)) {
        return;
    }
    position_order.push((x, y));
    let found: Vec<EntityId> = session.hit_test(x, y).iter().map(|hit| hit.entity).collect();
    for entity in found {
        handle_entity(
            session,
            entity,
            handled_entities,
            handled_positions,
            position_order,
        );
    }
}
