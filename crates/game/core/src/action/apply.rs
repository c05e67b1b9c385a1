//! Applies a resolved move to the session.

use crate::history;
use crate::state::{Entity, EntityId, GameSession, Point, Snake};

use super::invert::invert_snake;
use super::{GameEvent, Move, MoveError, MoveOutcome};

/// Applies a previously analyzed move.
///
/// Records the undo snapshot first, then performs the whole mutation
/// (growth, segment shift, draw-order resort, pushes, eating, inversion)
/// before returning. The caller is expected to pass a `valid` move; the
/// verdict is not re-checked here.
pub fn take_move(session: &mut GameSession, mv: &Move) -> Result<MoveOutcome, MoveError> {
    debug_assert!(mv.valid, "take_move expects an analyzed, valid move");
    history::undoable(session);
    let mut events = vec![GameEvent::Move];

    {
        let snake = session
            .entity_mut(mv.snake)
            .and_then(Entity::as_snake_mut)
            .ok_or(MoveError::SnakeNotFound(mv.snake))?;
        if snake.grow_on_next_move {
            grow_snake(snake);
            snake.grow_on_next_move = false;
        }
        // Classic snake shift: every segment takes its predecessor's place.
        for i in (1..snake.segments.len()).rev() {
            let prev = snake.segments[i - 1];
            let segment = &mut snake.segments[i];
            segment.x = prev.x;
            segment.y = prev.y;
        }
        let head = &mut snake.segments[0];
        head.x = mv.to.x;
        head.y = mv.to.y;
        head.width = mv.to.width;
        head.height = mv.to.height;
    }

    // Re-sort so the mover sits immediately above the highest solid entity
    // it lands on. Keeps "topmost wins" truthful and stops the snake from
    // doubling back while inside an inverse snake. Collectables are left
    // where they are, since uneaten ones must stay visible on top.
    let onto_max = mv
        .entities_there
        .iter()
        .filter(|&&id| session.entity(id).is_some_and(Entity::solid))
        .filter_map(|&id| session.index_of(id))
        .max();
    if let Some(max_index) = onto_max {
        let this_index = session.require_index(mv.snake);
        if this_index < max_index {
            let snake_entity = session.entities.remove(this_index);
            session.entities.insert(max_index, snake_entity);
        }
    }

    // Pushes: translate one tile and raise to the top of the draw order.
    if !mv.entities_to_push.is_empty() {
        events.push(GameEvent::PushCrate);
    }
    for &id in &mv.entities_to_push {
        let index = session.require_index(id);
        let mut entity = session.entities.remove(index);
        entity.translate(mv.delta.x, mv.delta.y);
        session.entities.push(entity);
    }
    // Collectables back above crates, so one boxed in a crate stays
    // scoopable while being pushed around.
    if !mv.entities_to_push.is_empty() {
        session.sort_entities();
    }

    // Eat collectables at the destination (pushed ones are spared).
    for &id in &mv.entities_there {
        if mv.entities_to_push.contains(&id) {
            continue;
        }
        let Some(entity) = session.entity(id) else {
            continue;
        };
        if !entity.is_collectable() {
            continue;
        }
        let collectable_layer = entity
            .as_rect()
            .expect("collectables are rectangular")
            .layer;
        // Read the mover's layer per iteration: an inverter eaten earlier in
        // this loop changes it.
        let mover_layer = session
            .entity(mv.snake)
            .and_then(Entity::as_snake)
            .ok_or(MoveError::SnakeNotFound(mv.snake))?
            .layer();
        if !collectable_layer.collides_with(mover_layer) {
            continue;
        }
        let eaten = session
            .remove_entity(id)
            .expect("collectable was present a moment ago");
        match eaten {
            Entity::Food(_) => {
                let snake = session
                    .entity_mut(mv.snake)
                    .and_then(Entity::as_snake_mut)
                    .ok_or(MoveError::SnakeNotFound(mv.snake))?;
                snake.grow_on_next_move = true;
                if !session.check_level_won() {
                    events.push(GameEvent::EatFood);
                }
            }
            Entity::Inverter(_) => {
                events.push(GameEvent::Invert);
                invert_snake(session, mv.snake);
            }
            Entity::Wall(_) | Entity::Crate(_) | Entity::Snake(_) => {
                unreachable!("only collectables are eaten")
            }
        }
    }

    let won = session.check_level_won();
    session.won_level = won;
    if won {
        events.push(GameEvent::LevelWon);
    }
    Ok(MoveOutcome { events, won })
}

/// Duplicates the tail segment; the copy unstacks on the following move.
fn grow_snake(snake: &mut Snake) {
    let tail = *snake.tail();
    snake.segments.push(tail);
}

/// Drags one segment of a snake to `to`, pulling the rest of the body along
/// a no-diagonals path one cell at a time. Segments between the dragged one
/// and each end follow their leader, which keeps the body axis-adjacent.
///
/// Shared by the editor's move tool and the generator's reverse stepping.
pub fn drag_snake(
    session: &mut GameSession,
    snake_id: EntityId,
    segment_index: usize,
    to: Point,
) -> Result<(), MoveError> {
    let snake = session
        .entity_mut(snake_id)
        .and_then(Entity::as_snake_mut)
        .ok_or(MoveError::SnakeNotFound(snake_id))?;
    let dragged = snake.segments[segment_index];
    if dragged.x == to.x && dragged.y == to.y {
        return Ok(());
    }
    let from = Point::new(dragged.x, dragged.y);
    // Skip the first point; it is the segment's current position.
    for point in crate::state::grid::line_no_diagonals(from, to).into_iter().skip(1) {
        for i in ((segment_index + 1)..snake.segments.len()).rev() {
            let leader = snake.segments[i - 1];
            lead(&leader, &mut snake.segments[i]);
        }
        for i in 0..segment_index {
            let leader = snake.segments[i + 1];
            lead(&leader, &mut snake.segments[i]);
        }
        let segment = &mut snake.segments[segment_index];
        segment.x = point.x;
        segment.y = point.y;
    }
    Ok(())
}

fn lead(leader: &crate::state::SnakeSegment, follower: &mut crate::state::SnakeSegment) {
    follower.x = leader.x;
    follower.y = leader.y;
    follower.width = leader.width;
    follower.height = leader.height;
}
