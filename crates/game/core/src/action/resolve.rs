//! Pure move analysis: decides whether a proposed move is legal and what it
//! would do, without mutating anything.

use crate::state::{Entity, EntityId, GameSession, HitTestOptions, Point, Tile, top_layer};

use super::{Move, MoveError};

/// Analyzes moving `snake` by one step of `(dir_x, dir_y)`.
///
/// The verdict combines, in order: the four-directional input rule, level
/// bounds, the length-2 backwards rejection, encumbrance, the crate-push
/// sub-protocol, and finally the color rule: a snake cannot enter a tile
/// whose topmost solid layer collides with its own.
pub fn analyze_move_relative(
    session: &GameSession,
    snake_id: EntityId,
    dir_x: i32,
    dir_y: i32,
) -> Result<Move, MoveError> {
    let snake = session
        .entity(snake_id)
        .and_then(Entity::as_snake)
        .ok_or(MoveError::SnakeNotFound(snake_id))?;
    let head = *snake.head();
    let delta = Point::new(dir_x * head.width, dir_y * head.height);
    let x = head.x + delta.x;
    let y = head.y + delta.y;

    // The tail vacates its tile during the move, so it normally doesn't
    // block, unless the snake is about to grow, in which case it stays put.
    let ignore_tail = if snake.grow_on_next_move {
        None
    } else {
        Some(snake_id)
    };
    let mut hits_ahead = session.hit_test_all_entities(
        x,
        y,
        HitTestOptions {
            ignore_tail_of_snake: ignore_tail,
        },
    );

    // Encumbered: some other solid entity sits above this snake in draw
    // order while occupying one of its segments.
    let snake_index = session.require_index(snake_id);
    let mut encumbered = false;
    'segments: for segment in &snake.segments {
        for hit in session.hit_test(segment.x, segment.y) {
            if hit.solid
                && hit.entity != snake_id
                && session.require_index(hit.entity) > snake_index
            {
                encumbered = true;
                break 'segments;
            }
        }
    }

    // Prevent moving backwards when two segments long. At one segment any
    // direction is plausible, and at three or more a body segment blocks the
    // way; at exactly two the tail exclusion above would otherwise allow a
    // 180° flip.
    let moving_backwards = snake.segments.len() > 1 && {
        let second = &snake.segments[1];
        dir_x == (second.x - head.x).signum() && dir_y == (second.y - head.y).signum()
    };

    // Crate push sub-protocol: only the topmost solid entity at the
    // destination can be pushed, and only if the tile beyond it accepts it.
    let mut entities_to_push: Vec<EntityId> = Vec::new();
    if let Some(top_solid) = hits_ahead.iter().rev().find(|h| h.solid)
        && let Some(Entity::Crate(pushed)) = session.entity(top_solid.entity)
    {
        let crate_destination = pushed.tile().translated(delta.x, delta.y);
        let hits_ahead_crate = session.hit_test_all_entities(
            crate_destination.x,
            crate_destination.y,
            HitTestOptions {
                ignore_tail_of_snake: Some(snake_id),
            },
        );
        if session.level_info.contains(&crate_destination)
            && pushed.layer.collides_with(head.layer)
            && !top_layer(&hits_ahead_crate).collides_with(pushed.layer)
        {
            entities_to_push.push(pushed.id);
            let boxed_collectable = hits_ahead.iter().find(|h| {
                session
                    .entity(h.entity)
                    .is_some_and(Entity::is_collectable)
            });
            if let Some(boxed) = boxed_collectable {
                entities_to_push.push(boxed.entity);
            }
        }
    }
    // Pushed entities are no longer obstacles.
    hits_ahead.retain(|hit| !entities_to_push.contains(&hit.entity));

    let to = Tile::new(x, y, head.width, head.height);
    let valid = (dir_x == 0 || dir_y == 0)
        && (dir_x.abs() == 1 || dir_y.abs() == 1)
        && session.level_info.contains(&to)
        && !moving_backwards
        && !encumbered
        && !top_layer(&hits_ahead).collides_with(head.layer);

    Ok(Move {
        snake: snake_id,
        to,
        delta,
        valid,
        encumbered,
        entities_there: hits_ahead.iter().map(|hit| hit.entity).collect(),
        entities_to_push,
    })
}

/// Analyzes moving `snake` onto an absolute tile. The full grid delta is
/// handed to the relative analyzer unnormalized, so a request two tiles away
/// fails the direction rule rather than being silently reinterpreted as its
/// adjacent neighbor.
pub fn analyze_move_absolute(
    session: &GameSession,
    snake_id: EntityId,
    tile: Tile,
) -> Result<Move, MoveError> {
    let snake = session
        .entity(snake_id)
        .and_then(Entity::as_snake)
        .ok_or(MoveError::SnakeNotFound(snake_id))?;
    let head = snake.head();
    analyze_move_relative(session, snake_id, tile.x - head.x, tile.y - head.y)
}

/// True when the snake has at least one legal move.
pub fn can_move(session: &GameSession, snake_id: EntityId) -> bool {
    [(1, 0), (0, 1), (-1, 0), (0, -1)].iter().any(|&(dx, dy)| {
        analyze_move_relative(session, snake_id, dx, dy).is_ok_and(|mv| mv.valid)
    })
}
