//! End-to-end gameplay properties exercised through the public API.

use snakeshift_core::history;
use snakeshift_core::level;
use snakeshift_core::{
    ActivityMode, CollisionLayer, EntityId, EntityKind, GameSession, LevelInfo, SnakeSegment,
    analyze_move_relative, can_move, take_move,
};

fn spawn_white_snake(session: &mut GameSession, cells: &[(i32, i32)]) -> EntityId {
    let segments = cells
        .iter()
        .map(|&(x, y)| SnakeSegment::new(x, y, CollisionLayer::WHITE))
        .collect();
    session.spawn_snake(segments, None)
}

/// A full little play session (move, push, eat, win), then unwinding the whole
/// thing move by move.
#[test]
fn play_push_eat_win_and_unwind() {
    let mut session = GameSession::new();
    session.level_info = LevelInfo::new(8, 2);
    let krate = session.spawn_crate(2, 0, CollisionLayer::BOTH);
    session.spawn_food(2, 1, CollisionLayer::WHITE);
    let snake = spawn_white_snake(&mut session, &[(1, 0), (0, 0)]);
    session.set_active_player(Some(snake));
    history::set_activity_mode(&mut session, ActivityMode::Play);

    let initial = level::serialize(&session);

    // Push the crate aside, then step down onto the food.
    for (dx, dy) in [(1, 0), (0, 1)] {
        let mv = analyze_move_relative(&session, snake, dx, dy).unwrap();
        assert!(mv.valid, "step ({dx}, {dy}) should be legal");
        take_move(&mut session, &mv).unwrap();
    }
    assert!(session.won_level(), "eating the only food wins");
    let rect = session.entity(krate).unwrap().as_rect().unwrap();
    assert_eq!((rect.x, rect.y), (3, 0), "crate was pushed exactly one tile");

    // Move reversibility: each undo steps back exactly one serialized state.
    assert_eq!(session.undo_count(), 2);
    while history::undo(&mut session) {}
    assert_eq!(level::serialize(&session), initial);
    assert!(!session.check_level_won());
}

/// Collision symmetry: a surface of layer L blocks an L-colored snake and
/// admits the opposite color, for both colors.
#[test]
fn collision_symmetry_both_colors() {
    for (surface, same, opposite) in [
        (CollisionLayer::WHITE, CollisionLayer::WHITE, CollisionLayer::BLACK),
        (CollisionLayer::BLACK, CollisionLayer::BLACK, CollisionLayer::WHITE),
    ] {
        let mut session = GameSession::new();
        session.spawn_wall(1, 0, surface);
        let blocked_snake = session.spawn_snake(vec![SnakeSegment::new(0, 0, same)], None);
        let admitted_snake = session.spawn_snake(vec![SnakeSegment::new(1, 1, opposite)], None);
        assert!(
            !analyze_move_relative(&session, blocked_snake, 1, 0).unwrap().valid,
            "{surface:?} must block {same:?}"
        );
        // The opposite-colored snake steps straight up onto the wall tile.
        assert!(
            analyze_move_relative(&session, admitted_snake, 0, -1).unwrap().valid,
            "{surface:?} must admit {opposite:?}"
        );
    }
}

/// Push legality: exactly one tile, never a teleport, and undone cleanly.
#[test]
fn crate_push_moves_one_tile_and_reverses() {
    let mut session = GameSession::new();
    session.level_info = LevelInfo::new(4, 1);
    let krate = session.spawn_crate(1, 0, CollisionLayer::BOTH);
    let snake = spawn_white_snake(&mut session, &[(0, 0)]);

    let before = level::serialize(&session);
    let mv = analyze_move_relative(&session, snake, 1, 0).unwrap();
    take_move(&mut session, &mv).unwrap();
    let rect = session.entity(krate).unwrap().as_rect().unwrap();
    assert_eq!((rect.x, rect.y), (2, 0));

    assert!(history::undo(&mut session));
    assert_eq!(level::serialize(&session), before);

    // Against the wall the crate cannot move at all.
    let mut session = GameSession::new();
    session.level_info = LevelInfo::new(2, 1);
    session.spawn_crate(1, 0, CollisionLayer::BOTH);
    let snake = spawn_white_snake(&mut session, &[(0, 0)]);
    assert!(!analyze_move_relative(&session, snake, 1, 0).unwrap().valid);
}

/// Inversion closure: every tile-connected entity flips exactly once and
/// every visited bare tile gains a white block.
#[test]
fn inversion_flips_the_connected_component_once() {
    let mut session = GameSession::new();
    session.level_info = LevelInfo::new(8, 8);
    // Chain after the move: the eater's tail rests on the black snake's
    // head, whose own tail shares a tile with the crate.
    session.spawn_inverter(2, 0, CollisionLayer::WHITE);
    let chained = session.spawn_snake(
        vec![
            SnakeSegment::new(1, 0, CollisionLayer::BLACK),
            SnakeSegment::new(1, 1, CollisionLayer::BLACK),
        ],
        None,
    );
    let krate = session.spawn_crate(1, 1, CollisionLayer::BOTH);
    let outsider = session.spawn_wall(7, 7, CollisionLayer::BLACK);
    let eater = spawn_white_snake(&mut session, &[(1, 0), (0, 0)]);

    let mv = analyze_move_relative(&session, eater, 1, 0).unwrap();
    assert!(mv.valid);
    take_move(&mut session, &mv).unwrap();

    let eater_snake = session.entity(eater).unwrap().as_snake().unwrap();
    assert!(eater_snake.segments.iter().all(|s| s.layer == CollisionLayer::BLACK));
    let chained_snake = session.entity(chained).unwrap().as_snake().unwrap();
    assert!(chained_snake.segments.iter().all(|s| s.layer == CollisionLayer::WHITE));
    assert_eq!(
        session.entity(krate).unwrap().as_rect().unwrap().layer,
        CollisionLayer::BOTH,
        "BOTH flips to itself"
    );
    assert_eq!(
        session.entity(outsider).unwrap().as_rect().unwrap().layer,
        CollisionLayer::BLACK,
        "disconnected entities stay put"
    );

    // Visited positions: eater (2,0)+(1,0), chained tail (1,1). None had a
    // wall, so each gained a white block at the bottom of the draw order.
    let mut filled: Vec<(i32, i32)> = session
        .entities()
        .iter()
        .filter(|e| e.kind() == EntityKind::Block)
        .filter(|e| e.as_rect().unwrap().layer == CollisionLayer::WHITE)
        .map(|e| {
            let r = e.as_rect().unwrap();
            (r.x, r.y)
        })
        .collect();
    filled.sort();
    assert_eq!(filled, vec![(1, 0), (1, 1), (2, 0)]);
}

/// A 10-segment snake marches down one row.
#[test]
fn ten_segment_snake_scenario() {
    let mut session = GameSession::new();
    session.level_info = LevelInfo::new(16, 16);
    let cells: Vec<(i32, i32)> = (0..10).map(|i| (i, 0)).collect();
    let snake = spawn_white_snake(&mut session, &cells);

    let mv = analyze_move_relative(&session, snake, 0, 1).unwrap();
    assert!(mv.valid);
    take_move(&mut session, &mv).unwrap();

    let body = session.entity(snake).unwrap().as_snake().unwrap();
    assert_eq!((body.segments[0].x, body.segments[0].y), (0, 1));
    assert_eq!((body.segments[1].x, body.segments[1].y), (0, 0));
    // The old tail cell is vacated.
    assert!(body.segment_at(9, 0).is_none());
    assert_eq!(body.segments.len(), 10);
}

/// A snake pinned under another snake cannot move until it is uncovered.
#[test]
fn encumbered_snake_frees_up_when_the_rider_leaves() {
    let mut session = GameSession::new();
    session.level_info = LevelInfo::new(4, 4);
    let lower = spawn_white_snake(&mut session, &[(0, 0), (1, 0)]);
    let rider = session.spawn_snake(
        vec![
            SnakeSegment::new(1, 0, CollisionLayer::BLACK),
            SnakeSegment::new(1, 1, CollisionLayer::BLACK),
        ],
        None,
    );
    assert!(!can_move(&session, lower));

    let away = analyze_move_relative(&session, rider, 1, 0).unwrap();
    assert!(away.valid);
    take_move(&mut session, &away).unwrap();
    let away = analyze_move_relative(&session, rider, 0, 1).unwrap();
    assert!(away.valid);
    take_move(&mut session, &away).unwrap();
    assert!(can_move(&session, lower));
}
