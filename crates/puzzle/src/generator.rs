//! Reverse-simulation puzzle generator.
//!
//! A trial scatters blocks, grows a few snakes, then walks random legal
//! moves *backwards*, occasionally synthesizing a food at the head and
//! shrinking the snake, which plays forwards as "ate and grew". Every
//! reverse step is validated by re-simulating it forwards through the real
//! move engine and comparing the resulting state structurally against the
//! expected snapshot; mismatches are rolled back. The best of several
//! independent trials (by a complexity heuristic over the validated moves)
//! wins.

use rand::Rng;

use snakeshift_core::history;
use snakeshift_core::level::{self, Snapshot};
use snakeshift_core::{
    CollisionLayer, Direction, Entity, GameSession, LevelInfo, Move, Point, SnakeSegment,
    SnakeUid, Tile, analyze_move_absolute, drag_snake, take_move, top_layer,
};

use crate::CancelFlag;

/// Tunables for [`generate_level`]. The defaults are the values the game
/// ships with.
#[derive(Clone, Copy, Debug)]
pub struct GeneratorOptions {
    /// Independent trials; the highest-scoring board wins.
    pub tries: usize,
    /// Reverse-step attempts per trial.
    pub step_limit: usize,
    /// Stop a trial once this many validated reverse moves accumulate.
    pub target_complexity: usize,
    /// Probability of a block per cell when seeding the board.
    pub block_density: f64,
    /// Probability that a reverse step synthesizes a food.
    pub food_chance: f64,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            tries: 20,
            step_limit: 10_000,
            target_complexity: 100,
            block_density: 0.3,
            food_chance: 0.3,
        }
    }
}

/// Score and shape of a generated puzzle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GeneratorStats {
    pub puzzle_steps: usize,
    pub num_food: usize,
    /// `Σ (1 + 2·|entities there| + 3·|entities pushed|)` over the validated
    /// reverse moves; doubles as the trial's score.
    pub total_move_complexity: usize,
}

/// Generates a puzzle into `session`, returning the winning trial's stats,
/// or `None` when no trial produced a scoring board (or cancellation struck
/// before one did). The session ends at the best board found.
pub fn generate_level<R: Rng>(
    session: &mut GameSession,
    rng: &mut R,
    options: &GeneratorOptions,
    cancel: &CancelFlag,
) -> Option<GeneratorStats> {
    let mut best: Option<(Snapshot, GeneratorStats)> = None;
    for trial in 0..options.tries {
        if cancel.is_cancelled() {
            tracing::debug!(trial, "level generation cancelled");
            break;
        }
        let stats = try_generate_level(session, rng, options, cancel);
        let best_score = best.as_ref().map_or(0, |(_, s)| s.total_move_complexity);
        if stats.total_move_complexity > best_score {
            best = Some((level::serialize(session), stats));
        }
        tracing::debug!(
            trial,
            complexity = stats.total_move_complexity,
            "generation trial finished"
        );
    }
    let (snapshot, stats) = best?;
    tracing::debug!(complexity = stats.total_move_complexity, "keeping best trial");
    level::deserialize(session, snapshot.as_str()).expect("generated snapshots deserialize");
    Some(stats)
}

fn try_generate_level<R: Rng>(
    session: &mut GameSession,
    rng: &mut R,
    options: &GeneratorOptions,
    cancel: &CancelFlag,
) -> GeneratorStats {
    // Small boards skew towards puzzles instead of aimless traversal.
    level::clear_level(session, false, false);
    session.level_info = LevelInfo::new(2 + rng.gen_range(0..5), 2 + rng.gen_range(0..5));
    let width = session.level_info.width;
    let height = session.level_info.height;

    for x in 0..width {
        for y in 0..height {
            if rng.gen_bool(options.block_density) {
                session.spawn_wall(x, y, CollisionLayer::WHITE);
            }
        }
    }

    let snake_count = 1 + rng.gen_range(0..3);
    for _ in 0..snake_count {
        seed_snake(session, rng);
    }

    let mut accepted: Vec<Move> = Vec::new();
    for _ in 0..options.step_limit {
        if cancel.is_cancelled() || accepted.len() >= options.target_complexity {
            break;
        }
        if let Some(mv) = reverse_step(session, rng, options) {
            accepted.push(mv);
        }
    }

    let num_food = session
        .entities()
        .iter()
        .filter(|e| matches!(e, Entity::Food(_)))
        .count();
    let total_move_complexity = accepted
        .iter()
        .map(|mv| 1 + mv.entities_there.len() * 2 + mv.entities_to_push.len() * 3)
        .sum();
    GeneratorStats {
        puzzle_steps: accepted.len(),
        num_food,
        total_move_complexity,
    }
}

/// Places one snake, growing it segment by segment onto tiles its color can
/// rest on. The snake is spawned before growing so the partial body takes
/// part in its own hit tests.
fn seed_snake<R: Rng>(session: &mut GameSession, rng: &mut R) {
    let mut x = rng.gen_range(0..session.level_info.width);
    let mut y = rng.gen_range(0..session.level_info.height);
    let hits = session.hit_test(x, y);
    let layer = match hits.first() {
        Some(hit) => hit.layer.inverted(),
        None => CollisionLayer::WHITE,
    };
    let snake = session.spawn_snake_with_rng(vec![SnakeSegment::new(x, y, layer)], rng);

    let target_length = 2 + rng.gen_range(0..10);
    for _ in 1..target_length {
        let mut directions = Direction::ALL;
        shuffle(&mut directions, rng);
        for direction in directions {
            let delta = direction.delta();
            let next = Tile::unit(x + delta.x, y + delta.y);
            if !session.level_info.contains(&next) {
                continue;
            }
            let hits = session.hit_test(next.x, next.y);
            if !top_layer(&hits).collides_with(layer) {
                x = next.x;
                y = next.y;
                session
                    .entity_mut(snake)
                    .and_then(Entity::as_snake_mut)
                    .expect("seeded snake is present")
                    .segments
                    .push(SnakeSegment::new(x, y, layer));
                break;
            }
        }
    }
}

/// One reverse step: drag a random snake one tile backwards (optionally
/// conjuring the food it "un-eats"), then prove the forward move recreates
/// the exact state we started from. Returns the validated forward move.
fn reverse_step<R: Rng>(
    session: &mut GameSession,
    rng: &mut R,
    options: &GeneratorOptions,
) -> Option<Move> {
    let snakes: Vec<_> = session.snakes().map(|s| s.id).collect();
    let snake_id = snakes[rng.gen_range(0..snakes.len())];
    let direction = Direction::ALL[rng.gen_range(0..Direction::ALL.len())].delta();

    let snake = session
        .entity(snake_id)
        .and_then(Entity::as_snake)
        .expect("picked snake is present");
    let uid = snake.uid.clone();
    let prev_grow = snake.grow_on_next_move;
    let tail = snake.tail();
    let head = *snake.head();
    let before_tile = Tile::unit(tail.x - direction.x, tail.y - direction.y);
    if !session.level_info.contains(&before_tile) {
        return None;
    }
    let hits = session.hit_test(before_tile.x, before_tile.y);
    if top_layer(&hits).collides_with(head.layer) {
        return None;
    }

    // Eating sets the grow flag, so the (forward-)after state must carry it;
    // set it before the expected snapshot is taken.
    let eat = rng.gen_bool(options.food_chance) && snake.segments.len() > 1;
    session
        .entity_mut(snake_id)
        .and_then(Entity::as_snake_mut)
        .expect("picked snake is present")
        .grow_on_next_move = eat;
    let expected = level::serialize(session);
    let previous_head = Tile::unit(head.x, head.y);

    if eat {
        session.spawn_food(head.x, head.y, head.layer);
    }
    let tail_index = session
        .entity(snake_id)
        .and_then(Entity::as_snake)
        .expect("picked snake is present")
        .segments
        .len()
        - 1;
    drag_snake(
        session,
        snake_id,
        tail_index,
        Point::new(before_tile.x, before_tile.y),
    )
    .expect("picked snake is present");
    if eat {
        let body = session
            .entity_mut(snake_id)
            .and_then(Entity::as_snake_mut)
            .expect("picked snake is present");
        body.segments.pop();
    }

    let mv = analyze_move_absolute(session, snake_id, previous_head)
        .expect("picked snake is present");
    if !mv.valid {
        backtrack(session, &expected, &uid, prev_grow);
        return None;
    }

    // The move may be legal yet still not reproduce the expected state
    // (entity order, eaten food, grow bookkeeping), so simulate it for real
    // and compare the typed states structurally.
    take_move(session, &mv).expect("valid move applies");
    let actual = level::serialize(session);
    history::undo(session);
    if !states_match(&expected, &actual) {
        backtrack(session, &expected, &uid, prev_grow);
        return None;
    }
    Some(mv)
}

/// Structural comparison of two serialized states: key order and formatting
/// are irrelevant, entity order and values are not.
fn states_match(expected: &Snapshot, actual: &Snapshot) -> bool {
    match (
        level::parse_state(expected.as_str()),
        level::parse_state(actual.as_str()),
    ) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn backtrack(session: &mut GameSession, expected: &Snapshot, uid: &SnakeUid, prev_grow: bool) {
    level::deserialize(session, expected.as_str()).expect("generator snapshots deserialize");
    // The expected snapshot was taken after the grow flag was speculatively
    // set; put the real value back.
    if let Some(id) = session.find_snake_by_uid(uid) {
        session
            .entity_mut(id)
            .and_then(Entity::as_snake_mut)
            .expect("snake found by uid")
            .grow_on_next_move = prev_grow;
    }
}

fn shuffle<T, R: Rng>(items: &mut [T], rng: &mut R) {
    for i in (1..items.len()).rev() {
        items.swap(i, rng.gen_range(0..=i));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use snakeshift_core::EntityKind;

    fn quick_options() -> GeneratorOptions {
        GeneratorOptions {
            tries: 4,
            step_limit: 300,
            target_complexity: 12,
            ..GeneratorOptions::default()
        }
    }

    #[test]
    fn generates_a_loadable_board_with_snakes() {
        let mut session = GameSession::new();
        let mut rng = StdRng::seed_from_u64(0xdecade);
        let stats = generate_level(
            &mut session,
            &mut rng,
            &quick_options(),
            &CancelFlag::new(),
        );
        let stats = stats.expect("some trial should score");
        assert!(stats.puzzle_steps > 0);
        assert!(stats.total_move_complexity >= stats.puzzle_steps);
        assert!(session.snakes().count() >= 1);

        // The board must survive a save/load round trip.
        let saved = level::serialize_for_save(&session);
        let mut reloaded = GameSession::new();
        level::deserialize(&mut reloaded, saved.as_str()).unwrap();
        assert_eq!(reloaded.entities().len(), session.entities().len());
    }

    #[test]
    fn same_seed_generates_the_same_level() {
        let run = |seed: u64| {
            let mut session = GameSession::new();
            let mut rng = StdRng::seed_from_u64(seed);
            generate_level(&mut session, &mut rng, &quick_options(), &CancelFlag::new());
            level::serialize_for_save(&session).into_string()
        };
        assert_eq!(run(7), run(7));
        assert_ne!(run(7), run(8));
    }

    #[test]
    fn food_count_matches_reported_stats() {
        let mut session = GameSession::new();
        let mut rng = StdRng::seed_from_u64(42);
        if let Some(stats) = generate_level(
            &mut session,
            &mut rng,
            &quick_options(),
            &CancelFlag::new(),
        ) {
            let foods = session
                .entities()
                .iter()
                .filter(|e| e.kind() == EntityKind::Food)
                .count();
            assert_eq!(foods, stats.num_food);
        }
    }

    #[test]
    fn cancelled_generation_returns_nothing_when_no_trial_ran() {
        let mut session = GameSession::new();
        let mut rng = StdRng::seed_from_u64(1);
        let cancel = CancelFlag::new();
        cancel.cancel();
        assert!(generate_level(&mut session, &mut rng, &quick_options(), &cancel).is_none());
    }
}
