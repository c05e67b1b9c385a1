//! Naive bounded-depth solver.
//!
//! Depth-first search over every legal move of every snake, deduplicated by
//! a fingerprint of the full serialized state and unwound with the same
//! undo machinery the player uses. It cannot cope with the real state
//! space, but it proves small levels solvable.

use std::collections::HashSet;

use sha2::{Digest, Sha256};

use snakeshift_core::history;
use snakeshift_core::level;
use snakeshift_core::{
    Direction, Entity, GameSession, Point, SnakeUid, analyze_move_relative, take_move,
};

use crate::CancelFlag;

/// A move that survives undo: entity handles are invalidated every time
/// history steps, so solved paths reference snakes by persistent id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SolverMove {
    pub snake: SnakeUid,
    pub delta: Point,
}

enum Search {
    Solved,
    Exhausted,
    Cancelled,
}

/// Searches for a winning move sequence, up to `depth_limit` moves deep.
///
/// Returns the sequence (leaving the board at the won state) or `None` on
/// exhaustion or cancellation, with the board restored to its pre-search
/// state by the undo calls that mirror each tentative move.
// TODO: save and restore the history stacks around the search; the walk
// leaves its last undone states on the redo stack.
pub fn solve_puzzle(
    session: &mut GameSession,
    depth_limit: usize,
    cancel: &CancelFlag,
) -> Option<Vec<SolverMove>> {
    let mut visited: HashSet<[u8; 32]> = HashSet::new();
    let mut path: Vec<SolverMove> = Vec::new();
    match search(session, 0, depth_limit, &mut visited, &mut path, cancel) {
        Search::Solved => {
            tracing::debug!(moves = path.len(), states = visited.len(), "puzzle solved");
            Some(path)
        }
        Search::Exhausted | Search::Cancelled => {
            tracing::debug!(states = visited.len(), "puzzle not solved");
            None
        }
    }
}

fn search(
    session: &mut GameSession,
    depth: usize,
    depth_limit: usize,
    visited: &mut HashSet<[u8; 32]>,
    path: &mut Vec<SolverMove>,
    cancel: &CancelFlag,
) -> Search {
    if cancel.is_cancelled() {
        return Search::Cancelled;
    }
    if depth > depth_limit {
        return Search::Exhausted;
    }
    if !visited.insert(fingerprint(session)) {
        return Search::Exhausted;
    }
    if session.check_level_won() {
        return Search::Solved;
    }

    for solver_move in available_moves(session) {
        // Handles don't survive undo; re-resolve the snake by its id.
        let Some(snake) = session.find_snake_by_uid(&solver_move.snake) else {
            continue;
        };
        let mv = analyze_move_relative(session, snake, solver_move.delta.x, solver_move.delta.y)
            .expect("snake was just found");
        if !mv.valid {
            continue;
        }
        take_move(session, &mv).expect("analyzed valid move applies");
        path.push(solver_move);
        match search(session, depth + 1, depth_limit, visited, path, cancel) {
            Search::Solved => return Search::Solved,
            Search::Cancelled => {
                history::undo(session);
                path.pop();
                return Search::Cancelled;
            }
            Search::Exhausted => {
                history::undo(session);
                path.pop();
            }
        }
    }
    Search::Exhausted
}

/// Every valid single move of every snake, in draw order.
fn available_moves(session: &GameSession) -> Vec<SolverMove> {
    let mut moves = Vec::new();
    for entity in session.entities() {
        let Entity::Snake(snake) = entity else {
            continue;
        };
        for direction in Direction::ALL {
            let delta = direction.delta();
            let mv = analyze_move_relative(session, snake.id, delta.x, delta.y)
                .expect("iterated snake exists");
            if mv.valid {
                moves.push(SolverMove {
                    snake: snake.uid.clone(),
                    delta,
                });
            }
        }
    }
    moves
}

fn fingerprint(session: &GameSession) -> [u8; 32] {
    let state = level::serialize(session);
    let mut hasher = Sha256::new();
    hasher.update(state.as_str().as_bytes());
    hasher.finalize().into()
}
