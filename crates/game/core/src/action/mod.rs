//! Move resolution and application.
//!
//! The two halves mirror a validate→apply pipeline: [`analyze_move_relative`]
//! is pure and produces a [`Move`] verdict without touching the session;
//! [`take_move`] consumes a valid verdict and performs every side effect
//! (segment shift, draw-order resort, pushes, eating, inversion) atomically
//! within the call.

mod apply;
mod invert;
mod resolve;

pub use apply::{drag_snake, take_move};
pub use resolve::{analyze_move_absolute, analyze_move_relative, can_move};

use crate::state::{EntityId, Point, Tile};

/// Structurally impossible calls only; an illegal move is not an error but a
/// [`Move`] with `valid: false`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum MoveError {
    #[error("snake {0} not found in session")]
    SnakeNotFound(EntityId),
}

/// A computed, not-yet-applied move description.
///
/// Produced per input event or search step; either discarded (invalid) or
/// passed to [`take_move`] exactly once. Handles inside it are only
/// meaningful against the session state it was computed from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Move {
    pub snake: EntityId,
    pub to: Tile,
    pub delta: Point,
    pub valid: bool,
    /// Another solid entity rides on top of one of the snake's segments,
    /// anchoring it in place.
    pub encumbered: bool,
    /// Entities occupying the destination, minus anything being pushed.
    pub entities_there: Vec<EntityId>,
    /// Crate (and any collectable boxed on it) that this move shoves ahead.
    pub entities_to_push: Vec<EntityId>,
}

/// Observable side effects of an applied move, returned as data. Sound and
/// presentation layers consume these; the core never calls out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GameEvent {
    Move,
    PushCrate,
    EatFood,
    Invert,
    LevelWon,
}

/// Outcome of [`take_move`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MoveOutcome {
    pub events: Vec<GameEvent>,
    pub won: bool,
}
