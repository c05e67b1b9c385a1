//! Deterministic puzzle rules and state for snakeshift.
//!
//! `snakeshift-core` owns the canonical game model: the two-layer collision
//! grid, the entity union, pure move resolution and its mutating
//! counterpart, undo/redo history, and the versioned level and playthrough
//! formats. The editor and puzzle crates build on the types re-exported
//! here; rendering, input and audio live entirely outside.
pub mod action;
pub mod config;
pub mod history;
pub mod level;
pub mod playthrough;
pub mod state;

pub use action::{
    GameEvent, Move, MoveError, MoveOutcome, analyze_move_absolute, analyze_move_relative,
    can_move, drag_snake, take_move,
};
pub use config::GameConfig;
pub use level::{FormatError, OutOfBoundsReport, ParsedState, Snapshot};
pub use state::{
    ActivityMode, CollisionLayer, Direction, Entity, EntityId, EntityKind, GameSession, Hit,
    HitTestOptions, LevelInfo, Point, RectEntity, Snake, SnakeSegment, SnakeUid, Tile, top_layer,
};
