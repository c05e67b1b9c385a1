//! Level-editor mutation engine.
//!
//! Pointer gestures (down/move/up at tile coordinates) drive four mutually
//! exclusive tools over a [`GameSession`]: brush, eraser, move and select.
//! Each gesture records at most one undo state, at the moment it first
//! mutates the board. Validation is advisory only; editing is never its
//! own puzzle, so overlaps and out-of-bounds placements are flagged, not
//! prevented.

pub mod line;
pub mod selection;
pub mod validate;

use snakeshift_core::history;
use snakeshift_core::level::FormatError;
use snakeshift_core::{
    CollisionLayer, Entity, EntityId, EntityKind, GameSession, Point, SnakeSegment, Tile,
    drag_snake,
};

pub use selection::Selection;
pub use validate::{ValidationWarning, validate_level};

/// The editor's mutually exclusive interaction modes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum EditorTool {
    #[default]
    Brush,
    Eraser,
    Move,
    Select,
}

/// What the brush paints: an entity kind in one collision color.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BrushSpec {
    pub kind: EntityKind,
    pub layer: CollisionLayer,
}

impl Default for BrushSpec {
    fn default() -> Self {
        Self {
            kind: EntityKind::Block,
            layer: CollisionLayer::WHITE,
        }
    }
}

/// Errors from clipboard-backed operations. Every failure leaves the
/// session unchanged.
#[derive(Debug, thiserror::Error)]
pub enum EditError {
    #[error("nothing is selected")]
    NoSelection,
    #[error("clipboard is empty")]
    EmptyClipboard,
    #[error("clipboard does not contain a level: {0}")]
    Clipboard(#[from] FormatError),
}

#[derive(Debug)]
enum Stroke {
    Brush { last: Point, entity: EntityId },
    Erase { last: Point, undo_recorded: bool },
    Drag { entity: EntityId, segment_index: usize },
    Select { start: Point },
}

/// Editor state carried between pointer events.
#[derive(Debug, Default)]
pub struct Editor {
    tool: EditorTool,
    brush: BrushSpec,
    stroke: Option<Stroke>,
    pub(crate) selection: Option<Selection>,
    pub(crate) clipboard: Option<String>,
}

impl Editor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tool(&self) -> EditorTool {
        self.tool
    }

    /// Switching tools cancels any gesture in progress.
    pub fn set_tool(&mut self, tool: EditorTool) {
        if self.tool != tool {
            self.tool = tool;
            self.stroke = None;
        }
    }

    pub fn brush(&self) -> BrushSpec {
        self.brush
    }

    pub fn set_brush(&mut self, brush: BrushSpec) {
        self.brush = brush;
    }

    /// Begins a gesture at the given tile.
    pub fn pointer_down(&mut self, session: &mut GameSession, x: i32, y: i32) {
        match self.tool {
            EditorTool::Brush => {
                if self.stroke.is_some() {
                    // A click event can follow the pointer-down of the same
                    // gesture; don't place twice.
                    return;
                }
                history::undoable(session);
                let entity = place_brush_entity(session, self.brush, x, y);
                session.sort_entities();
                self.stroke = Some(Stroke::Brush {
                    last: Point::new(x, y),
                    entity,
                });
            }
            EditorTool::Eraser => {
                let mut undo_recorded = false;
                erase_cell(session, x, y, &mut undo_recorded);
                self.stroke = Some(Stroke::Erase {
                    last: Point::new(x, y),
                    undo_recorded,
                });
            }
            EditorTool::Move => {
                let Some(hit) = session.hit_test(x, y).last().copied() else {
                    return;
                };
                history::undoable(session);
                // Raise the grabbed entity to the top, then let the layering
                // invariant pull it back down if it shouldn't be there.
                session.move_entity_to_top(hit.entity);
                session.sort_entities();
                self.stroke = Some(Stroke::Drag {
                    entity: hit.entity,
                    segment_index: hit.segment_index.unwrap_or(0),
                });
            }
            EditorTool::Select => {
                self.selection = None;
                self.stroke = Some(Stroke::Select {
                    start: Point::new(x, y),
                });
            }
        }
    }

    /// Continues the gesture at a new tile.
    pub fn pointer_move(&mut self, session: &mut GameSession, x: i32, y: i32) {
        let target = Point::new(x, y);
        match &mut self.stroke {
            Some(Stroke::Brush { last, entity }) => {
                let entity = *entity;
                let from = *last;
                *last = target;
                if self.brush.kind == EntityKind::Snake {
                    extend_snake(session, entity, self.brush.layer, target);
                } else {
                    for point in line::bresenham(from, target).into_iter().skip(1) {
                        place_rect_if_absent(session, self.brush, point.x, point.y);
                    }
                    session.sort_entities();
                }
            }
            Some(Stroke::Erase {
                last,
                undo_recorded,
            }) => {
                let from = *last;
                *last = target;
                for point in line::bresenham(from, target).into_iter().skip(1) {
                    erase_cell(session, point.x, point.y, undo_recorded);
                }
            }
            Some(Stroke::Drag {
                entity,
                segment_index,
            }) => {
                let entity = *entity;
                let segment_index = *segment_index;
                if matches!(session.entity(entity), Some(Entity::Snake(_))) {
                    let _ = drag_snake(session, entity, segment_index, target);
                } else if let Some(rect) =
                    session.entity_mut(entity).and_then(Entity::as_rect_mut)
                {
                    rect.x = x;
                    rect.y = y;
                }
            }
            Some(Stroke::Select { start }) => {
                let start = *start;
                self.selection = Some(selection::resolve_selection(session, start, target));
            }
            None => {}
        }
    }

    /// Ends the gesture.
    pub fn pointer_up(&mut self, session: &mut GameSession, x: i32, y: i32) {
        if let Some(Stroke::Select { start }) = &self.stroke {
            let start = *start;
            self.selection = Some(selection::resolve_selection(session, start, Point::new(x, y)));
        }
        self.stroke = None;
    }

    /// Cancels the gesture without finalizing a selection.
    pub fn pointer_cancel(&mut self) {
        self.stroke = None;
    }
}

fn place_brush_entity(session: &mut GameSession, brush: BrushSpec, x: i32, y: i32) -> EntityId {
    match brush.kind {
        EntityKind::Block => session.spawn_wall(x, y, brush.layer),
        EntityKind::Crate => session.spawn_crate(x, y, brush.layer),
        EntityKind::Food => session.spawn_food(x, y, brush.layer),
        EntityKind::Inverter => session.spawn_inverter(x, y, brush.layer),
        EntityKind::Snake => {
            session.spawn_snake(vec![SnakeSegment::new(x, y, brush.layer)], None)
        }
    }
}

/// Places one brush cell unless a congruent entity of the same kind and
/// color is already there: dragging back over a painted line must not
/// stack duplicates.
fn place_rect_if_absent(session: &mut GameSession, brush: BrushSpec, x: i32, y: i32) {
    let exists = session.entities().iter().any(|entity| {
        entity.kind() == brush.kind
            && entity
                .as_rect()
                .is_some_and(|rect| rect.layer == brush.layer && rect.tile() == Tile::unit(x, y))
    });
    if !exists {
        place_brush_entity(session, brush, x, y);
    }
}

/// Extends a brushed snake from its head towards `target`, stopping early
/// when the path would cross the snake's own body.
fn extend_snake(session: &mut GameSession, id: EntityId, layer: CollisionLayer, target: Point) {
    let Some(snake) = session.entity(id).and_then(Entity::as_snake) else {
        return;
    };
    let head = snake.head();
    let from = Point::new(head.x, head.y);
    for point in line::line_no_diagonals(from, target).into_iter().skip(1) {
        let snake = session
            .entity(id)
            .and_then(Entity::as_snake)
            .expect("brushed snake is present");
        if snake.segment_at(point.x, point.y).is_some() {
            break;
        }
        session
            .entity_mut(id)
            .and_then(Entity::as_snake_mut)
            .expect("brushed snake is present")
            .segments
            .insert(0, SnakeSegment::new(point.x, point.y, layer));
    }
}

/// Erases everything at one cell: whole entities, except snakes, which are
/// split at the hit segment. Records the gesture's undo state lazily, right
/// before the first actual deletion.
fn erase_cell(session: &mut GameSession, x: i32, y: i32, undo_recorded: &mut bool) {
    for hit in session.hit_test(x, y) {
        if session.entity(hit.entity).is_none() {
            // A snake split earlier in this cell already consumed it.
            continue;
        }
        if !*undo_recorded {
            history::undoable(session);
            *undo_recorded = true;
        }
        match session.entity(hit.entity) {
            Some(Entity::Snake(_)) => {
                delete_snake_segment(session, hit.entity, hit.segment_index.unwrap_or(0));
            }
            Some(_) => {
                session.remove_entity(hit.entity);
            }
            None => {}
        }
    }
}

/// Removes one segment, splitting the snake into up to two independent
/// snakes. Whichever half would be empty is dropped; when both halves
/// survive, the head half keeps the snake's identity and the tail half
/// becomes a new snake with a fresh persistent id, inserted just above the
/// original in draw order. Deleting the active snake entirely clears the
/// active player.
pub fn delete_snake_segment(session: &mut GameSession, snake_id: EntityId, segment_index: usize) {
    let Some(snake) = session.entity(snake_id).and_then(Entity::as_snake) else {
        return;
    };
    let segments = snake.segments.clone();
    if segment_index >= segments.len() {
        return;
    }
    let head_half = segments[..segment_index].to_vec();
    let tail_half = segments[segment_index + 1..].to_vec();
    match (head_half.is_empty(), tail_half.is_empty()) {
        (true, true) => {
            session.remove_entity(snake_id);
        }
        (false, true) => {
            session
                .entity_mut(snake_id)
                .and_then(Entity::as_snake_mut)
                .expect("snake is present")
                .segments = head_half;
        }
        (true, false) => {
            session
                .entity_mut(snake_id)
                .and_then(Entity::as_snake_mut)
                .expect("snake is present")
                .segments = tail_half;
        }
        (false, false) => {
            session
                .entity_mut(snake_id)
                .and_then(Entity::as_snake_mut)
                .expect("snake is present")
                .segments = head_half;
            let index = session.index_of(snake_id).expect("snake is present");
            let new_snake = session.spawn_snake(tail_half, None);
            session.reposition_entity(new_snake, index + 1);
            tracing::debug!(%snake_id, %new_snake, "split snake");
        }
    }
}
