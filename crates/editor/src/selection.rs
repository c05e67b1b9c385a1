//! Rectangular marquee selection and clipboard operations.
//!
//! Copy and paste round-trip through the regular level serializer: the
//! selection is isolated into a scratch session, saved as a level document,
//! and pasted back by deserializing it. Pasted snakes get fresh persistent
//! ids so a paste can never collide with its source across levels.

use snakeshift_core::history;
use snakeshift_core::level;
use snakeshift_core::{Entity, EntityId, GameSession, Point, SnakeUid};

use crate::{EditError, Editor};

/// A resolved marquee: the dragged box (inclusive tile corners, in drag
/// order) plus the entities it captured.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selection {
    pub start: Point,
    pub end: Point,
    pub entities: Vec<EntityId>,
}

/// Resolves which entities a marquee captures: rectangular entities that
/// overlap the box, and snakes with any segment inside it.
pub(crate) fn resolve_selection(session: &GameSession, start: Point, end: Point) -> Selection {
    let (min_x, min_y) = (start.x.min(end.x), start.y.min(end.y));
    let (max_x, max_y) = (start.x.max(end.x), start.y.max(end.y));
    let overlaps = |x: i32, y: i32, width: i32, height: i32| {
        x <= max_x && x + width - 1 >= min_x && y <= max_y && y + height - 1 >= min_y
    };
    let entities = session
        .entities()
        .iter()
        .filter(|entity| match entity {
            Entity::Snake(snake) => snake
                .segments
                .iter()
                .any(|s| overlaps(s.x, s.y, s.width, s.height)),
            other => {
                let rect = other.as_rect().expect("non-snake entities are rectangular");
                overlaps(rect.x, rect.y, rect.width, rect.height)
            }
        })
        .map(Entity::id)
        .collect();
    Selection {
        start,
        end,
        entities,
    }
}

impl Editor {
    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    pub fn clipboard(&self) -> Option<&str> {
        self.clipboard.as_deref()
    }

    /// Shifts every selected entity by a whole-tile offset, undoably.
    pub fn translate_selection(
        &mut self,
        session: &mut GameSession,
        dx: i32,
        dy: i32,
    ) -> Result<(), EditError> {
        let selection = self.selection.as_mut().ok_or(EditError::NoSelection)?;
        history::undoable(session);
        for &id in &selection.entities {
            if let Some(entity) = session.entity_mut(id) {
                entity.translate(dx, dy);
            }
        }
        selection.start = Point::new(selection.start.x + dx, selection.start.y + dy);
        selection.end = Point::new(selection.end.x + dx, selection.end.y + dy);
        Ok(())
    }

    /// Deletes the selected entities, undoably. The selection is cleared.
    pub fn delete_selection(&mut self, session: &mut GameSession) -> Result<(), EditError> {
        let selection = self.selection.take().ok_or(EditError::NoSelection)?;
        history::undoable(session);
        for id in selection.entities {
            session.remove_entity(id);
        }
        Ok(())
    }

    /// Flips the collision color of every selected entity, undoably. Unlike
    /// the in-game inversion this touches exactly the selection: no
    /// flood-fill, no implicit white blocks.
    pub fn invert_selection(&mut self, session: &mut GameSession) -> Result<(), EditError> {
        let selection = self.selection.as_ref().ok_or(EditError::NoSelection)?;
        history::undoable(session);
        for &id in &selection.entities {
            if let Some(entity) = session.entity_mut(id) {
                entity.invert_layers();
            }
        }
        Ok(())
    }

    /// Copies the selection to the clipboard as a level document.
    pub fn copy_selection(&mut self, session: &GameSession) -> Result<(), EditError> {
        let selection = self.selection.as_ref().ok_or(EditError::NoSelection)?;
        let mut scratch = GameSession::new();
        scratch.level_info = session.level_info;
        for &id in &selection.entities {
            if let Some(entity) = session.entity(id) {
                scratch.adopt_entity(entity.clone());
            }
        }
        self.clipboard = Some(level::serialize_for_save(&scratch).into_string());
        Ok(())
    }

    /// Copy, then delete, with one undo state for the deletion.
    pub fn cut_selection(&mut self, session: &mut GameSession) -> Result<(), EditError> {
        self.copy_selection(session)?;
        self.delete_selection(session)
    }

    /// Pastes the clipboard into the session, undoably. Pasted entities land
    /// on top of the draw order (then re-sorted), become the new selection,
    /// and pasted snakes receive fresh persistent ids.
    pub fn paste(&mut self, session: &mut GameSession) -> Result<Vec<EntityId>, EditError> {
        let text = self.clipboard.clone().ok_or(EditError::EmptyClipboard)?;
        let mut scratch = GameSession::new();
        level::deserialize(&mut scratch, &text)?;

        history::undoable(session);
        let mut rng = rand::thread_rng();
        let mut pasted = Vec::new();
        for entity in scratch.entities() {
            let mut entity = entity.clone();
            if let Some(snake) = entity.as_snake_mut() {
                snake.uid = SnakeUid::random(&mut rng);
            }
            pasted.push(session.adopt_entity(entity));
        }
        session.sort_entities();

        // Select what was pasted, boxed by its own extent.
        let mut min = Point::new(i32::MAX, i32::MAX);
        let mut max = Point::new(i32::MIN, i32::MIN);
        for &id in &pasted {
            let entity = session.entity(id).expect("just pasted");
            let tiles: Vec<(i32, i32)> = match entity {
                Entity::Snake(snake) => snake.segments.iter().map(|s| (s.x, s.y)).collect(),
                other => {
                    let rect = other.as_rect().expect("non-snake entities are rectangular");
                    vec![(rect.x, rect.y)]
                }
            };
            for (x, y) in tiles {
                min = Point::new(min.x.min(x), min.y.min(y));
                max = Point::new(max.x.max(x), max.y.max(y));
            }
        }
        self.selection = (!pasted.is_empty()).then(|| Selection {
            start: min,
            end: max,
            entities: pasted.clone(),
        });
        Ok(pasted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EditorTool;
    use snakeshift_core::{CollisionLayer, EntityKind, SnakeSegment};

    fn populated_session() -> GameSession {
        let mut session = GameSession::new();
        session.spawn_wall(0, 0, CollisionLayer::BLACK);
        session.spawn_crate(1, 1, CollisionLayer::BOTH);
        session.spawn_snake(
            vec![
                SnakeSegment::new(2, 2, CollisionLayer::WHITE),
                SnakeSegment::new(3, 2, CollisionLayer::WHITE),
            ],
            None,
        );
        session.spawn_food(6, 6, CollisionLayer::WHITE);
        session
    }

    fn select(editor: &mut Editor, session: &mut GameSession, from: (i32, i32), to: (i32, i32)) {
        editor.set_tool(EditorTool::Select);
        editor.pointer_down(session, from.0, from.1);
        editor.pointer_move(session, to.0, to.1);
        editor.pointer_up(session, to.0, to.1);
    }

    #[test]
    fn marquee_captures_overlapping_entities_only() {
        let mut session = populated_session();
        let mut editor = Editor::new();
        select(&mut editor, &mut session, (0, 0), (2, 2));
        let selection = editor.selection().unwrap();
        // Wall, crate, and the snake (one segment inside); not the food.
        assert_eq!(selection.entities.len(), 3);
    }

    #[test]
    fn translate_moves_every_selected_entity() {
        let mut session = populated_session();
        let mut editor = Editor::new();
        select(&mut editor, &mut session, (0, 0), (1, 1));
        editor.translate_selection(&mut session, 2, 3).unwrap();
        let wall = session
            .entities()
            .iter()
            .find(|e| e.kind() == EntityKind::Block)
            .unwrap()
            .as_rect()
            .unwrap();
        assert_eq!((wall.x, wall.y), (2, 3));
        assert_eq!(session.undo_count(), 1);
    }

    #[test]
    fn copy_paste_round_trips_and_regenerates_snake_uids() {
        let mut session = populated_session();
        let original_uid = session.snakes().next().unwrap().uid.clone();
        let mut editor = Editor::new();
        select(&mut editor, &mut session, (2, 2), (3, 2));
        editor.copy_selection(&session).unwrap();

        let pasted = editor.paste(&mut session).unwrap();
        assert_eq!(pasted.len(), 1);
        assert_eq!(session.snakes().count(), 2);
        let uids: Vec<_> = session.snakes().map(|s| s.uid.clone()).collect();
        assert!(uids.contains(&original_uid));
        assert_eq!(
            uids.iter().filter(|&u| u == &original_uid).count(),
            1,
            "pasted snake got a fresh uid"
        );
        // The paste became the new selection.
        assert_eq!(editor.selection().unwrap().entities, pasted);
    }

    #[test]
    fn cut_removes_after_copying() {
        let mut session = populated_session();
        let mut editor = Editor::new();
        select(&mut editor, &mut session, (6, 6), (6, 6));
        editor.cut_selection(&mut session).unwrap();
        assert!(session.entities().iter().all(|e| e.kind() != EntityKind::Food));
        assert!(editor.clipboard().is_some());
        assert!(editor.selection().is_none());

        let pasted = editor.paste(&mut session).unwrap();
        assert_eq!(pasted.len(), 1);
        assert!(session.entities().iter().any(|e| e.kind() == EntityKind::Food));
    }

    #[test]
    fn invert_selection_flips_layers_in_place() {
        let mut session = populated_session();
        let mut editor = Editor::new();
        select(&mut editor, &mut session, (0, 0), (0, 0));
        editor.invert_selection(&mut session).unwrap();
        let wall = session
            .entities()
            .iter()
            .find(|e| e.kind() == EntityKind::Block)
            .unwrap()
            .as_rect()
            .unwrap();
        assert_eq!(wall.layer, CollisionLayer::WHITE);
        // No flood-fill blocks appeared.
        assert_eq!(session.entities().len(), 4);
    }

    #[test]
    fn paste_with_empty_clipboard_fails_cleanly() {
        let mut session = populated_session();
        let before = session.entities().len();
        let mut editor = Editor::new();
        assert!(matches!(
            editor.paste(&mut session),
            Err(EditError::EmptyClipboard)
        ));
        assert_eq!(session.entities().len(), before);
        assert_eq!(session.undo_count(), 0);
    }
}
