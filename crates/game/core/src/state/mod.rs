//! Authoritative game state.
//!
//! [`GameSession`] owns the draw-order entity list, the level metadata, the
//! active player, and the undo/redo stacks. Exactly one session is live at a
//! time; every operation in this crate takes the session explicitly instead
//! of reaching for shared globals.

pub mod entity;
pub mod grid;
pub mod spatial;

use rand::Rng;

pub use entity::{Entity, EntityId, EntityKind, RectEntity, Snake, SnakeSegment, SnakeUid};
pub use grid::{CollisionLayer, Direction, LevelInfo, Point, Tile, line_no_diagonals};
pub use spatial::{Hit, HitTestOptions, top_layer};

use crate::level::Snapshot;

/// What the session is currently being used for. Switching modes swaps the
/// history stacks; see [`crate::history::set_activity_mode`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ActivityMode {
    #[default]
    Menu,
    Edit,
    Play,
    Replay,
}

/// The one live board: entities in draw order plus session bookkeeping.
///
/// The entity list's order is load-bearing twice over: it is the render
/// z-order *and* the collision precedence ("topmost wins"). Mutations that
/// reorder it go through [`crate::action::take_move`] or the editor, both of
/// which preserve the layering invariant via [`GameSession::sort_entities`].
#[derive(Clone, Debug)]
pub struct GameSession {
    pub(crate) entities: Vec<Entity>,
    pub level_info: LevelInfo,
    pub(crate) active_player: Option<EntityId>,
    pub(crate) next_entity_id: u64,
    pub(crate) level_id: String,
    pub(crate) level_session_id: u64,
    pub(crate) mode: ActivityMode,
    pub(crate) undos: Vec<Snapshot>,
    pub(crate) redos: Vec<Snapshot>,
    pub(crate) editor_undos: Vec<Snapshot>,
    pub(crate) editor_redos: Vec<Snapshot>,
    /// Designed initial state of the current level, used by restart and by
    /// the edit/play mode switch.
    pub(crate) editor_state: Option<Snapshot>,
    pub(crate) level_has_goal: bool,
    pub(crate) won_level: bool,
}

impl GameSession {
    pub fn new() -> Self {
        Self {
            entities: Vec::new(),
            level_info: LevelInfo::default(),
            active_player: None,
            next_entity_id: 1,
            level_id: String::new(),
            level_session_id: 0,
            mode: ActivityMode::default(),
            undos: Vec::new(),
            redos: Vec::new(),
            editor_undos: Vec::new(),
            editor_redos: Vec::new(),
            editor_state: None,
            level_has_goal: false,
            won_level: false,
        }
    }

    // ------------------------------------------------------------------
    // Entity access
    // ------------------------------------------------------------------

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.iter().find(|e| e.id() == id)
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.iter_mut().find(|e| e.id() == id)
    }

    /// Position of the entity in the draw-order list.
    pub fn index_of(&self, id: EntityId) -> Option<usize> {
        self.entities.iter().position(|e| e.id() == id)
    }

    /// Like [`Self::index_of`] but treats absence as a programmer error:
    /// callers hold a handle that the session is supposed to contain.
    pub(crate) fn require_index(&self, id: EntityId) -> usize {
        self.index_of(id)
            .unwrap_or_else(|| panic!("entity {id} missing from the draw-order list"))
    }

    pub fn snakes(&self) -> impl Iterator<Item = &Snake> {
        self.entities.iter().filter_map(Entity::as_snake)
    }

    pub fn find_snake_by_uid(&self, uid: &SnakeUid) -> Option<EntityId> {
        self.snakes().find(|s| &s.uid == uid).map(|s| s.id)
    }

    // ------------------------------------------------------------------
    // Entity lifecycle
    // ------------------------------------------------------------------

    pub(crate) fn allocate_entity_id(&mut self) -> EntityId {
        let id = EntityId(self.next_entity_id);
        self.next_entity_id += 1;
        id
    }

    pub fn spawn_wall(&mut self, x: i32, y: i32, layer: CollisionLayer) -> EntityId {
        let id = self.allocate_entity_id();
        self.entities.push(Entity::Wall(RectEntity::new(id, x, y, layer)));
        id
    }

    pub fn spawn_crate(&mut self, x: i32, y: i32, layer: CollisionLayer) -> EntityId {
        let id = self.allocate_entity_id();
        self.entities.push(Entity::Crate(RectEntity::new(id, x, y, layer)));
        id
    }

    pub fn spawn_food(&mut self, x: i32, y: i32, layer: CollisionLayer) -> EntityId {
        let id = self.allocate_entity_id();
        self.entities.push(Entity::Food(RectEntity::new(id, x, y, layer)));
        id
    }

    pub fn spawn_inverter(&mut self, x: i32, y: i32, layer: CollisionLayer) -> EntityId {
        let id = self.allocate_entity_id();
        self.entities
            .push(Entity::Inverter(RectEntity::new(id, x, y, layer)));
        id
    }

    /// Adds a snake on top of the draw order. When `uid` is `None` a fresh
    /// random identity is generated.
    pub fn spawn_snake(&mut self, segments: Vec<SnakeSegment>, uid: Option<SnakeUid>) -> EntityId {
        let id = self.allocate_entity_id();
        let uid = uid.unwrap_or_else(|| SnakeUid::random(&mut rand::thread_rng()));
        self.entities.push(Entity::Snake(Snake::new(id, uid, segments)));
        id
    }

    /// Seedable variant of [`Self::spawn_snake`] for deterministic callers.
    pub fn spawn_snake_with_rng<R: Rng>(
        &mut self,
        segments: Vec<SnakeSegment>,
        rng: &mut R,
    ) -> EntityId {
        let uid = SnakeUid::random(rng);
        self.spawn_snake(segments, Some(uid))
    }

    /// Removes an entity from the draw-order list. Clears the active player
    /// if it was the removed entity.
    pub fn remove_entity(&mut self, id: EntityId) -> Option<Entity> {
        let index = self.index_of(id)?;
        if self.active_player == Some(id) {
            self.active_player = None;
        }
        Some(self.entities.remove(index))
    }

    /// Moves an existing entity to the end (top) of the draw order.
    pub fn move_entity_to_top(&mut self, id: EntityId) {
        let index = self.require_index(id);
        let entity = self.entities.remove(index);
        self.entities.push(entity);
    }

    /// Moves an existing entity to the given draw-order position.
    pub fn reposition_entity(&mut self, id: EntityId, index: usize) {
        let current = self.require_index(id);
        let entity = self.entities.remove(current);
        let index = index.min(self.entities.len());
        self.entities.insert(index, entity);
    }

    /// Takes ownership of an entity built elsewhere (another session, the
    /// clipboard), assigning it a fresh handle and placing it on top.
    pub fn adopt_entity(&mut self, mut entity: Entity) -> EntityId {
        let id = self.allocate_entity_id();
        match &mut entity {
            Entity::Wall(rect)
            | Entity::Crate(rect)
            | Entity::Food(rect)
            | Entity::Inverter(rect) => rect.id = id,
            Entity::Snake(snake) => snake.id = id,
        }
        self.entities.push(entity);
        id
    }

    /// Restores the layering invariant: collectables above everything else,
    /// snakes above walls and crates. The sort is stable, so relative order
    /// within each rank (and therefore "topmost wins" resolution between
    /// same-rank entities) is preserved.
    pub fn sort_entities(&mut self) {
        self.entities.sort_by_key(Entity::sort_rank);
    }

    // ------------------------------------------------------------------
    // Player and win state
    // ------------------------------------------------------------------

    pub fn active_player(&self) -> Option<EntityId> {
        self.active_player
    }

    pub fn set_active_player(&mut self, player: Option<EntityId>) {
        self.active_player = player;
    }

    pub fn mode(&self) -> ActivityMode {
        self.mode
    }

    pub fn level_id(&self) -> &str {
        &self.level_id
    }

    pub fn level_session_id(&self) -> u64 {
        self.level_session_id
    }

    pub fn start_new_level_session(&mut self) {
        self.level_session_id += 1;
    }

    /// Whether the board currently contains any goal (food) at all.
    pub fn has_goal(&self) -> bool {
        self.entities.iter().any(|e| matches!(e, Entity::Food(_)))
    }

    /// A level with no goal is unwinnable by design, which keeps incomplete
    /// levels testable in the editor.
    pub fn check_level_won(&self) -> bool {
        self.level_has_goal && !self.has_goal()
    }

    pub fn won_level(&self) -> bool {
        self.won_level
    }

    // ------------------------------------------------------------------
    // History introspection (the stacks themselves are driven by
    // `crate::history`)
    // ------------------------------------------------------------------

    pub fn undo_count(&self) -> usize {
        self.undos.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redos.len()
    }
}

impl Default for GameSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_entities_layers_collectables_on_top() {
        let mut session = GameSession::new();
        let food = session.spawn_food(0, 0, CollisionLayer::WHITE);
        let snake = session.spawn_snake(
            vec![SnakeSegment::new(1, 0, CollisionLayer::WHITE)],
            None,
        );
        let krate = session.spawn_crate(2, 0, CollisionLayer::BOTH);
        let wall = session.spawn_wall(3, 0, CollisionLayer::BLACK);
        session.sort_entities();
        let order: Vec<EntityId> = session.entities().iter().map(Entity::id).collect();
        assert_eq!(order, vec![krate, wall, snake, food]);
    }

    #[test]
    fn removing_the_active_player_clears_it() {
        let mut session = GameSession::new();
        let snake = session.spawn_snake(
            vec![SnakeSegment::new(0, 0, CollisionLayer::WHITE)],
            None,
        );
        session.set_active_player(Some(snake));
        assert!(session.remove_entity(snake).is_some());
        assert_eq!(session.active_player(), None);
        assert!(session.remove_entity(snake).is_none());
    }

    #[test]
    fn entity_ids_are_never_reused() {
        let mut session = GameSession::new();
        let a = session.spawn_wall(0, 0, CollisionLayer::WHITE);
        session.remove_entity(a);
        let b = session.spawn_wall(0, 0, CollisionLayer::WHITE);
        assert_ne!(a, b);
    }

    #[test]
    fn win_requires_a_goal_to_have_existed() {
        let mut session = GameSession::new();
        assert!(!session.check_level_won());
        session.level_has_goal = true;
        assert!(session.check_level_won());
        session.spawn_food(0, 0, CollisionLayer::WHITE);
        assert!(!session.check_level_won());
    }
}
