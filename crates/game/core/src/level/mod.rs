//! Versioned level serialization.
//!
//! The wire format is the historical JSON document: a `format` tag, a
//! strictly increasing `formatVersion`, parallel `entities`/`entityTypes`
//! arrays, and the active player recorded by draw-order index. Writers
//! always emit the current version; readers accept anything older and
//! upgrade it one version at a time (see [`migrate`]).

pub(crate) mod migrate;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::GameConfig;
use crate::history;
use crate::state::{
    ActivityMode, CollisionLayer, Entity, EntityKind, GameSession, LevelInfo, RectEntity, Snake,
    SnakeSegment, SnakeUid,
};

/// A serialized session state: the unit stored on the history stacks and
/// written to level files.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snapshot(String);

impl Snapshot {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<String> for Snapshot {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Errors surfaced while reading level or playthrough documents. The session
/// is never left partially mutated: decoding completes before any commit,
/// and [`load_level_from_text`] restores the prior state on failure.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("unrecognized format {0:?}")]
    UnknownFormat(String),
    #[error("format version {0} is too new")]
    TooNew(u32),
    #[error("unsupported format version {0}")]
    UnsupportedVersion(u32),
    #[error("unknown entity type {0:?}")]
    UnknownEntityType(String),
    #[error("entity list and type list lengths differ: {entities} vs {types}")]
    MismatchedEntityTypes { entities: usize, types: usize },
    #[error("snake has no segments")]
    EmptySnake,
    #[error("playthrough delta references unknown entity {0:?}")]
    UnknownDeltaKey(String),
    #[error("playthrough contains no states")]
    EmptyPlaythrough,
    #[error("malformed level data: {0}")]
    Json(#[from] serde_json::Error),
}

/// The document shape, after migration to the current version.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LevelFile {
    pub format: String,
    pub format_version: u32,
    pub level_info: LevelInfo,
    pub entities: Vec<Value>,
    pub entity_types: Vec<String>,
    pub active_player_entity_index: i64,
    #[serde(default)]
    pub level_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level_session_id: Option<u64>,
}

/// A parsed, migrated state document with typed tags: the structural form
/// used for commit, playthrough diffing, and semantic state comparison.
#[derive(Clone, Debug, PartialEq)]
pub struct ParsedState {
    pub level_info: LevelInfo,
    pub entities: Vec<(EntityKind, Value)>,
    pub active_player_entity_index: i64,
    pub level_id: String,
    pub level_session_id: Option<u64>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RectRecord {
    x: i32,
    y: i32,
    width: i32,
    height: i32,
    layer: CollisionLayer,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SnakeRecord {
    #[serde(default)]
    id: Option<String>,
    segments: Vec<SnakeSegment>,
    #[serde(default)]
    grow_on_next_move: bool,
}

// ----------------------------------------------------------------------
// Writing
// ----------------------------------------------------------------------

/// Serializes the session for the history stacks (includes the level
/// session id, so playthrough recording can tell sessions apart).
pub fn serialize(session: &GameSession) -> Snapshot {
    snapshot(session, false)
}

/// Serializes the session for a level file (no transient session id).
pub fn serialize_for_save(session: &GameSession) -> Snapshot {
    snapshot(session, true)
}

fn snapshot(session: &GameSession, for_save: bool) -> Snapshot {
    let mut entities = Vec::with_capacity(session.entities().len());
    let mut entity_types = Vec::with_capacity(session.entities().len());
    for entity in session.entities() {
        entity_types.push(entity.kind().as_ref().to_string());
        entities.push(entity_to_value(entity));
    }
    let active_player_entity_index = session
        .active_player()
        .and_then(|id| session.index_of(id))
        .map(|index| index as i64)
        .unwrap_or(-1);
    let file = LevelFile {
        format: GameConfig::FORMAT_NAME.to_string(),
        format_version: GameConfig::LEVEL_FORMAT_VERSION,
        level_info: session.level_info,
        entities,
        entity_types,
        active_player_entity_index,
        level_id: session.level_id().to_string(),
        level_session_id: (!for_save).then_some(session.level_session_id()),
    };
    let json = serde_json::to_string_pretty(&file).expect("session state is always serializable");
    Snapshot(json + "\n")
}

fn entity_to_value(entity: &Entity) -> Value {
    match entity {
        Entity::Wall(rect) | Entity::Crate(rect) => {
            let mut value = rect_to_value(rect);
            // Historical quirk: solid walls and crates persist their (always
            // true) solid flag; collectables stopped doing so in v6.
            value["solid"] = Value::Bool(true);
            value
        }
        Entity::Food(rect) | Entity::Inverter(rect) => rect_to_value(rect),
        Entity::Snake(snake) => serde_json::to_value(SnakeRecord {
            id: Some(snake.uid.as_str().to_string()),
            segments: snake.segments.clone(),
            grow_on_next_move: snake.grow_on_next_move,
        })
        .expect("snake record is always serializable"),
    }
}

fn rect_to_value(rect: &RectEntity) -> Value {
    serde_json::to_value(RectRecord {
        x: rect.x,
        y: rect.y,
        width: rect.width,
        height: rect.height,
        layer: rect.layer,
    })
    .expect("rect record is always serializable")
}

// ----------------------------------------------------------------------
// Reading
// ----------------------------------------------------------------------

/// Parses and migrates a state document without touching any session.
pub fn parse_state(text: &str) -> Result<ParsedState, FormatError> {
    let value = migrate::parse_and_upgrade(text)?;
    let file: LevelFile = serde_json::from_value(value)?;
    if file.entities.len() != file.entity_types.len() {
        return Err(FormatError::MismatchedEntityTypes {
            entities: file.entities.len(),
            types: file.entity_types.len(),
        });
    }
    let mut entities = Vec::with_capacity(file.entities.len());
    for (record, tag) in file.entities.into_iter().zip(file.entity_types) {
        let kind: EntityKind = tag
            .parse()
            .map_err(|_| FormatError::UnknownEntityType(tag.clone()))?;
        entities.push((kind, record));
    }
    Ok(ParsedState {
        level_info: file.level_info,
        entities,
        active_player_entity_index: file.active_player_entity_index,
        level_id: file.level_id,
        level_session_id: file.level_session_id,
    })
}

/// Replaces the session's board with the given document.
///
/// The complete new entity list is built before anything is committed, so a
/// malformed document leaves the session exactly as it was. History stacks
/// are not touched; undo/redo step through this same function.
pub fn deserialize(session: &mut GameSession, text: &str) -> Result<(), FormatError> {
    let parsed = parse_state(text)?;
    commit_state(session, parsed)
}

pub(crate) fn commit_state(
    session: &mut GameSession,
    parsed: ParsedState,
) -> Result<(), FormatError> {
    let mut next_id = session.next_entity_id;
    let mut entities = Vec::with_capacity(parsed.entities.len());
    for (kind, record) in &parsed.entities {
        entities.push(entity_from_record(*kind, record, &mut next_id)?);
    }

    let active_player = usize::try_from(parsed.active_player_entity_index)
        .ok()
        .and_then(|index| entities.get(index))
        .and_then(|entity: &Entity| entity.as_snake().map(|s| s.id));

    session.entities = entities;
    session.level_info = parsed.level_info;
    session.active_player = active_player;
    session.next_entity_id = next_id;
    session.level_id = parsed.level_id;
    if let Some(id) = parsed.level_session_id {
        session.level_session_id = id;
    }
    Ok(())
}

fn entity_from_record(
    kind: EntityKind,
    record: &Value,
    next_id: &mut u64,
) -> Result<Entity, FormatError> {
    let id = crate::state::EntityId(*next_id);
    *next_id += 1;
    let entity = match kind {
        EntityKind::Block | EntityKind::Crate | EntityKind::Food | EntityKind::Inverter => {
            let rect: RectRecord = serde_json::from_value(record.clone())?;
            let rect = RectEntity {
                id,
                x: rect.x,
                y: rect.y,
                width: rect.width,
                height: rect.height,
                layer: rect.layer,
            };
            match kind {
                EntityKind::Block => Entity::Wall(rect),
                EntityKind::Crate => Entity::Crate(rect),
                EntityKind::Food => Entity::Food(rect),
                EntityKind::Inverter => Entity::Inverter(rect),
                EntityKind::Snake => unreachable!(),
            }
        }
        EntityKind::Snake => {
            let snake: SnakeRecord = serde_json::from_value(record.clone())?;
            if snake.segments.is_empty() {
                return Err(FormatError::EmptySnake);
            }
            let uid = snake
                .id
                .map(SnakeUid::from)
                .unwrap_or_else(|| SnakeUid::random(&mut rand::thread_rng()));
            let mut built = Snake::new(id, uid, snake.segments);
            built.grow_on_next_move = snake.grow_on_next_move;
            Entity::Snake(built)
        }
    };
    Ok(entity)
}

/// Renders a parsed state back into a current-version document. Used by the
/// playthrough reader to feed reconstructed states through [`deserialize`].
pub(crate) fn state_to_document(parsed: &ParsedState) -> String {
    let file = LevelFile {
        format: GameConfig::FORMAT_NAME.to_string(),
        format_version: GameConfig::LEVEL_FORMAT_VERSION,
        level_info: parsed.level_info,
        entities: parsed.entities.iter().map(|(_, v)| v.clone()).collect(),
        entity_types: parsed
            .entities
            .iter()
            .map(|(k, _)| k.as_ref().to_string())
            .collect(),
        active_player_entity_index: parsed.active_player_entity_index,
        level_id: parsed.level_id.clone(),
        level_session_id: parsed.level_session_id,
    };
    serde_json::to_string_pretty(&file).expect("parsed state is always serializable") + "\n"
}

/// The `levelId` recorded in a snapshot; used by the history manager to
/// detect level boundaries without a full decode.
pub(crate) fn level_id_of(snapshot: &Snapshot) -> String {
    serde_json::from_str::<Value>(snapshot.as_str())
        .ok()
        .and_then(|value| {
            value
                .get("levelId")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_default()
}

// ----------------------------------------------------------------------
// Level lifecycle
// ----------------------------------------------------------------------

/// Loads a level (or recorded playthrough) from file text, switching into
/// `new_mode` on success. On any failure the previous board, history stacks
/// and session id are restored before the error is returned.
pub fn load_level_from_text(
    session: &mut GameSession,
    text: &str,
    new_mode: ActivityMode,
) -> Result<(), FormatError> {
    let before_state = serialize(session);
    let before_undos = session.undos.clone();
    let before_redos = session.redos.clone();
    let before_session_id = session.level_session_id;

    // Undoing across levels is allowed, but loading into the editor or from
    // a menu must not leave an extraneous undo state behind.
    if session.mode() == ActivityMode::Play && new_mode == ActivityMode::Play {
        history::undoable(session);
    }

    let result = if crate::playthrough::is_playthrough(text) {
        crate::playthrough::load_playthrough(session, text)
    } else {
        session.start_new_level_session();
        deserialize(session, text).map(|()| {
            history::guess_default_active_player(session);
            history::store_base_level_state(session);
            history::set_activity_mode(session, new_mode);
        })
    };

    if let Err(error) = result {
        tracing::warn!("level load failed, restoring previous state: {error}");
        deserialize(session, before_state.as_str())
            .expect("pre-load snapshot must deserialize");
        session.undos = before_undos;
        session.redos = before_redos;
        session.level_session_id = before_session_id;
        return Err(error);
    }
    Ok(())
}

/// Empties the board, optionally as an undoable action and optionally
/// resetting the level to its default size.
pub fn clear_level(session: &mut GameSession, should_be_undoable: bool, reset_size: bool) {
    if should_be_undoable {
        history::undoable(session);
    }
    session.entities.clear();
    if reset_size {
        session.level_info = LevelInfo::default();
    }
    session.active_player = None;
}

/// Advisory count of entities and snake segments outside the level bounds.
/// Saving is never blocked; callers decide whether to prune first.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OutOfBoundsReport {
    pub entities: usize,
    pub snake_segments: usize,
}

impl OutOfBoundsReport {
    pub fn is_empty(&self) -> bool {
        self.entities == 0 && self.snake_segments == 0
    }
}

/// The save-dialog entry point: the level JSON plus the advisory
/// out-of-bounds report the caller may want to confirm before writing.
pub fn save_level(session: &GameSession) -> (Snapshot, OutOfBoundsReport) {
    (serialize_for_save(session), out_of_bounds_report(session))
}

pub fn out_of_bounds_report(session: &GameSession) -> OutOfBoundsReport {
    let mut report = OutOfBoundsReport::default();
    for entity in session.entities() {
        match entity {
            Entity::Snake(snake) => {
                report.snake_segments += snake
                    .segments
                    .iter()
                    .filter(|segment| !session.level_info.contains(&segment.tile()))
                    .count();
            }
            other => {
                let rect = other.as_rect().expect("non-snake entities are rectangular");
                if !session.level_info.contains(&rect.tile()) {
                    report.entities += 1;
                }
            }
        }
    }
    report
}
