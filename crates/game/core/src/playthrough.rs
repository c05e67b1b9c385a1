//! Playthrough recording: a base state plus structural diffs.
//!
//! The current format stores the first state of a level session verbatim and
//! every subsequent state as a [`StateDelta`]. Entities are diffed by a
//! stable key (the snake's persistent id where one exists, the draw-order
//! index otherwise), with changed records stored wholesale and the full key
//! order kept so draw-order shuffles survive reconstruction. The legacy
//! format, a bare JSON array of complete state documents, is still read.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::GameConfig;
use crate::history;
use crate::level::{self, FormatError, ParsedState};
use crate::state::{ActivityMode, EntityKind, GameSession, LevelInfo};

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaythroughFile {
    format: String,
    format_version: u32,
    base_state: Value,
    deltas: Vec<StateDelta>,
}

/// Structural difference between two consecutive parsed states. Absent
/// fields are unchanged.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateDelta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    level_info: Option<LevelInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    entities: Option<EntitiesDelta>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    active_player_entity_index: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    level_id: Option<String>,
}

impl StateDelta {
    fn is_empty(&self) -> bool {
        self.level_info.is_none()
            && self.entities.is_none()
            && self.active_player_entity_index.is_none()
            && self.level_id.is_none()
    }
}

/// Entity-list diff: the complete key order after the change, plus the
/// records that were added or modified. Keys missing from `order` are
/// removals; keys without a record are carried over from the prior state.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EntitiesDelta {
    order: Vec<String>,
    records: BTreeMap<String, EntityEntry>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EntityEntry {
    kind: EntityKind,
    data: Value,
}

/// Stable diff key for one entity record: the persistent id when the record
/// carries one, otherwise the draw-order index.
fn entity_key(index: usize, record: &Value) -> String {
    record
        .get("id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("$$index:{index}"))
}

fn keyed_entities(state: &ParsedState) -> Vec<(String, EntityEntry)> {
    state
        .entities
        .iter()
        .enumerate()
        .map(|(index, (kind, data))| {
            (
                entity_key(index, data),
                EntityEntry {
                    kind: *kind,
                    data: data.clone(),
                },
            )
        })
        .collect()
}

/// Computes the delta from `prev` to `next`.
pub fn diff_states(prev: &ParsedState, next: &ParsedState) -> StateDelta {
    let mut delta = StateDelta::default();
    if prev.level_info != next.level_info {
        delta.level_info = Some(next.level_info);
    }
    if prev.active_player_entity_index != next.active_player_entity_index {
        delta.active_player_entity_index = Some(next.active_player_entity_index);
    }
    if prev.level_id != next.level_id {
        delta.level_id = Some(next.level_id.clone());
    }

    let prev_entities = keyed_entities(prev);
    let next_entities = keyed_entities(next);
    let unchanged = prev_entities.len() == next_entities.len()
        && prev_entities
            .iter()
            .zip(&next_entities)
            .all(|(a, b)| a == b);
    if !unchanged {
        let prev_map: BTreeMap<&String, &EntityEntry> =
            prev_entities.iter().map(|(k, e)| (k, e)).collect();
        let mut records = BTreeMap::new();
        for (key, entry) in &next_entities {
            if prev_map.get(key) != Some(&entry) {
                records.insert(key.clone(), entry.clone());
            }
        }
        delta.entities = Some(EntitiesDelta {
            order: next_entities.iter().map(|(k, _)| k.clone()).collect(),
            records,
        });
    }
    delta
}

/// Applies a delta on top of `prev`, reconstructing the following state.
pub fn apply_delta(prev: &ParsedState, delta: &StateDelta) -> Result<ParsedState, FormatError> {
    let mut next = prev.clone();
    if let Some(level_info) = delta.level_info {
        next.level_info = level_info;
    }
    if let Some(index) = delta.active_player_entity_index {
        next.active_player_entity_index = index;
    }
    if let Some(level_id) = &delta.level_id {
        next.level_id = level_id.clone();
    }
    if let Some(entities_delta) = &delta.entities {
        let prev_map: BTreeMap<String, EntityEntry> = keyed_entities(prev).into_iter().collect();
        let mut entities = Vec::with_capacity(entities_delta.order.len());
        for key in &entities_delta.order {
            let entry = entities_delta
                .records
                .get(key)
                .or_else(|| prev_map.get(key))
                .ok_or_else(|| FormatError::UnknownDeltaKey(key.clone()))?;
            entities.push((entry.kind, entry.data.clone()));
        }
        next.entities = entities;
    }
    Ok(next)
}

/// Detection heuristic over the document head, as the game has always done:
/// legacy playthroughs are arrays whose first embedded state names the
/// format; current ones carry their own tag.
pub fn is_playthrough(text: &str) -> bool {
    let head: String = text.chars().take(1000).collect();
    let trimmed = head.trim_start();
    (trimmed.starts_with('[') && head.contains(GameConfig::FORMAT_NAME))
        || (trimmed.starts_with('{')
            && head.contains(&format!("\"{}\"", GameConfig::PLAYTHROUGH_FORMAT_NAME)))
}

/// Serializes the current level session's history as a playthrough.
///
/// In replay mode the redo side is included too, so re-saving a replay
/// round-trips the whole recording; in play mode only the path taken so far
/// is stored. States from other level sessions (undo reaches across level
/// boundaries) are filtered out.
pub fn serialize_playthrough(session: &GameSession) -> String {
    let mut snapshots = session.undos.clone();
    snapshots.push(level::serialize(session));
    if session.mode() == ActivityMode::Replay {
        snapshots.extend(session.redos.iter().rev().cloned());
    }
    let mut states: Vec<ParsedState> = snapshots
        .iter()
        .map(|s| level::parse_state(s.as_str()).expect("history snapshots always parse"))
        .filter(|s| s.level_session_id == Some(session.level_session_id()))
        .collect();
    for state in &mut states {
        state.level_session_id = None;
    }

    let mut deltas = Vec::new();
    for pair in states.windows(2) {
        deltas.push(diff_states(&pair[0], &pair[1]));
    }
    let base_state = states
        .first()
        .map(|s| {
            serde_json::from_str::<Value>(&level::state_to_document(s))
                .expect("documents re-parse")
        })
        .unwrap_or(Value::Null);
    let file = PlaythroughFile {
        format: GameConfig::PLAYTHROUGH_FORMAT_NAME.to_string(),
        format_version: GameConfig::PLAYTHROUGH_FORMAT_VERSION,
        base_state,
        deltas,
    };
    serde_json::to_string(&file).expect("playthrough is always serializable")
}

/// Expands a playthrough document (either format) into the full sequence of
/// state documents it records.
pub fn parse_playthrough(text: &str) -> Result<Vec<String>, FormatError> {
    let trimmed = text.trim_start();
    if trimmed.starts_with('[') {
        // Legacy format: a JSON array of complete state documents.
        let states: Vec<String> = serde_json::from_str(text)?;
        if states.is_empty() {
            return Err(FormatError::EmptyPlaythrough);
        }
        return Ok(states);
    }

    let file: PlaythroughFile = serde_json::from_str(text)?;
    if file.format != GameConfig::PLAYTHROUGH_FORMAT_NAME {
        return Err(FormatError::UnknownFormat(file.format));
    }
    if file.format_version > GameConfig::PLAYTHROUGH_FORMAT_VERSION {
        return Err(FormatError::TooNew(file.format_version));
    }

    let base_text = serde_json::to_string(&file.base_state)?;
    // Old base states migrate here, so deltas never apply across versions.
    let mut state = level::parse_state(&base_text)?;
    let mut documents = vec![level::state_to_document(&state)];
    for delta in &file.deltas {
        state = apply_delta(&state, delta)?;
        documents.push(level::state_to_document(&state));
    }
    Ok(documents)
}

/// Loads a playthrough for replaying: the first state becomes the board and
/// every recorded state is queued on the redo stack.
pub(crate) fn load_playthrough(
    session: &mut GameSession,
    text: &str,
) -> Result<(), FormatError> {
    let states = parse_playthrough(text)?;
    let first = states.first().ok_or(FormatError::EmptyPlaythrough)?;
    tracing::debug!(steps = states.len(), "loading playthrough");

    session.redos.clear();
    level::load_level_from_text(session, first, ActivityMode::Replay)?;
    for state in states.iter().rev() {
        level::deserialize(session, state)?;
        let snapshot = level::serialize(session);
        session.redos.push(snapshot);
    }
    history::redo(session);
    session.undos.clear();
    Ok(())
}
