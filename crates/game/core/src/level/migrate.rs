//! Sequential save-format upgrades.
//!
//! Each step rewrites the raw JSON document from version N to N+1; typed
//! decoding only ever sees the current shape. Steps are applied one at a
//! time so a v1 file walks the whole chain.

use serde_json::{Value, json};

use crate::config::GameConfig;

use super::FormatError;

/// Parses a state document, verifies the format tag and version, and
/// upgrades it in place to the current version.
pub(crate) fn parse_and_upgrade(text: &str) -> Result<Value, FormatError> {
    let mut value: Value = serde_json::from_str(text)?;

    let format = value
        .get("format")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    if format != GameConfig::FORMAT_NAME {
        return Err(FormatError::UnknownFormat(format));
    }

    let mut version = value
        .get("formatVersion")
        .and_then(Value::as_u64)
        .map(|v| v as u32)
        .unwrap_or(0);
    if version > GameConfig::LEVEL_FORMAT_VERSION {
        return Err(FormatError::TooNew(version));
    }
    if version == 0 {
        return Err(FormatError::UnsupportedVersion(version));
    }

    while version < GameConfig::LEVEL_FORMAT_VERSION {
        match version {
            1 => upgrade_v1_segment_sizes(&mut value),
            2 => upgrade_v2_level_info(&mut value),
            3 => upgrade_v3_strip_time(&mut value),
            4 => upgrade_v4_rename_collectable(&mut value),
            5 => upgrade_v5_strip_junk_fields(&mut value),
            _ => return Err(FormatError::UnsupportedVersion(version)),
        }
        version += 1;
        tracing::debug!(version, "upgraded level document");
    }
    value["formatVersion"] = json!(GameConfig::LEVEL_FORMAT_VERSION);
    Ok(value)
}

fn entries(value: &mut Value) -> (Vec<&mut Value>, Vec<String>) {
    let types: Vec<String> = value
        .get("entityTypes")
        .and_then(Value::as_array)
        .map(|a| {
            a.iter()
                .map(|t| t.as_str().unwrap_or_default().to_string())
                .collect()
        })
        .unwrap_or_default();
    let records = value
        .get_mut("entities")
        .and_then(Value::as_array_mut)
        .map(|a| a.iter_mut().collect())
        .unwrap_or_default();
    (records, types)
}

/// v1 → v2: snake segments stored a single `size`; they now carry
/// `width`/`height`. Some v1 files were written after the data shape changed
/// but before the version bump, so segments that already have `width` are
/// left alone.
fn upgrade_v1_segment_sizes(value: &mut Value) {
    let (records, types) = entries(value);
    for (record, tag) in records.into_iter().zip(types) {
        if tag != "Snake" {
            continue;
        }
        let Some(segments) = record.get_mut("segments").and_then(Value::as_array_mut) else {
            continue;
        };
        for segment in segments {
            if segment.get("width").is_some() {
                continue;
            }
            let size = segment.get("size").cloned().unwrap_or(json!(1));
            segment["width"] = size.clone();
            segment["height"] = size;
        }
    }
}

/// v2 → v3: levels now store their size in `levelInfo`. The historical
/// default (not the configurable current default) is injected.
fn upgrade_v2_level_info(value: &mut Value) {
    value["levelInfo"] = json!({ "width": 16, "height": 16 });
}

/// v3 → v4: an internal animation-time field leaked into saves; drop it.
fn upgrade_v3_strip_time(value: &mut Value) {
    let (records, _) = entries(value);
    for record in records {
        if let Some(map) = record.as_object_mut() {
            map.remove("_time");
        }
    }
}

/// v4 → v5: the `Collectable` entity tag became `Food`.
fn upgrade_v4_rename_collectable(value: &mut Value) {
    if let Some(types) = value.get_mut("entityTypes").and_then(Value::as_array_mut) {
        for tag in types {
            if tag.as_str() == Some("Collectable") {
                *tag = json!("Food");
            }
        }
    }
}

/// v5 → v6: strip `_time` (leaked again) and the redundant `solid` flag from
/// collectable records.
fn upgrade_v5_strip_junk_fields(value: &mut Value) {
    let (records, types) = entries(value);
    for (record, tag) in records.into_iter().zip(types) {
        if tag != "Food" && tag != "Inverter" {
            continue;
        }
        if let Some(map) = record.as_object_mut() {
            map.remove("_time");
            map.remove("solid");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::{deserialize, parse_state};
    use crate::state::{EntityKind, GameSession};

    #[test]
    fn v1_segments_gain_width_and_height_from_size() {
        let text = r#"{
            "format": "snakeshift",
            "formatVersion": 1,
            "entities": [
                {"id": "abc", "segments": [{"x": 0, "y": 0, "size": 1, "layer": 1}], "growOnNextMove": false}
            ],
            "entityTypes": ["Snake"],
            "activePlayerEntityIndex": 0
        }"#;
        let mut session = GameSession::new();
        deserialize(&mut session, text).unwrap();
        let snake = session.snakes().next().unwrap();
        assert_eq!(snake.segments[0].width, 1);
        assert_eq!(snake.segments[0].height, 1);
        // v2→v3 kicked in along the way: the historical default size applies.
        assert_eq!(session.level_info.width, 16);
        assert_eq!(session.level_info.height, 16);
    }

    #[test]
    fn v1_segments_that_already_have_width_are_untouched() {
        let text = r#"{
            "format": "snakeshift",
            "formatVersion": 1,
            "entities": [
                {"id": "abc", "segments": [{"x": 2, "y": 0, "width": 1, "height": 1, "size": 9, "layer": 2}], "growOnNextMove": false}
            ],
            "entityTypes": ["Snake"],
            "activePlayerEntityIndex": -1
        }"#;
        let mut session = GameSession::new();
        deserialize(&mut session, text).unwrap();
        let snake = session.snakes().next().unwrap();
        assert_eq!(snake.segments[0].width, 1);
    }

    #[test]
    fn v4_collectable_tag_becomes_food() {
        let text = r#"{
            "format": "snakeshift",
            "formatVersion": 4,
            "levelInfo": {"width": 5, "height": 5},
            "entities": [{"x": 1, "y": 1, "width": 1, "height": 1, "layer": 1, "_time": 1234.5, "solid": false}],
            "entityTypes": ["Collectable"],
            "activePlayerEntityIndex": -1
        }"#;
        let parsed = parse_state(text).unwrap();
        assert_eq!(parsed.entities[0].0, EntityKind::Food);
        // The v5→v6 step also ran and dropped the junk fields.
        assert!(parsed.entities[0].1.get("_time").is_none());
        assert!(parsed.entities[0].1.get("solid").is_none());
    }

    #[test]
    fn current_version_documents_pass_through_unchanged() {
        let text = r#"{
            "format": "snakeshift",
            "formatVersion": 6,
            "levelInfo": {"width": 5, "height": 5},
            "entities": [],
            "entityTypes": [],
            "activePlayerEntityIndex": -1
        }"#;
        let parsed = parse_state(text).unwrap();
        assert!(parsed.entities.is_empty());
        assert_eq!(parsed.level_info.width, 5);
    }

    #[test]
    fn version_zero_is_unsupported() {
        let text = r#"{"format": "snakeshift", "formatVersion": 0, "entities": [], "entityTypes": [], "activePlayerEntityIndex": -1}"#;
        assert!(matches!(
            parse_state(text),
            Err(FormatError::UnsupportedVersion(0))
        ));
    }
}
