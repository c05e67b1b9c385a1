//! Undo/redo history and activity-mode switching.
//!
//! History is snapshot-based: [`undoable`] captures the full serialized
//! session before any state-mutating user action, and undo/redo step between
//! snapshots by deserializing. Edit mode and play mode each keep their own
//! stack pair; switching modes swaps them wholesale.

use crate::level;
use crate::state::{ActivityMode, EntityId, GameSession};

/// Captures the current state onto the undo stack and clears the redo stack.
/// Must be called exactly once before any state-mutating user action;
/// [`crate::action::take_move`] and the editor gestures do so themselves.
pub fn undoable(session: &mut GameSession) {
    let snapshot = level::serialize(session);
    session.undos.push(snapshot);
    session.redos.clear();
}

/// Steps one state backwards. Returns false when there is nothing to undo.
///
/// When the popped snapshot belongs to a different level than the current
/// state, the popped snapshot is the transient "level just won" state
/// captured at the moment of loading the next level; it is discarded and the
/// step repeats once, landing on the playable prior state instead.
pub fn undo(session: &mut GameSession) -> bool {
    step_history(session, true, true)
}

/// Steps one state forwards. Redo never skips over win states; the
/// asymmetry with [`undo`] is deliberate and pinned by tests.
pub fn redo(session: &mut GameSession) -> bool {
    step_history(session, false, false)
}

fn step_history(session: &mut GameSession, from_undos: bool, skip_over_win_state: bool) -> bool {
    let popped = if from_undos {
        session.undos.pop()
    } else {
        session.redos.pop()
    };
    let Some(state) = popped else {
        return false;
    };
    let old_state = level::serialize(session);
    if from_undos {
        session.redos.push(old_state.clone());
    } else {
        session.undos.push(old_state.clone());
    }
    if skip_over_win_state && level::level_id_of(&old_state) != level::level_id_of(&state) {
        tracing::debug!("skipping the win-state snapshot across a level boundary");
        // The popped snapshot is discarded. Recurse without the skip flag so
        // at most one snapshot is ever skipped per step.
        step_history(session, from_undos, false);
        return true;
    }
    level::deserialize(session, state.as_str()).expect("history snapshots always deserialize");
    true
}

/// Walks the history stacks until the undo depth equals `index`.
pub fn go_to_history_index(session: &mut GameSession, index: usize) {
    while session.undos.len() > index {
        if !step_history(session, true, false) {
            break;
        }
    }
    while session.undos.len() < index {
        if !step_history(session, false, false) {
            break;
        }
    }
}

/// Switches the session between menu, edit, play and replay.
///
/// In play mode the `undos`/`redos` pair holds the play history while the
/// editor's history is parked; entering edit mode restores the parked pair
/// and the stored base level state. Entering the menu drops everything.
pub fn set_activity_mode(session: &mut GameSession, new_mode: ActivityMode) {
    if session.mode == new_mode {
        return;
    }
    tracing::debug!(from = %session.mode, to = %new_mode, "switching activity mode");
    session.mode = new_mode;
    match new_mode {
        ActivityMode::Edit => {
            session.undos = session.editor_undos.clone();
            session.redos = session.editor_redos.clone();
            if let Some(state) = session.editor_state.clone() {
                level::deserialize(session, state.as_str())
                    .expect("stored editor state always deserializes");
            }
        }
        ActivityMode::Play | ActivityMode::Replay => {
            session.editor_undos = session.undos.clone();
            session.editor_redos = session.redos.clone();
            session.undos.clear();
            session.redos.clear();
            guess_default_active_player(session);
            store_base_level_state(session);
        }
        ActivityMode::Menu => {
            level::clear_level(session, false, false);
            session.undos.clear();
            session.redos.clear();
            session.editor_undos.clear();
            session.editor_redos.clear();
            session.editor_state = None;
            session.level_has_goal = false;
        }
    }
    session.won_level = false;
}

/// Records the current state as the level's designed initial state and
/// refreshes the cached goal flag.
pub fn store_base_level_state(session: &mut GameSession) {
    session.editor_state = Some(level::serialize(session));
    session.level_has_goal = session.has_goal();
    session.won_level = false;
}

/// Restores the stored base level state as an undoable action. In replay
/// mode this rewinds the history to the start instead.
pub fn restart_level(session: &mut GameSession) {
    if session.mode == ActivityMode::Replay {
        go_to_history_index(session, 0);
        return;
    }
    if session.mode != ActivityMode::Play {
        return;
    }
    let Some(state) = session.editor_state.clone() else {
        return;
    };
    undoable(session);
    level::deserialize(session, state.as_str()).expect("stored base state always deserializes");
    session.won_level = false;
    session.start_new_level_session();
}

/// Rotates control to the next (or previous) snake in draw order, as an
/// undoable action. Returns false when there is no snake to switch to.
pub fn cycle_player_control(session: &mut GameSession, reverse: bool) -> bool {
    let players: Vec<EntityId> = session.snakes().map(|s| s.id).collect();
    if players.is_empty() {
        return false;
    }
    // With no active player, -1 plus one step naturally selects the first.
    let index = session
        .active_player
        .and_then(|id| players.iter().position(|&p| p == id))
        .map(|i| i as i64)
        .unwrap_or(-1);
    let step = if reverse { -1 } else { 1 };
    let next = (index + step).rem_euclid(players.len() as i64) as usize;
    undoable(session);
    session.active_player = Some(players[next]);
    true
}

/// Ensures some snake is selected: prefers one that can move, falling back
/// to the first snake. Levels are ideally saved with an active player, but
/// many are not.
pub fn guess_default_active_player(session: &mut GameSession) {
    if session.active_player.is_some() {
        return;
    }
    let snakes: Vec<EntityId> = session.snakes().map(|s| s.id).collect();
    let chosen = snakes
        .iter()
        .copied()
        .find(|&id| crate::action::can_move(session, id))
        .or_else(|| snakes.first().copied());
    session.set_active_player(chosen);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{CollisionLayer, SnakeSegment};

    fn session_with_snake() -> (GameSession, EntityId) {
        let mut session = GameSession::new();
        let snake = session.spawn_snake(
            vec![SnakeSegment::new(0, 0, CollisionLayer::WHITE)],
            None,
        );
        session.set_active_player(Some(snake));
        (session, snake)
    }

    #[test]
    fn undoable_clears_redos() {
        let (mut session, _) = session_with_snake();
        undoable(&mut session);
        assert!(undo(&mut session));
        assert_eq!(session.redo_count(), 1);
        undoable(&mut session);
        assert_eq!(session.redo_count(), 0);
    }

    #[test]
    fn undo_and_redo_walk_the_same_states() {
        let (mut session, snake) = session_with_snake();
        let before = level::serialize(&session);
        undoable(&mut session);
        session
            .entity_mut(snake)
            .unwrap()
            .as_snake_mut()
            .unwrap()
            .segments[0]
            .x = 5;
        let after = level::serialize(&session);

        assert!(undo(&mut session));
        assert_eq!(level::serialize(&session), before);
        assert!(redo(&mut session));
        assert_eq!(level::serialize(&session), after);
        assert!(!redo(&mut session));
    }

    #[test]
    fn undo_skips_the_win_state_across_level_boundaries() {
        let (mut session, _) = session_with_snake();
        session.level_id = "level-1".to_string();
        let playable = level::serialize(&session);
        // The board as it looked the instant the level was won.
        undoable(&mut session);
        let won_state = level::serialize(&session);
        session.undos.push(won_state);
        // Then the next level loads.
        session.level_id = "level-2".to_string();

        assert!(undo(&mut session));
        // Both intermediate pops happened in one undo: we are back on the
        // playable level-1 state, not the momentary win snapshot.
        assert_eq!(session.level_id(), "level-1");
        assert_eq!(level::level_id_of(&playable), "level-1");
        assert_eq!(session.undo_count(), 0);
    }

    #[test]
    fn redo_never_auto_skips() {
        // The asymmetry with undo is intentional; this pins it.
        let (mut session, _) = session_with_snake();
        session.level_id = "level-1".to_string();
        let level1 = level::serialize(&session);
        session.level_id = "level-2".to_string();
        session.redos.push(level1);

        assert!(redo(&mut session));
        // A single redo crosses the boundary by exactly one state.
        assert_eq!(session.level_id(), "level-1");
        assert_eq!(session.undo_count(), 1);
    }

    #[test]
    fn go_to_history_index_moves_both_ways() {
        let (mut session, snake) = session_with_snake();
        for x in 1..=3 {
            undoable(&mut session);
            session
                .entity_mut(snake)
                .unwrap()
                .as_snake_mut()
                .unwrap()
                .segments[0]
                .x = x;
        }
        assert_eq!(session.undo_count(), 3);
        go_to_history_index(&mut session, 1);
        assert_eq!(session.undo_count(), 1);
        go_to_history_index(&mut session, 3);
        assert_eq!(session.undo_count(), 3);
        let head_x = session
            .snakes()
            .next()
            .unwrap()
            .segments[0]
            .x;
        assert_eq!(head_x, 3);
    }

    #[test]
    fn mode_switch_parks_and_restores_editor_history(){
        let (mut session, _) = session_with_snake();
        set_activity_mode(&mut session, ActivityMode::Edit);
        undoable(&mut session);
        assert_eq!(session.undo_count(), 1);
        // Base state must exist before play-testing restores anything.
        store_base_level_state(&mut session);

        set_activity_mode(&mut session, ActivityMode::Play);
        assert_eq!(session.undo_count(), 0, "play starts with fresh history");
        undoable(&mut session);
        undoable(&mut session);

        set_activity_mode(&mut session, ActivityMode::Edit);
        assert_eq!(session.undo_count(), 1, "editor history came back");
    }

    #[test]
    fn entering_menu_drops_everything() {
        let (mut session, _) = session_with_snake();
        set_activity_mode(&mut session, ActivityMode::Play);
        undoable(&mut session);
        set_activity_mode(&mut session, ActivityMode::Menu);
        assert_eq!(session.undo_count(), 0);
        assert!(session.entities().is_empty());
        assert!(!session.check_level_won());
    }

    #[test]
    fn restart_returns_to_the_base_state_undoably() {
        let (mut session, snake) = session_with_snake();
        set_activity_mode(&mut session, ActivityMode::Play);
        // Compare through the save form: restarting starts a new level
        // session, so the transient session id is expected to differ.
        let base = level::serialize_for_save(&session);
        undoable(&mut session);
        session
            .entity_mut(snake)
            .unwrap()
            .as_snake_mut()
            .unwrap()
            .segments[0]
            .x = 7;

        restart_level(&mut session);
        assert_eq!(level::serialize_for_save(&session), base);
        assert!(undo(&mut session), "restart itself is undoable");
    }

    #[test]
    fn cycle_player_control_wraps_in_both_directions() {
        let mut session = GameSession::new();
        let a = session.spawn_snake(vec![SnakeSegment::new(0, 0, CollisionLayer::WHITE)], None);
        let b = session.spawn_snake(vec![SnakeSegment::new(2, 0, CollisionLayer::BLACK)], None);
        assert!(cycle_player_control(&mut session, false));
        assert_eq!(session.active_player(), Some(a));
        assert!(cycle_player_control(&mut session, false));
        assert_eq!(session.active_player(), Some(b));
        assert!(cycle_player_control(&mut session, false));
        assert_eq!(session.active_player(), Some(a));
        assert!(cycle_player_control(&mut session, true));
        assert_eq!(session.active_player(), Some(b));
    }

    #[test]
    fn guessing_prefers_a_snake_that_can_move() {
        let mut session = GameSession::new();
        session.level_info = crate::state::LevelInfo::new(3, 1);
        // Boxed in by white walls on a white layer: cannot move.
        session.spawn_wall(1, 0, CollisionLayer::WHITE);
        let stuck = session.spawn_snake(vec![SnakeSegment::new(0, 0, CollisionLayer::WHITE)], None);
        let free = session.spawn_snake(vec![SnakeSegment::new(2, 0, CollisionLayer::BLACK)], None);
        guess_default_active_player(&mut session);
        assert_eq!(session.active_player(), Some(free));
        let _ = stuck;
    }
}
