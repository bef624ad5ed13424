//! Combat state machine for encounter lifecycle management.
//!
//! Tracks the lifecycle of encounters:
//! - NotStarted: waiting for combat to begin
//! - InCombat: active combat, accumulating data
//! - PostCombat: combat ended, grace period for trailing damage
//!
//! Transitions emit CombatStarted/CombatEnded signals. The inactivity
//! timeout and trailing-damage grace are configuration, not constants.

use chrono::NaiveDateTime;

use ossus_types::SegmenterConfig;

use crate::combat_log::CombatEvent;
use crate::encounter::EncounterState;
use crate::game_data::{effect_id, effect_type_id};
use crate::state::SessionCache;

use super::GameSignal;

/// Whether an event can open a combat on its own, without an explicit
/// EnterCombat marker (replayed snippets often lack one).
fn starts_combat(event: &CombatEvent) -> bool {
    event.effect.effect_id == effect_id::ENTERCOMBAT
        || (event.effect.effect_id == effect_id::DAMAGE && event.details.dmg_amount > 0)
        || (event.effect.effect_id == effect_id::HEAL && event.details.heal_amount > 0)
}

/// Advance the state machine with one event and emit lifecycle signals.
pub(crate) fn advance(
    event: CombatEvent,
    cache: &mut SessionCache,
    config: &SegmenterConfig,
) -> Vec<GameSignal> {
    let current_state = cache
        .current_encounter()
        .map(|e| e.state.clone())
        .unwrap_or_default();

    match current_state {
        EncounterState::NotStarted => handle_not_started(event, cache),
        EncounterState::InCombat => handle_in_combat(event, cache, config),
        EncounterState::PostCombat { exit_time } => {
            handle_post_combat(event, cache, config, exit_time)
        }
    }
}

fn handle_not_started(event: CombatEvent, cache: &mut SessionCache) -> Vec<GameSignal> {
    let mut signals = Vec::new();
    let timestamp = event.timestamp;

    if starts_combat(&event) {
        if let Some(enc) = cache.current_encounter_mut() {
            enc.state = EncounterState::InCombat;
            enc.enter_combat_time = Some(timestamp);
            enc.last_combat_activity_time = Some(timestamp);
            enc.track_event_entities(&event);
            enc.accumulate_data(&event);
            enc.push_event(event);

            signals.push(GameSignal::CombatStarted {
                timestamp,
                encounter_id: enc.id,
            });
        }
    } else {
        // Buffer pre-combat events for the upcoming encounter
        if let Some(enc) = cache.current_encounter_mut() {
            enc.track_event_entities(&event);
            enc.accumulate_data(&event);
            enc.push_event(event);
        }
    }

    signals
}

fn handle_in_combat(
    event: CombatEvent,
    cache: &mut SessionCache,
    config: &SegmenterConfig,
) -> Vec<GameSignal> {
    let mut signals = Vec::new();
    let timestamp = event.timestamp;
    let effect_id_value = event.effect.effect_id;
    let effect_type = event.effect.type_id;

    // Inactivity timeout: close at the last activity, not at this event
    if let Some(enc) = cache.current_encounter()
        && let Some(last_activity) = enc.last_combat_activity_time
    {
        let elapsed = timestamp.signed_duration_since(last_activity).num_seconds();
        if elapsed >= config.combat_timeout_secs {
            let encounter_id = enc.id;
            end_encounter(cache, last_activity, encounter_id, &mut signals);
            cache.push_new_encounter();
            // Re-process this event against the fresh encounter
            signals.extend(advance(event, cache, config));
            return signals;
        }
    }

    let all_players_dead = cache
        .current_encounter()
        .map(|e| e.all_players_dead)
        .unwrap_or(false);
    let all_hostiles_dead = cache
        .current_encounter()
        .map(|e| e.all_hostiles_dead())
        .unwrap_or(false);

    // Post-death revive immortality buff on the local player: they released
    // and are back at a medcenter. Boss fights are exempt; log buffering can
    // put this buff ahead of other players' death events.
    let local_player_revived = effect_type == effect_type_id::APPLYEFFECT
        && effect_id_value == effect_id::RECENTLY_REVIVED
        && cache.player_initialized
        && event.source_entity.log_id == cache.player.id;
    let is_boss_encounter = cache
        .current_encounter()
        .is_some_and(|e| e.active_boss.is_some() || e.npcs.values().any(|n| n.is_boss));
    let end_on_local_revive = local_player_revived && !is_boss_encounter;

    if effect_id_value == effect_id::ENTERCOMBAT {
        // EnterCombat only fires for the local player; mid-fight it means a
        // rejoin (battle rez), not a new pull
        if let Some(enc) = cache.current_encounter_mut() {
            enc.track_event_entities(&event);
            enc.accumulate_data(&event);
            enc.push_event(event);
        }
    } else if effect_id_value == effect_id::EXITCOMBAT
        || all_players_dead
        || all_hostiles_dead
        || end_on_local_revive
    {
        let encounter_id = cache.current_encounter().map(|e| e.id).unwrap_or(0);
        if let Some(enc) = cache.current_encounter_mut() {
            enc.push_event(event);
        }
        end_encounter(cache, timestamp, encounter_id, &mut signals);
    } else if effect_type == effect_type_id::AREAENTERED {
        // Area change is a hard boundary
        let encounter_id = cache.current_encounter().map(|e| e.id).unwrap_or(0);
        end_encounter(cache, timestamp, encounter_id, &mut signals);
        cache.push_new_encounter();
    } else {
        // Normal combat event
        if let Some(enc) = cache.current_encounter_mut() {
            enc.track_event_entities(&event);
            enc.accumulate_data(&event);
            if effect_id_value == effect_id::DAMAGE || effect_id_value == effect_id::HEAL {
                enc.last_combat_activity_time = Some(timestamp);
            }
            enc.push_event(event);
        }
    }

    signals
}

fn handle_post_combat(
    event: CombatEvent,
    cache: &mut SessionCache,
    config: &SegmenterConfig,
    exit_time: NaiveDateTime,
) -> Vec<GameSignal> {
    let mut signals = Vec::new();
    let timestamp = event.timestamp;

    if event.effect.effect_id == effect_id::DAMAGE {
        let elapsed = timestamp.signed_duration_since(exit_time).num_milliseconds();
        if elapsed <= config.post_combat_grace_ms {
            // Trailing damage belongs to the ending encounter
            if let Some(enc) = cache.current_encounter_mut() {
                enc.track_event_entities(&event);
                enc.accumulate_data(&event);
                enc.push_event(event);
            }
            return signals;
        }
        // Beyond the grace window: next encounter, which this damage opens
        cache.push_new_encounter();
        signals.extend(advance(event, cache, config));
    } else if starts_combat(&event) {
        cache.push_new_encounter();
        signals.extend(advance(event, cache, config));
    } else {
        // Non-damage event between pulls buffers into the next encounter
        cache.push_new_encounter();
        if let Some(enc) = cache.current_encounter_mut() {
            enc.track_event_entities(&event);
            enc.accumulate_data(&event);
            enc.push_event(event);
        }
    }

    signals
}

fn end_encounter(
    cache: &mut SessionCache,
    exit_time: NaiveDateTime,
    encounter_id: u64,
    signals: &mut Vec<GameSignal>,
) {
    if let Some(enc) = cache.current_encounter_mut() {
        enc.exit_combat_time = Some(exit_time);
        enc.state = EncounterState::PostCombat { exit_time };
    }

    tracing::debug!(encounter_id, %exit_time, "combat ended");

    signals.push(GameSignal::CombatEnded {
        timestamp: exit_time,
        encounter_id,
    });
}
