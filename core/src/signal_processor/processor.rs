//! Routes decoded events into session state and emits game signals.

use chrono::NaiveDateTime;

use ossus_types::{PhaseDefinition, SegmenterConfig};

use crate::combat_log::{CombatEvent, EffectKind, Entity, EntityType};
use crate::context::resolve;
use crate::encounter::ActiveBoss;
use crate::encounter::entity_info::PlayerInfo;
use crate::game_data::{effect_id, is_boss};
use crate::state::SessionCache;

use super::{GameSignal, combat_state};

/// Processes combat events, routes them to encounters, and emits signals.
/// This is the single driver of all incremental state updates: events must
/// arrive in non-decreasing timestamp order (rectify historical batches
/// first).
pub struct EventProcessor {
    config: SegmenterConfig,
}

impl Default for EventProcessor {
    fn default() -> Self {
        Self::new(SegmenterConfig::default())
    }
}

impl EventProcessor {
    pub fn new(config: SegmenterConfig) -> Self {
        Self { config }
    }

    /// Process one event: update the state builder, route the event through
    /// the combat state machine, and return the emitted signals.
    pub fn process_event(
        &mut self,
        event: CombatEvent,
        cache: &mut SessionCache,
    ) -> Vec<GameSignal> {
        let mut signals = Vec::new();

        // State-builder update: canonical registry + snapshot timelines
        cache.record_event(&event);

        match event.effect.kind() {
            EffectKind::DisciplineChanged => {
                self.handle_discipline_changed(&event, cache, &mut signals);
            }
            EffectKind::AreaEntered => {
                let area = crate::state::info::AreaInfo {
                    area_name: resolve(event.effect.effect_name).to_string(),
                    area_id: event.effect.effect_id,
                    difficulty_id: event.effect.difficulty_id,
                    difficulty_name: resolve(event.effect.difficulty_name).to_string(),
                    ..Default::default()
                };
                cache.enter_area(area.clone(), event.timestamp);
                signals.push(GameSignal::AreaEntered {
                    area_id: area.area_id,
                    area_name: area.area_name,
                    difficulty_id: area.difficulty_id,
                    difficulty_name: area.difficulty_name,
                    timestamp: event.timestamp,
                });
            }
            EffectKind::TargetChanged => {
                if event.effect.effect_id == effect_id::TARGETSET {
                    if let Some(enc) = cache.current_encounter_mut() {
                        enc.set_entity_target(
                            event.source_entity.log_id,
                            event.target_entity.log_id,
                        );
                    }
                    signals.push(GameSignal::TargetChanged {
                        source_id: event.source_entity.log_id,
                        target_id: event.target_entity.log_id,
                        target_name: event.target_entity.name,
                        target_entity_type: event.target_entity.entity_type,
                        timestamp: event.timestamp,
                    });
                } else {
                    if let Some(enc) = cache.current_encounter_mut() {
                        enc.clear_entity_target(event.source_entity.log_id);
                    }
                    signals.push(GameSignal::TargetCleared {
                        source_id: event.source_entity.log_id,
                        timestamp: event.timestamp,
                    });
                }
            }
            EffectKind::Event => {
                if event.effect.effect_id == effect_id::DEATH {
                    if let Some(enc) = cache.current_encounter_mut() {
                        enc.set_entity_death(
                            event.target_entity.log_id,
                            event.target_entity.entity_type,
                            event.timestamp,
                        );
                        enc.check_all_players_dead();
                    }
                    signals.push(GameSignal::EntityDeath {
                        entity_id: event.target_entity.log_id,
                        entity_type: event.target_entity.entity_type,
                        entity_name: event.target_entity.name,
                        timestamp: event.timestamp,
                    });
                } else if event.effect.effect_id == effect_id::REVIVED {
                    if let Some(enc) = cache.current_encounter_mut() {
                        enc.set_entity_alive(
                            event.source_entity.log_id,
                            event.source_entity.entity_type,
                        );
                        enc.check_all_players_dead();
                    }
                    signals.push(GameSignal::EntityRevived {
                        entity_id: event.source_entity.log_id,
                        entity_type: event.source_entity.entity_type,
                        timestamp: event.timestamp,
                    });
                }
            }
            EffectKind::Apply | EffectKind::AbsorbShield => {
                if event.target_entity.entity_type != EntityType::Empty
                    && let Some(enc) = cache.current_encounter_mut()
                {
                    enc.apply_effect(&event);
                }
            }
            EffectKind::Remove => {
                if event.source_entity.entity_type != EntityType::Empty
                    && let Some(enc) = cache.current_encounter_mut()
                {
                    enc.remove_effect(&event);
                }
            }
            EffectKind::Spend
            | EffectKind::Restore
            | EffectKind::ModifyCharges
            | EffectKind::ModifyThreat
            | EffectKind::Unknown => {}
        }

        // Boss HP and phase thresholds, against the stored health from the
        // previous sighting
        self.check_boss_hp(&event, cache, &mut signals);

        let source = event.source_entity.clone();
        let target = event.target_entity.clone();
        let timestamp = event.timestamp;

        // Route through the combat state machine (consumes the event)
        signals.extend(combat_state::advance(event, cache, &self.config));

        // Boss detection once the encounter is live and the NPC is tracked
        self.detect_boss(&source, timestamp, cache, &mut signals);
        self.detect_boss(&target, timestamp, cache, &mut signals);

        signals
    }

    fn handle_discipline_changed(
        &self,
        event: &CombatEvent,
        cache: &mut SessionCache,
        signals: &mut Vec<GameSignal>,
    ) {
        let entity_id = event.source_entity.log_id;

        // The first DisciplineChanged in a file describes the local player
        if !cache.player_initialized {
            cache.player.id = entity_id;
            cache.player.name = event.source_entity.name;
            cache.player_initialized = true;
            signals.push(GameSignal::PlayerInitialized {
                entity_id,
                timestamp: event.timestamp,
            });
        }

        let info = PlayerInfo {
            id: entity_id,
            name: event.source_entity.name,
            class_id: event.effect.effect_id,
            class_name: resolve(event.effect.effect_name).to_string(),
            discipline_id: event.effect.discipline_id,
            discipline_name: resolve(event.effect.discipline_name).to_string(),
            ..Default::default()
        };

        if cache.player.id == entity_id {
            cache.player.class_id = info.class_id;
            cache.player.class_name = info.class_name.clone();
            cache.player.discipline_id = info.discipline_id;
            cache.player.discipline_name = info.discipline_name.clone();
        }

        cache.player_disciplines.insert(entity_id, info.clone());
        if let Some(enc) = cache.current_encounter_mut() {
            enc.players
                .entry(entity_id)
                .and_modify(|p| {
                    p.class_id = info.class_id;
                    p.class_name = info.class_name.clone();
                    p.discipline_id = info.discipline_id;
                    p.discipline_name = info.discipline_name.clone();
                })
                .or_insert(info);
        }

        if event.effect.discipline_id != 0 {
            signals.push(GameSignal::DisciplineChanged {
                entity_id,
                discipline_id: event.effect.discipline_id,
                timestamp: event.timestamp,
            });
        }
    }

    fn detect_boss(
        &self,
        entity: &Entity,
        timestamp: NaiveDateTime,
        cache: &mut SessionCache,
        signals: &mut Vec<GameSignal>,
    ) {
        if entity.entity_type != EntityType::Npc || !is_boss(entity.class_id) {
            return;
        }

        let definition = cache.find_boss_definition(entity.class_id);
        let display_name = definition.map(|d| d.name.clone());
        let phases: Vec<PhaseDefinition> =
            definition.map(|d| d.phases.clone()).unwrap_or_default();

        let Some(enc) = cache.current_encounter_mut() else {
            return;
        };
        if !enc.is_active() || enc.active_boss.is_some() {
            return;
        }

        enc.active_boss = Some(ActiveBoss {
            name: entity.name,
            entity_id: entity.log_id,
            class_id: entity.class_id,
        });
        let boss_name = display_name.unwrap_or_else(|| resolve(entity.name).to_string());
        tracing::info!(boss = %boss_name, entity_id = entity.log_id, "boss encounter detected");

        signals.push(GameSignal::BossEncounterDetected {
            boss_name: boss_name.clone(),
            entity_id: entity.log_id,
            npc_id: entity.class_id,
            timestamp,
        });

        if let Some(phase) = phases.iter().find(|p| p.on_combat_start) {
            let old_phase = enc.current_phase.take();
            enc.current_phase = Some(phase.id.clone());
            enc.phase_started_at = Some(timestamp);
            signals.push(GameSignal::PhaseChanged {
                boss_name,
                old_phase,
                new_phase: phase.id.clone(),
                timestamp,
            });
        }
    }

    fn check_boss_hp(
        &self,
        event: &CombatEvent,
        cache: &mut SessionCache,
        signals: &mut Vec<GameSignal>,
    ) {
        let Some(boss) = cache.current_encounter().and_then(|e| e.active_boss.clone()) else {
            return;
        };
        let phases: Vec<PhaseDefinition> = cache
            .find_boss_definition(boss.class_id)
            .map(|d| d.phases.clone())
            .unwrap_or_default();

        for entity in [&event.source_entity, &event.target_entity] {
            if entity.log_id != boss.entity_id || entity.health.1 <= 0 {
                continue;
            }
            let Some(enc) = cache.current_encounter_mut() else {
                return;
            };
            let Some(npc) = enc.npcs.get(&boss.entity_id) else {
                continue;
            };
            let old_pct = npc.hp_percent();
            let new_pct = (entity.health.0 as f32 / entity.health.1 as f32) * 100.0;
            if (old_pct - new_pct).abs() <= 0.01 {
                continue;
            }

            signals.push(GameSignal::BossHpChanged {
                entity_id: boss.entity_id,
                npc_id: boss.class_id,
                current_hp: entity.health.0,
                max_hp: entity.health.1,
                old_hp_percent: old_pct,
                new_hp_percent: new_pct,
                timestamp: event.timestamp,
            });

            for phase in &phases {
                if let Some(threshold) = phase.starts_below_hp_pct
                    && old_pct > threshold
                    && new_pct <= threshold
                    && enc.current_phase.as_deref() != Some(phase.id.as_str())
                {
                    let old_phase = enc.current_phase.take();
                    enc.current_phase = Some(phase.id.clone());
                    enc.phase_started_at = Some(event.timestamp);
                    signals.push(GameSignal::PhaseChanged {
                        boss_name: resolve(boss.name).to_string(),
                        old_phase,
                        new_phase: phase.id.clone(),
                        timestamp: event.timestamp,
                    });
                }
            }
            break;
        }
    }
}
