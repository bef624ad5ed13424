//! Encounter state and aggregation.
//!
//! An [`Encounter`] is one bounded pull: its ordered events, participant
//! registries, accumulated metrics and per-enemy threat tables. The state
//! machine that opens and closes encounters lives in `signal_processor`.

pub mod effect_instance;
pub mod entity_info;
pub mod metrics;
pub mod summary;

use chrono::{NaiveDateTime, TimeDelta};
use hashbrown::HashMap;

use crate::combat_log::{CombatEvent, EffectKind, Entity, EntityType};
use crate::context::IStr;
use crate::game_data::{defense_type, effect_id, is_boss};
use effect_instance::EffectInstance;
use entity_info::{NpcInfo, PlayerInfo};
use metrics::{EntityMetrics, MetricAccumulator};

#[derive(Debug, Clone, Default, PartialEq)]
pub enum EncounterState {
    #[default]
    NotStarted,
    InCombat,
    PostCombat {
        exit_time: NaiveDateTime,
    },
}

/// Classification of the content where an encounter occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum PhaseType {
    #[default]
    OpenWorld,
    Raid,
    Flashpoint,
    PvP,
    DummyParse,
}

/// Information about the currently engaged boss.
#[derive(Debug, Clone)]
pub struct ActiveBoss {
    pub name: IStr,
    /// Instance id in the combat log
    pub entity_id: i64,
    /// NPC class/template id
    pub class_id: i64,
}

#[derive(Debug, Clone)]
pub struct Encounter {
    pub id: u64,
    pub state: EncounterState,
    pub events: Vec<CombatEvent>,
    pub enter_combat_time: Option<NaiveDateTime>,
    pub exit_combat_time: Option<NaiveDateTime>,
    pub last_combat_activity_time: Option<NaiveDateTime>,
    pub players: HashMap<i64, PlayerInfo>,
    pub npcs: HashMap<i64, NpcInfo>,
    pub all_players_dead: bool,
    /// Active effects by target id, for shield attribution
    pub effects: HashMap<i64, Vec<EffectInstance>>,
    pub accumulated_data: HashMap<i64, MetricAccumulator>,
    /// enemy log id -> attacker log id -> accumulated threat
    pub threat_by_enemy: HashMap<i64, HashMap<i64, f64>>,
    /// Set when a player damages or is damaged by another player
    pub saw_pvp_damage: bool,
    pub active_boss: Option<ActiveBoss>,
    pub current_phase: Option<String>,
    pub phase_started_at: Option<NaiveDateTime>,
}

impl Encounter {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            state: EncounterState::NotStarted,
            events: Vec::new(),
            enter_combat_time: None,
            exit_combat_time: None,
            last_combat_activity_time: None,
            players: HashMap::new(),
            npcs: HashMap::new(),
            all_players_dead: false,
            effects: HashMap::new(),
            accumulated_data: HashMap::new(),
            threat_by_enemy: HashMap::new(),
            saw_pvp_damage: false,
            active_boss: None,
            current_phase: None,
            phase_started_at: None,
        }
    }

    pub fn with_player(id: u64, player: PlayerInfo) -> Self {
        let mut enc = Self::new(id);
        enc.players.insert(player.id, player);
        enc
    }

    pub fn is_active(&self) -> bool {
        matches!(
            self.state,
            EncounterState::InCombat | EncounterState::PostCombat { .. }
        )
    }

    /// Append an event, back-filling its seconds-since-combat-start.
    pub fn push_event(&mut self, mut event: CombatEvent) {
        if let Some(start) = self.enter_combat_time {
            let elapsed = event.timestamp.signed_duration_since(start);
            event.combat_time_secs = Some(elapsed.num_milliseconds() as f32 / 1000.0);
        }
        self.events.push(event);
    }

    // --- Entity State ---

    pub fn set_entity_death(
        &mut self,
        entity_id: i64,
        entity_type: EntityType,
        timestamp: NaiveDateTime,
    ) {
        match entity_type {
            EntityType::Player => {
                if let Some(player) = self.players.get_mut(&entity_id) {
                    player.is_dead = true;
                    player.death_time = Some(timestamp);
                }
            }
            EntityType::Npc | EntityType::Companion => {
                if let Some(npc) = self.npcs.get_mut(&entity_id) {
                    npc.is_dead = true;
                    npc.death_time = Some(timestamp);
                }
            }
            _ => {}
        }
    }

    pub fn set_entity_alive(&mut self, entity_id: i64, entity_type: EntityType) {
        match entity_type {
            EntityType::Player => {
                if let Some(player) = self.players.get_mut(&entity_id) {
                    player.is_dead = false;
                    player.death_time = None;
                }
            }
            EntityType::Npc | EntityType::Companion => {
                if let Some(npc) = self.npcs.get_mut(&entity_id) {
                    npc.is_dead = false;
                    npc.death_time = None;
                }
            }
            _ => {}
        }
    }

    pub fn check_all_players_dead(&mut self) {
        self.all_players_dead =
            !self.players.is_empty() && self.players.values().all(|p| p.is_dead);
    }

    /// Whether every hostile NPC seen in this encounter has died.
    pub fn all_hostiles_dead(&self) -> bool {
        let hostiles: Vec<_> = self
            .npcs
            .values()
            .filter(|npc| npc.entity_type == EntityType::Npc)
            .collect();
        !hostiles.is_empty() && hostiles.iter().all(|npc| npc.is_dead)
    }

    pub fn track_event_entities(&mut self, event: &CombatEvent) {
        // Target selection outside combat would register bystanders
        if event.effect.effect_id == effect_id::TARGETSET
            || event.effect.effect_id == effect_id::TARGETCLEARED
        {
            self.try_track_entity(&event.source_entity, event.timestamp);
            return;
        }

        self.try_track_entity(&event.source_entity, event.timestamp);
        self.try_track_entity(&event.target_entity, event.timestamp);

        self.update_npc_health(&event.source_entity);
        self.update_npc_health(&event.target_entity);
    }

    #[inline]
    fn update_npc_health(&mut self, entity: &Entity) {
        if let Some(npc) = self.npcs.get_mut(&entity.log_id) {
            npc.health = entity.health;
        }
    }

    #[inline]
    fn try_track_entity(&mut self, entity: &Entity, timestamp: NaiveDateTime) {
        match entity.entity_type {
            EntityType::Player => {
                self.players
                    .entry(entity.log_id)
                    .or_insert_with(|| PlayerInfo {
                        id: entity.log_id,
                        name: entity.name,
                        ..Default::default()
                    });
            }
            EntityType::Npc | EntityType::Companion => {
                self.npcs.entry(entity.log_id).or_insert_with(|| NpcInfo {
                    name: entity.name,
                    entity_type: entity.entity_type,
                    log_id: entity.log_id,
                    class_id: entity.class_id,
                    first_seen_at: Some(timestamp),
                    health: entity.health,
                    is_boss: is_boss(entity.class_id),
                    ..Default::default()
                });
            }
            _ => {}
        }
    }

    pub fn get_entity_name(&self, id: i64) -> Option<IStr> {
        self.players
            .get(&id)
            .map(|e| e.name)
            .or_else(|| self.npcs.get(&id).map(|e| e.name))
    }

    pub fn get_entity_type(&self, id: i64) -> Option<EntityType> {
        if self.players.contains_key(&id) {
            Some(EntityType::Player)
        } else {
            self.npcs.get(&id).map(|e| e.entity_type)
        }
    }

    pub fn set_entity_target(&mut self, entity_id: i64, target_id: i64) {
        if let Some(player) = self.players.get_mut(&entity_id) {
            player.current_target_id = target_id;
        } else if let Some(npc) = self.npcs.get_mut(&entity_id) {
            npc.current_target_id = target_id;
        }
    }

    pub fn clear_entity_target(&mut self, entity_id: i64) {
        self.set_entity_target(entity_id, 0);
    }

    pub fn get_current_target(&self, entity_id: i64) -> Option<i64> {
        let target = self
            .players
            .get(&entity_id)
            .map(|p| p.current_target_id)
            .or_else(|| self.npcs.get(&entity_id).map(|n| n.current_target_id))?;
        (target != 0).then_some(target)
    }

    // --- Effect Instances ---

    pub fn apply_effect(&mut self, event: &CombatEvent) {
        let is_shield = event.effect.kind() == EffectKind::AbsorbShield;
        self.effects
            .entry(event.target_entity.log_id)
            .or_default()
            .push(EffectInstance {
                effect_id: event.effect.effect_id,
                source_id: event.source_entity.log_id,
                target_id: event.target_entity.log_id,
                applied_at: event.timestamp,
                is_shield,
                removed_at: None,
            });
    }

    pub fn remove_effect(&mut self, event: &CombatEvent) {
        let Some(effects) = self.effects.get_mut(&event.target_entity.log_id) else {
            return;
        };
        for instance in effects.iter_mut().rev() {
            if instance.effect_id == event.effect.effect_id
                && instance.source_id == event.source_entity.log_id
                && instance.removed_at.is_none()
            {
                instance.removed_at = Some(event.timestamp);
                break;
            }
        }
    }

    /// Credit absorbed damage to the caster of the newest active shield on
    /// the victim.
    fn attribute_shield_absorption(&mut self, event: &CombatEvent) {
        let target_id = event.target_entity.log_id;
        let shield_source = self.effects.get(&target_id).and_then(|effects| {
            effects
                .iter()
                .rev()
                .find(|e| e.is_shield && e.is_active())
                .map(|e| e.source_id)
        });
        if let Some(source_id) = shield_source {
            let acc = self.accumulated_data.entry(source_id).or_default();
            acc.shielding_given += event.details.dmg_absorbed as i64;
        }
    }

    // --- Metrics Accumulation ---

    pub fn accumulate_data(&mut self, event: &CombatEvent) {
        let defense = event.details.defense_type_id;
        let is_defense = matches!(
            defense,
            defense_type::DODGE
                | defense_type::PARRY
                | defense_type::RESIST
                | defense_type::DEFLECT
        );
        let is_natural_shield = defense == defense_type::SHIELD
            && event.details.dmg_effective == event.details.dmg_amount;

        if event.details.dmg_amount > 0
            && event.source_entity.entity_type == EntityType::Player
            && event.target_entity.entity_type == EntityType::Player
            && event.source_entity.log_id != event.target_entity.log_id
        {
            self.saw_pvp_damage = true;
        }

        // Source accumulation
        {
            let source = self
                .accumulated_data
                .entry(event.source_entity.log_id)
                .or_default();

            if event.details.dmg_amount > 0
                && event.source_entity.log_id != event.target_entity.log_id
            {
                source.damage_dealt += event.details.dmg_amount as i64;
                source.damage_dealt_effective += event.details.dmg_effective as i64;
                source.damage_hit_count += 1;
                if event.details.is_crit {
                    source.damage_crit_count += 1;
                }
                if is_boss(event.target_entity.class_id) {
                    source.damage_dealt_boss += event.details.dmg_amount as i64;
                }
            }

            if event.details.heal_amount > 0 {
                source.healing_done += event.details.heal_amount as i64;
                source.healing_effective += event.details.heal_effective as i64;
                source.heal_count += 1;
                if event.details.is_crit {
                    source.heal_crit_count += 1;
                }
            }

            source.threat_generated += event.details.threat as f64;

            if event.effect.effect_id == effect_id::ABILITYACTIVATE
                && self.enter_combat_time.is_some_and(|t| event.timestamp >= t)
                && self.exit_combat_time.is_none_or(|t| t >= event.timestamp)
            {
                source.actions += 1;
            }

            if event.effect.effect_id == effect_id::TAUNT {
                source.taunt_count += 1;
            }
        }

        if event.details.dmg_absorbed > 0 && !is_natural_shield {
            self.attribute_shield_absorption(event);
        }

        // Target accumulation
        {
            let target = self
                .accumulated_data
                .entry(event.target_entity.log_id)
                .or_default();

            if event.details.dmg_amount > 0 {
                target.damage_received += event.details.dmg_amount as i64;
                target.damage_received_effective += event.details.dmg_effective as i64;
                target.damage_absorbed += event.details.dmg_absorbed as i64;
                target.attacks_received += 1;

                if is_defense {
                    target.defense_count += 1;
                }
                if is_natural_shield {
                    target.shield_roll_count += 1;
                    target.shield_roll_absorbed += event.details.dmg_absorbed as i64;
                }
            }

            if event.details.heal_amount > 0 {
                target.healing_received += event.details.heal_amount as i64;
                target.healing_received_effective += event.details.heal_effective as i64;
            }
        }

        self.accumulate_threat(event);
    }

    /// Per-enemy threat bookkeeping: ModifyThreat and damage go straight to
    /// the target enemy; heal threat is split across living hostiles.
    fn accumulate_threat(&mut self, event: &CombatEvent) {
        let source_id = event.source_entity.log_id;
        if source_id == 0 {
            return;
        }

        let threat = if event.details.threat != 0.0 {
            event.details.threat as f64
        } else if event.details.dmg_effective > 0 {
            // Older format versions omit <threat>; effective damage is the
            // closest stand-in
            event.details.dmg_effective as f64
        } else {
            return;
        };

        match event.effect.kind() {
            EffectKind::ModifyThreat => {
                if event.target_entity.entity_type == EntityType::Npc {
                    *self
                        .threat_by_enemy
                        .entry(event.target_entity.log_id)
                        .or_default()
                        .entry(source_id)
                        .or_default() += threat;
                }
            }
            _ if event.details.dmg_amount > 0 => {
                if event.target_entity.entity_type == EntityType::Npc {
                    *self
                        .threat_by_enemy
                        .entry(event.target_entity.log_id)
                        .or_default()
                        .entry(source_id)
                        .or_default() += threat;
                }
            }
            _ if event.details.heal_amount > 0 => {
                let living: Vec<i64> = self
                    .npcs
                    .values()
                    .filter(|npc| npc.entity_type == EntityType::Npc && !npc.is_dead)
                    .map(|npc| npc.log_id)
                    .collect();
                if living.is_empty() {
                    return;
                }
                let share = threat / living.len() as f64;
                for enemy_id in living {
                    *self
                        .threat_by_enemy
                        .entry(enemy_id)
                        .or_default()
                        .entry(source_id)
                        .or_default() += share;
                }
            }
            _ => {}
        }
    }

    /// Threat entries for one enemy, highest first.
    pub fn threat_table(&self, enemy_id: i64) -> Vec<(i64, f64)> {
        let mut entries: Vec<(i64, f64)> = self
            .threat_by_enemy
            .get(&enemy_id)
            .map(|m| m.iter().map(|(k, v)| (*k, *v)).collect())
            .unwrap_or_default();
        entries.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        entries
    }

    // --- Time ---

    pub fn duration_seconds(&self) -> Option<i64> {
        Some(self.duration_ms()? / 1000)
    }

    pub fn duration_ms(&self) -> Option<i64> {
        let enter = self.enter_combat_time?;
        let terminal = self.exit_combat_time.or(self.last_combat_activity_time)?;

        let mut duration = terminal.signed_duration_since(enter);

        // Midnight crossing on unrectified input
        if duration.num_milliseconds().is_negative() {
            duration = duration.checked_add(&TimeDelta::days(1))?;
        }

        Some(duration.num_milliseconds())
    }

    // --- Derived Metrics ---

    pub fn calculate_entity_metrics(&self) -> Option<Vec<EntityMetrics>> {
        let duration_ms = self.duration_ms()?;
        if duration_ms <= 0 {
            return None;
        }

        let mut stats: Vec<EntityMetrics> = self
            .accumulated_data
            .iter()
            .filter_map(|(id, acc)| {
                let name = self.get_entity_name(*id)?;
                let entity_type = self.get_entity_type(*id)?;

                let damage_crit_pct = if acc.damage_hit_count > 0 {
                    (acc.damage_crit_count as f32 / acc.damage_hit_count as f32) * 100.0
                } else {
                    0.0
                };
                let heal_crit_pct = if acc.heal_count > 0 {
                    (acc.heal_crit_count as f32 / acc.heal_count as f32) * 100.0
                } else {
                    0.0
                };
                let effective_heal_pct = if acc.healing_done > 0 {
                    (acc.healing_effective as f32 / acc.healing_done as f32) * 100.0
                } else {
                    0.0
                };
                let defense_pct = if acc.attacks_received > 0 {
                    (acc.defense_count as f32 / acc.attacks_received as f32) * 100.0
                } else {
                    0.0
                };
                let shield_pct = if acc.attacks_received > 0 {
                    (acc.shield_roll_count as f32 / acc.attacks_received as f32) * 100.0
                } else {
                    0.0
                };

                Some(EntityMetrics {
                    entity_id: *id,
                    entity_type,
                    name,
                    total_damage: acc.damage_dealt,
                    total_damage_effective: acc.damage_dealt_effective,
                    total_damage_boss: acc.damage_dealt_boss,
                    dps: (acc.damage_dealt * 1000 / duration_ms) as i32,
                    edps: (acc.damage_dealt_effective * 1000 / duration_ms) as i32,
                    bossdps: (acc.damage_dealt_boss * 1000 / duration_ms) as i32,
                    damage_crit_pct,
                    total_healing: acc.healing_done + acc.shielding_given,
                    total_healing_effective: acc.healing_effective + acc.shielding_given,
                    hps: ((acc.healing_done + acc.shielding_given) * 1000 / duration_ms) as i32,
                    ehps: ((acc.healing_effective + acc.shielding_given) * 1000 / duration_ms)
                        as i32,
                    heal_crit_pct,
                    effective_heal_pct,
                    total_shielding: acc.shielding_given,
                    abs: (acc.shielding_given * 1000 / duration_ms) as i32,
                    total_damage_taken: acc.damage_received,
                    total_damage_taken_effective: acc.damage_received_effective,
                    dtps: (acc.damage_received * 1000 / duration_ms) as i32,
                    edtps: (acc.damage_received_effective * 1000 / duration_ms) as i32,
                    htps: (acc.healing_received * 1000 / duration_ms) as i32,
                    ehtps: (acc.healing_received_effective * 1000 / duration_ms) as i32,
                    defense_pct,
                    shield_pct,
                    total_shield_absorbed: acc.shield_roll_absorbed,
                    taunt_count: acc.taunt_count,
                    apm: acc.actions as f32 * 60000.0 / duration_ms as f32,
                    tps: (acc.threat_generated * 1000.0 / duration_ms as f64) as i32,
                    total_threat: acc.threat_generated as i64,
                })
            })
            .collect();

        stats.sort_by(|a, b| b.dps.cmp(&a.dps));
        Some(stats)
    }
}

/// Merge several encounters into one synthetic "overall" encounter spanning
/// their union.
///
/// The merged entry set is re-sorted by timestamp (line index tie-break)
/// and every aggregate is recomputed from the raw events; pre-aggregated
/// metrics are never summed, so overlapping participants can't be counted
/// twice.
pub fn merge_encounters(id: u64, parts: &[&Encounter]) -> Encounter {
    let mut merged = Encounter::new(id);

    merged.enter_combat_time = parts.iter().filter_map(|e| e.enter_combat_time).min();
    merged.exit_combat_time = parts.iter().filter_map(|e| e.exit_combat_time).max();
    if let Some(exit_time) = merged.exit_combat_time {
        merged.state = EncounterState::PostCombat { exit_time };
    }

    let mut events: Vec<CombatEvent> = parts
        .iter()
        .flat_map(|e| e.events.iter().cloned())
        .map(|mut event| {
            event.combat_time_secs = None;
            event
        })
        .collect();
    events.sort_by(|a, b| {
        a.timestamp
            .cmp(&b.timestamp)
            .then_with(|| a.line_number.cmp(&b.line_number))
    });

    for event in events {
        merged.track_event_entities(&event);
        merged.accumulate_data(&event);
        merged.push_event(event);
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat_log::{Action, Details, Effect};
    use crate::context::intern;
    use crate::game_data::{effect_type_id, effect_id};
    use chrono::NaiveDate;

    fn ts(secs: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 12, 10)
            .unwrap()
            .and_hms_opt(18, 0, secs)
            .unwrap()
    }

    fn player(id: i64, name: &str) -> Entity {
        Entity {
            name: intern(name),
            log_id: id,
            entity_type: EntityType::Player,
            health: (400000, 400000),
            ..Default::default()
        }
    }

    fn npc(id: i64, class_id: i64, name: &str) -> Entity {
        Entity {
            name: intern(name),
            log_id: id,
            class_id,
            entity_type: EntityType::Npc,
            health: (1000000, 1000000),
            ..Default::default()
        }
    }

    fn damage_event(
        line: u64,
        at: NaiveDateTime,
        source: Entity,
        target: Entity,
        amount: i32,
    ) -> CombatEvent {
        CombatEvent {
            line_number: line,
            timestamp: at,
            source_entity: source,
            target_entity: target,
            action: Action::default(),
            effect: Effect {
                type_id: effect_type_id::APPLYEFFECT,
                effect_id: effect_id::DAMAGE,
                ..Default::default()
            },
            details: Details {
                dmg_amount: amount,
                dmg_effective: amount,
                threat: amount as f32,
                ..Default::default()
            },
            combat_time_secs: None,
        }
    }

    fn build_encounter(events: Vec<CombatEvent>) -> Encounter {
        let mut enc = Encounter::new(0);
        enc.state = EncounterState::InCombat;
        enc.enter_combat_time = events.first().map(|e| e.timestamp);
        enc.exit_combat_time = events.last().map(|e| e.timestamp);
        for event in events {
            enc.track_event_entities(&event);
            enc.accumulate_data(&event);
            enc.push_event(event);
        }
        enc
    }

    #[test]
    fn dps_attributes_all_damage_to_the_source() {
        // Two hits at the same second, 10s of combat
        let boss = npc(5320000112163, 3273941900591104, "Dread Master Bestia");
        let p1 = player(1, "Player1");
        let mut events = vec![
            damage_event(1, ts(0), p1.clone(), boss.clone(), 1000),
            damage_event(2, ts(0), p1.clone(), boss.clone(), 500),
        ];
        events.push(damage_event(3, ts(10), p1.clone(), boss.clone(), 0));
        let enc = build_encounter(events);

        let metrics = enc.calculate_entity_metrics().unwrap();
        let p1_metrics = metrics.iter().find(|m| m.entity_id == 1).unwrap();
        assert_eq!(p1_metrics.total_damage, 1500);
        assert_eq!(p1_metrics.dps, 150);
    }

    #[test]
    fn threat_table_accumulates_per_enemy_per_attacker() {
        let boss = npc(10, 3273941900591104, "Dread Master Bestia");
        let add = npc(11, 3291675820556288, "Dread Monster");
        let p1 = player(1, "Tank");
        let p2 = player(2, "Dps");

        let events = vec![
            damage_event(1, ts(0), p1.clone(), boss.clone(), 100),
            damage_event(2, ts(1), p2.clone(), boss.clone(), 400),
            damage_event(3, ts(2), p2.clone(), add.clone(), 300),
            damage_event(4, ts(10), p1.clone(), boss.clone(), 200),
        ];
        let enc = build_encounter(events);

        let boss_table = enc.threat_table(10);
        assert_eq!(boss_table, vec![(2, 400.0), (1, 300.0)]);
        let add_table = enc.threat_table(11);
        assert_eq!(add_table, vec![(2, 300.0)]);
        assert!(enc.threat_table(99).is_empty());
    }

    #[test]
    fn events_get_combat_time_backfilled() {
        let boss = npc(10, 0, "Target");
        let p1 = player(1, "Player1");
        let enc = build_encounter(vec![
            damage_event(1, ts(0), p1.clone(), boss.clone(), 10),
            damage_event(2, ts(7), p1.clone(), boss.clone(), 10),
        ]);
        assert_eq!(enc.events[0].combat_time_secs, Some(0.0));
        assert_eq!(enc.events[1].combat_time_secs, Some(7.0));
    }

    #[test]
    fn merge_recomputes_from_raw_events() {
        let boss = npc(10, 0, "Target");
        let p1 = player(1, "Player1");
        let p2 = player(2, "Player2");

        let enc_a = build_encounter(vec![
            damage_event(1, ts(0), p1.clone(), boss.clone(), 1000),
            damage_event(2, ts(10), p1.clone(), boss.clone(), 0),
        ]);
        let enc_b = build_encounter(vec![
            damage_event(10, ts(20), p2.clone(), boss.clone(), 3000),
            damage_event(11, ts(30), p2.clone(), boss.clone(), 0),
        ]);

        let merged = merge_encounters(99, &[&enc_a, &enc_b]);

        // Union span, not per-part sums
        assert_eq!(merged.duration_seconds(), Some(30));
        let metrics = merged.calculate_entity_metrics().unwrap();
        let p1m = metrics.iter().find(|m| m.entity_id == 1).unwrap();
        let p2m = metrics.iter().find(|m| m.entity_id == 2).unwrap();
        assert_eq!(p1m.total_damage, 1000);
        assert_eq!(p2m.total_damage, 3000);
        assert_eq!(p1m.dps, 1000 / 30);
        assert_eq!(p2m.dps, 100);

        // Merged events are globally ordered
        let lines: Vec<u64> = merged.events.iter().map(|e| e.line_number).collect();
        assert_eq!(lines, vec![1, 2, 10, 11]);
    }

    #[test]
    fn pvp_damage_sets_flag() {
        let p1 = player(1, "Attacker");
        let p2 = player(2, "Victim");
        let enc = build_encounter(vec![
            damage_event(1, ts(0), p1.clone(), p2.clone(), 500),
            damage_event(2, ts(5), p1, p2, 0),
        ]);
        assert!(enc.saw_pvp_damage);
    }
}
