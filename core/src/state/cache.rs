//! Session-wide state built incrementally from the ordered event stream.
//!
//! `SessionCache` is pure storage plus point-in-time lookups; routing logic
//! lives in the `EventProcessor`. It is an explicit value owned by a
//! `ParsingSession` rather than ambient global state, so a fresh parse can
//! build a new cache off to the side and swap it in atomically.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::NaiveDateTime;
use hashbrown::HashMap;

use ossus_types::BossDefinition;

use crate::combat_log::{CombatEvent, EffectKind, Entity, EntityType};
use crate::encounter::entity_info::PlayerInfo;
use crate::encounter::summary::{EncounterHistory, create_encounter_summary};
use crate::encounter::{Encounter, EncounterState};
use crate::game_data::{Discipline, Role, effect_id, register_boss_ids};
use crate::state::info::AreaInfo;
use crate::state::timeline::{EntitySnapshot, EntityTimeline};

/// Live encounter window; finished encounters are summarized into history.
const CACHE_DEFAULT_CAPACITY: usize = 2;

#[derive(Debug, Clone, Default)]
pub struct SessionCache {
    // Local player state
    pub player: PlayerInfo,
    pub player_initialized: bool,

    // Area state
    pub current_area: AreaInfo,
    area_timeline: Vec<(NaiveDateTime, AreaInfo)>,

    // Encounter tracking
    encounters: VecDeque<Encounter>,
    next_encounter_id: u64,
    pub encounter_history: EncounterHistory,

    // Canonical entity registry: first-seen entity per raw log id
    entities: HashMap<i64, Entity>,
    // Append-only snapshot history per entity
    timelines: HashMap<i64, EntityTimeline>,

    // Player discipline registry (session-scoped source of truth)
    pub player_disciplines: HashMap<i64, PlayerInfo>,

    // Boss encounter definitions for the current content
    boss_definitions: Arc<Vec<BossDefinition>>,
}

impl SessionCache {
    pub fn new() -> Self {
        let mut cache = Self::default();
        cache.push_new_encounter();
        cache
    }

    /// Full reset for a reparse. Boss definitions are reference data and
    /// survive the reset.
    pub fn clear(&mut self) {
        let definitions = Arc::clone(&self.boss_definitions);
        *self = Self::new();
        self.boss_definitions = definitions;
    }

    // --- Encounter Management ---

    fn finalize_current_encounter(&mut self) {
        let Some(encounter) = self.encounters.back() else {
            return;
        };
        if encounter.state == EncounterState::NotStarted {
            return;
        }
        if let Some(summary) =
            create_encounter_summary(encounter, &self.current_area, &mut self.encounter_history)
        {
            self.encounter_history.add(summary);
        }
    }

    pub fn push_new_encounter(&mut self) -> u64 {
        self.finalize_current_encounter();

        let id = self.next_encounter_id;
        let encounter = if self.player_initialized {
            Encounter::with_player(id, self.player.clone())
        } else {
            Encounter::new(id)
        };

        tracing::debug!(encounter_id = id, "creating new encounter");

        self.next_encounter_id += 1;
        self.encounters.push_back(encounter);
        while self.encounters.len() > CACHE_DEFAULT_CAPACITY {
            self.encounters.pop_front();
        }
        id
    }

    pub fn current_encounter(&self) -> Option<&Encounter> {
        self.encounters.back()
    }

    pub fn current_encounter_mut(&mut self) -> Option<&mut Encounter> {
        self.encounters.back_mut()
    }

    pub fn encounters(&self) -> impl Iterator<Item = &Encounter> {
        self.encounters.iter()
    }

    pub fn last_combat_encounter(&self) -> Option<&Encounter> {
        self.encounters
            .iter()
            .rfind(|e| e.state != EncounterState::NotStarted)
    }

    // --- Boss Definitions ---

    pub fn load_boss_definitions(&mut self, definitions: Vec<BossDefinition>) {
        for def in &definitions {
            register_boss_ids(&def.npc_ids);
        }
        self.boss_definitions = Arc::new(definitions);
    }

    pub fn boss_definitions(&self) -> &[BossDefinition] {
        &self.boss_definitions
    }

    pub fn find_boss_definition(&self, npc_class_id: i64) -> Option<&BossDefinition> {
        self.boss_definitions
            .iter()
            .find(|def| def.matches(npc_class_id))
    }

    // --- Area ---

    /// Record an area transition.
    pub fn enter_area(&mut self, mut area: AreaInfo, timestamp: NaiveDateTime) {
        area.entered_at = Some(timestamp);
        area.generation = self.current_area.generation + 1;
        self.current_area = area.clone();
        self.area_timeline.push((timestamp, area));
    }

    // --- Entity Registry & Timelines ---

    /// The canonical entity for a raw log id: the first-seen record wins,
    /// later sightings (possibly with localized name variants) reuse it.
    pub fn canonical_entity(&self, log_id: i64) -> Option<&Entity> {
        self.entities.get(&log_id)
    }

    fn register_entity(&mut self, entity: &Entity) {
        if entity.log_id == 0 || entity.entity_type == EntityType::Empty {
            return;
        }
        self.entities
            .entry(entity.log_id)
            .or_insert_with(|| entity.clone());
    }

    /// Apply one event to the registry and snapshot timelines.
    ///
    /// Must be called in non-decreasing timestamp order; historical replays
    /// go through the rectifier first.
    pub fn record_event(&mut self, event: &CombatEvent) {
        self.register_entity(&event.source_entity);
        self.register_entity(&event.target_entity);

        let timestamp = event.timestamp;

        // Sighting snapshot for each mentioned entity
        let source_id = event.source_entity.log_id;
        let target_id = event.target_entity.log_id;
        self.record_sighting(&event.source_entity, timestamp);
        if target_id != source_id {
            self.record_sighting(&event.target_entity, timestamp);
        }

        match event.effect.kind() {
            EffectKind::DisciplineChanged => {
                if source_id != 0 {
                    let class_id = event.effect.effect_id;
                    let discipline_id = event.effect.discipline_id;
                    self.timelines
                        .entry(source_id)
                        .or_default()
                        .record(timestamp, |s| {
                            s.class_id = class_id;
                            s.discipline_id = discipline_id;
                        });
                }
            }
            EffectKind::TargetChanged => {
                if source_id != 0 {
                    let new_target = if event.effect.effect_id == effect_id::TARGETSET {
                        target_id
                    } else {
                        0
                    };
                    self.timelines
                        .entry(source_id)
                        .or_default()
                        .record(timestamp, |s| s.target_id = new_target);
                }
            }
            EffectKind::Event => {
                if event.effect.effect_id == effect_id::DEATH && target_id != 0 {
                    self.timelines
                        .entry(target_id)
                        .or_default()
                        .record(timestamp, |s| s.alive = false);
                } else if event.effect.effect_id == effect_id::REVIVED && source_id != 0 {
                    self.timelines
                        .entry(source_id)
                        .or_default()
                        .record(timestamp, |s| s.alive = true);
                }
            }
            EffectKind::Apply
            | EffectKind::Remove
            | EffectKind::Spend
            | EffectKind::Restore
            | EffectKind::ModifyCharges
            | EffectKind::AreaEntered
            | EffectKind::ModifyThreat
            | EffectKind::AbsorbShield
            | EffectKind::Unknown => {}
        }

        // Player-vs-player damage marks the opposing side
        if event.details.dmg_amount > 0
            && event.source_entity.entity_type == EntityType::Player
            && event.target_entity.entity_type == EntityType::Player
            && source_id != target_id
        {
            let opponents: Vec<i64> = if self.player_initialized {
                if source_id == self.player.id {
                    vec![target_id]
                } else if target_id == self.player.id {
                    vec![source_id]
                } else {
                    Vec::new()
                }
            } else {
                vec![source_id, target_id]
            };
            for id in opponents {
                self.timelines
                    .entry(id)
                    .or_default()
                    .record(timestamp, |s| s.pvp_opponent = true);
            }
        }
    }

    fn record_sighting(&mut self, entity: &Entity, timestamp: NaiveDateTime) {
        if entity.log_id == 0 || entity.entity_type == EntityType::Empty {
            return;
        }
        self.timelines
            .entry(entity.log_id)
            .or_default()
            .record(timestamp, |s| {
                s.health = entity.health;
                s.position = entity.position;
            });
    }

    fn snapshot_at(&self, entity_id: i64, t: NaiveDateTime) -> Option<&EntitySnapshot> {
        self.timelines.get(&entity_id)?.at(t)
    }

    // --- Point-in-time Queries ---
    // All lookups are causal: the newest snapshot at or before the query
    // time, None when nothing precedes it.

    /// What an enemy NPC was targeting at `t`.
    pub fn enemy_target_at(&self, entity_id: i64, t: NaiveDateTime) -> Option<i64> {
        let entity = self.entities.get(&entity_id)?;
        if entity.entity_type != EntityType::Npc {
            return None;
        }
        self.target_at(entity_id, t)
    }

    /// What a player was targeting at `t`.
    pub fn player_target_at(&self, entity_id: i64, t: NaiveDateTime) -> Option<i64> {
        let entity = self.entities.get(&entity_id)?;
        if entity.entity_type != EntityType::Player {
            return None;
        }
        self.target_at(entity_id, t)
    }

    fn target_at(&self, entity_id: i64, t: NaiveDateTime) -> Option<i64> {
        let snapshot = self.snapshot_at(entity_id, t)?;
        (snapshot.target_id != 0).then_some(snapshot.target_id)
    }

    /// Class guid at `t` (from the last DisciplineChanged at or before it).
    pub fn class_at(&self, entity_id: i64, t: NaiveDateTime) -> Option<i64> {
        let snapshot = self.snapshot_at(entity_id, t)?;
        (snapshot.class_id != 0).then_some(snapshot.class_id)
    }

    /// Discipline at `t`, if its guid is in the roster.
    pub fn discipline_at(&self, entity_id: i64, t: NaiveDateTime) -> Option<Discipline> {
        let snapshot = self.snapshot_at(entity_id, t)?;
        Discipline::from_guid(snapshot.discipline_id)
    }

    /// Role at `t` (tank/healer detection).
    pub fn role_at(&self, entity_id: i64, t: NaiveDateTime) -> Option<Role> {
        self.discipline_at(entity_id, t).map(|d| d.role())
    }

    /// Whether the entity was dead at `t`.
    pub fn was_dead_at(&self, entity_id: i64, t: NaiveDateTime) -> Option<bool> {
        self.snapshot_at(entity_id, t).map(|s| !s.alive)
    }

    /// Whether the entity had acted as a PvP opponent by `t`.
    pub fn is_pvp_opponent_at(&self, entity_id: i64, t: NaiveDateTime) -> Option<bool> {
        self.snapshot_at(entity_id, t).map(|s| s.pvp_opponent)
    }

    /// HP at `t`.
    pub fn health_at(&self, entity_id: i64, t: NaiveDateTime) -> Option<(i32, i32)> {
        self.snapshot_at(entity_id, t).map(|s| s.health)
    }

    /// The area/encounter context active at `t`.
    pub fn area_at(&self, t: NaiveDateTime) -> Option<&AreaInfo> {
        let idx = self.area_timeline.partition_point(|(at, _)| *at <= t);
        if idx == 0 {
            None
        } else {
            Some(&self.area_timeline[idx - 1].1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat_log::{Action, Details, Effect};
    use crate::context::{intern, resolve};
    use crate::game_data::effect_type_id;
    use chrono::{NaiveDate, NaiveDateTime};

    fn ts(secs: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 12, 10)
            .unwrap()
            .and_hms_opt(18, 0, 0)
            .unwrap()
            + chrono::TimeDelta::seconds(secs as i64)
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

    fn npc(id: i64, name: &str) -> Entity {
        Entity {
            name: intern(name),
            log_id: id,
            class_id: 1,
            entity_type: EntityType::Npc,
            health: (1000000, 1000000),
            ..Default::default()
        }
    }

    fn event(
        line: u64,
        at: NaiveDateTime,
        source: Entity,
        target: Entity,
        effect: Effect,
        details: Details,
    ) -> CombatEvent {
        CombatEvent {
            line_number: line,
            timestamp: at,
            source_entity: source,
            target_entity: target,
            action: Action::default(),
            effect,
            details,
            combat_time_secs: None,
        }
    }

    fn target_set(at: NaiveDateTime, source: Entity, target: Entity) -> CombatEvent {
        event(
            0,
            at,
            source,
            target,
            Effect {
                type_id: effect_type_id::EVENT,
                effect_id: effect_id::TARGETSET,
                ..Default::default()
            },
            Details::default(),
        )
    }

    fn death(at: NaiveDateTime, target: Entity) -> CombatEvent {
        event(
            0,
            at,
            Entity::default(),
            target,
            Effect {
                type_id: effect_type_id::EVENT,
                effect_id: effect_id::DEATH,
                ..Default::default()
            },
            Details::default(),
        )
    }

    #[test]
    fn first_seen_entity_is_canonical() {
        let mut cache = SessionCache::new();
        let boss_en = npc(10, "Dread Master Bestia");
        let mut boss_de = npc(10, "Dunkler Meister Bestia");
        boss_de.class_id = 1;

        cache.record_event(&target_set(ts(0), player(1, "Tank"), boss_en.clone()));
        cache.record_event(&target_set(ts(1), player(1, "Tank"), boss_de.clone()));

        // Localization artifacts don't fork the identity
        let canonical = cache.canonical_entity(10).unwrap();
        assert_eq!(resolve(canonical.name), "Dread Master Bestia");
        assert_eq!(canonical, &boss_de);
    }

    #[test]
    fn target_queries_are_causal() {
        let mut cache = SessionCache::new();
        let tank = player(1, "Tank");
        let boss = npc(10, "Bestia");

        cache.record_event(&target_set(ts(5), boss.clone(), tank.clone()));
        cache.record_event(&target_set(ts(15), tank.clone(), boss.clone()));

        // Before any snapshot: unknown
        assert_eq!(cache.enemy_target_at(10, ts(4)), None);
        // At and after the snapshot
        assert_eq!(cache.enemy_target_at(10, ts(5)), Some(1));
        assert_eq!(cache.enemy_target_at(10, ts(60)), Some(1));
        // Player query goes through the player path
        assert_eq!(cache.player_target_at(1, ts(15)), Some(10));
        // A player is not an enemy
        assert_eq!(cache.enemy_target_at(1, ts(15)), None);
        // Never reflects the future
        assert_eq!(cache.player_target_at(1, ts(14)), None);
    }

    #[test]
    fn death_query_is_causal() {
        let mut cache = SessionCache::new();
        let boss = npc(10, "Bestia");
        cache.record_event(&target_set(ts(0), boss.clone(), player(1, "Tank")));
        cache.record_event(&death(ts(30), boss.clone()));

        assert_eq!(cache.was_dead_at(10, ts(10)), Some(false));
        assert_eq!(cache.was_dead_at(10, ts(30)), Some(true));
        assert_eq!(cache.was_dead_at(99, ts(30)), None);
    }

    #[test]
    fn discipline_changed_updates_class_queries() {
        let mut cache = SessionCache::new();
        let shadow = player(1, "Shadow");
        let effect = Effect {
            type_id: effect_type_id::DISCIPLINECHANGED,
            effect_name: intern("Jedi Shadow"),
            effect_id: 3206823655504,
            discipline_name: intern("Kinetic Combat"),
            discipline_id: 2031339142381644,
            ..Default::default()
        };
        cache.record_event(&event(
            0,
            ts(1),
            shadow.clone(),
            shadow.clone(),
            effect,
            Details::default(),
        ));

        assert_eq!(cache.class_at(1, ts(1)), Some(3206823655504));
        assert_eq!(cache.discipline_at(1, ts(1)), Some(Discipline::KineticCombat));
        assert_eq!(cache.role_at(1, ts(1)), Some(Role::Tank));
        assert_eq!(cache.discipline_at(1, ts(0)), None);
    }

    #[test]
    fn pvp_opponent_marking() {
        let mut cache = SessionCache::new();
        cache.player.id = 1;
        cache.player_initialized = true;

        let me = player(1, "Me");
        let enemy = player(2, "Enemy");
        let dmg = Details {
            dmg_amount: 500,
            dmg_effective: 500,
            ..Default::default()
        };
        cache.record_event(&event(
            0,
            ts(10),
            enemy.clone(),
            me.clone(),
            Effect {
                type_id: effect_type_id::APPLYEFFECT,
                effect_id: effect_id::DAMAGE,
                ..Default::default()
            },
            dmg,
        ));

        assert_eq!(cache.is_pvp_opponent_at(2, ts(9)), None);
        assert_eq!(cache.is_pvp_opponent_at(2, ts(10)), Some(true));
        // The local player is not their own opponent
        assert_eq!(cache.is_pvp_opponent_at(1, ts(10)), Some(false));
    }

    #[test]
    fn area_at_returns_active_area() {
        let mut cache = SessionCache::new();
        cache.enter_area(
            AreaInfo {
                area_name: "Imperial Fleet".into(),
                area_id: 137438989504,
                ..Default::default()
            },
            ts(0),
        );
        cache.enter_area(
            AreaInfo {
                area_name: "The Dread Palace".into(),
                area_id: 137438993410,
                ..Default::default()
            },
            ts(100),
        );

        assert!(cache.area_at(ts(0) - chrono::TimeDelta::seconds(1)).is_none());
        assert_eq!(cache.area_at(ts(50)).unwrap().area_name, "Imperial Fleet");
        assert_eq!(
            cache.area_at(ts(100)).unwrap().area_name,
            "The Dread Palace"
        );
        assert_eq!(cache.current_area.generation, 2);
    }

    #[test]
    fn clear_resets_state_but_keeps_definitions() {
        let mut cache = SessionCache::new();
        cache.load_boss_definitions(vec![BossDefinition {
            name: "Bestia".into(),
            npc_ids: vec![42],
            ..Default::default()
        }]);
        cache.record_event(&target_set(ts(0), player(1, "Tank"), npc(10, "Bestia")));
        assert!(cache.canonical_entity(10).is_some());

        cache.clear();
        assert!(cache.canonical_entity(10).is_none());
        assert_eq!(cache.boss_definitions().len(), 1);
    }
}
