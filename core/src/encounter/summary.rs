//! Encounter history, classification and human-readable naming.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use super::metrics::PlayerMetrics;
use super::{Encounter, PhaseType};
use crate::combat_log::EntityType;
use crate::context::resolve;
use crate::game_data::{BossInfo, ContentType, is_pvp_area, lookup_boss};
use crate::state::info::AreaInfo;

/// Summary of a completed encounter with computed metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncounterSummary {
    pub encounter_id: u64,
    pub display_name: String,
    pub phase_type: PhaseType,
    /// ISO 8601 formatted start time (or None if unknown)
    pub start_time: Option<String>,
    pub duration_seconds: i64,
    pub success: bool,
    pub area_name: String,
    pub difficulty: Option<String>,
    pub boss_name: Option<String>,
    pub player_metrics: Vec<PlayerMetrics>,
    /// Per-enemy threat tables, highest threat first
    pub threat_tables: Vec<ThreatTable>,
    /// Names of NPC enemies in the encounter
    pub npc_names: Vec<String>,
}

/// One enemy's accumulated threat, by attacker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreatTable {
    pub enemy: String,
    pub entries: Vec<ThreatEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreatEntry {
    pub attacker: String,
    pub threat: i64,
}

/// Tracks encounter history for the current log file session.
#[derive(Debug, Clone, Default)]
pub struct EncounterHistory {
    summaries: Vec<EncounterSummary>,
    boss_pull_counts: HashMap<String, u32>,
    trash_pull_count: u32,
    current_area_name: Option<String>,
}

impl EncounterHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, summary: EncounterSummary) {
        self.summaries.push(summary);
    }

    pub fn summaries(&self) -> &[EncounterSummary] {
        &self.summaries
    }

    pub fn clear(&mut self) {
        self.summaries.clear();
        self.boss_pull_counts.clear();
        self.trash_pull_count = 0;
        self.current_area_name = None;
    }

    /// Check if the area changed and update tracking.
    pub fn check_area_change(&mut self, area_name: &str) -> bool {
        let changed = self
            .current_area_name
            .as_ref()
            .is_none_or(|prev| prev != area_name);
        if changed {
            self.current_area_name = Some(area_name.to_string());
            self.trash_pull_count = 0;
        }
        changed
    }

    /// Generate a human-readable name, e.g. "Dread Master Bestia Pull 3".
    pub fn generate_name(&mut self, phase_type: PhaseType, boss_info: Option<&BossInfo>) -> String {
        match (phase_type, boss_info) {
            (_, Some(info)) => {
                let count = self
                    .boss_pull_counts
                    .entry(info.boss.to_string())
                    .or_insert(0);
                *count += 1;
                format!("{} Pull {}", info.boss, count)
            }
            (PhaseType::Raid, None) => {
                self.trash_pull_count += 1;
                format!("Raid Trash {}", self.trash_pull_count)
            }
            (PhaseType::Flashpoint, None) => {
                self.trash_pull_count += 1;
                format!("Flashpoint Trash {}", self.trash_pull_count)
            }
            (PhaseType::DummyParse, None) => {
                self.trash_pull_count += 1;
                format!("Dummy Parse {}", self.trash_pull_count)
            }
            (PhaseType::PvP, None) => {
                self.trash_pull_count += 1;
                format!("PvP Match {}", self.trash_pull_count)
            }
            (PhaseType::OpenWorld, None) => {
                self.trash_pull_count += 1;
                format!("Open World {}", self.trash_pull_count)
            }
        }
    }
}

/// Classify an encounter and find its primary boss (if any).
pub fn classify_encounter(
    encounter: &Encounter,
    area: &AreaInfo,
) -> (PhaseType, Option<&'static BossInfo>) {
    // First boss NPC by first_seen_at is the primary one
    let mut boss_npcs: Vec<_> = encounter
        .npcs
        .values()
        .filter_map(|npc| lookup_boss(npc.class_id).map(|info| (npc, info)))
        .collect();
    boss_npcs.sort_by_key(|(npc, _)| npc.first_seen_at);

    if let Some((_, boss_info)) = boss_npcs.first() {
        let phase = match boss_info.content_type {
            ContentType::TrainingDummy => PhaseType::DummyParse,
            ContentType::Operation => PhaseType::Raid,
            ContentType::Flashpoint => PhaseType::Flashpoint,
            ContentType::LairBoss => PhaseType::OpenWorld,
        };
        return (phase, Some(*boss_info));
    }

    if is_pvp_area(area.area_id) || encounter.saw_pvp_damage {
        return (PhaseType::PvP, None);
    }

    (PhaseType::OpenWorld, None)
}

/// Whether an encounter ended cleanly rather than in a wipe.
pub fn determine_success(encounter: &Encounter) -> bool {
    !encounter.all_players_dead && encounter.exit_combat_time.is_some()
}

/// Create a summary from a completed encounter, or None if it never
/// entered combat.
pub fn create_encounter_summary(
    encounter: &Encounter,
    area: &AreaInfo,
    history: &mut EncounterHistory,
) -> Option<EncounterSummary> {
    encounter.enter_combat_time?;

    history.check_area_change(&area.area_name);
    let (phase_type, boss_info) = classify_encounter(encounter, area);
    let display_name = history.generate_name(phase_type, boss_info);

    let player_metrics: Vec<PlayerMetrics> = encounter
        .calculate_entity_metrics()
        .unwrap_or_default()
        .into_iter()
        .filter(|m| m.entity_type != EntityType::Npc)
        .map(|m| m.to_player_metrics())
        .collect();

    let difficulty = if area.difficulty_name.is_empty() {
        None
    } else {
        Some(area.difficulty_name.clone())
    };

    // Enemy names with counts; companions are friendly and excluded
    let mut npc_counts: HashMap<String, u32> = HashMap::new();
    for npc in encounter.npcs.values() {
        if npc.entity_type != EntityType::Companion {
            *npc_counts
                .entry(resolve(npc.name).to_string())
                .or_insert(0) += 1;
        }
    }
    let mut npc_names: Vec<String> = npc_counts
        .into_iter()
        .map(|(name, count)| {
            if count > 1 {
                format!("{} ({})", name, count)
            } else {
                name
            }
        })
        .collect();
    npc_names.sort();

    let mut threat_tables: Vec<ThreatTable> = encounter
        .threat_by_enemy
        .keys()
        .map(|enemy_id| {
            let enemy = encounter
                .get_entity_name(*enemy_id)
                .map(|n| resolve(n).to_string())
                .unwrap_or_else(|| enemy_id.to_string());
            let entries = encounter
                .threat_table(*enemy_id)
                .into_iter()
                .map(|(attacker_id, threat)| ThreatEntry {
                    attacker: encounter
                        .get_entity_name(attacker_id)
                        .map(|n| resolve(n).to_string())
                        .unwrap_or_else(|| attacker_id.to_string()),
                    threat: threat as i64,
                })
                .collect();
            ThreatTable { enemy, entries }
        })
        .collect();
    threat_tables.sort_by(|a, b| a.enemy.cmp(&b.enemy));

    Some(EncounterSummary {
        encounter_id: encounter.id,
        display_name,
        phase_type,
        start_time: encounter
            .enter_combat_time
            .map(|t| t.format("%Y-%m-%dT%H:%M:%S").to_string()),
        duration_seconds: encounter.duration_seconds().unwrap_or(0),
        success: determine_success(encounter),
        area_name: area.area_name.clone(),
        difficulty,
        boss_name: boss_info.map(|b| b.boss.to_string()),
        player_metrics,
        threat_tables,
        npc_names,
    })
}
