//! Metric accumulation and derived per-entity output values.

use serde::{Deserialize, Serialize};

use crate::combat_log::EntityType;
use crate::context::IStr;

/// Raw running totals for one entity within an encounter.
#[derive(Debug, Clone, Default)]
pub struct MetricAccumulator {
    pub damage_dealt: i64,
    pub damage_dealt_effective: i64,
    pub damage_dealt_boss: i64,
    pub damage_hit_count: u32,
    pub damage_crit_count: u32,
    pub damage_received: i64,
    pub damage_received_effective: i64,
    pub damage_absorbed: i64,
    pub attacks_received: u32,
    pub defense_count: u32,
    pub shield_roll_count: u32,
    pub shield_roll_absorbed: i64,
    pub healing_done: i64,
    pub healing_effective: i64,
    pub heal_count: u32,
    pub heal_crit_count: u32,
    pub healing_received: i64,
    pub healing_received_effective: i64,
    pub shielding_given: i64,
    pub threat_generated: f64,
    pub actions: u32,
    pub taunt_count: u32,
}

/// Derived output metrics for one entity, computed once the encounter
/// duration is known.
#[derive(Debug, Clone)]
pub struct EntityMetrics {
    pub entity_id: i64,
    pub entity_type: EntityType,
    pub name: IStr,

    pub total_damage: i64,
    pub total_damage_effective: i64,
    pub total_damage_boss: i64,
    pub dps: i32,
    pub edps: i32,
    pub bossdps: i32,
    pub damage_crit_pct: f32,

    pub total_healing: i64,
    pub total_healing_effective: i64,
    pub hps: i32,
    pub ehps: i32,
    pub heal_crit_pct: f32,
    pub effective_heal_pct: f32,

    pub total_shielding: i64,
    pub abs: i32,

    pub total_damage_taken: i64,
    pub total_damage_taken_effective: i64,
    pub dtps: i32,
    pub edtps: i32,
    pub htps: i32,
    pub ehtps: i32,
    pub defense_pct: f32,
    pub shield_pct: f32,
    pub total_shield_absorbed: i64,
    pub taunt_count: u32,

    pub apm: f32,
    pub tps: i32,
    pub total_threat: i64,
}

impl EntityMetrics {
    /// Serializable per-player view for summaries and worker output.
    pub fn to_player_metrics(&self) -> PlayerMetrics {
        PlayerMetrics {
            name: crate::context::resolve(self.name).to_string(),
            dps: self.dps,
            edps: self.edps,
            hps: self.hps,
            ehps: self.ehps,
            dtps: self.dtps,
            tps: self.tps,
            apm: self.apm,
            total_damage: self.total_damage,
            total_healing: self.total_healing,
            total_threat: self.total_threat,
            damage_crit_pct: self.damage_crit_pct,
            heal_crit_pct: self.heal_crit_pct,
        }
    }
}

/// Player-facing subset of [`EntityMetrics`], serde-friendly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerMetrics {
    pub name: String,
    pub dps: i32,
    pub edps: i32,
    pub hps: i32,
    pub ehps: i32,
    pub dtps: i32,
    pub tps: i32,
    pub apm: f32,
    pub total_damage: i64,
    pub total_healing: i64,
    pub total_threat: i64,
    pub damage_crit_pct: f32,
    pub heal_crit_pct: f32,
}
