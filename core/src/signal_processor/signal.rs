//! Signals emitted by the event processor for cross-cutting consumers.
//!
//! These represent "interesting things that happened" at a higher level
//! than raw log events: overlays, timers and recaps subscribe to these
//! rather than re-deriving state from the event stream.

use chrono::NaiveDateTime;

use crate::combat_log::EntityType;
use crate::context::IStr;

#[derive(Debug, Clone)]
pub enum GameSignal {
    // Combat lifecycle
    CombatStarted {
        timestamp: NaiveDateTime,
        encounter_id: u64,
    },
    CombatEnded {
        timestamp: NaiveDateTime,
        encounter_id: u64,
    },

    // Entity state changes
    EntityDeath {
        entity_id: i64,
        entity_type: EntityType,
        entity_name: IStr,
        timestamp: NaiveDateTime,
    },
    EntityRevived {
        entity_id: i64,
        entity_type: EntityType,
        timestamp: NaiveDateTime,
    },

    /// Entity changed their target (TargetSet event)
    TargetChanged {
        source_id: i64,
        target_id: i64,
        target_name: IStr,
        target_entity_type: EntityType,
        timestamp: NaiveDateTime,
    },
    /// Entity cleared their target (TargetCleared event)
    TargetCleared {
        source_id: i64,
        timestamp: NaiveDateTime,
    },

    // Area transitions
    AreaEntered {
        area_id: i64,
        area_name: String,
        difficulty_id: i64,
        difficulty_name: String,
        timestamp: NaiveDateTime,
    },

    // Player initialization
    PlayerInitialized {
        entity_id: i64,
        timestamp: NaiveDateTime,
    },
    /// Fires for every player, not just the local one
    DisciplineChanged {
        entity_id: i64,
        discipline_id: i64,
        timestamp: NaiveDateTime,
    },

    /// A known boss NPC was engaged in the current encounter
    BossEncounterDetected {
        boss_name: String,
        /// Instance id in the combat log
        entity_id: i64,
        /// NPC class/template id
        npc_id: i64,
        timestamp: NaiveDateTime,
    },
    /// The engaged boss's HP changed (drives phase detection)
    BossHpChanged {
        entity_id: i64,
        npc_id: i64,
        current_hp: i32,
        max_hp: i32,
        old_hp_percent: f32,
        new_hp_percent: f32,
        timestamp: NaiveDateTime,
    },
    /// The boss fight moved to a new phase
    PhaseChanged {
        boss_name: String,
        old_phase: Option<String>,
        new_phase: String,
        timestamp: NaiveDateTime,
    },
}

impl GameSignal {
    /// Get the timestamp from any signal variant.
    pub fn timestamp(&self) -> NaiveDateTime {
        match self {
            Self::CombatStarted { timestamp, .. }
            | Self::CombatEnded { timestamp, .. }
            | Self::EntityDeath { timestamp, .. }
            | Self::EntityRevived { timestamp, .. }
            | Self::TargetChanged { timestamp, .. }
            | Self::TargetCleared { timestamp, .. }
            | Self::AreaEntered { timestamp, .. }
            | Self::PlayerInitialized { timestamp, .. }
            | Self::DisciplineChanged { timestamp, .. }
            | Self::BossEncounterDetected { timestamp, .. }
            | Self::BossHpChanged { timestamp, .. }
            | Self::PhaseChanged { timestamp, .. } => *timestamp,
        }
    }
}
