//! Per-encounter participant records.

use chrono::NaiveDateTime;

use crate::combat_log::EntityType;
use crate::context::{IStr, empty_istr};

#[derive(Debug, Clone)]
pub struct PlayerInfo {
    pub id: i64,
    pub name: IStr,
    pub class_id: i64,
    pub class_name: String,
    pub discipline_id: i64,
    pub discipline_name: String,
    pub is_dead: bool,
    pub death_time: Option<NaiveDateTime>,
    pub current_target_id: i64,
}

impl Default for PlayerInfo {
    fn default() -> Self {
        Self {
            id: 0,
            name: empty_istr(),
            class_id: 0,
            class_name: String::new(),
            discipline_id: 0,
            discipline_name: String::new(),
            is_dead: false,
            death_time: None,
            current_target_id: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NpcInfo {
    pub name: IStr,
    pub entity_type: EntityType,
    pub log_id: i64,
    pub class_id: i64,
    pub first_seen_at: Option<NaiveDateTime>,
    pub health: (i32, i32),
    pub is_boss: bool,
    pub is_dead: bool,
    pub death_time: Option<NaiveDateTime>,
    pub current_target_id: i64,
}

impl Default for NpcInfo {
    fn default() -> Self {
        Self {
            name: empty_istr(),
            entity_type: EntityType::Npc,
            log_id: 0,
            class_id: 0,
            first_seen_at: None,
            health: (0, 0),
            is_boss: false,
            is_dead: false,
            death_time: None,
            current_target_id: 0,
        }
    }
}

impl NpcInfo {
    pub fn hp_percent(&self) -> f32 {
        if self.health.1 > 0 {
            (self.health.0 as f32 / self.health.1 as f32) * 100.0
        } else {
            0.0
        }
    }
}
