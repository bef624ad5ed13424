use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AreaInfo {
    pub area_name: String,
    pub area_id: i64,
    pub difficulty_id: i64,
    pub difficulty_name: String,
    pub entered_at: Option<NaiveDateTime>,
    /// Monotonic counter incremented on every area transition (even when
    /// re-entering the same area).
    pub generation: u64,
}
