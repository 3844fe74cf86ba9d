use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const PRESET_COLORS: [&str; 8] = [
    "#FF6B6B", "#4ECDC4", "#45B7D1", "#96CEB4", "#FECA57", "#FF9FF3", "#54A0FF", "#5F27CD",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: Uuid,
    pub name: String,
    pub color: String,
    /// Billed per full day; a half day bills half of it.
    pub daily_rate: f64,
}

impl Client {
    pub fn new(name: impl Into<String>, daily_rate: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            color: PRESET_COLORS[0].to_string(),
            daily_rate,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryDuration {
    FullDay,
    HalfDay,
}

impl EntryDuration {
    pub fn days(self) -> f64 {
        match self {
            Self::FullDay => 1.0,
            Self::HalfDay => 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeEntry {
    pub id: Uuid,
    pub client_id: Uuid,
    pub date: NaiveDate,
    pub duration: EntryDuration,
    #[serde(default)]
    pub notes: String,
}

impl TimeEntry {
    pub fn new(client_id: Uuid, date: NaiveDate, duration: EntryDuration) -> Self {
        Self {
            id: Uuid::new_v4(),
            client_id,
            date,
            duration,
            notes: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use uuid::Uuid;

    use super::{EntryDuration, TimeEntry};

    #[test]
    fn entry_json_shape() {
        let client_id = Uuid::nil();
        let date = NaiveDate::from_ymd_opt(2024, 3, 15).expect("date");
        let entry = TimeEntry::new(client_id, date, EntryDuration::HalfDay);

        let value = serde_json::to_value(&entry).expect("serialize");
        assert_eq!(value["duration"], "half_day");
        assert_eq!(value["date"], "2024-03-15");

        let without_notes = serde_json::json!({
            "id": Uuid::nil(),
            "client_id": client_id,
            "date": "2024-03-15",
            "duration": "full_day",
        });
        let parsed: TimeEntry = serde_json::from_value(without_notes).expect("deserialize");
        assert_eq!(parsed.duration, EntryDuration::FullDay);
        assert!(parsed.notes.is_empty());
    }
}
