use serde::{Deserialize, Serialize};

use super::speaker::Gender;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Season {
    Spring,
    Summer,
    Fall,
    Winter,
}

impl Season {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Spring => "spring",
            Self::Summer => "summer",
            Self::Fall => "fall",
            Self::Winter => "winter",
        }
    }
}

/// Read-only snapshot of the world the dialogue is compiled and shown in.
///
/// The host builds one of these per conversation (or per frame) and passes
/// it to compilation and playback. Nothing in the engine reads ambient
/// globals; everything date, player or world related comes from here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GameContext {
    pub days_played: u32,
    pub year: u32,
    pub season: Season,
    pub day_of_month: u32,
    /// 24h clock as an integer, e.g. `1330` for half past one in the afternoon.
    pub time_of_day: u32,
    pub language: String,
    pub player_name: String,
    pub player_gender: Gender,
    pub farm_name: String,
    pub favorite_thing: String,
    pub spouse_name: Option<String>,
    pub children: Vec<String>,
    pub pet_name: Option<String>,
    pub band_name: Option<String>,
    pub book_name: Option<String>,
    /// The player carries the translation aid for unintelligible speakers.
    pub understands_unintelligible: bool,
    pub marketplace_accessible: bool,
    pub community_hub_complete: bool,
}

impl Default for GameContext {
    fn default() -> Self {
        Self {
            days_played: 0,
            year: 1,
            season: Season::Spring,
            day_of_month: 1,
            time_of_day: 600,
            language: "en".to_string(),
            player_name: "Farmer".to_string(),
            player_gender: Gender::Male,
            farm_name: "Sunny".to_string(),
            favorite_thing: "Pizza".to_string(),
            spouse_name: None,
            children: Vec::new(),
            pet_name: None,
            band_name: None,
            book_name: None,
            understands_unintelligible: false,
            marketplace_accessible: true,
            community_hub_complete: false,
        }
    }
}

impl GameContext {
    /// Render `time_of_day` as a 12h clock string ("1:30 PM").
    pub fn formatted_time(&self) -> String {
        let hours = (self.time_of_day / 100) % 24;
        let minutes = self.time_of_day % 100;
        let suffix = if hours >= 12 { "PM" } else { "AM" };
        let display_hours = match hours % 12 {
            0 => 12,
            h => h,
        };
        format!("{}:{:02} {}", display_hours, minutes, suffix)
    }

    pub fn child_name(&self, index: usize) -> Option<&str> {
        self.children.get(index).map(String::as_str)
    }
}
