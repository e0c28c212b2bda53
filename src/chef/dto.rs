use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ai::Recipe;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

impl fmt::Display for MealType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Breakfast => "Breakfast",
            Self::Lunch => "Lunch",
            Self::Dinner => "Dinner",
            Self::Snack => "Snack",
        })
    }
}

/// How much time the cook has.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Pace {
    #[serde(rename = "15m")]
    Quick,
    #[default]
    #[serde(rename = "30m")]
    HalfHour,
    #[serde(rename = "1h")]
    Hour,
    #[serde(rename = "Slow Cook")]
    SlowCook,
}

impl fmt::Display for Pace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Quick => "15 minutes",
            Self::HalfHour => "30 minutes",
            Self::Hour => "1 hour",
            Self::SlowCook => "a slow cook",
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SuggestRequest {
    pub meal_type: Option<MealType>,
    pub pace: Option<Pace>,
    pub people_count: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct SuggestResponse {
    pub meal_type: MealType,
    pub pace: Pace,
    pub people_count: u32,
    pub recipes: Vec<Recipe>,
}

#[derive(Debug, Deserialize)]
pub struct CookedRequest {
    pub used_ingredients: Vec<String>,
    pub people_count: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct CookedResponse {
    pub logs: Vec<String>,
}
