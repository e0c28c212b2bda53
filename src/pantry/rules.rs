//! Category rules deciding how much of a pantry row one cooked meal consumes.

pub const DEFAULT_PEOPLE: u32 = 2;

/// Fraction of a package one person uses from a fractional-use category.
pub const PER_PERSON_USAGE: f64 = 0.125;

/// Deduction for categories consumed a whole package at a time.
pub const WHOLE_PACK: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Dairy,
    Produce,
    Snacks,
    Meat,
    Pantry,
    Spices,
    Condiments,
    Frozen,
    Household,
    Other,
}

impl Category {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "Dairy" => Self::Dairy,
            "Produce" => Self::Produce,
            "Snacks" => Self::Snacks,
            "Meat" => Self::Meat,
            "Pantry" => Self::Pantry,
            "Spices" => Self::Spices,
            "Condiments" => Self::Condiments,
            "Frozen" => Self::Frozen,
            "Household" => Self::Household,
            _ => Self::Other,
        }
    }

    /// Whether the inventory offers quarter/half/all actions instead of "use one".
    pub fn is_portioned(self) -> bool {
        matches!(self, Self::Produce | Self::Pantry | Self::Dairy)
    }
}

pub fn usage_factor(people_count: u32) -> f64 {
    PER_PERSON_USAGE * f64::from(people_count)
}

pub fn deduction_for(category: &str, item_name: &str, people_count: u32) -> f64 {
    match Category::parse(category) {
        Category::Pantry | Category::Spices | Category::Condiments => usage_factor(people_count),
        // spinach wilts down, a meal never takes the whole bag
        Category::Produce if item_name.to_lowercase().contains("spinach") => {
            usage_factor(people_count)
        }
        Category::Meat | Category::Dairy => WHOLE_PACK,
        _ => WHOLE_PACK,
    }
}

pub fn usage_log(deduction: f64, item_name: &str) -> String {
    format!("Used {deduction:?} of {item_name}")
}
