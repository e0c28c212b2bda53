use time::OffsetDateTime;
use tracing::{error, warn};

use super::dto::{MealType, Pace};
use crate::{
    ai::{Recipe, RecipeChef, RecipeRequest},
    pantry::{repo_types::PantryItem, rules::DEFAULT_PEOPLE},
};

pub const STAPLES: [&str; 4] = ["Salt", "Pepper", "Oil", "Sugar"];
pub const MAX_PEOPLE: u32 = 10;

pub fn meal_type_for_hour(hour: u8) -> MealType {
    match hour {
        5..=10 => MealType::Breakfast,
        11..=15 => MealType::Lunch,
        16..=21 => MealType::Dinner,
        _ => MealType::Snack,
    }
}

/// Local wall-clock time, falling back to UTC when the offset cannot be determined.
pub fn local_now() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

pub fn people_or_default(people: Option<u32>) -> Result<u32, String> {
    match people.unwrap_or(DEFAULT_PEOPLE) {
        n @ 1..=MAX_PEOPLE => Ok(n),
        _ => Err(format!("people_count must be between 1 and {MAX_PEOPLE}")),
    }
}

pub fn build_recipe_request(
    inventory: &[PantryItem],
    meal: MealType,
    pace: Pace,
    people_count: u32,
    now: OffsetDateTime,
) -> RecipeRequest {
    RecipeRequest {
        ingredients: inventory.iter().map(|i| i.item_name.clone()).collect(),
        staples: STAPLES.iter().map(|s| s.to_string()).collect(),
        meal_context: format!(
            "{meal} with {pace} to cook, local time {:02}:{:02}",
            now.hour(),
            now.minute()
        ),
        people_count,
    }
}

/// Asks the recipe service; a failure is logged and yields no recipes.
pub async fn suggest(chef: &dyn RecipeChef, request: &RecipeRequest) -> Vec<Recipe> {
    match chef.suggest_recipes(request).await {
        Ok(recipes) => {
            if recipes.is_empty() {
                warn!("recipe service returned no recipes");
            }
            recipes
        }
        Err(e) => {
            error!(error = %e, transient = e.is_transient(), "recipe suggestion failed");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::testing::FakeChef;
    use time::macros::datetime;

    fn item(name: &str) -> PantryItem {
        PantryItem {
            id: 1,
            item_name: name.into(),
            category: "Pantry".into(),
            quantity: 1.0,
            unit: "bag".into(),
            last_updated: datetime!(2026-01-01 0:00 UTC),
        }
    }

    #[test]
    fn meal_follows_the_clock() {
        assert_eq!(meal_type_for_hour(4), MealType::Snack);
        assert_eq!(meal_type_for_hour(5), MealType::Breakfast);
        assert_eq!(meal_type_for_hour(10), MealType::Breakfast);
        assert_eq!(meal_type_for_hour(11), MealType::Lunch);
        assert_eq!(meal_type_for_hour(16), MealType::Dinner);
        assert_eq!(meal_type_for_hour(21), MealType::Dinner);
        assert_eq!(meal_type_for_hour(22), MealType::Snack);
    }

    #[test]
    fn party_size_is_bounded() {
        assert_eq!(people_or_default(None), Ok(2));
        assert_eq!(people_or_default(Some(10)), Ok(10));
        assert!(people_or_default(Some(0)).is_err());
        assert!(people_or_default(Some(11)).is_err());
    }

    #[test]
    fn request_carries_inventory_and_context() {
        let req = build_recipe_request(
            &[item("Rice"), item("Spinach")],
            MealType::Dinner,
            Pace::Hour,
            4,
            datetime!(2026-10-14 18:05 UTC),
        );
        assert_eq!(req.ingredients, ["Rice", "Spinach"]);
        assert_eq!(req.staples, ["Salt", "Pepper", "Oil", "Sugar"]);
        assert_eq!(req.meal_context, "Dinner with 1 hour to cook, local time 18:05");
        assert_eq!(req.people_count, 4);
    }

    #[tokio::test]
    async fn failures_collapse_to_no_recipes() {
        let req = build_recipe_request(&[item("Rice")], MealType::Lunch, Pace::Quick, 2, local_now());
        assert!(suggest(&FakeChef::failing(), &req).await.is_empty());

        let chef = FakeChef::new(vec![Recipe {
            name: "Fried Rice".into(),
            ..Default::default()
        }]);
        assert_eq!(suggest(&chef, &req).await.len(), 1);
    }
}
