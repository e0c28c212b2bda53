use super::RecipeRequest;

pub const RECEIPT_PROMPT: &str = r#"Read this grocery receipt and list every purchased item.
Give each item a clean, human-readable name and put it in exactly one category:
- Dairy: milk, cheese, butter, yogurt
- Produce: fruit, vegetables, spinach
- Snacks: chips, nuts, crackers (never refrigerated)
- Meat: chicken, beef, pork, fish
- Pantry: rice, pasta, oil, bread, flour
- Spices: salt, pepper, dried herbs
- Condiments: sauces, ketchup, mustard
- Frozen: ice cream, frozen meals
- Household: paper towels, soap, cleaning supplies

Answer with JSON only, shaped like:
{"items": [{"clean_name": "Basmati Rice", "category": "Pantry", "quantity": 1, "unit": "bag"}]}"#;

pub fn recipe_prompt(req: &RecipeRequest) -> String {
    format!(
        r#"You are a home chef planning a meal for {people} people.
Ingredients on hand: {ingredients}.
Always available staples: {staples}.
Meal: {context}.

Suggest 5 recipes scaled for {people} people that mostly use the ingredients on hand.
List in "used_ingredients" only names taken from the ingredients on hand.

Answer with JSON only, shaped like:
{{"recipes": [{{"name": "Recipe Name", "time_minutes": 20, "description": "One sentence.", "used_ingredients": ["Rice", "Spinach"], "steps": ["Step 1", "Step 2"]}}]}}"#,
        people = req.people_count,
        ingredients = req.ingredients.join(", "),
        staples = req.staples.join(", "),
        context = req.meal_context,
    )
}
