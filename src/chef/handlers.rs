use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use tracing::{info, instrument};

use crate::{
    app::internal,
    auth::extractors::AuthUser,
    pantry::services::deduct_ingredients,
    state::AppState,
};

use super::{
    dto::{CookedRequest, CookedResponse, SuggestRequest, SuggestResponse},
    services::{build_recipe_request, local_now, meal_type_for_hour, people_or_default, suggest},
};

pub fn chef_routes() -> Router<AppState> {
    Router::new()
        .route("/chef/suggestions", post(suggest_recipes))
        .route("/chef/cooked", post(cooked))
}

#[instrument(skip(state))]
pub async fn suggest_recipes(
    State(state): State<AppState>,
    AuthUser(username): AuthUser,
    Json(body): Json<SuggestRequest>,
) -> Result<Json<SuggestResponse>, (StatusCode, String)> {
    let people_count = people_or_default(body.people_count).map_err(|e| (StatusCode::BAD_REQUEST, e))?;
    let now = local_now();
    let meal_type = body.meal_type.unwrap_or_else(|| meal_type_for_hour(now.hour()));
    let pace = body.pace.unwrap_or_default();

    let store = state.pantries.open(&username).await.map_err(internal)?;
    let inventory = store.list_in_stock().await.map_err(internal)?;
    if inventory.is_empty() {
        return Err((StatusCode::CONFLICT, "Pantry is empty.".into()));
    }

    let request = build_recipe_request(&inventory, meal_type, pace, people_count, now);
    let recipes = suggest(state.chef.as_ref(), &request).await;
    if recipes.is_empty() {
        return Err((
            StatusCode::BAD_GATEWAY,
            "The chef could not come up with recipes right now.".into(),
        ));
    }

    info!(%username, %meal_type, count = recipes.len(), "recipes suggested");
    Ok(Json(SuggestResponse {
        meal_type,
        pace,
        people_count,
        recipes,
    }))
}

#[instrument(skip(state))]
pub async fn cooked(
    State(state): State<AppState>,
    AuthUser(username): AuthUser,
    Json(body): Json<CookedRequest>,
) -> Result<Json<CookedResponse>, (StatusCode, String)> {
    let people_count = people_or_default(body.people_count).map_err(|e| (StatusCode::BAD_REQUEST, e))?;
    let store = state.pantries.open(&username).await.map_err(internal)?;
    let logs = deduct_ingredients(&store, &body.used_ingredients, people_count)
        .await
        .map_err(internal)?;
    info!(%username, deducted = logs.len(), "recipe cooked");
    Ok(Json(CookedResponse { logs }))
}
