use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    app::internal,
    auth::extractors::AuthUser,
    state::AppState,
};

use super::{
    dto::{AddItemsRequest, AdjustRequest, InventoryResponse, ItemsResponse, UseRequest},
    repo_types::{NewItem, PantryItem},
    services::{adjust_item as apply_adjustment, group_by_category, PantryError, RESTOCK_DELTA},
};

pub fn pantry_routes() -> Router<AppState> {
    Router::new()
        .route("/pantry/inventory", get(inventory))
        .route("/pantry/restock", get(restock_list))
        .route("/pantry/items", post(add_items))
        .route("/pantry/items/:id", get(get_item).patch(adjust_item))
        .route("/pantry/items/:id/use", post(use_item))
        .route("/pantry/items/:id/restock", post(restock_item))
}

#[instrument(skip(state))]
pub async fn inventory(
    State(state): State<AppState>,
    AuthUser(username): AuthUser,
) -> Result<Json<InventoryResponse>, (StatusCode, String)> {
    let store = state.pantries.open(&username).await.map_err(internal)?;
    let items = store.list_in_stock().await.map_err(internal)?;
    Ok(Json(InventoryResponse {
        categories: group_by_category(items),
    }))
}

#[instrument(skip(state))]
pub async fn restock_list(
    State(state): State<AppState>,
    AuthUser(username): AuthUser,
) -> Result<Json<ItemsResponse>, (StatusCode, String)> {
    let store = state.pantries.open(&username).await.map_err(internal)?;
    let items = store.list_restock_needed().await.map_err(internal)?;
    Ok(Json(ItemsResponse { items }))
}

#[instrument(skip(state, body))]
pub async fn add_items(
    State(state): State<AppState>,
    AuthUser(username): AuthUser,
    Json(body): Json<AddItemsRequest>,
) -> Result<(StatusCode, Json<ItemsResponse>), (StatusCode, String)> {
    if body.items.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "items must be non-empty".into()));
    }
    let items: Vec<NewItem> = body.items.into_iter().map(NewItem::from).collect();

    let store = state.pantries.open(&username).await.map_err(internal)?;
    let items = store.upsert_items(&items).await.map_err(internal)?;
    info!(%username, count = items.len(), "items added manually");
    Ok((StatusCode::CREATED, Json(ItemsResponse { items })))
}

#[instrument(skip(state))]
pub async fn get_item(
    State(state): State<AppState>,
    AuthUser(username): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<PantryItem>, (StatusCode, String)> {
    let store = state.pantries.open(&username).await.map_err(internal)?;
    store
        .get_item(id)
        .await
        .map_err(internal)?
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "Item not found".into()))
}

#[instrument(skip(state))]
pub async fn adjust_item(
    State(state): State<AppState>,
    AuthUser(username): AuthUser,
    Path(id): Path<i64>,
    Json(body): Json<AdjustRequest>,
) -> Result<Json<PantryItem>, (StatusCode, String)> {
    apply_delta(&state, &username, id, body.delta).await
}

#[instrument(skip(state))]
pub async fn use_item(
    State(state): State<AppState>,
    AuthUser(username): AuthUser,
    Path(id): Path<i64>,
    Json(body): Json<UseRequest>,
) -> Result<Json<PantryItem>, (StatusCode, String)> {
    apply_delta(&state, &username, id, body.action.delta()).await
}

#[instrument(skip(state))]
pub async fn restock_item(
    State(state): State<AppState>,
    AuthUser(username): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<PantryItem>, (StatusCode, String)> {
    apply_delta(&state, &username, id, RESTOCK_DELTA).await
}

async fn apply_delta(
    state: &AppState,
    username: &str,
    id: i64,
    delta: f64,
) -> Result<Json<PantryItem>, (StatusCode, String)> {
    let store = state.pantries.open(username).await.map_err(internal)?;
    match apply_adjustment(&store, id, delta).await {
        Ok(item) => Ok(Json(item)),
        Err(e @ PantryError::NotFound) => {
            warn!(%username, id, "adjust unknown pantry item");
            Err((StatusCode::NOT_FOUND, e.to_string()))
        }
        Err(e @ PantryError::InvalidDelta) => Err((StatusCode::BAD_REQUEST, e.to_string())),
        Err(PantryError::Internal(e)) => Err(internal(e)),
    }
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::state::testing::{bearer_for, test_app};

    async fn call(
        app: &axum::Router,
        method: Method,
        uri: &str,
        token: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut req = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"));
        let body = match body {
            Some(v) => {
                req = req.header(header::CONTENT_TYPE, "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };
        let res = app.clone().oneshot(req.body(body).unwrap()).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn inventory_round_trip_through_http() {
        let (app, state, _dir) = test_app(vec![], vec![]).await;
        let token = bearer_for(&state, "chef");

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/v1/pantry/items",
            &token,
            Some(json!({"items": [
                {"name": "Rice", "category": "Pantry", "quantity": 2, "unit": "bag"},
                {"name": "Rice", "quantity": "1"},
                {"name": "Chicken", "category": "Meat", "quantity": "two packs"}
            ]})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["items"][1]["quantity"], 3.0);
        let chicken_id = body["items"][2]["id"].as_i64().unwrap();
        assert_eq!(body["items"][2]["quantity"], 1.0);

        let (status, body) = call(&app, Method::GET, "/api/v1/pantry/inventory", &token, None).await;
        assert_eq!(status, StatusCode::OK);
        let categories = body["categories"].as_array().unwrap();
        assert_eq!(categories.len(), 2);
        assert_eq!(categories[0]["category"], "Meat");
        assert_eq!(categories[1]["items"][0]["quick_actions"], json!(["quarter", "half", "all"]));

        let uri = format!("/api/v1/pantry/items/{chicken_id}/use");
        let (status, body) = call(&app, Method::POST, &uri, &token, Some(json!({"action": "use_one"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["quantity"], 0.0);

        let (_, body) = call(&app, Method::GET, "/api/v1/pantry/restock", &token, None).await;
        assert_eq!(body["items"][0]["item_name"], "Chicken");

        let uri = format!("/api/v1/pantry/items/{chicken_id}/restock");
        let (_, body) = call(&app, Method::POST, &uri, &token, None).await;
        assert_eq!(body["quantity"], 1.0);

        let uri = format!("/api/v1/pantry/items/{chicken_id}");
        let (_, body) = call(&app, Method::PATCH, &uri, &token, Some(json!({"delta": -100.0}))).await;
        assert_eq!(body["quantity"], 0.0);

        let (status, body) = call(&app, Method::GET, &uri, &token, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["item_name"], "Chicken");
        assert!(body["last_updated"].as_str().is_some());
    }

    #[tokio::test]
    async fn unknown_item_is_not_found() {
        let (app, state, _dir) = test_app(vec![], vec![]).await;
        let token = bearer_for(&state, "chef");
        let (status, _) = call(
            &app,
            Method::PATCH,
            "/api/v1/pantry/items/999",
            &token,
            Some(json!({"delta": 1.0})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = call(&app, Method::GET, "/api/v1/pantry/items/999", &token, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn pantry_requires_a_token() {
        let (app, _state, _dir) = test_app(vec![], vec![]).await;
        let (status, _) = call(&app, Method::GET, "/api/v1/pantry/inventory", "garbage", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
