use anyhow::Context;
use sqlx::SqlitePool;
use time::OffsetDateTime;

use super::repo_types::{NewItem, PantryItem};

/// Rows at or below this quantity count as out of stock.
pub const STOCK_THRESHOLD: f64 = 0.05;

const ITEM_COLUMNS: &str = "id, item_name, category, quantity, unit, last_updated";

/// One user's pantry database.
#[derive(Clone)]
pub struct PantryStore {
    pool: SqlitePool,
}

impl PantryStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Merges items by exact name: an existing row gains the quantity, otherwise a row is inserted.
    pub async fn upsert_items(&self, items: &[NewItem]) -> anyhow::Result<Vec<PantryItem>> {
        let mut touched = Vec::with_capacity(items.len());
        for item in items {
            let now = OffsetDateTime::now_utc();
            let existing = sqlx::query_as::<_, (i64,)>(
                r#"
                SELECT id
                FROM pantry
                WHERE item_name = ?
                ORDER BY id
                LIMIT 1
                "#,
            )
            .bind(&item.name)
            .fetch_all(&self.pool)
            .await
            .context("look up pantry item by name")?
            .into_iter()
            .next();

            let row = match existing {
                Some((id,)) => sqlx::query_as::<_, PantryItem>(&format!(
                    r#"
                    UPDATE pantry
                    SET quantity = MAX(quantity + ?, 0.0), last_updated = ?
                    WHERE id = ?
                    RETURNING {ITEM_COLUMNS}
                    "#
                ))
                .bind(item.quantity)
                .bind(now)
                .bind(id)
                .fetch_all(&self.pool)
                .await
                .context("merge pantry item")?,
                None => sqlx::query_as::<_, PantryItem>(&format!(
                    r#"
                    INSERT INTO pantry (item_name, category, quantity, unit, last_updated)
                    VALUES (?, ?, ?, ?, ?)
                    RETURNING {ITEM_COLUMNS}
                    "#
                ))
                .bind(&item.name)
                .bind(&item.category)
                .bind(item.quantity.max(0.0))
                .bind(&item.unit)
                .bind(now)
                .fetch_all(&self.pool)
                .await
                .context("insert pantry item")?,
            };
            touched.push(single_row(row).context("upsert returned no row")?);
        }
        Ok(touched)
    }

    pub async fn list_in_stock(&self) -> anyhow::Result<Vec<PantryItem>> {
        let rows = sqlx::query_as::<_, PantryItem>(&format!(
            r#"
            SELECT {ITEM_COLUMNS}
            FROM pantry
            WHERE quantity > ?
            ORDER BY category, item_name
            "#
        ))
        .bind(STOCK_THRESHOLD)
        .fetch_all(&self.pool)
        .await
        .context("list in-stock items")?;
        Ok(rows)
    }

    pub async fn list_restock_needed(&self) -> anyhow::Result<Vec<PantryItem>> {
        let rows = sqlx::query_as::<_, PantryItem>(&format!(
            r#"
            SELECT {ITEM_COLUMNS}
            FROM pantry
            WHERE quantity <= ?
            ORDER BY category, item_name
            "#
        ))
        .bind(STOCK_THRESHOLD)
        .fetch_all(&self.pool)
        .await
        .context("list restock candidates")?;
        Ok(rows)
    }

    pub async fn get_item(&self, id: i64) -> anyhow::Result<Option<PantryItem>> {
        let row = sqlx::query_as::<_, PantryItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM pantry WHERE id = ?"
        ))
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .context("get pantry item")?;
        Ok(single_row(row))
    }

    /// Applies `delta`, clamping the stored quantity at zero. `None` when the id is unknown.
    pub async fn adjust_quantity(&self, id: i64, delta: f64) -> anyhow::Result<Option<PantryItem>> {
        let row = sqlx::query_as::<_, PantryItem>(&format!(
            r#"
            UPDATE pantry
            SET quantity = MAX(quantity + ?, 0.0), last_updated = ?
            WHERE id = ?
            RETURNING {ITEM_COLUMNS}
            "#
        ))
        .bind(delta)
        .bind(OffsetDateTime::now_utc())
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .context("adjust pantry quantity")?;
        Ok(single_row(row))
    }

    pub async fn set_quantity(&self, id: i64, quantity: f64) -> anyhow::Result<()> {
        sqlx::query("UPDATE pantry SET quantity = ?, last_updated = ? WHERE id = ?")
            .bind(quantity.max(0.0))
            .bind(OffsetDateTime::now_utc())
            .bind(id)
            .execute(&self.pool)
            .await
            .context("set pantry quantity")?;
        Ok(())
    }

    /// Oldest row with some stock left whose name contains `fragment` (ASCII case-insensitive).
    pub async fn find_first_match(&self, fragment: &str) -> anyhow::Result<Option<PantryItem>> {
        let row = sqlx::query_as::<_, PantryItem>(&format!(
            r#"
            SELECT {ITEM_COLUMNS}
            FROM pantry
            WHERE item_name LIKE ? ESCAPE '\' AND quantity > 0
            ORDER BY id
            LIMIT 1
            "#
        ))
        .bind(like_pattern(fragment))
        .fetch_all(&self.pool)
        .await
        .context("match ingredient")?;
        Ok(single_row(row))
    }
}

/// Single-row statements go through `fetch_all` so SQLite steps them to completion
/// and commits before the connection returns to the pool.
fn single_row<T>(rows: Vec<T>) -> Option<T> {
    rows.into_iter().next()
}

fn like_pattern(fragment: &str) -> String {
    let mut pattern = String::with_capacity(fragment.len() + 2);
    pattern.push('%');
    for c in fragment.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}
