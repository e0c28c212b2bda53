use anyhow::Context;
use bytes::Bytes;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    ai::{ReceiptScanner, ScannedItem},
    db::namespace_key,
    pantry::{quantity::{first_present, normalize_item}, repo::PantryStore, repo_types::{NewItem, PantryItem}},
    state::AppState,
};

pub const RECEIPT_URL_TTL_SECS: u64 = 30 * 60;

pub struct UploadItem<'a> {
    pub body: Bytes,
    pub content_type: &'a str,
}

pub(crate) fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        _ => None,
    }
}

pub(crate) fn receipt_key(username: &str, ext: &str) -> String {
    format!("receipts/{}/{}.{}", namespace_key(username), Uuid::new_v4(), ext)
}

/// Stores the image under the user's receipt prefix and returns its object key.
pub async fn store_receipt_image(
    st: &AppState,
    username: &str,
    upload: &UploadItem<'_>,
) -> anyhow::Result<String> {
    let ext = ext_from_mime(upload.content_type)
        .with_context(|| format!("unsupported receipt type {}", upload.content_type))?;
    let key = receipt_key(username, ext);
    st.storage
        .put_object(&key, upload.body.clone(), upload.content_type)
        .await
        .with_context(|| format!("put_object {}", key))?;
    Ok(key)
}

/// Runs the vision model; any failure is logged and reads as "nothing found".
pub async fn scan_receipt(scanner: &dyn ReceiptScanner, upload: &UploadItem<'_>) -> Vec<ScannedItem> {
    match scanner
        .scan_receipt(upload.body.clone(), upload.content_type)
        .await
    {
        Ok(items) => items,
        Err(e) => {
            error!(error = %e, transient = e.is_transient(), "receipt scan failed");
            Vec::new()
        }
    }
}

impl From<ScannedItem> for NewItem {
    fn from(item: ScannedItem) -> Self {
        let name = first_present([item.clean_name, item.name]);
        normalize_item(name, item.category, item.quantity.as_ref(), item.unit)
    }
}

/// Scans the receipt and merges what was read into the pantry.
/// Returns `None`, leaving the pantry untouched, when nothing could be read.
pub async fn ingest_receipt(
    scanner: &dyn ReceiptScanner,
    store: &PantryStore,
    upload: &UploadItem<'_>,
) -> anyhow::Result<Option<Vec<PantryItem>>> {
    let scanned = scan_receipt(scanner, upload).await;
    if scanned.is_empty() {
        warn!("no items read from receipt");
        return Ok(None);
    }
    let items: Vec<NewItem> = scanned.into_iter().map(NewItem::from).collect();
    let merged = store.upsert_items(&items).await?;
    info!(count = merged.len(), "receipt merged into pantry");
    Ok(Some(merged))
}

#[cfg(test)]
mod receipt_tests {
    use super::*;
    use crate::{
        pantry::repo::tests::temp_store,
        state::testing::{FakeScanner, FakeStorage},
    };
    use serde_json::json;

    fn upload() -> UploadItem<'static> {
        UploadItem {
            body: Bytes::from_static(b"\x89PNG fake"),
            content_type: "image/png",
        }
    }

    #[test]
    fn test_ext_from_mime() {
        assert_eq!(ext_from_mime("image/jpeg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/jpg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/png"), Some("png"));
        assert_eq!(ext_from_mime("image/webp"), None);
        assert_eq!(ext_from_mime("application/octet-stream"), None);
    }

    #[test]
    fn keys_live_under_the_namespace() {
        let key = receipt_key(" Chef ", "png");
        assert!(key.starts_with("receipts/chef/"));
        assert!(key.ends_with(".png"));
    }

    #[tokio::test]
    async fn scanned_items_merge_with_defaults() {
        let store = temp_store().await;
        let scanner = FakeScanner::new(vec![
            ScannedItem {
                clean_name: Some("Basmati Rice".into()),
                category: Some("Pantry".into()),
                quantity: Some(json!("2 bags")),
                unit: Some("bag".into()),
                ..Default::default()
            },
            ScannedItem {
                clean_name: Some("  ".into()),
                name: Some("Basmati Rice".into()),
                quantity: Some(json!(1)),
                ..Default::default()
            },
            ScannedItem::default(),
        ]);

        let merged = ingest_receipt(&scanner, &store, &upload())
            .await
            .unwrap()
            .expect("items read");
        assert_eq!(merged.len(), 3);

        let stock = store.list_in_stock().await.unwrap();
        assert_eq!(stock.len(), 2);
        let rice = stock.iter().find(|i| i.item_name == "Basmati Rice").unwrap();
        assert_eq!(rice.quantity, 3.0);
        let unknown = stock.iter().find(|i| i.item_name == "Unknown Item").unwrap();
        assert_eq!(unknown.category, "Pantry");
        assert_eq!(unknown.quantity, 1.0);
    }

    #[tokio::test]
    async fn failed_scan_writes_nothing() {
        let store = temp_store().await;
        let scanner = FakeScanner::failing();
        assert!(ingest_receipt(&scanner, &store, &upload()).await.unwrap().is_none());
        assert!(store.list_in_stock().await.unwrap().is_empty());
        assert!(store.list_restock_needed().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn image_is_stored_per_user() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FakeStorage::default();
        let state = crate::state::testing::fake_state(dir.path(), storage.clone(), vec![], vec![]).await;

        let key = store_receipt_image(&state, "Chef", &upload()).await.unwrap();
        assert!(key.starts_with("receipts/chef/"));
        assert_eq!(storage.keys(), vec![key]);

        let bad = UploadItem {
            body: Bytes::from_static(b"GIF89a"),
            content_type: "image/gif",
        };
        assert!(store_receipt_image(&state, "chef", &bad).await.is_err());
    }
}
