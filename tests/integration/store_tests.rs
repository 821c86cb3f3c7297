use super::*;
use catalog_watcher::models::SnapshotDocument;
use catalog_watcher::{JsonFileStore, ProductRecord, Snapshot};

fn camera(id: &str, price: &str) -> ProductRecord {
    let mut record = ProductRecord::new(
        id,
        format!("Camera {}", id),
        price.parse().unwrap(),
        "AUD",
        format!("https://shop.example.com/products/{}", id),
    );
    record.original_price = Some("9999.99".parse().unwrap());
    record.image = Some(format!("https://shop.example.com/img/{}.jpg", id));
    record
}

#[test]
fn test_snapshot_document_layout() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("data/products_state.json");
    let store = JsonFileStore::new(&path);

    store.save(&Snapshot::from_records(vec![camera("2", "6554.05"), camera("1", "10")]).captured_now())?;

    let raw: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
    assert!(raw["captured_at"].is_string());
    let products = raw["products"].as_array().unwrap();
    assert_eq!(products.len(), 2);
    assert_eq!(products[0]["id"], "1");
    assert_eq!(products[1]["price"], "6554.05");
    assert_eq!(products[1]["original_price"], "9999.99");
    assert!(products[1].get("discount").is_none());
    Ok(())
}

#[test]
fn test_reads_hand_written_document() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("state.json");
    std::fs::write(
        &path,
        r#"{
            "captured_at": null,
            "products": [
                {"id": "A", "name": "Lens", "price": "249.95", "currency": "AUD",
                 "available": false, "url": "https://shop.example.com/products/A"}
            ]
        }"#,
    )?;

    let snapshot = JsonFileStore::new(&path).load()?;
    let lens = snapshot.get("A").unwrap();
    assert_eq!(lens.price.to_string(), "249.95");
    assert!(!lens.available);
    assert!(lens.original_price.is_none());
    assert!(snapshot.captured_at().is_none());
    Ok(())
}

#[test]
fn test_document_round_trip_keeps_order() {
    let snapshot = Snapshot::from_records(vec![camera("c", "3"), camera("a", "1"), camera("b", "2")]);
    let document = SnapshotDocument::from(&snapshot);
    let ids: Vec<_> = document.products.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);

    assert_eq!(Snapshot::from(document), snapshot);
}

#[tokio::test]
async fn test_shared_store_between_runs() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let store: Arc<dyn SnapshotStore> = Arc::new(JsonFileStore::new(dir.path().join("state.json")));

    let first = build_watcher(
        FakeFetcher::new().with_page(listing_page(&[("1", "One", "$10")])),
        Arc::clone(&store),
        RecordingChannel::new(),
    );
    assert!(first.run().await.is_success());

    let loaded = store.load()?;
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded.get("1").unwrap().url, "https://shop.example.com/products/1");
    assert_eq!(loaded.get("1").unwrap().image.as_deref(), Some("https://shop.example.com/img/1.jpg"));
    Ok(())
}
