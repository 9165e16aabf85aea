//! Ledger behaviour against a real SQLite database.

use std::collections::HashSet;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use bomledger_inventory::{
    Currency, DeviceStatus, DeviceType, NewPurchase, ProductionRequest, ShipmentRequest, Shortfall,
};
use bomledger_store::{BomSeed, InventoryLedger, LedgerConfig, LedgerError};

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
}

async fn ledger() -> InventoryLedger {
    InventoryLedger::open(&LedgerConfig::in_memory())
        .await
        .expect("failed to open in-memory ledger")
}

/// VH needs 2 Coil + 1 Case; stock starts at 5 Coil, 3 Case.
async fn vh_ledger() -> InventoryLedger {
    let ledger = ledger().await;
    let seed: BomSeed = serde_json::from_str(
        r#"{ "requirements": { "VH": { "Coil": 2, "Case": 1 } }, "stock": { "Coil": 5, "Case": 3 } }"#,
    )
    .unwrap();
    ledger.apply_seed(&seed).await.unwrap();
    ledger
}

fn production(device_type: DeviceType, quantity: i64) -> ProductionRequest {
    ProductionRequest {
        device_type,
        production_date: day(1),
        calibration_date: day(2),
        location: "Shelf A".to_string(),
        quantity,
    }
}

fn purchase(item: &str, quantity: i64, currency: &str) -> NewPurchase {
    NewPurchase {
        date: day(3),
        buyer: "Dana".to_string(),
        item_name: item.to_string(),
        quantity,
        price: dec!(4.25),
        currency: currency.to_string(),
        tax: dec!(0.55),
        url: "https://parts.example/item".to_string(),
    }
}

fn shipment(device_type: DeviceType, quantity: i64, destination: &str) -> ShipmentRequest {
    ShipmentRequest {
        device_type,
        quantity,
        destination: destination.to_string(),
    }
}

#[tokio::test]
async fn short_coil_blocks_production_until_purchase() {
    let ledger = vh_ledger().await;

    let err = ledger
        .produce_devices(production(DeviceType::Vh, 3))
        .await
        .unwrap_err();
    match err {
        LedgerError::InsufficientMaterials(shortfalls) => assert_eq!(
            shortfalls,
            vec![Shortfall {
                item_name: "Coil".to_string(),
                available: 5,
                required: 6,
            }]
        ),
        other => panic!("expected insufficient materials, got {other:?}"),
    }

    let stock = ledger.list_stock().await.unwrap();
    assert_eq!(stock["Coil"], 5);
    assert_eq!(stock["Case"], 3);
    assert!(ledger.list_devices(None, None).await.unwrap().is_empty());

    ledger.record_purchase(purchase("Coil", 3, "CAD")).await.unwrap();

    let report = ledger
        .produce_devices(production(DeviceType::Vh, 3))
        .await
        .unwrap();
    assert_eq!(report.units_created(), 3);
    assert_eq!(report.requested, 3);

    let stock = ledger.list_stock().await.unwrap();
    assert_eq!(stock["Coil"], 2);
    assert_eq!(stock["Case"], 0);
    assert_eq!(ledger.list_devices(None, None).await.unwrap().len(), 3);
}

#[tokio::test]
async fn every_short_item_is_reported_and_nothing_changes() {
    let ledger = vh_ledger().await;

    let err = ledger
        .produce_devices(production(DeviceType::Vh, 4))
        .await
        .unwrap_err();
    let LedgerError::InsufficientMaterials(shortfalls) = err else {
        panic!("expected insufficient materials");
    };
    let mut names: Vec<_> = shortfalls.iter().map(|s| s.item_name.clone()).collect();
    names.sort();
    assert_eq!(names, vec!["Case", "Coil"]);

    let stock = ledger.list_stock().await.unwrap();
    assert_eq!((stock["Coil"], stock["Case"]), (5, 3));
    assert!(ledger.list_devices(None, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn production_deducts_exactly_and_creates_distinct_in_stock_units() {
    let ledger = vh_ledger().await;

    let report = ledger
        .produce_devices(production(DeviceType::Vh, 2))
        .await
        .unwrap();

    let stock = ledger.list_stock().await.unwrap();
    assert_eq!(stock["Coil"], 1);
    assert_eq!(stock["Case"], 1);

    let devices = ledger.list_devices(Some(DeviceType::Vh), None).await.unwrap();
    assert_eq!(devices.len(), 2);
    assert!(devices.iter().all(|d| d.status == DeviceStatus::InStock));
    assert!(devices.iter().all(|d| d.location == "Shelf A"));

    let ids: HashSet<_> = devices.iter().map(|d| d.id.clone()).collect();
    assert_eq!(ids.len(), 2);
    assert_eq!(ids, report.created.iter().cloned().collect::<HashSet<_>>());
}

#[tokio::test]
async fn identifiers_stay_unique_across_batches() {
    let ledger = vh_ledger().await;
    ledger.record_purchase(purchase("Coil", 20, "USD")).await.unwrap();
    ledger.record_purchase(purchase("Case", 10, "USD")).await.unwrap();

    let first = ledger.produce_devices(production(DeviceType::Vh, 3)).await.unwrap();
    let second = ledger.produce_devices(production(DeviceType::Vh, 3)).await.unwrap();
    assert!(second.batch > first.batch);

    let all: HashSet<_> = first.created.iter().chain(&second.created).collect();
    assert_eq!(all.len(), 6);
}

#[tokio::test]
async fn invalid_production_requests_are_rejected() {
    let ledger = vh_ledger().await;

    let err = ledger
        .produce_devices(production(DeviceType::Vh, 0))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Validation(_)));

    let err = ledger
        .produce_devices(production(DeviceType::Vp, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Validation(msg) if msg.contains("no requirements")));
}

#[tokio::test]
async fn buildable_units_are_always_producible() {
    let ledger = vh_ledger().await;

    let buildable = ledger
        .calculate_buildable_units(DeviceType::Vh)
        .await
        .unwrap()
        .buildable;
    assert_eq!(buildable, Some(2));

    ledger
        .produce_devices(production(DeviceType::Vh, 2))
        .await
        .unwrap();

    let after = ledger
        .calculate_buildable_units(DeviceType::Vh)
        .await
        .unwrap();
    assert_eq!(after.buildable, Some(0));
    assert!(ledger.produce_devices(production(DeviceType::Vh, 1)).await.is_err());
}

#[tokio::test]
async fn unconfigured_type_cannot_be_built() {
    let ledger = vh_ledger().await;

    let overview = ledger.buildable_overview().await.unwrap();
    assert_eq!(overview.len(), 2);
    let vp = overview
        .iter()
        .find(|b| b.device_type == DeviceType::Vp)
        .unwrap();
    assert_eq!(vp.buildable, None);
}

#[tokio::test]
async fn shared_pool_is_consumed_by_every_device_type() {
    let ledger = vh_ledger().await;
    ledger
        .configure_requirement(DeviceType::Vp, "Coil", 1)
        .await
        .unwrap();

    ledger
        .produce_devices(production(DeviceType::Vp, 4))
        .await
        .unwrap();

    let vh = ledger
        .calculate_buildable_units(DeviceType::Vh)
        .await
        .unwrap();
    assert_eq!(vh.buildable, Some(0));
    assert_eq!(ledger.list_stock().await.unwrap()["Coil"], 1);
}

#[tokio::test]
async fn shipment_without_enough_units_changes_nothing() {
    let ledger = vh_ledger().await;
    ledger
        .produce_devices(production(DeviceType::Vh, 1))
        .await
        .unwrap();

    let err = ledger
        .log_shipment(shipment(DeviceType::Vh, 2, "Calgary"))
        .await
        .unwrap_err();
    match err {
        LedgerError::InsufficientUnits {
            available,
            requested,
            ..
        } => assert_eq!((available, requested), (1, 2)),
        other => panic!("expected insufficient units, got {other:?}"),
    }

    let devices = ledger.list_devices(None, None).await.unwrap();
    assert!(devices.iter().all(|d| d.status == DeviceStatus::InStock));
    assert!(ledger.get_shipment_history().await.unwrap().is_empty());
}

#[tokio::test]
async fn shipment_flips_exactly_the_requested_units() {
    let ledger = vh_ledger().await;
    ledger
        .configure_requirement(DeviceType::Vp, "Case", 1)
        .await
        .unwrap();
    ledger
        .produce_devices(production(DeviceType::Vh, 2))
        .await
        .unwrap();
    ledger
        .produce_devices(production(DeviceType::Vp, 1))
        .await
        .unwrap();

    let report = ledger
        .log_shipment_on(shipment(DeviceType::Vh, 1, "Calgary"), day(20))
        .await
        .unwrap();
    assert_eq!(report.shipped.len(), 1);
    assert_eq!(report.shipment.quantity, 1);

    let shipped = ledger
        .list_devices(None, Some(DeviceStatus::Shipped))
        .await
        .unwrap();
    assert_eq!(shipped.len(), 1);
    assert_eq!(shipped[0].device_type, DeviceType::Vh);
    assert_eq!(shipped[0].location, "Calgary");
    assert_eq!(shipped[0].id, report.shipped[0]);

    let in_stock_vp = ledger
        .list_devices(Some(DeviceType::Vp), Some(DeviceStatus::InStock))
        .await
        .unwrap();
    assert_eq!(in_stock_vp.len(), 1);

    let history = ledger.get_shipment_history().await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].shipped_on, day(20));
    assert_eq!(history[0].destination, "Calgary");

    // The remaining VH unit ships next; the first one is never picked twice.
    let second = ledger
        .log_shipment_on(shipment(DeviceType::Vh, 1, "Regina"), day(21))
        .await
        .unwrap();
    assert_ne!(second.shipped[0], report.shipped[0]);
    assert!(
        ledger
            .log_shipment(shipment(DeviceType::Vh, 1, "Regina"))
            .await
            .is_err()
    );
}

#[tokio::test]
async fn shipment_history_is_newest_first() {
    let ledger = vh_ledger().await;
    ledger
        .produce_devices(production(DeviceType::Vh, 2))
        .await
        .unwrap();

    ledger
        .log_shipment_on(shipment(DeviceType::Vh, 1, "Early"), day(5))
        .await
        .unwrap();
    ledger
        .log_shipment_on(shipment(DeviceType::Vh, 1, "Late"), day(9))
        .await
        .unwrap();

    let history = ledger.get_shipment_history().await.unwrap();
    let destinations: Vec<_> = history.iter().map(|s| s.destination.as_str()).collect();
    assert_eq!(destinations, vec!["Late", "Early"]);
}

#[tokio::test]
async fn purchase_adds_stock_and_appends_one_row() {
    let ledger = vh_ledger().await;

    let recorded = ledger.record_purchase(purchase("Case", 7, "USD")).await.unwrap();
    assert_eq!(recorded.currency, Currency::Usd);
    assert_eq!(ledger.list_stock().await.unwrap()["Case"], 10);

    let history = ledger.purchase_history().await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].price, dec!(4.25));
    assert_eq!(history[0].tax, dec!(0.55));
    assert_eq!(history[0].item_name, "Case");
}

#[tokio::test]
async fn unsupported_currency_leaves_totals_unchanged() {
    let ledger = vh_ledger().await;

    let err = ledger
        .record_purchase(purchase("Coil", 4, "EUR"))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Validation(msg) if msg.contains("EUR")));

    let mut negative = purchase("Coil", 4, "CAD");
    negative.price = Decimal::NEGATIVE_ONE;
    assert!(ledger.record_purchase(negative).await.is_err());

    assert_eq!(ledger.list_stock().await.unwrap()["Coil"], 5);
    assert!(ledger.purchase_history().await.unwrap().is_empty());
}

#[tokio::test]
async fn purchase_that_would_overflow_a_pool_is_rejected() {
    let ledger = vh_ledger().await;

    let err = ledger
        .record_purchase(purchase("Coil", i64::MAX, "CAD"))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Validation(msg) if msg.contains("overflow")));
    assert_eq!(ledger.list_stock().await.unwrap()["Coil"], 5);
    assert!(ledger.purchase_history().await.unwrap().is_empty());

    ledger
        .record_purchase(purchase("Coil", i64::MAX - 5, "CAD"))
        .await
        .unwrap();
    assert_eq!(ledger.list_stock().await.unwrap()["Coil"], i64::MAX);
    assert_eq!(
        ledger
            .calculate_buildable_units(DeviceType::Vh)
            .await
            .unwrap()
            .buildable,
        Some(3)
    );
}

#[tokio::test]
async fn production_whose_requirement_overflows_is_a_validation_error() {
    let ledger = vh_ledger().await;
    ledger
        .configure_requirement(DeviceType::Vh, "Coil", i64::MAX / 2)
        .await
        .unwrap();

    let err = ledger
        .produce_devices(production(DeviceType::Vh, 3))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Validation(msg) if msg.contains("overflows")));
    assert_eq!(ledger.list_stock().await.unwrap()["Coil"], 5);
    assert!(ledger.list_devices(None, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn purchase_of_new_item_creates_its_pool() {
    let ledger = ledger().await;
    ledger.record_purchase(purchase("Gasket", 12, "CAD")).await.unwrap();
    assert_eq!(ledger.list_stock().await.unwrap()["Gasket"], 12);
}

#[tokio::test]
async fn device_summary_groups_by_location_and_dates() {
    let ledger = vh_ledger().await;
    ledger.record_purchase(purchase("Coil", 10, "CAD")).await.unwrap();
    ledger.record_purchase(purchase("Case", 2, "CAD")).await.unwrap();

    ledger
        .produce_devices(production(DeviceType::Vh, 2))
        .await
        .unwrap();
    let mut later = production(DeviceType::Vh, 1);
    later.production_date = day(10);
    later.calibration_date = day(11);
    ledger.produce_devices(later).await.unwrap();
    ledger
        .produce_devices(production(DeviceType::Vh, 1))
        .await
        .unwrap();
    // The oldest unit ships first.
    ledger
        .log_shipment_on(shipment(DeviceType::Vh, 1, "Calgary"), day(12))
        .await
        .unwrap();

    let summary = ledger.get_device_summary().await.unwrap();
    assert_eq!(summary.len(), 2);

    let early = &summary[0];
    assert_eq!(early.device_type, DeviceType::Vh);
    assert_eq!(early.location, "Shelf A");
    assert_eq!(early.production_date, day(1));
    assert_eq!(early.calibration_date, day(2));
    assert_eq!(early.count, 2);
    assert_eq!(early.first_production, day(1));
    assert_eq!(early.last_calibration, day(2));

    let late = &summary[1];
    assert_eq!(late.production_date, day(10));
    assert_eq!(late.calibration_date, day(11));
    assert_eq!(late.count, 1);
}

#[tokio::test]
async fn bom_inventory_can_be_filtered_by_device_type() {
    let ledger = vh_ledger().await;
    ledger
        .configure_requirement(DeviceType::Vp, "Lens", 4)
        .await
        .unwrap();

    let all = ledger.get_bom_inventory(None).await.unwrap();
    assert_eq!(all.len(), 3);

    let vp = ledger.get_bom_inventory(Some(DeviceType::Vp)).await.unwrap();
    assert_eq!(vp.len(), 1);
    assert_eq!(vp[0].item_name, "Lens");
    assert_eq!(vp[0].required_per_unit, 4);
    assert_eq!(vp[0].total_quantity, 0);

    let vh = ledger.get_bom_inventory(Some(DeviceType::Vh)).await.unwrap();
    let coil = vh.iter().find(|b| b.item_name == "Coil").unwrap();
    assert_eq!((coil.required_per_unit, coil.total_quantity), (2, 5));
}

#[tokio::test]
async fn reseeding_never_resets_live_stock() {
    let dir = tempfile::tempdir().unwrap();
    let seed_path = dir.path().join("bom.json");
    std::fs::write(
        &seed_path,
        r#"{ "requirements": { "VH": { "Coil": 2, "Case": 1 } }, "stock": { "Coil": 5, "Case": 3 } }"#,
    )
    .unwrap();
    let config = LedgerConfig::new(format!("sqlite://{}", dir.path().join("ledger.db").display()))
        .with_seed(&seed_path);

    let ledger = InventoryLedger::open(&config).await.unwrap();
    ledger
        .produce_devices(production(DeviceType::Vh, 1))
        .await
        .unwrap();
    ledger.close().await;

    let reopened = InventoryLedger::open(&config).await.unwrap();
    let stock = reopened.list_stock().await.unwrap();
    assert_eq!((stock["Coil"], stock["Case"]), (3, 2));
    assert_eq!(reopened.list_devices(None, None).await.unwrap().len(), 1);
    reopened.close().await;
}

#[tokio::test]
async fn identifier_collision_skips_only_the_colliding_unit() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("ledger.db").display());
    let config = LedgerConfig::new(url.clone());

    InventoryLedger::open(&config).await.unwrap().close().await;

    // Plant a row under the identifier the first batch will generate for unit 2.
    let pool = sqlx::SqlitePool::connect(&url).await.unwrap();
    sqlx::query(
        "INSERT INTO devices VALUES ('VH-000001-002', 'VH', '2020-01-01', '2020-01-01', 'Legacy', 'InStock')",
    )
    .execute(&pool)
    .await
    .unwrap();
    pool.close().await;

    let ledger = InventoryLedger::open(&config).await.unwrap();
    ledger
        .configure_requirement(DeviceType::Vh, "Coil", 1)
        .await
        .unwrap();
    ledger.record_purchase(purchase("Coil", 3, "CAD")).await.unwrap();

    let report = ledger
        .produce_devices(production(DeviceType::Vh, 3))
        .await
        .unwrap();
    assert_eq!(report.units_created(), 2);
    assert_eq!(report.requested, 3);
    assert!(report.message.contains("skipped"));
    assert!(report.created.iter().all(|id| id.as_str() != "VH-000001-002"));
    ledger.close().await;
}

#[tokio::test]
async fn device_row_whose_id_disagrees_with_its_type_is_reported_corrupt() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("ledger.db").display());
    let config = LedgerConfig::new(url.clone());

    InventoryLedger::open(&config).await.unwrap().close().await;

    let pool = sqlx::SqlitePool::connect(&url).await.unwrap();
    sqlx::query(
        "INSERT INTO devices VALUES ('VP-000009-001', 'VH', '2020-01-01', '2020-01-01', 'Legacy', 'InStock')",
    )
    .execute(&pool)
    .await
    .unwrap();
    pool.close().await;

    let ledger = InventoryLedger::open(&config).await.unwrap();
    let err = ledger.list_devices(None, None).await.unwrap_err();
    assert!(matches!(
        err,
        LedgerError::Storage { operation: "decode_row", ref message } if message.contains("VP-000009-001")
    ));
    ledger.close().await;
}

#[tokio::test]
async fn invalid_seed_is_rejected() {
    let ledger = ledger().await;
    let seed: BomSeed =
        serde_json::from_str(r#"{ "requirements": { "VH": { "Coil": 0 } } }"#).unwrap();

    let err = ledger.apply_seed(&seed).await.unwrap_err();
    assert!(matches!(err, LedgerError::Validation(_)));
    assert!(ledger.get_bom_inventory(None).await.unwrap().is_empty());
}
