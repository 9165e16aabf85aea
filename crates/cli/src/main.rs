//! Command-line front end for the `bomledger` inventory ledger.
//!
//! Every command prints its result as JSON on stdout; logs go to stderr.

mod cli;

use anyhow::Context;
use clap::Parser;
use serde::Serialize;

use bomledger_inventory::{NewPurchase, ProductionRequest, ShipmentRequest};
use bomledger_store::{InventoryLedger, LedgerConfig, LedgerError};

use crate::cli::{Cli, Commands};

/// Exit code for refused requests (validation, insufficient stock).
const EXIT_REFUSED: i32 = 2;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    bomledger_observability::init();

    let cli = Cli::parse();

    let mut config = match cli.database_url {
        Some(url) => LedgerConfig::new(url),
        None => LedgerConfig::from_env().context("failed to load ledger configuration")?,
    };
    if cli.bom_seed.is_some() {
        config.bom_seed = cli.bom_seed;
    }

    tracing::debug!(database_url = %config.database_url, "opening ledger");
    let ledger = InventoryLedger::open(&config)
        .await
        .with_context(|| format!("failed to open ledger at {}", config.database_url))?;

    let outcome = run(&ledger, cli.command).await;
    ledger.close().await;

    let Err(err) = outcome else {
        return Ok(());
    };
    if let Some(body) = err.downcast_ref::<LedgerError>().and_then(refusal) {
        print_json(&body)?;
        std::process::exit(EXIT_REFUSED);
    }
    Err(err)
}

async fn run(ledger: &InventoryLedger, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Produce {
            device_type,
            production_date,
            calibration_date,
            location,
            quantity,
        } => {
            let report = ledger
                .produce_devices(ProductionRequest {
                    device_type,
                    production_date,
                    calibration_date,
                    location,
                    quantity,
                })
                .await?;
            print_json(&report)
        }
        Commands::Ship {
            device_type,
            quantity,
            destination,
        } => {
            let report = ledger
                .log_shipment(ShipmentRequest {
                    device_type,
                    quantity,
                    destination,
                })
                .await?;
            print_json(&report)
        }
        Commands::Buildable { device_type } => match device_type {
            Some(t) => print_json(&ledger.calculate_buildable_units(t).await?),
            None => print_json(&ledger.buildable_overview().await?),
        },
        Commands::Purchase {
            date,
            buyer,
            item,
            quantity,
            price,
            currency,
            tax,
            url,
        } => {
            let purchase = ledger
                .record_purchase(NewPurchase {
                    date,
                    buyer,
                    item_name: item,
                    quantity,
                    price,
                    currency,
                    tax,
                    url,
                })
                .await?;
            print_json(&purchase)
        }
        Commands::Require {
            device_type,
            item,
            per_unit,
        } => {
            ledger
                .configure_requirement(device_type, &item, per_unit)
                .await?;
            print_json(&ledger.get_bom_inventory(Some(device_type)).await?)
        }
        Commands::Summary => print_json(&ledger.get_device_summary().await?),
        Commands::Bom { device_type } => print_json(&ledger.get_bom_inventory(device_type).await?),
        Commands::Stock => print_json(&ledger.list_stock().await?),
        Commands::Devices {
            device_type,
            status,
        } => print_json(&ledger.list_devices(device_type, status).await?),
        Commands::Shipments => print_json(&ledger.get_shipment_history().await?),
        Commands::Purchases => print_json(&ledger.purchase_history().await?),
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "error", rename_all = "snake_case")]
enum Refusal<'a> {
    Validation {
        message: &'a str,
    },
    InsufficientMaterials {
        shortfalls: &'a [bomledger_inventory::Shortfall],
    },
    InsufficientUnits {
        device_type: &'a str,
        available: i64,
        requested: i64,
    },
}

/// Caller-facing rendering of refusals; `None` for unexpected failures.
fn refusal(err: &LedgerError) -> Option<Refusal<'_>> {
    match err {
        LedgerError::Validation(message) => Some(Refusal::Validation { message }),
        LedgerError::InsufficientMaterials(shortfalls) => {
            Some(Refusal::InsufficientMaterials { shortfalls })
        }
        LedgerError::InsufficientUnits {
            device_type,
            available,
            requested,
        } => Some(Refusal::InsufficientUnits {
            device_type,
            available: *available,
            requested: *requested,
        }),
        _ => None,
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("failed to serialize output")?;
    println!("{out}");
    Ok(())
}
