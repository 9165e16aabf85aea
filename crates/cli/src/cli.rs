use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;

use bomledger_inventory::{DeviceStatus, DeviceType};

#[derive(Debug, Parser)]
#[command(name = "bomledger")]
#[command(about = "Device inventory and bill-of-materials ledger")]
#[command(version)]
pub struct Cli {
    /// SQLite database URL (defaults to the app data directory)
    #[arg(long, env = "BOMLEDGER_DATABASE_URL", global = true)]
    pub database_url: Option<String>,

    /// JSON file with BOM requirements and initial stock
    #[arg(long, env = "BOMLEDGER_BOM_SEED", global = true)]
    pub bom_seed: Option<std::path::PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Build devices, consuming their materials
    Produce {
        /// Device type (VH, VP)
        #[arg(short = 't', long = "type")]
        device_type: DeviceType,
        #[arg(long)]
        production_date: NaiveDate,
        #[arg(long)]
        calibration_date: NaiveDate,
        #[arg(short, long)]
        location: String,
        #[arg(short, long)]
        quantity: i64,
    },
    /// Ship in-stock devices to a destination
    Ship {
        #[arg(short = 't', long = "type")]
        device_type: DeviceType,
        #[arg(short, long)]
        quantity: i64,
        #[arg(short, long)]
        destination: String,
    },
    /// How many devices current stock supports (all types when omitted)
    Buildable {
        #[arg(short = 't', long = "type")]
        device_type: Option<DeviceType>,
    },
    /// Record a materials purchase
    Purchase {
        #[arg(long)]
        date: NaiveDate,
        #[arg(long)]
        buyer: String,
        #[arg(long)]
        item: String,
        #[arg(short, long)]
        quantity: i64,
        #[arg(long)]
        price: Decimal,
        /// CAD or USD
        #[arg(long)]
        currency: String,
        #[arg(long, default_value = "0")]
        tax: Decimal,
        #[arg(long, default_value = "")]
        url: String,
    },
    /// Set how many of an item one device consumes
    Require {
        #[arg(short = 't', long = "type")]
        device_type: DeviceType,
        #[arg(long)]
        item: String,
        #[arg(long)]
        per_unit: i64,
    },
    /// In-stock devices by type, location and dates
    Summary,
    /// BOM rows with current stock
    Bom {
        #[arg(short = 't', long = "type")]
        device_type: Option<DeviceType>,
    },
    /// Material pool quantities
    Stock,
    /// Device units
    Devices {
        #[arg(short = 't', long = "type")]
        device_type: Option<DeviceType>,
        /// InStock or Shipped
        #[arg(long)]
        status: Option<DeviceStatus>,
    },
    /// Shipments, newest first
    Shipments,
    /// Purchases, newest first
    Purchases,
}
