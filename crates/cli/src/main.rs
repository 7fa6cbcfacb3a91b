//! EPCC storefront CLI - shop from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # List catalog products
//! ep-cli products
//!
//! # Show the cart (creates one on first use)
//! ep-cli cart show
//!
//! # Add two of a product, change a line, remove a line
//! ep-cli cart add 9eda5ba0-4f4a-4074-8547-ccd0cfd3f7bd -q 2
//! ep-cli cart set 5601a4b1-9d13-42d3-8fb7-03b35169d1b6 3
//! ep-cli cart remove 5601a4b1-9d13-42d3-8fb7-03b35169d1b6
//!
//! # Place the order (ships to the billing address)
//! ep-cli checkout --name "Ron Swanson" --email ron@pawnee.gov \
//!     --line1 "1 Cabin Rd" --city Pawnee --postcode 47998 --county Wamapoke --country US --pay
//! ```
//!
//! # Environment Variables
//!
//! - `EPCC_ENDPOINT_URL` - EPCC API base URL
//! - `EPCC_CLIENT_ID` - Client ID for implicit-grant tokens
//! - `EPCC_MANUAL_PAYMENT` - Pay through the manual gateway after checkout
//!
//! The access token and cart ID are kept in the `--state` file between runs.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

/// Default location of the shopper state file.
const DEFAULT_STATE_FILE: &str = ".ep-session.json";

#[derive(Parser)]
#[command(name = "ep-cli")]
#[command(author, version, about = "EPCC storefront shopper")]
struct Cli {
    /// JSON file holding the access token and cart ID
    #[arg(long, global = true, default_value = DEFAULT_STATE_FILE)]
    state: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List catalog products
    Products,
    /// Manage the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Convert the cart into an order
    Checkout(commands::checkout::CheckoutArgs),
}

#[derive(Subcommand)]
enum CartAction {
    /// Show cart contents
    Show,
    /// Add a product
    Add {
        /// Product ID
        product: String,

        /// Quantity to add
        #[arg(
            short,
            long,
            default_value_t = 1,
            value_parser = clap::value_parser!(u32).range(1..)
        )]
        quantity: u32,
    },
    /// Set an item's quantity (0 removes it)
    Set {
        /// Cart item ID
        item: String,

        /// New quantity
        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Remove an item
    Remove {
        /// Cart item ID
        item: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let shop = commands::Shop::open(&cli.state)?;

    match cli.command {
        Commands::Products => commands::products::list(&shop).await?,
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show(&shop).await?,
            CartAction::Add { product, quantity } => {
                commands::cart::add(&shop, product, quantity).await?;
            }
            CartAction::Set { item, quantity } => {
                commands::cart::set(&shop, item, quantity).await?;
            }
            CartAction::Remove { item } => commands::cart::remove(&shop, item).await?,
        },
        Commands::Checkout(args) => commands::checkout::submit(&shop, args).await?,
    }
    Ok(())
}
