//! Shopfront CLI - browse the catalog and manage a cart from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # List products, optionally filtered
//! shopfront products --category Women --sort price-low-high
//!
//! # Show one product and related items
//! shopfront product 665f1a
//!
//! # Sign in (the token is kept in SHOPFRONT_TOKEN_PATH)
//! shopfront login -e shopper@example.com -p secret
//!
//! # Work with the cart
//! shopfront cart add 665f1a --size M
//! shopfront cart update 665f1a M 3
//! shopfront cart show
//! ```
//!
//! # Environment Variables
//!
//! See `shopfront_storefront::config` for the full list; only
//! `SHOPFRONT_BACKEND_URL` is required.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use sentry::integrations::tracing as sentry_tracing;
use shopfront_core::SortOrder;
use shopfront_storefront::{BackendClient, ShopState, StorefrontConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod console;

#[derive(Parser)]
#[command(name = "shopfront")]
#[command(author, version, about = "Shopfront command-line storefront")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List products
    Products {
        /// Only these categories (repeatable)
        #[arg(short, long)]
        category: Vec<String>,

        /// Only these sub-categories (repeatable)
        #[arg(short = 't', long = "type")]
        sub_category: Vec<String>,

        /// Case-insensitive name search
        #[arg(short, long)]
        search: Option<String>,

        /// Result ordering
        #[arg(long, value_enum, default_value_t = Sort::Relevant)]
        sort: Sort,

        /// Show bestsellers only
        #[arg(long, conflicts_with = "latest")]
        bestsellers: bool,

        /// Show the N most recent products
        #[arg(long, value_name = "N")]
        latest: Option<usize>,
    },
    /// Show a single product
    Product {
        /// Product ID
        id: String,
    },
    /// Inspect or change the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Sign in
    Login {
        #[arg(short, long)]
        email: String,

        #[arg(short, long)]
        password: String,
    },
    /// Create an account
    Register {
        #[arg(short, long)]
        name: String,

        #[arg(short, long)]
        email: String,

        #[arg(short, long)]
        password: String,
    },
    /// Sign out and forget the stored token
    Logout,
    /// Relay a payment gateway redirect for verification
    Verify {
        /// Order ID from the redirect
        #[arg(short, long)]
        order_id: String,

        /// Value of the redirect's `success` parameter
        #[arg(short, long, action = clap::ArgAction::Set, default_value_t = true)]
        success: bool,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Show cart contents and totals
    Show,
    /// Add one unit of a product
    Add {
        /// Product ID
        id: String,

        /// Size to add
        #[arg(short, long)]
        size: Option<String>,
    },
    /// Set the quantity of a product in a size
    Update {
        /// Product ID
        id: String,

        /// Size
        size: String,

        /// New quantity
        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Sort {
    Relevant,
    PriceLowHigh,
    PriceHighLow,
}

impl From<Sort> for SortOrder {
    fn from(sort: Sort) -> Self {
        match sort {
            Sort::Relevant => Self::Relevant,
            Sort::PriceLowHigh => Self::PriceLowHigh,
            Sort::PriceHighLow => Self::PriceHighLow,
        }
    }
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry.dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry
                .environment
                .clone()
                .map(std::borrow::Cow::Owned),
            sample_rate: config.sentry.sample_rate,
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR => sentry_tracing::EventFilter::Event,
        tracing::Level::WARN | tracing::Level::INFO => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load configuration from environment (needed for Sentry init)
    let config = match StorefrontConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing_subscriber::fmt::init();
            tracing::error!("Failed to load configuration: {e}");
            std::process::exit(2);
        }
    };

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "shopfront_storefront=info,shopfront_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    if let Err(e) = run(cli, &config).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: &StorefrontConfig) -> shopfront_storefront::Result<()> {
    if config.token_path.is_none() {
        tracing::warn!("SHOPFRONT_TOKEN_PATH not set; the session will not outlive this command");
    }

    let backend = BackendClient::new(config)?;
    let state = ShopState::builder(Arc::new(backend))
        .config(config)
        .notifier(Arc::new(console::ConsoleNotifier))
        .navigator(Arc::new(console::ConsoleNavigator))
        .build();

    state.start().await;

    match cli.command {
        Commands::Products {
            category,
            sub_category,
            search,
            sort,
            bestsellers,
            latest,
        } => {
            let listing = if bestsellers {
                commands::catalog::Listing::Bestsellers
            } else if let Some(limit) = latest {
                commands::catalog::Listing::Latest(limit)
            } else {
                commands::catalog::Listing::Filtered(shopfront_core::CatalogFilter {
                    categories: category,
                    sub_categories: sub_category,
                    query: search,
                    sort: sort.into(),
                })
            };
            commands::catalog::products(&state, &listing);
        }
        Commands::Product { id } => commands::catalog::product(&state, &id.into()).await?,
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show(&state),
            CartAction::Add { id, size } => {
                commands::cart::add(&state, &id.into(), size.as_deref()).await?;
            }
            CartAction::Update { id, size, quantity } => {
                commands::cart::update(&state, &id.into(), &size, quantity).await?;
            }
        },
        Commands::Login { email, password } => {
            commands::account::login(&state, &email, &password).await?;
        }
        Commands::Register {
            name,
            email,
            password,
        } => commands::account::register(&state, &name, &email, &password).await?,
        Commands::Logout => commands::account::logout(&state),
        Commands::Verify { order_id, success } => {
            commands::account::verify(&state, success, order_id.into()).await?;
        }
    }
    Ok(())
}
