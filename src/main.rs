//! `pich` — command-line surface over the storefront client.
//!
//! Stands in for the mobile screens: collects credentials, invokes the
//! session manager, and prints loading/error/success outcomes.

use anyhow::Result;
use clap::{Parser, Subcommand};
use pich_client::catalog::CatalogClient;
use pich_client::session::store::SessionStore;
use pich_client::{ClientConfig, SessionManager, SessionState, SheetClient};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pich", version, about = "PICH storefront client")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in with an email and password.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Create an account (does not sign you in).
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        phone: String,
        #[arg(long)]
        password: String,
    },
    /// Sign out and clear the persisted session.
    Logout,
    /// Show the current session, if any.
    Whoami,
    /// List the product catalog.
    Products,
    /// Show the signed-in user's cart.
    Cart,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();
    let config = ClientConfig::from_env();

    let remote = SheetClient::new(config.users_api.clone())?;
    let store = SessionStore::new(config.session_file.clone());
    let sessions = SessionManager::new(remote, store);
    sessions.restore().await;

    match cli.command {
        Command::Login { email, password } => {
            let record = sessions.authenticate(&email, &password).await?;
            println!("Signed in as {} <{}> ({})", record.name, record.email, record.role);
        }
        Command::Register {
            name,
            email,
            phone,
            password,
        } => {
            sessions.register(&name, &email, &phone, &password).await?;
            println!("Registration successful! Sign in with `pich login` to continue.");
        }
        Command::Logout => {
            sessions.logout().await?;
            match sessions.last_error() {
                Some(err) => println!("Signed out (with a storage warning: {err})"),
                None => println!("Signed out."),
            }
        }
        Command::Whoami => match sessions.state() {
            SessionState::Authenticated(record) => {
                println!("{} <{}>", record.name, record.email);
                println!("  phone: {}", record.phone);
                println!("  role:  {}", record.role);
                println!("  since: {}", record.created_at);
            }
            _ => println!("Not signed in."),
        },
        Command::Products => {
            let catalog = CatalogClient::new(config.products_api.clone(), config.cart_api.clone())?;
            let products = catalog.fetch_products().await?;
            if products.is_empty() {
                println!("No products available.");
            }
            for product in products {
                let badge = if product.low_stock() {
                    format!("  [only {} left]", product.stock)
                } else {
                    String::new()
                };
                println!(
                    "{:<30} {:<12} ${:>8.2}  rating {:.1}{}",
                    product.name, product.brand, product.price, product.rating, badge
                );
            }
        }
        Command::Cart => {
            let record = match sessions.state() {
                SessionState::Authenticated(record) => record,
                _ => anyhow::bail!("sign in first to view your cart"),
            };
            let catalog = CatalogClient::new(config.products_api.clone(), config.cart_api.clone())?;
            let items = catalog.fetch_cart(&record.email).await?;
            if items.is_empty() {
                println!("Your cart is empty.");
            }
            for item in items {
                println!(
                    "{:<30} x{:<3} ${}",
                    item.product_name, item.quantity, item.product_price
                );
            }
        }
    }

    Ok(())
}
