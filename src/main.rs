//! # storefront
//!
//! Command-line front end for the storefront cart and session core.
//!
//! Each invocation starts the [`StorefrontSystem`], restores the saved session from
//! the data directory, runs one command and shuts down. Guest carts and tokens
//! persist between invocations.
//!
//! ```bash
//! storefront add --product-id 9 --name Aviator --price 1200 --size M
//! storefront login --username alice --password secret
//! storefront show
//! RUST_LOG=debug storefront update --item-id 31 --quantity 2
//! ```

use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;
use storefront_sync::clients::{ActorClient, CartClient};
use storefront_sync::config::StorefrontConfig;
use storefront_sync::lifecycle::tracing::setup_tracing;
use storefront_sync::lifecycle::StorefrontSystem;
use storefront_sync::model::{format_price, CartState, LineId, Product, Registration, UserPatch};
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "storefront", about = "Storefront cart and session", long_about = None)]
struct Cli {
    #[command(flatten)]
    config: StorefrontConfig,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Sign in; the guest cart is set aside until sign-out
    Login {
        #[arg(long)]
        username: String,
        #[arg(long, env = "STOREFRONT_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account and sign in
    Register(RegisterArgs),
    /// Sign out and return to the guest cart
    Logout,
    /// Print the session and the cart
    Show,
    /// Add a product to the cart
    Add(AddArgs),
    /// Set a line's quantity (0 removes it)
    Update {
        #[arg(long)]
        item_id: String,
        #[arg(long, allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Remove a line
    Remove {
        #[arg(long)]
        item_id: String,
    },
    /// Empty the cart
    Clear,
    /// Update the signed-in profile
    Profile(ProfileArgs),
}

#[derive(Debug, Args)]
struct RegisterArgs {
    #[arg(long)]
    username: String,
    #[arg(long)]
    email: String,
    #[arg(long, env = "STOREFRONT_PASSWORD", hide_env_values = true)]
    password: String,
    #[arg(long, default_value = "")]
    first_name: String,
    #[arg(long, default_value = "")]
    last_name: String,
}

#[derive(Debug, Args)]
struct AddArgs {
    #[arg(long)]
    product_id: u64,
    /// Display name, kept with guest cart lines
    #[arg(long)]
    name: String,
    /// Unit price, kept with guest cart lines
    #[arg(long)]
    price: Decimal,
    #[arg(long, default_value_t = 1)]
    quantity: u32,
    #[arg(long)]
    size: Option<String>,
    #[arg(long)]
    color: Option<String>,
}

#[derive(Debug, Args)]
struct ProfileArgs {
    #[arg(long)]
    email: Option<String>,
    #[arg(long)]
    first_name: Option<String>,
    #[arg(long)]
    last_name: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), String> {
    setup_tracing();
    let cli = Cli::parse();

    let system = StorefrontSystem::from_config(&cli.config)
        .await
        .map_err(|e| format!("failed to start: {e}"))?;

    let result = run(&system, cli.command).await;

    system.shutdown().await.map_err(|e| e.to_string())?;
    result
}

async fn run(system: &StorefrontSystem, command: Command) -> Result<(), String> {
    let cart = &system.cart_client;
    match command {
        Command::Login { username, password } => {
            let state = system
                .login(&username, &password)
                .await
                .map_err(|e| format!("login failed: {e}"))?;
            if let Some(user) = state.user {
                println!("Signed in as {}", user.display_name());
            }
            print_cart(cart);
        }
        Command::Register(args) => {
            let registration = Registration {
                username: args.username,
                email: args.email,
                password2: args.password.clone(),
                password: args.password,
                first_name: args.first_name,
                last_name: args.last_name,
            };
            let state = system
                .register(registration)
                .await
                .map_err(|e| format!("registration failed: {e}"))?;
            if let Some(user) = state.user {
                println!("Welcome, {}", user.display_name());
            }
        }
        Command::Logout => {
            system.logout().await.map_err(|e| e.to_string())?;
            println!("Signed out");
            print_cart(cart);
        }
        Command::Show => {
            match system.session_client.user() {
                Some(user) => println!("Signed in as {} <{}>", user.display_name(), user.email),
                None => println!("Browsing as guest"),
            }
            if let Some(error) = system.session_client.state().error {
                println!("({error})");
            }
            print_cart(cart);
        }
        Command::Add(args) => {
            let product = Product::new(args.product_id, args.name, args.price);
            info!(product_id = args.product_id, "Adding from command line");
            cart.add_item(product, args.quantity, args.size, args.color)
                .await
                .map_err(|e| e.to_string())?;
            print_cart(cart);
        }
        Command::Update { item_id, quantity } => {
            cart.update_item(LineId::from(item_id), quantity)
                .await
                .map_err(|e| e.to_string())?;
            print_cart(cart);
        }
        Command::Remove { item_id } => {
            cart.remove_item(LineId::from(item_id))
                .await
                .map_err(|e| e.to_string())?;
            print_cart(cart);
        }
        Command::Clear => {
            cart.clear_cart().await.map_err(|e| e.to_string())?;
            println!("Cart cleared");
        }
        Command::Profile(args) => {
            let patch = UserPatch {
                email: args.email,
                first_name: args.first_name,
                last_name: args.last_name,
                ..UserPatch::default()
            };
            let state = system
                .session_client
                .update_profile(patch)
                .await
                .map_err(|e| e.to_string())?;
            if let Some(user) = state.user {
                println!("Profile saved for {}", user.display_name());
            }
        }
    }
    Ok(())
}

fn print_cart(cart: &CartClient) {
    let state: CartState = cart.state();
    if let Some(error) = &state.error {
        println!("Cart error: {error}");
    }
    if state.is_empty() {
        println!("Cart is empty ({})", state.mode);
        return;
    }
    println!("Cart ({}), {} item(s):", state.mode, cart.get_cart_item_count());
    for line in state.items() {
        let variant = [line.selected_size.as_deref(), line.selected_color.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(", ");
        println!(
            "  [{}] {} x{}{} {}",
            line.id,
            line.product.name,
            line.quantity,
            if variant.is_empty() { String::new() } else { format!(" ({variant})") },
            format_price(line.line_total()),
        );
    }
    println!("Total: {}", format_price(state.total()));
}
