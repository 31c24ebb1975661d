use clap::{Parser, Subcommand};
use serde_json::Value;

use koha_opac_client::config::PortalConfig;
use koha_opac_client::{report, session};

/// Koha OPAC helper for the mobile app bridge.
///
/// Prints exactly one compact JSON envelope on stdout per invocation,
/// so the caller can pipe it straight into its own parser.
#[derive(Parser)]
#[command(name = "opac-cli", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch current checkouts for a user
    GetBookInfo { userid: String, password: String },
    /// Renew a specific item for a user
    RenewBook {
        userid: String,
        password: String,
        item_id: i64,
    },
}

#[tokio::main]
async fn main() {
    // Default to warn so stdout stays pure JSON; RUST_LOG overrides.
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("warn"));

    let cli = Cli::parse();
    let config = PortalConfig::load();

    let report = match run(&config, cli.command).await {
        Ok(report) => report,
        Err(e) => report::error(&e.to_string()),
    };

    println!("{}", report);
}

async fn run(config: &PortalConfig, command: Command) -> anyhow::Result<Value> {
    match command {
        Command::GetBookInfo { userid, password } => {
            session::get_book_info(config, &userid, &password).await
        }
        Command::RenewBook {
            userid,
            password,
            item_id,
        } => session::renew_book(config, &userid, &password, item_id).await,
    }
}
