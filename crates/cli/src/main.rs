//! Subscription Provisioner CLI
//!
//! Provisions commerce subscriptions and looks up existing orders.
//! Connection settings come from `COMMERCE_*` environment variables
//! (a `.env` file is honored).

use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use provisioner_commerce::{
    CancelToken, CommerceClient, CommerceConfig, PollPolicy, SubscriptionResource,
    SubscriptionService, SubscriptionSpec, DEFAULT_POLL_ATTEMPTS, DEFAULT_POLL_INTERVAL,
};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "provisioner", version, about = "Provision commerce subscriptions")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a subscription and wait until it is provisioned
    Provision(ProvisionArgs),
    /// Show an existing order
    Order {
        /// Order id returned at checkout
        order_id: String,
    },
}

#[derive(Args, Debug)]
struct ProvisionArgs {
    #[arg(long)]
    friendly_name: String,
    #[arg(long)]
    po_number: String,
    #[arg(long)]
    budget_code: String,
    /// Default admin of the new subscription
    #[arg(long)]
    default_admin: Option<String>,
    #[arg(long)]
    division_id: Option<i64>,
    /// Number of order status checks before giving up
    #[arg(long, default_value_t = DEFAULT_POLL_ATTEMPTS)]
    poll_attempts: u32,
    /// Seconds between order status checks
    #[arg(long, default_value_t = DEFAULT_POLL_INTERVAL.as_secs())]
    poll_interval_secs: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,provisioner_commerce=debug".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = CommerceConfig::from_env()?;
    let client = CommerceClient::configure(config).await?;

    match cli.command {
        Command::Provision(args) => provision(client, args).await,
        Command::Order { order_id } => {
            let resource = SubscriptionResource::new(SubscriptionService::new(client));
            let record = resource.read(&order_id).await?;
            println!("{}", serde_json::to_string_pretty(&record)?);
            Ok(())
        }
    }
}

async fn provision(client: CommerceClient, args: ProvisionArgs) -> anyhow::Result<()> {
    let policy = PollPolicy::new(
        args.poll_attempts,
        Duration::from_secs(args.poll_interval_secs),
    );
    let resource = SubscriptionResource::new(SubscriptionService::new(client).with_poll_policy(policy));

    let spec = SubscriptionSpec {
        friendly_name: args.friendly_name,
        po_number: args.po_number,
        default_admin: args.default_admin,
        budget_code: args.budget_code,
        division_id: args.division_id,
    };

    // Ctrl-C stops the polling wait instead of killing the process mid-request
    let cancel = CancelToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling provisioning");
            on_signal.cancel();
        }
    });

    info!(
        friendly_name = %spec.friendly_name,
        max_attempts = policy.max_attempts(),
        interval_secs = policy.interval().as_secs(),
        "Starting provisioning"
    );

    let record = resource.create_with_cancel(&spec, &cancel).await?;
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}
