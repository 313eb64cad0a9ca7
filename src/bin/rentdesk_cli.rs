use std::{path::PathBuf, sync::Arc};

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use rentdesk_api::{
    commands::parse_lenient_amount,
    config::{self, AppConfig},
    db::{self, DbPool},
    events::{Event, EventSender},
    services::{
        flats::DashboardQuery,
        settlement::{Deduction, SettlementQuote, SettlementRequest},
        FlatCard, FlatService, OccupancyFilter, SettlementService,
    },
    storage::{BucketHandle, LocalObjectStore},
};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let context = CliContext::initialize().await?;

    match cli.command {
        Commands::Migrate => handle_migrate(&context).await?,
        Commands::Flats(args) => handle_flats(&context, args, cli.json).await?,
        Commands::Settle(args) => handle_settle(&context, args, cli.json).await?,
    }

    Ok(())
}

#[derive(Parser)]
#[command(name = "rentdesk", about = "RentDesk CLI for flats and tenant settlements", version)]
struct Cli {
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON when available"
    )]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// List flats as the dashboard shows them
    Flats(FlatsArgs),
    /// Compute a tenant's exit settlement
    Settle(SettleArgs),
}

#[derive(Clone, Copy, ValueEnum)]
enum FilterArg {
    All,
    Filled,
    Vacant,
}

impl From<FilterArg> for OccupancyFilter {
    fn from(value: FilterArg) -> Self {
        match value {
            FilterArg::All => OccupancyFilter::All,
            FilterArg::Filled => OccupancyFilter::Filled,
            FilterArg::Vacant => OccupancyFilter::Vacant,
        }
    }
}

#[derive(Args)]
struct FlatsArgs {
    #[arg(long, value_enum, default_value = "all", help = "Occupancy filter")]
    filter: FilterArg,
    #[arg(long, help = "Match apartment name, flat id or tenant name")]
    search: Option<String>,
}

#[derive(Args)]
struct SettleArgs {
    #[arg(long, help = "Active tenancy to settle")]
    tenancy_id: Uuid,
    #[arg(
        long = "deduction",
        value_parser = parse_deduction,
        help = "Deduction as REASON=AMOUNT; repeat for several"
    )]
    deductions: Vec<Deduction>,
    #[arg(long, help = "Write the exit summary PDF to this path")]
    pdf: Option<PathBuf>,
}

fn parse_deduction(raw: &str) -> std::result::Result<Deduction, String> {
    let (reason, amount) = raw
        .rsplit_once('=')
        .ok_or_else(|| format!("expected REASON=AMOUNT, got '{}'", raw))?;
    Ok(Deduction {
        reason: reason.trim().to_string(),
        amount: parse_lenient_amount(amount),
    })
}

struct CliContext {
    config: AppConfig,
    db: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl CliContext {
    async fn initialize() -> Result<Self> {
        let config = config::load_config().context("failed to load application config")?;
        config::init_tracing(config.log_level(), config.log_json);

        let db_pool = db::establish_connection_from_app_config(&config)
            .await
            .context("failed to connect to database")?;

        let (event_tx, mut event_rx) = mpsc::channel::<Event>(32);
        tokio::spawn(async move {
            while let Some(event) = event_rx.recv().await {
                debug!(target: "rentdesk_cli", event = ?event, "received async event");
            }
        });

        Ok(Self {
            config,
            db: Arc::new(db_pool),
            event_sender: Arc::new(EventSender::new(event_tx)),
        })
    }

    fn flat_service(&self) -> FlatService {
        FlatService::new(self.db.clone(), self.event_sender.clone())
    }

    fn settlement_service(&self) -> SettlementService {
        let store = Arc::new(LocalObjectStore::new(
            &self.config.storage_root,
            &self.config.storage_public_base_url,
        ));
        SettlementService::new(
            self.db.clone(),
            self.event_sender.clone(),
            BucketHandle::new(store, self.config.storage_bucket.clone()),
        )
    }
}

async fn handle_migrate(context: &CliContext) -> Result<()> {
    db::run_migrations(&context.db)
        .await
        .context("failed to run migrations")?;
    println!("Migrations applied");
    Ok(())
}

async fn handle_flats(context: &CliContext, args: FlatsArgs, json: bool) -> Result<()> {
    let query = DashboardQuery {
        filter: args.filter.into(),
        search: args.search,
    };
    let cards = context
        .flat_service()
        .dashboard(&query)
        .await
        .context("failed to load flats")?;

    if json {
        return print_json(&cards);
    }
    if cards.is_empty() {
        println!("No flats match");
    }
    for card in &cards {
        render_card(card);
    }
    Ok(())
}

async fn handle_settle(context: &CliContext, args: SettleArgs, json: bool) -> Result<()> {
    let request = SettlementRequest {
        tenancy_id: Some(args.tenancy_id),
        deductions: args.deductions,
    };
    let service = context.settlement_service();

    let quote = match &args.pdf {
        Some(path) => {
            let rendered = service
                .render(&request)
                .await
                .context("failed to render exit summary")?;
            tokio::fs::write(path, &rendered.bytes)
                .await
                .with_context(|| format!("failed to write {}", path.display()))?;
            if !json {
                println!("Exit summary written to {}", path.display());
            }
            rendered.quote
        }
        None => service
            .quote(&request)
            .await
            .map_err(|e| anyhow!("failed to compute settlement: {}", e))?,
    };

    if json {
        print_json(&quote)
    } else {
        render_quote(&quote);
        Ok(())
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn render_card(card: &FlatCard) {
    let tenants = if card.tenant_names.is_empty() {
        "vacant".to_string()
    } else {
        card.tenant_names.join(", ")
    };
    println!(
        "- {} • {} {} • rent {} • {} • {}",
        card.flat.flat_id,
        card.flat.apartment_name,
        card.flat.flat_number.as_deref().unwrap_or(""),
        card.flat.rent_amount,
        card.flat.status,
        tenants
    );
}

fn render_quote(quote: &SettlementQuote) {
    println!("Tenant:     {} ({})", quote.tenant_name, quote.flat_id);
    println!("Deposit:    {}", quote.deposit);
    for deduction in &quote.deductions {
        println!("  - {}: {}", deduction.reason, deduction.amount);
    }
    println!("Deductions: {}", quote.total_deductions);
    println!("Refund:     {}", quote.refund);
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn deductions_parse_from_reason_and_amount() {
        let parsed = parse_deduction("Wall repaint=Rs. 1,500").unwrap();
        assert_eq!(parsed.reason, "Wall repaint");
        assert_eq!(parsed.amount, dec!(1500));

        assert!(parse_deduction("no amount").is_err());
    }
}
