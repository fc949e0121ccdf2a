use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;
use tradeledger_core::ledger::{PostingAttributes, EVENT_TYPE_ADMIN_ADJUSTMENT, SOURCE_TYPE_ADMIN};

#[derive(Parser, Debug)]
#[command(name = "tradeledger-worker")]
#[command(about = "Balance ledger, snapshot capture and compaction worker")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the capture and compaction schedulers until Ctrl-C
    Run,
    /// Capture one snapshot pass
    Capture {
        /// Only capture this account
        #[arg(short, long)]
        account: Option<String>,
    },
    /// Compact the snapshot store once and print the summary
    Compact {
        /// Only compact this account
        #[arg(short, long)]
        account: Option<String>,
        /// Count deletions without applying them
        #[arg(long)]
        dry_run: bool,
    },
    /// Post an admin adjustment through the ledger
    Post(PostArgs),
    /// Replay an account's ledger and report drift
    Verify {
        #[arg(short, long)]
        account: String,
    },
    /// Set the quantity and market price of a held position
    SetPosition {
        #[arg(short, long)]
        account: String,
        #[arg(short, long)]
        symbol: String,
        #[arg(short, long)]
        quantity: Decimal,
        #[arg(short, long)]
        price: Decimal,
    },
}

#[derive(Args, Debug)]
pub struct PostArgs {
    #[arg(short, long)]
    pub account: String,
    #[arg(short, long, default_value = EVENT_TYPE_ADMIN_ADJUSTMENT)]
    pub event_type: String,
    #[arg(long, allow_hyphen_values = true)]
    pub cash_delta: Option<Decimal>,
    #[arg(long, allow_hyphen_values = true)]
    pub holding_delta: Option<Decimal>,
    #[arg(long, allow_hyphen_values = true)]
    pub profit_delta: Option<Decimal>,
    #[arg(long, allow_hyphen_values = true)]
    pub asset_profit_delta: Option<Decimal>,
    #[arg(long, allow_hyphen_values = true)]
    pub copy_profit_delta: Option<Decimal>,
    #[arg(long, allow_hyphen_values = true)]
    pub funded_profit_delta: Option<Decimal>,
    /// Administrator recorded on the event
    #[arg(long)]
    pub admin: Option<String>,
    /// Occurrence time (RFC 3339); defaults to now
    #[arg(long)]
    pub occurred_at: Option<String>,
    /// Skip the legacy balance mirror
    #[arg(long)]
    pub no_mirror: bool,
    #[arg(long)]
    pub allow_overdraft: bool,
}

impl PostArgs {
    pub fn attributes(&self) -> PostingAttributes {
        PostingAttributes {
            occurred_at: self.occurred_at.clone(),
            cash_delta: self.cash_delta,
            holding_delta: self.holding_delta,
            profit_delta: self.profit_delta,
            asset_profit_delta: self.asset_profit_delta,
            copy_profit_delta: self.copy_profit_delta,
            funded_profit_delta: self.funded_profit_delta,
            source_type: Some(SOURCE_TYPE_ADMIN.to_string()),
            admin_id: self.admin.clone(),
            suppress_mirror: self.no_mirror,
            allow_overdraft: self.allow_overdraft,
            ..Default::default()
        }
    }
}
