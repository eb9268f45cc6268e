pub mod bank;
pub mod campaigns;
pub mod donors;
pub mod engagements;
pub mod gifts;
pub mod init;
pub mod ledger;
pub mod reconcile;
pub mod report;
pub mod scan;
pub mod status;

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{ArgAction, Args, Parser, Subcommand};
use rusqlite::Connection;

use crate::db::get_connection;
use crate::error::{AlmonerError, Result};
use crate::fmt::parse_cents;
use crate::importer::parse_date;
use crate::reconciler::{month_bounds, Period};
use crate::settings::get_db_path;

/// Open the configured database, refusing to create an empty one.
pub(crate) fn open_db() -> Result<Connection> {
    let path = get_db_path();
    if !path.exists() {
        return Err(AlmonerError::validation(
            "Database not found. Run `almoner init` to set up.",
        ));
    }
    get_connection(&path)
}

pub(crate) fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

pub(crate) fn parse_date_arg(raw: &str) -> Result<NaiveDate> {
    parse_date(raw).ok_or_else(|| AlmonerError::validation(format!("Invalid date '{raw}', expected YYYY-MM-DD.")))
}

pub(crate) fn parse_optional_date(raw: Option<&str>) -> Result<Option<NaiveDate>> {
    raw.map(parse_date_arg).transpose()
}

pub(crate) fn parse_amount_arg(raw: &str) -> Result<i64> {
    parse_cents(raw).ok_or_else(|| AlmonerError::validation(format!("Invalid amount '{raw}'.")))
}

/// `--from/--to` when both are given, else `--month YYYY-MM`, else the current month.
pub(crate) fn resolve_period(month: Option<&str>, from: Option<&str>, to: Option<&str>) -> Result<Period> {
    match (from, to) {
        (Some(from), Some(to)) => Period::new(parse_date_arg(from)?, parse_date_arg(to)?),
        (None, None) => match month {
            Some(m) => Period::parse_month(m),
            None => Ok(month_bounds(today())),
        },
        _ => Err(AlmonerError::validation("--from and --to must be given together.")),
    }
}

/// Date range shared by the reconcile subcommands.
#[derive(Args, Debug, Clone)]
pub struct PeriodArgs {
    /// Month: YYYY-MM (default: current month)
    #[arg(long, conflicts_with_all = ["from", "to"])]
    pub month: Option<String>,
    /// Range start, with --to
    #[arg(long)]
    pub from: Option<String>,
    /// Range end, inclusive
    #[arg(long)]
    pub to: Option<String>,
}

impl PeriodArgs {
    pub fn resolve(&self) -> Result<Period> {
        resolve_period(self.month.as_deref(), self.from.as_deref(), self.to.as_deref())
    }
}

#[derive(Parser)]
#[command(
    name = "almoner",
    version,
    about = "Donor CRM and three-way gift reconciliation for small nonprofits."
)]
pub struct Cli {
    /// Raise log verbosity (-v info, -vv debug, -vvv trace). RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Choose a data directory and initialize the database.
    Init {
        /// Path for almoner data (default: ~/Documents/almoner)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
        /// Organization name shown in status output
        #[arg(long)]
        organization: Option<String>,
    },
    /// Show the current database and summary statistics.
    Status,
    /// Manage donors.
    Donors {
        #[command(subcommand)]
        command: DonorsCommands,
    },
    /// Log donor touchpoints and follow-ups.
    Engagements {
        #[command(subcommand)]
        command: EngagementsCommands,
    },
    /// Manage fundraising campaigns.
    Campaigns {
        #[command(subcommand)]
        command: CampaignsCommands,
    },
    /// Record gifts and work the opportunity pipeline.
    Gifts {
        #[command(subcommand)]
        command: GiftsCommands,
    },
    /// Manage general ledger postings.
    Ledger {
        #[command(subcommand)]
        command: LedgerCommands,
    },
    /// Manage bank accounts and bank transactions.
    Bank {
        #[command(subcommand)]
        command: BankCommands,
    },
    /// Reconcile gifts against bank transactions and the ledger.
    Reconcile {
        #[command(subcommand)]
        command: ReconcileCommands,
    },
    /// Scan stored records for potentially HIPAA-sensitive content.
    Scan {
        /// Only show these severities (High, Medium, Low)
        #[arg(long)]
        severity: Vec<String>,
        /// Only show these record types, e.g. "Accounts & Contacts"
        #[arg(long)]
        object: Vec<String>,
        /// Case-insensitive text filter over signal, field, context and reason
        #[arg(long)]
        keyword: Option<String>,
        /// Write the filtered findings to a CSV file
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Generate reports.
    Report {
        #[command(subcommand)]
        command: ReportCommands,
    },
}

#[derive(Subcommand)]
pub enum DonorsCommands {
    /// Add a donor.
    Add {
        /// Donor type: individual or organization
        #[arg(long = "type", default_value = "individual")]
        donor_type: String,
        #[arg(long)]
        first: Option<String>,
        #[arg(long)]
        last: Option<String>,
        /// Organization name (organization donors)
        #[arg(long)]
        org: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        /// Lifecycle stage: Prospect, Active, Major Donor, Foundation, Lapsed
        #[arg(long)]
        stage: Option<String>,
        #[arg(long)]
        manager: Option<String>,
        /// Preferred contact channel
        #[arg(long)]
        channel: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// List donors, newest first.
    List {
        /// Filter by name, organization, email or phone
        #[arg(long)]
        search: Option<String>,
        /// Rank by nickname, misspelling and phone-fragment matching
        #[arg(long)]
        smart: bool,
    },
}

#[derive(Subcommand)]
pub enum EngagementsCommands {
    /// Log an engagement.
    Add {
        #[arg(long)]
        donor: i64,
        /// What happened
        #[arg(long)]
        summary: String,
        /// Engagement date (default: today)
        #[arg(long)]
        date: Option<String>,
        /// Meeting, Call, Email, Event, Note, ...
        #[arg(long = "type", default_value = "Note")]
        engagement_type: String,
        #[arg(long)]
        channel: Option<String>,
        #[arg(long = "next-step")]
        next_step: Option<String>,
        #[arg(long = "follow-up")]
        follow_up: Option<String>,
        #[arg(long)]
        owner: Option<String>,
    },
    /// List recent engagements.
    List {
        #[arg(long)]
        donor: Option<i64>,
        #[arg(long, default_value_t = crate::engagements::DEFAULT_LIST_LIMIT)]
        limit: i64,
    },
}

#[derive(Subcommand)]
pub enum CampaignsCommands {
    /// Add a campaign.
    Add {
        name: String,
        #[arg(long = "type")]
        campaign_type: Option<String>,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        owner: Option<String>,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
        /// Fundraising goal, e.g. 25000 or 25,000.00
        #[arg(long, default_value = "0")]
        goal: String,
        /// Parent campaign id
        #[arg(long)]
        parent: Option<i64>,
        #[arg(long)]
        description: Option<String>,
    },
    /// List active campaigns with totals raised.
    List,
}

#[derive(Subcommand)]
pub enum GiftsCommands {
    /// Record a gift or opportunity.
    Add {
        #[arg(long)]
        donor: i64,
        /// Amount, e.g. 250 or 1,250.00
        #[arg(long)]
        amount: String,
        /// Gift date (default: today)
        #[arg(long)]
        date: Option<String>,
        /// One-time, Recurring, Grant, Matching Gift, In-kind
        #[arg(long = "type", default_value = "One-time")]
        donation_type: String,
        #[arg(long)]
        campaign: Option<String>,
        #[arg(long = "campaign-id")]
        campaign_id: Option<i64>,
        #[arg(long)]
        fund: Option<String>,
        #[arg(long)]
        method: Option<String>,
        /// Check number or other reference used for auto-matching
        #[arg(long)]
        reference: Option<String>,
        /// Bank account id the gift was deposited to
        #[arg(long)]
        account: Option<i64>,
        /// Ledger entry id
        #[arg(long)]
        ledger: Option<i64>,
        #[arg(long)]
        notes: Option<String>,
        #[arg(long)]
        anonymous: bool,
        /// Opportunity name (default: "Donation on <date>")
        #[arg(long)]
        name: Option<String>,
        #[arg(long, default_value = "Closed Won")]
        stage: String,
        #[arg(long = "close-date")]
        close_date: Option<String>,
        #[arg(long, default_value_t = 100)]
        probability: i64,
    },
    /// List gifts and opportunities.
    List {
        #[arg(long)]
        donor: Option<i64>,
        #[arg(long)]
        account: Option<i64>,
        /// Month: YYYY-MM
        #[arg(long)]
        month: Option<String>,
        #[arg(long)]
        stage: Option<String>,
        #[arg(long = "campaign-id")]
        campaign_id: Option<i64>,
        /// Only stages that are not closed
        #[arg(long)]
        open: bool,
        /// Only gifts missing a bank match or ledger link
        #[arg(long)]
        unreconciled: bool,
    },
    /// Move an opportunity to another stage.
    Stage {
        donation_id: i64,
        stage: String,
        #[arg(long)]
        probability: Option<i64>,
    },
    /// Show count and value per pipeline stage.
    Pipeline,
}

#[derive(Subcommand)]
pub enum LedgerCommands {
    /// Post a ledger entry.
    Add {
        #[arg(long = "account-code")]
        account_code: String,
        #[arg(long)]
        description: String,
        /// Signed amount; negative for debits
        #[arg(long, allow_hyphen_values = true)]
        amount: String,
        /// Posting date (default: today)
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        reference: Option<String>,
        #[arg(long)]
        source: Option<String>,
    },
    /// List ledger entries.
    List {
        /// Only entries with no linked gifts
        #[arg(long)]
        unlinked: bool,
        /// Month: YYYY-MM
        #[arg(long)]
        month: Option<String>,
    },
    /// Link a gift to a ledger entry.
    Link { donation_id: i64, ledger_entry_id: i64 },
}

#[derive(Subcommand)]
pub enum BankCommands {
    /// Manage bank accounts.
    Accounts {
        #[command(subcommand)]
        command: BankAccountsCommands,
    },
    /// Record a bank transaction.
    Add {
        #[arg(long)]
        account: i64,
        #[arg(long)]
        description: String,
        /// Signed amount; negative for withdrawals
        #[arg(long, allow_hyphen_values = true)]
        amount: String,
        /// Transaction date (default: today)
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        reference: Option<String>,
    },
    /// List bank transactions.
    List {
        #[arg(long)]
        account: Option<i64>,
        /// Month: YYYY-MM
        #[arg(long)]
        month: Option<String>,
        /// Only transactions not matched to a gift
        #[arg(long)]
        unmatched: bool,
    },
    /// Import a CSV statement (transaction_date, description, amount[, reference_code]).
    Import {
        file: PathBuf,
        #[arg(long)]
        account: i64,
    },
    /// Link a bank transaction to a ledger entry.
    LinkLedger { transaction_id: i64, ledger_entry_id: i64 },
}

#[derive(Subcommand)]
pub enum BankAccountsCommands {
    /// Add a bank account.
    Add {
        name: String,
        #[arg(long)]
        bank: Option<String>,
        #[arg(long)]
        last4: Option<String>,
        #[arg(long)]
        currency: Option<String>,
    },
    /// List active bank accounts.
    List,
}

#[derive(Subcommand)]
pub enum ReconcileCommands {
    /// Match a gift to a bank transaction.
    Match { donation_id: i64, transaction_id: i64 },
    /// Match gifts to bank transactions by reference code and amount.
    Auto {
        #[arg(long)]
        account: i64,
        #[command(flatten)]
        period: PeriodArgs,
    },
    /// Summarize reconciliation status for a period.
    Snapshot {
        #[arg(long)]
        account: i64,
        #[command(flatten)]
        period: PeriodArgs,
    },
    /// List gifts and transactions that still need attention.
    Gaps {
        #[arg(long)]
        account: i64,
        #[command(flatten)]
        period: PeriodArgs,
    },
}

#[derive(Subcommand)]
pub enum ReportCommands {
    /// Gift totals by month.
    Trend {
        #[arg(long, default_value_t = 12)]
        months: u32,
    },
    /// Follow-ups due soon.
    Followups {
        #[arg(long, default_value_t = 30)]
        days: i64,
    },
}
