mod bank;
mod campaigns;
mod cli;
mod db;
mod donors;
mod engagements;
mod error;
mod fmt;
mod gifts;
mod importer;
mod ledger;
mod logging;
mod medical_terms;
mod models;
mod normalize;
mod reconciler;
mod reports;
mod scanner;
mod search;
mod settings;

use clap::Parser;

use cli::{
    parse_amount_arg, parse_optional_date, today, BankAccountsCommands,
    BankCommands, CampaignsCommands, Cli, Commands, DonorsCommands, EngagementsCommands, GiftsCommands,
    LedgerCommands, ReconcileCommands, ReportCommands,
};
use error::Result;

fn main() {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    if let Err(e) = dispatch(cli.command) {
        tracing::debug!(error = ?e, "command failed");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn date_or_today(raw: Option<&str>) -> Result<chrono::NaiveDate> {
    Ok(parse_optional_date(raw)?.unwrap_or_else(today))
}

fn dispatch(command: Commands) -> Result<()> {
    match command {
        Commands::Init { data_dir, organization } => cli::init::run(data_dir.as_deref(), organization.as_deref()),
        Commands::Status => cli::status::run(),
        Commands::Donors { command } => match command {
            DonorsCommands::Add {
                donor_type,
                first,
                last,
                org,
                email,
                phone,
                stage,
                manager,
                channel,
                notes,
            } => cli::donors::add(
                &donor_type,
                &models::NewDonor {
                    first_name: first,
                    last_name: last,
                    organization_name: org,
                    email,
                    phone,
                    lifecycle_stage: stage,
                    relationship_manager: manager,
                    preferred_channel: channel,
                    notes,
                },
            ),
            DonorsCommands::List { search, smart } => cli::donors::list(search.as_deref(), smart),
        },
        Commands::Engagements { command } => match command {
            EngagementsCommands::Add {
                donor,
                summary,
                date,
                engagement_type,
                channel,
                next_step,
                follow_up,
                owner,
            } => cli::engagements::add(&models::NewEngagement {
                donor_id: donor,
                engagement_date: date_or_today(date.as_deref())?,
                engagement_type,
                channel,
                summary,
                next_step,
                follow_up_date: parse_optional_date(follow_up.as_deref())?,
                owner,
            }),
            EngagementsCommands::List { donor, limit } => cli::engagements::list(donor, limit),
        },
        Commands::Campaigns { command } => match command {
            CampaignsCommands::Add {
                name,
                campaign_type,
                status,
                owner,
                start,
                end,
                goal,
                parent,
                description,
            } => cli::campaigns::add(&models::NewCampaign {
                name,
                campaign_type,
                status,
                owner,
                start_date: parse_optional_date(start.as_deref())?,
                end_date: parse_optional_date(end.as_deref())?,
                goal_cents: parse_amount_arg(&goal)?,
                parent_campaign_id: parent,
                description,
            }),
            CampaignsCommands::List => cli::campaigns::list(),
        },
        Commands::Gifts { command } => match command {
            GiftsCommands::Add {
                donor,
                amount,
                date,
                donation_type,
                campaign,
                campaign_id,
                fund,
                method,
                reference,
                account,
                ledger,
                notes,
                anonymous,
                name,
                stage,
                close_date,
                probability,
            } => cli::gifts::add(&models::NewDonation {
                donor_id: donor,
                donation_date: date_or_today(date.as_deref())?,
                amount_cents: parse_amount_arg(&amount)?,
                donation_type,
                campaign,
                campaign_id,
                fund,
                payment_method: method,
                reference_code: reference,
                bank_account_id: account,
                ledger_entry_id: ledger,
                notes,
                is_anonymous: anonymous,
                opportunity_name: name,
                stage: stage.parse()?,
                close_date: parse_optional_date(close_date.as_deref())?,
                probability_percent: probability,
            }),
            GiftsCommands::List {
                donor,
                account,
                month,
                stage,
                campaign_id,
                open,
                unreconciled,
            } => cli::gifts::list(&gifts::DonationFilter {
                donor_id: donor,
                bank_account_id: account,
                period: month.as_deref().map(reconciler::Period::parse_month).transpose()?,
                stage: stage.as_deref().map(str::parse::<models::Stage>).transpose()?,
                campaign_id,
                open_only: open,
                unreconciled_only: unreconciled,
            }),
            GiftsCommands::Stage {
                donation_id,
                stage,
                probability,
            } => cli::gifts::stage(donation_id, &stage, probability),
            GiftsCommands::Pipeline => cli::gifts::pipeline(),
        },
        Commands::Ledger { command } => match command {
            LedgerCommands::Add {
                account_code,
                description,
                amount,
                date,
                reference,
                source,
            } => cli::ledger::add(&models::NewLedgerEntry {
                posted_date: date_or_today(date.as_deref())?,
                account_code,
                description,
                amount_cents: parse_amount_arg(&amount)?,
                reference_code: reference,
                source,
            }),
            LedgerCommands::List { unlinked, month } => {
                let period = month.as_deref().map(reconciler::Period::parse_month).transpose()?;
                cli::ledger::list(unlinked, period.as_ref())
            }
            LedgerCommands::Link {
                donation_id,
                ledger_entry_id,
            } => cli::ledger::link(donation_id, ledger_entry_id),
        },
        Commands::Bank { command } => match command {
            BankCommands::Accounts { command } => match command {
                BankAccountsCommands::Add {
                    name,
                    bank,
                    last4,
                    currency,
                } => cli::bank::add_account(&models::NewBankAccount {
                    name,
                    bank_name: bank,
                    account_last4: last4,
                    currency,
                }),
                BankAccountsCommands::List => cli::bank::list_accounts(),
            },
            BankCommands::Add {
                account,
                description,
                amount,
                date,
                reference,
            } => cli::bank::add(&models::NewBankTransaction {
                bank_account_id: account,
                transaction_date: date_or_today(date.as_deref())?,
                description,
                amount_cents: parse_amount_arg(&amount)?,
                reference_code: reference,
                ledger_entry_id: None,
            }),
            BankCommands::List {
                account,
                month,
                unmatched,
            } => cli::bank::list(&bank::TransactionFilter {
                bank_account_id: account,
                period: month.as_deref().map(reconciler::Period::parse_month).transpose()?,
                unmatched_only: unmatched,
            }),
            BankCommands::Import { file, account } => cli::bank::import(&file, account),
            BankCommands::LinkLedger {
                transaction_id,
                ledger_entry_id,
            } => cli::bank::link_ledger(transaction_id, ledger_entry_id),
        },
        Commands::Reconcile { command } => match command {
            ReconcileCommands::Match {
                donation_id,
                transaction_id,
            } => cli::reconcile::match_pair(donation_id, transaction_id),
            ReconcileCommands::Auto { account, period } => cli::reconcile::auto(account, &period.resolve()?),
            ReconcileCommands::Snapshot { account, period } => cli::reconcile::snapshot(account, &period.resolve()?),
            ReconcileCommands::Gaps { account, period } => cli::reconcile::gaps(account, &period.resolve()?),
        },
        Commands::Scan {
            severity,
            object,
            keyword,
            csv,
        } => cli::scan::run(&severity, &object, keyword.as_deref(), csv.as_deref()),
        Commands::Report { command } => match command {
            ReportCommands::Trend { months } => cli::report::trend(months),
            ReportCommands::Followups { days } => cli::report::followups(days),
        },
    }
}
