use colored::Colorize;

use crate::cli::today;
use crate::db::get_connection;
use crate::error::Result;
use crate::fmt::money;
use crate::reports::dashboard_stats;
use crate::settings::{get_db_path, load_settings};

pub fn run() -> Result<()> {
    let settings = load_settings();
    let db_path = get_db_path();

    if !settings.organization_name.is_empty() {
        println!("{} {}", "Organization:".bold(), settings.organization_name);
    }
    println!("{} {}", "Data dir:".bold(), settings.data_dir);
    println!("{} {}", "Database:".bold(), db_path.display());

    if !db_path.exists() {
        println!("\nDatabase not found. Run `almoner init` to set up.");
        return Ok(());
    }

    let conn = get_connection(&db_path)?;
    let stats = dashboard_stats(&conn, today())?;

    println!();
    println!("{} {}", "Donors:".bold(), stats.donors_total);
    println!("{} {}", "Raised this year:".bold(), money(stats.ytd_total_cents).green());
    println!(
        "{} {} across {} gift(s)",
        "Raised this month:".bold(),
        money(stats.month_total_cents).green(),
        stats.month_donation_count
    );
    println!(
        "{} {}/{} ({:.1}%)",
        "Reconciled this month:".bold(),
        stats.month_reconciled_count,
        stats.month_donation_count,
        stats.month_completion_percent
    );
    let unreconciled = stats.unreconciled_total.to_string();
    println!(
        "{} {}",
        "Unreconciled gifts:".bold(),
        if stats.unreconciled_total > 0 { unreconciled.yellow() } else { unreconciled.normal() }
    );
    println!("{} {}", "Follow-ups due:".bold(), stats.follow_ups_due);
    println!("{} {}", "Open opportunities:".bold(), stats.open_opportunities);
    println!("{} {}", "Active campaigns:".bold(), stats.active_campaigns);
    Ok(())
}
