use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::open_db;
use crate::error::Result;
use crate::fmt::money;
use crate::reconciler::{
    auto_match_by_reference, donations_missing_bank_match, donations_missing_ledger_link,
    match_donation_to_transaction, reconciliation_snapshot, unmatched_bank_transactions, Period,
};

pub fn match_pair(donation_id: i64, transaction_id: i64) -> Result<()> {
    let conn = open_db()?;
    match_donation_to_transaction(&conn, donation_id, transaction_id)?;
    println!("Matched gift #{donation_id} to bank transaction #{transaction_id}");
    Ok(())
}

pub fn auto(bank_account_id: i64, period: &Period) -> Result<()> {
    let conn = open_db()?;
    let matched = auto_match_by_reference(&conn, bank_account_id, period)?;
    println!(
        "Auto-matched {} gift(s) for {} to {}",
        matched, period.start, period.end
    );
    Ok(())
}

pub fn snapshot(bank_account_id: i64, period: &Period) -> Result<()> {
    let conn = open_db()?;
    let s = reconciliation_snapshot(&conn, bank_account_id, period)?;

    let mut table = Table::new();
    table.set_header(vec!["", "Count", "Total"]);
    table.add_row(vec![
        Cell::new("Gifts"),
        Cell::new(s.donation_count),
        Cell::new(money(s.donation_total_cents)),
    ]);
    table.add_row(vec![
        Cell::new("Bank transactions"),
        Cell::new(s.bank_transaction_count),
        Cell::new(money(s.bank_total_cents)),
    ]);
    table.add_row(vec![Cell::new("Fully reconciled"), Cell::new(s.fully_reconciled_count), Cell::new("")]);
    table.add_row(vec![Cell::new("Missing bank match"), Cell::new(s.missing_bank_count), Cell::new("")]);
    table.add_row(vec![Cell::new("Missing ledger link"), Cell::new(s.missing_ledger_count), Cell::new("")]);
    table.add_row(vec![
        Cell::new("Unmatched bank transactions"),
        Cell::new(s.unmatched_bank_transactions_count),
        Cell::new(""),
    ]);

    println!("Reconciliation {} to {}\n{table}", period.start, period.end);

    let variance = money(s.variance_cents);
    let variance = if s.variance_cents == 0 { variance.green() } else { variance.red().bold() };
    println!("{} {variance}", "Variance:".bold());
    let completion = format!("{:.1}%", s.completion_percent);
    let completion = if s.completion_percent >= 100.0 { completion.green().bold() } else { completion.yellow() };
    println!("{} {completion}", "Complete:".bold());
    Ok(())
}

pub fn gaps(bank_account_id: i64, period: &Period) -> Result<()> {
    let conn = open_db()?;
    let missing_bank = donations_missing_bank_match(&conn, bank_account_id, period)?;
    let missing_ledger = donations_missing_ledger_link(&conn, bank_account_id, period)?;
    let unmatched = unmatched_bank_transactions(&conn, bank_account_id, period)?;

    if missing_bank.is_empty() && missing_ledger.is_empty() && unmatched.is_empty() {
        println!("{}", "Nothing left to reconcile.".green());
        return Ok(());
    }

    for (title, donations) in [
        ("Gifts missing a bank match", &missing_bank),
        ("Gifts missing a ledger link", &missing_ledger),
    ] {
        if donations.is_empty() {
            continue;
        }
        let mut table = Table::new();
        table.set_header(vec!["ID", "Date", "Donor", "Amount", "Reference"]);
        for d in donations {
            table.add_row(vec![
                Cell::new(d.id),
                Cell::new(&d.donation_date),
                Cell::new(&d.donor_name),
                Cell::new(money(d.amount_cents)),
                Cell::new(d.reference_code.as_deref().unwrap_or("")),
            ]);
        }
        println!("{title}\n{table}");
    }

    if !unmatched.is_empty() {
        let mut table = Table::new();
        table.set_header(vec!["ID", "Date", "Description", "Amount", "Reference"]);
        for t in &unmatched {
            table.add_row(vec![
                Cell::new(t.id),
                Cell::new(&t.transaction_date),
                Cell::new(&t.description),
                Cell::new(money(t.amount_cents)),
                Cell::new(t.reference_code.as_deref().unwrap_or("")),
            ]);
        }
        println!("Unmatched bank transactions\n{table}");
    }
    Ok(())
}
