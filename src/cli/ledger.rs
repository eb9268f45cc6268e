use comfy_table::{Cell, Table};

use crate::cli::open_db;
use crate::error::Result;
use crate::fmt::money;
use crate::ledger::{add_ledger_entry, list_ledger_entries};
use crate::models::NewLedgerEntry;
use crate::reconciler::{link_donation_to_ledger, Period};

pub fn add(new: &NewLedgerEntry) -> Result<()> {
    let conn = open_db()?;
    let id = add_ledger_entry(&conn, new)?;
    println!("Posted ledger entry #{id}: {}", money(new.amount_cents));
    Ok(())
}

pub fn list(unlinked: bool, period: Option<&Period>) -> Result<()> {
    let conn = open_db()?;
    let entries = list_ledger_entries(&conn, unlinked, period)?;
    if entries.is_empty() {
        println!("No ledger entries found.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Posted", "Account", "Description", "Amount", "Reference", "Source", "Gifts"]);
    for e in &entries {
        table.add_row(vec![
            Cell::new(e.id),
            Cell::new(&e.posted_date),
            Cell::new(&e.account_code),
            Cell::new(&e.description),
            Cell::new(money(e.amount_cents)),
            Cell::new(e.reference_code.as_deref().unwrap_or("")),
            Cell::new(&e.source),
            Cell::new(e.linked_donations),
        ]);
    }
    println!("Ledger\n{table}");
    Ok(())
}

pub fn link(donation_id: i64, ledger_entry_id: i64) -> Result<()> {
    let conn = open_db()?;
    link_donation_to_ledger(&conn, donation_id, ledger_entry_id)?;
    println!("Linked gift #{donation_id} to ledger entry #{ledger_entry_id}");
    Ok(())
}
