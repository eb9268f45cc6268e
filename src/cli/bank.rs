use std::path::Path;

use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::bank::{add_bank_account, add_bank_transaction, list_bank_accounts, list_bank_transactions, TransactionFilter};
use crate::cli::open_db;
use crate::error::Result;
use crate::fmt::money;
use crate::importer::import_bank_csv;
use crate::models::{NewBankAccount, NewBankTransaction};
use crate::reconciler::link_transaction_to_ledger;

pub fn add_account(new: &NewBankAccount) -> Result<()> {
    let conn = open_db()?;
    let id = add_bank_account(&conn, new)?;
    println!("Added bank account #{id}: {}", new.name.trim());
    Ok(())
}

pub fn list_accounts() -> Result<()> {
    let conn = open_db()?;
    let accounts = list_bank_accounts(&conn)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Bank", "Last Four", "Currency"]);
    for a in &accounts {
        table.add_row(vec![
            Cell::new(a.id),
            Cell::new(&a.name),
            Cell::new(a.bank_name.as_deref().unwrap_or("")),
            Cell::new(a.account_last4.as_deref().unwrap_or("")),
            Cell::new(&a.currency),
        ]);
    }
    println!("Bank Accounts\n{table}");
    Ok(())
}

pub fn add(new: &NewBankTransaction) -> Result<()> {
    let conn = open_db()?;
    let id = add_bank_transaction(&conn, new)?;
    println!("Recorded bank transaction #{id}: {}", money(new.amount_cents));
    Ok(())
}

pub fn list(filter: &TransactionFilter) -> Result<()> {
    let conn = open_db()?;
    let rows = list_bank_transactions(&conn, filter)?;
    if rows.is_empty() {
        println!("No bank transactions found.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Account", "Date", "Description", "Amount", "Reference", "Gift", "Ledger"]);
    for t in &rows {
        let amount = money(t.amount_cents);
        table.add_row(vec![
            Cell::new(t.id),
            Cell::new(t.bank_account_id),
            Cell::new(&t.transaction_date),
            Cell::new(&t.description),
            Cell::new(if t.amount_cents < 0 { amount.red() } else { amount.normal() }),
            Cell::new(t.reference_code.as_deref().unwrap_or("")),
            Cell::new(t.donation_id.map(|id| format!("#{id}")).unwrap_or_else(|| "-".to_string())),
            Cell::new(t.ledger_entry_id.map(|id| format!("#{id}")).unwrap_or_else(|| "-".to_string())),
        ]);
    }
    println!("Bank Transactions\n{table}");
    Ok(())
}

pub fn import(file: &Path, bank_account_id: i64) -> Result<()> {
    let conn = open_db()?;
    let result = import_bank_csv(&conn, file, bank_account_id)?;
    if result.duplicate_file {
        println!("{} This file has already been imported.", "Skipped:".yellow());
        return Ok(());
    }
    println!("Imported {} transaction(s), skipped {} row(s)", result.imported, result.skipped);
    Ok(())
}

pub fn link_ledger(transaction_id: i64, ledger_entry_id: i64) -> Result<()> {
    let conn = open_db()?;
    link_transaction_to_ledger(&conn, transaction_id, ledger_entry_id)?;
    println!("Linked bank transaction #{transaction_id} to ledger entry #{ledger_entry_id}");
    Ok(())
}
