use std::collections::HashMap;

use chrono::{Datelike, Months, NaiveDate};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::bank::{row_to_transaction, TRANSACTION_SELECT};
use crate::error::{AlmonerError, Result};
use crate::gifts::{row_to_donation, DONATION_SELECT};
use crate::models::{BankTransaction, Donation};

/// Inclusive date range a reconciliation pass looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Period {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if end < start {
            return Err(AlmonerError::validation(format!(
                "Period end {end} is before start {start}."
            )));
        }
        Ok(Self { start, end })
    }

    /// Parse a `YYYY-MM` month into its first and last day.
    pub fn parse_month(month: &str) -> Result<Self> {
        let first = NaiveDate::parse_from_str(&format!("{}-01", month.trim()), "%Y-%m-%d")
            .map_err(|_| AlmonerError::validation(format!("Invalid month '{month}', expected YYYY-MM.")))?;
        Ok(month_bounds(first))
    }

    fn bounds(&self) -> (String, String) {
        (self.start.to_string(), self.end.to_string())
    }
}

/// The calendar month containing `date`.
pub fn month_bounds(date: NaiveDate) -> Period {
    let start = date.with_day(1).unwrap_or(date);
    let end = start
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .unwrap_or(start);
    Period { start, end }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconciliationSnapshot {
    pub donation_count: i64,
    pub donation_total_cents: i64,
    pub bank_transaction_count: i64,
    pub bank_total_cents: i64,
    pub fully_reconciled_count: i64,
    pub missing_bank_count: i64,
    pub missing_ledger_count: i64,
    pub unmatched_bank_transactions_count: i64,
    pub variance_cents: i64,
    pub completion_percent: f64,
}

struct MatchSide {
    amount_cents: i64,
    bank_account_id: Option<i64>,
    ledger_entry_id: Option<i64>,
    donation_id: Option<i64>,
}

/// Validate and apply one match without opening a transaction of its own.
fn apply_match(conn: &Connection, donation_id: i64, transaction_id: i64) -> Result<()> {
    let donation = conn
        .query_row(
            "SELECT amount_cents, bank_account_id, ledger_entry_id FROM donations WHERE id = ?1",
            [donation_id],
            |row| {
                Ok(MatchSide {
                    amount_cents: row.get(0)?,
                    bank_account_id: row.get(1)?,
                    ledger_entry_id: row.get(2)?,
                    donation_id: None,
                })
            },
        )
        .optional()?
        .ok_or(AlmonerError::NotFound {
            kind: "Donation",
            id: donation_id,
        })?;

    let transaction = conn
        .query_row(
            "SELECT amount_cents, bank_account_id, ledger_entry_id, donation_id \
             FROM bank_transactions WHERE id = ?1",
            [transaction_id],
            |row| {
                Ok(MatchSide {
                    amount_cents: row.get(0)?,
                    bank_account_id: Some(row.get(1)?),
                    ledger_entry_id: row.get(2)?,
                    donation_id: row.get(3)?,
                })
            },
        )
        .optional()?
        .ok_or(AlmonerError::NotFound {
            kind: "Bank transaction",
            id: transaction_id,
        })?;

    if transaction.donation_id.is_some() {
        return Err(AlmonerError::AlreadyMatched(transaction_id));
    }
    if donation.amount_cents != transaction.amount_cents {
        return Err(AlmonerError::AmountMismatch {
            donation_cents: donation.amount_cents,
            transaction_cents: transaction.amount_cents,
        });
    }
    if let Some(account) = donation.bank_account_id {
        if Some(account) != transaction.bank_account_id {
            return Err(AlmonerError::BankAccountMismatch {
                donation_account: account,
                transaction_account: transaction.bank_account_id.unwrap_or_default(),
            });
        }
    }

    conn.execute(
        "UPDATE bank_transactions SET donation_id = ?1 WHERE id = ?2",
        params![donation_id, transaction_id],
    )?;
    if donation.bank_account_id.is_none() {
        conn.execute(
            "UPDATE donations SET bank_account_id = ?1 WHERE id = ?2",
            params![transaction.bank_account_id, donation_id],
        )?;
    }
    if let (Some(ledger_id), None) = (donation.ledger_entry_id, transaction.ledger_entry_id) {
        conn.execute(
            "UPDATE bank_transactions SET ledger_entry_id = ?1 WHERE id = ?2",
            params![ledger_id, transaction_id],
        )?;
    }
    Ok(())
}

/// Link a donation to a bank transaction. All checks pass or nothing changes.
pub fn match_donation_to_transaction(conn: &Connection, donation_id: i64, transaction_id: i64) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    apply_match(&tx, donation_id, transaction_id)?;
    tx.commit()?;
    info!(donation_id, transaction_id, "matched donation to bank transaction");
    Ok(())
}

/// Match donations to bank transactions that share a reference code and an
/// exact amount. Ambiguous candidates are skipped. Returns the match count.
pub fn auto_match_by_reference(conn: &Connection, bank_account_id: i64, period: &Period) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;

    let donations: Vec<Donation> = donations_missing_bank_match(&tx, bank_account_id, period)?
        .into_iter()
        .filter(|d| d.reference_code.as_deref().is_some_and(|r| !r.trim().is_empty()))
        .collect();

    let mut index: HashMap<String, Vec<BankTransaction>> = HashMap::new();
    for txn in unmatched_bank_transactions(&tx, bank_account_id, period)? {
        let Some(key) = reference_key(txn.reference_code.as_deref()) else {
            continue;
        };
        index.entry(key).or_default().push(txn);
    }

    let mut matched = 0;
    for donation in &donations {
        let Some(key) = reference_key(donation.reference_code.as_deref()) else {
            continue;
        };
        let Some(candidates) = index.get_mut(&key) else {
            continue;
        };
        let hits: Vec<usize> = candidates
            .iter()
            .enumerate()
            .filter(|(_, c)| c.amount_cents == donation.amount_cents)
            .map(|(i, _)| i)
            .collect();
        if hits.len() != 1 {
            debug!(donation_id = donation.id, candidates = hits.len(), "skipping ambiguous reference");
            continue;
        }
        let txn = candidates.remove(hits[0]);
        apply_match(&tx, donation.id, txn.id)?;
        matched += 1;
    }

    tx.commit()?;
    info!(
        bank_account_id,
        start = %period.start,
        end = %period.end,
        matched,
        "auto-match by reference complete"
    );
    Ok(matched)
}

fn reference_key(reference: Option<&str>) -> Option<String> {
    reference
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_lowercase)
}

/// Donations in the account and period with no matched bank transaction.
pub fn donations_missing_bank_match(conn: &Connection, bank_account_id: i64, period: &Period) -> Result<Vec<Donation>> {
    let (start, end) = period.bounds();
    let sql = format!(
        "{DONATION_SELECT} \
         WHERE dn.bank_account_id = ?1 AND dn.donation_date >= ?2 AND dn.donation_date <= ?3 \
           AND NOT EXISTS (SELECT 1 FROM bank_transactions bt WHERE bt.donation_id = dn.id) \
         ORDER BY dn.donation_date ASC, dn.id ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![bank_account_id, start, end], row_to_donation)?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}

/// Donations in the account and period with no ledger entry.
pub fn donations_missing_ledger_link(conn: &Connection, bank_account_id: i64, period: &Period) -> Result<Vec<Donation>> {
    let (start, end) = period.bounds();
    let sql = format!(
        "{DONATION_SELECT} \
         WHERE dn.bank_account_id = ?1 AND dn.donation_date >= ?2 AND dn.donation_date <= ?3 \
           AND dn.ledger_entry_id IS NULL \
         ORDER BY dn.donation_date ASC, dn.id ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![bank_account_id, start, end], row_to_donation)?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}

/// Bank transactions in the account and period not yet matched to a donation.
pub fn unmatched_bank_transactions(
    conn: &Connection,
    bank_account_id: i64,
    period: &Period,
) -> Result<Vec<BankTransaction>> {
    let (start, end) = period.bounds();
    let sql = format!(
        "{TRANSACTION_SELECT} \
         WHERE bank_account_id = ?1 AND transaction_date >= ?2 AND transaction_date <= ?3 \
           AND donation_id IS NULL \
         ORDER BY transaction_date ASC, id ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![bank_account_id, start, end], row_to_transaction)?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}

/// Share of `total` that is reconciled, as a percentage to one decimal place.
/// Halves round to even, so 1 of 16 is 6.2. Zero when `total` is zero.
pub fn completion_percent(reconciled: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    let raw = reconciled as f64 / total as f64 * 100.0;
    (raw * 10.0).round_ties_even() / 10.0
}

/// Counts and totals for one account and period, computed fresh each call.
pub fn reconciliation_snapshot(
    conn: &Connection,
    bank_account_id: i64,
    period: &Period,
) -> Result<ReconciliationSnapshot> {
    let (start, end) = period.bounds();

    let (donation_count, donation_total_cents): (i64, i64) = conn.query_row(
        "SELECT COUNT(*), COALESCE(SUM(amount_cents), 0) FROM donations \
         WHERE bank_account_id = ?1 AND donation_date >= ?2 AND donation_date <= ?3",
        params![bank_account_id, start, end],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;

    let (bank_transaction_count, bank_total_cents): (i64, i64) = conn.query_row(
        "SELECT COUNT(*), COALESCE(SUM(amount_cents), 0) FROM bank_transactions \
         WHERE bank_account_id = ?1 AND transaction_date >= ?2 AND transaction_date <= ?3",
        params![bank_account_id, start, end],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;

    let fully_reconciled_count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM donations dn \
         WHERE dn.bank_account_id = ?1 AND dn.donation_date >= ?2 AND dn.donation_date <= ?3 \
           AND dn.ledger_entry_id IS NOT NULL \
           AND EXISTS (SELECT 1 FROM bank_transactions bt WHERE bt.donation_id = dn.id)",
        params![bank_account_id, start, end],
        |row| row.get(0),
    )?;

    let missing_bank_count = donations_missing_bank_match(conn, bank_account_id, period)?.len() as i64;
    let missing_ledger_count = donations_missing_ledger_link(conn, bank_account_id, period)?.len() as i64;
    let unmatched_bank_transactions_count =
        unmatched_bank_transactions(conn, bank_account_id, period)?.len() as i64;

    Ok(ReconciliationSnapshot {
        donation_count,
        donation_total_cents,
        bank_transaction_count,
        bank_total_cents,
        fully_reconciled_count,
        missing_bank_count,
        missing_ledger_count,
        unmatched_bank_transactions_count,
        variance_cents: donation_total_cents - bank_total_cents,
        completion_percent: completion_percent(fully_reconciled_count, donation_count),
    })
}

fn require(conn: &Connection, table: &str, kind: &'static str, id: i64) -> Result<()> {
    let found: Option<i64> = conn
        .query_row(&format!("SELECT id FROM {table} WHERE id = ?1"), [id], |row| row.get(0))
        .optional()?;
    found.map(|_| ()).ok_or(AlmonerError::NotFound { kind, id })
}

pub fn link_donation_to_ledger(conn: &Connection, donation_id: i64, ledger_entry_id: i64) -> Result<()> {
    require(conn, "donations", "Donation", donation_id)?;
    require(conn, "ledger_entries", "Ledger entry", ledger_entry_id)?;
    conn.execute(
        "UPDATE donations SET ledger_entry_id = ?1 WHERE id = ?2",
        params![ledger_entry_id, donation_id],
    )?;
    info!(donation_id, ledger_entry_id, "linked donation to ledger entry");
    Ok(())
}

pub fn link_transaction_to_ledger(conn: &Connection, transaction_id: i64, ledger_entry_id: i64) -> Result<()> {
    require(conn, "bank_transactions", "Bank transaction", transaction_id)?;
    require(conn, "ledger_entries", "Ledger entry", ledger_entry_id)?;
    conn.execute(
        "UPDATE bank_transactions SET ledger_entry_id = ?1 WHERE id = ?2",
        params![ledger_entry_id, transaction_id],
    )?;
    info!(transaction_id, ledger_entry_id, "linked bank transaction to ledger entry");
    Ok(())
}
