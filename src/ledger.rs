use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection};
use tracing::info;

use crate::error::{AlmonerError, Result};
use crate::models::{clean, LedgerEntry, NewLedgerEntry};
use crate::reconciler::Period;

pub fn add_ledger_entry(conn: &Connection, new: &NewLedgerEntry) -> Result<i64> {
    let account_code = clean(Some(new.account_code.as_str()))
        .ok_or_else(|| AlmonerError::validation("Account code is required."))?;
    let description = clean(Some(new.description.as_str()))
        .ok_or_else(|| AlmonerError::validation("Ledger description is required."))?;
    if new.amount_cents == 0 {
        return Err(AlmonerError::validation("Ledger amount cannot be zero."));
    }

    conn.execute(
        "INSERT INTO ledger_entries (posted_date, account_code, description, amount_cents, reference_code, source) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            new.posted_date.to_string(),
            account_code,
            description,
            new.amount_cents,
            clean(new.reference_code.as_deref()),
            clean(new.source.as_deref()).unwrap_or_else(|| "Manual".to_string()),
        ],
    )?;
    let id = conn.last_insert_rowid();
    info!(ledger_entry_id = id, amount_cents = new.amount_cents, "added ledger entry");
    Ok(id)
}

/// Ledger entries, newest first, with the number of donations linked to each.
pub fn list_ledger_entries(conn: &Connection, unlinked_only: bool, period: Option<&Period>) -> Result<Vec<LedgerEntry>> {
    let mut sql = String::from(
        "SELECT le.id, le.posted_date, le.account_code, le.description, le.amount_cents, \
                le.reference_code, le.source, COUNT(dn.id) \
         FROM ledger_entries le \
         LEFT JOIN donations dn ON dn.ledger_entry_id = le.id",
    );
    let mut values: Vec<Value> = Vec::new();
    if let Some(period) = period {
        sql.push_str(" WHERE le.posted_date >= ? AND le.posted_date <= ?");
        values.push(period.start.to_string().into());
        values.push(period.end.to_string().into());
    }
    sql.push_str(" GROUP BY le.id");
    if unlinked_only {
        sql.push_str(" HAVING COUNT(dn.id) = 0");
    }
    sql.push_str(" ORDER BY le.posted_date DESC, le.id DESC");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(values), |row| {
        Ok(LedgerEntry {
            id: row.get(0)?,
            posted_date: row.get(1)?,
            account_code: row.get(2)?,
            description: row.get(3)?,
            amount_cents: row.get(4)?,
            reference_code: row.get(5)?,
            source: row.get(6)?,
            linked_donations: row.get(7)?,
        })
    })?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{get_connection, init_db};
    use crate::reconciler::link_donation_to_ledger;
    use chrono::NaiveDate;

    fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        (dir, conn)
    }

    fn entry(date: &str, cents: i64) -> NewLedgerEntry {
        NewLedgerEntry {
            posted_date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            account_code: "4000".to_string(),
            description: "Gift revenue".to_string(),
            amount_cents: cents,
            reference_code: None,
            source: None,
        }
    }

    #[test]
    fn test_validation() {
        let (_dir, conn) = test_db();
        assert_eq!(
            add_ledger_entry(&conn, &entry("2026-02-01", 0)).unwrap_err().to_string(),
            "Ledger amount cannot be zero."
        );
        let mut blank_code = entry("2026-02-01", 100);
        blank_code.account_code = " ".to_string();
        assert_eq!(
            add_ledger_entry(&conn, &blank_code).unwrap_err().to_string(),
            "Account code is required."
        );
        let mut blank_desc = entry("2026-02-01", 100);
        blank_desc.description = String::new();
        assert!(add_ledger_entry(&conn, &blank_desc).is_err());
    }

    #[test]
    fn test_negative_amounts_allowed_and_source_defaults() {
        let (_dir, conn) = test_db();
        add_ledger_entry(&conn, &entry("2026-02-01", -2500)).unwrap();
        let entries = list_ledger_entries(&conn, false, None).unwrap();
        assert_eq!(entries[0].amount_cents, -2500);
        assert_eq!(entries[0].source, "Manual");
    }

    #[test]
    fn test_unlinked_and_period_filters() {
        let (_dir, conn) = test_db();
        let linked = add_ledger_entry(&conn, &entry("2026-02-01", 5000)).unwrap();
        add_ledger_entry(&conn, &entry("2026-02-20", 1200)).unwrap();
        add_ledger_entry(&conn, &entry("2026-03-05", 800)).unwrap();
        conn.execute("INSERT INTO donors (donor_type, first_name, last_name) VALUES ('Individual', 'A', 'B')", [])
            .unwrap();
        conn.execute("INSERT INTO donations (donor_id, donation_date, amount_cents) VALUES (1, '2026-02-01', 5000)", [])
            .unwrap();
        link_donation_to_ledger(&conn, 1, linked).unwrap();

        let feb = Period::parse_month("2026-02").unwrap();
        let in_feb = list_ledger_entries(&conn, false, Some(&feb)).unwrap();
        assert_eq!(in_feb.len(), 2);
        assert_eq!(in_feb[0].posted_date, "2026-02-20");
        assert_eq!(in_feb[1].linked_donations, 1);

        let unlinked = list_ledger_entries(&conn, true, Some(&feb)).unwrap();
        assert_eq!(unlinked.len(), 1);
        assert_eq!(unlinked[0].amount_cents, 1200);
    }
}
