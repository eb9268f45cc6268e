use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use tracing::info;

use crate::error::{AlmonerError, Result};
use crate::models::{clean, BankAccount, BankTransaction, NewBankAccount, NewBankTransaction};
use crate::reconciler::Period;

pub const TRANSACTION_SELECT: &str = "
    SELECT id, bank_account_id, transaction_date, description, amount_cents,
           reference_code, donation_id, ledger_entry_id
    FROM bank_transactions";

pub fn row_to_transaction(row: &Row) -> rusqlite::Result<BankTransaction> {
    Ok(BankTransaction {
        id: row.get(0)?,
        bank_account_id: row.get(1)?,
        transaction_date: row.get(2)?,
        description: row.get(3)?,
        amount_cents: row.get(4)?,
        reference_code: row.get(5)?,
        donation_id: row.get(6)?,
        ledger_entry_id: row.get(7)?,
    })
}

pub fn add_bank_account(conn: &Connection, new: &NewBankAccount) -> Result<i64> {
    let name = clean(Some(new.name.as_str()))
        .ok_or_else(|| AlmonerError::validation("Bank account name is required."))?;
    let currency = clean(new.currency.as_deref())
        .map(|c| c.to_uppercase())
        .unwrap_or_else(|| "USD".to_string());

    conn.execute(
        "INSERT INTO bank_accounts (name, bank_name, account_last4, currency) VALUES (?1, ?2, ?3, ?4)",
        params![
            name,
            clean(new.bank_name.as_deref()),
            clean(new.account_last4.as_deref()),
            currency,
        ],
    )?;
    let id = conn.last_insert_rowid();
    info!(bank_account_id = id, "added bank account");
    Ok(id)
}

pub fn list_bank_accounts(conn: &Connection) -> Result<Vec<BankAccount>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, bank_name, account_last4, currency FROM bank_accounts \
         WHERE active = 1 ORDER BY name ASC, id ASC",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(BankAccount {
            id: row.get(0)?,
            name: row.get(1)?,
            bank_name: row.get(2)?,
            account_last4: row.get(3)?,
            currency: row.get(4)?,
        })
    })?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}

pub fn require_bank_account(conn: &Connection, bank_account_id: i64) -> Result<()> {
    let found: Option<i64> = conn
        .query_row("SELECT id FROM bank_accounts WHERE id = ?1", [bank_account_id], |row| row.get(0))
        .optional()?;
    found.map(|_| ()).ok_or(AlmonerError::NotFound {
        kind: "Bank account",
        id: bank_account_id,
    })
}

pub fn add_bank_transaction(conn: &Connection, new: &NewBankTransaction) -> Result<i64> {
    let description = clean(Some(new.description.as_str()))
        .ok_or_else(|| AlmonerError::validation("Bank transaction description is required."))?;
    if new.amount_cents == 0 {
        return Err(AlmonerError::validation("Bank transaction amount cannot be zero."));
    }
    require_bank_account(conn, new.bank_account_id)?;

    conn.execute(
        "INSERT INTO bank_transactions (bank_account_id, transaction_date, description, amount_cents, \
         reference_code, ledger_entry_id) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            new.bank_account_id,
            new.transaction_date.to_string(),
            description,
            new.amount_cents,
            clean(new.reference_code.as_deref()),
            new.ledger_entry_id,
        ],
    )?;
    let id = conn.last_insert_rowid();
    info!(transaction_id = id, bank_account_id = new.bank_account_id, "added bank transaction");
    Ok(id)
}

#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub bank_account_id: Option<i64>,
    pub period: Option<Period>,
    pub unmatched_only: bool,
}

/// Bank transactions, newest first.
pub fn list_bank_transactions(conn: &Connection, filter: &TransactionFilter) -> Result<Vec<BankTransaction>> {
    let mut clauses: Vec<&str> = Vec::new();
    let mut values: Vec<Value> = Vec::new();
    if let Some(account) = filter.bank_account_id {
        clauses.push("bank_account_id = ?");
        values.push(account.into());
    }
    if let Some(period) = &filter.period {
        clauses.push("transaction_date >= ? AND transaction_date <= ?");
        values.push(period.start.to_string().into());
        values.push(period.end.to_string().into());
    }
    if filter.unmatched_only {
        clauses.push("donation_id IS NULL");
    }

    let mut sql = TRANSACTION_SELECT.to_string();
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    sql.push_str(" ORDER BY transaction_date DESC, id DESC");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(values), row_to_transaction)?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{get_connection, init_db};
    use chrono::NaiveDate;

    fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        (dir, conn)
    }

    fn txn(account: i64, date: &str, cents: i64) -> NewBankTransaction {
        NewBankTransaction {
            bank_account_id: account,
            transaction_date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            description: "Deposit".to_string(),
            amount_cents: cents,
            reference_code: Some(" CHK-1 ".to_string()),
            ledger_entry_id: None,
        }
    }

    #[test]
    fn test_accounts_sorted_and_currency_uppercased() {
        let (_dir, conn) = test_db();
        add_bank_account(
            &conn,
            &NewBankAccount {
                name: "Endowment".to_string(),
                currency: Some("cad".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        let accounts = list_bank_accounts(&conn).unwrap();
        let names: Vec<&str> = accounts.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["Endowment", "Operating Account"]);
        assert_eq!(accounts[0].currency, "CAD");
        assert_eq!(accounts[1].currency, "USD");

        assert!(add_bank_account(&conn, &NewBankAccount::default()).is_err());
    }

    #[test]
    fn test_transaction_validation() {
        let (_dir, conn) = test_db();
        assert_eq!(
            add_bank_transaction(&conn, &txn(1, "2026-02-01", 0)).unwrap_err().to_string(),
            "Bank transaction amount cannot be zero."
        );
        let mut blank = txn(1, "2026-02-01", 100);
        blank.description = "  ".to_string();
        assert!(add_bank_transaction(&conn, &blank).is_err());
        assert!(matches!(
            add_bank_transaction(&conn, &txn(7, "2026-02-01", 100)).unwrap_err(),
            AlmonerError::NotFound { kind: "Bank account", id: 7 }
        ));
    }

    #[test]
    fn test_list_filters() {
        let (_dir, conn) = test_db();
        add_bank_transaction(&conn, &txn(1, "2026-02-01", 100)).unwrap();
        add_bank_transaction(&conn, &txn(1, "2026-02-09", -40)).unwrap();
        add_bank_transaction(&conn, &txn(1, "2026-03-01", 900)).unwrap();

        let feb = TransactionFilter {
            bank_account_id: Some(1),
            period: Some(Period::parse_month("2026-02").unwrap()),
            unmatched_only: true,
        };
        let rows = list_bank_transactions(&conn, &feb).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].transaction_date, "2026-02-09");
        assert_eq!(rows[1].reference_code.as_deref(), Some("CHK-1"));
        assert_eq!(list_bank_transactions(&conn, &TransactionFilter::default()).unwrap().len(), 3);
    }
}
