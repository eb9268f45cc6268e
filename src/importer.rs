use std::path::Path;

use chrono::NaiveDate;
use rusqlite::Connection;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::bank::{add_bank_transaction, require_bank_account};
use crate::error::{AlmonerError, Result};
use crate::fmt::parse_cents;
use crate::models::NewBankTransaction;

const REQUIRED_COLUMNS: [&str; 3] = ["transaction_date", "description", "amount"];
const REFERENCE_COLUMN: &str = "reference_code";

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Accept ISO `YYYY-MM-DD` or US `M/D/YYYY` dates.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    let parts: Vec<&str> = raw.split('/').collect();
    if parts.len() != 3 {
        return None;
    }
    let m: u32 = parts[0].trim().parse().ok()?;
    let d: u32 = parts[1].trim().parse().ok()?;
    let y: i32 = parts[2].trim().parse().ok()?;
    NaiveDate::from_ymd_opt(y, m, d)
}

fn compute_checksum(file_path: &Path) -> Result<String> {
    let data = std::fs::read(file_path)?;
    let mut hasher = Sha256::new();
    hasher.update(&data);
    Ok(hex::encode(hasher.finalize()))
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRow {
    pub date: NaiveDate,
    pub description: String,
    pub amount_cents: i64,
    pub reference_code: Option<String>,
}

#[derive(Debug, Default)]
pub struct ParsedStatement {
    pub rows: Vec<ParsedRow>,
    pub skipped: usize,
}

/// Read a bank statement CSV. Header names are matched case-insensitively.
/// Rows with a blank, unreadable or zero required value are skipped.
pub fn parse_bank_csv(file_path: &Path) -> Result<ParsedStatement> {
    let file = std::fs::File::open(file_path)?;
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(std::io::BufReader::new(file));

    let headers: Vec<String> = rdr
        .headers()?
        .iter()
        .map(|h| h.trim().trim_start_matches('\u{feff}').to_lowercase())
        .collect();
    let column = |name: &str| headers.iter().position(|h| h == name);

    let mut missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|name| column(name).is_none())
        .collect();
    if !missing.is_empty() {
        missing.sort_unstable();
        return Err(AlmonerError::validation(format!(
            "CSV is missing required columns: {}",
            missing.join(", ")
        )));
    }
    let (Some(date_col), Some(desc_col), Some(amount_col)) =
        (column("transaction_date"), column("description"), column("amount"))
    else {
        return Err(AlmonerError::validation("CSV header could not be read."));
    };
    let reference_col = column(REFERENCE_COLUMN);

    let mut statement = ParsedStatement::default();
    for (line, result) in rdr.records().enumerate() {
        let record = result?;
        let cell = |i: usize| record.get(i).map(str::trim).unwrap_or("");

        let (raw_date, description, raw_amount) = (cell(date_col), cell(desc_col), cell(amount_col));
        if raw_date.is_empty() || description.is_empty() || raw_amount.is_empty() {
            statement.skipped += 1;
            continue;
        }
        let (Some(date), Some(amount_cents)) = (parse_date(raw_date), parse_cents(raw_amount)) else {
            warn!(line = line + 2, "skipping row with unreadable date or amount");
            statement.skipped += 1;
            continue;
        };
        if amount_cents == 0 {
            statement.skipped += 1;
            continue;
        }

        let reference_code = reference_col
            .map(cell)
            .filter(|r| !r.is_empty())
            .map(str::to_string);
        statement.rows.push(ParsedRow {
            date,
            description: description.to_string(),
            amount_cents,
            reference_code,
        });
    }
    Ok(statement)
}

// ---------------------------------------------------------------------------
// Import
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct ImportResult {
    pub imported: usize,
    pub skipped: usize,
    pub duplicate_file: bool,
}

/// Import a statement into a bank account. A file already imported into the
/// same account is reported as a duplicate and nothing is inserted.
pub fn import_bank_csv(conn: &Connection, file_path: &Path, bank_account_id: i64) -> Result<ImportResult> {
    require_bank_account(conn, bank_account_id)?;

    let checksum = compute_checksum(file_path)?;
    {
        let mut stmt = conn.prepare("SELECT 1 FROM imports WHERE checksum = ?1 AND bank_account_id = ?2")?;
        if stmt.exists(rusqlite::params![checksum, bank_account_id])? {
            info!(bank_account_id, "statement already imported");
            return Ok(ImportResult {
                imported: 0,
                skipped: 0,
                duplicate_file: true,
            });
        }
    }

    let statement = parse_bank_csv(file_path)?;

    let tx = conn.unchecked_transaction()?;
    let dates: Vec<NaiveDate> = statement.rows.iter().map(|r| r.date).collect();
    tx.execute(
        "INSERT INTO imports (filename, bank_account_id, record_count, date_range_start, date_range_end, checksum) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            file_path.file_name().and_then(|n| n.to_str()).unwrap_or(""),
            bank_account_id,
            statement.rows.len() as i64,
            dates.iter().min().map(|d| d.to_string()),
            dates.iter().max().map(|d| d.to_string()),
            checksum,
        ],
    )?;
    let import_id = tx.last_insert_rowid();

    for row in &statement.rows {
        let id = add_bank_transaction(
            &tx,
            &NewBankTransaction {
                bank_account_id,
                transaction_date: row.date,
                description: row.description.clone(),
                amount_cents: row.amount_cents,
                reference_code: row.reference_code.clone(),
                ledger_entry_id: None,
            },
        )?;
        tx.execute(
            "UPDATE bank_transactions SET import_id = ?1 WHERE id = ?2",
            rusqlite::params![import_id, id],
        )?;
    }
    tx.commit()?;

    info!(
        bank_account_id,
        imported = statement.rows.len(),
        skipped = statement.skipped,
        "imported bank statement"
    );
    Ok(ImportResult {
        imported: statement.rows.len(),
        skipped: statement.skipped,
        duplicate_file: false,
    })
}
