use std::path::Path;

use rusqlite::types::ValueRef;
use rusqlite::Connection;

use crate::error::Result;
use crate::scanner::ScanRecord;

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS donors (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    donor_type TEXT NOT NULL CHECK (donor_type IN ('Individual', 'Organization')),
    first_name TEXT,
    last_name TEXT,
    organization_name TEXT,
    email TEXT,
    phone TEXT,
    lifecycle_stage TEXT NOT NULL DEFAULT 'Prospect',
    relationship_manager TEXT,
    preferred_channel TEXT,
    notes TEXT,
    active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))
);

CREATE TABLE IF NOT EXISTS engagements (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    donor_id INTEGER NOT NULL,
    engagement_date TEXT NOT NULL,
    engagement_type TEXT NOT NULL,
    channel TEXT,
    summary TEXT NOT NULL,
    next_step TEXT,
    follow_up_date TEXT,
    owner TEXT,
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now')),
    FOREIGN KEY (donor_id) REFERENCES donors(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS bank_accounts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    bank_name TEXT,
    account_last4 TEXT,
    currency TEXT NOT NULL DEFAULT 'USD',
    active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))
);

CREATE TABLE IF NOT EXISTS ledger_entries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    posted_date TEXT NOT NULL,
    account_code TEXT NOT NULL,
    description TEXT NOT NULL,
    amount_cents INTEGER NOT NULL,
    reference_code TEXT,
    source TEXT NOT NULL DEFAULT 'Manual',
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))
);

CREATE TABLE IF NOT EXISTS campaigns (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    campaign_type TEXT NOT NULL DEFAULT 'Fundraising',
    status TEXT NOT NULL DEFAULT 'Planned',
    owner TEXT,
    start_date TEXT,
    end_date TEXT,
    goal_cents INTEGER NOT NULL DEFAULT 0,
    parent_campaign_id INTEGER,
    description TEXT,
    active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now')),
    FOREIGN KEY (parent_campaign_id) REFERENCES campaigns(id)
);

CREATE TABLE IF NOT EXISTS donations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    donor_id INTEGER NOT NULL,
    donation_date TEXT NOT NULL,
    amount_cents INTEGER NOT NULL CHECK (amount_cents > 0),
    donation_type TEXT NOT NULL DEFAULT 'One-time',
    campaign TEXT,
    campaign_id INTEGER,
    fund TEXT,
    payment_method TEXT,
    reference_code TEXT,
    bank_account_id INTEGER,
    ledger_entry_id INTEGER,
    is_anonymous INTEGER NOT NULL DEFAULT 0,
    notes TEXT,
    opportunity_name TEXT,
    opportunity_stage TEXT NOT NULL DEFAULT 'Closed Won',
    close_date TEXT,
    probability_percent INTEGER NOT NULL DEFAULT 100,
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now')),
    FOREIGN KEY (donor_id) REFERENCES donors(id) ON DELETE CASCADE,
    FOREIGN KEY (campaign_id) REFERENCES campaigns(id),
    FOREIGN KEY (bank_account_id) REFERENCES bank_accounts(id),
    FOREIGN KEY (ledger_entry_id) REFERENCES ledger_entries(id)
);

CREATE TABLE IF NOT EXISTS bank_transactions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    bank_account_id INTEGER NOT NULL,
    transaction_date TEXT NOT NULL,
    description TEXT NOT NULL,
    amount_cents INTEGER NOT NULL,
    reference_code TEXT,
    donation_id INTEGER,
    ledger_entry_id INTEGER,
    import_id INTEGER,
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now')),
    FOREIGN KEY (bank_account_id) REFERENCES bank_accounts(id),
    FOREIGN KEY (donation_id) REFERENCES donations(id),
    FOREIGN KEY (ledger_entry_id) REFERENCES ledger_entries(id),
    FOREIGN KEY (import_id) REFERENCES imports(id)
);

CREATE TABLE IF NOT EXISTS imports (
    id INTEGER PRIMARY KEY,
    filename TEXT NOT NULL,
    bank_account_id INTEGER NOT NULL,
    import_date TEXT DEFAULT (datetime('now')),
    record_count INTEGER,
    date_range_start TEXT,
    date_range_end TEXT,
    checksum TEXT,
    FOREIGN KEY (bank_account_id) REFERENCES bank_accounts(id)
);

CREATE INDEX IF NOT EXISTS idx_donations_date ON donations (donation_date);
CREATE INDEX IF NOT EXISTS idx_donations_donor ON donations (donor_id);
CREATE INDEX IF NOT EXISTS idx_donations_stage ON donations (opportunity_stage);
CREATE INDEX IF NOT EXISTS idx_donations_campaign_id ON donations (campaign_id);
CREATE INDEX IF NOT EXISTS idx_engagements_donor ON engagements (donor_id);
CREATE INDEX IF NOT EXISTS idx_engagements_follow_up ON engagements (follow_up_date);
CREATE INDEX IF NOT EXISTS idx_campaigns_parent ON campaigns (parent_campaign_id);
CREATE INDEX IF NOT EXISTS idx_bank_transactions_date ON bank_transactions (transaction_date);
CREATE INDEX IF NOT EXISTS idx_bank_transactions_donation ON bank_transactions (donation_id);
";

/// Tables offered to the sensitivity scanner, with the label reviewers see.
const SCAN_TABLES: &[(&str, &str)] = &[
    ("Accounts & Contacts", "donors"),
    ("Engagement Plans", "engagements"),
    ("Opportunities", "donations"),
    ("Campaigns", "campaigns"),
    ("Gift Entry & Ledger", "ledger_entries"),
    ("Bank Accounts", "bank_accounts"),
    ("Bank Transactions", "bank_transactions"),
];

const SCAN_SKIPPED_COLUMNS: &[&str] = &["id", "created_at"];

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;

    let count: i64 = conn.query_row("SELECT count(*) FROM bank_accounts", [], |row| row.get(0))?;
    if count == 0 {
        conn.execute(
            "INSERT INTO bank_accounts (name, bank_name, account_last4) VALUES (?1, ?2, ?3)",
            rusqlite::params!["Operating Account", "Primary Bank", "0000"],
        )?;
    }
    Ok(())
}

/// Flatten every stored row into field-name → text maps for scanning.
///
/// Surrogate ids, creation stamps, NULLs and numeric columns are left out;
/// text is trimmed and blanks dropped.
pub fn records_for_scan(conn: &Connection) -> Result<Vec<ScanRecord>> {
    let mut records = Vec::new();
    for (object_name, table_name) in SCAN_TABLES {
        let mut stmt = conn.prepare(&format!("SELECT * FROM {table_name} ORDER BY id DESC"))?;
        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
        let id_index = columns.iter().position(|c| c == "id");

        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let Some(id_index) = id_index else { break };
            let ValueRef::Integer(record_id) = row.get_ref(id_index)? else {
                continue;
            };

            let mut fields = Vec::new();
            for (i, column) in columns.iter().enumerate() {
                if SCAN_SKIPPED_COLUMNS.contains(&column.as_str()) {
                    continue;
                }
                let text = match row.get_ref(i)? {
                    ValueRef::Text(bytes) => String::from_utf8_lossy(bytes).trim().to_string(),
                    ValueRef::Blob(bytes) => String::from_utf8_lossy(bytes).trim().to_string(),
                    ValueRef::Null | ValueRef::Integer(_) | ValueRef::Real(_) => continue,
                };
                if !text.is_empty() {
                    fields.push((column.clone(), text));
                }
            }

            records.push(ScanRecord {
                object_name: object_name.to_string(),
                table_name: table_name.to_string(),
                record_id,
                fields,
            });
        }
    }
    Ok(records)
}
