use chrono::{Datelike, Duration, Months, NaiveDate};
use rusqlite::{params, Connection};

use crate::engagements::{row_to_engagement, ENGAGEMENT_SELECT};
use crate::error::Result;
use crate::models::Engagement;
use crate::reconciler::{completion_percent, month_bounds};

pub const DEFAULT_FOLLOWUP_LIMIT: i64 = 25;

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardStats {
    pub donors_total: i64,
    pub ytd_total_cents: i64,
    pub month_total_cents: i64,
    pub month_donation_count: i64,
    pub month_reconciled_count: i64,
    pub unreconciled_total: i64,
    pub follow_ups_due: i64,
    pub open_opportunities: i64,
    pub active_campaigns: i64,
    pub month_completion_percent: f64,
}

pub fn dashboard_stats(conn: &Connection, today: NaiveDate) -> Result<DashboardStats> {
    let month = month_bounds(today);
    let (month_start, month_end) = (month.start.to_string(), month.end.to_string());
    let year_start = NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(month.start);

    let count = |sql: &str| -> Result<i64> { Ok(conn.query_row(sql, [], |row| row.get(0))?) };

    let donors_total = count("SELECT COUNT(*) FROM donors")?;
    let ytd_total_cents: i64 = conn.query_row(
        "SELECT COALESCE(SUM(amount_cents), 0) FROM donations WHERE donation_date >= ?1",
        [year_start.to_string()],
        |row| row.get(0),
    )?;
    let (month_donation_count, month_total_cents): (i64, i64) = conn.query_row(
        "SELECT COUNT(*), COALESCE(SUM(amount_cents), 0) FROM donations \
         WHERE donation_date >= ?1 AND donation_date <= ?2",
        params![month_start, month_end],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    let month_reconciled_count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM donations dn \
         WHERE dn.donation_date >= ?1 AND dn.donation_date <= ?2 \
           AND dn.ledger_entry_id IS NOT NULL \
           AND EXISTS (SELECT 1 FROM bank_transactions bt WHERE bt.donation_id = dn.id)",
        params![month_start, month_end],
        |row| row.get(0),
    )?;
    let unreconciled_total = count(
        "SELECT COUNT(*) FROM donations dn \
         WHERE dn.ledger_entry_id IS NULL \
            OR NOT EXISTS (SELECT 1 FROM bank_transactions bt WHERE bt.donation_id = dn.id)",
    )?;
    let follow_ups_due: i64 = conn.query_row(
        "SELECT COUNT(*) FROM engagements WHERE follow_up_date IS NOT NULL AND follow_up_date <= ?1",
        [today.to_string()],
        |row| row.get(0),
    )?;
    let open_opportunities = count(
        "SELECT COUNT(*) FROM donations \
         WHERE COALESCE(opportunity_stage, 'Closed Won') NOT IN ('Closed Won', 'Closed Lost')",
    )?;
    let active_campaigns = count("SELECT COUNT(*) FROM campaigns WHERE active = 1")?;

    let month_completion_percent = completion_percent(month_reconciled_count, month_donation_count);

    Ok(DashboardStats {
        donors_total,
        ytd_total_cents,
        month_total_cents,
        month_donation_count,
        month_reconciled_count,
        unreconciled_total,
        follow_ups_due,
        open_opportunities,
        active_campaigns,
        month_completion_percent,
    })
}

// ---------------------------------------------------------------------------
// Giving trend
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthTotal {
    pub month_key: String,
    pub total_cents: i64,
}

/// Gift totals for the last `months` calendar months ending with the month of
/// `today`, oldest first. Months without gifts report zero.
pub fn donations_by_month(conn: &Connection, months: u32, today: NaiveDate) -> Result<Vec<MonthTotal>> {
    if months == 0 {
        return Ok(Vec::new());
    }
    let anchor = month_bounds(today).start;
    let first = anchor.checked_sub_months(Months::new(months - 1)).unwrap_or(anchor);

    let mut stmt = conn.prepare(
        "SELECT substr(donation_date, 1, 7) AS month_key, COALESCE(SUM(amount_cents), 0) \
         FROM donations WHERE donation_date >= ?1 \
         GROUP BY month_key ORDER BY month_key ASC",
    )?;
    let totals: std::collections::HashMap<String, i64> = stmt
        .query_map([first.to_string()], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<std::result::Result<_, _>>()?;

    Ok((0..months)
        .rev()
        .filter_map(|back| anchor.checked_sub_months(Months::new(back)))
        .map(|month| {
            let key = month.format("%Y-%m").to_string();
            MonthTotal {
                total_cents: totals.get(&key).copied().unwrap_or(0),
                month_key: key,
            }
        })
        .collect())
}

// ---------------------------------------------------------------------------
// Follow-ups
// ---------------------------------------------------------------------------

/// Engagements with a follow-up due between `today` and `today + days`.
pub fn upcoming_followups(conn: &Connection, days: i64, today: NaiveDate, limit: i64) -> Result<Vec<Engagement>> {
    let last_day = today + Duration::days(days);
    let sql = format!(
        "{ENGAGEMENT_SELECT} \
         WHERE e.follow_up_date IS NOT NULL AND e.follow_up_date >= ?1 AND e.follow_up_date <= ?2 \
         ORDER BY e.follow_up_date ASC, e.id ASC LIMIT ?3"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![today.to_string(), last_day.to_string(), limit], row_to_engagement)?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{get_connection, init_db};

    fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        conn.execute(
            "INSERT INTO donors (donor_type, organization_name) VALUES ('Organization', 'Harbor Trust')",
            [],
        )
        .unwrap();
        (dir, conn)
    }

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn gift(conn: &Connection, date: &str, cents: i64, stage: &str) {
        conn.execute(
            "INSERT INTO donations (donor_id, donation_date, amount_cents, opportunity_stage) VALUES (1, ?1, ?2, ?3)",
            params![date, cents, stage],
        )
        .unwrap();
    }

    #[test]
    fn test_dashboard_stats() {
        let (_dir, conn) = test_db();
        gift(&conn, "2025-12-20", 1000, "Closed Won");
        gift(&conn, "2026-01-05", 2000, "Closed Won");
        gift(&conn, "2026-02-10", 3000, "Closed Won");
        gift(&conn, "2026-02-11", 4000, "Pledged");
        conn.execute(
            "INSERT INTO engagements (donor_id, engagement_date, engagement_type, summary, follow_up_date) \
             VALUES (1, '2026-02-01', 'Call', 'Thank-you call', '2026-02-14')",
            [],
        )
        .unwrap();

        let stats = dashboard_stats(&conn, d("2026-02-15")).unwrap();
        assert_eq!(stats.donors_total, 1);
        assert_eq!(stats.ytd_total_cents, 9000);
        assert_eq!(stats.month_total_cents, 7000);
        assert_eq!(stats.month_donation_count, 2);
        assert_eq!(stats.month_reconciled_count, 0);
        assert_eq!(stats.unreconciled_total, 4);
        assert_eq!(stats.follow_ups_due, 1);
        assert_eq!(stats.open_opportunities, 1);
        assert_eq!(stats.active_campaigns, 0);
        assert_eq!(stats.month_completion_percent, 0.0);
    }

    #[test]
    fn test_donations_by_month_fills_gaps() {
        let (_dir, conn) = test_db();
        gift(&conn, "2025-12-20", 1000, "Closed Won");
        gift(&conn, "2026-02-10", 3000, "Closed Won");
        gift(&conn, "2026-02-28", 500, "Closed Won");

        let trend = donations_by_month(&conn, 3, d("2026-02-15")).unwrap();
        let pairs: Vec<(&str, i64)> = trend.iter().map(|m| (m.month_key.as_str(), m.total_cents)).collect();
        assert_eq!(pairs, vec![("2025-12", 1000), ("2026-01", 0), ("2026-02", 3500)]);
        assert!(donations_by_month(&conn, 0, d("2026-02-15")).unwrap().is_empty());
    }

    #[test]
    fn test_upcoming_followups_window() {
        let (_dir, conn) = test_db();
        for (summary, due) in [("Past", "2026-02-01"), ("Soon", "2026-02-20"), ("Later", "2026-04-01")] {
            conn.execute(
                "INSERT INTO engagements (donor_id, engagement_date, engagement_type, summary, follow_up_date) \
                 VALUES (1, '2026-01-15', 'Call', ?1, ?2)",
                params![summary, due],
            )
            .unwrap();
        }
        let due = upcoming_followups(&conn, 30, d("2026-02-15"), DEFAULT_FOLLOWUP_LIMIT).unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].summary, "Soon");
        assert_eq!(due[0].donor_name, "Harbor Trust");
    }
}
