use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use tracing::info;

use crate::donors::get_donor;
use crate::error::{AlmonerError, Result};
use crate::models::{clean, donor_label, Engagement, NewEngagement};

pub const DEFAULT_LIST_LIMIT: i64 = 200;

pub(crate) const ENGAGEMENT_SELECT: &str = "
    SELECT e.id, e.donor_id, d.donor_type, d.first_name, d.last_name, d.organization_name,
           e.engagement_date, e.engagement_type, e.channel, e.summary, e.next_step,
           e.follow_up_date, e.owner
    FROM engagements e
    JOIN donors d ON d.id = e.donor_id";

pub(crate) fn row_to_engagement(row: &Row) -> rusqlite::Result<Engagement> {
    let donor_type: String = row.get(2)?;
    let first: Option<String> = row.get(3)?;
    let last: Option<String> = row.get(4)?;
    let org: Option<String> = row.get(5)?;
    Ok(Engagement {
        id: row.get(0)?,
        donor_id: row.get(1)?,
        donor_name: donor_label(&donor_type, first.as_deref(), last.as_deref(), org.as_deref()),
        engagement_date: row.get(6)?,
        engagement_type: row.get(7)?,
        channel: row.get(8)?,
        summary: row.get(9)?,
        next_step: row.get(10)?,
        follow_up_date: row.get(11)?,
        owner: row.get(12)?,
    })
}

pub fn add_engagement(conn: &Connection, new: &NewEngagement) -> Result<i64> {
    let summary = clean(Some(new.summary.as_str()))
        .ok_or_else(|| AlmonerError::validation("Engagement summary is required."))?;
    get_donor(conn, new.donor_id)?;
    let engagement_type = clean(Some(new.engagement_type.as_str())).unwrap_or_else(|| "Note".to_string());

    conn.execute(
        "INSERT INTO engagements (donor_id, engagement_date, engagement_type, channel, summary, next_step, \
         follow_up_date, owner) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            new.donor_id,
            new.engagement_date.to_string(),
            engagement_type,
            clean(new.channel.as_deref()),
            summary,
            clean(new.next_step.as_deref()),
            new.follow_up_date.map(|d| d.to_string()),
            clean(new.owner.as_deref()),
        ],
    )?;
    let id = conn.last_insert_rowid();
    info!(engagement_id = id, donor_id = new.donor_id, "added engagement");
    Ok(id)
}

/// Most recent engagements first, optionally for a single donor.
pub fn list_engagements(conn: &Connection, donor_id: Option<i64>, limit: i64) -> Result<Vec<Engagement>> {
    let mut sql = ENGAGEMENT_SELECT.to_string();
    let mut values: Vec<Value> = Vec::new();
    if let Some(donor_id) = donor_id {
        sql.push_str(" WHERE e.donor_id = ?");
        values.push(donor_id.into());
    }
    sql.push_str(" ORDER BY e.engagement_date DESC, e.id DESC LIMIT ?");
    values.push(limit.into());

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(values), row_to_engagement)?;
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
        conn.execute(
            "INSERT INTO donors (donor_type, first_name, last_name) VALUES ('Individual', 'River', 'Lane')",
            [],
        )
        .unwrap();
        (dir, conn)
    }

    fn meeting(donor_id: i64, date: &str, summary: &str) -> NewEngagement {
        NewEngagement {
            donor_id,
            engagement_date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            engagement_type: "Meeting".to_string(),
            channel: Some("In person".to_string()),
            summary: summary.to_string(),
            next_step: None,
            follow_up_date: None,
            owner: None,
        }
    }

    #[test]
    fn test_summary_required_and_donor_must_exist() {
        let (_dir, conn) = test_db();
        assert_eq!(
            add_engagement(&conn, &meeting(1, "2026-02-18", "  ")).unwrap_err().to_string(),
            "Engagement summary is required."
        );
        assert!(matches!(
            add_engagement(&conn, &meeting(5, "2026-02-18", "Coffee")).unwrap_err(),
            AlmonerError::NotFound { kind: "Donor", id: 5 }
        ));
    }

    #[test]
    fn test_list_newest_first_with_limit() {
        let (_dir, conn) = test_db();
        add_engagement(&conn, &meeting(1, "2026-01-10", "Intro call")).unwrap();
        add_engagement(&conn, &meeting(1, "2026-02-18", "Site visit")).unwrap();

        let all = list_engagements(&conn, Some(1), DEFAULT_LIST_LIMIT).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].summary, "Site visit");
        assert_eq!(all[0].donor_name, "River Lane");

        assert_eq!(list_engagements(&conn, None, 1).unwrap().len(), 1);
        assert!(list_engagements(&conn, Some(2), DEFAULT_LIST_LIMIT).unwrap().is_empty());
    }
}
