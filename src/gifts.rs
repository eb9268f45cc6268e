use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use tracing::info;

use crate::error::{AlmonerError, Result};
use crate::models::{clean, donor_label, Donation, NewDonation, Stage};
use crate::reconciler::Period;

pub const DONATION_SELECT: &str = "
    SELECT
        dn.id, dn.donor_id, d.donor_type, d.first_name, d.last_name, d.organization_name,
        dn.donation_date, dn.amount_cents, dn.donation_type,
        COALESCE(cp.name, dn.campaign), dn.fund, dn.payment_method, dn.reference_code,
        dn.bank_account_id, dn.ledger_entry_id, dn.is_anonymous,
        COALESCE(dn.opportunity_name, 'Donation on ' || dn.donation_date),
        COALESCE(dn.opportunity_stage, 'Closed Won'), dn.close_date, dn.probability_percent,
        EXISTS (SELECT 1 FROM bank_transactions bt WHERE bt.donation_id = dn.id)
    FROM donations dn
    JOIN donors d ON d.id = dn.donor_id
    LEFT JOIN campaigns cp ON cp.id = dn.campaign_id";

pub fn row_to_donation(row: &Row) -> rusqlite::Result<Donation> {
    let donor_type: String = row.get(2)?;
    let first: Option<String> = row.get(3)?;
    let last: Option<String> = row.get(4)?;
    let org: Option<String> = row.get(5)?;
    Ok(Donation {
        id: row.get(0)?,
        donor_id: row.get(1)?,
        donor_name: donor_label(&donor_type, first.as_deref(), last.as_deref(), org.as_deref()),
        donation_date: row.get(6)?,
        amount_cents: row.get(7)?,
        donation_type: row.get(8)?,
        campaign_label: row.get(9)?,
        fund: row.get(10)?,
        payment_method: row.get(11)?,
        reference_code: row.get(12)?,
        bank_account_id: row.get(13)?,
        ledger_entry_id: row.get(14)?,
        is_anonymous: row.get(15)?,
        opportunity_name: row.get(16)?,
        stage: row.get(17)?,
        close_date: row.get(18)?,
        probability_percent: row.get(19)?,
        has_bank_match: row.get(20)?,
    })
}

/// Record a gift or opportunity and return its id. Every donation row is
/// also an opportunity with a stage, close date and probability.
pub fn add_donation(conn: &Connection, new: &NewDonation) -> Result<i64> {
    if new.amount_cents <= 0 {
        return Err(AlmonerError::validation("Donation amount must be greater than zero."));
    }
    let donor_exists: Option<i64> = conn
        .query_row("SELECT id FROM donors WHERE id = ?1", [new.donor_id], |row| row.get(0))
        .optional()?;
    if donor_exists.is_none() {
        return Err(AlmonerError::NotFound {
            kind: "Donor",
            id: new.donor_id,
        });
    }

    let opportunity_name = clean(new.opportunity_name.as_deref())
        .unwrap_or_else(|| format!("Donation on {}", new.donation_date));

    let mut campaign = clean(new.campaign.as_deref());
    if let (None, Some(campaign_id)) = (&campaign, new.campaign_id) {
        campaign = conn
            .query_row("SELECT name FROM campaigns WHERE id = ?1", [campaign_id], |row| row.get(0))
            .optional()?;
    }

    let donation_type = clean(Some(new.donation_type.as_str())).unwrap_or_else(|| "One-time".to_string());
    let close_date = new.close_date.unwrap_or(new.donation_date);

    conn.execute(
        "INSERT INTO donations (donor_id, donation_date, amount_cents, donation_type, campaign, fund, \
         payment_method, reference_code, bank_account_id, ledger_entry_id, notes, is_anonymous, \
         opportunity_name, opportunity_stage, close_date, campaign_id, probability_percent) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
        params![
            new.donor_id,
            new.donation_date.to_string(),
            new.amount_cents,
            donation_type,
            campaign,
            clean(new.fund.as_deref()),
            clean(new.payment_method.as_deref()),
            clean(new.reference_code.as_deref()),
            new.bank_account_id,
            new.ledger_entry_id,
            clean(new.notes.as_deref()),
            new.is_anonymous,
            opportunity_name,
            new.stage.as_str(),
            close_date.to_string(),
            new.campaign_id,
            new.probability_percent.clamp(0, 100),
        ],
    )?;
    let id = conn.last_insert_rowid();
    info!(donation_id = id, amount_cents = new.amount_cents, stage = new.stage.as_str(), "added donation");
    Ok(id)
}

pub fn get_donation(conn: &Connection, donation_id: i64) -> Result<Donation> {
    conn.query_row(&format!("{DONATION_SELECT} WHERE dn.id = ?1"), [donation_id], row_to_donation)
        .optional()?
        .ok_or(AlmonerError::NotFound {
            kind: "Donation",
            id: donation_id,
        })
}

#[derive(Debug, Clone, Default)]
pub struct DonationFilter {
    pub donor_id: Option<i64>,
    pub bank_account_id: Option<i64>,
    pub period: Option<Period>,
    pub stage: Option<Stage>,
    pub campaign_id: Option<i64>,
    pub open_only: bool,
    /// Missing either a ledger link or a bank match.
    pub unreconciled_only: bool,
}

pub fn list_donations(conn: &Connection, filter: &DonationFilter) -> Result<Vec<Donation>> {
    let mut clauses: Vec<&str> = Vec::new();
    let mut values: Vec<Value> = Vec::new();

    if let Some(donor_id) = filter.donor_id {
        clauses.push("dn.donor_id = ?");
        values.push(donor_id.into());
    }
    if let Some(account) = filter.bank_account_id {
        clauses.push("dn.bank_account_id = ?");
        values.push(account.into());
    }
    if let Some(period) = &filter.period {
        clauses.push("dn.donation_date >= ? AND dn.donation_date <= ?");
        values.push(period.start.to_string().into());
        values.push(period.end.to_string().into());
    }
    if let Some(stage) = filter.stage {
        clauses.push("COALESCE(dn.opportunity_stage, 'Closed Won') = ?");
        values.push(stage.as_str().to_string().into());
    }
    if let Some(campaign_id) = filter.campaign_id {
        clauses.push("dn.campaign_id = ?");
        values.push(campaign_id.into());
    }
    if filter.open_only {
        clauses.push("COALESCE(dn.opportunity_stage, 'Closed Won') NOT IN ('Closed Won', 'Closed Lost')");
    }
    if filter.unreconciled_only {
        clauses.push(
            "(dn.ledger_entry_id IS NULL OR NOT EXISTS \
             (SELECT 1 FROM bank_transactions bt WHERE bt.donation_id = dn.id))",
        );
    }

    let where_sql = if clauses.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", clauses.join(" AND "))
    };
    let sql = format!(
        "{DONATION_SELECT}{where_sql} ORDER BY COALESCE(dn.close_date, dn.donation_date) DESC, dn.id DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(values), row_to_donation)?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineRow {
    pub stage: String,
    pub count: i64,
    pub total_cents: i64,
}

/// Opportunity count and value per stage, in pipeline order. Stages with no
/// opportunities are omitted; unrecognised stage labels sort last.
pub fn opportunity_pipeline(conn: &Connection) -> Result<Vec<PipelineRow>> {
    let mut stmt = conn.prepare(
        "SELECT COALESCE(opportunity_stage, 'Closed Won') AS stage_name, COUNT(*), \
                COALESCE(SUM(amount_cents), 0) \
         FROM donations \
         GROUP BY stage_name \
         ORDER BY CASE stage_name \
             WHEN 'Prospecting' THEN 1 WHEN 'Cultivation' THEN 2 WHEN 'Pledged' THEN 3 \
             WHEN 'Closed Won' THEN 4 WHEN 'Closed Lost' THEN 5 ELSE 99 END, stage_name",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(PipelineRow {
            stage: row.get(0)?,
            count: row.get(1)?,
            total_cents: row.get(2)?,
        })
    })?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}

/// Move an opportunity to a new stage, optionally resetting its probability.
pub fn update_opportunity_stage(
    conn: &Connection,
    donation_id: i64,
    stage: Stage,
    probability_percent: Option<i64>,
) -> Result<()> {
    let changed = match probability_percent {
        Some(probability) => conn.execute(
            "UPDATE donations SET opportunity_stage = ?1, probability_percent = ?2 WHERE id = ?3",
            params![stage.as_str(), probability.clamp(0, 100), donation_id],
        )?,
        None => conn.execute(
            "UPDATE donations SET opportunity_stage = ?1 WHERE id = ?2",
            params![stage.as_str(), donation_id],
        )?,
    };
    if changed == 0 {
        return Err(AlmonerError::NotFound {
            kind: "Donation",
            id: donation_id,
        });
    }
    info!(donation_id, stage = stage.as_str(), "updated opportunity stage");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::campaigns::add_campaign;
    use crate::db::{get_connection, init_db};
    use crate::donors::add_donor;
    use crate::models::{DonorType, NewCampaign, NewDonor};
    use chrono::NaiveDate;

    fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        (dir, conn)
    }

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn donor(conn: &Connection) -> i64 {
        let new = NewDonor {
            first_name: Some("Kai".to_string()),
            last_name: Some("Parker".to_string()),
            ..Default::default()
        };
        add_donor(conn, DonorType::Individual, &new).unwrap()
    }

    #[test]
    fn test_rejects_non_positive_amounts() {
        let (_dir, conn) = test_db();
        let donor_id = donor(&conn);
        for cents in [0, -100] {
            let err = add_donation(&conn, &NewDonation::gift(donor_id, d("2026-02-01"), cents)).unwrap_err();
            assert_eq!(err.to_string(), "Donation amount must be greater than zero.");
        }
    }

    #[test]
    fn test_rejects_unknown_donor() {
        let (_dir, conn) = test_db();
        let err = add_donation(&conn, &NewDonation::gift(9, d("2026-02-01"), 100)).unwrap_err();
        assert!(matches!(err, AlmonerError::NotFound { kind: "Donor", id: 9 }));
    }

    #[test]
    fn test_defaults_applied() {
        let (_dir, conn) = test_db();
        let donor_id = donor(&conn);
        let mut new = NewDonation::gift(donor_id, d("2026-02-14"), 5000);
        new.probability_percent = 250;
        let id = add_donation(&conn, &new).unwrap();

        let gift = get_donation(&conn, id).unwrap();
        assert_eq!(gift.opportunity_name, "Donation on 2026-02-14");
        assert_eq!(gift.stage, "Closed Won");
        assert_eq!(gift.close_date.as_deref(), Some("2026-02-14"));
        assert_eq!(gift.probability_percent, 100);
        assert_eq!(gift.donor_name, "Kai Parker");
        assert!(!gift.has_bank_match);
    }

    #[test]
    fn test_campaign_name_inferred_from_id() {
        let (_dir, conn) = test_db();
        let donor_id = donor(&conn);
        let campaign_id = add_campaign(
            &conn,
            &NewCampaign {
                name: "Spring Appeal".to_string(),
                goal_cents: 500000,
                ..Default::default()
            },
        )
        .unwrap();
        let mut new = NewDonation::gift(donor_id, d("2026-03-02"), 2500);
        new.campaign_id = Some(campaign_id);
        let id = add_donation(&conn, &new).unwrap();

        let stored: Option<String> = conn
            .query_row("SELECT campaign FROM donations WHERE id = ?1", [id], |r| r.get(0))
            .unwrap();
        assert_eq!(stored.as_deref(), Some("Spring Appeal"));

        let filter = DonationFilter {
            campaign_id: Some(campaign_id),
            ..Default::default()
        };
        assert_eq!(list_donations(&conn, &filter).unwrap().len(), 1);
    }

    #[test]
    fn test_pipeline_order_and_stage_updates() {
        let (_dir, conn) = test_db();
        let donor_id = donor(&conn);
        let mut pledge = NewDonation::gift(donor_id, d("2026-04-01"), 100000);
        pledge.stage = Stage::Pledged;
        pledge.probability_percent = 80;
        let pledge_id = add_donation(&conn, &pledge).unwrap();
        add_donation(&conn, &NewDonation::gift(donor_id, d("2026-02-01"), 5000)).unwrap();
        let mut prospect = NewDonation::gift(donor_id, d("2026-05-01"), 20000);
        prospect.stage = Stage::Prospecting;
        add_donation(&conn, &prospect).unwrap();

        let stages: Vec<String> = opportunity_pipeline(&conn).unwrap().into_iter().map(|r| r.stage).collect();
        assert_eq!(stages, vec!["Prospecting", "Pledged", "Closed Won"]);

        let open = list_donations(
            &conn,
            &DonationFilter {
                open_only: true,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(open.len(), 2);
        assert_eq!(open[0].stage, "Prospecting");

        update_opportunity_stage(&conn, pledge_id, Stage::ClosedWon, Some(-5)).unwrap();
        let updated = get_donation(&conn, pledge_id).unwrap();
        assert_eq!(updated.stage, "Closed Won");
        assert_eq!(updated.probability_percent, 0);

        let pipeline = opportunity_pipeline(&conn).unwrap();
        let won = pipeline.iter().find(|r| r.stage == "Closed Won").unwrap();
        assert_eq!(won.count, 2);
        assert_eq!(won.total_cents, 105000);

        assert!(update_opportunity_stage(&conn, 999, Stage::Pledged, None).is_err());
    }

    #[test]
    fn test_unreconciled_filter() {
        let (_dir, conn) = test_db();
        let donor_id = donor(&conn);
        add_donation(&conn, &NewDonation::gift(donor_id, d("2026-02-01"), 5000)).unwrap();
        let filter = DonationFilter {
            unreconciled_only: true,
            period: Some(Period::parse_month("2026-02").unwrap()),
            ..Default::default()
        };
        assert_eq!(list_donations(&conn, &filter).unwrap().len(), 1);
    }
}
