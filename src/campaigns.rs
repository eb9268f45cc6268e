use rusqlite::{params, Connection};
use tracing::info;

use crate::error::{AlmonerError, Result};
use crate::models::{clean, Campaign, NewCampaign};

pub fn add_campaign(conn: &Connection, new: &NewCampaign) -> Result<i64> {
    let name = clean(Some(new.name.as_str()))
        .ok_or_else(|| AlmonerError::validation("Campaign name is required."))?;
    if new.goal_cents < 0 {
        return Err(AlmonerError::validation("Campaign goal cannot be negative."));
    }

    conn.execute(
        "INSERT INTO campaigns (name, campaign_type, status, owner, start_date, end_date, goal_cents, \
         parent_campaign_id, description) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            name,
            clean(new.campaign_type.as_deref()).unwrap_or_else(|| "Fundraising".to_string()),
            clean(new.status.as_deref()).unwrap_or_else(|| "Planned".to_string()),
            clean(new.owner.as_deref()),
            new.start_date.map(|d| d.to_string()),
            new.end_date.map(|d| d.to_string()),
            new.goal_cents,
            new.parent_campaign_id,
            clean(new.description.as_deref()),
        ],
    )?;
    let id = conn.last_insert_rowid();
    info!(campaign_id = id, goal_cents = new.goal_cents, "added campaign");
    Ok(id)
}

/// Active campaigns, newest first, with gift count and amount raised.
pub fn list_campaigns(conn: &Connection) -> Result<Vec<Campaign>> {
    let mut stmt = conn.prepare(
        "SELECT c.id, c.name, c.campaign_type, c.status, c.owner, c.start_date, c.end_date, c.goal_cents, \
                parent.name, COUNT(dn.id), COALESCE(SUM(dn.amount_cents), 0) \
         FROM campaigns c \
         LEFT JOIN campaigns parent ON parent.id = c.parent_campaign_id \
         LEFT JOIN donations dn ON dn.campaign_id = c.id \
         WHERE c.active = 1 \
         GROUP BY c.id \
         ORDER BY c.created_at DESC, c.id DESC",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(Campaign {
            id: row.get(0)?,
            name: row.get(1)?,
            campaign_type: row.get(2)?,
            status: row.get(3)?,
            owner: row.get(4)?,
            start_date: row.get(5)?,
            end_date: row.get(6)?,
            goal_cents: row.get(7)?,
            parent_name: row.get(8)?,
            gift_count: row.get(9)?,
            raised_cents: row.get(10)?,
        })
    })?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}
