use comfy_table::{Cell, Table};

use crate::campaigns::{add_campaign, list_campaigns};
use crate::cli::open_db;
use crate::error::Result;
use crate::fmt::money;
use crate::models::NewCampaign;

pub fn add(new: &NewCampaign) -> Result<()> {
    let conn = open_db()?;
    let id = add_campaign(&conn, new)?;
    println!("Added campaign #{id}: {}", new.name.trim());
    Ok(())
}

pub fn list() -> Result<()> {
    let conn = open_db()?;
    let campaigns = list_campaigns(&conn)?;
    if campaigns.is_empty() {
        println!("No active campaigns.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Type", "Status", "Parent", "Gifts", "Raised", "Goal"]);
    for c in &campaigns {
        table.add_row(vec![
            Cell::new(c.id),
            Cell::new(&c.name),
            Cell::new(&c.campaign_type),
            Cell::new(&c.status),
            Cell::new(c.parent_name.as_deref().unwrap_or("")),
            Cell::new(c.gift_count),
            Cell::new(money(c.raised_cents)),
            Cell::new(money(c.goal_cents)),
        ]);
    }
    println!("Campaigns\n{table}");
    Ok(())
}
