use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::open_db;
use crate::error::Result;
use crate::fmt::money;
use crate::gifts::{add_donation, get_donation, list_donations, opportunity_pipeline, update_opportunity_stage, DonationFilter};
use crate::models::{NewDonation, Stage};

pub fn add(new: &NewDonation) -> Result<()> {
    let conn = open_db()?;
    let id = add_donation(&conn, new)?;
    println!("Recorded gift #{id}: {}", money(new.amount_cents));
    Ok(())
}

pub fn list(filter: &DonationFilter) -> Result<()> {
    let conn = open_db()?;
    let donations = list_donations(&conn, filter)?;
    if donations.is_empty() {
        println!("No gifts found.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Date", "Donor", "Amount", "Type", "Stage", "Campaign", "Reference", "Bank", "Ledger"]);
    let mut total = 0i64;
    for d in &donations {
        total += d.amount_cents;
        let donor = if d.is_anonymous {
            format!("{} (anon)", d.donor_name)
        } else {
            d.donor_name.clone()
        };
        table.add_row(vec![
            Cell::new(d.id),
            Cell::new(&d.donation_date),
            Cell::new(donor),
            Cell::new(money(d.amount_cents)),
            Cell::new(&d.donation_type),
            Cell::new(&d.stage),
            Cell::new(d.campaign_label.as_deref().unwrap_or("")),
            Cell::new(d.reference_code.as_deref().unwrap_or("")),
            Cell::new(if d.has_bank_match { "matched" } else { "-" }),
            Cell::new(d.ledger_entry_id.map(|id| format!("#{id}")).unwrap_or_else(|| "-".to_string())),
        ]);
    }
    println!("Gifts\n{table}");
    println!("{} {} across {} gift(s)", "Total:".bold(), money(total).green(), donations.len());
    Ok(())
}

pub fn stage(donation_id: i64, stage: &str, probability: Option<i64>) -> Result<()> {
    let stage: Stage = stage.parse()?;
    let conn = open_db()?;
    update_opportunity_stage(&conn, donation_id, stage, probability)?;
    let gift = get_donation(&conn, donation_id)?;
    let label = format!("{} ({}, {})", gift.opportunity_name, gift.donor_name, money(gift.amount_cents));
    if stage.is_open() {
        println!("{label} moved to {stage} at {}%", gift.probability_percent);
    } else {
        println!("{label} closed as {stage}");
    }
    Ok(())
}

pub fn pipeline() -> Result<()> {
    let conn = open_db()?;
    let rows = opportunity_pipeline(&conn)?;

    let mut table = Table::new();
    table.set_header(vec!["Stage", "Count", "Value"]);
    for row in &rows {
        table.add_row(vec![
            Cell::new(&row.stage),
            Cell::new(row.count),
            Cell::new(money(row.total_cents)),
        ]);
    }
    println!("Opportunity Pipeline\n{table}");
    Ok(())
}
