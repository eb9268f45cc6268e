use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;

use crate::error::AlmonerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DonorType {
    Individual,
    Organization,
}

impl DonorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Individual => "Individual",
            Self::Organization => "Organization",
        }
    }
}

impl FromStr for DonorType {
    type Err = AlmonerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "individual" => Ok(Self::Individual),
            "organization" | "organisation" | "org" => Ok(Self::Organization),
            _ => Err(AlmonerError::validation(
                "Donor type must be Individual or Organization.",
            )),
        }
    }
}

/// Opportunity pipeline, in the order gifts normally move through it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Prospecting,
    Cultivation,
    Pledged,
    ClosedWon,
    ClosedLost,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Prospecting => "Prospecting",
            Self::Cultivation => "Cultivation",
            Self::Pledged => "Pledged",
            Self::ClosedWon => "Closed Won",
            Self::ClosedLost => "Closed Lost",
        }
    }

    pub fn is_open(&self) -> bool {
        !matches!(self, Self::ClosedWon | Self::ClosedLost)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = AlmonerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match key.as_str() {
            "prospecting" => Ok(Self::Prospecting),
            "cultivation" => Ok(Self::Cultivation),
            "pledged" => Ok(Self::Pledged),
            "closedwon" | "won" => Ok(Self::ClosedWon),
            "closedlost" | "lost" => Ok(Self::ClosedLost),
            _ => Err(AlmonerError::UnknownStage(s.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Donor {
    pub id: i64,
    pub donor_type: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub organization_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub lifecycle_stage: String,
    pub relationship_manager: Option<String>,
    pub preferred_channel: Option<String>,
    pub notes: Option<String>,
    pub created_at: String,
    pub total_given_cents: i64,
    pub last_donation_date: Option<String>,
    pub engagement_count: i64,
}

impl Donor {
    pub fn display_name(&self) -> String {
        donor_label(
            &self.donor_type,
            self.first_name.as_deref(),
            self.last_name.as_deref(),
            self.organization_name.as_deref(),
        )
    }
}

/// Input for a new donor; blank strings are treated as absent.
#[derive(Debug, Clone, Default)]
pub struct NewDonor {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub organization_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub lifecycle_stage: Option<String>,
    pub relationship_manager: Option<String>,
    pub preferred_channel: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Donation {
    pub id: i64,
    pub donor_id: i64,
    pub donor_name: String,
    pub donation_date: String,
    pub amount_cents: i64,
    pub donation_type: String,
    pub campaign_label: Option<String>,
    pub fund: Option<String>,
    pub payment_method: Option<String>,
    pub reference_code: Option<String>,
    pub bank_account_id: Option<i64>,
    pub ledger_entry_id: Option<i64>,
    pub is_anonymous: bool,
    pub opportunity_name: String,
    pub stage: String,
    pub close_date: Option<String>,
    pub probability_percent: i64,
    pub has_bank_match: bool,
}

#[derive(Debug, Clone)]
pub struct NewDonation {
    pub donor_id: i64,
    pub donation_date: NaiveDate,
    pub amount_cents: i64,
    pub donation_type: String,
    pub campaign: Option<String>,
    pub campaign_id: Option<i64>,
    pub fund: Option<String>,
    pub payment_method: Option<String>,
    pub reference_code: Option<String>,
    pub bank_account_id: Option<i64>,
    pub ledger_entry_id: Option<i64>,
    pub notes: Option<String>,
    pub is_anonymous: bool,
    pub opportunity_name: Option<String>,
    pub stage: Stage,
    pub close_date: Option<NaiveDate>,
    pub probability_percent: i64,
}

#[cfg(test)]
impl NewDonation {
    /// A closed-won one-time gift with no links, the common case for gift entry.
    pub fn gift(donor_id: i64, donation_date: NaiveDate, amount_cents: i64) -> Self {
        Self {
            donor_id,
            donation_date,
            amount_cents,
            donation_type: "One-time".to_string(),
            campaign: None,
            campaign_id: None,
            fund: None,
            payment_method: None,
            reference_code: None,
            bank_account_id: None,
            ledger_entry_id: None,
            notes: None,
            is_anonymous: false,
            opportunity_name: None,
            stage: Stage::ClosedWon,
            close_date: None,
            probability_percent: 100,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LedgerEntry {
    pub id: i64,
    pub posted_date: String,
    pub account_code: String,
    pub description: String,
    pub amount_cents: i64,
    pub reference_code: Option<String>,
    pub source: String,
    pub linked_donations: i64,
}

#[derive(Debug, Clone)]
pub struct BankAccount {
    pub id: i64,
    pub name: String,
    pub bank_name: Option<String>,
    pub account_last4: Option<String>,
    pub currency: String,
}

#[derive(Debug, Clone)]
pub struct BankTransaction {
    pub id: i64,
    pub bank_account_id: i64,
    pub transaction_date: String,
    pub description: String,
    pub amount_cents: i64,
    pub reference_code: Option<String>,
    pub donation_id: Option<i64>,
    pub ledger_entry_id: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct NewLedgerEntry {
    pub posted_date: NaiveDate,
    pub account_code: String,
    pub description: String,
    pub amount_cents: i64,
    pub reference_code: Option<String>,
    pub source: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct NewBankAccount {
    pub name: String,
    pub bank_name: Option<String>,
    pub account_last4: Option<String>,
    pub currency: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewBankTransaction {
    pub bank_account_id: i64,
    pub transaction_date: NaiveDate,
    pub description: String,
    pub amount_cents: i64,
    pub reference_code: Option<String>,
    pub ledger_entry_id: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct Campaign {
    pub id: i64,
    pub name: String,
    pub campaign_type: String,
    pub status: String,
    pub owner: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub goal_cents: i64,
    pub parent_name: Option<String>,
    pub gift_count: i64,
    pub raised_cents: i64,
}

#[derive(Debug, Clone)]
pub struct Engagement {
    pub id: i64,
    pub donor_id: i64,
    pub donor_name: String,
    pub engagement_date: String,
    pub engagement_type: String,
    pub channel: Option<String>,
    pub summary: String,
    pub next_step: Option<String>,
    pub follow_up_date: Option<String>,
    pub owner: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct NewCampaign {
    pub name: String,
    pub campaign_type: Option<String>,
    pub status: Option<String>,
    pub owner: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub goal_cents: i64,
    pub parent_campaign_id: Option<i64>,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewEngagement {
    pub donor_id: i64,
    pub engagement_date: NaiveDate,
    pub engagement_type: String,
    pub channel: Option<String>,
    pub summary: String,
    pub next_step: Option<String>,
    pub follow_up_date: Option<NaiveDate>,
    pub owner: Option<String>,
}

/// Trim a user-supplied string, mapping blanks to `None`.
pub fn clean(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Render a donor name from the columns a joined query returns.
pub fn donor_label(
    donor_type: &str,
    first: Option<&str>,
    last: Option<&str>,
    org: Option<&str>,
) -> String {
    if donor_type == DonorType::Organization.as_str() {
        return org.unwrap_or("Unnamed organization").to_string();
    }
    let full = format!("{} {}", first.unwrap_or("").trim(), last.unwrap_or("").trim());
    let full = full.trim();
    if full.is_empty() {
        "Unnamed donor".to_string()
    } else {
        full.to_string()
    }
}
