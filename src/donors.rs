use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::info;

use crate::error::{AlmonerError, Result};
use crate::models::{clean, Donor, DonorType, NewDonor};
use crate::search;

pub const DEFAULT_LIFECYCLE_STAGE: &str = "Prospect";

const DONOR_SELECT: &str = "
    SELECT
        d.id, d.donor_type, d.first_name, d.last_name, d.organization_name,
        d.email, d.phone, d.lifecycle_stage, d.relationship_manager,
        d.preferred_channel, d.notes, d.created_at,
        (SELECT COALESCE(SUM(amount_cents), 0) FROM donations dn WHERE dn.donor_id = d.id),
        (SELECT MAX(donation_date) FROM donations dn WHERE dn.donor_id = d.id),
        (SELECT COUNT(*) FROM engagements e WHERE e.donor_id = d.id)
    FROM donors d";

fn row_to_donor(row: &Row) -> rusqlite::Result<Donor> {
    Ok(Donor {
        id: row.get(0)?,
        donor_type: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        organization_name: row.get(4)?,
        email: row.get(5)?,
        phone: row.get(6)?,
        lifecycle_stage: row.get(7)?,
        relationship_manager: row.get(8)?,
        preferred_channel: row.get(9)?,
        notes: row.get(10)?,
        created_at: row.get(11)?,
        total_given_cents: row.get(12)?,
        last_donation_date: row.get(13)?,
        engagement_count: row.get(14)?,
    })
}

/// Insert a donor. Identity fields are checked against the donor type and
/// the other type's fields are dropped.
pub fn add_donor(conn: &Connection, donor_type: DonorType, new: &NewDonor) -> Result<i64> {
    let mut first = clean(new.first_name.as_deref());
    let mut last = clean(new.last_name.as_deref());
    let mut org = clean(new.organization_name.as_deref());

    match donor_type {
        DonorType::Individual => {
            if first.is_none() || last.is_none() {
                return Err(AlmonerError::validation(
                    "Individual donors require first and last name.",
                ));
            }
            org = None;
        }
        DonorType::Organization => {
            if org.is_none() {
                return Err(AlmonerError::validation(
                    "Organization donors require an organization name.",
                ));
            }
            first = None;
            last = None;
        }
    }

    let lifecycle = clean(new.lifecycle_stage.as_deref()).unwrap_or_else(|| DEFAULT_LIFECYCLE_STAGE.to_string());

    conn.execute(
        "INSERT INTO donors (donor_type, first_name, last_name, organization_name, email, phone, \
         lifecycle_stage, relationship_manager, preferred_channel, notes) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            donor_type.as_str(),
            first,
            last,
            org,
            clean(new.email.as_deref()),
            clean(new.phone.as_deref()),
            lifecycle,
            clean(new.relationship_manager.as_deref()),
            clean(new.preferred_channel.as_deref()),
            clean(new.notes.as_deref()),
        ],
    )?;
    let id = conn.last_insert_rowid();
    info!(donor_id = id, donor_type = donor_type.as_str(), "added donor");
    Ok(id)
}

pub fn get_donor(conn: &Connection, donor_id: i64) -> Result<Donor> {
    conn.query_row(&format!("{DONOR_SELECT} WHERE d.id = ?1"), [donor_id], row_to_donor)
        .optional()?
        .ok_or(AlmonerError::NotFound {
            kind: "Donor",
            id: donor_id,
        })
}

/// All donors, newest first, optionally narrowed by a search term.
pub fn list_donors(conn: &Connection, term: &str, smart: bool) -> Result<Vec<Donor>> {
    let mut stmt = conn.prepare(&format!("{DONOR_SELECT} ORDER BY d.created_at DESC, d.id DESC"))?;
    let donors = stmt
        .query_map([], row_to_donor)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(search::search(&donors, term, smart).into_iter().cloned().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{get_connection, init_db};

    fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        (dir, conn)
    }

    fn person(first: &str, last: &str) -> NewDonor {
        NewDonor {
            first_name: Some(first.to_string()),
            last_name: Some(last.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_individual_requires_both_names() {
        let (_dir, conn) = test_db();
        let err = add_donor(&conn, DonorType::Individual, &person("Avery", "  ")).unwrap_err();
        assert_eq!(err.to_string(), "Individual donors require first and last name.");
    }

    #[test]
    fn test_organization_requires_name_and_drops_person_fields() {
        let (_dir, conn) = test_db();
        assert!(add_donor(&conn, DonorType::Organization, &NewDonor::default()).is_err());

        let new = NewDonor {
            organization_name: Some(" Community Builders Foundation ".to_string()),
            first_name: Some("Ignored".to_string()),
            ..Default::default()
        };
        let id = add_donor(&conn, DonorType::Organization, &new).unwrap();
        let donor = get_donor(&conn, id).unwrap();
        assert_eq!(donor.organization_name.as_deref(), Some("Community Builders Foundation"));
        assert_eq!(donor.first_name, None);
        assert_eq!(donor.display_name(), "Community Builders Foundation");
    }

    #[test]
    fn test_defaults_and_blank_cleanup() {
        let (_dir, conn) = test_db();
        let mut new = person("Avery", "Mills");
        new.email = Some("   ".to_string());
        let id = add_donor(&conn, DonorType::Individual, &new).unwrap();
        let donor = get_donor(&conn, id).unwrap();
        assert_eq!(donor.lifecycle_stage, "Prospect");
        assert_eq!(donor.email, None);
        assert_eq!(donor.total_given_cents, 0);
        assert_eq!(donor.last_donation_date, None);
    }

    #[test]
    fn test_get_missing_donor() {
        let (_dir, conn) = test_db();
        assert!(matches!(
            get_donor(&conn, 42).unwrap_err(),
            AlmonerError::NotFound { kind: "Donor", id: 42 }
        ));
    }

    #[test]
    fn test_list_rolls_up_giving_and_searches() {
        let (_dir, conn) = test_db();
        let nick = add_donor(&conn, DonorType::Individual, &person("Nick", "Harrison")).unwrap();
        add_donor(&conn, DonorType::Individual, &person("Nicole", "Sanders")).unwrap();
        conn.execute(
            "INSERT INTO donations (donor_id, donation_date, amount_cents) VALUES (?1, '2026-02-01', 2500), (?1, '2026-02-15', 7500)",
            [nick],
        )
        .unwrap();

        let all = list_donors(&conn, "", false).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].first_name.as_deref(), Some("Nicole"));
        let harrison = all.iter().find(|d| d.id == nick).unwrap();
        assert_eq!(harrison.total_given_cents, 10000);
        assert_eq!(harrison.last_donation_date.as_deref(), Some("2026-02-15"));

        assert!(list_donors(&conn, "Nicholas", false).unwrap().is_empty());
        let smart = list_donors(&conn, "Nicholas", true).unwrap();
        assert_eq!(smart.len(), 1);
        assert_eq!(smart[0].id, nick);
    }
}
