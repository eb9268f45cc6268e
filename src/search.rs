use std::cmp::Ordering;

use tracing::debug;

use crate::models::Donor;
use crate::normalize::{name_aliases, normalize_digits, normalize_token, similarity};

/// Minimum score a donor needs to appear in smart results.
pub const MIN_SCORE: u32 = 55;

const EXACT_TEXT: u32 = 240;
const PARTIAL_TEXT: u32 = 150;
const EXACT_PHONE: u32 = 240;
const PARTIAL_PHONE: u32 = 150;
const FIRST_NAME_ALIAS: u32 = 130;
const LAST_NAME_ALIAS: u32 = 90;
const NAME_PREFIX: u32 = 70;
const NAME_INFIX: u32 = 40;

// (minimum ratio, points); first bracket reached wins.
const SIMILARITY_BRACKETS: &[(f64, u32)] = &[(0.90, 120), (0.80, 80), (0.70, 45), (0.62, 20)];

/// Filter or rank donors against a free-text query. Smart ranking tolerates
/// nicknames, misspellings and phone fragments.
///
/// `donors` is expected in listing order (newest first); the plain filter and
/// a blank query both keep that order.
pub fn search<'a>(donors: &'a [Donor], query: &str, smart: bool) -> Vec<&'a Donor> {
    let query = query.trim();
    if query.is_empty() {
        return donors.iter().collect();
    }
    if !smart {
        return substring_filter(donors, query);
    }

    let mut scored: Vec<(u32, &Donor)> = donors
        .iter()
        .map(|donor| (score_donor(donor, query), donor))
        .filter(|(score, _)| *score >= MIN_SCORE)
        .collect();
    scored.sort_by(|a, b| rank_key_cmp(b, a));
    debug!(candidates = donors.len(), kept = scored.len(), "smart donor search");
    scored.into_iter().map(|(_, donor)| donor).collect()
}

fn substring_filter<'a>(donors: &'a [Donor], query: &str) -> Vec<&'a Donor> {
    let needle = query.to_lowercase();
    donors
        .iter()
        .filter(|donor| {
            [
                &donor.first_name,
                &donor.last_name,
                &donor.organization_name,
                &donor.email,
                &donor.phone,
            ]
            .into_iter()
            .flatten()
            .any(|field| field.to_lowercase().contains(&needle))
        })
        .collect()
}

// Ascending comparison of (score, last donation, created_at, id).
fn rank_key_cmp(a: &(u32, &Donor), b: &(u32, &Donor)) -> Ordering {
    a.0.cmp(&b.0)
        .then_with(|| {
            let left = a.1.last_donation_date.as_deref().unwrap_or("");
            let right = b.1.last_donation_date.as_deref().unwrap_or("");
            left.cmp(right)
        })
        .then_with(|| a.1.created_at.cmp(&b.1.created_at))
        .then_with(|| a.1.id.cmp(&b.1.id))
}

/// Additive relevance score for one donor. Zero when the query has no
/// letters or digits.
pub fn score_donor(donor: &Donor, query: &str) -> u32 {
    let query_norm = normalize_token(query);
    if query_norm.is_empty() {
        return 0;
    }
    let query_digits = normalize_digits(query);

    let first_name = donor.first_name.as_deref().unwrap_or("");
    let last_name = donor.last_name.as_deref().unwrap_or("");
    let full_name = format!("{first_name} {last_name}");

    let first = normalize_token(first_name);
    let last = normalize_token(last_name);
    let full = normalize_token(&full_name);
    let org = normalize_token(donor.organization_name.as_deref().unwrap_or(""));
    let email = normalize_token(donor.email.as_deref().unwrap_or(""));
    let phone = normalize_digits(donor.phone.as_deref().unwrap_or(""));

    let searchable = [&full, &first, &last, &org, &email];
    let mut score = 0;

    if searchable.iter().any(|f| !f.is_empty() && **f == query_norm) {
        score += EXACT_TEXT;
    } else if searchable.iter().any(|f| !f.is_empty() && f.contains(&query_norm)) {
        score += PARTIAL_TEXT;
    }

    if !query_digits.is_empty() && !phone.is_empty() {
        if query_digits == phone {
            score += EXACT_PHONE;
        } else if phone.contains(&query_digits) {
            score += PARTIAL_PHONE;
        }
    }

    for token in query.split_whitespace() {
        let aliases = name_aliases(token);
        if !first.is_empty() && aliases.contains(&first) {
            score += FIRST_NAME_ALIAS;
        }
        if !last.is_empty() && aliases.contains(&last) {
            score += LAST_NAME_ALIAS;
        }
    }

    let best_ratio = [&first, &last, &full, &org, &email]
        .iter()
        .map(|field| similarity(&query_norm, field))
        .fold(0.0_f64, f64::max);
    if let Some((_, points)) = SIMILARITY_BRACKETS
        .iter()
        .find(|(threshold, _)| best_ratio >= *threshold)
    {
        score += points;
    }

    if first.starts_with(&query_norm) || last.starts_with(&query_norm) {
        score += NAME_PREFIX;
    }

    if query_norm.chars().count() >= 4 && (first.contains(&query_norm) || last.contains(&query_norm)) {
        score += NAME_INFIX;
    }

    debug!(donor_id = donor.id, score, "scored donor");
    score
}

#[cfg(test)]
mod tests {
    use super::*;

    fn donor(id: i64, first: &str, last: &str, email: &str, phone: &str) -> Donor {
        Donor {
            id,
            donor_type: "Individual".to_string(),
            first_name: Some(first.to_string()),
            last_name: Some(last.to_string()),
            organization_name: None,
            email: Some(email.to_string()),
            phone: Some(phone.to_string()),
            lifecycle_stage: "Active".to_string(),
            relationship_manager: None,
            preferred_channel: None,
            notes: None,
            created_at: format!("2026-01-0{id} 10:00:00"),
            total_given_cents: 0,
            last_donation_date: None,
            engagement_count: 0,
        }
    }

    fn org(id: i64, name: &str) -> Donor {
        Donor {
            donor_type: "Organization".to_string(),
            first_name: None,
            last_name: None,
            organization_name: Some(name.to_string()),
            email: None,
            phone: None,
            ..donor(id, "", "", "", "")
        }
    }

    fn ids(results: &[&Donor]) -> Vec<i64> {
        results.iter().map(|d| d.id).collect()
    }

    #[test]
    fn test_nickname_found_only_by_smart_search() {
        let donors = vec![
            donor(2, "Nicole", "Sanders", "nicole@example.org", "555-2201"),
            donor(1, "Nick", "Harrison", "nick.h@example.org", "555-2200"),
        ];
        assert!(search(&donors, "Nicholas", false).is_empty());
        let smart = search(&donors, "Nicholas", true);
        assert_eq!(ids(&smart), vec![1]);
    }

    #[test]
    fn test_exact_full_name_scores_exact_match() {
        let d = donor(1, "Avery", "Mills", "avery@example.org", "");
        let score = score_donor(&d, "avery mills");
        assert!(score >= EXACT_TEXT + 120, "score was {score}");
        assert_eq!(ids(&search(&[d], "Avery Mills", true)), vec![1]);
    }

    #[test]
    fn test_exact_organization_name_matches() {
        let donors = vec![org(1, "Community Builders Foundation")];
        let results = search(&donors, "Community Builders Foundation", true);
        assert_eq!(ids(&results), vec![1]);
    }

    #[test]
    fn test_phone_fragment_matches() {
        let donors = vec![
            donor(1, "Avery", "Mills", "avery@example.org", "(555) 010-1234"),
            donor(2, "River", "Lane", "river@example.org", "555-999-0000"),
        ];
        let results = search(&donors, "010-1234", true);
        assert_eq!(ids(&results), vec![1]);
    }

    #[test]
    fn test_misspelling_passes_threshold() {
        let donors = vec![donor(1, "Casey", "Harrison", "casey@example.org", "")];
        let results = search(&donors, "Harison", true);
        assert_eq!(ids(&results), vec![1]);
    }

    #[test]
    fn test_transposed_letters_pass_threshold() {
        let donors = vec![
            donor(1, "Michael", "Smith", "msmith@example.org", ""),
            donor(2, "Avery", "Mills", "avery@example.org", ""),
        ];
        assert_eq!(score_donor(&donors[0], "Micheal"), 80);
        assert_eq!(ids(&search(&donors, "Micheal", true)), vec![1]);
    }

    #[test]
    fn test_unrelated_query_scores_below_threshold() {
        let d = donor(1, "Avery", "Mills", "avery@example.org", "");
        assert!(score_donor(&d, "Zimmerman") < MIN_SCORE);
        assert_eq!(score_donor(&d, "!!!"), 0);
    }

    #[test]
    fn test_ties_break_on_recent_gift_then_creation() {
        let mut older = donor(1, "Sam", "Ng", "", "");
        let mut newer = donor(2, "Sam", "Ng", "", "");
        older.last_donation_date = Some("2026-02-10".to_string());
        newer.last_donation_date = None;
        let donors = vec![newer.clone(), older.clone()];
        assert_eq!(ids(&search(&donors, "Sam Ng", true)), vec![1, 2]);

        older.last_donation_date = None;
        let donors = vec![older, newer];
        assert_eq!(ids(&search(&donors, "Sam Ng", true)), vec![2, 1]);
    }

    #[test]
    fn test_plain_filter_is_case_insensitive_and_keeps_order() {
        let donors = vec![
            donor(3, "Kai", "Parker", "kai@example.org", ""),
            donor(2, "River", "Lane", "river@example.org", ""),
            donor(1, "Avery", "Parkes", "avery@example.org", ""),
        ];
        assert_eq!(ids(&search(&donors, "PARK", false)), vec![3, 1]);
    }

    #[test]
    fn test_blank_query_returns_everything() {
        let donors = vec![donor(2, "Kai", "Parker", "", ""), donor(1, "Avery", "Mills", "", "")];
        assert_eq!(ids(&search(&donors, "   ", true)), vec![2, 1]);
    }
}
