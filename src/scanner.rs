use std::cmp::Ordering;
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::io::Write;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::{Regex, RegexSet};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{AlmonerError, Result};
use crate::medical_terms::{HIGH_RISK_FIELDS, MEDICAL_TERMS};

const EXCERPT_WINDOW: usize = 34;
const MASK_PLACEHOLDER: &str = "***";

static SSN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:\d{3}-\d{2}-\d{4}|\d{9})\b").expect("Invalid SSN regex")
});

static MRN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:mrn|medical\s*record(?:\s*number)?|patient\s*id)\b[^\n\r]{0,20}[:#-]?\s*[A-Z0-9-]{5,}",
    )
    .expect("Invalid MRN regex")
});

static DOB_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:dob|date\s*of\s*birth|born)\b[^\n\r]{0,28}(?:\d{1,2}[/-]\d{1,2}[/-]\d{2,4}|\d{4}-\d{2}-\d{2}|[A-Za-z]{3,9}\s+\d{1,2},\s+\d{4})",
    )
    .expect("Invalid DOB regex")
});

static INSURANCE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:member\s*id|policy\s*(?:id|number)|subscriber\s*id|group\s*number)\b[^\n\r]{0,20}[:#-]?\s*[A-Z0-9-]{4,}",
    )
    .expect("Invalid insurance regex")
});

static BILLING_CODE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:icd-?10|icd-?9|cpt)\b[^\n\r]{0,16}\b[A-Z]?\d{2,4}(?:\.\d{1,4})?\b")
        .expect("Invalid billing code regex")
});

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b[A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,}\b").expect("Invalid email regex")
});

static PHONE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\+?1[-.\s]?)?(?:\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4})").expect("Invalid phone regex")
});

static ADDRESS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b\d{1,6}\s+[A-Za-z0-9.'-]+(?:\s+[A-Za-z0-9.'-]+){0,4}\s+(?:st|street|ave|avenue|rd|road|dr|drive|blvd|boulevard|lane|ln|way|ct|court)\b",
    )
    .expect("Invalid address regex")
});

/// Medical vocabulary ordered longest first, so the most specific term wins.
static ORDERED_TERMS: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    let mut terms: Vec<&'static str> = MEDICAL_TERMS.to_vec();
    terms.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    terms.dedup();
    terms
});

fn term_pattern(term: &str) -> String {
    format!(r"(?i)\b{}\b", regex::escape(term))
}

static TERM_SET: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new(ORDERED_TERMS.iter().map(|t| term_pattern(t))).expect("Invalid medical term set")
});

static TERM_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    ORDERED_TERMS
        .iter()
        .map(|t| Regex::new(&term_pattern(t)).expect("Invalid medical term regex"))
        .collect()
});

// ---------------------------------------------------------------------------
// Signals and findings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn rank(&self) -> u8 {
        match self {
            Self::High => 3,
            Self::Medium => 2,
            Self::Low => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = AlmonerError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            _ => Err(AlmonerError::validation(format!(
                "Severity must be High, Medium or Low (got '{s}')."
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    Ssn,
    MedicalRecordNumber,
    DateOfBirth,
    InsuranceIdentifier,
    ClinicalBillingCode,
    MedicalContextWithIdentifier,
    MedicalContext,
}

impl Signal {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Ssn => "SSN",
            Self::MedicalRecordNumber => "Medical Record Number",
            Self::DateOfBirth => "Date of Birth",
            Self::InsuranceIdentifier => "Insurance Identifier",
            Self::ClinicalBillingCode => "Clinical Billing Code",
            Self::MedicalContextWithIdentifier => "Medical Context + Identifier",
            Self::MedicalContext => "Medical Context",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Self::ClinicalBillingCode | Self::MedicalContext => Severity::Medium,
            _ => Severity::High,
        }
    }

    pub fn confidence(&self) -> u8 {
        match self {
            Self::Ssn => 99,
            Self::MedicalRecordNumber => 94,
            Self::DateOfBirth => 92,
            Self::InsuranceIdentifier => 90,
            Self::MedicalContextWithIdentifier => 89,
            Self::ClinicalBillingCode => 82,
            Self::MedicalContext => 74,
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One logical record handed to the scanner: a label pair, the row id and
/// its text fields in column order.
#[derive(Debug, Clone)]
pub struct ScanRecord {
    pub object_name: String,
    pub table_name: String,
    pub record_id: i64,
    pub fields: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Finding {
    pub object_name: String,
    pub table_name: String,
    pub record_id: i64,
    pub field_name: String,
    pub signal: Signal,
    pub severity: Severity,
    pub confidence: u8,
    /// Masked; never the raw matched value.
    pub matched_text: String,
    pub context: String,
    pub reason: String,
}

// Pattern detectors that report every distinct literal hit.
struct PatternRule {
    signal: Signal,
    reason: &'static str,
    pattern: &'static LazyLock<Regex>,
}

static PATTERN_RULES: [PatternRule; 5] = [
    PatternRule {
        signal: Signal::Ssn,
        reason: "Matches US Social Security Number pattern.",
        pattern: &SSN_PATTERN,
    },
    PatternRule {
        signal: Signal::MedicalRecordNumber,
        reason: "Contains MRN or patient ID marker.",
        pattern: &MRN_PATTERN,
    },
    PatternRule {
        signal: Signal::DateOfBirth,
        reason: "Contains DOB/date-of-birth context.",
        pattern: &DOB_PATTERN,
    },
    PatternRule {
        signal: Signal::InsuranceIdentifier,
        reason: "Contains insurance member or policy identifier.",
        pattern: &INSURANCE_PATTERN,
    },
    PatternRule {
        signal: Signal::ClinicalBillingCode,
        reason: "Contains ICD/CPT clinical coding pattern.",
        pattern: &BILLING_CODE_PATTERN,
    },
];

// ---------------------------------------------------------------------------
// Per-field accumulator
// ---------------------------------------------------------------------------

/// Collects findings for a single field and suppresses repeats of the same
/// (signal, lowercased text) pair.
pub struct FieldScan<'a> {
    record: &'a ScanRecord,
    field_name: &'a str,
    text: &'a str,
    seen: HashSet<(Signal, String)>,
    findings: Vec<Finding>,
}

impl<'a> FieldScan<'a> {
    pub fn new(record: &'a ScanRecord, field_name: &'a str, text: &'a str) -> Self {
        Self {
            record,
            field_name,
            text,
            seen: HashSet::new(),
            findings: Vec::new(),
        }
    }

    pub fn text(&self) -> &'a str {
        self.text
    }

    pub fn field_name(&self) -> &'a str {
        self.field_name
    }

    /// Record a hit spanning `start..end` (byte offsets into the field text).
    /// Returns false when the pair was already reported for this field.
    pub fn push(&mut self, signal: Signal, reason: String, matched: &str, start: usize, end: usize) -> bool {
        if !self.seen.insert((signal, matched.to_lowercase())) {
            return false;
        }
        self.findings.push(Finding {
            object_name: self.record.object_name.clone(),
            table_name: self.record.table_name.clone(),
            record_id: self.record.record_id,
            field_name: self.field_name.to_string(),
            signal,
            severity: signal.severity(),
            confidence: signal.confidence(),
            matched_text: mask_match_text(matched),
            context: excerpt(self.text, start, end, EXCERPT_WINDOW),
            reason,
        });
        true
    }

    pub fn has_fired(&self, signal: Signal) -> bool {
        self.findings.iter().any(|f| f.signal == signal)
    }

    pub fn into_findings(self) -> Vec<Finding> {
        self.findings
    }
}

// ---------------------------------------------------------------------------
// Detectors
// ---------------------------------------------------------------------------

/// Identifier, date and code patterns. Each distinct literal hit is kept.
pub fn detect_patterns(scan: &mut FieldScan<'_>) {
    let text = scan.text();
    for rule in &PATTERN_RULES {
        for m in rule.pattern.find_iter(text) {
            scan.push(rule.signal, rule.reason.to_string(), m.as_str(), m.start(), m.end());
        }
    }
}

/// Medical vocabulary, either next to a personal identifier or inside a
/// free-text field. Reports at most one finding per field.
pub fn detect_medical_context(scan: &mut FieldScan<'_>) {
    let text = scan.text();
    let Some((term, start, end)) = first_medical_term(text) else {
        return;
    };

    if let Some(identifier) = identifier_hits(text).first() {
        scan.push(
            Signal::MedicalContextWithIdentifier,
            format!("Contains medical context ('{term}') with personal identifier ({identifier})."),
            term,
            start,
            end,
        );
    }
    if !scan.has_fired(Signal::MedicalContextWithIdentifier) && is_high_risk_field(scan.field_name()) {
        scan.push(
            Signal::MedicalContext,
            format!("Unstructured field contains medical term '{term}'."),
            term,
            start,
            end,
        );
    }
}

/// The longest vocabulary term present, with the byte span of its first hit.
pub fn first_medical_term(text: &str) -> Option<(&'static str, usize, usize)> {
    let index = TERM_SET.matches(text).into_iter().min()?;
    let m = TERM_PATTERNS[index].find(text)?;
    Some((ORDERED_TERMS[index], m.start(), m.end()))
}

/// Kinds of personal identifier present, in reporting order.
pub fn identifier_hits(text: &str) -> Vec<&'static str> {
    let mut hits = Vec::new();
    if EMAIL_PATTERN.is_match(text) {
        hits.push("email");
    }
    if PHONE_PATTERN.is_match(text) {
        hits.push("phone");
    }
    if ADDRESS_PATTERN.is_match(text) {
        hits.push("address");
    }
    hits
}

fn is_high_risk_field(field_name: &str) -> bool {
    let lowered = field_name.to_lowercase();
    HIGH_RISK_FIELDS.contains(&lowered.as_str())
}

// ---------------------------------------------------------------------------
// Output shaping
// ---------------------------------------------------------------------------

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Hide a matched value: short values become a placeholder, longer ones keep
/// only two characters at each end.
pub fn mask_match_text(text: &str) -> String {
    let clean: Vec<char> = collapse_whitespace(text).chars().collect();
    if clean.len() <= 6 {
        return MASK_PLACEHOLDER.to_string();
    }
    let head: String = clean[..2].iter().collect();
    let tail: String = clean[clean.len() - 2..].iter().collect();
    format!("{head}...{tail}")
}

/// Up to `window` characters either side of `start..end`, whitespace
/// collapsed, with `...` marking a cut.
pub fn excerpt(text: &str, start: usize, end: usize, window: usize) -> String {
    let left = if window == 0 {
        start
    } else {
        text[..start]
            .char_indices()
            .rev()
            .nth(window - 1)
            .map_or(0, |(i, _)| i)
    };
    let right = text[end..]
        .char_indices()
        .nth(window)
        .map_or(text.len(), |(i, _)| end + i);

    let mut snippet = collapse_whitespace(&text[left..right]);
    if left > 0 {
        snippet.insert_str(0, "...");
    }
    if right < text.len() {
        snippet.push_str("...");
    }
    snippet
}

fn severity_order(a: &Finding, b: &Finding) -> Ordering {
    a.severity
        .rank()
        .cmp(&b.severity.rank())
        .then_with(|| a.confidence.cmp(&b.confidence))
        .then_with(|| a.object_name.cmp(&b.object_name))
        .then_with(|| a.record_id.cmp(&b.record_id))
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Run every detector over one field's text.
pub fn scan_field(record: &ScanRecord, field_name: &str, text: &str) -> Vec<Finding> {
    let mut scan = FieldScan::new(record, field_name, text);
    detect_patterns(&mut scan);
    detect_medical_context(&mut scan);
    scan.into_findings()
}

/// Scan all records and return findings, highest risk first.
///
/// Every non-blank text field runs through the pattern and medical-context
/// detectors. Matched values are masked; the context excerpt keeps the
/// surrounding text for review. This is a review aid, not a compliance
/// determination.
pub fn scan(records: &[ScanRecord]) -> Vec<Finding> {
    let mut findings = Vec::new();
    for record in records {
        for (field_name, raw) in &record.fields {
            let text = raw.trim();
            if text.is_empty() {
                continue;
            }
            let hits = scan_field(record, field_name, text);
            if !hits.is_empty() {
                debug!(
                    table = %record.table_name,
                    record_id = record.record_id,
                    field = %field_name,
                    hits = hits.len(),
                    "field flagged"
                );
            }
            findings.extend(hits);
        }
    }
    findings.sort_by(|a, b| severity_order(b, a));
    info!(records = records.len(), findings = findings.len(), "sensitivity scan complete");
    findings
}

// ---------------------------------------------------------------------------
// Review helpers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub total: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub records_impacted: usize,
}

impl ScanSummary {
    pub fn from_findings(findings: &[Finding]) -> Self {
        let count = |s: Severity| findings.iter().filter(|f| f.severity == s).count();
        let records: BTreeSet<(&str, i64)> = findings
            .iter()
            .map(|f| (f.table_name.as_str(), f.record_id))
            .collect();
        Self {
            total: findings.len(),
            high: count(Severity::High),
            medium: count(Severity::Medium),
            low: count(Severity::Low),
            records_impacted: records.len(),
        }
    }
}

/// Narrow a finding list for review. Empty sets mean "no restriction".
#[derive(Debug, Clone, Default)]
pub struct FindingFilter {
    pub severities: Vec<Severity>,
    pub objects: Vec<String>,
    pub keyword: Option<String>,
}

impl FindingFilter {
    pub fn matches(&self, finding: &Finding) -> bool {
        if !self.severities.is_empty() && !self.severities.contains(&finding.severity) {
            return false;
        }
        if !self.objects.is_empty()
            && !self
                .objects
                .iter()
                .any(|o| o.eq_ignore_ascii_case(&finding.object_name))
        {
            return false;
        }
        match self.keyword.as_deref().map(str::trim) {
            Some(keyword) if !keyword.is_empty() => {
                let haystack = [
                    finding.signal.label(),
                    finding.field_name.as_str(),
                    finding.context.as_str(),
                    finding.reason.as_str(),
                    finding.object_name.as_str(),
                ]
                .join(" ")
                .to_lowercase();
                haystack.contains(&keyword.to_lowercase())
            }
            _ => true,
        }
    }

    pub fn apply<'a>(&self, findings: &'a [Finding]) -> Vec<&'a Finding> {
        findings.iter().filter(|f| self.matches(f)).collect()
    }
}

#[derive(Serialize)]
struct FindingCsvRow<'a> {
    #[serde(rename = "Severity")]
    severity: &'a str,
    #[serde(rename = "Object")]
    object: &'a str,
    #[serde(rename = "Record ID")]
    record_id: i64,
    #[serde(rename = "Field")]
    field: &'a str,
    #[serde(rename = "Signal")]
    signal: &'a str,
    #[serde(rename = "Confidence")]
    confidence: u8,
    #[serde(rename = "Matched Value")]
    matched_value: &'a str,
    #[serde(rename = "Context")]
    context: &'a str,
    #[serde(rename = "Why Flagged")]
    reason: &'a str,
}

/// Write findings as CSV, one row per finding, with a header line.
pub fn write_findings_csv<W: Write>(findings: &[&Finding], writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for f in findings {
        wtr.serialize(FindingCsvRow {
            severity: f.severity.as_str(),
            object: &f.object_name,
            record_id: f.record_id,
            field: &f.field_name,
            signal: f.signal.label(),
            confidence: f.confidence,
            matched_value: &f.matched_text,
            context: &f.context,
            reason: &f.reason,
        })?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(object: &str, table: &str, id: i64, fields: &[(&str, &str)]) -> ScanRecord {
        ScanRecord {
            object_name: object.to_string(),
            table_name: table.to_string(),
            record_id: id,
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    fn signals(findings: &[Finding]) -> Vec<&'static str> {
        findings.iter().map(|f| f.signal.label()).collect()
    }

    #[test]
    fn test_ssn_alone() {
        let records = vec![record("Accounts & Contacts", "donors", 1, &[("notes", "SSN 123-45-6789")])];
        let findings = scan(&records);
        assert_eq!(findings.len(), 1);
        let f = &findings[0];
        assert_eq!(f.signal, Signal::Ssn);
        assert_eq!(f.severity, Severity::High);
        assert_eq!(f.confidence, 99);
        assert!(!f.matched_text.contains("123-45-6789"));
        assert_eq!(f.matched_text, "12...89");
        assert_eq!(f.reason, "Matches US Social Security Number pattern.");
    }

    #[test]
    fn test_nine_digit_ssn_needs_whole_token() {
        let rec = record("Opportunities", "donations", 3, &[("reference_code", "123456789")]);
        assert_eq!(signals(&scan(&[rec])), vec!["SSN"]);
        let rec = record("Opportunities", "donations", 3, &[("reference_code", "CHK1234567890")]);
        assert!(scan(&[rec]).is_empty());
    }

    #[test]
    fn test_ssn_and_dob_context() {
        let rec = record(
            "Engagement Plans",
            "engagements",
            42,
            &[("summary", "Patient follow-up scheduled. DOB: 01/19/1988. SSN 123-45-6789 was provided.")],
        );
        let findings = scan(&[rec]);
        let found = signals(&findings);
        assert!(found.contains(&"SSN"));
        assert!(found.contains(&"Date of Birth"));
        assert!(found.contains(&"Medical Context"));
        assert_eq!(findings[0].signal, Signal::Ssn);
    }

    #[test]
    fn test_textual_date_of_birth() {
        let rec = record("Accounts & Contacts", "donors", 2, &[("notes", "Date of birth March 4, 1971 per form")]);
        assert!(signals(&scan(&[rec])).contains(&"Date of Birth"));
    }

    #[test]
    fn test_medical_record_and_insurance_identifiers() {
        let rec = record(
            "Bank Transactions",
            "bank_transactions",
            5,
            &[("description", "Reimb MRN: A12345-77 member id XK-9921")],
        );
        let found = signals(&scan(&[rec]));
        assert!(found.contains(&"Medical Record Number"));
        assert!(found.contains(&"Insurance Identifier"));
    }

    #[test]
    fn test_billing_code_is_medium() {
        let rec = record("Gift Entry & Ledger", "ledger_entries", 8, &[("account_code", "ICD-10 F32.9 coded")]);
        let findings = scan(&[rec]);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].signal, Signal::ClinicalBillingCode);
        assert_eq!(findings[0].severity, Severity::Medium);
        assert_eq!(findings[0].confidence, 82);
    }

    #[test]
    fn test_medical_context_with_identifier() {
        let rec = record(
            "Accounts & Contacts",
            "donors",
            7,
            &[(
                "notes",
                "Discussed spinal injury treatment plan with patient. Contact jane@example.org for updates.",
            )],
        );
        let findings = scan(&[rec]);
        assert_eq!(signals(&findings), vec!["Medical Context + Identifier"]);
        let f = &findings[0];
        assert_eq!(f.severity, Severity::High);
        assert_eq!(f.confidence, 89);
        assert!(f.reason.contains("'treatment plan'"));
        assert!(f.reason.contains("(email)"));
    }

    #[test]
    fn test_medical_context_with_street_address_in_any_field() {
        let rec = record(
            "Campaigns",
            "campaigns",
            4,
            &[("owner", "Dialysis pickup at 42 Elm Street on Fridays")],
        );
        let findings = scan(&[rec]);
        assert_eq!(signals(&findings), vec!["Medical Context + Identifier"]);
        assert!(findings[0].reason.contains("(address)"));
    }

    #[test]
    fn test_medical_term_alone_only_flags_free_text_fields() {
        let notes = record("Campaigns", "campaigns", 4, &[("Description", "Support rehabilitation services")]);
        let findings = scan(&[notes]);
        assert_eq!(signals(&findings), vec!["Medical Context"]);
        assert_eq!(findings[0].severity, Severity::Medium);
        assert_eq!(findings[0].confidence, 74);

        let name = record("Campaigns", "campaigns", 4, &[("name", "Support rehabilitation services")]);
        assert!(scan(&[name]).is_empty());
    }

    #[test]
    fn test_plain_contact_data_is_clean() {
        let rec = record(
            "Accounts & Contacts",
            "donors",
            9,
            &[
                ("first_name", "Nick"),
                ("last_name", "Harrison"),
                ("email", "nick@example.org"),
                ("phone", "555-2200"),
            ],
        );
        assert!(scan(&[rec]).is_empty());
    }

    #[test]
    fn test_identical_hits_are_reported_once() {
        let rec = record(
            "Engagement Plans",
            "engagements",
            1,
            &[("next_step", "SSN 123-45-6789 confirmed; repeat SSN 123-45-6789. Spouse 987-65-4321.")],
        );
        let findings = scan(&[rec]);
        let ssn: Vec<&Finding> = findings.iter().filter(|f| f.signal == Signal::Ssn).collect();
        assert_eq!(ssn.len(), 2);
    }

    #[test]
    fn test_field_scan_dedupes_case_insensitively() {
        let rec = record("Campaigns", "campaigns", 1, &[]);
        let text = "MRN abc123 and MRN ABC123";
        let mut scan = FieldScan::new(&rec, "notes", text);
        assert!(scan.push(Signal::MedicalRecordNumber, "r".to_string(), "MRN abc123", 0, 10));
        assert!(!scan.push(Signal::MedicalRecordNumber, "r".to_string(), "MRN ABC123", 15, 25));
        assert!(scan.push(Signal::Ssn, "r".to_string(), "MRN abc123", 0, 10));
        assert!(scan.has_fired(Signal::Ssn));
        assert_eq!(scan.into_findings().len(), 2);
    }

    #[test]
    fn test_findings_sorted_by_risk() {
        let records = vec![
            record("Campaigns", "campaigns", 1, &[("description", "Chronic condition support")]),
            record("Accounts & Contacts", "donors", 2, &[("reference_code", "ICD-10 F32.9")]),
            record("Accounts & Contacts", "donors", 3, &[("notes", "SSN 123-45-6789")]),
            record("Accounts & Contacts", "donors", 4, &[("notes", "SSN 223-45-6789")]),
        ];
        let findings = scan(&records);
        let order: Vec<(i64, &str)> = findings.iter().map(|f| (f.record_id, f.signal.label())).collect();
        assert_eq!(
            order,
            vec![
                (4, "SSN"),
                (3, "SSN"),
                (2, "Clinical Billing Code"),
                (1, "Medical Context"),
            ]
        );
    }

    #[test]
    fn test_mask_match_text() {
        assert_eq!(mask_match_text("dob"), "***");
        assert_eq!(mask_match_text("  a  b  c "), "***");
        assert_eq!(mask_match_text("treatment plan"), "tr...an");
        assert_eq!(mask_match_text("123   45"), "***");
        assert_eq!(mask_match_text("123  456"), "12...56");
    }

    #[test]
    fn test_excerpt_windows_and_ellipses() {
        let text = "short text";
        assert_eq!(excerpt(text, 0, 5, 34), "short text");

        let long = format!("{}TARGET{}", "a".repeat(50), "b".repeat(50));
        let out = excerpt(&long, 50, 56, 34);
        assert_eq!(out, format!("...{}TARGET{}...", "a".repeat(34), "b".repeat(34)));
    }

    #[test]
    fn test_excerpt_respects_multibyte_characters() {
        let text = "é".repeat(40) + "SSN" + &"ü".repeat(40);
        let start = "é".repeat(40).len();
        let out = excerpt(&text, start, start + 3, 5);
        assert_eq!(out, format!("...{}SSN{}...", "é".repeat(5), "ü".repeat(5)));
    }

    #[test]
    fn test_summary_and_filter() {
        let records = vec![
            record("Accounts & Contacts", "donors", 3, &[("reference_code", "SSN 123-45-6789, ICD-10 F32.9")]),
            record("Campaigns", "campaigns", 1, &[("description", "Chronic condition support")]),
        ];
        let findings = scan(&records);
        let summary = ScanSummary::from_findings(&findings);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.high, 1);
        assert_eq!(summary.medium, 2);
        assert_eq!(summary.records_impacted, 2);

        let filter = FindingFilter {
            severities: vec![Severity::Medium],
            objects: vec!["campaigns".to_string(), "Accounts & Contacts".to_string()],
            keyword: Some("icd/cpt".to_string()),
        };
        let kept = filter.apply(&findings);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].signal, Signal::ClinicalBillingCode);
    }

    #[test]
    fn test_write_findings_csv() {
        let records = vec![record("Accounts & Contacts", "donors", 3, &[("notes", "SSN 123-45-6789")])];
        let findings = scan(&records);
        let refs: Vec<&Finding> = findings.iter().collect();
        let mut out = Vec::new();
        write_findings_csv(&refs, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "Severity,Object,Record ID,Field,Signal,Confidence,Matched Value,Context,Why Flagged"
        );
        let row = lines.next().unwrap();
        assert!(row.starts_with("High,Accounts & Contacts,3,notes,SSN,99,12...89,"));
        assert!(row.ends_with("Matches US Social Security Number pattern."));
    }
}
