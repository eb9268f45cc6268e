use std::collections::{BTreeSet, HashMap};
use std::sync::LazyLock;

// Nickname groups. Every spelling in a group resolves to the whole group.
const NAME_GROUPS: &[&[&str]] = &[
    &["alexander", "alex", "xander", "sasha"],
    &["andrew", "andy", "drew"],
    &["anthony", "tony"],
    &["benjamin", "ben", "benny"],
    &["charles", "charlie", "chuck"],
    &["christopher", "chris"],
    &["daniel", "dan", "danny"],
    &["david", "dave", "davy"],
    &["elizabeth", "liz", "beth", "lizzy", "eliza"],
    &["james", "jim", "jimmy"],
    &["jennifer", "jen", "jenny"],
    &["joseph", "joe", "joey"],
    &["katherine", "kathryn", "kate", "katie", "kat"],
    &["margaret", "maggie", "meg", "peggy"],
    &["matthew", "matt"],
    &["michael", "mike", "mikey"],
    &["nicholas", "nick", "nicky", "nik"],
    &["patrick", "pat", "paddy"],
    &["robert", "rob", "bob", "bobby"],
    &["samantha", "sam", "sammy"],
    &["stephanie", "steph"],
    &["stephen", "steve", "steven"],
    &["thomas", "tom", "tommy"],
    &["victoria", "vicky", "tori"],
    &["william", "will", "bill", "billy", "liam"],
];

static ALIAS_LOOKUP: LazyLock<HashMap<String, BTreeSet<String>>> = LazyLock::new(|| {
    let mut lookup: HashMap<String, BTreeSet<String>> = HashMap::new();
    for group in NAME_GROUPS {
        let normalized: BTreeSet<String> = group
            .iter()
            .map(|name| normalize_token(name))
            .filter(|token| !token.is_empty())
            .collect();
        for token in &normalized {
            lookup
                .entry(token.clone())
                .or_default()
                .extend(normalized.iter().cloned());
        }
    }
    lookup
});

/// Lowercase and drop everything that is not a letter or digit.
pub fn normalize_token(value: &str) -> String {
    value
        .chars()
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_alphanumeric())
        .collect()
}

/// Keep only the digits; used to compare phone numbers.
pub fn normalize_digits(value: &str) -> String {
    value.chars().filter(char::is_ascii_digit).collect()
}

/// The nickname class a name belongs to, including the name itself.
///
/// Blank input yields an empty set; names outside the table yield a singleton.
pub fn name_aliases(value: &str) -> BTreeSet<String> {
    let token = normalize_token(value);
    if token.is_empty() {
        return BTreeSet::new();
    }
    let mut aliases = BTreeSet::from([token.clone()]);
    if let Some(group) = ALIAS_LOOKUP.get(&token) {
        aliases.extend(group.iter().cloned());
    }
    aliases
}

/// Edit-distance similarity in `[0, 1]`; `0.0` when either side is empty.
/// Adjacent transpositions count as one edit.
pub fn similarity(left: &str, right: &str) -> f64 {
    if left.is_empty() || right.is_empty() {
        return 0.0;
    }
    strsim::normalized_damerau_levenshtein(left, right)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_token() {
        assert_eq!(normalize_token("O'Brien-Smith"), "obriensmith");
        assert_eq!(normalize_token("  Jane.Doe@Example.org "), "janedoeexampleorg");
        assert_eq!(normalize_token(""), "");
    }

    #[test]
    fn test_normalize_digits() {
        assert_eq!(normalize_digits("(555) 220-0101"), "5552200101");
        assert_eq!(normalize_digits("no digits"), "");
    }

    #[test]
    fn test_aliases_resolve_whole_group() {
        let aliases = name_aliases("Bill");
        for name in ["william", "will", "bill", "billy", "liam"] {
            assert!(aliases.contains(name), "missing {name}");
        }
        assert!(name_aliases("Nicholas").contains("nick"));
    }

    #[test]
    fn test_aliases_unknown_and_blank() {
        assert_eq!(name_aliases("Zebulon"), BTreeSet::from(["zebulon".to_string()]));
        assert!(name_aliases("  ").is_empty());
    }

    #[test]
    fn test_similarity_bounds() {
        assert_eq!(similarity("", "nick"), 0.0);
        assert_eq!(similarity("nick", ""), 0.0);
        assert_eq!(similarity("harrison", "harrison"), 1.0);
        assert!((similarity("micheal", "michael") - 6.0 / 7.0).abs() < 1e-9);
        let a = similarity("harrison", "harison");
        let b = similarity("harison", "harrison");
        assert_eq!(a, b);
        assert!(a > 0.8 && a < 1.0);
    }
}
