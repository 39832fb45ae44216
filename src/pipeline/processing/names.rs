//! String cleanup helpers for star and planet designations.
//!
//! These encode catalog naming conventions (component suffixes, fractional
//! candidate numbering) and are kept as small pure functions so each rule can
//! be tested on its own.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::constants::{ROGUE, S_TYPE};

static TRAILING_COMPONENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<base>.*\S)\s+\(?(?P<component>A|B|C|D|AB|AC|BC)\)?$").expect("valid regex")
});

static FRACTIONAL_LETTER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\.\d+$").expect("valid regex"));

static FRACTIONAL_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<base>.+?)(?P<fraction>\.\d{2,})$").expect("valid regex"));

/// True for labels that carry no component information (empty, `S-type`)
pub fn is_weak_binary(label: &str) -> bool {
    let label = label.trim();
    label.is_empty() || label.eq_ignore_ascii_case(S_TYPE) || label.eq_ignore_ascii_case("nan")
}

/// Labels worth appending to a display name or a resolver query
pub fn is_component_label(label: &str) -> bool {
    !is_weak_binary(label) && label.trim() != ROGUE
}

/// Component suffix at the end of a star name, e.g. `B` in `HD 41004 B`
/// or `AB` in `2MASS J0103-55 (AB)`
pub fn trailing_component(name: &str) -> Option<&str> {
    TRAILING_COMPONENT
        .captures(name.trim())
        .and_then(|caps| caps.name("component"))
        .map(|m| m.as_str())
}

/// Star name with any trailing component suffix removed
pub fn strip_trailing_component(name: &str) -> String {
    let trimmed = name.trim();
    match TRAILING_COMPONENT.captures(trimmed) {
        Some(caps) => caps
            .name("base")
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| trimmed.to_string()),
        None => trimmed.to_string(),
    }
}

/// `HD 41004` + `B` as `HD 41004 B`
pub fn with_component(host: &str, binary: &str) -> String {
    format!("{} {}", host.trim(), binary.trim())
}

/// `HD 41004` + `B` as `HD 41004B`, the unspaced form some databases use
pub fn with_component_unspaced(host: &str, binary: &str) -> String {
    format!("{}{}", host.trim(), binary.trim())
}

/// Candidate slots such as `.01` used by TOI and KOI numbering
pub fn is_fractional_letter(letter: &str) -> bool {
    FRACTIONAL_LETTER.is_match(letter.trim())
}

/// Splits `TOI-1234.01` into (`TOI-1234`, `.01`)
pub fn fractional_designation(name: &str) -> Option<(String, String)> {
    FRACTIONAL_NAME.captures(name.trim()).and_then(|caps| {
        let base = caps.name("base")?.as_str().trim().to_string();
        let fraction = caps.name("fraction")?.as_str().to_string();
        Some((base, fraction))
    })
}

/// Comma-separated alias list, trimmed and without empties
pub fn split_aliases(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|alias| !alias.is_empty() && *alias != "nan")
        .map(str::to_string)
        .collect()
}

/// Display name: main_id without its component suffix, then component and slot
pub fn canonical_name(main_id: &str, binary: &str, letter: &str) -> String {
    let mut name = strip_trailing_component(main_id);
    if is_component_label(binary) {
        name.push(' ');
        name.push_str(binary.trim());
    }
    if !letter.trim().is_empty() {
        if !is_fractional_letter(letter) {
            name.push(' ');
        }
        name.push_str(letter.trim());
    }
    name
}
