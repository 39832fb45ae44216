use once_cell::sync::Lazy;
use regex::Regex;

use super::{standardize_row, RawRow, SourceNormalizer};
use crate::domain::{CatalogKind, Parameter, PlanetRecord, Status};

static HREF: Lazy<Regex> = Lazy::new(|| Regex::new(r#"href=["']?([^"'\s>]+)"#).expect("valid regex"));

static ADS_ABSTRACT: Lazy<Regex> = Lazy::new(|| Regex::new(r"/abs/([^/?#\s]+)").expect("valid regex"));

static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));

impl SourceNormalizer for CatalogKind {
    fn standardize(&self, row: &RawRow) -> Option<PlanetRecord> {
        standardize_row(self, *self, row)
    }

    fn convert_coordinates(&self, ra: &str, dec: &str) -> (Option<f64>, Option<f64>) {
        (parse_ra(ra), parse_dec(dec))
    }

    fn remove_theoretical_masses(&self, record: &mut PlanetRecord, mass_provenance: &str) {
        let provenance = mass_provenance.to_lowercase();
        let theoretical = match self {
            CatalogKind::Eu => provenance.contains("theoretical"),
            CatalogKind::Nasa => provenance.contains("m-r relationship"),
            _ => false,
        };
        if theoretical {
            record.measurements.set(Parameter::Mass, Default::default());
        }
    }

    fn handle_reference_format(&self, raw: &str) -> Option<String> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        let reference = match self {
            // NASA ships HTML anchors; keep the bibcode when the link points at ADS
            CatalogKind::Nasa if raw.contains('<') => match HREF.captures(raw) {
                Some(caps) => {
                    let href = &caps[1];
                    ADS_ABSTRACT
                        .captures(href)
                        .map(|abs| abs[1].replace("%26", "&"))
                        .unwrap_or_else(|| href.to_string())
                }
                None => HTML_TAG.replace_all(raw, "").trim().to_string(),
            },
            _ => raw.to_string(),
        };
        Some(reference).filter(|r| !r.is_empty())
    }

    fn assign_status(&self, raw: &str) -> Status {
        let lower = raw.trim().to_lowercase();
        match self {
            // The planetary-systems table only lists confirmed planets
            CatalogKind::Nasa if lower.is_empty() => Status::Confirmed,
            CatalogKind::Eu => match lower.as_str() {
                "confirmed" => Status::Confirmed,
                "candidate" | "controversial" | "unconfirmed" => Status::Candidate,
                "retracted" => Status::FalsePositive,
                _ => Status::parse(raw),
            },
            CatalogKind::Oec if lower.contains("retracted") => Status::FalsePositive,
            CatalogKind::Oec if lower.contains("confirmed") => Status::Confirmed,
            CatalogKind::Oec
                if lower.contains("controversial") || lower.contains("candidate") || lower.contains("objects of interest") =>
            {
                Status::Candidate
            }
            CatalogKind::Toi => match raw.trim().to_uppercase().as_str() {
                "CP" | "KP" => Status::Confirmed,
                "PC" | "APC" => Status::Candidate,
                "FP" | "FA" => Status::FalsePositive,
                _ => Status::parse(raw),
            },
            _ => Status::parse(raw),
        }
    }
}

/// Right ascension as decimal degrees or sexagesimal hours (`22 57 27.98`, `22:57:27.98`)
pub fn parse_ra(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if let Ok(deg) = raw.parse::<f64>() {
        return Some(deg).filter(|d| d.is_finite());
    }
    parse_sexagesimal(raw).map(|(_, hours)| hours * 15.0)
}

/// Declination as decimal degrees or sexagesimal degrees (`+20 46 07.5`)
pub fn parse_dec(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if let Ok(deg) = raw.parse::<f64>() {
        return Some(deg).filter(|d| d.is_finite());
    }
    parse_sexagesimal(raw).map(|(negative, deg)| if negative { -deg } else { deg })
}

/// Returns (negative sign, unsigned value in the leading unit)
fn parse_sexagesimal(raw: &str) -> Option<(bool, f64)> {
    let negative = raw.starts_with('-');
    let body = raw.trim_start_matches(|c: char| c == '+' || c == '-');
    let parts: Vec<f64> = body
        .split(|c: char| c == ':' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(|part| part.parse::<f64>())
        .collect::<Result<_, _>>()
        .ok()?;
    if parts.is_empty() || parts.len() > 3 {
        return None;
    }
    let value = parts
        .iter()
        .enumerate()
        .map(|(i, part)| part / 60f64.powi(i as i32))
        .sum::<f64>();
    Some((negative, value))
}
