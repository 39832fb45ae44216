//! Domain data shapes shared across layers
//!
//! A [`PlanetRecord`] is one row of one source catalog after normalization. It is
//! enriched by resolution and reconciliation, then consumed by the merger which
//! produces one [`MergedEntry`] per physical planet.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::constants;

/// Source catalogs feeding the merge
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogKind {
    Nasa,
    Eu,
    Oec,
    Toi,
    Koi,
    Epic,
}

impl CatalogKind {
    pub const ALL: [CatalogKind; 6] = [
        CatalogKind::Nasa,
        CatalogKind::Eu,
        CatalogKind::Oec,
        CatalogKind::Toi,
        CatalogKind::Koi,
        CatalogKind::Epic,
    ];

    pub fn tag(&self) -> &'static str {
        match self {
            CatalogKind::Nasa => constants::NASA_CATALOG,
            CatalogKind::Eu => constants::EU_CATALOG,
            CatalogKind::Oec => constants::OEC_CATALOG,
            CatalogKind::Toi => constants::TOI_CATALOG,
            CatalogKind::Koi => constants::KOI_CATALOG,
            CatalogKind::Epic => constants::EPIC_CATALOG,
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        let tag = tag.trim();
        Self::ALL.into_iter().find(|kind| kind.tag() == tag)
    }

    /// Output column holding this catalog's own planet name
    pub fn name_column(&self) -> &'static str {
        match self {
            CatalogKind::Nasa => "nasa_name",
            CatalogKind::Eu => "eu_name",
            CatalogKind::Oec => "oec_name",
            CatalogKind::Toi => "toi_name",
            CatalogKind::Koi => "koi_name",
            CatalogKind::Epic => "epic_name",
        }
    }
}

impl fmt::Display for CatalogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Planet disposition as reported by a catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Status {
    Confirmed,
    Candidate,
    FalsePositive,
    Unknown,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Confirmed => "CONFIRMED",
            Status::Candidate => "CANDIDATE",
            Status::FalsePositive => "FALSE POSITIVE",
            Status::Unknown => "UNKNOWN",
        }
    }

    /// Lenient parse of the common spellings; anything unrecognised is `Unknown`
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_uppercase().replace('_', " ").as_str() {
            "CONFIRMED" => Status::Confirmed,
            "CANDIDATE" => Status::Candidate,
            "FALSE POSITIVE" => Status::FalsePositive,
            _ => Status::Unknown,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Physical parameters carried as measurements
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Parameter {
    Period,
    SemiMajorAxis,
    Eccentricity,
    Inclination,
    Radius,
    Mass,
    Msini,
}

impl Parameter {
    pub const ALL: [Parameter; 7] = [
        Parameter::Period,
        Parameter::SemiMajorAxis,
        Parameter::Eccentricity,
        Parameter::Inclination,
        Parameter::Radius,
        Parameter::Mass,
        Parameter::Msini,
    ];

    /// Column stem used in tables (`p`, `p_max`, `p_min`, `p_url`)
    pub fn column(&self) -> &'static str {
        match self {
            Parameter::Period => "p",
            Parameter::SemiMajorAxis => "a",
            Parameter::Eccentricity => "e",
            Parameter::Inclination => "i",
            Parameter::Radius => "r",
            Parameter::Mass => "mass",
            Parameter::Msini => "msini",
        }
    }

    fn index(&self) -> usize {
        match self {
            Parameter::Period => 0,
            Parameter::SemiMajorAxis => 1,
            Parameter::Eccentricity => 2,
            Parameter::Inclination => 3,
            Parameter::Radius => 4,
            Parameter::Mass => 5,
            Parameter::Msini => 6,
        }
    }
}

/// A value with asymmetric error bounds and the reference it came from
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub value: Option<f64>,
    /// Lower uncertainty (positive magnitude)
    pub error_min: Option<f64>,
    /// Upper uncertainty (positive magnitude)
    pub error_max: Option<f64>,
    pub url: Option<String>,
}

impl Measurement {
    pub fn new(value: f64, error_min: Option<f64>, error_max: Option<f64>, url: Option<&str>) -> Self {
        Self {
            value: Some(value),
            error_min,
            error_max,
            url: url.map(str::to_string),
        }
    }

    pub fn is_present(&self) -> bool {
        self.value.is_some()
    }

    /// `max(error_max, error_min) / |value|` when both bounds are known
    pub fn relative_error(&self) -> Option<f64> {
        let value = self.value?;
        let (min, max) = (self.error_min?, self.error_max?);
        if value == 0.0 || !value.is_finite() {
            return None;
        }
        Some(min.abs().max(max.abs()) / value.abs())
    }

    /// Drops error bounds and provenance when the value itself is missing
    pub fn cleaned(self) -> Self {
        if self.value.is_none() {
            Self::default()
        } else {
            self
        }
    }
}

/// Fixed set of measurements for one planet
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Measurements([Measurement; 7]);

impl Measurements {
    pub fn get(&self, parameter: Parameter) -> &Measurement {
        &self.0[parameter.index()]
    }

    pub fn set(&mut self, parameter: Parameter, measurement: Measurement) {
        self.0[parameter.index()] = measurement;
    }

    pub fn with(mut self, parameter: Parameter, measurement: Measurement) -> Self {
        self.set(parameter, measurement);
        self
    }

    pub fn value(&self, parameter: Parameter) -> Option<f64> {
        self.get(parameter).value
    }
}

/// Which resolution strategy produced a record's main_id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MainIdProvenance {
    StarDbName,
    StarDbCoordinate,
    SurveyName,
    SurveyCoordinate,
    /// Unresolved: the catalog's own host string stands in for main_id
    Catalog(CatalogKind),
}

impl MainIdProvenance {
    pub fn tag(&self) -> &'static str {
        match self {
            MainIdProvenance::StarDbName => constants::PROVENANCE_SIMBAD,
            MainIdProvenance::StarDbCoordinate => constants::PROVENANCE_SIMBAD_COORD,
            MainIdProvenance::SurveyName => constants::PROVENANCE_TIC,
            MainIdProvenance::SurveyCoordinate => constants::PROVENANCE_TIC_COORD,
            MainIdProvenance::Catalog(kind) => kind.tag(),
        }
    }

    /// Lower is better
    pub fn rank(&self) -> u8 {
        match self {
            MainIdProvenance::StarDbName => 0,
            MainIdProvenance::StarDbCoordinate => 1,
            MainIdProvenance::SurveyName => 2,
            MainIdProvenance::SurveyCoordinate => 3,
            MainIdProvenance::Catalog(_) => 4,
        }
    }
}

impl fmt::Display for MainIdProvenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Canonical star identity attached to a record after resolution
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedIdentity {
    pub main_id: String,
    pub ra: Option<f64>,
    pub dec: Option<f64>,
    pub list_id: Vec<String>,
    pub provenance: MainIdProvenance,
    /// Separation between the catalog coordinates and the resolved ones, arcsec
    pub angular_separation: Option<f64>,
}

/// One planet as reported by one source catalog
#[derive(Debug, Clone, PartialEq)]
pub struct PlanetRecord {
    pub catalog: CatalogKind,
    /// Planet name exactly as the catalog spells it
    pub catalog_name: String,
    /// Host name exactly as the catalog spells it
    pub catalog_host: String,
    pub name: String,
    pub host: String,
    /// Binary component label; empty when the catalog gives none
    pub binary: String,
    pub letter: String,
    pub measurements: Measurements,
    pub alias: Vec<String>,
    pub discovery_method: Option<String>,
    pub discovery_year: Option<i32>,
    pub status: Status,
    pub ra: Option<f64>,
    pub dec: Option<f64>,
    pub identity: Option<ResolvedIdentity>,
    pub binary_mismatch_flag: u8,
}

impl PlanetRecord {
    pub fn new(catalog: CatalogKind, name: &str, host: &str, letter: &str) -> Self {
        Self {
            catalog,
            catalog_name: name.to_string(),
            catalog_host: host.to_string(),
            name: name.to_string(),
            host: host.to_string(),
            binary: String::new(),
            letter: letter.to_string(),
            measurements: Measurements::default(),
            alias: Vec::new(),
            discovery_method: None,
            discovery_year: None,
            status: Status::Unknown,
            ra: None,
            dec: None,
            identity: None,
            binary_mismatch_flag: 0,
        }
    }

    /// Resolved main_id, or the host string before resolution
    pub fn main_id(&self) -> &str {
        self.identity
            .as_ref()
            .map(|identity| identity.main_id.as_str())
            .unwrap_or(self.host.as_str())
    }

    pub fn provenance(&self) -> Option<MainIdProvenance> {
        self.identity.as_ref().map(|identity| identity.provenance)
    }

    /// Short description used in audit lines
    pub fn describe(&self) -> String {
        format!(
            "{}: {} (host={}, binary={}, letter={})",
            self.catalog, self.catalog_name, self.host, self.binary, self.letter
        )
    }
}

/// The terminal artifact: one row per physical planet
#[derive(Debug, Clone, PartialEq)]
pub struct MergedEntry {
    pub name: String,
    pub main_id: String,
    pub host: String,
    pub binary: String,
    pub letter: String,
    pub catalogs: Vec<CatalogKind>,
    pub catalog_names: BTreeMap<CatalogKind, String>,
    pub measurements: Measurements,
    pub bestmass: Measurement,
    /// `Mass` or `Msini`; empty when neither is known
    pub bestmass_provenance: String,
    pub status: String,
    /// Per-catalog statuses that went into the consensus
    pub catalog_status: String,
    pub discovery_year: Option<i32>,
    pub discovery_method: String,
    pub alias: Vec<String>,
    pub main_id_ra: Option<f64>,
    pub main_id_dec: Option<f64>,
    pub main_id_provenance: String,
    pub angular_separation: String,
    pub angular_separation_flag: u8,
    pub coordinate_mismatch: String,
    pub coordinate_mismatch_flag: u8,
    pub binary_mismatch_flag: u8,
    pub merging_mismatch_flag: u8,
    pub duplicate_catalog_flag: u8,
    pub duplicate_names: String,
    pub row_update: Option<NaiveDate>,
}

impl MergedEntry {
    pub fn catalog_name(&self, kind: CatalogKind) -> &str {
        self.catalog_names.get(&kind).map(String::as_str).unwrap_or("")
    }

    /// Mass used for brown-dwarf filtering: mass, else msini, else zero
    pub fn selected_mass(&self) -> f64 {
        self.measurements
            .value(Parameter::Mass)
            .or_else(|| self.measurements.value(Parameter::Msini))
            .unwrap_or(0.0)
    }
}
