use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::constants::{ARCSEC_PER_DEG, DEFAULT_CONFIG_FILE};
use crate::error::{ExoMercatError, Result};

/// Pipeline settings; every field has a default so an empty file is valid
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub logs_dir: PathBuf,
    pub overrides_path: Option<PathBuf>,
    pub matching: MatchingConfig,
    pub resolver: ResolverConfig,
    pub brown_dwarf: BrownDwarfConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Relative tolerance for period / semi-major axis clustering
    pub period_tolerance: f64,
    /// Max separation between rows when auto-fixing binary labels
    pub binary_tolerance_arcsec: f64,
    /// Per-row separation from main_id above which the merged row is flagged
    pub angular_separation_tolerance_arcsec: f64,
    /// Per-axis spread among contributing rows above which the merged row is flagged
    pub coordinate_mismatch_tolerance_arcsec: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub simbad_url: String,
    pub vizier_url: String,
    pub tic_table: String,
    pub timeout_seconds: u64,
    pub search_radius_arcsec: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrownDwarfConfig {
    /// Jupiter masses
    pub mass_limit: f64,
    pub write_removed: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("catalogs"),
            output_dir: PathBuf::from("output"),
            logs_dir: PathBuf::from("logs"),
            overrides_path: None,
            matching: MatchingConfig::default(),
            resolver: ResolverConfig::default(),
            brown_dwarf: BrownDwarfConfig::default(),
        }
    }
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            period_tolerance: 0.1,
            binary_tolerance_arcsec: 5.0,
            angular_separation_tolerance_arcsec: 5.0,
            coordinate_mismatch_tolerance_arcsec: 5.0,
        }
    }
}

impl MatchingConfig {
    pub fn binary_tolerance_deg(&self) -> f64 {
        self.binary_tolerance_arcsec / ARCSEC_PER_DEG
    }

    pub fn coordinate_mismatch_tolerance_deg(&self) -> f64 {
        self.coordinate_mismatch_tolerance_arcsec / ARCSEC_PER_DEG
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            simbad_url: "https://simbad.cds.unistra.fr/simbad/sim-tap/sync".to_string(),
            vizier_url: "https://tapvizier.cds.unistra.fr/TAPVizieR/tap/sync".to_string(),
            tic_table: "IV/39/tic82".to_string(),
            timeout_seconds: 120,
            search_radius_arcsec: 5.0,
        }
    }
}

impl ResolverConfig {
    pub fn search_radius_deg(&self) -> f64 {
        self.search_radius_arcsec / ARCSEC_PER_DEG
    }
}

impl Default for BrownDwarfConfig {
    fn default() -> Self {
        Self {
            mass_limit: 20.0,
            write_removed: true,
        }
    }
}

impl PipelineConfig {
    /// Loads `path` (or `exo_mercat.toml` if present), then applies environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?,
            None => {
                debug!("No config file found, using defaults");
                Self::default()
            }
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            ExoMercatError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;
        let config: PipelineConfig = toml::from_str(&content)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(dir) = std::env::var("EXOMERCAT_INPUT_DIR") {
            self.input_dir = PathBuf::from(dir);
        }
        if let Ok(dir) = std::env::var("EXOMERCAT_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(dir);
        }
        if let Ok(dir) = std::env::var("EXOMERCAT_LOGS_DIR") {
            self.logs_dir = PathBuf::from(dir);
        }
        if let Ok(url) = std::env::var("EXOMERCAT_SIMBAD_URL") {
            self.resolver.simbad_url = url;
        }
        if let Ok(url) = std::env::var("EXOMERCAT_VIZIER_URL") {
            self.resolver.vizier_url = url;
        }
    }

    pub fn validate(&self) -> Result<()> {
        let m = &self.matching;
        if !(m.period_tolerance > 0.0 && m.period_tolerance < 1.0) {
            return Err(ExoMercatError::Config(format!(
                "period_tolerance must be in (0, 1), got {}",
                m.period_tolerance
            )));
        }
        for (name, value) in [
            ("binary_tolerance_arcsec", m.binary_tolerance_arcsec),
            ("angular_separation_tolerance_arcsec", m.angular_separation_tolerance_arcsec),
            ("coordinate_mismatch_tolerance_arcsec", m.coordinate_mismatch_tolerance_arcsec),
            ("search_radius_arcsec", self.resolver.search_radius_arcsec),
            ("mass_limit", self.brown_dwarf.mass_limit),
        ] {
            if !(value > 0.0) {
                return Err(ExoMercatError::Config(format!("{} must be positive, got {}", name, value)));
            }
        }
        Ok(())
    }
}

/// Manual corrections applied right after normalization
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct OverrideRules {
    /// Host renames, keyed by the host as a catalog spells it
    pub host: BTreeMap<String, String>,
    /// Planet renames, keyed by catalog planet name
    pub name: BTreeMap<String, String>,
    /// Binary label to force, keyed by catalog planet name
    pub binary: BTreeMap<String, String>,
    /// Orbital slot to force, keyed by catalog planet name
    pub letter: BTreeMap<String, String>,
    /// Catalog planet names to discard
    pub drop: Vec<String>,
}

impl OverrideRules {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            ExoMercatError::Config(format!("Failed to read overrides file '{}': {}", path.display(), e))
        })?;
        Ok(toml::from_str(&content)?)
    }

    pub fn is_empty(&self) -> bool {
        self.host.is_empty() && self.name.is_empty() && self.binary.is_empty() && self.letter.is_empty() && self.drop.is_empty()
    }
}
