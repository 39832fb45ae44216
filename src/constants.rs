/// Catalog tags and fixed labels shared across the pipeline
/// These constants define the spellings used in input file names, output columns and audit logs

// Source catalog tags (used in file names and the `catalog` column)
pub const NASA_CATALOG: &str = "nasa";
pub const EU_CATALOG: &str = "eu";
pub const OEC_CATALOG: &str = "oec";
pub const TOI_CATALOG: &str = "toi";
pub const KOI_CATALOG: &str = "koi";
pub const EPIC_CATALOG: &str = "epic";

// main_id provenance tags, best first
pub const PROVENANCE_SIMBAD: &str = "SIMBAD";
pub const PROVENANCE_SIMBAD_COORD: &str = "SIMBADCOORD";
pub const PROVENANCE_TIC: &str = "TIC";
pub const PROVENANCE_TIC_COORD: &str = "TICCOORD";

// Binary component labels with special meaning
pub const S_TYPE: &str = "S-type";
pub const ROGUE: &str = "Rogue";

/// Orbital slot label used for brown-dwarf companions
pub const BROWN_DWARF_LETTER: &str = "BD";

/// Placeholder written when no catalog reports a discovery method
pub const UNKNOWN_METHOD: &str = "Unknown";

/// Status written when contributing catalogs disagree
pub const CONTROVERSIAL: &str = "CONTROVERSIAL";

// Output file naming
pub const OUTPUT_PREFIX: &str = "exo-mercat";
pub const LATEST_OUTPUT: &str = "exo-mercat.csv";
pub const BROWN_DWARF_AUDIT: &str = "brown_dwarfs_removed.csv";
pub const METRICS_SNAPSHOT: &str = "metrics.prom";

/// Date format used in snapshot file names
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Default configuration file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "exo_mercat.toml";

/// Arcseconds per degree
pub const ARCSEC_PER_DEG: f64 = 3600.0;
