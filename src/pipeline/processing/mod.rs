// Pipeline processing: normalization, resolution, reconciliation, merge

pub mod normalize;
pub mod overrides;
pub mod alias_host;
pub mod resolve;
pub mod binary;
pub mod grouping;
pub mod merge;
pub mod postprocess;

// Shared pure helpers
pub mod clustering;
pub mod coordinates;
pub mod names;
