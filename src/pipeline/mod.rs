// Curation pipeline: pure stages, decision records, output table layout

pub mod audit;
pub mod check;
pub mod processing;
pub mod table;
