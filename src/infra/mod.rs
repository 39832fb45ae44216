pub mod audit_log_adapter;
pub mod catalog_source;
pub mod catalog_table_adapter;
pub mod http_client;
pub mod simbad_resolver;
pub mod tic_resolver;
