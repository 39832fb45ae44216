pub mod ports;
pub mod curate_use_case;
pub mod check_use_case;
