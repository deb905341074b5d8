pub mod proto;
pub mod textparse;
pub mod types;
