pub mod acquire;
pub mod analysis;
pub mod cache;
pub mod config;
pub mod error;
pub mod export;
pub mod fetch;
pub mod records;
pub mod table;
pub mod year;

pub use acquire::Acquirer;
pub use config::Config;
pub use table::RawTable;
pub use year::SchoolYear;
