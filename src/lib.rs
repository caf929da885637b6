pub mod clickhouse;
pub mod config;
pub mod pipeline;
pub mod process;
pub mod schema;

pub use clickhouse::ClickHouse;
pub use config::{Credentials, LoaderSettings};
