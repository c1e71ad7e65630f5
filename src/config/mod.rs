pub mod loader;
pub mod schema;

pub use loader::ConfigLoader;
pub use schema::{CatalogConfig, LoadTestConfig, MonitorConfig, OutputConfig, TargetConfig};
