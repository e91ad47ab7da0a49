pub mod adapter_config;
pub mod ambient;
