pub mod adapter_log;
pub mod runtime_logger;
