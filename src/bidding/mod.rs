pub mod adapter;
pub mod request_builder;
pub mod response_interpreter;
pub mod tracker;
pub mod user_sync;
pub mod validator;
