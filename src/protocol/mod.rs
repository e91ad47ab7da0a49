pub mod lenient;
pub mod payload;
pub mod request;
pub mod response;
