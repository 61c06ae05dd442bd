pub mod config;
pub mod error;
pub mod locale;
pub mod message;
pub mod stream;
pub mod trace;
