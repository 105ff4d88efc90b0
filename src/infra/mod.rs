//! Infrastructure adapters: storage capabilities, post stores, HTTP wiring,
//! and telemetry.

pub mod blob;
pub mod error;
pub mod http;
pub mod kv;
pub mod store;
pub mod telemetry;
