//! Application services orchestrating the domain against storage and HTTP.

pub mod auth;
pub mod error;
pub mod injection;
pub mod posts;
