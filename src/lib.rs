pub mod application;
pub mod config;
pub mod content;
pub mod domain;
pub mod infra;
pub mod presentation;
