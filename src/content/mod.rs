//! Content transforms: front-matter extraction and Markdown rendering.
//!
//! Everything in this layer is pure and infallible. Corrupt or partial
//! documents degrade to best-effort output instead of erroring; page
//! serving must survive bad content.

pub mod front_matter;
pub mod markdown;
