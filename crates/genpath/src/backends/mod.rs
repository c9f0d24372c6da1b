//! Storage backends.
//!
//! Each backend owns a path grammar and implements [`crate::Backend`].

pub mod gcs;
pub mod local;

pub use gcs::{GcsBackend, GcsClient};
pub use local::LocalBackend;
