//! GitHub API service implementations.

mod events;

pub use events::*;
