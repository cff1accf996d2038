//! Helpers shared across layers.

pub use taskme_shared::time;
