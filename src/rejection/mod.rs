//! N-best confirmation and the rejection policy built on it.

pub mod confirmer;
pub mod rejector;
