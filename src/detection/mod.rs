//! Entity mention detection.

#[cfg(feature = "bert")]
pub mod bert;
pub mod detector;
pub mod lexical;
pub mod model;
pub mod oracle;
