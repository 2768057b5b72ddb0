#[cfg(feature = "opencv")]
pub mod cascade;
pub mod diff;
pub mod face;
pub mod traits;
