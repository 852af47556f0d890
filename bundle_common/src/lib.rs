mod network;

pub mod helpers;
mod secret;

pub use network::{Network, NetworkConversionError};
pub use secret::Secret;
