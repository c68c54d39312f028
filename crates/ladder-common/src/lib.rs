#![doc = "Common types shared across the MELSEC ladder workspace."]

pub mod config;
pub mod devices;
pub mod error;
pub mod timing;

pub use config::*;
pub use devices::*;
pub use error::*;
pub use timing::*;
