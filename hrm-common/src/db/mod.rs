//! Database access: pool initialization, setting storage, confidence
//! policy storage

pub mod confidence;
pub mod init;
pub mod settings;

pub use init::*;
