pub mod cancel;
pub mod context;
pub mod deploy;
pub mod error;
pub mod io;
pub mod manifest;
pub mod paths;
pub mod platform;
pub mod preferences;
pub mod reconcile;
pub mod session;
pub mod transport;

pub use error::{IctlError, Result};
