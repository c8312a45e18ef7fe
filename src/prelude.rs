//! Imports used throughout the crate.
#[allow(unused_imports)]
pub use anyhow::{anyhow, bail, Result};
#[allow(unused_imports)]
pub use log::{debug, error, info, trace, warn};
