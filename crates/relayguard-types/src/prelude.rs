pub use crate::error::{ConfigWarning, Error, RgResult};

// vim: ts=4
