pub mod error;

pub use error::{BinderyError, Result};
