pub mod logger;
mod macros;

pub use logger::{error, header, info, step, success, warning};
