mod epoch;
pub use epoch::*;

pub mod logging;
pub use logging::{StdoutLogger, init_stdout_logger};

mod rect;
pub use rect::*;

mod vec2;
pub use vec2::*;

// Re-export log crate so downstream crates can use qrscan_base::log::*
pub use log;
