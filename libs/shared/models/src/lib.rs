pub mod error;
pub mod records;
pub mod time_format;

pub use error::AppError;
pub use records::*;
