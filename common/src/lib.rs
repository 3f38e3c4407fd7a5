pub mod file_format;
pub mod log_setup;
pub mod normalize_string;
pub mod parallel;
pub mod serde;

pub use file_format::{FileExtensionError, FileFormat};

pub fn is_debug() -> bool {
    cfg!(debug_assertions)
}
