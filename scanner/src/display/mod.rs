pub mod console;
pub mod traits;

pub use console::ConsoleDisplay;
pub use traits::Display;

#[derive(Debug, thiserror::Error)]
pub enum DisplayError {
    #[error("failed to write to display: {0}")]
    Write(#[from] std::io::Error),
}
