use super::DisplayError;

/// Text output surface for decoded payloads.
///
/// `refresh` is the surface's event pump and is called once per scan
/// iteration whether or not the content changed. `destroy` is called exactly
/// once when the scan session ends.
pub trait Display {
    fn clear(&mut self) -> Result<(), DisplayError>;

    fn append(&mut self, text: &str) -> Result<(), DisplayError>;

    fn refresh(&mut self) -> Result<(), DisplayError>;

    fn destroy(&mut self);

    /// Human-readable name for logging.
    fn name(&self) -> &str {
        "unnamed"
    }
}
