pub mod qr;
pub mod traits;

pub use qr::QrDetector;
pub use traits::Detector;

#[derive(Debug, thiserror::Error)]
pub enum DetectError {
    #[error("QR decode failed: {0}")]
    Decode(String),
    #[error("detector panicked: {0}")]
    Panicked(String),
}
