use tracing::{info, warn};

use crate::camera::Camera;
use crate::display::Display;

/// Owns the camera and display for the length of a scan session.
///
/// [`SessionGuard::close`] releases the camera and destroys the display. It
/// runs at most once, either explicitly at the end of the loop or from `Drop`
/// when the session unwinds, returns early, or is dropped mid-iteration.
pub struct SessionGuard<C: Camera, S: Display> {
    camera: C,
    display: S,
    closed: bool,
}

impl<C: Camera, S: Display> SessionGuard<C, S> {
    pub fn new(camera: C, display: S) -> Self {
        Self {
            camera,
            display,
            closed: false,
        }
    }

    pub fn camera(&self) -> &C {
        &self.camera
    }

    pub fn display(&self) -> &S {
        &self.display
    }

    pub fn camera_mut(&mut self) -> &mut C {
        &mut self.camera
    }

    pub fn display_mut(&mut self) -> &mut S {
        &mut self.display
    }

    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.camera.release();
        self.display.destroy();
        info!(
            camera = self.camera.name(),
            display = self.display.name(),
            "scan session resources released"
        );
    }
}

impl<C: Camera, S: Display> Drop for SessionGuard<C, S> {
    fn drop(&mut self) {
        if !self.closed {
            warn!("scan session ended abnormally, releasing resources");
            self.close();
        }
    }
}
