//! Scripted collaborators for exercising the scan loop without a camera,
//! decoder or terminal. Every call is recorded in a shared [`Calls`].

use image::{DynamicImage, GenericImageView, GrayImage};
use qr_scanner_common::frame::{DecodedPayload, Frame, Point};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::camera::{Camera, CameraError};
use crate::cancel::CancelHandle;
use crate::detector::{DetectError, Detector};
use crate::display::{Display, DisplayError};

pub type SharedCalls = Rc<RefCell<Calls>>;

#[derive(Debug, Default)]
pub struct Calls {
    pub reads: u32,
    pub releases: u32,
    pub detects: u32,
    pub detector_inputs: Vec<(u32, u32)>,
    pub clears: u32,
    pub refreshes: u32,
    pub destroys: u32,
    /// Current display content.
    pub content: String,
    /// Every string appended to the display, in order.
    pub updates: Vec<String>,
}

impl Calls {
    pub fn shared() -> SharedCalls {
        Rc::new(RefCell::new(Calls::default()))
    }
}

/// Camera whose reads succeed or fail per script. Reads past the end of the
/// script succeed.
pub struct ScriptedCamera {
    calls: SharedCalls,
    script: VecDeque<bool>,
    frame_size: (u32, u32),
    on_exhausted: Option<CancelHandle>,
    seq: u64,
}

impl ScriptedCamera {
    pub fn new(calls: &SharedCalls, script: Vec<bool>) -> Self {
        Self {
            calls: Rc::clone(calls),
            script: script.into(),
            frame_size: (8, 8),
            on_exhausted: None,
            seq: 0,
        }
    }

    pub fn with_frame_size(mut self, width: u32, height: u32) -> Self {
        self.frame_size = (width, height);
        self
    }

    /// Request cancellation as soon as the last scripted read is consumed.
    pub fn cancel_when_exhausted(mut self, handle: CancelHandle) -> Self {
        self.on_exhausted = Some(handle);
        self
    }
}

impl Camera for ScriptedCamera {
    async fn read(&mut self) -> Result<Frame, CameraError> {
        self.calls.borrow_mut().reads += 1;
        let succeed = self.script.pop_front().unwrap_or(true);
        if self.script.is_empty() {
            if let Some(handle) = &self.on_exhausted {
                handle.cancel();
            }
        }
        if !succeed {
            return Err(CameraError::StreamEnded);
        }
        self.seq += 1;
        let (width, height) = self.frame_size;
        Ok(Frame::new(
            DynamicImage::ImageLuma8(GrayImage::new(width, height)),
            0,
            self.seq,
        ))
    }

    fn release(&mut self) {
        self.calls.borrow_mut().releases += 1;
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

#[derive(Debug, Clone)]
pub enum Detection {
    Nothing,
    Text(&'static str),
    Fail,
    Panic,
}

/// Detector that returns scripted results. Calls past the end of the script
/// find nothing.
pub struct ScriptedDetector {
    calls: SharedCalls,
    script: VecDeque<Detection>,
}

impl ScriptedDetector {
    pub fn new(calls: &SharedCalls, script: Vec<Detection>) -> Self {
        Self {
            calls: Rc::clone(calls),
            script: script.into(),
        }
    }
}

impl Detector for ScriptedDetector {
    fn detect(&mut self, image: &DynamicImage) -> Result<Option<DecodedPayload>, DetectError> {
        {
            let mut calls = self.calls.borrow_mut();
            calls.detects += 1;
            calls.detector_inputs.push(image.dimensions());
        }
        match self.script.pop_front().unwrap_or(Detection::Nothing) {
            Detection::Nothing => Ok(None),
            Detection::Text(text) => Ok(Some(DecodedPayload::new(
                text,
                vec![
                    Point::new(1, 1),
                    Point::new(6, 1),
                    Point::new(6, 6),
                    Point::new(1, 6),
                ],
            ))),
            Detection::Fail => Err(DetectError::Decode("scripted failure".into())),
            Detection::Panic => panic!("scripted detector panic"),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Display that mirrors its content into [`Calls`].
pub struct RecordingDisplay {
    calls: SharedCalls,
}

impl RecordingDisplay {
    pub fn new(calls: &SharedCalls) -> Self {
        Self {
            calls: Rc::clone(calls),
        }
    }
}

impl Display for RecordingDisplay {
    fn clear(&mut self) -> Result<(), DisplayError> {
        let mut calls = self.calls.borrow_mut();
        calls.clears += 1;
        calls.content.clear();
        Ok(())
    }

    fn append(&mut self, text: &str) -> Result<(), DisplayError> {
        let mut calls = self.calls.borrow_mut();
        calls.content.push_str(text);
        calls.updates.push(text.to_string());
        Ok(())
    }

    fn refresh(&mut self) -> Result<(), DisplayError> {
        self.calls.borrow_mut().refreshes += 1;
        Ok(())
    }

    fn destroy(&mut self) {
        self.calls.borrow_mut().destroys += 1;
    }

    fn name(&self) -> &str {
        "recording"
    }
}
