//! Image sources

use crate::error::CaptureError;

use super::PixelBuffer;

/// A producer of video frames, polled by the capture loop.
///
/// Sources report readiness per tick so a stalled camera does not burn
/// the frame budget: ticks where `did_update` is false keep the
/// accumulated time for the next ready tick.
pub trait ImageSource {
    /// Whether a new frame is available since the last read.
    fn did_update(&self) -> bool;

    /// Current frame dimensions in pixels.
    fn dimensions(&self) -> (u32, u32);

    /// Copy the current frame into `buffer`. The buffer has already
    /// been sized for `dimensions`.
    fn read_pixels(&mut self, buffer: &mut PixelBuffer) -> Result<(), CaptureError>;
}

/// Deterministic RGBA gradient source for demos and tests. Always has
/// a fresh frame; the pattern scrolls one pixel per read.
pub struct TestPatternSource {
    width: u32,
    height: u32,
    frame: u64,
}

impl TestPatternSource {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            frame: 0,
        }
    }

    pub fn frame_count(&self) -> u64 {
        self.frame
    }
}

impl ImageSource for TestPatternSource {
    fn did_update(&self) -> bool {
        true
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn read_pixels(&mut self, buffer: &mut PixelBuffer) -> Result<(), CaptureError> {
        let stride = buffer.stride();
        let height = buffer.height() as usize;
        let width = buffer.width() as usize;
        if buffer.data().len() < height * stride {
            return Err(CaptureError::SourceRead(
                "pixel buffer smaller than frame".to_string(),
            ));
        }

        let shift = self.frame as u8;
        let data = buffer.data_mut();
        for y in 0..height {
            let row = &mut data[y * stride..y * stride + width * 4];
            for x in 0..width {
                let px = &mut row[x * 4..x * 4 + 4];
                px[0] = (x as u8).wrapping_add(shift);
                px[1] = y as u8;
                px[2] = shift;
                px[3] = 255;
            }
        }
        self.frame = self.frame.wrapping_add(1);
        Ok(())
    }
}
