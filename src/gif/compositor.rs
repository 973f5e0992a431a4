//! Compositing of decoded frames onto the logical screen.

use crate::animation::Frame;
use crate::buffer::{Rgba, RgbaImage};
use crate::error::{CropResult, Error, MalformedKind};

use super::{DisposalMethod, GifDocument, GifFrame};

/// Builds one full-canvas RGBA raster per frame, honoring disposal methods.
///
/// The compositor owns the running raster for the duration of one decode
/// pass. A frame's disposal value is recorded when the frame is drawn and
/// applied before the *next* frame, so `Background` clears and `Previous`
/// restores between frames, never before their own.
pub struct FrameCompositor {
    canvas: RgbaImage,
    /// Raster saved before drawing a `Previous`-disposal frame.
    snapshot: Option<RgbaImage>,
    pending_disposal: DisposalMethod,
}

impl FrameCompositor {
    /// Creates a compositor for a logical screen of the given size.
    pub fn new(width: u16, height: u16) -> FrameCompositor {
        FrameCompositor {
            canvas: RgbaImage::new(u32::from(width), u32::from(height)),
            snapshot: None,
            pending_disposal: DisposalMethod::Unspecified,
        }
    }

    /// Creates a compositor sized for `document`.
    pub fn for_document(document: &GifDocument) -> FrameCompositor {
        FrameCompositor::new(document.width, document.height)
    }

    /// Composites the next frame and returns the raster to display for it.
    pub fn composite(&mut self, frame: &GifFrame) -> CropResult<RgbaImage> {
        match self.pending_disposal {
            DisposalMethod::Unspecified | DisposalMethod::Keep => {}
            DisposalMethod::Background => self.canvas.fill(Rgba::TRANSPARENT),
            DisposalMethod::Previous => {
                if let Some(snapshot) = self.snapshot.take() {
                    self.canvas = snapshot;
                }
            }
        }

        if frame.disposal == DisposalMethod::Previous {
            self.snapshot = Some(self.canvas.clone());
        }

        self.draw(frame)?;
        self.pending_disposal = frame.disposal;
        Ok(self.canvas.clone())
    }

    /// Draws the frame's indexed pixels at its placement, clipped to the
    /// canvas. Transparent indices leave the destination untouched.
    fn draw(&mut self, frame: &GifFrame) -> CropResult<()> {
        let (canvas_w, canvas_h) = self.canvas.dimensions();
        for y in 0..u32::from(frame.height) {
            for x in 0..u32::from(frame.width) {
                let dest_x = u32::from(frame.left) + x;
                let dest_y = u32::from(frame.top) + y;
                if dest_x >= canvas_w || dest_y >= canvas_h {
                    continue;
                }
                let index = frame.indices[(y * u32::from(frame.width) + x) as usize];
                if frame.transparent_index == Some(index) {
                    continue;
                }
                let [r, g, b] = frame.palette.rgb(index).ok_or_else(|| {
                    Error::malformed(MalformedKind::IndexOutOfRange {
                        index,
                        table_len: frame.palette.len(),
                    })
                })?;
                self.canvas.put_pixel(dest_x, dest_y, Rgba([r, g, b, 255]));
            }
        }
        Ok(())
    }
}

/// Composites every frame of `document` into displayable [`Frame`]s.
pub fn composite_all(document: &GifDocument) -> CropResult<Vec<Frame>> {
    let mut compositor = FrameCompositor::for_document(document);
    let mut frames = Vec::with_capacity(document.frames.len());
    for gif_frame in &document.frames {
        let raster = compositor.composite(gif_frame)?;
        frames.push(Frame::from_parts(raster, gif_frame.delay));
    }
    Ok(frames)
}
