//! One interactive crop session from open to commit or cancel.
//!
//! A session owns its [`TransformState`] and the ephemeral gesture state;
//! nothing is shared across sessions, so independent crops can run
//! side by side. Gesture updates and renders must be serialized by the
//! caller, and starting a new gesture implicitly cancels the previous one.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::animation::Frame;
use crate::buffer::RgbaImage;
use crate::error::{CropResult, Error, ParameterErrorKind};
use crate::gif::{composite_all, DecodeOptions, GifEncoder, Repeat};
use crate::transform::TransformState;

/// Last known pointer/pinch positions while a drag is active.
///
/// Created on gesture start, destroyed on gesture end.
struct PointerGesture {
    last_x: f64,
    last_y: f64,
    last_dist: Option<f64>,
    last_angle: Option<f64>,
}

/// Signals cancellation of an in-flight recording between frames.
#[derive(Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Creates a token in the not-cancelled state.
    pub fn new() -> CancelToken {
        CancelToken::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Supplies decoded RGBA frames from the host platform's media facility.
pub trait FrameSource {
    /// The next frame in presentation order, or `None` when playback ends.
    fn next_frame(&mut self) -> CropResult<Option<RgbaImage>>;
}

/// Receives transformed frames, standing in for the platform recorder.
pub trait FrameSink {
    /// Called once before the first frame.
    fn start(&mut self) -> CropResult<()>;
    /// Called once per transformed frame.
    fn write_frame(&mut self, frame: &RgbaImage) -> CropResult<()>;
    /// Called after the last frame; the sink emits its result here.
    fn finish(&mut self) -> CropResult<()>;
}

/// The result of cropping an animated source.
#[derive(Clone, Debug, PartialEq)]
pub enum CropOutput {
    /// A re-encoded animation.
    Animation(Vec<u8>),
    /// Decode or encode failed; a static crop of the first usable frame.
    Still(RgbaImage),
    /// Nothing was renderable; the source is handed back unchanged.
    Passthrough(Vec<u8>),
}

/// How a video recording ended.
#[derive(Clone, Debug, PartialEq)]
pub enum RecordOutcome {
    /// Every frame was recorded and the sink finished.
    Completed,
    /// The token was cancelled; no result was emitted.
    Cancelled,
    /// The sink failed mid-stream; a static crop of the last rendered
    /// frame stands in for the recording.
    StillFallback(RgbaImage),
}

/// Orchestrates pointer input and per-frame output for one media item.
pub struct CropSession {
    canvas_size: u32,
    source_size: Option<(u32, u32)>,
    transform: TransformState,
    gesture: Option<PointerGesture>,
}

impl CropSession {
    /// Opens a session rendering into a square canvas of side `canvas_size`.
    pub fn new(canvas_size: u32) -> CropSession {
        CropSession {
            canvas_size,
            source_size: None,
            transform: TransformState::new(),
            gesture: None,
        }
    }

    /// Registers the source's natural dimensions and fits it to the canvas.
    pub fn set_source_dimensions(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.source_size = Some((width, height));
        self.transform
            .fit_to_canvas(width, height, self.canvas_size);
    }

    /// The current transform.
    pub fn transform(&self) -> &TransformState {
        &self.transform
    }

    /// Side of the square output canvas.
    pub fn canvas_size(&self) -> u32 {
        self.canvas_size
    }

    /// Starts a drag at `(x, y)`, cancelling any gesture in progress.
    pub fn pointer_down(&mut self, x: f64, y: f64) {
        if !x.is_finite() || !y.is_finite() {
            return;
        }
        self.gesture = Some(PointerGesture {
            last_x: x,
            last_y: y,
            last_dist: None,
            last_angle: None,
        });
    }

    /// Continues a drag; pans by the delta from the last position.
    pub fn pointer_move(&mut self, x: f64, y: f64) {
        if !x.is_finite() || !y.is_finite() {
            return;
        }
        if let Some(gesture) = &mut self.gesture {
            let (dx, dy) = (x - gesture.last_x, y - gesture.last_y);
            gesture.last_x = x;
            gesture.last_y = y;
            self.transform.translate_by(dx, dy);
        }
    }

    /// Updates a two-point pinch: pans by the center delta, zooms by the
    /// distance ratio and rotates by the angle change. The first update
    /// of a pinch only records the reference points.
    pub fn pinch_update(&mut self, a: (f64, f64), b: (f64, f64)) {
        if ![a.0, a.1, b.0, b.1].iter().all(|v| v.is_finite()) {
            return;
        }
        let center = ((a.0 + b.0) / 2.0, (a.1 + b.1) / 2.0);
        let dist = (b.0 - a.0).hypot(b.1 - a.1);
        let angle = (b.1 - a.1).atan2(b.0 - a.0);

        match &mut self.gesture {
            Some(gesture) => {
                let (dx, dy) = (center.0 - gesture.last_x, center.1 - gesture.last_y);
                gesture.last_x = center.0;
                gesture.last_y = center.1;

                let zoom = gesture.last_dist.filter(|d| *d > 0.0).map(|d| dist / d);
                let turn = gesture.last_angle.map(|a| angle - a);
                gesture.last_dist = Some(dist);
                gesture.last_angle = Some(angle);

                self.transform.translate_by(dx, dy);
                if let Some(zoom) = zoom {
                    self.transform.zoom_by(zoom);
                }
                if let Some(turn) = turn {
                    self.transform.rotate_by(turn);
                }
            }
            None => {
                self.gesture = Some(PointerGesture {
                    last_x: center.0,
                    last_y: center.1,
                    last_dist: Some(dist),
                    last_angle: Some(angle),
                });
            }
        }
    }

    /// One pinch contact lifted; the remaining pointer keeps dragging.
    pub fn pinch_end(&mut self, x: f64, y: f64) {
        if !x.is_finite() || !y.is_finite() {
            return;
        }
        if let Some(gesture) = &mut self.gesture {
            gesture.last_x = x;
            gesture.last_y = y;
            gesture.last_dist = None;
            gesture.last_angle = None;
        }
    }

    /// Ends the active gesture and applies edge snapping.
    pub fn pointer_up(&mut self) {
        if self.gesture.take().is_some() {
            if let Some((w, h)) = self.source_size {
                self.transform.snap_to_edges(w, h, self.canvas_size);
            }
        }
    }

    /// Wheel zoom; scrolling down zooms out, anything else zooms in.
    pub fn wheel(&mut self, delta_y: f64) {
        if !delta_y.is_finite() {
            return;
        }
        let factor = if delta_y > 0.0 { 0.9 } else { 1.1 };
        self.transform.zoom_by(factor);
    }

    /// Rotates a quarter turn counter-clockwise, bypassing snapping.
    pub fn rotate_left(&mut self) {
        self.transform.rotate_quarter(-1);
    }

    /// Rotates a quarter turn clockwise, bypassing snapping.
    pub fn rotate_right(&mut self) {
        self.transform.rotate_quarter(1);
    }

    /// Renders a static source once through the current transform.
    pub fn crop_image(&self, source: &RgbaImage) -> RgbaImage {
        self.transform.render(source, self.canvas_size)
    }

    /// Crops an animated GIF: decodes, applies the current transform
    /// identically to every frame, and re-encodes with the original
    /// delays. The transform is frozen for the whole pass.
    ///
    /// Decode and encode failures degrade instead of failing the edit: a
    /// static crop of the first composited frame when one exists,
    /// otherwise the unmodified input bytes.
    pub fn crop_gif(&self, data: &[u8]) -> CropOutput {
        let frames = match self.decode_frames(data) {
            Ok(frames) => frames,
            Err(_) => return CropOutput::Passthrough(data.to_vec()),
        };

        match self.encode_frames(&frames) {
            Ok(bytes) => CropOutput::Animation(bytes),
            Err(_) => CropOutput::Still(self.crop_image(frames[0].buffer())),
        }
    }

    fn decode_frames(&self, data: &[u8]) -> CropResult<Vec<Frame>> {
        let document = DecodeOptions::new().lenient().decode(data)?;
        let frames = composite_all(&document)?;
        if frames.is_empty() {
            return Err(Error::parameter(ParameterErrorKind::NoFrames));
        }
        Ok(frames)
    }

    fn encode_frames(&self, frames: &[Frame]) -> CropResult<Vec<u8>> {
        let mut out = Vec::new();
        let mut encoder = GifEncoder::new_with_speed(&mut out, 10);
        encoder.set_repeat(Repeat::Infinite)?;
        for frame in frames {
            let rendered = self.crop_image(frame.buffer());
            encoder.encode_frame(Frame::from_parts(rendered, frame.delay()))?;
        }
        drop(encoder);
        Ok(out)
    }

    /// Drives a video source through the transform into a recording sink,
    /// checking `token` between frames.
    ///
    /// Cancellation stops the recording without emitting a result. A sink
    /// failure after at least one rendered frame degrades to a static
    /// crop of the last rendered frame; failing before any frame is the
    /// one unrecoverable case and surfaces the error.
    pub fn record_video<S, K>(
        &self,
        source: &mut S,
        sink: &mut K,
        token: &CancelToken,
    ) -> CropResult<RecordOutcome>
    where
        S: FrameSource,
        K: FrameSink,
    {
        let mut last_rendered: Option<RgbaImage> = None;

        let result = (|| -> CropResult<RecordOutcome> {
            sink.start()?;
            loop {
                if token.is_cancelled() {
                    return Ok(RecordOutcome::Cancelled);
                }
                let Some(frame) = source.next_frame()? else {
                    break;
                };
                let rendered = self.transform.render(&frame, self.canvas_size);
                sink.write_frame(&rendered)?;
                last_rendered = Some(rendered);
            }
            sink.finish()?;
            Ok(RecordOutcome::Completed)
        })();

        match result {
            Ok(outcome) => Ok(outcome),
            Err(err) => match last_rendered {
                Some(frame) => Ok(RecordOutcome::StillFallback(frame)),
                None => Err(err),
            },
        }
    }
}
