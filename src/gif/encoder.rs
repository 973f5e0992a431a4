//! Re-encoding of transformed frames through the `gif` crate.

use std::io::Write;

use crate::animation::Frame;
use crate::error::{CropResult, Error, ParameterErrorKind};

/// Number of repetitions for an encoded animation.
#[derive(Clone, Copy, Debug)]
pub enum Repeat {
    /// Finite number of repetitions.
    Finite(u16),
    /// Looping animation.
    Infinite,
}

impl Repeat {
    pub(crate) fn to_gif_enum(self) -> gif::Repeat {
        match self {
            Repeat::Finite(n) => gif::Repeat::Finite(n),
            Repeat::Infinite => gif::Repeat::Infinite,
        }
    }
}

/// GIF encoder.
///
/// Thin adapter over [`gif::Encoder`]: frames are quantized with
/// `Frame::from_rgba_speed` and delays converted from milliseconds to the
/// format's centisecond units.
pub struct GifEncoder<W: Write> {
    w: Option<W>,
    gif_encoder: Option<gif::Encoder<W>>,
    speed: i32,
    repeat: Option<Repeat>,
}

impl<W: Write> GifEncoder<W> {
    /// Creates a new GIF encoder with a speed of 1. This prioritizes
    /// quality over performance at any cost.
    pub fn new(w: W) -> GifEncoder<W> {
        Self::new_with_speed(w, 1)
    }

    /// Create a new GIF encoder with the given quantization speed. See
    /// [`gif::Frame::from_rgba_speed`] for more information.
    pub fn new_with_speed(w: W, speed: i32) -> GifEncoder<W> {
        assert!(
            (1..=30).contains(&speed),
            "speed needs to be in the range [1, 30]"
        );
        GifEncoder {
            w: Some(w),
            gif_encoder: None,
            speed,
            repeat: None,
        }
    }

    /// Set the repeat behaviour of the encoded animation.
    pub fn set_repeat(&mut self, repeat: Repeat) -> CropResult<()> {
        if let Some(ref mut encoder) = self.gif_encoder {
            encoder
                .set_repeat(repeat.to_gif_enum())
                .map_err(from_encoding)?;
        }
        self.repeat = Some(repeat);
        Ok(())
    }

    /// Encode one frame of animation.
    pub fn encode_frame(&mut self, frame: Frame) -> CropResult<()> {
        let frame = self.convert_frame(frame)?;
        self.encode_gif(frame)
    }

    /// Encodes frames; whenever an `Err` item is encountered that value is
    /// returned without further actions.
    pub fn try_encode_frames<F>(&mut self, frames: F) -> CropResult<()>
    where
        F: IntoIterator<Item = CropResult<Frame>>,
    {
        for frame in frames {
            self.encode_frame(frame?)?;
        }
        Ok(())
    }

    fn convert_frame(&mut self, frame: Frame) -> CropResult<gif::Frame<'static>> {
        // Get the delay before converting the buffer.
        let delay_ms = frame.delay().into_ratio().to_integer();
        let buffer = frame.into_buffer();
        let (width, height) = gif_dimensions(buffer.width(), buffer.height())?;
        let mut raw = buffer.into_raw();

        let mut frame = gif::Frame::from_rgba_speed(width, height, &mut raw, self.speed);
        // Saturate instead of erroring: the conversion to centiseconds is
        // already lossy and u16::MAX covers more than ten minutes.
        frame.delay = (delay_ms / 10).try_into().unwrap_or(u16::MAX);

        Ok(frame)
    }

    fn encode_gif(&mut self, mut frame: gif::Frame) -> CropResult<()> {
        let gif_encoder;
        if let Some(ref mut encoder) = self.gif_encoder {
            gif_encoder = encoder;
        } else {
            let writer = self.w.take().unwrap();
            let mut encoder = gif::Encoder::new(writer, frame.width, frame.height, &[])
                .map_err(from_encoding)?;
            if let Some(ref repeat) = self.repeat {
                encoder
                    .set_repeat(repeat.to_gif_enum())
                    .map_err(from_encoding)?;
            }
            self.gif_encoder = Some(encoder);
            gif_encoder = self.gif_encoder.as_mut().unwrap();
        }

        frame.dispose = gif::DisposalMethod::Background;

        gif_encoder.write_frame(&frame).map_err(from_encoding)
    }
}

fn gif_dimensions(width: u32, height: u32) -> CropResult<(u16, u16)> {
    let size = u16::try_from(width)
        .ok()
        .zip(u16::try_from(height).ok());
    size.ok_or_else(|| Error::parameter(ParameterErrorKind::DimensionMismatch))
}

fn from_encoding(err: gif::EncodingError) -> Error {
    use gif::EncodingError::*;
    match err {
        err @ Format(_) => Error::EncodeFailed { source: err },
        Io(io_err) => Error::Io { source: io_err },
    }
}
