//! Animation frames and their timing.

use std::time::Duration;

use num_rational::Ratio;

use crate::buffer::RgbaImage;

/// A single composited animation frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    /// Delay between this frame and the next one.
    delay: Delay,
    buffer: RgbaImage,
}

/// The delay of a frame relative to the previous one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd)]
pub struct Delay {
    ratio: Ratio<u32>,
}

impl Frame {
    /// Constructs a new frame without any delay.
    pub fn new(buffer: RgbaImage) -> Frame {
        Frame {
            delay: Delay::from_ratio(Ratio::from_integer(0)),
            buffer,
        }
    }

    /// Constructs a new frame.
    pub fn from_parts(buffer: RgbaImage, delay: Delay) -> Frame {
        Frame { delay, buffer }
    }

    /// Delay of this frame.
    pub fn delay(&self) -> Delay {
        self.delay
    }

    /// Returns the pixel buffer.
    pub fn buffer(&self) -> &RgbaImage {
        &self.buffer
    }

    /// Returns the pixel buffer.
    pub fn into_buffer(self) -> RgbaImage {
        self.buffer
    }
}

impl Delay {
    /// Create a delay from a ratio of milliseconds.
    ///
    /// # Examples
    ///
    /// ```
    /// use framecrop::Delay;
    /// let delay_10ms = Delay::from_num_denom_ms(10, 1);
    /// ```
    pub fn from_num_denom_ms(numerator: u32, denominator: u32) -> Self {
        Delay {
            ratio: Ratio::new_raw(numerator, denominator),
        }
    }

    /// Create a delay from a whole number of milliseconds.
    pub fn from_millis(ms: u32) -> Self {
        Delay {
            ratio: Ratio::from_integer(ms),
        }
    }

    /// The numerator and denominator of the delay in milliseconds.
    pub fn num_denom_ms(self) -> (u32, u32) {
        (*self.ratio.numer(), *self.ratio.denom())
    }

    pub(crate) fn from_ratio(ratio: Ratio<u32>) -> Self {
        Delay { ratio }
    }

    pub(crate) fn into_ratio(self) -> Ratio<u32> {
        self.ratio
    }
}

impl From<Delay> for Duration {
    fn from(delay: Delay) -> Self {
        let ratio = delay.into_ratio();
        let ms = ratio.to_integer();
        let rest = ratio.numer() % ratio.denom();
        let nanos = (u64::from(rest) * 1_000_000) / u64::from(*ratio.denom());
        Duration::from_millis(ms.into()) + Duration::from_nanos(nanos)
    }
}
