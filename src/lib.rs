//! # framecrop
//!
//! The media transform pipeline behind an interactive crop view: pan, zoom
//! and rotate a still image, a video stream or an animated GIF inside a
//! square canvas, snap the result onto the canvas edges, and export every
//! frame through the same frozen transform.
//!
//! The GIF decode path (block parsing, LZW decompression, disposal-aware
//! frame compositing) is implemented from scratch; re-encoding of the
//! transformed animation is delegated to the `gif` crate.
//!
//! ```no_run
//! use framecrop::{CropOutput, CropSession};
//!
//! let mut session = CropSession::new(512);
//! session.set_source_dimensions(1024, 768);
//! session.pointer_down(10.0, 10.0);
//! session.pointer_move(40.0, 25.0);
//! session.pointer_up(); // ends the gesture, snapping to nearby edges
//!
//! let gif_bytes: Vec<u8> = std::fs::read("party.gif").unwrap();
//! match session.crop_gif(&gif_bytes) {
//!     CropOutput::Animation(bytes) => { let _ = bytes; /* store re-encoded GIF */ }
//!     CropOutput::Still(raster) => { let _ = raster; /* store a static crop */ }
//!     CropOutput::Passthrough(bytes) => { let _ = bytes; /* keep the original */ }
//! }
//! ```

#![warn(missing_docs)]

pub mod animation;
pub mod buffer;
pub mod dataurl;
pub mod error;
pub mod gif;
pub mod session;
pub mod transform;

pub use crate::animation::{Delay, Frame};
pub use crate::buffer::{Rgba, RgbaImage};
pub use crate::error::{CropResult, Error};
pub use crate::session::{
    CancelToken, CropOutput, CropSession, FrameSink, FrameSource, RecordOutcome,
};
pub use crate::transform::TransformState;
