//! Decoding of GIF89a byte streams into [`GifDocument`] values.

use std::io::{Cursor, Read};

use byteorder_lite::{LittleEndian, ReadBytesExt};

use crate::animation::Delay;
use crate::error::{CropResult, Error, MalformedKind, UnsupportedFormatSnafu};

use super::lzw;
use super::{DisposalMethod, GifDocument, GifFrame, Palette};

const EXTENSION: u8 = 0x21;
const IMAGE_DESCRIPTOR: u8 = 0x2C;
const TRAILER: u8 = 0x3B;
const GRAPHIC_CONTROL: u8 = 0xF9;

/// Delay assumed for frames without a graphic control extension.
const DEFAULT_DELAY_MS: u32 = 100;

/// How the decoder reacts to structural problems in the stream.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Strictness {
    /// Every structural problem is an error. The default.
    #[default]
    Strict,
    /// Decoding stops at the first structural problem and returns the
    /// frames already produced. A missing signature or an unreadable
    /// logical screen still fails, since no document can be salvaged.
    Lenient,
}

/// Configuration for a decode call.
///
/// ```
/// use framecrop::gif::DecodeOptions;
///
/// let opts = DecodeOptions::new().lenient();
/// assert!(opts.decode(b"GIF89a").is_err()); // screen descriptor missing
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct DecodeOptions {
    strictness: Strictness,
}

impl DecodeOptions {
    /// Strict decoding of a complete byte buffer.
    pub fn new() -> DecodeOptions {
        DecodeOptions::default()
    }

    /// Opts into best-effort decoding.
    pub fn lenient(mut self) -> DecodeOptions {
        self.strictness = Strictness::Lenient;
        self
    }

    /// Sets the strictness policy.
    pub fn strictness(mut self, strictness: Strictness) -> DecodeOptions {
        self.strictness = strictness;
        self
    }

    /// Parses `data` into a [`GifDocument`].
    pub fn decode(&self, data: &[u8]) -> CropResult<GifDocument> {
        let mut parser = Parser {
            cur: Cursor::new(data),
            strictness: self.strictness,
        };
        parser.parse()
    }
}

/// Parses a complete GIF byte buffer with the strict policy.
pub fn decode(data: &[u8]) -> CropResult<GifDocument> {
    DecodeOptions::new().decode(data)
}

/// Graphic control state carried to the next image block only.
struct GraphicControl {
    delay: Delay,
    disposal: DisposalMethod,
    transparent_index: Option<u8>,
}

impl Default for GraphicControl {
    fn default() -> GraphicControl {
        GraphicControl {
            delay: Delay::from_millis(DEFAULT_DELAY_MS),
            disposal: DisposalMethod::Unspecified,
            transparent_index: None,
        }
    }
}

struct Parser<'a> {
    cur: Cursor<&'a [u8]>,
    strictness: Strictness,
}

impl<'a> Parser<'a> {
    fn parse(&mut self) -> CropResult<GifDocument> {
        self.read_signature()?;
        let mut document = self.read_logical_screen()?;

        match self.read_blocks(&mut document) {
            Ok(()) => Ok(document),
            Err(_) if self.strictness == Strictness::Lenient => Ok(document),
            Err(err) => Err(err),
        }
    }

    fn read_signature(&mut self) -> CropResult<()> {
        let mut header = [0u8; 6];
        self.cur
            .read_exact(&mut header)
            .map_err(|_| self.truncated())?;
        if &header[..3] != b"GIF" {
            return UnsupportedFormatSnafu {
                found: [header[0], header[1], header[2]],
            }
            .fail();
        }
        // The version bytes ("87a"/"89a") are not enforced.
        Ok(())
    }

    fn read_logical_screen(&mut self) -> CropResult<GifDocument> {
        let width = self.read_u16()?;
        let height = self.read_u16()?;
        let packed = self.read_u8()?;
        let background_index = self.read_u8()?;
        let _aspect_ratio = self.read_u8()?;

        if width == 0 || height == 0 {
            return Err(Error::malformed(MalformedKind::ZeroDimensions));
        }

        let global_palette = if packed & 0x80 != 0 {
            let entries = 2usize << (packed & 0x07);
            Some(self.read_palette(entries)?)
        } else {
            None
        };

        Ok(GifDocument {
            width,
            height,
            global_palette,
            background_index,
            frames: Vec::new(),
        })
    }

    fn read_blocks(&mut self, document: &mut GifDocument) -> CropResult<()> {
        let mut control = GraphicControl::default();
        while let Some(introducer) = self.next_byte() {
            match introducer {
                EXTENSION => {
                    let label = self.read_u8()?;
                    if label == GRAPHIC_CONTROL {
                        control = self.read_graphic_control()?;
                    } else {
                        self.skip_sub_blocks()?;
                    }
                }
                IMAGE_DESCRIPTOR => {
                    let frame = self.read_image(document, &control)?;
                    document.frames.push(frame);
                    control = GraphicControl::default();
                }
                TRAILER => break,
                // Stray zero bytes between blocks occur in the wild.
                0x00 => continue,
                other => {
                    return Err(Error::malformed(MalformedKind::UnknownBlock {
                        introducer: other,
                    }))
                }
            }
        }
        Ok(())
    }

    fn read_graphic_control(&mut self) -> CropResult<GraphicControl> {
        let _block_size = self.read_u8()?;
        let packed = self.read_u8()?;
        let delay_ms = u32::from(self.read_u16()?) * 10;
        let transparent_index = self.read_u8()?;
        let _terminator = self.read_u8()?;

        Ok(GraphicControl {
            delay: Delay::from_millis(delay_ms),
            disposal: DisposalMethod::from_bits((packed & 0x1C) >> 2),
            transparent_index: (packed & 0x01 != 0).then_some(transparent_index),
        })
    }

    fn read_image(
        &mut self,
        document: &GifDocument,
        control: &GraphicControl,
    ) -> CropResult<GifFrame> {
        let left = self.read_u16()?;
        let top = self.read_u16()?;
        let width = self.read_u16()?;
        let height = self.read_u16()?;
        let packed = self.read_u8()?;

        let has_local_table = packed & 0x80 != 0;
        let interlaced = packed & 0x40 != 0;

        let palette = if has_local_table {
            let entries = 2usize << (packed & 0x07);
            self.read_palette(entries)?
        } else {
            document
                .global_palette
                .clone()
                .ok_or_else(|| Error::malformed(MalformedKind::MissingColorTable))?
        };

        let min_code_size = self.read_u8()?;
        let compressed = self.read_sub_blocks()?;
        let mut indices = lzw::decode(min_code_size, &compressed, self.strictness)?;

        let expected = width as usize * height as usize;
        if indices.len() < expected {
            return Err(self.truncated());
        }
        // Encoders commonly emit a few surplus indices past the last row.
        indices.truncate(expected);

        if interlaced {
            indices = deinterlace(&indices, width as usize, height as usize);
        }

        for &index in &indices {
            if usize::from(index) >= palette.len() && control.transparent_index != Some(index) {
                return Err(Error::malformed(MalformedKind::IndexOutOfRange {
                    index,
                    table_len: palette.len(),
                }));
            }
        }

        Ok(GifFrame {
            left,
            top,
            width,
            height,
            palette,
            transparent_index: control.transparent_index,
            delay: control.delay,
            disposal: control.disposal,
            indices,
            interlaced,
        })
    }

    fn read_palette(&mut self, entries: usize) -> CropResult<Palette> {
        let mut rgb = vec![0u8; entries * 3];
        self.cur
            .read_exact(&mut rgb)
            .map_err(|_| self.truncated())?;
        Ok(Palette::new(rgb))
    }

    /// Reads length-prefixed sub-blocks into one buffer; a zero-length
    /// block terminates the sequence.
    fn read_sub_blocks(&mut self) -> CropResult<Vec<u8>> {
        let mut data = Vec::new();
        loop {
            let len = self.read_u8()?;
            if len == 0 {
                return Ok(data);
            }
            let start = data.len();
            data.resize(start + len as usize, 0);
            self.cur
                .read_exact(&mut data[start..])
                .map_err(|_| self.truncated())?;
        }
    }

    fn skip_sub_blocks(&mut self) -> CropResult<()> {
        loop {
            let len = self.read_u8()?;
            if len == 0 {
                return Ok(());
            }
            let pos = self.cur.position() + u64::from(len);
            if pos > self.cur.get_ref().len() as u64 {
                return Err(self.truncated());
            }
            self.cur.set_position(pos);
        }
    }

    /// Returns the next top-level byte, or `None` at end of input.
    fn next_byte(&mut self) -> Option<u8> {
        self.cur.read_u8().ok()
    }

    fn read_u8(&mut self) -> CropResult<u8> {
        self.cur.read_u8().map_err(|_| self.truncated())
    }

    fn read_u16(&mut self) -> CropResult<u16> {
        self.cur
            .read_u16::<LittleEndian>()
            .map_err(|_| self.truncated())
    }

    fn truncated(&self) -> Error {
        Error::truncated(self.cur.position() as usize)
    }
}

/// Reorders the four-pass interlaced row layout into sequential rows.
fn deinterlace(indices: &[u8], width: usize, height: usize) -> Vec<u8> {
    let mut out = vec![0u8; indices.len()];
    let passes: [(usize, usize); 4] = [(0, 8), (4, 8), (2, 4), (1, 2)];
    let mut src_row = 0;
    for (start, step) in passes {
        let mut y = start;
        while y < height {
            let src = &indices[src_row * width..(src_row + 1) * width];
            out[y * width..(y + 1) * width].copy_from_slice(src);
            src_row += 1;
            y += step;
        }
    }
    out
}
