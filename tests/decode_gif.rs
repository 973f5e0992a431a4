//! End-to-end decoding of hand-crafted GIF byte streams.

use framecrop::buffer::Rgba;
use framecrop::gif::{self, composite_all, DisposalMethod};
use framecrop::Error;

/// Four-color palette used by every stream below.
const PALETTE: [u8; 12] = [
    0x00, 0x00, 0x00, // 0: black
    0xFF, 0x00, 0x00, // 1: red
    0x00, 0xFF, 0x00, // 2: green
    0x00, 0x00, 0xFF, // 3: blue
];

/// LZW streams for 1x1 frames (min code size 2): clear, index, end.
const PIXEL_0: [u8; 2] = [0x44, 0x01];
const PIXEL_1: [u8; 2] = [0x4C, 0x01];
const PIXEL_2: [u8; 2] = [0x54, 0x01];

struct GifBuilder {
    data: Vec<u8>,
}

impl GifBuilder {
    fn new(width: u16, height: u16) -> GifBuilder {
        let mut data = Vec::new();
        data.extend_from_slice(b"GIF89a");
        data.extend_from_slice(&width.to_le_bytes());
        data.extend_from_slice(&height.to_le_bytes());
        // Global table present, four entries.
        data.extend_from_slice(&[0x81, 0x00, 0x00]);
        data.extend_from_slice(&PALETTE);
        GifBuilder { data }
    }

    /// Graphic control: disposal bits, optional transparent index, delay
    /// in centiseconds.
    fn graphic_control(mut self, disposal: u8, transparent: Option<u8>, delay_cs: u16) -> Self {
        let packed = (disposal << 2) | u8::from(transparent.is_some());
        self.data.extend_from_slice(&[0x21, 0xF9, 0x04, packed]);
        self.data.extend_from_slice(&delay_cs.to_le_bytes());
        self.data.push(transparent.unwrap_or(0));
        self.data.push(0x00);
        self
    }

    fn image(mut self, left: u16, top: u16, width: u16, height: u16, lzw: &[u8]) -> Self {
        self.data.push(0x2C);
        self.data.extend_from_slice(&left.to_le_bytes());
        self.data.extend_from_slice(&top.to_le_bytes());
        self.data.extend_from_slice(&width.to_le_bytes());
        self.data.extend_from_slice(&height.to_le_bytes());
        self.data.push(0x00); // no local table, not interlaced
        self.data.push(0x02); // LZW minimum code size
        self.data.push(lzw.len() as u8);
        self.data.extend_from_slice(lzw);
        self.data.push(0x00);
        self
    }

    fn build(mut self) -> Vec<u8> {
        self.data.push(0x3B);
        self.data
    }
}

#[test]
fn decodes_animation_with_graphic_controls() {
    let data = GifBuilder::new(1, 1)
        .graphic_control(2, None, 10)
        .image(0, 0, 1, 1, &PIXEL_1)
        .graphic_control(3, None, 20)
        .image(0, 0, 1, 1, &PIXEL_2)
        .graphic_control(0, Some(0), 30)
        .image(0, 0, 1, 1, &PIXEL_0)
        .build();

    let doc = gif::decode(&data).unwrap();
    assert_eq!((doc.width, doc.height), (1, 1));
    assert_eq!(doc.frames.len(), 3);
    assert_eq!(doc.frames[0].disposal, DisposalMethod::Background);
    assert_eq!(doc.frames[1].disposal, DisposalMethod::Previous);
    assert_eq!(doc.frames[2].disposal, DisposalMethod::Unspecified);
    assert_eq!(doc.frames[2].transparent_index, Some(0));
    assert_eq!(doc.frames[0].delay.num_denom_ms(), (100, 1));
    assert_eq!(doc.frames[1].delay.num_denom_ms(), (200, 1));
}

#[test]
fn disposal_chain_restores_snapshot_for_third_frame() {
    // Frame 1 disposes to background, frame 2 restores to previous, and
    // frame 3 draws only a transparent pixel: its raster must show frame
    // 2's pre-draw snapshot (cleared), not frame 2's green pixel.
    let data = GifBuilder::new(1, 1)
        .graphic_control(2, None, 10)
        .image(0, 0, 1, 1, &PIXEL_1)
        .graphic_control(3, None, 10)
        .image(0, 0, 1, 1, &PIXEL_2)
        .graphic_control(0, Some(0), 10)
        .image(0, 0, 1, 1, &PIXEL_0)
        .build();

    let doc = gif::decode(&data).unwrap();
    let frames = composite_all(&doc).unwrap();
    assert_eq!(frames[0].buffer().get_pixel(0, 0), Rgba([255, 0, 0, 255]));
    assert_eq!(frames[1].buffer().get_pixel(0, 0), Rgba([0, 255, 0, 255]));
    assert_eq!(frames[2].buffer().get_pixel(0, 0), Rgba([0, 0, 0, 0]));
}

#[test]
fn frame_overhanging_logical_screen_is_clipped() {
    // A 2x2 frame placed at (1, 1) on a 2x2 screen; only its top-left
    // pixel lands on the canvas.
    let data = GifBuilder::new(2, 2)
        .image(1, 1, 2, 2, &[0x44, 0x34, 0x05])
        .build();

    let doc = gif::decode(&data).unwrap();
    let frames = composite_all(&doc).unwrap();
    let raster = frames[0].buffer();
    assert_eq!(raster.get_pixel(0, 0), Rgba([0, 0, 0, 0]));
    assert_eq!(raster.get_pixel(1, 1), Rgba([0, 0, 0, 255]));
}

#[test]
fn decoding_twice_is_structurally_identical() {
    let data = GifBuilder::new(1, 1)
        .graphic_control(1, Some(3), 7)
        .image(0, 0, 1, 1, &PIXEL_2)
        .build();

    let first = gif::decode(&data).unwrap();
    let second = gif::decode(&data).unwrap();
    assert_eq!(first, second);
}

#[test]
fn non_gif_buffer_yields_unsupported_format_and_no_document() {
    let result = gif::decode(b"BMP!definitely-not-a-gif");
    match result {
        Err(Error::UnsupportedFormat { .. }) => {}
        other => panic!("expected UnsupportedFormat, got {other:?}"),
    }
}

#[test]
fn lenient_decode_salvages_leading_frames() {
    let mut data = GifBuilder::new(1, 1)
        .image(0, 0, 1, 1, &PIXEL_1)
        .build();
    data.pop(); // drop the trailer
    data.extend_from_slice(&[0x2C, 0x00, 0x00]); // truncated second image

    assert!(gif::decode(&data).is_err());
    let doc = gif::DecodeOptions::new().lenient().decode(&data).unwrap();
    assert_eq!(doc.frames.len(), 1);
}
