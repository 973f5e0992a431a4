//! The pan/zoom/rotate state applied to every rendered frame.

use std::f64::consts::{FRAC_PI_2, PI};

use crate::buffer::RgbaImage;

/// Pixel distance within which an edge pulls toward the canvas boundary.
const SNAP_THRESHOLD: f64 = 30.0;
/// Angular distance (5 degrees) within which rotation pulls toward a
/// cardinal angle.
const ROTATION_THRESHOLD: f64 = 5.0 * PI / 180.0;

/// The crop transform: translation in output-canvas pixels, uniform scale,
/// and rotation in radians.
///
/// `min_scale <= scale <= max_scale` holds after every mutation; non-finite
/// inputs are ignored rather than propagated into rendering.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TransformState {
    x: f64,
    y: f64,
    scale: f64,
    rotation: f64,
    min_scale: f64,
    max_scale: f64,
}

impl Default for TransformState {
    fn default() -> TransformState {
        TransformState {
            x: 0.0,
            y: 0.0,
            scale: 1.0,
            rotation: 0.0,
            min_scale: 1.0,
            max_scale: 4.0,
        }
    }
}

impl TransformState {
    /// Creates the identity transform with the default scale bounds.
    pub fn new() -> TransformState {
        TransformState::default()
    }

    /// Horizontal offset in output-canvas pixels.
    pub fn x(&self) -> f64 {
        self.x
    }

    /// Vertical offset in output-canvas pixels.
    pub fn y(&self) -> f64 {
        self.y
    }

    /// Current uniform scale.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Current rotation in radians.
    pub fn rotation(&self) -> f64 {
        self.rotation
    }

    /// Lower scale bound.
    pub fn min_scale(&self) -> f64 {
        self.min_scale
    }

    /// Upper scale bound.
    pub fn max_scale(&self) -> f64 {
        self.max_scale
    }

    /// Fits a source of the given natural size into a square canvas.
    ///
    /// Landscape sources fit their height, portrait and square sources
    /// their width; the fitting scale becomes `min_scale`. `max_scale` is
    /// reached when the source resolution drops to half the canvas
    /// resolution, but never less than four times the fit.
    pub fn fit_to_canvas(&mut self, natural_w: u32, natural_h: u32, canvas_size: u32) {
        if natural_w == 0 || natural_h == 0 || canvas_size == 0 {
            return;
        }
        let (w, h) = (f64::from(natural_w), f64::from(natural_h));
        let size = f64::from(canvas_size);

        self.scale = if w / h > 1.0 { size / h } else { size / w };
        self.min_scale = self.scale;

        let max_scale_by_resolution = w.min(h) / (size * 0.5);
        self.max_scale = max_scale_by_resolution.max(self.min_scale * 4.0);
    }

    /// Accumulates a drag delta into the translation.
    pub fn translate_by(&mut self, dx: f64, dy: f64) {
        if !dx.is_finite() || !dy.is_finite() {
            return;
        }
        self.x += dx;
        self.y += dy;
    }

    /// Multiplies the scale by `factor`, clamped to the scale bounds.
    pub fn zoom_by(&mut self, factor: f64) {
        if !factor.is_finite() {
            return;
        }
        self.scale = (self.scale * factor).clamp(self.min_scale, self.max_scale);
    }

    /// Accumulates a rotation delta in radians.
    pub fn rotate_by(&mut self, delta: f64) {
        if !delta.is_finite() {
            return;
        }
        self.rotation += delta;
    }

    /// Rotates by a quarter turn per step, positive clockwise. Manual
    /// rotation controls bypass edge snapping.
    pub fn rotate_quarter(&mut self, steps: i32) {
        self.rotation += f64::from(steps) * FRAC_PI_2;
    }

    /// Renders `source` through this transform into a square canvas of
    /// side `canvas_size`.
    ///
    /// The forward mapping is: translate to the canvas center, translate by
    /// `(x, y)`, rotate, scale, draw the source centered at the origin.
    /// The order is not commutative and must be preserved. Pixels that map
    /// outside the source are fully transparent.
    pub fn render(&self, source: &RgbaImage, canvas_size: u32) -> RgbaImage {
        let (src_w, src_h) = source.dimensions();
        let out = RgbaImage::new(canvas_size, canvas_size);
        if src_w == 0 || src_h == 0 || self.scale <= 0.0 || !self.scale.is_finite() {
            return out;
        }
        let mut out = out;

        let half = f64::from(canvas_size) / 2.0;
        let (sin, cos) = self.rotation.sin_cos();
        let (half_w, half_h) = (f64::from(src_w) / 2.0, f64::from(src_h) / 2.0);

        for oy in 0..canvas_size {
            for ox in 0..canvas_size {
                // Invert the forward mapping at the pixel center.
                let px = f64::from(ox) + 0.5 - (half + self.x);
                let py = f64::from(oy) + 0.5 - (half + self.y);
                let rx = px * cos + py * sin;
                let ry = -px * sin + py * cos;
                let sx = rx / self.scale + half_w;
                let sy = ry / self.scale + half_h;
                if sx < 0.0 || sy < 0.0 {
                    continue;
                }
                let (sx, sy) = (sx.floor() as u32, sy.floor() as u32);
                if let Some(pixel) = source.get_pixel_checked(sx, sy) {
                    out.put_pixel(ox, oy, pixel);
                }
            }
        }
        out
    }

    /// Pulls the transform onto canvas boundaries after a gesture ends.
    ///
    /// Rotation snaps to the nearest cardinal angle only when it is within
    /// [`ROTATION_THRESHOLD`] of one *and* at least one edge midpoint of
    /// the snapped rectangle lies within [`SNAP_THRESHOLD`] of its canvas
    /// boundary while being the nearer of its axis pair. Without a
    /// qualifying edge the state is left completely untouched, so a stray
    /// near-cardinal rotation far from any boundary does not stick.
    pub fn snap_to_edges(&mut self, natural_w: u32, natural_h: u32, canvas_size: u32) {
        if natural_w == 0 || natural_h == 0 {
            return;
        }
        let scaled_w = f64::from(natural_w) * self.scale;
        let scaled_h = f64::from(natural_h) * self.scale;
        let size = f64::from(canvas_size);

        let half = size / 2.0;
        let center_x = half + self.x;
        let center_y = half + self.y;

        // Corners of the scaled rectangle in local space, clockwise from
        // top-left.
        let corners = [
            (-scaled_w / 2.0, -scaled_h / 2.0),
            (scaled_w / 2.0, -scaled_h / 2.0),
            (scaled_w / 2.0, scaled_h / 2.0),
            (-scaled_w / 2.0, scaled_h / 2.0),
        ];

        let cardinals = [0.0, FRAC_PI_2, PI, 3.0 * FRAC_PI_2];
        let closest = cardinals.into_iter().find(|r| {
            let diff = (self.rotation - r).abs();
            diff.min(2.0 * PI - diff) < ROTATION_THRESHOLD
        });
        let Some(snapped_rotation) = closest else {
            return;
        };

        // Edge midpoints as they would sit if rotation were snapped.
        let (snap_sin, snap_cos) = snapped_rotation.sin_cos();
        let rotated: Vec<(f64, f64)> = corners
            .iter()
            .map(|&(px, py)| {
                (
                    center_x + px * snap_cos - py * snap_sin,
                    center_y + px * snap_sin + py * snap_cos,
                )
            })
            .collect();
        let mids: Vec<(f64, f64)> = (0..4)
            .map(|i| {
                let (ax, ay) = rotated[i];
                let (bx, by) = rotated[(i + 1) % 4];
                ((ax + bx) / 2.0, (ay + by) / 2.0)
            })
            .collect();

        let min_y = mids.iter().copied().fold(mids[0], |m, e| if e.1 < m.1 { e } else { m });
        let max_y = mids.iter().copied().fold(mids[0], |m, e| if e.1 > m.1 { e } else { m });
        let min_x = mids.iter().copied().fold(mids[0], |m, e| if e.0 < m.0 { e } else { m });
        let max_x = mids.iter().copied().fold(mids[0], |m, e| if e.0 > m.0 { e } else { m });

        let top_dist = min_y.1.abs();
        let bottom_dist = (max_y.1 - size).abs();
        let left_dist = min_x.0.abs();
        let right_dist = (max_x.0 - size).abs();

        let snap_top = top_dist <= SNAP_THRESHOLD && top_dist <= bottom_dist;
        let snap_bottom = bottom_dist <= SNAP_THRESHOLD && bottom_dist < top_dist;
        let snap_left = left_dist <= SNAP_THRESHOLD && left_dist <= right_dist;
        let snap_right = right_dist <= SNAP_THRESHOLD && right_dist < left_dist;

        if !snap_top && !snap_bottom && !snap_left && !snap_right {
            return;
        }

        self.rotation = snapped_rotation;

        // Each axis aligns its qualifying edge independently.
        if snap_top {
            self.y -= min_y.1;
        } else if snap_bottom {
            self.y -= max_y.1 - size;
        }
        if snap_left {
            self.x -= min_x.0;
        } else if snap_right {
            self.x -= max_x.0 - size;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::TransformState;
    use crate::buffer::{Rgba, RgbaImage};

    fn checkerboard(size: u32) -> RgbaImage {
        RgbaImage::from_fn(size, size, |x, y| {
            if (x + y) % 2 == 0 {
                Rgba([255, 255, 255, 255])
            } else {
                Rgba([0, 0, 0, 255])
            }
        })
    }

    #[test]
    fn identity_render_reproduces_source() {
        let source = checkerboard(16);
        let state = TransformState::new();
        assert_eq!(state.render(&source, 16), source);
    }

    #[test]
    fn quarter_turn_render_matches_rotated_source() {
        let source = checkerboard(8);
        let mut state = TransformState::new();
        state.rotate_quarter(1);
        let rendered = state.render(&source, 8);
        for y in 0..8 {
            for x in 0..8 {
                // Clockwise quarter turn: output (x, y) samples (y, 7 - x).
                assert_eq!(rendered.get_pixel(x, y), source.get_pixel(y, 7 - x));
            }
        }
    }

    #[test]
    fn fit_landscape_fits_height() {
        let mut state = TransformState::new();
        state.fit_to_canvas(400, 200, 100);
        assert_eq!(state.scale(), 0.5);
        assert_eq!(state.min_scale(), 0.5);
        // min(w, h) / (size * 0.5) = 200 / 50 = 4.
        assert_eq!(state.max_scale(), 4.0);
    }

    #[test]
    fn fit_portrait_fits_width() {
        let mut state = TransformState::new();
        state.fit_to_canvas(100, 300, 200);
        assert_eq!(state.scale(), 2.0);
        // 100 / 100 = 1 is below min_scale * 4.
        assert_eq!(state.max_scale(), 8.0);
    }

    #[test]
    fn zoom_clamps_to_bounds() {
        let mut state = TransformState::new();
        state.fit_to_canvas(200, 200, 100);
        state.zoom_by(1e6);
        assert_eq!(state.scale(), state.max_scale());
        state.zoom_by(1e-9);
        assert_eq!(state.scale(), state.min_scale());
    }

    #[test]
    fn non_finite_mutations_are_ignored() {
        let mut state = TransformState::new();
        state.translate_by(f64::NAN, 1.0);
        state.zoom_by(f64::INFINITY);
        state.rotate_by(f64::NAN);
        assert_eq!(state.x(), 0.0);
        assert_eq!(state.scale(), 1.0);
        assert_eq!(state.rotation(), 0.0);
    }

    #[test]
    fn snaps_top_edge_and_rotation() {
        // A 200x200 source at scale 1 on a 100px canvas, rotated 0.03 rad
        // and positioned with its top edge 5px above the canvas top. Only
        // the top edge qualifies; snapping must zero the rotation exactly
        // and leave the horizontal position alone.
        let mut state = TransformState::new();
        state.fit_to_canvas(200, 200, 100);
        state.zoom_by(2.0);
        assert_eq!(state.scale(), 1.0);
        state.rotate_by(0.03);
        state.translate_by(0.0, 45.0);

        state.snap_to_edges(200, 200, 100);

        assert_eq!(state.rotation(), 0.0);
        assert_eq!(state.y(), 50.0);
        assert_eq!(state.x(), 0.0);
    }

    #[test]
    fn no_snap_outside_rotation_threshold() {
        let mut state = TransformState::new();
        state.fit_to_canvas(200, 200, 100);
        state.zoom_by(2.0);
        state.rotate_by(0.2);
        state.translate_by(0.0, 45.0);

        state.snap_to_edges(200, 200, 100);

        assert_eq!(state.rotation(), 0.2);
        assert_eq!(state.y(), 45.0);
        assert_eq!(state.x(), 0.0);
    }

    #[test]
    fn no_snap_without_qualifying_edge() {
        // Near-cardinal rotation but every edge far from the canvas: the
        // correction must not stick.
        let mut state = TransformState::new();
        state.fit_to_canvas(200, 200, 100);
        state.zoom_by(4.0);
        state.rotate_by(0.03);

        state.snap_to_edges(200, 200, 100);

        assert_eq!(state.rotation(), 0.03);
        assert_eq!(state.x(), 0.0);
        assert_eq!(state.y(), 0.0);
    }

    #[test]
    fn negative_quarter_turn_snaps_to_cardinal() {
        // -PI/2 is 3*PI/2 modulo a full turn; the snap keeps the angle
        // cardinal-equivalent rather than returning it to -PI/2.
        let mut state = TransformState::new();
        state.fit_to_canvas(200, 200, 100);
        state.zoom_by(2.0);
        state.rotate_quarter(-1);
        state.rotate_by(0.01);
        state.translate_by(0.0, 45.0);

        state.snap_to_edges(200, 200, 100);

        assert_eq!(state.rotation(), 3.0 * std::f64::consts::FRAC_PI_2);
        assert_eq!(state.y(), 50.0);
    }
}
