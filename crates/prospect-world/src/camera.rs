//! Rendered camera images and segmentation masks.

use std::collections::BTreeSet;
use std::fmt::Write as _;

/// Segmentation value of pixels that show no body.
pub const BACKGROUND_ID: i32 = -1;

/// A per-pixel image of body ids, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentationMask {
    /// Mask width in pixels.
    pub width: u32,
    /// Mask height in pixels.
    pub height: u32,
    /// One body id per pixel; [`BACKGROUND_ID`] where nothing was hit.
    pub data: Vec<i32>,
}

impl SegmentationMask {
    /// A mask where every pixel holds `value`.
    pub fn filled(width: u32, height: u32, value: i32) -> Self {
        Self {
            width,
            height,
            data: vec![value; (width as usize) * (height as usize)],
        }
    }

    /// Id at `(row, col)`, or `None` outside the image.
    pub fn get(&self, row: u32, col: u32) -> Option<i32> {
        if row >= self.height || col >= self.width {
            return None;
        }
        self.data
            .get((row as usize) * (self.width as usize) + col as usize)
            .copied()
    }

    /// Number of pixels showing `id`.
    pub fn count(&self, id: i32) -> usize {
        self.data.iter().filter(|&&v| v == id).count()
    }

    /// `(row, col)` of every pixel showing `id`, in row-major order.
    pub fn pixels_of(&self, id: i32) -> Vec<(u32, u32)> {
        let width = self.width.max(1) as usize;
        self.data
            .iter()
            .enumerate()
            .filter(|&(_, &v)| v == id)
            .map(|(i, _)| ((i / width) as u32, (i % width) as u32))
            .collect()
    }

    /// Distinct body ids present, background excluded.
    pub fn ids(&self) -> BTreeSet<i32> {
        self.data
            .iter()
            .copied()
            .filter(|&v| v != BACKGROUND_ID)
            .collect()
    }

    /// One character per pixel: `.` for background, otherwise the id in
    /// base 36 (ids above 35 wrap).
    pub fn render_ascii(&self) -> String {
        let mut out = String::with_capacity(self.data.len() + self.height as usize);
        for row in 0..self.height {
            for col in 0..self.width {
                let c = match self.get(row, col) {
                    Some(BACKGROUND_ID) | None => '.',
                    Some(id) => char::from_digit(id.rem_euclid(36) as u32, 36).unwrap_or('?'),
                };
                out.push(c);
            }
            let _ = writeln!(out);
        }
        out
    }
}

/// Colour, depth, and segmentation rendered for one camera pose.
#[derive(Debug, Clone)]
pub struct CameraImages {
    /// RGB24 pixel data.
    pub color: Vec<u8>,
    /// Distance along each pixel ray to the first hit, `f32::INFINITY` for
    /// background.
    pub depth: Vec<f32>,
    pub segmentation: SegmentationMask,
}
