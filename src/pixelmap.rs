use crate::Color;
use std::collections::HashMap;

/// 1-based grid coordinate `(x, y)`.
pub type Coord = (i32, i32);

pub const DEFAULT_WIDTH: u32 = 48;
pub const DEFAULT_HEIGHT: u32 = 48;

/// Sparse pixel store for one frame.
///
/// `pixels` holds the committed content; only opaque-ish (alpha > 0)
/// colors are stored, absence means transparent. `staged` is the overlay
/// that tools write into during a gesture; it is merged into `pixels` by
/// [`PixelMap::commit_staged`]. A staged entry with alpha 0 previews the
/// deletion of a committed pixel.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelMap {
    width: u32,
    height: u32,
    pixels: HashMap<Coord, Color>,
    staged: HashMap<Coord, Color>,
}

impl Default for PixelMap {
    fn default() -> Self {
        Self::new(DEFAULT_WIDTH, DEFAULT_HEIGHT)
    }
}

impl PixelMap {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: HashMap::new(),
            staged: HashMap::new(),
        }
    }

    /// Builds a map from a dense row-major RGBA8 buffer.
    pub fn from_rgba(width: u32, height: u32, raw: &[u8]) -> Self {
        let mut map = Self::new(width, height);
        map.load_rgba(raw, width, height);
        map
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 1 && y >= 1 && x as i64 <= self.width as i64 && y as i64 <= self.height as i64
    }

    pub fn get(&self, x: i32, y: i32) -> Color {
        self.pixels.get(&(x, y)).copied().unwrap_or(Color::TRANSPARENT)
    }

    pub fn has_pixel(&self, x: i32, y: i32) -> bool {
        self.pixels.contains_key(&(x, y))
    }

    /// Writes a committed pixel. Out of range writes are dropped and a
    /// transparent color deletes the pixel.
    pub fn set(&mut self, x: i32, y: i32, color: Color) {
        if !self.in_bounds(x, y) {
            return;
        }

        if color.is_transparent() {
            self.pixels.remove(&(x, y));
        } else {
            self.pixels.insert((x, y), color);
        }
    }

    pub fn get_staged(&self, x: i32, y: i32) -> Color {
        self.staged.get(&(x, y)).copied().unwrap_or(Color::TRANSPARENT)
    }

    pub fn is_staged(&self, x: i32, y: i32) -> bool {
        self.staged.contains_key(&(x, y))
    }

    pub fn set_staged(&mut self, x: i32, y: i32, color: Color) {
        if !self.in_bounds(x, y) {
            return;
        }

        // Nothing committed here, so there is nothing to preview-delete.
        if color.is_transparent() && !self.has_pixel(x, y) {
            return;
        }

        self.staged.insert((x, y), color);
    }

    pub fn clear_staged(&mut self) {
        self.staged.clear();
    }

    /// Applies every staged entry as a committed write, then empties the
    /// overlay. Each coordinate holds a single staged value, so the last
    /// write made during the gesture is the one that lands.
    pub fn commit_staged(&mut self) {
        let staged = std::mem::take(&mut self.staged);
        for ((x, y), color) in staged {
            self.set(x, y, color);
        }
    }

    /// Replaces the committed content with a dense row-major RGBA8 buffer.
    /// Fully transparent source pixels are skipped; a short buffer simply
    /// leaves the remaining cells empty.
    pub fn load_rgba(&mut self, raw: &[u8], width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.pixels.clear();
        self.staged.clear();

        if width == 0 {
            return;
        }

        for (index, chunk) in raw.chunks_exact(4).enumerate() {
            if chunk[3] == 0 {
                continue;
            }

            let x = (index as u32 % width) as i32 + 1;
            let y = (index as u32 / width) as i32 + 1;
            if y as u32 > height {
                break;
            }

            self.pixels
                .insert((x, y), Color::from_rgba8([chunk[0], chunk[1], chunk[2], chunk[3]]));
        }
    }

    /// Dense row-major RGBA8 rendering of the committed content.
    pub fn to_rgba(&self) -> Vec<u8> {
        let mut raw = vec![0u8; self.width as usize * self.height as usize * 4];
        for (&(x, y), color) in &self.pixels {
            let index = ((y - 1) as usize * self.width as usize + (x - 1) as usize) * 4;
            raw[index..index + 4].copy_from_slice(&color.to_rgba8());
        }
        raw
    }

    /// Color as it should be displayed: staged cells take precedence.
    pub fn merged(&self, x: i32, y: i32) -> Color {
        match self.staged.get(&(x, y)) {
            Some(color) => *color,
            None => self.get(x, y),
        }
    }

    /// Changes the dimensions, deleting committed and staged cells that
    /// fall outside the new bounds. Cells inside are untouched.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;

        let (w, h) = (width as i64, height as i64);
        let inside = |&(x, y): &Coord| (x as i64) <= w && (y as i64) <= h;
        self.pixels.retain(|coord, _| inside(coord));
        self.staged.retain(|coord, _| inside(coord));
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn staged_len(&self) -> usize {
        self.staged.len()
    }

    pub fn pixels(&self) -> impl Iterator<Item = (Coord, Color)> + '_ {
        self.pixels.iter().map(|(coord, color)| (*coord, *color))
    }

    /// Committed pixels ordered by row, then column.
    pub fn sorted_pixels(&self) -> Vec<(Coord, Color)> {
        let mut pixels: Vec<_> = self.pixels().collect();
        pixels.sort_by_key(|&((x, y), _)| (y, x));
        pixels
    }

    pub fn staged_pixels(&self) -> impl Iterator<Item = (Coord, Color)> + '_ {
        self.staged.iter().map(|(coord, color)| (*coord, *color))
    }
}
