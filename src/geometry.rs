//! Mapping between pointer (device) coordinates and 1-based grid cells.
//!
//! Zoom is a percentage of a one-unit cell: at zoom 100 a cell is one
//! device unit wide, at zoom 2000 it is twenty.

use crate::pixelmap::Coord;
use crate::ScrollDirection;

pub const MIN_ZOOM: f64 = 1.0;
pub const MAX_ZOOM: f64 = 5000.0;
pub const ZOOM_STEP: f64 = 50.0;
pub const DEFAULT_ZOOM: f64 = 2000.0;

/// Grid coordinates are clamped to this distance from the origin, so cell
/// arithmetic and line walks on far off-grid pointers stay bounded.
pub const GRID_LIMIT: i32 = 1 << 16;

pub fn clamp_zoom(zoom: f64) -> f64 {
    if zoom.is_nan() {
        return DEFAULT_ZOOM;
    }
    zoom.clamp(MIN_ZOOM, MAX_ZOOM)
}

/// One scroll tick worth of zoom change, clamped to the allowed range.
pub fn zoom_step(zoom: f64, direction: ScrollDirection) -> f64 {
    match direction {
        ScrollDirection::Up => (zoom + ZOOM_STEP).min(MAX_ZOOM),
        ScrollDirection::Down => (zoom - ZOOM_STEP).max(MIN_ZOOM),
    }
}

/// Zoom that fits a layout inside an allocation, used by documents that
/// follow their container size instead of requesting one.
pub fn fit_zoom(allocation: (f64, f64), layout: (u32, u32)) -> f64 {
    let (w, h) = (layout.0.max(1) as f64, layout.1.max(1) as f64);
    clamp_zoom(100.0 * (allocation.0 / w).min(allocation.1 / h))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub zoom: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self { zoom: DEFAULT_ZOOM }
    }
}

impl Viewport {
    pub fn new(zoom: f64) -> Self {
        Self { zoom: clamp_zoom(zoom) }
    }

    /// Side of one cell in device units.
    pub fn cell_size(&self) -> f64 {
        self.zoom / 100.0
    }

    pub fn to_grid(&self, device_x: f64, device_y: f64) -> Coord {
        (self.axis_to_grid(device_x), self.axis_to_grid(device_y))
    }

    fn axis_to_grid(&self, device: f64) -> i32 {
        // Multiply before dividing so integral inputs stay exact.
        let cell = (device * 100.0 / self.zoom).floor();
        if cell.is_nan() {
            return 0;
        }
        cell.clamp(-(GRID_LIMIT as f64), GRID_LIMIT as f64) as i32 + 1
    }

    /// Top-left corner of a cell in device units.
    pub fn to_device(&self, gx: i32, gy: i32) -> (f64, f64) {
        (
            (gx - 1) as f64 * self.zoom / 100.0,
            (gy - 1) as f64 * self.zoom / 100.0,
        )
    }

    /// Device size a layout needs at this zoom.
    pub fn canvas_size(&self, layout: (u32, u32)) -> (f64, f64) {
        (
            layout.0 as f64 * self.zoom / 100.0,
            layout.1 as f64 * self.zoom / 100.0,
        )
    }
}
