//! Grid algorithms used by the paint tools.
//!
//! Every function here reads committed pixels and writes only to the
//! staged overlay; merging is left to the canvas when a gesture ends.

use crate::pixelmap::{Coord, PixelMap};
use crate::{Button, Color};
use std::collections::HashSet;

/// 4-connected flood fill starting at `(x, y)`.
///
/// A neighbour is entered only when its committed color equals `current`
/// and its staged color is still transparent, which is what stops the fill
/// from revisiting cells it already painted. `visited` covers the one case
/// that guard cannot: filling with a transparent color, where staged cells
/// keep reading as transparent.
pub fn flood_fill(map: &mut PixelMap, x: i32, y: i32, current: Color, new: Color) {
    if current == new || !map.in_bounds(x, y) || map.get(x, y) != current {
        return;
    }

    let (width, height) = (map.width() as i32, map.height() as i32);
    let mut visited: HashSet<Coord> = HashSet::new();
    let mut stack: Vec<Coord> = vec![(x, y)];
    map.set_staged(x, y, new);
    visited.insert((x, y));

    while let Some((px, py)) = stack.pop() {
        let mut neighbours: [Option<Coord>; 4] = [None; 4];
        if px > 1 {
            neighbours[0] = Some((px - 1, py));
        }
        if px < width {
            neighbours[1] = Some((px + 1, py));
        }
        if py > 1 {
            neighbours[2] = Some((px, py - 1));
        }
        if py < height {
            neighbours[3] = Some((px, py + 1));
        }

        for (nx, ny) in neighbours.into_iter().flatten() {
            if visited.contains(&(nx, ny))
                || map.get(nx, ny) != current
                || map.get_staged(nx, ny) != Color::TRANSPARENT
            {
                continue;
            }

            map.set_staged(nx, ny, new);
            visited.insert((nx, ny));
            stack.push((nx, ny));
        }
    }
}

/// Stages `new` on every cell whose committed color is `current`.
///
/// Opaque colors are found by walking the sparse committed store. Transparent
/// cells are not materialized, so replacing transparency walks the whole
/// width x height grid instead.
pub fn replace(map: &mut PixelMap, current: Color, new: Color) {
    if current == new {
        return;
    }

    let targets: Vec<Coord> = if current.is_transparent() {
        let (width, height) = (map.width() as i32, map.height() as i32);
        (1..=height)
            .flat_map(|y| (1..=width).map(move |x| (x, y)))
            .filter(|&(x, y)| map.get(x, y).is_transparent())
            .collect()
    } else {
        map.pixels()
            .filter(|(_, color)| *color == current)
            .map(|(coord, _)| coord)
            .collect()
    };

    for (x, y) in targets {
        map.set_staged(x, y, new);
    }
}

/// Stages every cell of the 8-connected line from `(x0, y0)` to `(x1, y1)`.
///
/// Bresenham with the major axis swapped when the line is steep. The loop
/// is driven until `x` reaches `x1`; if the error term left `y` short of
/// `y1` by then, the rest of the final column is filled. The end point is
/// always staged last.
pub fn line(map: &mut PixelMap, x0: i32, y0: i32, x1: i32, y1: i32, color: Color) {
    if x0 == x1 {
        for y in y0.min(y1)..=y0.max(y1) {
            map.set_staged(x0, y, color);
        }
        return;
    }

    let mut delta_x = x1 - x0;
    let mut delta_y = y1 - y0;

    let step_y = if delta_y >= 0 { 1 } else { -1 };
    delta_y = delta_y.abs();
    let step_x = if delta_x >= 0 { 1 } else { -1 };
    delta_x = delta_x.abs();

    // Straight move along the major axis
    let (straight_x, straight_y) = if delta_x >= delta_y {
        (step_x, 0)
    } else {
        std::mem::swap(&mut delta_x, &mut delta_y);
        (0, step_y)
    };

    let straight_err = 2 * delta_y;
    let mut err = straight_err - delta_x;
    let diagonal_err = err - delta_x;

    let (mut x, mut y) = (x0, y0);
    while x != x1 {
        map.set_staged(x, y, color);

        if err >= 0 {
            x += step_x;
            y += step_y;
            err += diagonal_err;
        } else {
            x += straight_x;
            y += straight_y;
            err += straight_err;
        }
    }

    if y != y1 {
        for fill_y in y.min(y1)..=y.max(y1) {
            map.set_staged(x, fill_y, color);
        }
    }

    map.set_staged(x1, y1, color);
}

/// Orders two corners so that the first is the top-left one, whatever
/// quadrant the cursor moved into.
pub fn normalize_rect(a: Coord, b: Coord) -> (Coord, Coord) {
    ((a.0.min(b.0), a.1.min(b.1)), (a.0.max(b.0), a.1.max(b.1)))
}

/// Stages a hollow rectangle whose border is `thickness` cells wide.
///
/// A cell is part of the border when it lies fewer than `thickness` cells
/// from any edge of the bounding box. Boxes thinner than twice the
/// thickness come out filled.
pub fn rectangle_outline(map: &mut PixelMap, anchor: Coord, cursor: Coord, thickness: u8, color: Color) {
    let ((sx, sy), (ex, ey)) = normalize_rect(anchor, cursor);
    let t = thickness.max(1) as i32;
    let (width, height) = (map.width() as i32, map.height() as i32);

    // Only the visible part of the box is walked; the border test still
    // measures against the unclipped edges.
    for x in sx.max(1)..=ex.min(width) {
        for y in sy.max(1)..=ey.min(height) {
            let interior = x - sx >= t && ex - x >= t && y - sy >= t && ey - y >= t;
            if !interior {
                map.set_staged(x, y, color);
            }
        }
    }
}

/// Checkerboard pick between the two active colors. The secondary button
/// swaps which color lands on even cells.
pub fn dither_color(x: i32, y: i32, primary: Color, secondary: Color, button: Button) -> Color {
    let even = (x + y).rem_euclid(2) == 0;
    let first = match button {
        Button::Secondary => !even,
        _ => even,
    };

    if first {
        primary
    } else {
        secondary
    }
}
