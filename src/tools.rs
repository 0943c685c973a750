//! The tool palette.
//!
//! Each tool answers two questions: which cells does the cursor cover
//! (`targets`), and what does pressing a button over those cells do to the
//! staged overlay (`apply`). The palette is a fixed set, so tools are
//! looked up through [`tool_for`] rather than registered at runtime.

use crate::paint;
use crate::pixelmap::{Coord, PixelMap};
use crate::{Button, Color, SpryteError};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

pub const MIN_TOOL_SIZE: u8 = 1;
pub const MAX_TOOL_SIZE: u8 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolType {
    Pencil,
    VerticalMirrorPencil,
    Bucket,
    SpecialBucket,
    Eraser,
    Rectangle,
    Stroke,
    ColorPicker,
    Dithering,
}

impl ToolType {
    pub const ALL: [ToolType; 9] = [
        ToolType::Pencil,
        ToolType::VerticalMirrorPencil,
        ToolType::Bucket,
        ToolType::SpecialBucket,
        ToolType::Eraser,
        ToolType::Rectangle,
        ToolType::Stroke,
        ToolType::ColorPicker,
        ToolType::Dithering,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ToolType::Pencil => "pencil",
            ToolType::VerticalMirrorPencil => "mirror-pencil",
            ToolType::Bucket => "bucket",
            ToolType::SpecialBucket => "replace-color",
            ToolType::Eraser => "eraser",
            ToolType::Rectangle => "rectangle",
            ToolType::Stroke => "stroke",
            ToolType::ColorPicker => "color-picker",
            ToolType::Dithering => "dithering",
        }
    }

    /// Whether the cursor footprint follows the tool size.
    pub fn is_resizable(&self) -> bool {
        !matches!(
            self,
            ToolType::Bucket | ToolType::SpecialBucket | ToolType::Rectangle | ToolType::ColorPicker
        )
    }

    /// Tools whose preview depends on where the gesture started. Their
    /// staged cells are rebuilt from scratch on every cursor move.
    pub fn uses_anchor(&self) -> bool {
        matches!(self, ToolType::Rectangle | ToolType::Stroke)
    }
}

impl fmt::Display for ToolType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ToolType {
    type Err = SpryteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tool = match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "pencil" => ToolType::Pencil,
            "mirror-pencil" | "vertical-mirror-pencil" => ToolType::VerticalMirrorPencil,
            "bucket" => ToolType::Bucket,
            "replace-color" | "special-bucket" => ToolType::SpecialBucket,
            "eraser" => ToolType::Eraser,
            "rectangle" => ToolType::Rectangle,
            "stroke" => ToolType::Stroke,
            "color-picker" | "picker" => ToolType::ColorPicker,
            "dithering" => ToolType::Dithering,
            _ => return Err(SpryteError::UnknownTool(s.to_string())),
        };
        Ok(tool)
    }
}

/// What applying a tool did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ToolOutcome {
    Unchanged,
    Staged,
    ColorPicked(Color),
}

/// Everything a tool may read or write while it is applied.
pub struct ToolContext<'a> {
    pub pixelmap: &'a mut PixelMap,
    /// Cell under the pointer when the gesture started.
    pub anchor: Option<Coord>,
    pub tool_size: u8,
    pub primary: Color,
    pub secondary: Color,
    pub button: Button,
}

impl ToolContext<'_> {
    pub fn active_color(&self) -> Color {
        match self.button {
            Button::Secondary => self.secondary,
            _ => self.primary,
        }
    }
}

pub trait Tool: Sync {
    /// Cells covered by the cursor at grid position `(x, y)`.
    fn targets(&self, _pixelmap: &PixelMap, x: i32, y: i32, _tool_size: u8) -> Vec<Coord> {
        vec![(x, y)]
    }

    fn apply(&self, ctx: &mut ToolContext<'_>, targets: &[Coord]) -> ToolOutcome;
}

pub fn tool_for(tool: ToolType) -> &'static dyn Tool {
    match tool {
        ToolType::Pencil => &Pencil,
        ToolType::VerticalMirrorPencil => &MirrorPencil,
        ToolType::Bucket => &Bucket,
        ToolType::SpecialBucket => &SpecialBucket,
        ToolType::Eraser => &Eraser,
        ToolType::Rectangle => &Rectangle,
        ToolType::Stroke => &Stroke,
        ToolType::ColorPicker => &ColorPicker,
        ToolType::Dithering => &Dithering,
    }
}

// Footprint offsets relative to the cursor (X), added per size step.
//
// size 2       size 3         size 4
// X 1          4 5 6          4 5 6 9
// 3 2          7 X 1          7 X 1 10
//              8 2 3          8 2 3 11
//                             12 13 14 15
const SIZE_2_OFFSETS: [Coord; 3] = [(1, 0), (1, 1), (0, 1)];
const SIZE_3_OFFSETS: [Coord; 5] = [(-1, -1), (0, -1), (1, -1), (-1, 0), (-1, 1)];
const SIZE_4_OFFSETS: [Coord; 7] = [(2, -1), (2, 0), (2, 1), (-1, 2), (0, 2), (1, 2), (2, 2)];

/// Offsets covered by a square brush of the given size. The cursor cell
/// always comes first.
pub fn footprint_offsets(tool_size: u8) -> Vec<Coord> {
    let size = tool_size.clamp(MIN_TOOL_SIZE, MAX_TOOL_SIZE);
    let mut offsets = vec![(0, 0)];

    if size >= 2 {
        offsets.extend(SIZE_2_OFFSETS);
    }
    if size >= 3 {
        offsets.extend(SIZE_3_OFFSETS);
    }
    if size == 4 {
        offsets.extend(SIZE_4_OFFSETS);
    }

    offsets
}

pub fn footprint(x: i32, y: i32, tool_size: u8) -> Vec<Coord> {
    footprint_offsets(tool_size)
        .into_iter()
        .map(|(dx, dy)| (x + dx, y + dy))
        .collect()
}

/// Bounding range of a footprint along one axis, `(low, high)`.
fn footprint_range(tool_size: u8) -> (i32, i32) {
    match tool_size.clamp(MIN_TOOL_SIZE, MAX_TOOL_SIZE) {
        1 => (0, 0),
        2 => (0, 1),
        3 => (-1, 1),
        _ => (-1, 2),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edge {
    Left,
    Right,
    Top,
    Bottom,
}

/// Footprint edges whose cells are swept by a thick stroke, keyed by the
/// sign of the movement from anchor to cursor.
const STROKE_EDGES: [((i32, i32), &[Edge]); 8] = [
    ((1, 1), &[Edge::Right, Edge::Bottom]),
    ((-1, 1), &[Edge::Left, Edge::Bottom]),
    ((1, -1), &[Edge::Right, Edge::Top]),
    ((-1, -1), &[Edge::Left, Edge::Top]),
    ((1, 0), &[Edge::Right]),
    ((-1, 0), &[Edge::Left]),
    ((0, 1), &[Edge::Bottom]),
    ((0, -1), &[Edge::Top]),
];

/// Pairs of footprint offsets that must be joined by a line so that a
/// stroke of the given size leaves no gaps.
fn stroke_offsets(tool_size: u8, dx: i32, dy: i32) -> Vec<Coord> {
    if tool_size <= 2 {
        return footprint_offsets(tool_size);
    }

    let key = (dx.signum(), dy.signum());
    let Some((_, edges)) = STROKE_EDGES.iter().find(|(quadrant, _)| *quadrant == key) else {
        return Vec::new();
    };

    let (low, high) = footprint_range(tool_size);
    let mut seen = HashSet::new();
    let mut offsets = Vec::new();
    for edge in edges.iter() {
        for i in low..=high {
            let offset = match edge {
                Edge::Left => (low, i),
                Edge::Right => (high, i),
                Edge::Top => (i, low),
                Edge::Bottom => (i, high),
            };
            if seen.insert(offset) {
                offsets.push(offset);
            }
        }
    }
    offsets
}

fn stage_all(pixelmap: &mut PixelMap, targets: &[Coord], color: Color) -> ToolOutcome {
    if targets.is_empty() {
        return ToolOutcome::Unchanged;
    }

    for &(x, y) in targets {
        pixelmap.set_staged(x, y, color);
    }
    ToolOutcome::Staged
}

pub struct Pencil;

impl Tool for Pencil {
    fn targets(&self, _pixelmap: &PixelMap, x: i32, y: i32, tool_size: u8) -> Vec<Coord> {
        footprint(x, y, tool_size)
    }

    fn apply(&self, ctx: &mut ToolContext<'_>, targets: &[Coord]) -> ToolOutcome {
        let color = ctx.active_color();
        stage_all(ctx.pixelmap, targets, color)
    }
}

pub struct MirrorPencil;

impl Tool for MirrorPencil {
    fn targets(&self, pixelmap: &PixelMap, x: i32, y: i32, tool_size: u8) -> Vec<Coord> {
        let mut targets = footprint(x, y, tool_size);
        let width = pixelmap.width() as i32;

        for i in 0..targets.len() {
            let (tx, ty) = targets[i];
            let mirrored = (width.saturating_sub(tx).saturating_add(1), ty);
            if !targets.contains(&mirrored) {
                targets.push(mirrored);
            }
        }
        targets
    }

    fn apply(&self, ctx: &mut ToolContext<'_>, targets: &[Coord]) -> ToolOutcome {
        let color = ctx.active_color();
        stage_all(ctx.pixelmap, targets, color)
    }
}

pub struct Eraser;

impl Tool for Eraser {
    fn targets(&self, _pixelmap: &PixelMap, x: i32, y: i32, tool_size: u8) -> Vec<Coord> {
        footprint(x, y, tool_size)
    }

    fn apply(&self, ctx: &mut ToolContext<'_>, targets: &[Coord]) -> ToolOutcome {
        stage_all(ctx.pixelmap, targets, Color::TRANSPARENT)
    }
}

pub struct Bucket;

impl Tool for Bucket {
    fn apply(&self, ctx: &mut ToolContext<'_>, targets: &[Coord]) -> ToolOutcome {
        let Some(&(x, y)) = targets.first() else {
            return ToolOutcome::Unchanged;
        };

        let current = ctx.pixelmap.get(x, y);
        let new = ctx.active_color();
        if current == new || !ctx.pixelmap.in_bounds(x, y) {
            return ToolOutcome::Unchanged;
        }

        paint::flood_fill(ctx.pixelmap, x, y, current, new);
        ToolOutcome::Staged
    }
}

pub struct SpecialBucket;

impl Tool for SpecialBucket {
    fn apply(&self, ctx: &mut ToolContext<'_>, targets: &[Coord]) -> ToolOutcome {
        let Some(&(x, y)) = targets.first() else {
            return ToolOutcome::Unchanged;
        };

        let current = ctx.pixelmap.get(x, y);
        let new = ctx.active_color();
        if current == new || !ctx.pixelmap.in_bounds(x, y) {
            return ToolOutcome::Unchanged;
        }

        paint::replace(ctx.pixelmap, current, new);
        ToolOutcome::Staged
    }
}

pub struct Rectangle;

impl Tool for Rectangle {
    fn apply(&self, ctx: &mut ToolContext<'_>, targets: &[Coord]) -> ToolOutcome {
        let Some(&cursor) = targets.first() else {
            return ToolOutcome::Unchanged;
        };

        let anchor = ctx.anchor.unwrap_or(cursor);
        let color = ctx.active_color();
        paint::rectangle_outline(ctx.pixelmap, anchor, cursor, ctx.tool_size, color);
        ToolOutcome::Staged
    }
}

pub struct Stroke;

impl Tool for Stroke {
    fn targets(&self, _pixelmap: &PixelMap, x: i32, y: i32, tool_size: u8) -> Vec<Coord> {
        footprint(x, y, tool_size)
    }

    fn apply(&self, ctx: &mut ToolContext<'_>, targets: &[Coord]) -> ToolOutcome {
        let Some(&cursor) = targets.first() else {
            return ToolOutcome::Unchanged;
        };

        let anchor = ctx.anchor.unwrap_or(cursor);
        let color = ctx.active_color();
        let size = ctx.tool_size.clamp(MIN_TOOL_SIZE, MAX_TOOL_SIZE);

        // Thick brushes only draw lines from their leading edges, so the
        // two end stamps have to be laid down explicitly.
        if size > 2 {
            for (x, y) in footprint(anchor.0, anchor.1, size) {
                ctx.pixelmap.set_staged(x, y, color);
            }
            for (x, y) in footprint(cursor.0, cursor.1, size) {
                ctx.pixelmap.set_staged(x, y, color);
            }
        }

        let (dx, dy) = (cursor.0 - anchor.0, cursor.1 - anchor.1);
        for (ox, oy) in stroke_offsets(size, dx, dy) {
            paint::line(
                ctx.pixelmap,
                anchor.0 + ox,
                anchor.1 + oy,
                cursor.0 + ox,
                cursor.1 + oy,
                color,
            );
        }
        ToolOutcome::Staged
    }
}

pub struct ColorPicker;

impl Tool for ColorPicker {
    fn apply(&self, ctx: &mut ToolContext<'_>, targets: &[Coord]) -> ToolOutcome {
        match targets.first() {
            Some(&(x, y)) if ctx.pixelmap.in_bounds(x, y) => {
                ToolOutcome::ColorPicked(ctx.pixelmap.get(x, y))
            }
            _ => ToolOutcome::Unchanged,
        }
    }
}

pub struct Dithering;

impl Tool for Dithering {
    fn targets(&self, _pixelmap: &PixelMap, x: i32, y: i32, tool_size: u8) -> Vec<Coord> {
        footprint(x, y, tool_size)
    }

    fn apply(&self, ctx: &mut ToolContext<'_>, targets: &[Coord]) -> ToolOutcome {
        if targets.is_empty() {
            return ToolOutcome::Unchanged;
        }

        for &(x, y) in targets {
            let color = paint::dither_color(x, y, ctx.primary, ctx.secondary, ctx.button);
            ctx.pixelmap.set_staged(x, y, color);
        }
        ToolOutcome::Staged
    }
}
