//! Gesture handling for a single frame.
//!
//! A [`Canvas`] turns pointer events into tool applications on the staged
//! overlay of a working copy of the current snapshot, and commits the
//! overlay into history when the last button is released.

use crate::config::SharedConfig;
use crate::geometry::{fit_zoom, zoom_step, Viewport};
use crate::history::History;
use crate::pixelmap::{Coord, PixelMap};
use crate::tools::{tool_for, ToolContext, ToolOutcome, ToolType};
use crate::{Button, Color, ScrollDirection};
use std::fmt;
use std::path::PathBuf;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureState {
    Idle,
    Active { anchor: Coord },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CanvasEvent {
    /// An edit was committed, or undo/redo moved to another snapshot.
    Changed,
    SizeChanged(u32, u32),
    PrimaryColorPicked(Color),
    SecondaryColorPicked(Color),
}

type Observer = Box<dyn FnMut(&CanvasEvent)>;

pub struct Canvas {
    config: SharedConfig,
    history: History,
    pixelmap: PixelMap,
    state: GestureState,
    primary_held: bool,
    secondary_held: bool,
    hovered: Vec<Coord>,
    pending_tool: Option<ToolType>,
    redraw: bool,
    observers: Vec<Observer>,
}

impl fmt::Debug for Canvas {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Canvas")
            .field("size", &self.pixelmap.size())
            .field("state", &self.state)
            .field("history", &self.history.index())
            .field("pending_tool", &self.pending_tool)
            .finish()
    }
}

impl Canvas {
    /// Creates an empty frame sized to the config layout.
    pub fn new(config: SharedConfig) -> Self {
        let (width, height) = config.borrow().layout_size();
        Self::with_pixelmap(config, PixelMap::new(width, height))
    }

    pub fn with_pixelmap(config: SharedConfig, pixelmap: PixelMap) -> Self {
        Self {
            config,
            history: History::new(pixelmap.clone()),
            pixelmap,
            state: GestureState::Idle,
            primary_held: false,
            secondary_held: false,
            hovered: Vec::new(),
            pending_tool: None,
            redraw: true,
            observers: Vec::new(),
        }
    }

    pub fn subscribe<F>(&mut self, observer: F)
    where
        F: FnMut(&CanvasEvent) + 'static,
    {
        self.observers.push(Box::new(observer));
    }

    fn emit(&mut self, event: CanvasEvent) {
        for observer in self.observers.iter_mut() {
            observer(&event);
        }
    }

    fn request_redraw(&mut self) {
        self.redraw = true;
    }

    /// Returns whether a repaint was requested since the last call.
    pub fn take_redraw(&mut self) -> bool {
        std::mem::replace(&mut self.redraw, false)
    }

    pub fn config(&self) -> &SharedConfig {
        &self.config
    }

    /// Working copy of the current snapshot, including staged cells of a
    /// gesture in progress.
    pub fn pixelmap(&self) -> &PixelMap {
        &self.pixelmap
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn state(&self) -> GestureState {
        self.state
    }

    pub fn hovered(&self) -> &[Coord] {
        &self.hovered
    }

    pub fn pending_tool(&self) -> Option<ToolType> {
        self.pending_tool
    }

    pub fn sprite_size(&self) -> (u32, u32) {
        self.pixelmap.size()
    }

    pub fn viewport(&self) -> Viewport {
        Viewport::new(self.config.borrow().zoom())
    }

    pub fn is_modified(&self) -> bool {
        self.history.is_modified()
    }

    pub fn file(&self) -> Option<PathBuf> {
        self.config.borrow().file().map(|path| path.to_path_buf())
    }

    pub fn mark_saved(&mut self) {
        self.history.mark_saved();
    }

    /// Replaces the frame content. With `reset` the history restarts clean
    /// from `pixelmap`, otherwise it is recorded as a new edit.
    pub fn set_pixelmap(&mut self, pixelmap: PixelMap, reset: bool) {
        self.cancel_gesture();
        if reset {
            self.history.reset(pixelmap.clone());
        } else {
            self.history.push(pixelmap.clone());
            self.config.borrow_mut().set_modified(true);
        }
        self.pixelmap = pixelmap;
        self.emit(CanvasEvent::Changed);
        self.request_redraw();
    }

    fn held(&self) -> bool {
        self.primary_held || self.secondary_held
    }

    fn active_button(&self) -> Option<Button> {
        if self.primary_held {
            Some(Button::Primary)
        } else if self.secondary_held {
            Some(Button::Secondary)
        } else {
            None
        }
    }

    fn targets_at(&self, cell: Coord) -> Vec<Coord> {
        let config = self.config.borrow();
        tool_for(config.tool()).targets(&self.pixelmap, cell.0, cell.1, config.tool_size())
    }

    fn apply_tool(&mut self, button: Button) {
        let anchor = match self.state {
            GestureState::Active { anchor } => Some(anchor),
            GestureState::Idle => None,
        };

        let (tool, tool_size, primary, secondary) = {
            let config = self.config.borrow();
            (
                config.tool(),
                config.tool_size(),
                config.primary_color(),
                config.secondary_color(),
            )
        };

        if tool.uses_anchor() {
            self.pixelmap.clear_staged();
        }

        let mut ctx = ToolContext {
            pixelmap: &mut self.pixelmap,
            anchor,
            tool_size,
            primary,
            secondary,
            button,
        };
        let outcome = tool_for(tool).apply(&mut ctx, &self.hovered);

        if let ToolOutcome::ColorPicked(color) = outcome {
            debug!(?button, color = %color.to_hex(), "color picked");
            match button {
                Button::Secondary => self.emit(CanvasEvent::SecondaryColorPicked(color)),
                _ => self.emit(CanvasEvent::PrimaryColorPicked(color)),
            }
        }
    }

    pub fn button_press(&mut self, button: Button, device_x: f64, device_y: f64) {
        if button == Button::Middle || !self.config.borrow().editable() {
            return;
        }

        let cell = self.viewport().to_grid(device_x, device_y);
        if self.state == GestureState::Idle {
            // Leftovers of a gesture that never committed
            self.pixelmap.clear_staged();
            self.state = GestureState::Active { anchor: cell };
            debug!(?button, ?cell, "gesture started");
        }

        match button {
            Button::Primary => self.primary_held = true,
            Button::Secondary => self.secondary_held = true,
            Button::Middle => {}
        }

        self.hovered = self.targets_at(cell);
        self.apply_tool(button);
        self.request_redraw();
    }

    pub fn motion(&mut self, device_x: f64, device_y: f64) {
        let cell = self.viewport().to_grid(device_x, device_y);
        let targets = self.targets_at(cell);
        if targets == self.hovered {
            self.request_redraw();
            return;
        }

        self.hovered = targets;
        if let Some(button) = self.active_button() {
            self.apply_tool(button);
        }
        self.request_redraw();
    }

    pub fn button_release(&mut self, button: Button) {
        match button {
            Button::Primary => self.primary_held = false,
            Button::Secondary => self.secondary_held = false,
            Button::Middle => return,
        }

        if self.held() {
            return;
        }

        let GestureState::Active { anchor } = self.state else {
            return;
        };
        self.state = GestureState::Idle;

        if let Some(tool) = self.pending_tool.take() {
            self.config.borrow_mut().set_tool(tool);
        }

        if self.pixelmap.staged_len() == 0 {
            debug!(?anchor, "gesture ended without changes");
            self.request_redraw();
            return;
        }

        self.pixelmap.commit_staged();
        self.history.push(self.pixelmap.clone());
        debug!(
            ?anchor,
            snapshot = self.history.current_id(),
            pixels = self.pixelmap.len(),
            "committed gesture"
        );

        self.config.borrow_mut().set_modified(true);
        self.emit(CanvasEvent::Changed);
        self.request_redraw();
    }

    /// Drops a gesture in progress without committing it.
    pub fn cancel_gesture(&mut self) {
        self.pixelmap.clear_staged();
        self.state = GestureState::Idle;
        self.primary_held = false;
        self.secondary_held = false;
    }

    pub fn undo(&mut self) {
        self.cancel_gesture();
        if self.history.undo() {
            self.after_history_move();
        }
    }

    pub fn redo(&mut self) {
        self.cancel_gesture();
        if self.history.redo() {
            self.after_history_move();
        }
    }

    fn after_history_move(&mut self) {
        self.pixelmap = self.history.current().clone();
        let modified = self.history.is_modified();
        self.config.borrow_mut().set_modified(modified);
        debug!(index = self.history.index(), modified, "history moved");
        self.emit(CanvasEvent::Changed);
        self.request_redraw();
    }

    /// Switches tools, deferring the switch until the gesture in progress
    /// ends.
    pub fn request_tool(&mut self, tool: ToolType) {
        if self.held() {
            self.pending_tool = Some(tool);
            return;
        }

        self.pending_tool = None;
        self.config.borrow_mut().set_tool(tool);
    }

    /// Zooms by one step when the zoom modifier is held. Returns `false`
    /// when the event was not consumed so the host can scroll normally.
    pub fn scroll(&mut self, direction: ScrollDirection, modifier_held: bool) -> bool {
        if !modifier_held {
            return false;
        }

        let zoom = zoom_step(self.config.borrow().zoom(), direction);
        self.config.borrow_mut().set_zoom(zoom);
        self.request_redraw();
        true
    }

    /// Host allocation changed. Non-resizable documents fit their zoom to it.
    pub fn allocate(&mut self, width: f64, height: f64) {
        let (resizable, layout) = {
            let config = self.config.borrow();
            (config.resizable(), config.layout_size())
        };

        if !resizable {
            self.config.borrow_mut().set_zoom(fit_zoom((width, height), layout));
        }
        self.request_redraw();
    }

    /// Trims this frame to a layout already stored in the config. Layout
    /// changes go through [`Document::set_layout_size`](crate::Document::set_layout_size)
    /// so that every frame sharing the config follows.
    pub(crate) fn apply_layout_size(&mut self, width: u32, height: u32) {
        self.cancel_gesture();
        self.history.resize(width, height);
        self.pixelmap = self.history.current().clone();
        self.hovered.clear();

        self.config.borrow_mut().set_modified(true);
        debug!(width, height, "layout resized");
        self.emit(CanvasEvent::SizeChanged(width, height));
        self.request_redraw();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CanvasConfig;
    use std::cell::RefCell;
    use std::rc::Rc;

    const RED: Color = Color::new(1.0, 0.0, 0.0, 1.0);

    // At zoom 100 one device unit is one cell, so device (x - 1, y - 1)
    // lands on grid cell (x, y).
    fn canvas(width: u32, height: u32) -> Canvas {
        let mut config = CanvasConfig::new();
        config.set_layout_size(width, height);
        config.set_zoom(100.0);
        config.set_primary_color(RED);
        Canvas::new(config.shared())
    }

    fn at(cell: i32) -> f64 {
        (cell - 1) as f64 + 0.5
    }

    fn click(canvas: &mut Canvas, button: Button, x: i32, y: i32) {
        canvas.button_press(button, at(x), at(y));
        canvas.button_release(button);
    }

    fn drag(canvas: &mut Canvas, from: Coord, to: Coord) {
        canvas.button_press(Button::Primary, at(from.0), at(from.1));
        canvas.motion(at(to.0), at(to.1));
        canvas.button_release(Button::Primary);
    }

    fn record_events(canvas: &mut Canvas) -> Rc<RefCell<Vec<CanvasEvent>>> {
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        canvas.subscribe(move |event| sink.borrow_mut().push(*event));
        events
    }

    #[test]
    fn test_click_commits_one_snapshot() {
        let mut canvas = canvas(8, 8);
        let events = record_events(&mut canvas);

        click(&mut canvas, Button::Primary, 3, 4);

        assert_eq!(canvas.pixelmap().get(3, 4), RED);
        assert_eq!(canvas.pixelmap().staged_len(), 0);
        assert_eq!(canvas.history().len(), 2);
        assert!(canvas.is_modified());
        assert!(canvas.config().borrow().modified());
        assert_eq!(*events.borrow(), vec![CanvasEvent::Changed]);
        assert_eq!(canvas.state(), GestureState::Idle);
    }

    #[test]
    fn test_secondary_button_paints_secondary_color() {
        let mut canvas = canvas(8, 8);
        click(&mut canvas, Button::Secondary, 1, 1);
        assert_eq!(canvas.pixelmap().get(1, 1), Color::WHITE);
    }

    #[test]
    fn test_middle_button_and_read_only_are_ignored() {
        let mut canvas = canvas(8, 8);
        click(&mut canvas, Button::Middle, 2, 2);
        assert!(canvas.pixelmap().is_empty());

        canvas.config().borrow_mut().set_editable(false);
        click(&mut canvas, Button::Primary, 2, 2);
        assert!(canvas.pixelmap().is_empty());
        assert_eq!(canvas.history().len(), 1);
    }

    #[test]
    fn test_gesture_without_changes_commits_nothing() {
        let mut canvas = canvas(8, 8);
        canvas.request_tool(ToolType::Eraser);
        click(&mut canvas, Button::Primary, 2, 2);
        assert_eq!(canvas.history().len(), 1);
        assert!(!canvas.is_modified());
    }

    #[test]
    fn test_pencil_drag_paints_each_hovered_cell() {
        let mut canvas = canvas(8, 8);
        canvas.button_press(Button::Primary, at(1), at(1));
        for x in 2..=4 {
            canvas.motion(at(x), at(1));
            assert_eq!(canvas.pixelmap().get_staged(x, 1), RED);
        }
        canvas.button_release(Button::Primary);

        assert_eq!(canvas.pixelmap().len(), 4);
        assert_eq!(canvas.history().len(), 2);
    }

    #[test]
    fn test_anchor_tools_do_not_accumulate_previews() {
        let mut canvas = canvas(16, 16);
        canvas.request_tool(ToolType::Stroke);

        canvas.button_press(Button::Primary, at(1), at(1));
        canvas.motion(at(8), at(1));
        canvas.motion(at(1), at(8));
        assert_eq!(canvas.pixelmap().staged_len(), 8);
        assert!(!canvas.pixelmap().is_staged(8, 1));
        canvas.button_release(Button::Primary);

        assert_eq!(canvas.pixelmap().len(), 8);
        assert!(canvas.pixelmap().has_pixel(1, 8));
    }

    #[test]
    fn test_far_off_grid_pointers_change_nothing() {
        let mut canvas = canvas(8, 8);
        canvas.config().borrow_mut().set_zoom(1.0);
        let events = record_events(&mut canvas);

        for tool in ToolType::ALL {
            canvas.request_tool(tool);
            canvas.button_press(Button::Primary, 1.0e8, -1.0e12);
            canvas.motion(-1.0e300, -1.0e300);
            canvas.motion(f64::INFINITY, f64::NAN);
            canvas.button_release(Button::Primary);

            assert_eq!(canvas.state(), GestureState::Idle, "{tool}");
            assert!(canvas.pixelmap().is_empty(), "{tool}");
            assert_eq!(canvas.history().len(), 1, "{tool}");
        }
        assert!(events.borrow().is_empty());
        assert!(!canvas.is_modified());
    }

    #[test]
    fn test_rectangle_drag() {
        let mut canvas = canvas(16, 16);
        canvas.request_tool(ToolType::Rectangle);
        drag(&mut canvas, (2, 2), (6, 5));

        let map = canvas.pixelmap();
        assert_eq!(map.len(), 5 * 4 - 3 * 2);
        assert!(map.has_pixel(2, 2) && map.has_pixel(6, 5));
        assert!(!map.has_pixel(4, 3));
    }

    #[test]
    fn test_undo_redo_sequence() {
        let mut canvas = canvas(8, 8);
        let events = record_events(&mut canvas);
        for x in 1..=3 {
            click(&mut canvas, Button::Primary, x, 1);
        }

        for _ in 0..3 {
            canvas.undo();
        }
        assert!(canvas.pixelmap().is_empty());
        assert!(!canvas.is_modified());
        assert!(!canvas.config().borrow().modified());

        canvas.undo();
        assert_eq!(events.borrow().len(), 6);

        for _ in 0..3 {
            canvas.redo();
        }
        assert_eq!(canvas.pixelmap().len(), 3);
        canvas.redo();
        assert_eq!(events.borrow().len(), 9);
        assert!(canvas.config().borrow().modified());
    }

    #[test]
    fn test_edit_after_undo_truncates_redo() {
        let mut canvas = canvas(8, 8);
        click(&mut canvas, Button::Primary, 1, 1);
        click(&mut canvas, Button::Primary, 2, 1);
        canvas.undo();
        click(&mut canvas, Button::Primary, 5, 5);

        canvas.redo();
        assert!(canvas.pixelmap().has_pixel(5, 5));
        assert!(!canvas.pixelmap().has_pixel(2, 1));
        assert_eq!(canvas.history().len(), 3);
    }

    #[test]
    fn test_tool_switch_waits_for_release() {
        let mut canvas = canvas(8, 8);
        canvas.button_press(Button::Primary, at(1), at(1));
        canvas.request_tool(ToolType::Bucket);

        assert_eq!(canvas.config().borrow().tool(), ToolType::Pencil);
        assert_eq!(canvas.pending_tool(), Some(ToolType::Bucket));

        canvas.motion(at(2), at(1));
        assert_eq!(canvas.pixelmap().get_staged(2, 1), RED);

        canvas.button_release(Button::Primary);
        assert_eq!(canvas.config().borrow().tool(), ToolType::Bucket);
        assert_eq!(canvas.pending_tool(), None);
    }

    #[test]
    fn test_gesture_ends_when_all_buttons_released() {
        let mut canvas = canvas(8, 8);
        canvas.button_press(Button::Primary, at(1), at(1));
        canvas.button_press(Button::Secondary, at(1), at(1));
        canvas.button_release(Button::Primary);
        assert!(matches!(canvas.state(), GestureState::Active { .. }));
        assert_eq!(canvas.history().len(), 1);

        canvas.motion(at(2), at(1));
        assert_eq!(canvas.pixelmap().get_staged(2, 1), Color::WHITE);

        canvas.button_release(Button::Secondary);
        assert_eq!(canvas.history().len(), 2);
        assert_eq!(canvas.pixelmap().get(1, 1), Color::WHITE);
    }

    #[test]
    fn test_color_picker_emits_by_button() {
        let mut canvas = canvas(8, 8);
        click(&mut canvas, Button::Primary, 4, 4);
        canvas.request_tool(ToolType::ColorPicker);
        let events = record_events(&mut canvas);

        click(&mut canvas, Button::Primary, 4, 4);
        click(&mut canvas, Button::Secondary, 1, 1);

        assert_eq!(
            *events.borrow(),
            vec![
                CanvasEvent::PrimaryColorPicked(RED),
                CanvasEvent::SecondaryColorPicked(Color::TRANSPARENT),
            ]
        );
        assert_eq!(canvas.history().len(), 2);
    }

    #[test]
    fn test_scroll_requires_modifier() {
        let mut canvas = canvas(8, 8);
        assert!(!canvas.scroll(ScrollDirection::Up, false));
        assert_eq!(canvas.viewport().zoom, 100.0);

        assert!(canvas.scroll(ScrollDirection::Up, true));
        assert_eq!(canvas.viewport().zoom, 150.0);

        for _ in 0..10 {
            canvas.scroll(ScrollDirection::Down, true);
        }
        assert_eq!(canvas.viewport().zoom, 1.0);
        assert!(canvas.pixelmap().is_empty());
    }

    #[test]
    fn test_allocate_fits_zoom_only_when_not_resizable() {
        let mut canvas = canvas(8, 4);
        canvas.allocate(400.0, 400.0);
        assert_eq!(canvas.viewport().zoom, 100.0);

        canvas.config().borrow_mut().set_resizable(false);
        canvas.allocate(400.0, 400.0);
        assert_eq!(canvas.viewport().zoom, 5000.0);
        canvas.allocate(160.0, 400.0);
        assert_eq!(canvas.viewport().zoom, 2000.0);
    }

    #[test]
    fn test_layout_size_trims_and_cancels_gesture() {
        let mut canvas = canvas(8, 8);
        click(&mut canvas, Button::Primary, 2, 2);
        click(&mut canvas, Button::Primary, 7, 7);
        canvas.mark_saved();
        let events = record_events(&mut canvas);

        canvas.button_press(Button::Primary, at(3), at(3));
        canvas.config().borrow_mut().set_layout_size(4, 4);
        canvas.apply_layout_size(4, 4);

        assert_eq!(canvas.state(), GestureState::Idle);
        assert_eq!(canvas.sprite_size(), (4, 4));
        assert_eq!(canvas.pixelmap().len(), 1);
        assert_eq!(canvas.pixelmap().staged_len(), 0);
        assert!(canvas.is_modified());
        assert_eq!(*events.borrow(), vec![CanvasEvent::SizeChanged(4, 4)]);

        // Trimmed history too
        canvas.undo();
        assert_eq!(canvas.pixelmap().len(), 1);

        canvas.button_release(Button::Primary);
        assert_eq!(canvas.history().len(), 3);
    }

    #[test]
    fn test_redraw_is_coalesced() {
        let mut canvas = canvas(8, 8);
        assert!(canvas.take_redraw());
        assert!(!canvas.take_redraw());

        canvas.motion(at(1), at(1));
        canvas.motion(at(2), at(1));
        canvas.motion(at(3), at(1));
        assert!(canvas.take_redraw());
        assert!(!canvas.take_redraw());
    }

    #[test]
    fn test_set_pixelmap_with_and_without_reset() {
        let mut canvas = canvas(4, 4);
        let mut map = PixelMap::new(4, 4);
        map.set(1, 1, RED);

        canvas.set_pixelmap(map.clone(), true);
        assert!(!canvas.is_modified());
        assert_eq!(canvas.history().len(), 1);

        map.set(2, 2, RED);
        canvas.set_pixelmap(map, false);
        assert!(canvas.is_modified());
        canvas.undo();
        assert_eq!(canvas.pixelmap().len(), 1);
    }
}
