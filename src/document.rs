//! A sprite file: one or more animation frames sharing a config.

use crate::canvas::Canvas;
use crate::config::SharedConfig;
use crate::error::Result;
use crate::io;
use crate::pixelmap::PixelMap;
use crate::tools::ToolType;
use crate::Color;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug)]
pub struct Document {
    config: SharedConfig,
    frames: Vec<Canvas>,
    current: usize,
    frames_changed: bool,
}

impl Document {
    /// A document with one empty frame at the config layout size.
    pub fn new(config: SharedConfig) -> Self {
        let frame = Canvas::new(config.clone());
        Self {
            config,
            frames: vec![frame],
            current: 0,
            frames_changed: false,
        }
    }

    /// Builds a clean document from decoded frames. The first frame decides
    /// the layout; the others are trimmed or padded to it.
    pub fn from_frames(frames: Vec<PixelMap>, config: SharedConfig) -> Self {
        let Some(first) = frames.first() else {
            return Self::new(config);
        };

        let (width, height) = first.size();
        config.borrow_mut().set_layout_size(width, height);
        let (width, height) = config.borrow().layout_size();

        let frames = frames
            .into_iter()
            .map(|mut pixelmap| {
                pixelmap.resize(width, height);
                Canvas::with_pixelmap(config.clone(), pixelmap)
            })
            .collect();

        Self {
            config,
            frames,
            current: 0,
            frames_changed: false,
        }
    }

    pub fn open(path: &Path, config: SharedConfig) -> Result<Self> {
        let frames = io::open(path)?;
        let document = Self::from_frames(frames, config);

        {
            let mut config = document.config.borrow_mut();
            config.set_file(Some(path.to_path_buf()));
            config.set_modified(false);
        }
        Ok(document)
    }

    /// Saves every frame to `path` and marks the document clean. Returns
    /// the files written.
    pub fn save(&mut self, path: &Path) -> Result<Vec<PathBuf>> {
        let delay = self.config.borrow().frame_delay_ms();
        let written = io::save(&self.pixelmaps(), path, delay)?;

        for frame in self.frames.iter_mut() {
            frame.mark_saved();
        }
        self.frames_changed = false;

        {
            let mut config = self.config.borrow_mut();
            config.set_file(Some(path.to_path_buf()));
            config.set_modified(false);
        }
        info!(path = %path.display(), frames = self.frames.len(), "document saved");
        Ok(written)
    }

    pub fn config(&self) -> &SharedConfig {
        &self.config
    }

    pub fn file(&self) -> Option<PathBuf> {
        self.config.borrow().file().map(Path::to_path_buf)
    }

    pub fn frames(&self) -> &[Canvas] {
        &self.frames
    }

    pub fn frame(&self, index: usize) -> Option<&Canvas> {
        self.frames.get(index)
    }

    pub fn frame_mut(&mut self, index: usize) -> Option<&mut Canvas> {
        self.frames.get_mut(index)
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current(&self) -> &Canvas {
        &self.frames[self.current]
    }

    pub fn current_mut(&mut self) -> &mut Canvas {
        &mut self.frames[self.current]
    }

    /// Committed content of every frame, in order.
    pub fn pixelmaps(&self) -> Vec<PixelMap> {
        self.frames
            .iter()
            .map(|frame| frame.history().current().clone())
            .collect()
    }

    pub fn is_modified(&self) -> bool {
        self.frames_changed || self.frames.iter().any(Canvas::is_modified)
    }

    fn frames_changed(&mut self) {
        self.frames_changed = true;
        self.config.borrow_mut().set_modified(true);
    }

    /// Appends an empty frame and returns its index.
    pub fn add_frame(&mut self) -> usize {
        self.frames.push(Canvas::new(self.config.clone()));
        self.frames_changed();
        debug!(frames = self.frames.len(), "frame added");
        self.frames.len() - 1
    }

    /// Removes a frame. The last remaining frame is never removed.
    pub fn remove_frame(&mut self, index: usize) -> bool {
        if self.frames.len() <= 1 || index >= self.frames.len() {
            return false;
        }

        self.frames.remove(index);
        if self.current > index || self.current >= self.frames.len() {
            self.current = self.current.saturating_sub(1);
        }
        self.frames_changed();
        debug!(index, frames = self.frames.len(), "frame removed");
        true
    }

    pub fn select_frame(&mut self, index: usize) -> bool {
        if index >= self.frames.len() {
            return false;
        }
        if index != self.current {
            self.current_mut().cancel_gesture();
            self.current = index;
        }
        true
    }

    pub fn set_layout_size(&mut self, width: u32, height: u32) {
        self.config.borrow_mut().set_layout_size(width, height);
        let (width, height) = self.config.borrow().layout_size();
        for frame in self.frames.iter_mut() {
            frame.apply_layout_size(width, height);
        }
    }

    /// Undoes on the selected frame. The shared modified flag then reflects
    /// every frame, not only the one that moved.
    pub fn undo(&mut self) {
        self.current_mut().undo();
        self.sync_modified();
    }

    pub fn redo(&mut self) {
        self.current_mut().redo();
        self.sync_modified();
    }

    fn sync_modified(&mut self) {
        let modified = self.is_modified();
        self.config.borrow_mut().set_modified(modified);
    }

    /// Only the selected frame can have a gesture in progress, so it
    /// decides whether the switch waits.
    pub fn request_tool(&mut self, tool: ToolType) {
        self.current_mut().request_tool(tool);
    }

    pub fn set_tool_size(&mut self, tool_size: u8) {
        self.config.borrow_mut().set_tool_size(tool_size);
    }

    pub fn set_primary_color(&mut self, color: Color) {
        self.config.borrow_mut().set_primary_color(color);
    }

    pub fn set_secondary_color(&mut self, color: Color) {
        self.config.borrow_mut().set_secondary_color(color);
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        self.config.borrow_mut().set_zoom(zoom);
    }
}
