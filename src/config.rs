//! Per-document settings shared by every frame of a document, plus the
//! TOML settings file the command line tool reads its defaults from.

use crate::error::Result;
use crate::geometry::{clamp_zoom, DEFAULT_ZOOM};
use crate::tools::{ToolType, MAX_TOOL_SIZE, MIN_TOOL_SIZE};
use crate::{Color, SpryteError};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::debug;

pub const DEFAULT_LAYOUT: (u32, u32) = (16, 16);
pub const DEFAULT_FRAME_DELAY_MS: u32 = 250;

/// Config handle shared between a document and its canvases.
pub type SharedConfig = Rc<RefCell<CanvasConfig>>;

/// Which field of a [`CanvasConfig`] changed, with its new value.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigChange {
    LayoutSize(u32, u32),
    Tool(ToolType),
    ToolSize(u8),
    PrimaryColor(Color),
    SecondaryColor(Color),
    Zoom(f64),
    ShowGrid(bool),
    Resizable(bool),
    Editable(bool),
    File(Option<PathBuf>),
    Modified(bool),
    FrameDelay(u32),
}

type Observer = Box<dyn FnMut(&ConfigChange)>;

/// Observers run while the config is mutably borrowed, so they receive the
/// new value through the event and must not borrow the config themselves.
pub struct CanvasConfig {
    layout_size: (u32, u32),
    tool: ToolType,
    tool_size: u8,
    primary_color: Color,
    secondary_color: Color,
    zoom: f64,
    show_grid: bool,
    resizable: bool,
    editable: bool,
    file: Option<PathBuf>,
    modified: bool,
    frame_delay_ms: u32,
    observers: Vec<Observer>,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            layout_size: DEFAULT_LAYOUT,
            tool: ToolType::Pencil,
            tool_size: MIN_TOOL_SIZE,
            primary_color: Color::BLACK,
            secondary_color: Color::WHITE,
            zoom: DEFAULT_ZOOM,
            show_grid: false,
            resizable: true,
            editable: true,
            file: None,
            modified: false,
            frame_delay_ms: DEFAULT_FRAME_DELAY_MS,
            observers: Vec::new(),
        }
    }
}

impl fmt::Debug for CanvasConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CanvasConfig")
            .field("layout_size", &self.layout_size)
            .field("tool", &self.tool)
            .field("tool_size", &self.tool_size)
            .field("primary_color", &self.primary_color)
            .field("secondary_color", &self.secondary_color)
            .field("zoom", &self.zoom)
            .field("show_grid", &self.show_grid)
            .field("resizable", &self.resizable)
            .field("editable", &self.editable)
            .field("file", &self.file)
            .field("modified", &self.modified)
            .field("frame_delay_ms", &self.frame_delay_ms)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl CanvasConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared(self) -> SharedConfig {
        Rc::new(RefCell::new(self))
    }

    pub fn subscribe<F>(&mut self, observer: F)
    where
        F: FnMut(&ConfigChange) + 'static,
    {
        self.observers.push(Box::new(observer));
    }

    fn emit(&mut self, change: ConfigChange) {
        debug!(?change, "config changed");
        for observer in self.observers.iter_mut() {
            observer(&change);
        }
    }

    pub fn layout_size(&self) -> (u32, u32) {
        self.layout_size
    }

    pub fn tool(&self) -> ToolType {
        self.tool
    }

    pub fn tool_size(&self) -> u8 {
        self.tool_size
    }

    pub fn primary_color(&self) -> Color {
        self.primary_color
    }

    pub fn secondary_color(&self) -> Color {
        self.secondary_color
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn show_grid(&self) -> bool {
        self.show_grid
    }

    pub fn resizable(&self) -> bool {
        self.resizable
    }

    pub fn editable(&self) -> bool {
        self.editable
    }

    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    pub fn modified(&self) -> bool {
        self.modified
    }

    pub fn frame_delay_ms(&self) -> u32 {
        self.frame_delay_ms
    }

    /// Zero-sized layouts are bumped to one cell per side.
    pub fn set_layout_size(&mut self, width: u32, height: u32) {
        self.layout_size = (width.max(1), height.max(1));
        self.emit(ConfigChange::LayoutSize(self.layout_size.0, self.layout_size.1));
    }

    pub fn set_tool(&mut self, tool: ToolType) {
        self.tool = tool;
        self.emit(ConfigChange::Tool(tool));
    }

    pub fn set_tool_size(&mut self, tool_size: u8) {
        self.tool_size = tool_size.clamp(MIN_TOOL_SIZE, MAX_TOOL_SIZE);
        self.emit(ConfigChange::ToolSize(self.tool_size));
    }

    pub fn set_primary_color(&mut self, color: Color) {
        self.primary_color = color;
        self.emit(ConfigChange::PrimaryColor(color));
    }

    pub fn set_secondary_color(&mut self, color: Color) {
        self.secondary_color = color;
        self.emit(ConfigChange::SecondaryColor(color));
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        self.zoom = clamp_zoom(zoom);
        self.emit(ConfigChange::Zoom(self.zoom));
    }

    pub fn set_show_grid(&mut self, show_grid: bool) {
        self.show_grid = show_grid;
        self.emit(ConfigChange::ShowGrid(show_grid));
    }

    pub fn set_resizable(&mut self, resizable: bool) {
        self.resizable = resizable;
        self.emit(ConfigChange::Resizable(resizable));
    }

    pub fn set_editable(&mut self, editable: bool) {
        self.editable = editable;
        self.emit(ConfigChange::Editable(editable));
    }

    pub fn set_file(&mut self, file: Option<PathBuf>) {
        self.file = file.clone();
        self.emit(ConfigChange::File(file));
    }

    /// Only notifies when the flag actually flips.
    pub fn set_modified(&mut self, modified: bool) {
        if self.modified == modified {
            return;
        }
        self.modified = modified;
        self.emit(ConfigChange::Modified(modified));
    }

    pub fn set_frame_delay_ms(&mut self, delay: u32) {
        self.frame_delay_ms = delay;
        self.emit(ConfigChange::FrameDelay(delay));
    }
}

/// Defaults read from `spryte.toml`.
///
/// ```toml
/// layout_width = 32
/// layout_height = 32
/// primary_color = "#ff0000"
/// tool = "stroke"
/// tool_size = 2
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub layout_width: u32,
    pub layout_height: u32,
    pub zoom: f64,
    pub tool: String,
    pub tool_size: u8,
    pub primary_color: String,
    pub secondary_color: String,
    pub show_grid: bool,
    pub frame_delay_ms: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            layout_width: DEFAULT_LAYOUT.0,
            layout_height: DEFAULT_LAYOUT.1,
            zoom: DEFAULT_ZOOM,
            tool: ToolType::Pencil.name().to_string(),
            tool_size: MIN_TOOL_SIZE,
            primary_color: "#000000".to_string(),
            secondary_color: "#ffffff".to_string(),
            show_grid: false,
            frame_delay_ms: DEFAULT_FRAME_DELAY_MS,
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let settings = Self::from_toml_str(&content)?;
        debug!(path = %path.display(), "loaded settings");
        Ok(settings)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Builds a fresh config from these settings, rejecting colors and
    /// tool names that do not parse.
    pub fn canvas_config(&self) -> Result<CanvasConfig> {
        let primary: Color = self.primary_color.parse()?;
        let secondary: Color = self.secondary_color.parse()?;
        let tool: ToolType = self.tool.parse()?;
        if self.layout_width == 0 || self.layout_height == 0 {
            return Err(SpryteError::InvalidLayout(self.layout_width, self.layout_height));
        }

        let mut config = CanvasConfig::new();
        config.layout_size = (self.layout_width, self.layout_height);
        config.zoom = clamp_zoom(self.zoom);
        config.tool = tool;
        config.tool_size = self.tool_size.clamp(MIN_TOOL_SIZE, MAX_TOOL_SIZE);
        config.primary_color = primary;
        config.secondary_color = secondary;
        config.show_grid = self.show_grid;
        config.frame_delay_ms = self.frame_delay_ms;
        Ok(config)
    }
}
