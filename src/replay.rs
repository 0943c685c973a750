//! Replays recorded editing sessions.
//!
//! A script is JSON with the sprite size and a list of actions. Each action
//! is an array whose first element names the command:
//!
//! ```json
//! {
//!   "width": 16,
//!   "height": 16,
//!   "actions": [
//!     ["tool", "rectangle"],
//!     ["color", "primary", "#ff0000"],
//!     ["press", "primary", 20, 20],
//!     ["motion", 200, 120],
//!     ["release", "primary"]
//!   ]
//! }
//! ```
//!
//! Pointer positions are device coordinates, so they go through the zoom
//! exactly like live input.

use crate::config::SharedConfig;
use crate::document::Document;
use crate::pixelmap::PixelMap;
use crate::tools::ToolType;
use crate::{Button, Color, ScrollDirection};
use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ActionValue {
    String(String),
    Number(f64),
    Integer(i64),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Script {
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub actions: Vec<Vec<ActionValue>>,
}

impl Script {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .with_context(|| format!("failed to read script {}", path.display()))?;
        Self::from_json(&json)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let script: Script = serde_json::from_str(json)?;
        if script.width == 0 || script.height == 0 {
            bail!("script size {}x{} is empty", script.width, script.height);
        }
        Ok(script)
    }
}

pub struct Replayer {
    document: Document,
}

impl Replayer {
    pub fn new(config: SharedConfig) -> Self {
        Self {
            document: Document::new(config),
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn into_document(self) -> Document {
        self.document
    }

    /// Resizes the document to the script size, then executes every action
    /// in order.
    pub fn run(&mut self, script: &Script) -> Result<()> {
        self.document.set_layout_size(script.width, script.height);

        for (index, action) in script.actions.iter().enumerate() {
            self.execute_action(action)
                .with_context(|| format!("action {} {:?}", index, action))?;
        }

        debug!(
            actions = script.actions.len(),
            frames = self.document.frame_count(),
            "script replayed"
        );
        Ok(())
    }

    /// Every history snapshot of the selected frame, oldest first.
    pub fn history_frames(&self) -> Vec<PixelMap> {
        self.document
            .current()
            .history()
            .snapshots()
            .map(|snapshot| snapshot.pixelmap().clone())
            .collect()
    }

    pub fn execute_action(&mut self, action: &[ActionValue]) -> Result<()> {
        if action.is_empty() {
            return Ok(());
        }

        let command = match &action[0] {
            ActionValue::String(s) => s.as_str(),
            _ => return Ok(()),
        };

        match command {
            "tool" => {
                let tool: ToolType = get_string(action, 1)?.parse()?;
                self.document.request_tool(tool);
            }
            "size" => {
                let size = get_number(action, 1)?;
                self.document.set_tool_size(size.clamp(0.0, u8::MAX as f64) as u8);
            }
            "color" => {
                let color: Color = get_string(action, 2)?.parse()?;
                match get_string(action, 1)? {
                    "primary" => self.document.set_primary_color(color),
                    "secondary" => self.document.set_secondary_color(color),
                    other => bail!("unknown color slot '{}'", other),
                }
            }
            "press" => {
                let button: Button = get_string(action, 1)?.parse()?;
                let (x, y) = (get_number(action, 2)?, get_number(action, 3)?);
                self.document.current_mut().button_press(button, x, y);
            }
            "motion" => {
                let (x, y) = (get_number(action, 1)?, get_number(action, 2)?);
                self.document.current_mut().motion(x, y);
            }
            "release" => {
                let button: Button = get_string(action, 1)?.parse()?;
                self.document.current_mut().button_release(button);
            }
            "undo" => self.document.undo(),
            "redo" => self.document.redo(),
            "zoom" => self.document.set_zoom(get_number(action, 1)?),
            "scroll" => {
                let direction = match get_string(action, 1)? {
                    "up" => ScrollDirection::Up,
                    "down" => ScrollDirection::Down,
                    other => bail!("unknown scroll direction '{}'", other),
                };
                self.document.current_mut().scroll(direction, true);
            }
            "resize" => {
                let (width, height) = (get_number(action, 1)?, get_number(action, 2)?);
                if width < 1.0 || height < 1.0 {
                    bail!("layout size {}x{} is empty", width, height);
                }
                self.document.set_layout_size(width as u32, height as u32);
            }
            "frame" => {
                let index = get_number(action, 1)?;
                if index < 0.0 || !self.document.select_frame(index as usize) {
                    bail!("no frame {}", index);
                }
            }
            "newFrame" => {
                let index = self.document.add_frame();
                self.document.select_frame(index);
            }
            _ => {
                warn!(command, "unknown command, skipping");
            }
        }

        Ok(())
    }
}

fn argument(action: &[ActionValue], index: usize) -> Result<&ActionValue> {
    action
        .get(index)
        .ok_or_else(|| anyhow!("missing argument {}", index))
}

fn get_number(action: &[ActionValue], index: usize) -> Result<f64> {
    match argument(action, index)? {
        ActionValue::Number(n) => Ok(*n),
        ActionValue::Integer(i) => Ok(*i as f64),
        value => bail!("expected number but got {:?}", value),
    }
}

fn get_string(action: &[ActionValue], index: usize) -> Result<&str> {
    match argument(action, index)? {
        ActionValue::String(s) => Ok(s.as_str()),
        value => bail!("expected string but got {:?}", value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CanvasConfig;

    fn replay(json: &str) -> Result<Replayer> {
        let script = Script::from_json(json)?;
        let mut config = CanvasConfig::new();
        config.set_zoom(100.0);
        let mut replayer = Replayer::new(config.shared());
        replayer.run(&script)?;
        Ok(replayer)
    }

    #[test]
    fn test_actions_parse_mixed_values() {
        let script = Script::from_json(
            r#"{"width": 4, "height": 2, "actions": [["press", "primary", 1.5, 0], ["undo"]]}"#,
        )
        .unwrap();

        assert_eq!(script.actions.len(), 2);
        assert_eq!(script.actions[0][0], ActionValue::String("press".to_string()));
        assert_eq!(script.actions[0][2], ActionValue::Number(1.5));
        assert!(Script::from_json(r#"{"width": 0, "height": 2}"#).is_err());
    }

    #[test]
    fn test_replay_rectangle_and_undo() {
        let replayer = replay(
            r##"{
                "width": 8, "height": 8,
                "actions": [
                    ["tool", "rectangle"],
                    ["color", "primary", "#ff0000"],
                    ["press", "primary", 0.5, 0.5],
                    ["motion", 3.5, 2.5],
                    ["release", "primary"],
                    ["tool", "pencil"],
                    ["press", "primary", 7.5, 7.5],
                    ["release", "primary"],
                    ["undo"]
                ]
            }"##,
        )
        .unwrap();

        let document = replayer.document();
        let map = document.current().pixelmap();
        assert_eq!(map.len(), 4 * 3 - 2);
        assert_eq!(map.get(1, 1), Color::new(1.0, 0.0, 0.0, 1.0));
        assert!(!map.has_pixel(8, 8));

        // empty, rectangle, pencil dot
        assert_eq!(replayer.history_frames().len(), 3);
    }

    #[test]
    fn test_replay_frames() {
        let replayer = replay(
            r#"{
                "width": 4, "height": 4,
                "actions": [
                    ["press", "primary", 0, 0], ["release", "primary"],
                    ["newFrame"],
                    ["press", "secondary", 3, 3], ["release", "secondary"],
                    ["frame", 0]
                ]
            }"#,
        )
        .unwrap();

        let document = replayer.into_document();
        assert_eq!(document.frame_count(), 2);
        assert_eq!(document.current_index(), 0);
        let maps = document.pixelmaps();
        assert_eq!(maps[0].get(1, 1), Color::BLACK);
        assert_eq!(maps[1].get(4, 4), Color::WHITE);
    }

    #[test]
    fn test_unknown_commands_are_skipped() {
        let replayer = replay(
            r#"{"width": 2, "height": 2, "actions": [[], [3], ["lasso", 1, 2], ["zoom", 400]]}"#,
        )
        .unwrap();
        assert_eq!(replayer.document().config().borrow().zoom(), 400.0);
    }

    #[test]
    fn test_malformed_arguments_fail() {
        for action in [
            r#"["press", "primary", 1]"#,
            r#"["tool", "lasso"]"#,
            r##"["color", "tertiary", "#000000"]"##,
            r#"["frame", 3]"#,
            r#"["motion", "left", 2]"#,
            r#"["resize", 0, 4]"#,
        ] {
            let json = format!(r#"{{"width": 2, "height": 2, "actions": [{action}]}}"#);
            assert!(replay(&json).is_err(), "{action}");
        }
    }
}
