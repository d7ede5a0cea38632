use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::*;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasBounds {
    pub width: f32,
    pub height: f32,
}

impl Default for CanvasBounds {
    fn default() -> Self {
        Self {
            width: DEFAULT_CANVAS_WIDTH,
            height: DEFAULT_CANVAS_HEIGHT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GridSettings {
    pub snap_to_grid: bool,
    pub size: f32,
    pub visible: bool,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            snap_to_grid: false,
            size: DEFAULT_GRID_SIZE,
            visible: true,
        }
    }
}

/// Editor settings. Every field is optional in a config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorConfig {
    pub canvas: CanvasBounds,
    pub grid: GridSettings,
    pub history_limit: usize,
    pub theme: String,
    pub zoom: f32,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            canvas: CanvasBounds::default(),
            grid: GridSettings::default(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            theme: DEFAULT_THEME.to_string(),
            zoom: 1.0,
        }
    }
}

impl EditorConfig {
    pub fn from_json(source: &str) -> Result<Self> {
        let config: EditorConfig = serde_json::from_str(source)
            .map_err(|err| EditorError::validation(format!("failed to parse config: {err}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path).map_err(|err| {
            EditorError::validation(format!("failed to read '{}': {err}", path.display()))
        })?;
        Self::from_json(&source)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.canvas.width > 0.0 && self.canvas.height > 0.0) {
            return Err(EditorError::validation(
                "canvas width and height must be positive",
            ));
        }
        if !(self.grid.size > 0.0) {
            return Err(EditorError::validation("grid size must be positive"));
        }
        if self.history_limit == 0 {
            return Err(EditorError::validation(
                "history limit must keep at least one snapshot",
            ));
        }
        if !(MIN_ZOOM..=MAX_ZOOM).contains(&self.zoom) {
            return Err(EditorError::validation(format!(
                "zoom must be between {MIN_ZOOM} and {MAX_ZOOM}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let config =
            EditorConfig::from_json(r#"{ "grid": { "snapToGrid": true, "size": 10 } }"#)
                .unwrap();
        assert!(config.grid.snap_to_grid);
        assert_eq!(config.grid.size, 10.0);
        assert!(config.grid.visible);
        assert_eq!(config.canvas, CanvasBounds::default());
        assert_eq!(config.history_limit, DEFAULT_HISTORY_LIMIT);
        assert_eq!(config.theme, "light");
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(EditorConfig::from_json(r#"{ "historyLimit": 0 }"#).is_err());
        assert!(EditorConfig::from_json(r#"{ "zoom": 10 }"#).is_err());
        assert!(EditorConfig::from_json(r#"{ "canvas": { "width": 0, "height": 10 } }"#).is_err());
        assert!(EditorConfig::from_json("not json").is_err());
    }
}
