use crate::error::Result;
use crate::monitor::PollStrategy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

const CONFIG_ENV: &str = "SPACES_ALT_TAB_CONFIG";
const RELATIVE_CONFIG_PATH: &str = "spaces-alt-tab/config.json";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ShowOnScreen {
    Main,
    #[default]
    MouseHovered,
    ActiveWindow,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AlignThumbnails {
    Left,
    #[default]
    Center,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SpacesToShow {
    #[default]
    All,
    Current,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScreensToShow {
    #[default]
    All,
    ShowingPicker,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BlacklistMode {
    #[default]
    Always,
    WhenNoTitle,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BlacklistEntry {
    pub app: String,
    #[serde(default)]
    pub hide: BlacklistMode,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Appearance {
    /// Percent of the screen the panel may cover.
    pub max_screen_usage: f64,
    pub min_cells_per_row: usize,
    pub max_cells_per_row: usize,
    pub rows_count: usize,
    pub icon_size: f64,
    pub font_height: f64,
    pub show_on_screen: ShowOnScreen,
    pub align_thumbnails: AlignThumbnails,
    pub window_display_delay_ms: u64,
    pub hide_space_number_labels: bool,
}

impl Default for Appearance {
    fn default() -> Self {
        Self {
            max_screen_usage: 80.0,
            min_cells_per_row: 5,
            max_cells_per_row: 10,
            rows_count: 4,
            icon_size: 32.0,
            font_height: 15.0,
            show_on_screen: ShowOnScreen::default(),
            align_thumbnails: AlignThumbnails::default(),
            window_display_delay_ms: 0,
            hide_space_number_labels: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Filters {
    pub spaces_to_show: SpacesToShow,
    pub screens_to_show: ScreensToShow,
    pub show_minimized: bool,
    pub show_hidden: bool,
    pub blacklist: Vec<BlacklistEntry>,
}

impl Default for Filters {
    fn default() -> Self {
        Self {
            spaces_to_show: SpacesToShow::default(),
            screens_to_show: ScreensToShow::default(),
            show_minimized: true,
            show_hidden: true,
            blacklist: Vec::new(),
        }
    }
}

impl Filters {
    pub fn blacklist_mode(&self, app_name: &str) -> Option<BlacklistMode> {
        self.blacklist
            .iter()
            .find(|entry| entry.app.eq_ignore_ascii_case(app_name))
            .map(|entry| entry.hide)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Polling {
    pub min_interval_ms: u64,
    pub max_interval_ms: u64,
    pub strategy: PollStrategy,
}

impl Default for Polling {
    fn default() -> Self {
        Self {
            min_interval_ms: 50,
            max_interval_ms: 1200,
            strategy: PollStrategy::default(),
        }
    }
}

impl Polling {
    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }

    pub fn max_interval(&self) -> Duration {
        Duration::from_millis(self.max_interval_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Preferences {
    pub appearance: Appearance,
    pub filters: Filters,
    pub polling: Polling,
}

impl Preferences {
    pub fn from_json(contents: &str) -> Result<Self> {
        let prefs: Preferences = serde_json::from_str(contents)?;
        Ok(prefs.sanitized())
    }

    /// Clamp every value into the range the preferences UI allows.
    pub fn sanitized(mut self) -> Self {
        let a = &mut self.appearance;
        a.max_screen_usage = a.max_screen_usage.clamp(10.0, 100.0);
        a.min_cells_per_row = a.min_cells_per_row.clamp(1, 20);
        a.max_cells_per_row = a.max_cells_per_row.clamp(1, 40).max(a.min_cells_per_row);
        a.rows_count = a.rows_count.clamp(1, 20);
        a.icon_size = a.icon_size.clamp(0.0, 64.0);
        a.font_height = a.font_height.clamp(0.0, 64.0);
        a.window_display_delay_ms = a.window_display_delay_ms.min(2000);

        let p = &mut self.polling;
        p.min_interval_ms = p.min_interval_ms.max(10);
        p.max_interval_ms = p.max_interval_ms.max(p.min_interval_ms);
        self
    }

    pub fn window_display_delay(&self) -> Duration {
        Duration::from_millis(self.appearance.window_display_delay_ms)
    }
}

pub fn load_preferences() -> Preferences {
    for path in config_paths() {
        let Ok(contents) = fs::read_to_string(&path) else {
            continue;
        };
        match Preferences::from_json(&contents) {
            Ok(prefs) => {
                debug!(target: "alt_tab::config", path = %path.display(), "loaded preferences");
                return prefs;
            }
            Err(error) => {
                warn!(target: "alt_tab::config", path = %path.display(), %error, "failed to parse preferences");
            }
        }
    }
    debug!(target: "alt_tab::config", "using default preferences");
    Preferences::default()
}

/// Where `--settings` opens the file; the first candidate that exists, else
/// the preferred location.
pub fn preferences_path() -> Option<PathBuf> {
    let paths = config_paths();
    paths
        .iter()
        .find(|p| p.is_file())
        .or_else(|| paths.first())
        .cloned()
}

pub fn ensure_preferences_file() -> Result<Option<PathBuf>> {
    let Some(path) = preferences_path() else {
        return Ok(None);
    };
    if !path.is_file() {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let defaults = serde_json::to_string_pretty(&Preferences::default())?;
        fs::write(&path, defaults)?;
        info!(target: "alt_tab::config", path = %path.display(), "wrote default preferences");
    }
    Ok(Some(path))
}

fn config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Ok(explicit) = std::env::var(CONFIG_ENV) {
        if !explicit.trim().is_empty() {
            paths.push(PathBuf::from(explicit.trim()));
        }
    }

    let mut roots = Vec::new();
    if let Some(config_dir) = dirs::config_dir() {
        roots.push(config_dir);
    }
    if let Ok(home) = std::env::var("HOME") {
        if !home.trim().is_empty() {
            roots.push(PathBuf::from(home).join(".config"));
        }
    }

    for root in roots {
        let candidate = root.join(RELATIVE_CONFIG_PATH);
        if !paths.contains(&candidate) {
            paths.push(candidate);
        }
    }

    paths
}
