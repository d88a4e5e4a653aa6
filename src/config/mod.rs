use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// What happens when a second pointer-down arrives while a lot is already
/// being dragged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SecondPressPolicy {
    #[default]
    Ignore,      // first gesture wins
    Restart,     // drop the running gesture, start the new one
}

pub const MIN_DAY_WIDTH: f32 = 6.0;
pub const MAX_DAY_WIDTH: f32 = 80.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub demo_mode: bool,
    #[serde(default = "default_font_scale")]
    pub font_scale: f32,
    #[serde(default = "default_day_width")]
    pub day_width: f32,
    #[serde(default = "default_look_back")]
    pub look_back_months: u32,
    #[serde(default = "default_look_ahead")]
    pub look_ahead_months: u32,
    #[serde(default = "default_quick_add_days")]
    pub quick_add_days: i64,
    #[serde(default = "default_resize_handle")]
    pub resize_handle_px: f32,
    #[serde(default)]
    pub second_press: SecondPressPolicy,
}

fn default_font_scale() -> f32 {
    1.0
}

fn default_day_width() -> f32 {
    24.0
}

fn default_look_back() -> u32 {
    1
}

fn default_look_ahead() -> u32 {
    2
}

fn default_quick_add_days() -> i64 {
    14
}

fn default_resize_handle() -> f32 {
    8.0
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: String::new(),
            api_key: None,
            project_id: None,
            demo_mode: false,
            font_scale: 1.0,
            day_width: default_day_width(),
            look_back_months: default_look_back(),
            look_ahead_months: default_look_ahead(),
            quick_add_days: default_quick_add_days(),
            resize_handle_px: default_resize_handle(),
            second_press: SecondPressPolicy::Ignore,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let contents = fs::read_to_string(&config_path)
                .context("Failed to read config file")?;
            let config: Config = serde_json::from_str(&contents)
                .context("Failed to parse config file")?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config.sanitized())
        } else {
            Ok(Config::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        // Ensure directory exists
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .context("Failed to create config directory")?;
        }

        let contents = serde_json::to_string_pretty(self)?;
        fs::write(&config_path, contents)
            .context("Failed to write config file")?;
        log::debug!("Saved config to {}", config_path.display());

        Ok(())
    }

    /// Either a backend is set up or the user chose demo mode
    pub fn is_configured(&self) -> bool {
        self.demo_mode || (!self.backend_url.trim().is_empty() && self.api_key.is_some())
    }

    /// Clamp hand-edited values back into ranges the timeline can work with
    pub fn sanitized(mut self) -> Self {
        if !self.day_width.is_finite() {
            self.day_width = default_day_width();
        }
        self.day_width = self.day_width.clamp(MIN_DAY_WIDTH, MAX_DAY_WIDTH);
        self.quick_add_days = self.quick_add_days.clamp(0, 365);
        self.look_back_months = self.look_back_months.min(12);
        self.look_ahead_months = self.look_ahead_months.min(24);
        if !self.resize_handle_px.is_finite() || self.resize_handle_px < 0.0 {
            self.resize_handle_px = default_resize_handle();
        }
        self
    }

    fn config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "lotline", "lotline")
            .context("Could not determine config directory")?;
        Ok(proj_dirs.config_dir().join("config.json"))
    }

    pub fn rest_url(&self) -> String {
        // Accept "project.supabase.co", "https://project.supabase.co/" or a full REST URL
        let url = self.backend_url
            .trim()
            .trim_end_matches('/')
            .trim_end_matches("/rest/v1");
        if url.starts_with("http://") || url.starts_with("https://") {
            format!("{}/rest/v1", url)
        } else {
            format!("https://{}/rest/v1", url)
        }
    }
}
