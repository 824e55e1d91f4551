// ============================================================================
// APP SETTINGS — key=value file in the OS config directory
// ============================================================================

use std::path::PathBuf;

use crate::context::Rgb;
use crate::idea::{DEFAULT_API_KEY_ENV, DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_MODEL, DEFAULT_REQUEST_TIMEOUT_SECS};
use crate::surface::{Brush, ResizePolicy, DEFAULT_BRUSH_WIDTH};

const SETTINGS_FILE: &str = "heritagepromo_settings.cfg";

/// Application settings that persist across sessions
#[derive(Clone, Debug, PartialEq)]
pub struct AppSettings {
    /// Language code ("ko" or "en").  Empty string = auto-detect system language.
    pub language: String,
    /// Brush width the drawing view starts with.
    pub brush_width: u32,
    pub brush_color: Rgb,
    /// What happens to the drawing when the window is resized.
    pub resize_policy: ResizePolicy,

    // Idea generation
    pub idea_model: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,

    /// Preferred family for the caption baked into downloads (empty = system sans-serif).
    pub caption_font: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            language: String::new(),
            brush_width: DEFAULT_BRUSH_WIDTH,
            brush_color: Rgb::INK,
            resize_policy: ResizePolicy::Clear,
            idea_model: DEFAULT_MODEL.to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            caption_font: String::new(),
        }
    }
}

impl AppSettings {
    /// Path to the settings file.
    /// On Linux:   ~/.config/heritagepromo/heritagepromo_settings.cfg  (XDG_CONFIG_HOME respected)
    /// On Windows: %APPDATA%\HeritagePromo\heritagepromo_settings.cfg
    /// On macOS:   ~/Library/Application Support/HeritagePromo/heritagepromo_settings.cfg
    pub(crate) fn settings_path() -> Option<PathBuf> {
        #[cfg(target_os = "linux")]
        {
            let config_dir = std::env::var("XDG_CONFIG_HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|_| {
                    let home = std::env::var("HOME").unwrap_or_else(|_| "~".to_string());
                    PathBuf::from(home).join(".config")
                })
                .join("heritagepromo");
            let _ = std::fs::create_dir_all(&config_dir);
            return Some(config_dir.join(SETTINGS_FILE));
        }
        #[cfg(target_os = "windows")]
        {
            let appdata = std::env::var("APPDATA").or_else(|_| std::env::var("USERPROFILE")).ok()?;
            let config_dir = PathBuf::from(appdata).join("HeritagePromo");
            let _ = std::fs::create_dir_all(&config_dir);
            return Some(config_dir.join(SETTINGS_FILE));
        }
        #[cfg(target_os = "macos")]
        {
            let home = std::env::var("HOME").unwrap_or_else(|_| "~".to_string());
            let config_dir = PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join("HeritagePromo");
            let _ = std::fs::create_dir_all(&config_dir);
            return Some(config_dir.join(SETTINGS_FILE));
        }
        #[cfg(not(any(target_os = "linux", target_os = "windows", target_os = "macos")))]
        {
            std::env::current_exe().ok().and_then(|p| p.parent().map(|d| d.join(SETTINGS_FILE)))
        }
    }

    /// Brush the drawing view starts with.
    pub fn default_brush(&self) -> Brush {
        Brush::new(self.brush_color, self.brush_width)
    }

    /// Save settings to disk
    pub fn save(&self) {
        let Some(path) = Self::settings_path() else { return };
        if let Err(e) = std::fs::write(&path, self.to_config_string()) {
            log_warn!("Settings: could not write {}: {}", path.display(), e);
        }
    }

    /// Load settings from disk (returns default if file missing or corrupt)
    pub fn load() -> Self {
        let Some(path) = Self::settings_path() else { return Self::default() };
        let Ok(content) = std::fs::read_to_string(&path) else { return Self::default() };
        Self::parse(&content)
    }

    pub fn to_config_string(&self) -> String {
        let policy_str = match self.resize_policy {
            ResizePolicy::Clear => "clear",
            ResizePolicy::Preserve => "preserve",
        };
        format!(
            "language={}\n\
             brush_width={}\n\
             brush_color={}\n\
             resize_policy={policy_str}\n\
             idea_model={}\n\
             api_key_env={}\n\
             request_timeout_secs={}\n\
             connect_timeout_secs={}\n\
             caption_font={}\n",
            self.language,
            self.brush_width,
            self.brush_color.to_hex(),
            self.idea_model,
            self.api_key_env,
            self.request_timeout_secs,
            self.connect_timeout_secs,
            self.caption_font,
        )
    }

    /// Parse `key=value` lines.  Unknown keys and bad values keep defaults.
    pub fn parse(content: &str) -> Self {
        let mut s = Self::default();
        for line in content.lines() {
            let Some((key, val)) = line.split_once('=') else { continue };
            let val = val.trim();
            match key.trim() {
                "language" => {
                    s.language = match val {
                        "ko" | "en" => val.to_string(),
                        _ => String::new(),
                    };
                }
                "brush_width" => {
                    if let Ok(w) = val.parse::<u32>() {
                        s.brush_width = Brush::new(Rgb::INK, w).width;
                    }
                }
                "brush_color" => {
                    if let Ok(c) = Rgb::from_hex(val) {
                        s.brush_color = c;
                    }
                }
                "resize_policy" => {
                    s.resize_policy = match val {
                        "preserve" => ResizePolicy::Preserve,
                        _ => ResizePolicy::Clear,
                    };
                }
                "idea_model" if !val.is_empty() => s.idea_model = val.to_string(),
                "api_key_env" if !val.is_empty() => s.api_key_env = val.to_string(),
                "request_timeout_secs" => {
                    s.request_timeout_secs = val.parse().unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
                }
                "connect_timeout_secs" => {
                    s.connect_timeout_secs = val.parse().unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS);
                }
                "caption_font" => s.caption_font = val.to_string(),
                _ => {}
            }
        }
        s
    }
}
