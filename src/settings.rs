use std::path::{Path, PathBuf};

use crate::canvas::{Pixel, clamp_sprite_size};
use crate::components::preview::FrameRate;
use crate::components::tools::{MAX_BRUSH_SIZE, MIN_BRUSH_SIZE, color_to_str, parse_color};

const SETTINGS_FILE: &str = "pixelreel_settings.cfg";

/// Defaults for new projects and exports, persisted across sessions
#[derive(Clone, Debug, PartialEq)]
pub struct AppSettings {
    /// Edge length of a new sprite (clamped to 2–128)
    pub default_sprite_size: u32,
    /// Preview / export rate for new projects
    pub default_frame_rate: FrameRate,
    /// Draw color on startup and after a resize
    pub default_color: Pixel,
    pub default_brush_size: u32,
    /// Palette size per GIF frame (2–256)
    pub gif_max_colors: u16,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            default_sprite_size: 16,
            default_frame_rate: FrameRate::Fps1,
            default_color: image::Rgba([0, 0, 0, 255]),
            default_brush_size: 1,
            gif_max_colors: 256,
        }
    }
}

impl AppSettings {
    /// Path to the settings file.
    /// On Linux:   ~/.config/pixelreel/pixelreel_settings.cfg  (XDG_CONFIG_HOME respected)
    /// On Windows: %APPDATA%\PixelReel\pixelreel_settings.cfg
    /// On macOS:   ~/Library/Application Support/PixelReel/pixelreel_settings.cfg
    /// Fallback:   same directory as the executable.
    pub fn settings_path() -> Option<PathBuf> {
        #[cfg(target_os = "linux")]
        {
            let config_dir = std::env::var("XDG_CONFIG_HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|_| {
                    let home = std::env::var("HOME").unwrap_or_else(|_| "~".to_string());
                    PathBuf::from(home).join(".config")
                })
                .join("pixelreel");
            return Some(config_dir.join(SETTINGS_FILE));
        }
        #[cfg(target_os = "windows")]
        {
            let appdata = std::env::var("APPDATA").or_else(|_| std::env::var("USERPROFILE")).ok()?;
            return Some(PathBuf::from(appdata).join("PixelReel").join(SETTINGS_FILE));
        }
        #[cfg(target_os = "macos")]
        {
            let home = std::env::var("HOME").ok()?;
            return Some(
                PathBuf::from(home)
                    .join("Library")
                    .join("Application Support")
                    .join("PixelReel")
                    .join(SETTINGS_FILE),
            );
        }
        #[cfg(not(any(target_os = "linux", target_os = "windows", target_os = "macos")))]
        {
            std::env::current_exe().ok().and_then(|p| p.parent().map(|d| d.join(SETTINGS_FILE)))
        }
    }

    /// Load settings from disk (returns default if file missing or corrupt)
    pub fn load() -> Self {
        match Self::settings_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::parse(&content),
            Err(_) => Self::default(),
        }
    }

    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(path, self.to_config_string())
    }

    /// Parse `key=value` lines.  Unknown keys are skipped; bad values keep
    /// their defaults.
    pub fn parse(content: &str) -> Self {
        let mut s = Self::default();
        for line in content.lines() {
            let line = line.trim();
            if line.starts_with('#') {
                continue;
            }
            let Some((key, val)) = line.split_once('=') else { continue };
            let key = key.trim();
            let val = val.trim();
            match key {
                "default_sprite_size" => {
                    if let Ok(n) = val.parse::<u32>() {
                        s.default_sprite_size = clamp_sprite_size(n);
                    }
                }
                "default_frame_rate" => {
                    if let Some(rate) = val.parse().ok().and_then(FrameRate::from_fps) {
                        s.default_frame_rate = rate;
                    }
                }
                "default_color" => {
                    if let Some(c) = parse_color(val) {
                        s.default_color = c;
                    }
                }
                "default_brush_size" => {
                    if let Ok(n) = val.parse::<u32>() {
                        s.default_brush_size = n.clamp(MIN_BRUSH_SIZE, MAX_BRUSH_SIZE);
                    }
                }
                "gif_max_colors" => {
                    if let Ok(n) = val.parse::<u16>() {
                        s.gif_max_colors = n.clamp(2, 256);
                    }
                }
                _ => {}
            }
        }
        s
    }

    pub fn to_config_string(&self) -> String {
        format!(
            "default_sprite_size={}\n\
             default_frame_rate={}\n\
             default_color={}\n\
             default_brush_size={}\n\
             gif_max_colors={}\n",
            self.default_sprite_size,
            self.default_frame_rate.fps(),
            color_to_str(self.default_color),
            self.default_brush_size,
            self.gif_max_colors,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn empty_file_gives_defaults() {
        assert_eq!(AppSettings::parse(""), AppSettings::default());
    }

    #[test]
    fn parses_known_keys_and_skips_noise() {
        let s = AppSettings::parse(
            "# comment\n\
             default_sprite_size = 32\n\
             default_frame_rate=45\n\
             theme_mode=dark\n\
             default_color=10,20,30\n\
             default_brush_size=3\n\
             not a setting\n\
             gif_max_colors=64\n",
        );
        assert_eq!(s.default_sprite_size, 32);
        assert_eq!(s.default_frame_rate, FrameRate::Fps45);
        assert_eq!(s.default_color, Rgba([10, 20, 30, 255]));
        assert_eq!(s.default_brush_size, 3);
        assert_eq!(s.gif_max_colors, 64);
    }

    #[test]
    fn bad_values_fall_back_or_clamp() {
        let s = AppSettings::parse(
            "default_sprite_size=4096\n\
             default_frame_rate=24\n\
             default_color=red\n\
             default_brush_size=0\n\
             gif_max_colors=1\n",
        );
        assert_eq!(s.default_sprite_size, 128);
        assert_eq!(s.default_frame_rate, FrameRate::Fps1);
        assert_eq!(s.default_color, Rgba([0, 0, 0, 255]));
        assert_eq!(s.default_brush_size, 1);
        assert_eq!(s.gif_max_colors, 2);
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(SETTINGS_FILE);
        let s = AppSettings {
            default_sprite_size: 64,
            default_frame_rate: FrameRate::Fps30,
            default_color: Rgba([1, 2, 3, 4]),
            default_brush_size: 2,
            gif_max_colors: 128,
        };
        s.save_to(&path).unwrap();
        assert_eq!(AppSettings::load_from(&path), s);
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = AppSettings::load_from(&dir.path().join("absent.cfg"));
        assert_eq!(loaded, AppSettings::default());
    }
}
