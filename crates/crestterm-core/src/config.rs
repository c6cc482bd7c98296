use crate::Theme;

/// Host-supplied construction-time configuration (§3a, §6). Validated at
/// `app_create`: a malformed config is rejected with `InvalidConfig` rather
/// than silently clamped, since clamping a host's explicit configuration
/// would mask a host bug instead of surfacing it.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub cols: u16,
    pub rows: u16,
    pub font_size: f32,
    pub line_height_factor: f32,
    pub scale: f32,
    pub window_width: u32,
    pub window_height: u32,
    pub history_size: usize,
    pub font_families: Vec<String>,
    pub theme: Theme,
}

impl AppConfig {
    /// Structural validation only — this is not where we'd clamp values
    /// into range, since an out-of-range config is a host bug to surface,
    /// not paper over.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.cols == 0 || self.rows == 0 {
            return Err("cols and rows must be non-zero");
        }
        if self.font_size <= 0.0 {
            return Err("font_size must be positive");
        }
        if self.scale <= 0.0 {
            return Err("scale must be positive");
        }
        if self.font_families.is_empty() {
            return Err("at least one font family is required");
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cols: 80,
            rows: 24,
            font_size: 14.0,
            line_height_factor: 1.2,
            scale: 1.0,
            window_width: 960,
            window_height: 600,
            history_size: 10_000,
            font_families: vec!["monospace".to_string()],
            theme: Theme::default(),
        }
    }
}
