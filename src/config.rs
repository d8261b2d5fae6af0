//! Viewer configuration.
//!
//! Everything has a default matching the stock showroom. A few settings can be overridden
//! through environment variables:
//!
//! - `SHOWROOM_MODEL`: model path, absolute or relative to the asset directory
//! - `SHOWROOM_LOCALE`: `en` or `zh`
//! - `SHOWROOM_CJK_FONT`: a TTF/OTF font with CJK glyphs, needed for `zh`

use std::path::PathBuf;

use crate::{data_structures::scene_graph::Color, gui::labels::Locale, scene::normalizer};

#[derive(Clone, Debug, PartialEq)]
pub struct ViewerConfig {
    pub model_path: PathBuf,
    pub window_title: String,
    pub locale: Locale,
    pub cjk_font: Option<PathBuf>,
    /// Largest extent of the model after normalization.
    pub target_size: f32,
    pub body_color: Color,
    pub clear_colour: wgpu::Color,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models").join("car.glb"),
            window_title: "Showroom".to_string(),
            locale: Locale::English,
            cjk_font: None,
            target_size: normalizer::TARGET_SIZE,
            body_color: Color::from_hex(0xff0000),
            clear_colour: wgpu::Color::BLACK,
        }
    }
}

impl ViewerConfig {
    /// Defaults with overrides from the process environment.
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`, which maps a variable name to its value.
    ///
    /// Unparsable values are logged and ignored.
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(model) = lookup("SHOWROOM_MODEL").filter(|v| !v.is_empty()) {
            self.model_path = PathBuf::from(model);
        }
        if let Some(locale) = lookup("SHOWROOM_LOCALE") {
            match locale.parse() {
                Ok(locale) => self.locale = locale,
                Err(e) => log::warn!("ignoring SHOWROOM_LOCALE: {e}"),
            }
        }
        if let Some(font) = lookup("SHOWROOM_CJK_FONT").filter(|v| !v.is_empty()) {
            self.cjk_font = Some(PathBuf::from(font));
        }
        self
    }
}
