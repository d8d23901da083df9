use crate::session::storage::Storage;
use eframe::egui::{self, Color32, CornerRadius, FontId, Frame, Margin, Stroke, TextStyle};
use serde::{Deserialize, Serialize};

pub const THEME_KEY: &str = "theme";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    #[default]
    Dark,
    Light,
}

impl ThemeMode {
    pub fn toggled(self) -> Self {
        match self {
            Self::Dark => Self::Light,
            Self::Light => Self::Dark,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Dark => "Light mode",
            Self::Light => "Dark mode",
        }
    }
}

/// Reads the saved preference, falling back when absent or unreadable.
pub fn load_mode(storage: &dyn Storage, fallback: ThemeMode) -> ThemeMode {
    match storage.read(THEME_KEY) {
        Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|err| {
            tracing::warn!("ignoring saved theme: {err}");
            fallback
        }),
        Ok(None) => fallback,
        Err(err) => {
            tracing::warn!("failed to read saved theme: {err}");
            fallback
        }
    }
}

pub fn save_mode(storage: &mut dyn Storage, mode: ThemeMode) {
    let raw = match serde_json::to_string(&mode) {
        Ok(raw) => raw,
        Err(err) => {
            tracing::warn!("failed to encode theme: {err}");
            return;
        }
    };
    if let Err(err) = storage.write(THEME_KEY, &raw) {
        tracing::warn!("failed to save theme: {err}");
    }
}

#[derive(Debug, Clone)]
pub struct Theme {
    pub mode: ThemeMode,
    pub surface_0: Color32,
    pub surface_1: Color32,
    pub surface_2: Color32,
    pub surface_3: Color32,
    pub accent_primary: Color32,
    pub accent_muted: Color32,
    pub danger: Color32,
    pub danger_tint: Color32,
    pub text_primary: Color32,
    pub text_muted: Color32,
    pub text_on_accent: Color32,
    pub user_bubble: Color32,
    pub assistant_bubble: Color32,
    pub code_fill: Color32,
    pub math_text: Color32,
    pub border_subtle: Color32,
    pub spacing_4: f32,
    pub spacing_8: f32,
    pub spacing_12: f32,
    pub spacing_16: f32,
    pub radius_8: u8,
    pub radius_12: u8,
}

impl Default for Theme {
    fn default() -> Self {
        Self::for_mode(ThemeMode::Dark)
    }
}

impl Theme {
    pub const R8: u8 = 8;
    pub const R12: u8 = 12;
    pub const P8: f32 = 8.0;
    pub const P12: f32 = 12.0;
    pub const P16: f32 = 16.0;

    pub fn for_mode(mode: ThemeMode) -> Self {
        match mode {
            ThemeMode::Dark => Self::dark(),
            ThemeMode::Light => Self::light(),
        }
    }

    fn dark() -> Self {
        Self {
            mode: ThemeMode::Dark,
            surface_0: Color32::from_rgb(0x0F, 0x11, 0x15),
            surface_1: Color32::from_rgb(0x16, 0x1A, 0x20),
            surface_2: Color32::from_rgb(0x1C, 0x22, 0x2B),
            surface_3: Color32::from_rgb(0x22, 0x2A, 0x35),
            accent_primary: Color32::from_rgb(0x63, 0x66, 0xF1),
            accent_muted: Color32::from_rgb(0x4F, 0x46, 0xE5),
            danger: Color32::from_rgb(0xEF, 0x44, 0x44),
            danger_tint: Color32::from_rgba_premultiplied(239, 68, 68, 38),
            text_primary: Color32::from_rgb(0xE6, 0xED, 0xF3),
            text_muted: Color32::from_rgb(0x8B, 0x94, 0x9E),
            text_on_accent: Color32::from_rgb(0xF8, 0xFB, 0xFF),
            user_bubble: Color32::from_rgb(0x31, 0x2E, 0x81),
            assistant_bubble: Color32::from_rgb(0x1C, 0x22, 0x2B),
            code_fill: Color32::from_rgb(0x0B, 0x0D, 0x11),
            math_text: Color32::from_rgb(0xA5, 0xB4, 0xFC),
            border_subtle: Color32::from_rgba_premultiplied(255, 255, 255, 13),
            spacing_4: 4.0,
            spacing_8: Self::P8,
            spacing_12: Self::P12,
            spacing_16: Self::P16,
            radius_8: Self::R8,
            radius_12: Self::R12,
        }
    }

    fn light() -> Self {
        Self {
            mode: ThemeMode::Light,
            surface_0: Color32::from_rgb(0xF3, 0xF4, 0xF6),
            surface_1: Color32::from_rgb(0xFF, 0xFF, 0xFF),
            surface_2: Color32::from_rgb(0xF1, 0xF5, 0xF9),
            surface_3: Color32::from_rgb(0xE2, 0xE8, 0xF0),
            accent_primary: Color32::from_rgb(0x4F, 0x46, 0xE5),
            accent_muted: Color32::from_rgb(0x63, 0x66, 0xF1),
            danger: Color32::from_rgb(0xDC, 0x26, 0x26),
            danger_tint: Color32::from_rgba_premultiplied(220, 38, 38, 26),
            text_primary: Color32::from_rgb(0x11, 0x18, 0x27),
            text_muted: Color32::from_rgb(0x6B, 0x72, 0x80),
            text_on_accent: Color32::from_rgb(0xFF, 0xFF, 0xFF),
            user_bubble: Color32::from_rgb(0xE0, 0xE7, 0xFF),
            assistant_bubble: Color32::from_rgb(0xF1, 0xF5, 0xF9),
            code_fill: Color32::from_rgb(0x1F, 0x29, 0x37),
            math_text: Color32::from_rgb(0x43, 0x38, 0xCA),
            border_subtle: Color32::from_rgba_premultiplied(0, 0, 0, 20),
            spacing_4: 4.0,
            spacing_8: Self::P8,
            spacing_12: Self::P12,
            spacing_16: Self::P16,
            radius_8: Self::R8,
            radius_12: Self::R12,
        }
    }

    pub fn apply_visuals(&self, ctx: &egui::Context) {
        let mut visuals = match self.mode {
            ThemeMode::Dark => egui::Visuals::dark(),
            ThemeMode::Light => egui::Visuals::light(),
        };
        visuals.panel_fill = self.surface_1;
        visuals.override_text_color = Some(self.text_primary);
        visuals.widgets.noninteractive.bg_fill = self.surface_2;
        visuals.widgets.noninteractive.weak_bg_fill = self.surface_2;
        visuals.widgets.noninteractive.bg_stroke = Stroke::NONE;
        visuals.widgets.inactive.bg_fill = self.surface_2;
        visuals.widgets.inactive.weak_bg_fill = self.surface_2;
        visuals.widgets.inactive.bg_stroke = Stroke::NONE;
        visuals.widgets.hovered.bg_fill = self.surface_3;
        visuals.widgets.hovered.weak_bg_fill = self.surface_3;
        visuals.widgets.active.bg_fill = self.accent_muted;
        visuals.widgets.active.weak_bg_fill = self.accent_muted;
        visuals.selection.bg_fill = self.accent_muted;
        visuals.hyperlink_color = self.accent_primary;
        visuals.window_fill = self.surface_1;
        visuals.window_corner_radius = CornerRadius::same(self.radius_12);
        visuals.extreme_bg_color = self.surface_0;

        let mut style = (*ctx.style()).clone();
        style.visuals = visuals;
        style.spacing.item_spacing = egui::vec2(10.0, 10.0);
        style.spacing.button_padding = egui::vec2(12.0, 8.0);
        style.text_styles.insert(TextStyle::Heading, FontId::proportional(17.0));
        style.text_styles.insert(TextStyle::Body, FontId::proportional(14.0));
        style.text_styles.insert(TextStyle::Monospace, FontId::monospace(13.0));
        style.text_styles.insert(TextStyle::Small, FontId::proportional(12.0));
        ctx.set_style(style);
    }

    pub fn bubble_frame(&self, fill: Color32) -> Frame {
        Frame::new()
            .fill(fill)
            .inner_margin(Margin::same(self.spacing_12 as i8))
            .corner_radius(CornerRadius::same(self.radius_12))
            .stroke(Stroke::new(1.0, self.border_subtle))
    }

    pub fn error_frame(&self) -> Frame {
        Frame::new()
            .fill(self.danger_tint)
            .inner_margin(Margin::same(self.spacing_12 as i8))
            .corner_radius(CornerRadius::same(self.radius_12))
            .stroke(Stroke::new(1.0, self.danger))
    }

    pub fn code_frame(&self) -> Frame {
        Frame::new()
            .fill(self.code_fill)
            .inner_margin(Margin::same(self.spacing_8 as i8))
            .corner_radius(CornerRadius::same(self.radius_8))
    }

    pub fn composer_frame(&self) -> Frame {
        Frame::new()
            .fill(self.surface_2)
            .inner_margin(Margin::symmetric(self.spacing_12 as i8, 10))
            .corner_radius(CornerRadius::same(self.radius_12))
            .stroke(Stroke::NONE)
    }
}
