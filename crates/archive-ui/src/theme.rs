//! UI theme constants. A light, monochrome "archive" look.

use egui::{Color32, CornerRadius, Stroke, Vec2};

pub const BG_PRIMARY: Color32 = Color32::from_rgb(255, 255, 255);
pub const BG_SECONDARY: Color32 = Color32::from_rgb(249, 250, 251);
pub const BG_SURFACE: Color32 = Color32::from_rgb(243, 244, 246);
pub const BORDER: Color32 = Color32::from_rgb(229, 231, 235);
pub const TEXT_PRIMARY: Color32 = Color32::from_rgb(31, 41, 55);
pub const TEXT_STRONG: Color32 = Color32::from_rgb(0, 0, 0);
pub const TEXT_SECONDARY: Color32 = Color32::from_rgb(107, 114, 128);
pub const ACCENT: Color32 = Color32::from_rgb(17, 24, 39);
pub const ON_ACCENT: Color32 = Color32::from_rgb(255, 255, 255);
pub const SUCCESS: Color32 = Color32::from_rgb(22, 163, 74);
pub const ERROR: Color32 = Color32::from_rgb(220, 38, 38);
pub const ERROR_BG: Color32 = Color32::from_rgb(254, 242, 242);
pub const WARNING: Color32 = Color32::from_rgb(202, 138, 4);
pub const DRAFT_BG: Color32 = Color32::from_rgb(254, 252, 232);

pub const PANEL_ROUNDING: CornerRadius = CornerRadius::same(6);
pub const PANEL_PADDING: Vec2 = Vec2::new(12.0, 8.0);
pub const SIDEBAR_WIDTH: f32 = 260.0;

/// Apply the archive theme to an egui context
pub fn apply_theme(ctx: &egui::Context) {
    let mut style = (*ctx.style()).clone();

    style.visuals = egui::Visuals::light();
    style.visuals.panel_fill = BG_PRIMARY;
    style.visuals.window_fill = BG_PRIMARY;
    style.visuals.extreme_bg_color = BG_SECONDARY;
    style.visuals.window_stroke = Stroke::new(1.0, BORDER);

    style.visuals.widgets.noninteractive.bg_stroke = Stroke::new(1.0, BORDER);
    style.visuals.widgets.inactive.bg_fill = BG_SURFACE;
    style.visuals.widgets.inactive.fg_stroke = Stroke::new(1.0, TEXT_PRIMARY);
    style.visuals.widgets.hovered.bg_fill = BORDER;
    style.visuals.widgets.hovered.fg_stroke = Stroke::new(1.0, TEXT_STRONG);
    style.visuals.widgets.active.bg_fill = ACCENT;
    style.visuals.widgets.active.fg_stroke = Stroke::new(1.0, ON_ACCENT);

    style.visuals.selection.bg_fill = ACCENT.linear_multiply(0.15);
    style.visuals.selection.stroke = Stroke::new(1.0, ACCENT);

    style.spacing.item_spacing = Vec2::new(8.0, 6.0);

    ctx.set_style(style);
}
