//! Settings panel — model provider, API key, storage backend.
//! Edits a working copy; nothing is applied until Save is clicked.

use egui::{self, RichText, Vec2};
use archive_types::config::{ArchiveConfig, ModelProvider, StorageBackendType};
use crate::theme::*;

/// What the caller should do after rendering the settings panel
pub enum SettingsAction {
    /// Nothing changed
    None,
    /// A field was edited in the working copy
    Changed,
    /// The user clicked the explicit Save button
    SaveClicked,
}

/// Save feedback passed in from the app layer
#[derive(Clone)]
pub struct SaveFeedback {
    pub message: String,
    pub success: bool,
}

/// Render the settings panel. Returns an action for the caller to handle.
pub fn settings_panel(
    ui: &mut egui::Ui,
    config: &mut ArchiveConfig,
    save_feedback: Option<&SaveFeedback>,
) -> SettingsAction {
    let mut changed = false;
    let mut save_clicked = false;

    egui::Frame::default()
        .fill(BG_SECONDARY)
        .inner_margin(PANEL_PADDING)
        .corner_radius(PANEL_ROUNDING)
        .show(ui, |ui| {
            ui.heading(RichText::new("Settings").color(TEXT_STRONG));
            ui.separator();

            // ── Model Section ────────────────────────────────
            ui.label(RichText::new("Model").color(ACCENT).strong());
            ui.add_space(2.0);

            ui.label(RichText::new("Provider").color(TEXT_SECONDARY).small());
            let previous = config.model.provider;
            egui::ComboBox::from_id_salt("model_provider")
                .selected_text(config.model.provider.label())
                .show_ui(ui, |ui| {
                    for p in ModelProvider::all() {
                        ui.selectable_value(&mut config.model.provider, *p, p.label());
                    }
                });
            if config.model.provider != previous {
                apply_provider_defaults(config, previous);
                changed = true;
            }

            ui.add_space(4.0);

            ui.label(RichText::new("Model name").color(TEXT_SECONDARY).small());
            if ui.text_edit_singleline(&mut config.model.model).changed() {
                changed = true;
            }

            ui.add_space(4.0);

            // API Key (masked)
            ui.label(RichText::new("API Key").color(TEXT_SECONDARY).small());
            let api_key_edit = egui::TextEdit::singleline(&mut config.model.api_key)
                .password(true)
                .hint_text("Required");
            if ui.add(api_key_edit).changed() {
                changed = true;
            }

            ui.add_space(4.0);

            ui.label(RichText::new("API Base URL (optional)").color(TEXT_SECONDARY).small());
            let mut base_url = config.model.api_base.clone().unwrap_or_default();
            if ui
                .add(
                    egui::TextEdit::singleline(&mut base_url)
                        .hint_text(config.model.provider.default_base_url()),
                )
                .changed()
            {
                config.model.api_base = if base_url.is_empty() {
                    None
                } else {
                    Some(base_url)
                };
                changed = true;
            }

            ui.add_space(4.0);

            ui.label(RichText::new("Temperature").color(TEXT_SECONDARY).small());
            if ui
                .add(egui::Slider::new(&mut config.model.temperature, 0.0..=2.0))
                .changed()
            {
                changed = true;
            }

            ui.label(RichText::new("Max Tokens").color(TEXT_SECONDARY).small());
            if ui
                .add(egui::Slider::new(&mut config.model.max_tokens, 256..=32768))
                .changed()
            {
                changed = true;
            }

            ui.label(RichText::new("File operations per request").color(TEXT_SECONDARY).small());
            if ui
                .add(egui::Slider::new(&mut config.max_tool_rounds, 1..=10))
                .changed()
            {
                changed = true;
            }

            ui.add_space(12.0);
            ui.separator();
            ui.add_space(4.0);

            // ── Storage Section ──────────────────────────────
            ui.label(RichText::new("Storage").color(ACCENT).strong());
            ui.add_space(2.0);

            ui.label(RichText::new("Backend").color(TEXT_SECONDARY).small());
            egui::ComboBox::from_id_salt("storage_backend")
                .selected_text(storage_label(&config.storage.backend))
                .show_ui(ui, |ui| {
                    for backend in [
                        StorageBackendType::Auto,
                        StorageBackendType::LocalStorage,
                        StorageBackendType::Memory,
                    ] {
                        if ui
                            .selectable_value(&mut config.storage.backend, backend, storage_label(&backend))
                            .changed()
                        {
                            changed = true;
                        }
                    }
                });

            ui.add_space(4.0);
            ui.label(
                RichText::new(storage_description(&config.storage.backend))
                    .color(TEXT_SECONDARY)
                    .small()
                    .italics(),
            );

            // ── Save Button ──────────────────────────────────
            ui.add_space(16.0);
            ui.separator();
            ui.add_space(8.0);

            ui.horizontal(|ui| {
                let btn = ui.add(
                    egui::Button::new(RichText::new("Save Settings").color(ON_ACCENT).strong())
                        .fill(ACCENT)
                        .corner_radius(PANEL_ROUNDING)
                        .min_size(Vec2::new(120.0, 28.0)),
                );
                if btn.clicked() {
                    save_clicked = true;
                }

                if let Some(fb) = save_feedback {
                    let color = if fb.success { SUCCESS } else { ERROR };
                    ui.label(RichText::new(&fb.message).color(color).small());
                }
            });
        });

    if save_clicked {
        SettingsAction::SaveClicked
    } else if changed {
        SettingsAction::Changed
    } else {
        SettingsAction::None
    }
}

/// Switching provider replaces the model name when it was the old
/// provider's default (or empty).
pub fn apply_provider_defaults(config: &mut ArchiveConfig, previous: ModelProvider) {
    let model = config.model.model.trim();
    if model.is_empty() || model == previous.default_model() {
        config.model.model = config.model.provider.default_model().to_string();
    }
}

pub fn storage_label(backend: &StorageBackendType) -> &'static str {
    match backend {
        StorageBackendType::Auto => "Auto-detect",
        StorageBackendType::Memory => "Memory",
        StorageBackendType::LocalStorage => "localStorage",
    }
}

fn storage_description(backend: &StorageBackendType) -> &'static str {
    match backend {
        StorageBackendType::Auto => "Uses browser localStorage when available, otherwise Memory.",
        StorageBackendType::Memory => "Fast but volatile. The archive resets to the defaults on page reload.",
        StorageBackendType::LocalStorage => "Persistent browser storage. The archive survives page reloads.",
    }
}
