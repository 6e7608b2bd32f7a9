//! Sidebar — mode switch and the file tree grouped by category.

use egui::{self, RichText, ScrollArea, Vec2};
use crate::state::{UiState, ViewMode};
use crate::theme::*;

pub enum SidebarAction {
    None,
    NewEntry,
}

/// Render the sidebar. `storage_label` names the backend shown in the footer.
pub fn sidebar_panel(ui: &mut egui::Ui, state: &mut UiState, storage_label: &str) -> SidebarAction {
    let mut action = SidebarAction::None;

    egui::Frame::default()
        .fill(BG_SECONDARY)
        .inner_margin(PANEL_PADDING)
        .show(ui, |ui| {
            ui.label(RichText::new("ARCHIVE").strong().size(18.0).color(TEXT_STRONG));
            ui.add_space(8.0);

            mode_button(ui, state, ViewMode::Chat, "Operations");
            mode_button(ui, state, ViewMode::KnowledgeBase, "Knowledge Base");

            ui.add_space(12.0);
            ui.horizontal(|ui| {
                ui.label(RichText::new("FILE SYSTEM").small().strong().color(TEXT_SECONDARY));
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui
                        .small_button("+")
                        .on_hover_text("New Entry")
                        .clicked()
                    {
                        action = SidebarAction::NewEntry;
                    }
                });
            });
            ui.separator();

            let mut clicked = None;
            ScrollArea::vertical()
                .max_height(ui.available_height() - 28.0)
                .auto_shrink([false, false])
                .show(ui, |ui| {
                    let selected = state.selected_document().map(|d| d.path.clone());
                    let show_selection = state.view_mode == ViewMode::KnowledgeBase;
                    for (category, docs) in state.grouped_documents() {
                        ui.add_space(4.0);
                        ui.label(RichText::new(category.to_uppercase()).small().color(TEXT_SECONDARY));
                        for doc in docs {
                            let is_selected = show_selection && selected.as_deref() == Some(doc.path.as_str());
                            let response = ui
                                .selectable_label(is_selected, doc.file_name())
                                .on_hover_text(&doc.path);
                            if response.clicked() {
                                clicked = Some(doc.path.clone());
                            }
                        }
                    }
                });
            if let Some(path) = clicked {
                state.select(&path);
            }

            ui.separator();
            ui.label(
                RichText::new(format!("SYNC: {}", storage_label.to_uppercase()))
                    .small()
                    .monospace()
                    .color(TEXT_SECONDARY),
            );
        });

    action
}

fn mode_button(ui: &mut egui::Ui, state: &mut UiState, mode: ViewMode, label: &str) {
    let active = state.view_mode == mode;
    let (fill, color) = if active { (ACCENT, ON_ACCENT) } else { (BG_SECONDARY, TEXT_PRIMARY) };
    let button = egui::Button::new(RichText::new(label).color(color))
        .fill(fill)
        .corner_radius(PANEL_ROUNDING)
        .min_size(Vec2::new(ui.available_width(), 28.0));
    if ui.add(button).clicked() {
        state.view_mode = mode;
    }
}
