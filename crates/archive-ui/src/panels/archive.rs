//! Knowledge base panel — document viewer and editor.

use egui::{self, Align, Layout, RichText, ScrollArea, Vec2};
use archive_types::document::DocumentPatch;
use crate::panels::markdown;
use crate::state::UiState;
use crate::theme::*;

pub enum ArchiveAction {
    /// Apply `patch` to the document at `path`
    Save { path: String, patch: DocumentPatch },
    /// Delete was confirmed for `path`
    Delete(String),
}

pub fn archive_panel(ui: &mut egui::Ui, state: &mut UiState) -> Option<ArchiveAction> {
    let mut action = None;

    egui::Frame::default()
        .fill(BG_PRIMARY)
        .inner_margin(PANEL_PADDING)
        .show(ui, |ui| {
            if state.edit.is_some() {
                action = editor(ui, state);
            } else {
                viewer(ui, state);
            }
        });

    if let Some(path) = state.pending_delete.clone() {
        let mut confirmed = false;
        let mut dismissed = false;
        egui::Window::new("Delete entry")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, Vec2::ZERO)
            .show(ui.ctx(), |ui| {
                ui.label(format!("Are you sure you want to delete {}?", path));
                ui.add_space(8.0);
                ui.horizontal(|ui| {
                    if ui.button(RichText::new("Delete").color(ERROR)).clicked() {
                        confirmed = true;
                    }
                    if ui.button("Keep").clicked() {
                        dismissed = true;
                    }
                });
            });
        if confirmed {
            action = state.confirm_delete().map(ArchiveAction::Delete);
        } else if dismissed {
            state.pending_delete = None;
        }
    }

    action
}

fn viewer(ui: &mut egui::Ui, state: &mut UiState) {
    let Some(doc) = state.selected_document() else {
        ui.add_space(24.0);
        ui.vertical_centered(|ui| {
            ui.label(RichText::new("No archives found. Create a new entry.").color(TEXT_SECONDARY));
        });
        return;
    };

    let mut edit_clicked = false;
    ui.horizontal(|ui| {
        ui.vertical(|ui| {
            ui.label(RichText::new(&doc.path).monospace().color(TEXT_STRONG));
            ui.label(
                RichText::new(format!("UPDATED: {}", doc.last_updated))
                    .small()
                    .color(TEXT_SECONDARY),
            );
        });
        ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
            if ui.button("EDIT").clicked() {
                edit_clicked = true;
            }
        });
    });
    ui.separator();

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui| markdown::render(ui, &doc.content));

    if edit_clicked {
        state.begin_edit();
    }
}

fn editor(ui: &mut egui::Ui, state: &mut UiState) -> Option<ArchiveAction> {
    let mut save = false;
    let mut cancel = false;
    let mut delete = None;

    if let Some(form) = state.edit.as_mut() {
        ui.horizontal(|ui| {
            ui.add(
                egui::TextEdit::singleline(&mut form.category)
                    .hint_text("Category")
                    .desired_width(140.0),
            );
            ui.add(
                egui::TextEdit::singleline(&mut form.path)
                    .hint_text("Path (e.g., /Bio/Me.md)")
                    .font(egui::TextStyle::Monospace)
                    .desired_width(ui.available_width()),
            );
        });
        ui.add_space(6.0);

        let content_height = ui.available_height() - 44.0;
        ScrollArea::vertical()
            .max_height(content_height)
            .show(ui, |ui| {
                ui.add(
                    egui::TextEdit::multiline(&mut form.content)
                        .font(egui::TextStyle::Monospace)
                        .desired_width(f32::INFINITY)
                        .desired_rows(20),
                );
            });

        ui.add_space(8.0);
        ui.horizontal(|ui| {
            if ui.button(RichText::new("Delete").color(ERROR)).clicked() {
                delete = Some(form.original.path.clone());
            }
            ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                let can_save = form.path.trim().starts_with('/') && !form.category.trim().is_empty();
                let save_btn = ui.add_enabled(
                    can_save,
                    egui::Button::new(RichText::new("SAVE CHANGES").color(ON_ACCENT))
                        .fill(ACCENT)
                        .corner_radius(PANEL_ROUNDING)
                        .min_size(Vec2::new(120.0, 28.0)),
                );
                if save_btn.clicked() {
                    save = true;
                }
                if ui.button("CANCEL").clicked() {
                    cancel = true;
                }
            });
        });
    }

    if let Some(path) = delete {
        state.request_delete(&path);
    }
    if cancel {
        state.cancel_edit();
        return None;
    }
    if save {
        return state
            .finish_edit()
            .map(|(path, patch)| ArchiveAction::Save { path, patch });
    }
    None
}
