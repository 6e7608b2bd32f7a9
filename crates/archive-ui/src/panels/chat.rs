//! Chat panel — conversation log, starter prompts and the input field.

use egui::{self, Align, Layout, RichText, ScrollArea, Vec2};
use archive_types::message::{Message, Role};
use crate::panels::markdown;
use crate::presentation::{self, DRAFT_BADGE, FOOTER_NOTE, INPUT_HINT, STARTER_PROMPTS};
use crate::state::UiState;
use crate::theme::*;

pub enum ChatAction {
    /// Send this text as a new turn
    Send(String),
    /// Show a document in the knowledge base view
    OpenFile(String),
    /// Try to create a session again
    Retry,
    ClearConversation,
}

/// Render the chat panel. Returns an action for the caller to handle.
pub fn chat_panel(ui: &mut egui::Ui, state: &mut UiState) -> Option<ChatAction> {
    let mut action = None;

    egui::Frame::default()
        .fill(BG_PRIMARY)
        .inner_margin(PANEL_PADDING)
        .show(ui, |ui| {
            ui.vertical(|ui| {
                // Header
                ui.horizontal(|ui| {
                    ui.heading(RichText::new("Operations").color(TEXT_STRONG).strong());
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        let clear = ui.add_enabled(
                            !state.is_busy() && !state.messages.is_empty(),
                            egui::Button::new(RichText::new("Clear").small()),
                        );
                        if clear.clicked() {
                            action = Some(ChatAction::ClearConversation);
                        }
                        let status_color = if state.session_banner.is_some() {
                            ERROR
                        } else if state.is_busy() {
                            WARNING
                        } else {
                            SUCCESS
                        };
                        ui.label(RichText::new(&state.status_text).color(status_color).small());
                    });
                });

                ui.separator();

                if let Some(banner) = &state.session_banner {
                    egui::Frame::default()
                        .fill(ERROR_BG)
                        .corner_radius(PANEL_ROUNDING)
                        .inner_margin(8.0)
                        .show(ui, |ui| {
                            ui.horizontal_wrapped(|ui| {
                                ui.label(
                                    RichText::new(presentation::error_text(banner.kind)).color(ERROR),
                                );
                                if ui.small_button("Retry").clicked() {
                                    action = Some(ChatAction::Retry);
                                }
                            });
                            ui.label(RichText::new(&banner.detail).small().color(TEXT_SECONDARY));
                        });
                    ui.add_space(4.0);
                }

                if let Some(notice) = &state.notice {
                    ui.label(RichText::new(notice).small().color(ERROR));
                }

                // Messages area
                let available_height = ui.available_height() - 76.0;
                ScrollArea::vertical()
                    .max_height(available_height)
                    .auto_shrink([false, false])
                    .stick_to_bottom(true)
                    .show(ui, |ui| {
                        if state.messages.is_empty() {
                            if let Some(prompt) = empty_state(ui, state.documents.len()) {
                                action = Some(ChatAction::Send(prompt.to_string()));
                            }
                        }

                        for msg in &state.messages {
                            if let Some(path) = render_message(ui, msg) {
                                action = Some(ChatAction::OpenFile(path));
                            }
                            ui.add_space(4.0);
                        }

                        if state.is_busy() {
                            ui.horizontal(|ui| {
                                ui.spinner();
                                ui.label(RichText::new(&state.status_text).color(TEXT_SECONDARY).small());
                            });
                        }
                    });

                ui.add_space(8.0);

                // Input area
                ui.horizontal(|ui| {
                    let busy = state.is_busy();
                    let input = egui::TextEdit::singleline(&mut state.input_text)
                        .hint_text(INPUT_HINT)
                        .desired_width(ui.available_width() - 70.0)
                        .font(egui::FontId::proportional(14.0));

                    let response = ui.add_enabled(!busy, input);

                    let send_enabled = !state.input_text.trim().is_empty() && state.can_send();
                    let send_btn = ui.add_enabled(
                        send_enabled,
                        egui::Button::new(RichText::new("Send").color(ON_ACCENT))
                            .fill(if send_enabled { ACCENT } else { BG_SURFACE })
                            .corner_radius(PANEL_ROUNDING)
                            .min_size(Vec2::new(60.0, 0.0)),
                    );

                    // Submit on Enter or button click
                    let enter = response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
                    if enter || send_btn.clicked() {
                        if let Some(text) = state.take_input() {
                            action = Some(ChatAction::Send(text));
                        }
                        response.request_focus();
                    }
                });

                ui.label(RichText::new(FOOTER_NOTE).small().color(TEXT_SECONDARY));
            });
        });

    // Starter prompts go through the same gate as typed input
    match action {
        Some(ChatAction::Send(_)) if !state.can_send() => None,
        other => other,
    }
}

/// Welcome text plus the starter prompt buttons. Returns the clicked prompt.
fn empty_state(ui: &mut egui::Ui, document_count: usize) -> Option<&'static str> {
    let mut picked = None;
    ui.add_space(24.0);
    ui.vertical_centered(|ui| {
        ui.label(
            RichText::new(presentation::empty_state_text(document_count))
                .color(TEXT_SECONDARY),
        );
        ui.add_space(12.0);
        for (tag, prompt) in STARTER_PROMPTS {
            let text = RichText::new(format!("{}  ·  {}", tag, prompt)).color(TEXT_PRIMARY);
            let button = egui::Button::new(text)
                .fill(BG_SECONDARY)
                .corner_radius(PANEL_ROUNDING)
                .min_size(Vec2::new(320.0, 30.0));
            if ui.add(button).clicked() {
                picked = Some(prompt);
            }
        }
    });
    picked
}

/// Draw one message. Returns the related file path if its link was clicked.
fn render_message(ui: &mut egui::Ui, msg: &Message) -> Option<String> {
    let mut open = None;
    let (label, bg) = match (msg.role, msg.failure) {
        (_, Some(_)) => ("ARCHIVE", ERROR_BG),
        (Role::User, _) => ("USER", BG_SURFACE),
        (_, None) if msg.is_draft => ("ARCHIVE", DRAFT_BG),
        _ => ("ARCHIVE", BG_SECONDARY),
    };

    egui::Frame::default()
        .fill(bg)
        .corner_radius(PANEL_ROUNDING)
        .inner_margin(8.0)
        .show(ui, |ui| {
            ui.horizontal(|ui| {
                ui.label(RichText::new(label).strong().small().color(TEXT_STRONG));
                ui.label(
                    RichText::new(presentation::message_time(msg.timestamp))
                        .small()
                        .color(TEXT_SECONDARY),
                );
                if msg.is_draft {
                    ui.label(RichText::new(DRAFT_BADGE).small().monospace().color(WARNING));
                }
            });

            match msg.failure {
                Some(kind) => {
                    ui.label(RichText::new(presentation::error_text(kind)).color(ERROR));
                }
                None => markdown::render(ui, &msg.content),
            }

            if let Some(path) = &msg.related_file {
                if ui.link(RichText::new(format!("→ {}", path)).small()).clicked() {
                    open = Some(path.clone());
                }
            }
        });

    open
}
