//! Main egui application — composes the panels and drives the archive runtime.

use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;

use egui::{self, CentralPanel, RichText, SidePanel, TopBottomPanel};

use archive_core::event_bus::EventBus;
use archive_core::persistence::{self, ArchivePersistence};
use archive_core::ports::StoragePort;
use archive_core::{ArchiveRuntime, TurnOutcome};
use archive_platform::{model_for, open_storage};
use archive_types::config::{ArchiveConfig, StorageBackendType};
use archive_types::event::ArchiveEvent;
use archive_ui::panels::archive::{self, ArchiveAction};
use archive_ui::panels::chat::{self, ChatAction};
use archive_ui::panels::settings::{self, SaveFeedback, SettingsAction};
use archive_ui::panels::sidebar::{self, SidebarAction};
use archive_ui::state::{UiState, ViewMode, NEW_ENTRY_PATH};
use archive_ui::theme;

/// Handed over by the startup task once storage has been read
struct Booted {
    runtime: Rc<ArchiveRuntime>,
    config: ArchiveConfig,
    storage_name: String,
}

/// The main application state
pub struct ArchiveApp {
    ui_state: UiState,
    /// Working copy edited by the settings panel
    config: ArchiveConfig,
    event_bus: EventBus,
    /// Where the config lives; the archive may use another backend
    config_storage: Rc<dyn StoragePort>,
    runtime: Option<Rc<ArchiveRuntime>>,
    storage_name: String,
    boot_slot: Rc<RefCell<Option<Booted>>>,
    save_feedback: Rc<RefCell<Option<SaveFeedback>>>,
    first_frame: bool,
}

impl ArchiveApp {
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        let event_bus = EventBus::new();
        let config_storage = open_storage(StorageBackendType::Auto);
        let boot_slot = Rc::new(RefCell::new(None));

        Self::bootstrap(
            config_storage.clone(),
            event_bus.clone(),
            boot_slot.clone(),
            cc.egui_ctx.clone(),
        );

        Self {
            ui_state: UiState::new(),
            config: ArchiveConfig::default(),
            event_bus,
            config_storage,
            runtime: None,
            storage_name: String::new(),
            boot_slot,
            save_feedback: Rc::new(RefCell::new(None)),
            first_frame: true,
        }
    }

    /// Restore config and archive, build the runtime, open the first session.
    fn bootstrap(
        config_storage: Rc<dyn StoragePort>,
        event_bus: EventBus,
        slot: Rc<RefCell<Option<Booted>>>,
        ctx: egui::Context,
    ) {
        wasm_bindgen_futures::spawn_local(async move {
            let config = persistence::load_config(config_storage.as_ref())
                .await
                .unwrap_or_default();

            let storage = match config.storage.backend {
                StorageBackendType::Auto => config_storage,
                backend => open_storage(backend),
            };
            let archive = ArchivePersistence::new(storage.clone(), config.storage.archive_key.clone());
            let documents = archive.load().await;
            event_bus.emit(ArchiveEvent::ArchiveChanged {
                documents: documents.clone(),
            });

            let model = model_for(&config.model);
            let runtime = Rc::new(
                ArchiveRuntime::new(config.clone(), model, documents, event_bus)
                    .with_persistence(archive),
            );
            *slot.borrow_mut() = Some(Booted {
                runtime: runtime.clone(),
                config,
                storage_name: storage.backend_name().to_string(),
            });
            ctx.request_repaint();

            // Failures are published on the event bus
            let _ = runtime.initialize().await;
            ctx.request_repaint();
        });
    }

    fn take_booted(&mut self) {
        if self.runtime.is_some() {
            return;
        }
        let Some(booted) = self.boot_slot.borrow_mut().take() else {
            return;
        };
        log::info!("Archive ready ({} storage)", booted.storage_name);
        self.config = booted.config;
        self.storage_name = booted.storage_name;
        self.runtime = Some(booted.runtime);
    }
}

impl eframe::App for ArchiveApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.first_frame {
            theme::apply_theme(ctx);
            self.first_frame = false;
        }

        self.take_booted();

        // Drain events from the archive runtime
        let events = self.event_bus.drain();
        if !events.is_empty() {
            self.ui_state.process_events(events);
            ctx.request_repaint();
        }

        if self.ui_state.is_busy() {
            ctx.request_repaint();
        }

        // ── Top bar ──────────────────────────────────────────
        TopBottomPanel::top("top_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(
                    RichText::new("ARCHIVE")
                        .strong()
                        .color(theme::TEXT_STRONG)
                        .size(16.0),
                );
                ui.separator();
                ui.label(
                    RichText::new(format!(
                        "Provider: {} | Model: {}",
                        self.config.model.provider.label(),
                        self.config.model.model
                    ))
                    .color(theme::TEXT_SECONDARY)
                    .small(),
                );
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui
                        .selectable_label(self.ui_state.show_settings, "Settings")
                        .clicked()
                    {
                        self.ui_state.show_settings = !self.ui_state.show_settings;
                    }
                });
            });
        });

        // ── Settings side panel ──────────────────────────────
        if self.ui_state.show_settings {
            let feedback = self.save_feedback.borrow().clone();
            SidePanel::right("settings_panel")
                .min_width(280.0)
                .max_width(350.0)
                .show(ctx, |ui| {
                    match settings::settings_panel(ui, &mut self.config, feedback.as_ref()) {
                        SettingsAction::SaveClicked => self.save_settings(ctx),
                        SettingsAction::Changed => {
                            self.save_feedback.borrow_mut().take();
                        }
                        SettingsAction::None => {}
                    }
                });
        }

        // ── Sidebar ──────────────────────────────────────────
        SidePanel::left("sidebar")
            .exact_width(theme::SIDEBAR_WIDTH)
            .show(ctx, |ui| {
                let action = sidebar::sidebar_panel(ui, &mut self.ui_state, &self.storage_name);
                if let SidebarAction::NewEntry = action {
                    self.new_entry(ctx);
                }
            });

        // ── Main content ─────────────────────────────────────
        CentralPanel::default().show(ctx, |ui| {
            if self.runtime.is_none() {
                ui.centered_and_justified(|ui| {
                    ui.spinner();
                });
                return;
            }

            match self.ui_state.view_mode {
                ViewMode::Chat => {
                    if let Some(action) = chat::chat_panel(ui, &mut self.ui_state) {
                        self.handle_chat(action, ctx);
                    }
                }
                ViewMode::KnowledgeBase => {
                    if let Some(action) = archive::archive_panel(ui, &mut self.ui_state) {
                        self.handle_archive(action, ctx);
                    }
                }
            }
        });
    }
}

impl ArchiveApp {
    fn handle_chat(&mut self, action: ChatAction, ctx: &egui::Context) {
        let Some(runtime) = self.runtime.clone() else {
            return;
        };
        match action {
            ChatAction::Send(text) => {
                spawn_with_repaint(ctx, async move {
                    match runtime.run_turn(&text).await {
                        Ok(TurnOutcome::Replied(_)) => {}
                        Ok(TurnOutcome::Dropped) => log::debug!("Input dropped"),
                        Err(e) => {
                            log::error!("Turn failed: {}", e);
                            publish_error(&runtime, &e);
                        }
                    }
                });
            }
            ChatAction::OpenFile(path) => self.ui_state.select(&path),
            ChatAction::Retry => {
                // Failures are published on the event bus
                spawn_with_repaint(ctx, async move {
                    let _ = runtime.initialize().await;
                });
            }
            ChatAction::ClearConversation => {
                if runtime.clear_conversation() {
                    self.ui_state.messages.clear();
                }
            }
        }
    }

    fn handle_archive(&mut self, action: ArchiveAction, ctx: &egui::Context) {
        let Some(runtime) = self.runtime.clone() else {
            return;
        };
        match action {
            ArchiveAction::Save { path, patch } => {
                spawn_with_repaint(ctx, async move {
                    let result = runtime.update_document(&path, patch).await;
                    report(&runtime, result);
                });
            }
            ArchiveAction::Delete(path) => {
                spawn_with_repaint(ctx, async move {
                    let result = runtime.delete_document(&path).await;
                    report(&runtime, result);
                });
            }
        }
    }

    /// Create a blank entry at a free path and open it for editing.
    fn new_entry(&mut self, ctx: &egui::Context) {
        let Some(runtime) = self.runtime.clone() else {
            return;
        };
        let path = runtime.unique_path(NEW_ENTRY_PATH);
        let doc = self.ui_state.start_new_entry(&path);
        spawn_with_repaint(ctx, async move {
            let result = runtime.create_document(doc).await;
            report(&runtime, result);
        });
    }

    /// Persist the settings and rebuild the session with them.
    fn save_settings(&self, ctx: &egui::Context) {
        let config = self.config.clone();
        let storage = self.config_storage.clone();
        let feedback = self.save_feedback.clone();
        let runtime = self.runtime.clone();
        let storage_changed = runtime
            .as_ref()
            .is_some_and(|rt| rt.config().storage != config.storage);

        spawn_with_repaint(ctx, async move {
            let saved = persistence::save_config(storage.as_ref(), &config).await;
            let message = match &saved {
                Err(e) => {
                    log::error!("Failed to save config: {}", e);
                    format!("Save failed: {}", e)
                }
                Ok(()) if storage_changed => "Saved. Storage changes apply after reload.".to_string(),
                Ok(()) => "Saved".to_string(),
            };
            *feedback.borrow_mut() = Some(SaveFeedback {
                message,
                success: saved.is_ok(),
            });
            if let Some(runtime) = runtime {
                let model = model_for(&config.model);
                // Failures are published on the event bus
                let _ = runtime.reconfigure(config, model).await;
            }
        });
    }
}

fn spawn_with_repaint(ctx: &egui::Context, task: impl Future<Output = ()> + 'static) {
    let ctx = ctx.clone();
    wasm_bindgen_futures::spawn_local(async move {
        task.await;
        ctx.request_repaint();
    });
}

fn report<T>(runtime: &ArchiveRuntime, result: archive_types::Result<T>) {
    if let Err(e) = result {
        log::warn!("Archive edit failed: {}", e);
        publish_error(runtime, &e);
    }
}

fn publish_error(runtime: &ArchiveRuntime, e: &archive_types::ArchiveError) {
    runtime.event_bus().emit(ArchiveEvent::Error {
        kind: e.kind(),
        message: e.to_string(),
    });
}
