use crate::chat::controller::{ChatController, ChatPhase, PendingResponse};
use crate::chat::input::NoVoiceCapture;
use crate::chat::resolver;
use crate::event::AppEvent;
use crate::session::storage::Storage;
use crate::theme::{self, Theme, ThemeMode};
use crate::ui::render::{RenderAction, TranscriptRenderer};
use eframe::egui::{self, RichText, ScrollArea};
use std::sync::mpsc::{Receiver, Sender, TryRecvError};
use tokio::runtime::Handle;

const COPIED_LABEL_SECS: f64 = 2.0;

pub struct QuantaApp {
    rx: Receiver<AppEvent>,
    tx: Sender<AppEvent>,
    runtime_handle: Handle,
    controller: ChatController,
    preferences: Box<dyn Storage>,
    theme: Theme,
    visuals_dirty: bool,
    voice: NoVoiceCapture,
    copied: Option<(String, f64)>,
    scroll_to_bottom: bool,
}

impl QuantaApp {
    pub fn new(
        rx: Receiver<AppEvent>,
        tx: Sender<AppEvent>,
        runtime_handle: Handle,
        controller: ChatController,
        preferences: Box<dyn Storage>,
        theme_mode: ThemeMode,
    ) -> Self {
        Self {
            rx,
            tx,
            runtime_handle,
            controller,
            preferences,
            theme: Theme::for_mode(theme_mode),
            visuals_dirty: true,
            voice: NoVoiceCapture,
            copied: None,
            scroll_to_bottom: true,
        }
    }

    fn toggle_theme(&mut self) {
        let mode = self.theme.mode.toggled();
        self.theme = Theme::for_mode(mode);
        self.visuals_dirty = true;
        theme::save_mode(self.preferences.as_mut(), mode);
        tracing::debug!(?mode, "theme toggled");
    }

    fn dispatch(&mut self, pending: PendingResponse, ctx: &egui::Context) {
        let PendingResponse {
            request_id, prompt, ..
        } = pending;
        let backend = self.controller.resolver();
        let tx = self.tx.clone();
        let ctx = ctx.clone();

        self.controller.mark_responding(request_id);
        self.runtime_handle.spawn(async move {
            let result = resolver::resolve_detached(backend, prompt).await;
            let _ = tx.send(AppEvent::ResponseFinished { request_id, result });
            ctx.request_repaint();
        });
    }

    fn submit(&mut self, pending: Option<PendingResponse>, ctx: &egui::Context) {
        if let Some(pending) = pending {
            self.dispatch(pending, ctx);
            self.scroll_to_bottom = true;
        }
    }

    fn drain_events(&mut self) {
        loop {
            match self.rx.try_recv() {
                Ok(event) => self.apply_event(event),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    tracing::warn!("event channel disconnected");
                    break;
                }
            }
        }
    }

    fn apply_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::ResponseFinished { request_id, result } => {
                if self.controller.finish_response(request_id, result) {
                    self.scroll_to_bottom = true;
                }
            }
        }
    }

    fn collect_dropped_files(&mut self, ctx: &egui::Context) {
        let dropped = ctx.input(|i| i.raw.dropped_files.clone());
        for file in dropped {
            let name = file
                .path
                .as_ref()
                .and_then(|path| path.file_name())
                .map(|name| name.to_string_lossy().to_string())
                .unwrap_or_else(|| file.name.clone());
            let size = match (&file.bytes, &file.path) {
                (Some(bytes), _) => bytes.len() as u64,
                (None, Some(path)) => std::fs::metadata(path).map(|m| m.len()).unwrap_or(0),
                (None, None) => 0,
            };
            self.controller.attach_file(&name, size);
        }
    }

    fn render_top_bar(&mut self, ctx: &egui::Context) {
        let mut toggle = false;
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.strong("Quanta");
                ui.separator();
                ui.label(RichText::new("Physics tutor").color(self.theme.text_muted));
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    toggle = ui.button(self.theme.mode.label()).clicked();
                });
            });
        });
        if toggle {
            self.toggle_theme();
        }
    }

    fn render_left_panel(&mut self, ctx: &egui::Context) {
        let mut new_chat = false;
        let mut clicked: Option<String> = None;
        let mut deleted: Option<String> = None;

        egui::SidePanel::left("conversations_panel")
            .resizable(true)
            .default_width(240.0)
            .show(ctx, |ui| {
                new_chat = ui
                    .add_sized([ui.available_width(), 32.0], egui::Button::new("+ New chat"))
                    .clicked();
                ui.separator();

                ScrollArea::vertical()
                    .id_salt("conversation_list")
                    .show(ui, |ui| {
                        let active = self.controller.active_id();
                        for conversation in self.controller.conversations() {
                            ui.horizontal(|ui| {
                                let selected = active == Some(conversation.id.as_str());
                                if ui
                                    .selectable_label(selected, &conversation.title)
                                    .clicked()
                                {
                                    clicked = Some(conversation.id.clone());
                                }
                                ui.with_layout(
                                    egui::Layout::right_to_left(egui::Align::Center),
                                    |ui| {
                                        if ui.small_button("🗑").on_hover_text("Delete").clicked() {
                                            deleted = Some(conversation.id.clone());
                                        }
                                    },
                                );
                            });
                        }
                    });
            });

        if new_chat {
            self.controller.new_conversation();
        }
        if let Some(id) = clicked {
            self.controller.switch_conversation(&id);
            self.scroll_to_bottom = true;
        }
        if let Some(id) = deleted {
            self.controller.delete_conversation(&id);
        }
    }

    fn render_center_panel(&mut self, ctx: &egui::Context) {
        let mut actions = Vec::new();
        let mut send_now = false;
        let mut start_voice = false;
        let now = ctx.input(|i| i.time);

        let expired = self
            .copied
            .as_ref()
            .is_some_and(|(_, copied_at)| now - copied_at > COPIED_LABEL_SECS);
        if expired {
            self.copied = None;
        } else if self.copied.is_some() {
            ctx.request_repaint_after(std::time::Duration::from_millis(250));
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            let transcript_height = (ui.available_height() - 90.0).max(120.0);
            ScrollArea::vertical()
                .id_salt("chat_transcript")
                .max_height(transcript_height)
                .auto_shrink([false, false])
                .stick_to_bottom(true)
                .show(ui, |ui| {
                    let copied = self.copied.as_ref().map(|(code, _)| code.as_str());
                    TranscriptRenderer::new(&self.theme, copied).show(
                        ui,
                        self.controller.transcript(),
                        &mut |action| actions.push(action),
                    );

                    if self.scroll_to_bottom {
                        ui.scroll_to_cursor(Some(egui::Align::BOTTOM));
                    }
                });
            self.scroll_to_bottom = false;

            ui.separator();
            let idle = self.controller.is_idle();
            let hint = match self.controller.phase() {
                ChatPhase::Idle => "Ask a physics question... (drop files to attach)",
                ChatPhase::Sending => "Sending...",
                ChatPhase::Responding => "Waiting for response...",
            };

            self.theme.composer_frame().show(ui, |ui| {
                ui.horizontal(|ui| {
                    let recording = self.controller.draft().is_recording();
                    let mic_label = if recording { "⏺" } else { "🎤" };
                    start_voice = ui.button(mic_label).on_hover_text("Voice input").clicked();

                    let can_send = idle && !self.controller.draft().text().trim().is_empty();
                    let input_width = (ui.available_width() - 70.0).max(80.0);
                    let response = ui.add(
                        egui::TextEdit::singleline(self.controller.draft_mut().text_mut())
                            .desired_width(input_width)
                            .hint_text(hint),
                    );
                    if response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                        send_now = true;
                    }

                    send_now |= ui
                        .add_enabled(can_send, egui::Button::new("Send"))
                        .clicked();
                });
            });
        });

        for action in actions {
            match action {
                RenderAction::QuickPrompt(prompt) => {
                    let pending = self.controller.submit_quick_prompt(prompt);
                    self.submit(pending, ctx);
                }
                RenderAction::CopyCode(code) => {
                    ctx.copy_text(code.clone());
                    self.copied = Some((code, now));
                }
            }
        }
        if send_now {
            let pending = self.controller.submit_draft();
            self.submit(pending, ctx);
        }
        if start_voice {
            self.controller.start_voice_input(&mut self.voice);
        }
    }

    fn render_notice(&mut self, ctx: &egui::Context) {
        let Some(notice) = self.controller.notice().map(str::to_string) else {
            return;
        };
        let mut dismissed = false;
        egui::Window::new("Notice")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label(notice);
                ui.add_space(self.theme.spacing_8);
                dismissed = ui.button("OK").clicked();
            });
        if dismissed {
            self.controller.dismiss_notice();
        }
    }
}

impl eframe::App for QuantaApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.visuals_dirty {
            self.theme.apply_visuals(ctx);
            self.visuals_dirty = false;
        }

        self.drain_events();
        self.controller.poll_voice(&mut self.voice);
        self.collect_dropped_files(ctx);
        self.render_top_bar(ctx);
        self.render_left_panel(ctx);
        self.render_center_panel(ctx);
        self.render_notice(ctx);
    }
}
