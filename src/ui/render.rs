use crate::chat::markup::{Block, Span};
use crate::chat::transcript::{Transcript, TranscriptEntry};
use crate::session::Role;
use crate::theme::Theme;
use chrono::{DateTime, Local, Utc};
use eframe::egui::{self, RichText};

/// User actions raised while drawing the transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderAction {
    QuickPrompt(&'static str),
    CopyCode(String),
}

pub struct TranscriptRenderer<'a> {
    theme: &'a Theme,
    /// Code block most recently copied, shown with a "Copied!" label.
    copied: Option<&'a str>,
}

impl<'a> TranscriptRenderer<'a> {
    pub fn new(theme: &'a Theme, copied: Option<&'a str>) -> Self {
        Self { theme, copied }
    }

    pub fn show(
        &self,
        ui: &mut egui::Ui,
        transcript: &Transcript,
        emit: &mut dyn FnMut(RenderAction),
    ) {
        for entry in transcript.entries() {
            self.render_entry(ui, entry, emit);
            ui.add_space(self.theme.spacing_8);
        }

        if transcript.is_typing() {
            ui.horizontal(|ui| {
                ui.spinner();
                ui.label(RichText::new("Thinking...").color(self.theme.text_muted));
            });
        }
    }

    fn render_entry(
        &self,
        ui: &mut egui::Ui,
        entry: &TranscriptEntry,
        emit: &mut dyn FnMut(RenderAction),
    ) {
        let theme = self.theme;
        match entry {
            TranscriptEntry::Message {
                role,
                blocks,
                timestamp,
            } => {
                let (label, fill) = match role {
                    Role::User => ("You", theme.user_bubble),
                    Role::Assistant => ("Quanta", theme.assistant_bubble),
                };
                theme.bubble_frame(fill).show(ui, |ui| {
                    ui.set_width(ui.available_width());
                    ui.horizontal(|ui| {
                        ui.label(RichText::new(label).strong().color(theme.text_primary));
                        ui.label(
                            RichText::new(format_time(timestamp))
                                .color(theme.text_muted)
                                .size(12.0),
                        );
                    });
                    ui.add_space(theme.spacing_4);
                    for block in blocks {
                        self.render_block(ui, block, emit);
                    }
                });
            }
            TranscriptEntry::Error { text } => {
                theme.error_frame().show(ui, |ui| {
                    ui.set_width(ui.available_width());
                    ui.label(RichText::new(text).color(theme.danger));
                });
            }
            TranscriptEntry::Welcome { prompts } => {
                ui.vertical_centered(|ui| {
                    ui.add_space(theme.spacing_16);
                    ui.heading("Welcome to Quanta");
                    ui.label(
                        RichText::new(
                            "Your physics tutor. Ask about mechanics, quantum physics, \
                             relativity and more, or start with one of these:",
                        )
                        .color(theme.text_muted),
                    );
                    ui.add_space(theme.spacing_12);
                    for prompt in prompts.iter() {
                        if ui.button(*prompt).clicked() {
                            emit(RenderAction::QuickPrompt(*prompt));
                        }
                    }
                });
            }
        }
    }

    fn render_block(&self, ui: &mut egui::Ui, block: &Block, emit: &mut dyn FnMut(RenderAction)) {
        let theme = self.theme;
        match block {
            Block::Paragraph(spans) => {
                ui.horizontal_wrapped(|ui| {
                    ui.spacing_mut().item_spacing.x = 0.0;
                    for span in spans {
                        self.render_span(ui, span);
                    }
                });
            }
            Block::Code { language, code } => {
                theme.code_frame().show(ui, |ui| {
                    ui.set_width(ui.available_width());
                    ui.horizontal(|ui| {
                        let language = language.as_deref().unwrap_or("code");
                        ui.label(RichText::new(language).color(theme.text_muted).size(12.0));
                        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                            if self.copied == Some(code.as_str()) {
                                ui.label(RichText::new("Copied!").color(theme.text_muted).size(12.0));
                            } else if ui.small_button("Copy").clicked() {
                                emit(RenderAction::CopyCode(code.clone()));
                            }
                        });
                    });
                    ui.label(
                        RichText::new(code.as_str())
                            .color(theme.text_on_accent)
                            .size(13.0)
                            .monospace(),
                    );
                });
            }
        }
    }

    fn render_span(&self, ui: &mut egui::Ui, span: &Span) {
        let theme = self.theme;
        match span {
            Span::Text(text) => {
                ui.label(RichText::new(text).color(theme.text_primary));
            }
            Span::Code(text) => {
                ui.label(RichText::new(text).code());
            }
            Span::Bold(text) => {
                ui.label(RichText::new(text).strong().color(theme.text_primary));
            }
            Span::Italic(text) => {
                ui.label(RichText::new(text).italics().color(theme.text_primary));
            }
            Span::Math(text) => {
                ui.label(RichText::new(text).italics().color(theme.math_text));
            }
            Span::LineBreak => ui.end_row(),
        }
    }
}

fn format_time(timestamp: &DateTime<Utc>) -> String {
    timestamp.with_timezone(&Local).format("%H:%M").to_string()
}
