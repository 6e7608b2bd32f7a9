//! Minimal line-based markdown rendering for documents and replies.
//! Headings, bullets, fenced code and `**bold**` spans; everything else
//! is plain text.

use egui::{self, FontId, RichText};
use egui::text::{LayoutJob, TextFormat};
use crate::theme::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block<'a> {
    Heading { level: usize, text: &'a str },
    Bullet(&'a str),
    Code(Vec<&'a str>),
    Rule,
    Paragraph(&'a str),
    Blank,
}

/// Split markdown into renderable blocks.
pub fn parse(source: &str) -> Vec<Block<'_>> {
    let mut blocks = Vec::new();
    let mut code: Option<Vec<&str>> = None;

    for line in source.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("```") {
            match code.take() {
                Some(lines) => blocks.push(Block::Code(lines)),
                None => code = Some(Vec::new()),
            }
            continue;
        }
        if let Some(lines) = code.as_mut() {
            lines.push(line);
            continue;
        }

        let level = trimmed.chars().take_while(|c| *c == '#').count();
        let block = if (1..=6).contains(&level) && trimmed[level..].starts_with(' ') {
            Block::Heading { level, text: trimmed[level..].trim() }
        } else if let Some(item) = trimmed.strip_prefix("- ").or_else(|| trimmed.strip_prefix("* ")) {
            Block::Bullet(item)
        } else if trimmed == "---" {
            Block::Rule
        } else if trimmed.is_empty() {
            Block::Blank
        } else {
            Block::Paragraph(line)
        };
        blocks.push(block);
    }

    // Unterminated fence
    if let Some(lines) = code {
        blocks.push(Block::Code(lines));
    }
    blocks
}

pub fn render(ui: &mut egui::Ui, source: &str) {
    for block in parse(source) {
        match block {
            Block::Heading { level, text } => {
                let size = match level {
                    1 => 20.0,
                    2 => 17.0,
                    _ => 15.0,
                };
                ui.add_space(4.0);
                ui.label(RichText::new(text).size(size).strong().color(TEXT_PRIMARY));
            }
            Block::Bullet(text) => {
                ui.horizontal_wrapped(|ui| {
                    ui.label(RichText::new("•").color(TEXT_SECONDARY));
                    ui.label(inline(text));
                });
            }
            Block::Code(lines) => {
                egui::Frame::default()
                    .fill(BG_SURFACE)
                    .corner_radius(PANEL_ROUNDING)
                    .inner_margin(6.0)
                    .show(ui, |ui| {
                        ui.label(RichText::new(lines.join("\n")).monospace().color(TEXT_PRIMARY));
                    });
            }
            Block::Rule => {
                ui.separator();
            }
            Block::Paragraph(text) => {
                ui.label(inline(text));
            }
            Block::Blank => {
                ui.add_space(4.0);
            }
        }
    }
}

/// Lay out one line, toggling bold at every `**`.
fn inline(text: &str) -> LayoutJob {
    let mut job = LayoutJob::default();
    for (i, span) in text.split("**").enumerate() {
        if span.is_empty() {
            continue;
        }
        let color = if i % 2 == 1 { TEXT_STRONG } else { TEXT_PRIMARY };
        job.append(
            span,
            0.0,
            TextFormat {
                font_id: FontId::proportional(14.0),
                color,
                ..Default::default()
            },
        );
    }
    job
}
