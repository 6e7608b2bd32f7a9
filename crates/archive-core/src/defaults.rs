//! Built-in archive used on first run and whenever the saved one is unusable.

use archive_types::document::Document;

const SEED_DATE: &str = "2024-05-22";

const MAIN_BIO: &str = "# Main Bio

A filmmaker and designer specializing in video editing, motion graphics and
creative-tech workflows. After several years in corporate design, now works
freelance, helping brands and studios produce clean, effective visuals and
streamlined content systems.

Focus: delivering work that makes clients look good fast, balancing craft and
speed with modern production tools, including AI-assisted editing and
automation where it helps.

Currently taking on freelance work in post-production, content creation and design.";

const POSITIONING: &str = "# Positioning

## Who I Help
Mid-sized brands, creative studios and independent founders who need
high-quality video content delivered quickly and consistently.

## The Core Value
Bridging creative vision and execution: fast turnaround, strong taste, modern workflows.

## What Makes This Different
- Experience in both corporate and independent creative environments
- Systems-driven approach that reduces revision cycles
- Integrates AI tools without compromising craft

## The Promise
Clear communication. Clean visuals. On-time delivery.";

const SKILLS_STACK: &str = "# Skills Stack

## Core Strengths
- Video editing (Premiere Pro, DaVinci Resolve)
- Motion graphics and title design (After Effects)
- Brand and content design (Photoshop, Illustrator)
- Story structure, pacing and editorial clarity

## Workflow & Technology
- AI-assisted post-production and automation
- Asset organization and versioning systems
- Cloud collaboration for remote teams

## Current Focus Areas
- Faster iterative editing for high-volume social content
- Modular brand systems for repeat campaigns";

pub fn default_documents() -> Vec<Document> {
    [
        ("/Bio/Main_Bio.md", "Bio", MAIN_BIO),
        ("/Brand/Positioning.md", "Brand", POSITIONING),
        ("/Bio/Skills_Stack.md", "Bio", SKILLS_STACK),
    ]
    .into_iter()
    .map(|(path, category, content)| Document {
        path: path.to_string(),
        category: category.to_string(),
        content: content.to_string(),
        last_updated: SEED_DATE.to_string(),
    })
    .collect()
}
