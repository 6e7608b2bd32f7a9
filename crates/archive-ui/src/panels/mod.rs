pub mod sidebar;
pub mod chat;
pub mod archive;
pub mod settings;
pub mod markdown;
