pub mod state;
pub mod presentation;
pub mod theme;
pub mod panels;
