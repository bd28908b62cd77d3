pub mod config;
pub mod controller;
pub mod renderer;
pub mod rendering;
pub mod state;
pub mod surface;
pub mod ui;
pub mod ui_strings;
