mod app;
mod status;
mod theme;
mod views;

pub use app::LotlineApp;
pub use theme::{setup_fonts, setup_theme};
