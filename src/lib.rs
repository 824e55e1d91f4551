#[macro_use]
pub mod logger;
#[macro_use]
pub mod i18n;

pub mod app;
pub mod caption;
pub mod cli;
pub mod components;
pub mod context;
pub mod export;
pub mod idea;
pub mod io;
pub mod plan;
pub mod session;
pub mod settings;
pub mod stroke;
pub mod surface;
