pub mod foreground;
pub mod logging;
pub mod settings;
