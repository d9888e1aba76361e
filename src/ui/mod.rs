pub mod commands;
pub mod model_picker;
pub mod terminal;

pub use model_picker::{ModelSelection, PickerMode};
pub use terminal::TerminalUI;
