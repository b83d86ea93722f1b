mod navigator;

pub use navigator::{MenuNavigator, MenuSignal, MenuViewport, LABEL_CHARS, MENU_ORDER, VISIBLE_ROWS};
