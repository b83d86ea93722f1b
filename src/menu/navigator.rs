use std::ops::Range;
use tracing::debug;

use crate::hardware::{clip, Button, Screen, LINE_HEIGHT};
use crate::input::ButtonEvents;
use crate::software::SoftwareItem;

/// Order in which simultaneous presses are considered in a menu
pub const MENU_ORDER: [Button; 4] = [Button::Up, Button::Down, Button::Select, Button::Home];

/// Entries visible at once under the title
pub const VISIBLE_ROWS: usize = 2;

/// Characters of an item name shown after the selection marker
pub const LABEL_CHARS: usize = 9;

/// Selection over `len` entries, with the two-row window that follows it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MenuViewport {
    selected: usize,
    len: usize,
}

impl MenuViewport {
    /// None for an empty list
    pub fn new(len: usize) -> Option<Self> {
        (len > 0).then_some(Self { selected: 0, len })
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn offset(&self) -> usize {
        self.selected.saturating_sub(1)
    }

    pub fn visible(&self) -> Range<usize> {
        let offset = self.offset();
        offset..(offset + VISIBLE_ROWS).min(self.len)
    }

    pub fn move_up(&mut self) {
        self.selected = (self.selected + self.len - 1) % self.len;
    }

    pub fn move_down(&mut self) {
        self.selected = (self.selected + 1) % self.len;
    }
}

/// What the caller should do after a menu tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuSignal {
    /// Selection changed, menu stays open
    Moved,
    Confirm(usize),
    Cancel,
}

/// Circular single-selection list of packages
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuNavigator {
    title: String,
    items: Vec<SoftwareItem>,
    viewport: MenuViewport,
}

impl MenuNavigator {
    /// Returns None when there is nothing to choose from
    pub fn open(title: impl Into<String>, items: Vec<SoftwareItem>) -> Option<Self> {
        let viewport = MenuViewport::new(items.len())?;
        Some(Self {
            title: title.into(),
            items,
            viewport,
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn items(&self) -> &[SoftwareItem] {
        &self.items
    }

    pub fn viewport(&self) -> &MenuViewport {
        &self.viewport
    }

    pub fn selected_item(&self) -> &SoftwareItem {
        &self.items[self.viewport.selected()]
    }

    /// Act on the first button pressed this tick, in menu order
    pub fn handle(&mut self, events: &ButtonEvents) -> Option<MenuSignal> {
        let button = events.first_pressed(&MENU_ORDER, |_| true)?;
        let signal = match button {
            Button::Up => {
                self.viewport.move_up();
                MenuSignal::Moved
            }
            Button::Down => {
                self.viewport.move_down();
                MenuSignal::Moved
            }
            Button::Select => MenuSignal::Confirm(self.viewport.selected()),
            Button::Home => MenuSignal::Cancel,
        };
        debug!("{} menu: {:?} -> {:?}", self.title, button, signal);
        Some(signal)
    }

    /// Rows as drawn under the title, the selected one marked with `>`
    pub fn rows(&self) -> Vec<String> {
        let selected = self.viewport.selected();
        self.viewport
            .visible()
            .map(|index| {
                let marker = if index == selected { '>' } else { ' ' };
                format!("{}{}", marker, clip(self.items[index].name(), LABEL_CHARS))
            })
            .collect()
    }

    pub fn render(&self, screen: &mut dyn Screen) {
        screen.fill(false);
        screen.text(&self.title, 0, 0);
        for (row, line) in self.rows().iter().enumerate() {
            screen.text(line, 0, (row as i32 + 1) * LINE_HEIGHT);
        }
        screen.show();
    }
}
