mod ambient;

pub use ambient::{AmbientAnimator, AmbientGrid, Bar, Direction, GRID_COLS, GRID_ROWS, SCROLL_SPAN};
