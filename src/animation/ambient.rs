//! Blinkenlights: the idle-screen animation.
//!
//! An 8x4 grid of short bars. Each row scrolls one pixel per update in a
//! fixed direction; after a full cell (8 px) the offset snaps back to zero and
//! the row's visibility pattern shifts by one cell, feeding a random bit in at
//! the vacated end.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::hardware::{Screen, DISPLAY_WIDTH};

pub const GRID_COLS: usize = 8;
pub const GRID_ROWS: usize = 4;

/// Pixels a row travels before its pattern shifts by one cell
pub const SCROLL_SPAN: i8 = 8;

/// Bar geometry
pub const BAR_WIDTH: i32 = 6;
pub const BAR_HEIGHT: i32 = 2;
const CELL_PITCH: i32 = 8;
const ORIGIN_X: i32 = 1;
const ORIGIN_Y: i32 = 3;

/// Rows alternate direction: even rows travel right, odd rows left
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Right,
    Left,
}

impl Direction {
    pub fn for_row(row: usize) -> Self {
        if row % 2 == 0 {
            Direction::Right
        } else {
            Direction::Left
        }
    }
}

/// One bar to draw, top-left corner in panel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bar {
    pub x: i32,
    pub y: i32,
}

/// Grid state. Dimensions are fixed; offsets stay in `(-SCROLL_SPAN, SCROLL_SPAN)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmbientGrid {
    cells: [[bool; GRID_COLS]; GRID_ROWS],
    offsets: [i8; GRID_ROWS],
    all_on: bool,
}

impl AmbientGrid {
    /// Cell visibility as rendered (always true while all-on)
    pub fn is_visible(&self, row: usize, col: usize) -> bool {
        self.all_on || self.cells[row][col]
    }

    pub fn offset(&self, row: usize) -> i8 {
        if self.all_on {
            0
        } else {
            self.offsets[row]
        }
    }

    pub fn all_on(&self) -> bool {
        self.all_on
    }

    pub fn row(&self, row: usize) -> [bool; GRID_COLS] {
        self.cells[row]
    }
}

pub struct AmbientAnimator {
    grid: AmbientGrid,
    rng: StdRng,
}

impl AmbientAnimator {
    pub fn new(mut rng: StdRng) -> Self {
        let cells = random_cells(&mut rng);
        Self {
            grid: AmbientGrid {
                cells,
                offsets: [0; GRID_ROWS],
                all_on: false,
            },
            rng,
        }
    }

    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }

    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    pub fn grid(&self) -> &AmbientGrid {
        &self.grid
    }

    /// Advance every row by one pixel. No-op while all-on.
    pub fn update(&mut self) {
        if self.grid.all_on {
            return;
        }

        for row in 0..GRID_ROWS {
            let offset = &mut self.grid.offsets[row];
            let cells = &mut self.grid.cells[row];
            match Direction::for_row(row) {
                Direction::Right => {
                    *offset += 1;
                    if *offset >= SCROLL_SPAN {
                        *offset = 0;
                        cells.rotate_right(1);
                        cells[0] = self.rng.gen();
                    }
                }
                Direction::Left => {
                    *offset -= 1;
                    if *offset <= -SCROLL_SPAN {
                        *offset = 0;
                        cells.rotate_left(1);
                        cells[GRID_COLS - 1] = self.rng.gen();
                    }
                }
            }
        }
    }

    /// Light every bar and freeze scrolling. Idempotent.
    ///
    /// The stored pattern is left alone; visibility is overridden by the flag.
    pub fn set_all_on(&mut self) {
        self.grid.all_on = true;
        self.grid.offsets = [0; GRID_ROWS];
    }

    /// Back to a fresh random pattern
    pub fn reset(&mut self) {
        self.grid.all_on = false;
        self.grid.cells = random_cells(&mut self.rng);
        self.grid.offsets = [0; GRID_ROWS];
    }

    /// Bars for the current state. Bars that would stick out of the panel
    /// horizontally are omitted rather than clipped.
    pub fn render(&self) -> Vec<Bar> {
        let mut bars = Vec::with_capacity(GRID_COLS * GRID_ROWS);
        for row in 0..GRID_ROWS {
            let scroll = self.grid.offset(row) as i32;
            for col in 0..GRID_COLS {
                if !self.grid.is_visible(row, col) {
                    continue;
                }
                let x = col as i32 * CELL_PITCH + ORIGIN_X + scroll;
                let y = row as i32 * CELL_PITCH + ORIGIN_Y;
                if x >= 0 && x + BAR_WIDTH - 1 < DISPLAY_WIDTH as i32 {
                    bars.push(Bar { x, y });
                }
            }
        }
        bars
    }

    /// Draw and present the current frame
    pub fn draw(&self, screen: &mut dyn Screen) {
        screen.fill(false);
        for bar in self.render() {
            screen.fill_rect(bar.x, bar.y, BAR_WIDTH, BAR_HEIGHT, true);
        }
        screen.show();
    }
}

fn random_cells(rng: &mut StdRng) -> [[bool; GRID_COLS]; GRID_ROWS] {
    let mut cells = [[false; GRID_COLS]; GRID_ROWS];
    for row in cells.iter_mut() {
        for cell in row.iter_mut() {
            *cell = rng.gen();
        }
    }
    cells
}
