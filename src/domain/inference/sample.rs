//! Built-in samples used by the demo route

use super::transform::{Grid, MNIST_HEIGHT, MNIST_WIDTH};
use crate::domain::DomainError;

/// Document sent to the topic model
pub const DEMO_DOCUMENT: &str =
    "The new graphics card renders most games at twice the frame rate of last year's model.";

/// A 28x28 "7": `#` is full intensity, `+` half, `.` background
const DEMO_DIGIT: [&str; 28] = [
    "............................",
    "............................",
    "............................",
    "............................",
    "............................",
    "............................",
    ".......###############......",
    ".......###############......",
    "......+###############+.....",
    "....................##+.....",
    "....................##+.....",
    "...................##+......",
    "...................##+......",
    "..................##+.......",
    "..................##+.......",
    ".................##+........",
    ".................##+........",
    "................##+.........",
    "................##+.........",
    "...............##+..........",
    "...............##+..........",
    "..............##+...........",
    "..............##+...........",
    ".............##+............",
    "............................",
    "............................",
    "............................",
    "............................",
];

fn intensity(pixel: u8) -> f32 {
    match pixel {
        b'#' => 255.0,
        b'+' => 128.0,
        _ => 0.0,
    }
}

/// The demo digit as a float grid, same layout the image transform produces
pub fn demo_grid() -> Result<Grid, DomainError> {
    let data = DEMO_DIGIT
        .iter()
        .flat_map(|row| row.bytes().map(intensity))
        .collect();

    Grid::new(MNIST_HEIGHT as usize, MNIST_WIDTH as usize, data)
}
