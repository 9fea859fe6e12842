//! Minimal FITS primary-HDU reader (and float64 writer for fixtures).

pub mod header;
pub mod image;
pub mod value;

pub use header::{Card, Header};
pub use image::{read_image, write_image, Image};
pub use value::Value;

/// FITS block size in bytes.
pub const BLOCK_SIZE: usize = 2880;

/// FITS card size in bytes.
pub const CARD_SIZE: usize = 80;

/// Number of cards in one block.
pub const CARDS_PER_BLOCK: usize = BLOCK_SIZE / CARD_SIZE;
