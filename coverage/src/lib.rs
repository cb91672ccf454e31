//! World coverage grid and index file format for DTED tile layouts.
//!
//! A layout run folds every recognized tile into a [`CoverageGrid`],
//! one mask cell per 1°×1° degree square, and persists the result as a
//! versioned, timestamped index file ([`index`]).

mod error;
mod grid;
pub mod index;

pub use crate::{
    error::CoverageError,
    grid::{CoverageGrid, GRID_COLS, GRID_ROWS},
};
