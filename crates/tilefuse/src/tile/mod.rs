//! Tile pyramid coordinates and overzoom arithmetic

pub mod coordinate;

pub use coordinate::{displacement, TileId};
