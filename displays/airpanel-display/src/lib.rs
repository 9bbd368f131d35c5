//! Display abstraction traits and shared components for airpanel
//!
//! This crate provides:
//! - `Display` trait, the row-oriented interface the menu renders through
//! - `Batch` scope guard that coalesces several row updates into one frame
//! - `Key` enum for the four navigation buttons
//! - `Screen` character buffer and the in-memory `TextDisplay`
//!
//! # Architecture
//!
//! The core never draws pixels. It addresses the display as a grid of text
//! rows and asks for a row to be rewritten, highlighted, or scrolled in.
//! A panel driver (SPI LCD, OLED, terminal) implements [`Display`]; the
//! in-memory [`TextDisplay`] implements it for tests and the console build.

#![deny(unsafe_code)]

pub mod backend;
pub mod input;
pub mod screen;
pub mod text;

// Re-export key types
pub use backend::{Batch, Color, Display, DisplayError};
pub use input::{Key, KeyEvent};
pub use screen::{Screen, MAX_COLS};
pub use text::TextDisplay;
