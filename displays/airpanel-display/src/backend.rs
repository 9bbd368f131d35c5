//! Display backend trait
//!
//! Defines the interface for different display types.

use core::ops::{Deref, DerefMut};

use log::warn;
use thiserror::Error;

/// Display backend errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DisplayError {
    /// Communication error with display
    #[error("display communication error")]
    Communication,
    /// Row index outside the display
    #[error("row {0} is outside the display")]
    InvalidRow(usize),
    /// Display not initialized
    #[error("display not initialized")]
    NotInitialized,
}

/// RGB colour for foreground/background setters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color(pub u8, pub u8, pub u8);

impl Color {
    pub const WHITE: Color = Color(0xff, 0xff, 0xff);
    pub const BLACK: Color = Color(0, 0, 0);
    pub const BLUE: Color = Color(0, 0, 0xff);
}

/// Display backend trait
///
/// Provides a hardware-agnostic, row-oriented interface. Every drawing call
/// may be deferred until the next [`flush`](Display::flush); while a batch is
/// open the physical flush is suppressed, so a group of row updates becomes
/// visible as a single frame.
pub trait Display: Send {
    /// Number of text rows
    fn rows(&self) -> usize;

    /// Number of text columns
    fn cols(&self) -> usize;

    /// Clear the entire display
    fn clear(&mut self) -> Result<(), DisplayError>;

    /// Replace the whole screen with `lines`
    ///
    /// Rows beyond `lines.len()` are blanked. `highlight` selects one row to
    /// draw inverted.
    fn print_lines(&mut self, lines: &[&str], highlight: Option<usize>) -> Result<(), DisplayError>;

    /// Rewrite a single row
    ///
    /// - `col`: first column written
    /// - `highlight`: draw the written text inverted
    /// - `fill`: pad with spaces up to the right edge
    fn update_row(
        &mut self,
        row: usize,
        text: &str,
        col: usize,
        highlight: bool,
        fill: bool,
    ) -> Result<(), DisplayError>;

    /// Write `text` into the bottom row, scrolling everything up first when
    /// `scroll` is set
    fn push_back(&mut self, text: &str, highlight: bool, scroll: bool) -> Result<(), DisplayError>;

    /// Write `text` into the top row, scrolling everything down first when
    /// `scroll` is set
    fn push_front(&mut self, text: &str, highlight: bool, scroll: bool)
        -> Result<(), DisplayError>;

    /// Switch the backlight and panel on
    fn turn_on(&mut self) -> Result<(), DisplayError>;

    /// Switch the backlight and panel off
    fn turn_off(&mut self) -> Result<(), DisplayError>;

    /// Reinitialise the panel
    fn reset(&mut self) -> Result<(), DisplayError>;

    /// Set the text colour
    fn set_foreground(&mut self, color: Color) -> Result<(), DisplayError>;

    /// Set the background colour
    fn set_background(&mut self, color: Color) -> Result<(), DisplayError>;

    /// Open a batch; nested batches are counted
    fn begin_batch(&mut self);

    /// Close a batch; closing the outermost one flushes
    fn end_batch(&mut self) -> Result<(), DisplayError>;

    /// Push buffered content to the panel unless a batch is open
    fn flush(&mut self) -> Result<(), DisplayError>;
}

/// Batch scope guard
///
/// Opens a batch on creation and closes it when dropped. Use
/// [`finish`](Batch::finish) to observe the error of the final flush.
pub struct Batch<'a, D: Display + ?Sized> {
    display: &'a mut D,
    open: bool,
}

impl<'a, D: Display + ?Sized> Batch<'a, D> {
    /// Open a batch on `display`
    pub fn new(display: &'a mut D) -> Self {
        display.begin_batch();
        Self {
            display,
            open: true,
        }
    }

    /// Close the batch and report the flush result
    pub fn finish(mut self) -> Result<(), DisplayError> {
        self.open = false;
        self.display.end_batch()
    }
}

impl<D: Display + ?Sized> Deref for Batch<'_, D> {
    type Target = D;

    fn deref(&self) -> &D {
        self.display
    }
}

impl<D: Display + ?Sized> DerefMut for Batch<'_, D> {
    fn deref_mut(&mut self) -> &mut D {
        self.display
    }
}

impl<D: Display + ?Sized> Drop for Batch<'_, D> {
    fn drop(&mut self) {
        if self.open {
            if let Err(e) = self.display.end_batch() {
                warn!("display flush at end of batch failed: {}", e);
            }
        }
    }
}
