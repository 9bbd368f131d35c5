//! Tree menu navigation
//!
//! The menu is a tree of [`MenuItem`]s: lists that can be entered and leaves
//! that run an action. [`MenuEngine`] flattens the tree into an arena with
//! parent links and walks it with the four navigation keys, keeping the
//! selected row inside a viewport as tall as the display.
//!
//! Each key press yields a [`Redraw`] naming the smallest set of rows that
//! changed:
//!
//! | Event                         | Redraw                         |
//! |-------------------------------|--------------------------------|
//! | Up/Down inside the viewport   | two rows (old and new highlight) |
//! | Up/Down scrolling             | whole viewport                 |
//! | Confirm on a list             | whole viewport of the child    |
//! | Confirm on a leaf (relabel)   | that one row                   |
//! | Cancel below the root         | whole viewport of the parent   |
//! | Cancel at the root            | closed                         |

mod engine;
mod leaf;
mod tree;

use airpanel_display::DisplayError;
use thiserror::Error;

pub use engine::{MenuEngine, Redraw};
pub use leaf::{FrequencyChoice, LeafAction, OnOffSetting, Toggle, TICK};
pub use tree::{MenuItem, NodeId};

/// Menu errors
#[derive(Debug, Error)]
pub enum MenuError {
    /// The root of a menu must be a list
    #[error("menu root must be a list")]
    RootNotList,
    /// The viewport needs at least one row
    #[error("menu viewport needs at least one row")]
    ZeroRows,
    /// Drawing failed
    #[error("display error: {0}")]
    Display(#[from] DisplayError),
}
