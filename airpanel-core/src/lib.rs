//! Control core for the airpanel appliance
//!
//! This crate contains the logic that coordinates the panel's concurrent
//! pieces without touching hardware directly:
//!
//! - Cancellable, resettable background timers
//! - Debounced push buttons with click/long-press discrimination
//! - Tree menu navigation with a bounded scrolling viewport
//! - Cached settings files with atomic, advisory-locked persistence
//! - Sensor polling driven by the settings
//! - The lock-serialized interface tying buttons, menu and display together

#![deny(unsafe_code)]

pub mod config;
pub mod interface;
pub mod menu;
pub mod sensors;
pub mod switch;
mod sync;
pub mod timer;
