//! airpanel Hardware Abstraction Layer
//!
//! This crate defines the GPIO collaborator the control core talks to.
//! The core never binds pins electrically; it only configures inputs,
//! samples levels and subscribes to edge notifications.
//!
//! # Layers
//!
//! `airpanel-core` debounces buttons on top of the [`Gpio`] trait. A board
//! binding implements it for real pins; [`SimGpio`] implements it in memory
//! for tests and the console build, delivering edges on the caller's thread.
//!
//! # Traits
//!
//! - [`gpio::Gpio`] - pin configuration, level reads, edge subscriptions
//! - [`gpio::EdgeSubscription`] - cancellable handle for a registered callback

#![deny(unsafe_code)]

pub mod gpio;
pub mod sim;

// Re-export key types at crate root for convenience
pub use gpio::{Edge, EdgeCallback, EdgeSubscription, Gpio, GpioError, Level, PinMode, Pull};
pub use sim::SimGpio;
