//! Lock-serialized panel interface
//!
//! Key events arrive from several timer threads (one debounce and one
//! long-press timer per button). [`Interface`] funnels all of them through
//! one lock that guards the menu state and the display, so a long-press and
//! a click can never interleave halfway through a redraw.
//!
//! While the menu is closed the display shows the idle view, one measurement
//! per page, advanced by [`Interface::rotate_idle`].

use std::sync::{Arc, Mutex, MutexGuard};

use airpanel_display::{Batch, Display, DisplayError, Key, KeyEvent};
use log::{debug, info, warn};

use crate::config::ConfigSection;
use crate::menu::{MenuEngine, Redraw};
use crate::sensors::{Readings, SensorKind};
use crate::sync::lock;

/// Measurement pages shown while the menu is closed
pub struct IdleView {
    readings: Arc<Readings>,
    flags: ConfigSection,
    page: usize,
}

impl IdleView {
    /// Create a new idle view; `flags` is the display settings section
    pub fn new(readings: Arc<Readings>, flags: ConfigSection) -> Self {
        Self {
            readings,
            flags,
            page: 0,
        }
    }

    /// Measurements enabled in the display settings
    pub fn visible(&self) -> Vec<SensorKind> {
        SensorKind::ALL
            .into_iter()
            .filter(|kind| self.flags.get_flag(kind.flag_key()))
            .collect()
    }

    /// Measurement on the current page
    pub fn current(&self) -> Option<SensorKind> {
        let visible = self.visible();
        if visible.is_empty() {
            None
        } else {
            Some(visible[self.page % visible.len()])
        }
    }

    /// Move to the next page
    pub fn advance(&mut self) {
        let count = self.visible().len().max(1);
        self.page = (self.page + 1) % count;
    }

    /// Lines of the current page
    pub fn lines(&self) -> Vec<String> {
        match self.current() {
            Some(kind) => vec![kind.name().to_string(), self.readings.format(kind)],
            None => vec!["No measurements".to_string()],
        }
    }

    fn draw(&self, display: &mut dyn Display) -> Result<(), DisplayError> {
        let lines = self.lines();
        let lines: Vec<&str> = lines.iter().map(String::as_str).collect();
        display.print_lines(&lines, None)
    }
}

struct Inner<D> {
    menu: MenuEngine,
    display: D,
    idle: IdleView,
    open: bool,
}

/// Serialization point between buttons, menu and display
pub struct Interface<D: Display> {
    inner: Mutex<Inner<D>>,
}

impl<D: Display> Interface<D> {
    /// Create a new interface; the menu starts closed
    pub fn new(menu: MenuEngine, display: D, idle: IdleView) -> Self {
        Self {
            inner: Mutex::new(Inner {
                menu,
                display,
                idle,
                open: false,
            }),
        }
    }

    /// Handle one debounced key event
    ///
    /// The first key while closed opens the root menu. A long Cancel closes
    /// the menu from any depth; other long presses are ignored.
    pub fn key_press(&self, event: KeyEvent) {
        let mut inner = self.lock();
        let Inner {
            menu,
            display,
            idle,
            open,
        } = &mut *inner;

        if event.long_press {
            if event.key == Key::Cancel && *open {
                info!("menu closed by long cancel");
                menu.close();
                *open = false;
                report(idle.draw(display));
            } else {
                debug!("ignoring long press of {:?}", event.key);
            }
            return;
        }

        if !*open {
            *open = true;
            info!("menu opened");
            menu.open();
            report(menu.redraw(display).map_err(menu_error));
            return;
        }

        match menu.handle_key(event.key, display) {
            Ok(Redraw::Closed) => {
                info!("menu closed");
                *open = false;
                report(idle.draw(display));
            }
            Ok(_) => {}
            Err(e) => warn!("menu redraw failed: {}", e),
        }
    }

    /// Draw the idle view if the menu is closed
    pub fn show_idle(&self) {
        let mut inner = self.lock();
        if !inner.open {
            let Inner { display, idle, .. } = &mut *inner;
            report(idle.draw(display));
        }
    }

    /// Advance the idle view by one page; no-op while the menu is open
    pub fn rotate_idle(&self) {
        let mut inner = self.lock();
        if inner.open {
            return;
        }
        let Inner { display, idle, .. } = &mut *inner;
        idle.advance();
        report(idle.draw(display));
    }

    /// Check if the menu is shown
    pub fn is_open(&self) -> bool {
        self.lock().open
    }

    /// Run `f` with the display, under the interface lock
    pub fn with_display<R>(&self, f: impl FnOnce(&mut D) -> R) -> R {
        f(&mut self.lock().display)
    }

    /// Blank the panel and switch it off
    pub fn close(&self) {
        let mut inner = self.lock();
        inner.open = false;
        let display = &mut inner.display;
        let result = {
            let mut batch = Batch::new(display);
            batch.clear().and_then(|()| batch.finish())
        };
        report(result.and_then(|()| display.turn_off()));
        info!("interface closed");
    }

    fn lock(&self) -> MutexGuard<'_, Inner<D>> {
        lock(&self.inner)
    }
}

fn menu_error(e: crate::menu::MenuError) -> DisplayError {
    match e {
        crate::menu::MenuError::Display(e) => e,
        _ => DisplayError::Communication,
    }
}

fn report(result: Result<(), DisplayError>) {
    if let Err(e) = result {
        warn!("display update failed: {}", e);
    }
}
