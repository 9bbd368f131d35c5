//! In-memory text display
//!
//! [`TextDisplay`] implements [`Display`] on top of a [`Screen`]. Each
//! physical flush is counted and optionally handed to a presenter closure,
//! which is how the console build paints the buffer to a terminal.

use log::trace;

use crate::backend::{Color, Display, DisplayError};
use crate::screen::Screen;

/// Called with the screen on every physical flush
pub type Presenter = Box<dyn FnMut(&Screen) + Send>;

/// Text display backed by a [`Screen`] buffer
pub struct TextDisplay {
    screen: Screen,
    /// Open batch depth; flushes are suppressed while non-zero
    batch_depth: usize,
    /// Number of frames pushed to the presenter
    frames: u64,
    backlight: bool,
    foreground: Color,
    background: Color,
    presenter: Option<Presenter>,
}

impl TextDisplay {
    /// Create a display with `rows` x `cols` characters
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            screen: Screen::new(rows, cols),
            batch_depth: 0,
            frames: 0,
            backlight: true,
            foreground: Color::WHITE,
            background: Color::BLUE,
            presenter: None,
        }
    }

    /// Install a presenter invoked on every physical flush
    pub fn with_presenter(mut self, presenter: Presenter) -> Self {
        self.presenter = Some(presenter);
        self
    }

    /// Current buffer content
    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    /// Content of one row
    pub fn line(&self, row: usize) -> &str {
        self.screen.get_line(row).unwrap_or("")
    }

    /// First highlighted row
    pub fn highlighted(&self) -> Option<usize> {
        self.screen.selection()
    }

    /// Number of physical flushes so far
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Backlight state
    pub fn is_on(&self) -> bool {
        self.backlight
    }

    /// Current (foreground, background) colours
    pub fn colors(&self) -> (Color, Color) {
        (self.foreground, self.background)
    }

    /// Render the buffer as plain text, `>` marking highlighted rows
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (row, line) in self.screen.lines().enumerate() {
            let marker = if self.screen.get_highlight(row).is_some() {
                '>'
            } else {
                ' '
            };
            out.push(marker);
            out.push_str(line);
            out.push('\n');
        }
        out
    }

    fn check_row(&self, row: usize) -> Result<(), DisplayError> {
        if row < self.screen.rows() {
            Ok(())
        } else {
            Err(DisplayError::InvalidRow(row))
        }
    }

    fn full_width(&self) -> u8 {
        self.screen.cols() as u8
    }

    fn present(&mut self) {
        if !self.screen.is_dirty() {
            return;
        }
        self.frames += 1;
        trace!("text display frame {}", self.frames);
        if let Some(presenter) = self.presenter.as_mut() {
            presenter(&self.screen);
        }
        self.screen.mark_clean();
    }
}

impl Display for TextDisplay {
    fn rows(&self) -> usize {
        self.screen.rows()
    }

    fn cols(&self) -> usize {
        self.screen.cols()
    }

    fn clear(&mut self) -> Result<(), DisplayError> {
        self.screen.clear();
        self.flush()
    }

    fn print_lines(&mut self, lines: &[&str], highlight: Option<usize>) -> Result<(), DisplayError> {
        self.screen.clear();
        for (row, line) in lines.iter().take(self.screen.rows()).enumerate() {
            self.screen.set_line(row, line);
        }
        if let Some(row) = highlight.filter(|&row| row < self.screen.rows()) {
            let width = self.full_width();
            self.screen.set_highlight(row, 0, width);
        }
        self.flush()
    }

    fn update_row(
        &mut self,
        row: usize,
        text: &str,
        col: usize,
        highlight: bool,
        fill: bool,
    ) -> Result<(), DisplayError> {
        self.check_row(row)?;
        self.screen.write(row, col, text, fill);
        if highlight {
            let width = self.full_width();
            self.screen.set_highlight(row, col as u8, width);
        } else {
            self.screen.clear_highlight(row);
        }
        self.flush()
    }

    fn push_back(&mut self, text: &str, highlight: bool, scroll: bool) -> Result<(), DisplayError> {
        let Some(last) = self.screen.rows().checked_sub(1) else {
            return Err(DisplayError::NotInitialized);
        };
        if scroll {
            self.screen.scroll_up();
        }
        self.update_row(last, text, 0, highlight, true)
    }

    fn push_front(
        &mut self,
        text: &str,
        highlight: bool,
        scroll: bool,
    ) -> Result<(), DisplayError> {
        if self.screen.rows() == 0 {
            return Err(DisplayError::NotInitialized);
        }
        if scroll {
            self.screen.scroll_down();
        }
        self.update_row(0, text, 0, highlight, true)
    }

    fn turn_on(&mut self) -> Result<(), DisplayError> {
        self.backlight = true;
        self.screen.mark_dirty();
        self.flush()
    }

    fn turn_off(&mut self) -> Result<(), DisplayError> {
        self.backlight = false;
        Ok(())
    }

    fn reset(&mut self) -> Result<(), DisplayError> {
        self.batch_depth = 0;
        self.foreground = Color::WHITE;
        self.background = Color::BLUE;
        self.screen.clear();
        self.flush()
    }

    fn set_foreground(&mut self, color: Color) -> Result<(), DisplayError> {
        self.foreground = color;
        self.screen.mark_dirty();
        Ok(())
    }

    fn set_background(&mut self, color: Color) -> Result<(), DisplayError> {
        self.background = color;
        self.screen.mark_dirty();
        Ok(())
    }

    fn begin_batch(&mut self) {
        self.batch_depth += 1;
    }

    fn end_batch(&mut self) -> Result<(), DisplayError> {
        self.batch_depth = self.batch_depth.saturating_sub(1);
        self.flush()
    }

    fn flush(&mut self) -> Result<(), DisplayError> {
        if self.batch_depth == 0 {
            self.present();
        }
        Ok(())
    }
}
