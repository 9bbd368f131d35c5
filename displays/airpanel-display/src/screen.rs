//! Text row buffer
//!
//! Rows are fixed-capacity strings clipped to the column count, so a
//! display never needs a heap allocation per redraw.

use heapless::String;

/// Widest supported display, in characters
pub const MAX_COLS: usize = 40;

/// Bytes reserved per line (four bytes per UTF-8 character)
const LINE_BYTES: usize = MAX_COLS * 4;

type Line = String<LINE_BYTES>;

/// Rows of text plus one highlight span per row
///
/// Holds the character content and per-row highlight regions of a display
/// with a fixed number of rows and columns.
#[derive(Clone, Debug)]
pub struct Screen {
    /// Row text, at most `cols` characters each
    lines: Vec<Line>,
    /// Highlighted column span per row
    highlights: Vec<Option<(u8, u8)>>,
    /// Characters per row
    cols: usize,
    /// Set by every mutation until the next physical flush
    dirty: bool,
}

impl Screen {
    /// Create a blank buffer
    ///
    /// `cols` is clamped to [`MAX_COLS`].
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            lines: vec![Line::new(); rows],
            highlights: vec![None; rows],
            cols: cols.min(MAX_COLS),
            dirty: true,
        }
    }

    /// Blank every row and drop all highlights
    pub fn clear(&mut self) {
        for line in &mut self.lines {
            line.clear();
        }
        self.clear_all_highlights();
        self.dirty = true;
    }

    /// Replace a row, clipped to the width
    pub fn set_line(&mut self, row: usize, text: &str) {
        if row < self.lines.len() {
            self.lines[row] = clip(text, self.cols);
            self.dirty = true;
        }
    }

    /// Write `text` into a row starting at `col`
    ///
    /// Text left of `col` is kept. With `fill`, the row is padded with
    /// spaces to the right edge; otherwise text after the written span is
    /// kept as well.
    pub fn write(&mut self, row: usize, col: usize, text: &str, fill: bool) {
        if row >= self.lines.len() || col >= self.cols {
            return;
        }

        let mut chars: Vec<char> = self.lines[row].chars().collect();
        if chars.len() < col {
            chars.resize(col, ' ');
        }

        let written: Vec<char> = text.chars().take(self.cols - col).collect();
        let end = col + written.len();
        let tail: Vec<char> = if fill {
            vec![' '; self.cols - end]
        } else {
            chars.iter().skip(end).copied().collect()
        };

        chars.truncate(col);
        chars.extend(written);
        chars.extend(tail);

        let text: std::string::String = chars.into_iter().collect();
        self.lines[row] = clip(&text, self.cols);
        self.dirty = true;
    }

    /// Text of one row
    pub fn get_line(&self, row: usize) -> Option<&str> {
        self.lines.get(row).map(|s| s.as_str())
    }

    /// Highlight columns `start_col..end_col` of a row
    pub fn set_highlight(&mut self, row: usize, start_col: u8, end_col: u8) {
        if row < self.highlights.len() {
            self.highlights[row] = Some((start_col, end_col));
            self.dirty = true;
        }
    }

    /// Remove a row's highlight
    pub fn clear_highlight(&mut self, row: usize) {
        if row < self.highlights.len() {
            self.highlights[row] = None;
            self.dirty = true;
        }
    }

    /// Remove every highlight
    pub fn clear_all_highlights(&mut self) {
        for highlight in &mut self.highlights {
            *highlight = None;
        }
        self.dirty = true;
    }

    /// Highlighted span of a row
    pub fn get_highlight(&self, row: usize) -> Option<(u8, u8)> {
        self.highlights.get(row).copied().flatten()
    }

    /// Drop the top row and open an empty row at the bottom
    pub fn scroll_up(&mut self) {
        if self.lines.is_empty() {
            return;
        }
        self.lines.remove(0);
        self.lines.push(Line::new());
        self.highlights.remove(0);
        self.highlights.push(None);
        self.dirty = true;
    }

    /// Drop the bottom row and open an empty row at the top
    pub fn scroll_down(&mut self) {
        if self.lines.is_empty() {
            return;
        }
        self.lines.pop();
        self.lines.insert(0, Line::new());
        self.highlights.pop();
        self.highlights.insert(0, None);
        self.dirty = true;
    }

    /// Check for changes since the last flush
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Record a flush
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// Force the next flush
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Row texts, top to bottom
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(|s| s.as_str())
    }

    /// Row count
    pub fn rows(&self) -> usize {
        self.lines.len()
    }

    /// Column count
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Get the first highlighted row
    pub fn selection(&self) -> Option<usize> {
        self.highlights.iter().position(|h| h.is_some())
    }
}

/// Truncate `text` to `cols` characters
fn clip(text: &str, cols: usize) -> Line {
    let mut line = Line::new();
    for c in text.chars().take(cols) {
        if line.push(c).is_err() {
            break;
        }
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_line_clips_to_width() {
        let mut screen = Screen::new(4, 8);
        screen.set_line(0, "Temperature");
        assert_eq!(screen.get_line(0), Some("Temperat"));
        screen.set_line(9, "ignored");
        assert_eq!(screen.get_line(9), None);
    }

    #[test]
    fn test_write_with_fill() {
        let mut screen = Screen::new(2, 10);
        screen.set_line(0, "abcdefghij");
        screen.write(0, 2, "XY", true);
        assert_eq!(screen.get_line(0), Some("abXY      "));
    }

    #[test]
    fn test_write_without_fill_keeps_tail() {
        let mut screen = Screen::new(2, 10);
        screen.set_line(0, "abcdefghij");
        screen.write(0, 2, "XY", false);
        assert_eq!(screen.get_line(0), Some("abXYefghij"));
    }

    #[test]
    fn test_write_multibyte() {
        let mut screen = Screen::new(1, 6);
        screen.write(0, 0, "PM1 ✓ extra", false);
        assert_eq!(screen.get_line(0), Some("PM1 ✓ "));
    }

    #[test]
    fn test_scroll_moves_highlight() {
        let mut screen = Screen::new(3, 10);
        screen.set_line(0, "a");
        screen.set_line(1, "b");
        screen.set_line(2, "c");
        screen.set_highlight(2, 0, 10);

        screen.scroll_up();
        assert_eq!(screen.lines().collect::<Vec<_>>(), vec!["b", "c", ""]);
        assert_eq!(screen.selection(), Some(1));

        screen.scroll_down();
        assert_eq!(screen.lines().collect::<Vec<_>>(), vec!["", "b", "c"]);
        assert_eq!(screen.selection(), Some(2));
    }

    #[test]
    fn test_clear_resets_highlights() {
        let mut screen = Screen::new(2, 10);
        screen.set_highlight(1, 0, 10);
        screen.mark_clean();
        screen.clear();
        assert!(screen.is_dirty());
        assert_eq!(screen.selection(), None);
    }
}
