//! Navigation input
//!
//! Four push buttons drive the menu. Each debounced press produces a
//! click, and holding the button past the long-press threshold produces a
//! second, long-press event for the same key.

/// Navigation buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// Move the selection up
    Up,
    /// Move the selection down
    Down,
    /// Enter a submenu or activate a leaf
    Ok,
    /// Leave the current submenu
    Cancel,
}

impl Key {
    /// All keys, in panel order
    pub const ALL: [Key; 4] = [Key::Up, Key::Down, Key::Ok, Key::Cancel];

    /// Returns the selection delta for vertical movement (-1, 0, or +1)
    pub fn vertical_delta(&self) -> i8 {
        match self {
            Key::Up => -1,
            Key::Down => 1,
            _ => 0,
        }
    }

    /// Returns true for Up/Down
    pub fn is_vertical(&self) -> bool {
        matches!(self, Key::Up | Key::Down)
    }
}

/// A debounced button event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyEvent {
    /// Which button
    pub key: Key,
    /// `false` for the click on press, `true` for the later long-press
    pub long_press: bool,
}

impl KeyEvent {
    /// Short click
    pub const fn click(key: Key) -> Self {
        Self {
            key,
            long_press: false,
        }
    }

    /// Long press
    pub const fn long(key: Key) -> Self {
        Self {
            key,
            long_press: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertical_delta() {
        assert_eq!(Key::Up.vertical_delta(), -1);
        assert_eq!(Key::Down.vertical_delta(), 1);
        assert_eq!(Key::Ok.vertical_delta(), 0);
        assert_eq!(Key::Cancel.vertical_delta(), 0);
    }

    #[test]
    fn test_is_vertical() {
        assert!(Key::Up.is_vertical());
        assert!(Key::Down.is_vertical());
        assert!(!Key::Ok.is_vertical());
    }

    #[test]
    fn test_event_constructors() {
        assert!(!KeyEvent::click(Key::Ok).long_press);
        assert!(KeyEvent::long(Key::Cancel).long_press);
        assert_eq!(KeyEvent::long(Key::Cancel).key, Key::Cancel);
    }
}
