//! Terminal stand-in for the panel and its buttons

use std::io::{self, BufRead, Write};
use std::thread;
use std::time::Duration;

use airpanel_display::text::Presenter;
use airpanel_display::{Key, Screen};
use airpanel_hal::{Level, SimGpio};
use log::{debug, warn};

use crate::device::pin_for;
use crate::signal;

/// Press time of a click; longer than the debounce window
const CLICK: Duration = Duration::from_millis(150);

/// Press time of a long press; longer than the long-press delay
const HOLD: Duration = Duration::from_millis(700);

/// Render the screen as terminal lines, `>` marking highlighted rows
pub fn render(screen: &Screen) -> String {
    let mut out = String::new();
    for (row, line) in screen.lines().enumerate() {
        let marker = if screen.get_highlight(row).is_some() { '>' } else { ' ' };
        out.push(marker);
        out.push_str(line);
        out.push('\n');
    }
    out
}

/// Presenter that repaints the terminal on every frame
pub fn presenter() -> Presenter {
    Box::new(|screen: &Screen| {
        let mut stdout = io::stdout().lock();
        let result = write!(stdout, "\x1b[2J\x1b[H{}", render(screen)).and_then(|()| stdout.flush());
        if let Err(e) = result {
            warn!("console paint failed: {}", e);
        }
    })
}

/// One console key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Input {
    Press(Key, Duration),
    Quit,
}

fn parse(c: char) -> Option<Input> {
    match c {
        'u' => Some(Input::Press(Key::Up, CLICK)),
        'd' => Some(Input::Press(Key::Down, CLICK)),
        'o' => Some(Input::Press(Key::Ok, CLICK)),
        'c' => Some(Input::Press(Key::Cancel, CLICK)),
        'C' => Some(Input::Press(Key::Cancel, HOLD)),
        'q' => Some(Input::Quit),
        _ => None,
    }
}

/// Hold a button pin high for `time`, then release it
fn press(gpio: &SimGpio, key: Key, time: Duration) {
    let pin = pin_for(key);
    gpio.drive(pin, Level::High);
    thread::sleep(time);
    gpio.drive(pin, Level::Low);
    // Let the release settle before the next press
    thread::sleep(CLICK);
}

/// Read keys from stdin on a background thread and drive the button pins
pub fn spawn_input(gpio: &SimGpio) -> io::Result<()> {
    let gpio = gpio.clone();
    thread::Builder::new()
        .name("console-input".into())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        warn!("console input failed: {}", e);
                        break;
                    }
                };
                for c in line.chars().filter(|c| !c.is_whitespace()) {
                    match parse(c) {
                        Some(Input::Press(key, time)) => press(&gpio, key, time),
                        Some(Input::Quit) => {
                            signal::request_stop();
                            return;
                        }
                        None => debug!("unknown console key {:?}", c),
                    }
                }
            }
            debug!("console input closed");
        })?;
    Ok(())
}
