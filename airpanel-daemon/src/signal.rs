//! Termination signal flag

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};

use log::debug;

static STOP: AtomicBool = AtomicBool::new(false);

/// Set by SIGINT/SIGTERM (and the console `q` key)
pub fn stop_flag() -> &'static AtomicBool {
    &STOP
}

/// Request shutdown from inside the process
pub fn request_stop() {
    STOP.store(true, Ordering::SeqCst);
}

extern "C" fn on_signal(_signal: libc::c_int) {
    STOP.store(true, Ordering::SeqCst);
}

/// Route SIGINT and SIGTERM to the stop flag
#[allow(unsafe_code)]
pub fn install() -> io::Result<()> {
    for signal in [libc::SIGINT, libc::SIGTERM] {
        let handler = on_signal as extern "C" fn(libc::c_int) as libc::sighandler_t;
        // SAFETY: the handler only stores to an atomic, which is async-signal-safe
        let previous = unsafe { libc::signal(signal, handler) };
        if previous == libc::SIG_ERR {
            return Err(io::Error::last_os_error());
        }
    }
    debug!("signal handlers installed");
    Ok(())
}
