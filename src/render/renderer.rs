// src/render/renderer.rs

//! Background status table renderer.
//!
//! The renderer runs on its own OS thread and only ever reads the status
//! table through [`StatusTable::snapshot`], so it cannot hold up the master
//! for longer than one snapshot copy.
//!
//! The table goes to stdout so it never erases log lines, which tracing
//! writes to stderr. When stdout is not a terminal only the final table is
//! printed.

use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use console::Term;
use tracing::{debug, warn};

use crate::engine::StatusTable;
use crate::errors::Result;
use crate::types::VerbosityType;

use super::table::format_rows;

/// Draws the table and remembers how many lines to clear on the next pass.
#[derive(Debug)]
struct Painter {
    status: Arc<StatusTable>,
    term: Term,
    drawn: usize,
    failed: bool,
}

impl Painter {
    fn draw(&mut self) {
        let lines = format_rows(&self.status.snapshot());
        if let Err(e) = self.redraw(&lines) {
            // Report once; a closed terminal stays closed.
            if !self.failed {
                warn!(error = %e, "writing status table failed");
                self.failed = true;
            }
        }
    }

    fn redraw(&mut self, lines: &[String]) -> std::io::Result<()> {
        if self.drawn > 0 {
            self.term.clear_last_lines(self.drawn)?;
            self.drawn = 0;
        }
        for line in lines {
            self.term.write_line(line)?;
            self.drawn += 1;
        }
        self.term.flush()
    }
}

/// Handle to the running renderer thread.
#[derive(Debug)]
pub struct Renderer {
    stop_tx: mpsc::Sender<()>,
    handle: Option<JoinHandle<Painter>>,
}

impl Renderer {
    /// Draw the table once and keep redrawing it every `interval` on stdout.
    ///
    /// Returns `None` when `verbosity` disables rendering.
    pub fn spawn(
        status: Arc<StatusTable>,
        verbosity: VerbosityType,
        interval: Duration,
    ) -> Result<Option<Self>> {
        Self::spawn_on(Term::stdout(), status, verbosity, interval)
    }

    /// Like [`Renderer::spawn`], drawing on `term`.
    pub fn spawn_on(
        term: Term,
        status: Arc<StatusTable>,
        verbosity: VerbosityType,
        interval: Duration,
    ) -> Result<Option<Self>> {
        if verbosity == VerbosityType::None {
            return Ok(None);
        }

        let live = term.is_term();
        let mut painter = Painter {
            status,
            term,
            drawn: 0,
            failed: false,
        };
        if live {
            painter.draw();
        }

        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let handle = thread::Builder::new()
            .name("dagmaster-render".to_string())
            .spawn(move || {
                // The timeout doubles as the redraw interval.
                while let Err(RecvTimeoutError::Timeout) = stop_rx.recv_timeout(interval) {
                    if live {
                        painter.draw();
                    }
                }
                painter
            })?;

        debug!(?interval, live, "status renderer started");
        Ok(Some(Self {
            stop_tx,
            handle: Some(handle),
        }))
    }

    /// Stop the thread and draw the final table.
    pub fn finish(mut self) {
        if let Some(mut painter) = self.stop() {
            painter.draw();
        }
    }

    fn stop(&mut self) -> Option<Painter> {
        let handle = self.handle.take()?;
        // The receiver only disappears if the thread already exited.
        let _ = self.stop_tx.send(());
        match handle.join() {
            Ok(painter) => Some(painter),
            Err(_) => {
                warn!("status renderer thread panicked");
                None
            }
        }
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        self.stop();
    }
}
