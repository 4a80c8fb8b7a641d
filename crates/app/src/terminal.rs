use std::io::{self, BufRead};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use tally_import::{PromptEvent, PromptInput, PromptOracle};

/// Stdin lines and Ctrl-C, merged onto one channel.
///
/// Blocking reads on stdin cannot be interrupted, so a reader thread forwards
/// lines and a signal task forwards interrupts while a prompt is waiting.
pub struct TerminalInput {
    events: mpsc::Receiver<PromptEvent>,
    waiting: Arc<AtomicBool>,
    closed: bool,
}

pub type TerminalOracle = PromptOracle<TerminalInput, io::Stdout>;

impl TerminalInput {
    fn new(events: mpsc::Receiver<PromptEvent>, waiting: Arc<AtomicBool>) -> Self {
        Self {
            events,
            waiting,
            closed: false,
        }
    }
}

impl PromptInput for TerminalInput {
    fn next_event(&mut self) -> PromptEvent {
        if self.closed {
            return PromptEvent::Closed;
        }
        self.waiting.store(true, Ordering::SeqCst);
        let event = self.events.recv().unwrap_or(PromptEvent::Closed);
        self.waiting.store(false, Ordering::SeqCst);
        if event == PromptEvent::Closed {
            self.closed = true;
        }
        event
    }
}

/// Starts the stdin reader thread and the Ctrl-C listener on `runtime`.
/// Ctrl-C outside a prompt exits the process.
pub fn spawn(runtime: &tokio::runtime::Runtime) -> TerminalOracle {
    let (tx, rx) = mpsc::channel();
    let waiting = Arc::new(AtomicBool::new(false));

    let lines = tx.clone();
    std::thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if lines.send(PromptEvent::Line(line)).is_err() {
                        return;
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "stdin read failed");
                    break;
                }
            }
        }
        let _ = lines.send(PromptEvent::Closed);
    });

    let prompting = Arc::clone(&waiting);
    runtime.spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if prompting.load(Ordering::SeqCst) {
                if tx.send(PromptEvent::Interrupted).is_err() {
                    break;
                }
            } else {
                tracing::warn!("interrupted");
                std::process::exit(130);
            }
        }
    });

    PromptOracle::new(TerminalInput::new(rx, waiting), io::stdout())
}
