use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::watch;

use crate::toast::{Notifier, Toast};

/// Process-wide toast publisher.
///
/// Backed by a watch channel: the latest broadcast replaces any toast the
/// display has not rendered yet. There is exactly one consumer, handed out
/// by [`ToastChannel::display`].
pub struct ToastChannel {
    tx: watch::Sender<Option<Toast>>,
    rx: Mutex<Option<watch::Receiver<Option<Toast>>>>,
}

impl ToastChannel {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(None);
        Self {
            tx,
            rx: Mutex::new(Some(rx)),
        }
    }

    /// Most recent toast broadcast on this channel.
    pub fn latest(&self) -> Option<Toast> {
        self.tx.borrow().clone()
    }

    /// Build the single display for this channel. Returns `None` once the
    /// display has already been taken.
    pub fn display<R: ToastRenderer>(
        &self,
        renderer: R,
        duration: Duration,
    ) -> Option<ToastDisplay<R>> {
        let rx = self.rx.lock().unwrap_or_else(|e| e.into_inner()).take()?;
        Some(ToastDisplay {
            rx,
            renderer,
            duration,
        })
    }
}

impl Default for ToastChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for ToastChannel {
    fn notify(&self, toast: Toast) {
        tracing::debug!(severity = %toast.severity, message = %toast.message, "toast broadcast");
        self.tx.send_replace(Some(toast));
    }
}

/// Presentation side of the toast channel.
pub trait ToastRenderer: Send {
    fn show(&mut self, toast: &Toast);

    fn clear(&mut self);
}

/// The single subscriber: shows each toast for a fixed duration, then clears
/// it. A newer toast replaces the visible one and restarts the timer.
pub struct ToastDisplay<R> {
    rx: watch::Receiver<Option<Toast>>,
    renderer: R,
    duration: Duration,
}

impl<R: ToastRenderer> ToastDisplay<R> {
    /// Run until every publisher is gone. Returns the renderer.
    pub async fn run(mut self) -> R {
        while self.rx.changed().await.is_ok() {
            let Some(mut toast) = self.rx.borrow_and_update().clone() else {
                continue;
            };

            loop {
                self.renderer.show(&toast);

                tokio::select! {
                    _ = tokio::time::sleep(self.duration) => {
                        self.renderer.clear();
                        break;
                    }
                    changed = self.rx.changed() => {
                        if changed.is_err() {
                            self.renderer.clear();
                            return self.renderer;
                        }
                        let next = self.rx.borrow_and_update().clone();
                        match next {
                            Some(next) => toast = next,
                            None => {
                                self.renderer.clear();
                                break;
                            }
                        }
                    }
                }
            }
        }

        self.renderer
    }
}
