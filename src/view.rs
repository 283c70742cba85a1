//! Two-state view projection over the connection status.
//!
//! The view is never tracked on its own: [`select_view`] maps a status to the
//! view that must be rendered, and [`ViewController`] turns status changes
//! into view transitions for a rendering layer.

use std::time::Duration;

use tokio::sync::watch;

use crate::session::ConnectionStatus;

/// Cross-fade window between views. Cosmetic only.
pub const VIEW_TRANSITION: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum View {
    /// Option pickers and the start button.
    Welcome,
    Session,
}

/// `Connected` renders the session view; every other status renders the welcome view.
pub fn select_view(status: ConnectionStatus) -> View {
    if status.is_connected() {
        View::Session
    } else {
        View::Welcome
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewTransition {
    pub from: View,
    pub to: View,
    pub duration: Duration,
}

/// Emits a [`ViewTransition`] whenever the projected view changes.
pub struct ViewController {
    status: watch::Receiver<ConnectionStatus>,
    rendered: View,
}

impl ViewController {
    pub fn new(mut status: watch::Receiver<ConnectionStatus>) -> Self {
        let rendered = select_view(*status.borrow_and_update());
        Self { status, rendered }
    }

    /// The view for the status as of now.
    pub fn current(&self) -> View {
        select_view(*self.status.borrow())
    }

    /// Last view handed to the rendering layer.
    pub fn rendered(&self) -> View {
        self.rendered
    }

    /// Wait for the next status change that flips the view.
    ///
    /// Status changes that keep the same view (e.g. `Idle -> Connecting`) are
    /// skipped. Returns `None` once the session controller is gone.
    pub async fn next_transition(&mut self) -> Option<ViewTransition> {
        loop {
            self.status.changed().await.ok()?;
            let to = select_view(*self.status.borrow_and_update());
            if to != self.rendered {
                let transition = ViewTransition {
                    from: self.rendered,
                    to,
                    duration: VIEW_TRANSITION,
                };
                self.rendered = to;
                return Some(transition);
            }
        }
    }
}
