//! The coordination thread's loop: drain the inbox, fire due continuations,
//! poll the window server, then sleep until the next deadline.

use crate::app::{App, Message};
use crate::config::{load_preferences, Preferences};
use crate::daemon::InputEvent;
use crate::discovery::watcher::WindowWatcher;
use crate::monitor::AdaptivePoller;
use crate::picker::PanelView;
use crate::platform::WindowServer;
use crate::selection::SummonState;
use std::sync::mpsc::{Receiver, RecvTimeoutError, TryRecvError};
use std::time::Instant;
use tracing::{debug, info, trace};

pub(crate) struct RunLoop<S, P> {
    app: App<S, P>,
    rx: Receiver<Message>,
    watcher: WindowWatcher,
    poller: AdaptivePoller,
    next_poll: Instant,
    reload: fn() -> Preferences,
}

impl<S: WindowServer, P: PanelView> RunLoop<S, P> {
    pub(crate) fn new(mut app: App<S, P>, rx: Receiver<Message>, reload: fn() -> Preferences, now: Instant) -> Self {
        let polling = &app.preferences().polling;
        let poller = AdaptivePoller::new(polling.min_interval(), polling.max_interval(), polling.strategy);
        let mut watcher = WindowWatcher::default();
        watcher.prime(app.server());
        app.start(now);
        Self {
            next_poll: now + poller.current(),
            app,
            rx,
            watcher,
            poller,
            reload,
        }
    }

    /// Runs until a kill command arrives or every sender is gone.
    pub(crate) fn run(mut self) -> App<S, P> {
        loop {
            if !self.turn(Instant::now()) || !self.wait() {
                break;
            }
        }
        info!(target: "alt_tab::run", "coordination loop stopped");
        self.app
    }

    /// One non-blocking iteration. False once the loop should stop.
    pub(crate) fn turn(&mut self, now: Instant) -> bool {
        loop {
            match self.rx.try_recv() {
                Ok(message) => {
                    if !self.dispatch(message, now) {
                        return false;
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => return false,
            }
        }

        self.app.run_deferred(now);

        if now >= self.next_poll {
            let events = self.watcher.poll(self.app.server());
            let changed = !events.is_empty();
            for event in events {
                self.dispatch(Message::Os(event), now);
            }
            if self.app.state() == SummonState::Idle {
                self.poller.tick(changed);
            } else {
                self.poller.hurry();
            }
            self.next_poll = now + self.poller.current();
            trace!(target: "alt_tab::run", interval_ms = self.poller.current().as_millis() as u64, "polled");
        }
        true
    }

    fn wait(&mut self) -> bool {
        let deadline = self
            .app
            .next_deadline()
            .map_or(self.next_poll, |d| d.min(self.next_poll));
        let timeout = deadline.saturating_duration_since(Instant::now());
        match self.rx.recv_timeout(timeout) {
            Ok(message) => self.dispatch(message, Instant::now()),
            Err(RecvTimeoutError::Timeout) => true,
            Err(RecvTimeoutError::Disconnected) => false,
        }
    }

    fn dispatch(&mut self, message: Message, now: Instant) -> bool {
        match message {
            Message::Input(InputEvent::Kill) => {
                info!(target: "alt_tab::run", "kill requested");
                self.app.hide_ui();
                false
            }
            Message::Input(InputEvent::Show { step }) if self.app.state() == SummonState::Idle => {
                let prefs = (self.reload)();
                let polling = &prefs.polling;
                self.poller
                    .reconfigure(polling.min_interval(), polling.max_interval(), polling.strategy);
                self.app.set_preferences(prefs);
                self.poller.hurry();
                self.next_poll = self.next_poll.min(now + self.poller.current());
                debug!(target: "alt_tab::run", "preferences reloaded");
                self.app.handle(Message::Input(InputEvent::Show { step }), now);
                true
            }
            message => {
                self.app.handle(message, now);
                true
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn app(&self) -> &App<S, P> {
        &self.app
    }
}

pub(crate) fn run_app<S: WindowServer, P: PanelView>(app: App<S, P>, rx: Receiver<Message>) -> App<S, P> {
    RunLoop::new(app, rx, load_preferences, Instant::now()).run()
}
