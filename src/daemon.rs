//! Global-shortcut bridge. The hotkey daemon (or a second invocation of
//! this binary) writes commands to the plugin socket; the listener hands
//! them to a forwarder thread that cancels in-flight UI work and feeds the
//! inbox.

use crate::app::{Message, UiWork};
use crate::error::Result;
use crate::selection::GridDirection;
use qol_plugin_api::daemon::{self as core_daemon, DaemonConfig, ReadResult};
use std::sync::mpsc::{self, Sender};
use std::thread;
use tracing::{debug, info};

const CONFIG: DaemonConfig = DaemonConfig {
    default_socket_name: "spaces-alt-tab.sock",
    use_tmpdir_env: true,
    support_replace_existing: false,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    /// Open the picker with the cursor `step` away from the front window,
    /// or move the cursor when it is already open.
    Show { step: isize },
    Cycle(isize),
    Move(GridDirection),
    Hide,
    Focus,
    Kill,
}

impl InputEvent {
    /// Line understood by the listener.
    pub fn command(&self) -> &'static str {
        match self {
            InputEvent::Show { step } if *step < 0 => "show-reverse",
            InputEvent::Show { step: 0 } => "open",
            InputEvent::Show { .. } => "show",
            InputEvent::Cycle(step) if *step < 0 => "prev",
            InputEvent::Cycle(_) => "next",
            InputEvent::Move(GridDirection::Left) => "left",
            InputEvent::Move(GridDirection::Right) => "right",
            InputEvent::Move(GridDirection::Up) => "up",
            InputEvent::Move(GridDirection::Down) => "down",
            InputEvent::Hide => "hide",
            InputEvent::Focus => "focus",
            InputEvent::Kill => "kill",
        }
    }
}

fn parse_command(cmd: &str) -> ReadResult<InputEvent> {
    let event = match cmd.trim() {
        "ping" => return ReadResult::Handled,
        "show" => InputEvent::Show { step: 1 },
        "show-reverse" => InputEvent::Show { step: -1 },
        "open" => InputEvent::Show { step: 0 },
        "next" => InputEvent::Cycle(1),
        "prev" => InputEvent::Cycle(-1),
        "left" => InputEvent::Move(GridDirection::Left),
        "right" => InputEvent::Move(GridDirection::Right),
        "up" => InputEvent::Move(GridDirection::Up),
        "down" => InputEvent::Move(GridDirection::Down),
        "hide" => InputEvent::Hide,
        "focus" => InputEvent::Focus,
        "kill" => InputEvent::Kill,
        _ => return ReadResult::Fallback,
    };
    ReadResult::Command(event)
}

/// Forward one command to a running daemon. False when none answers.
pub fn send(event: InputEvent) -> bool {
    match event {
        InputEvent::Kill => core_daemon::send_kill(&CONFIG),
        event => core_daemon::send_action(&CONFIG, event.command(), false),
    }
}

/// Bind the socket and start the forwarder. `Ok(false)` when another daemon
/// already owns the socket.
pub fn start_listener(tx: Sender<Message>, ui_work: UiWork) -> Result<bool> {
    listen(&CONFIG, tx, ui_work)
}

fn listen(config: &'static DaemonConfig, tx: Sender<Message>, ui_work: UiWork) -> Result<bool> {
    let (events_tx, events_rx) = mpsc::channel::<InputEvent>();
    thread::Builder::new()
        .name("alt-tab-input".into())
        .spawn(move || {
            while let Ok(event) = events_rx.recv() {
                if !forward(event, &tx, &ui_work) {
                    break;
                }
            }
            debug!(target: "alt_tab::daemon", "forwarder stopped");
        })?;

    if !core_daemon::start_listener(config, events_tx, parse_command) {
        return Ok(false);
    }
    info!(target: "alt_tab::daemon", socket = config.default_socket_name, "listening");
    Ok(true)
}

/// Hide and focus stop any refresh still running before they are queued.
/// Returns false once the coordination thread has gone away.
fn forward(event: InputEvent, tx: &Sender<Message>, ui_work: &UiWork) -> bool {
    if matches!(event, InputEvent::Hide | InputEvent::Focus) {
        ui_work.cancel();
    }
    tx.send(Message::Input(event)).is_ok()
}

pub fn cleanup() {
    core_daemon::cleanup(&CONFIG);
}
