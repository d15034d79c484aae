mod app;
mod config;
mod daemon;
mod discovery;
mod error;
mod layout;
mod logging;
mod model;
mod monitor;
mod picker;
mod platform;
mod preview;
mod selection;

use crate::app::{App, Message, UiWork};
use crate::config::{ensure_preferences_file, load_preferences};
use crate::daemon::InputEvent;
use crate::picker::HeadlessPanel;
use clap::{ArgGroup, Parser};
use std::process::ExitCode;
use std::sync::mpsc;
use tracing::{error, info, warn};

#[derive(Debug, Parser)]
#[command(name = "spaces-alt-tab", version, about = "Space-aware window switcher")]
#[command(group(ArgGroup::new("action").args(["show", "show_reverse", "open", "next", "prev", "hide", "focus", "kill"])))]
struct Cli {
    /// Open the picker on the previous window, or advance it
    #[arg(long)]
    show: bool,
    /// Open the picker on the last window, or step back
    #[arg(long)]
    show_reverse: bool,
    /// Open the picker without moving the selection
    #[arg(long)]
    open: bool,
    #[arg(long)]
    next: bool,
    #[arg(long)]
    prev: bool,
    #[arg(long)]
    hide: bool,
    /// Focus the selected window and close the picker
    #[arg(long)]
    focus: bool,
    /// Stop the running daemon
    #[arg(long)]
    kill: bool,
    /// Open the preferences file
    #[arg(long)]
    settings: bool,
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn action(&self) -> Option<InputEvent> {
        let flags = [
            (self.show, InputEvent::Show { step: 1 }),
            (self.show_reverse, InputEvent::Show { step: -1 }),
            (self.open, InputEvent::Show { step: 0 }),
            (self.next, InputEvent::Cycle(1)),
            (self.prev, InputEvent::Cycle(-1)),
            (self.hide, InputEvent::Hide),
            (self.focus, InputEvent::Focus),
            (self.kill, InputEvent::Kill),
        ];
        flags.into_iter().find(|(set, _)| *set).map(|(_, event)| event)
    }
}

fn open_settings() -> ExitCode {
    let path = match ensure_preferences_file() {
        Ok(Some(path)) => path,
        Ok(None) => {
            error!(target: "alt_tab::config", "no configuration directory available");
            return ExitCode::FAILURE;
        }
        Err(error) => {
            error!(target: "alt_tab::config", %error, "failed to create preferences file");
            return ExitCode::FAILURE;
        }
    };
    if let Err(error) = open::that(&path) {
        error!(target: "alt_tab::config", path = %path.display(), %error, "failed to open preferences");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    if cli.settings {
        return open_settings();
    }

    let action = cli.action();

    // If a daemon is alive, forward the command and exit
    if let Some(event) = action {
        if daemon::send(event) {
            return ExitCode::SUCCESS;
        }
    }
    if action == Some(InputEvent::Kill) {
        info!(target: "alt_tab::daemon", "no daemon running");
        return ExitCode::SUCCESS;
    }

    // Otherwise start as daemon
    let (tx, rx) = mpsc::channel();
    let ui_work = UiWork::default();
    match daemon::start_listener(tx.clone(), ui_work.clone()) {
        Ok(true) => {}
        Ok(false) => {
            if let Some(event) = action {
                daemon::send(event);
            }
            return ExitCode::SUCCESS;
        }
        Err(error) => {
            error!(target: "alt_tab::daemon", %error, "failed to start listener");
            return ExitCode::FAILURE;
        }
    }

    let server = match platform::create() {
        Ok(server) => server,
        Err(error) => {
            error!(target: "alt_tab::platform", %error, "window server unavailable");
            daemon::cleanup();
            return ExitCode::FAILURE;
        }
    };

    if let Some(event) = action {
        if tx.send(Message::Input(event)).is_err() {
            warn!(target: "alt_tab::daemon", "inbox closed before startup");
        }
    }
    drop(tx);

    let app = App::new(server, HeadlessPanel::default(), load_preferences(), ui_work);
    picker::run::run_app(app, rx);
    daemon::cleanup();
    ExitCode::SUCCESS
}
