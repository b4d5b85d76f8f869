//! Terminal front-end
//!
//! A thin shell over the session runtime: keys are turned into events,
//! published snapshots are drawn.

pub mod app;
mod view;

pub use app::{Action, App, Focus};

use crate::runtime::{SessionHandle, SessionUpdate};
use crossterm::{
    event::{Event as TermEvent, EventStream},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures::StreamExt;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, Stdout};
use tokio::sync::broadcast::{self, error::RecvError};

type Term = Terminal<CrosstermBackend<Stdout>>;

/// Run the interface until the learner quits or the session closes.
/// `updates` should be subscribed before the runtime starts.
pub async fn run(
    handle: SessionHandle,
    updates: broadcast::Receiver<SessionUpdate>,
) -> io::Result<()> {
    let mut terminal = setup_terminal()?;
    let result = event_loop(&mut terminal, &handle, updates).await;
    restore_terminal(&mut terminal)?;
    result
}

fn setup_terminal() -> io::Result<Term> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    Terminal::new(CrosstermBackend::new(stdout))
}

fn restore_terminal(terminal: &mut Term) -> io::Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()
}

async fn event_loop(
    terminal: &mut Term,
    handle: &SessionHandle,
    mut updates: broadcast::Receiver<SessionUpdate>,
) -> io::Result<()> {
    let mut app = App::new();
    let mut keys = EventStream::new();

    loop {
        terminal.draw(|frame| view::render(frame, &app))?;

        tokio::select! {
            update = updates.recv() => match update {
                Ok(update) => {
                    if !app.apply_update(update) {
                        return Ok(());
                    }
                }
                // A newer snapshot follows any dropped one
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "View lagged behind session updates");
                }
                Err(RecvError::Closed) => return Ok(()),
            },

            term_event = keys.next() => match term_event {
                Some(Ok(TermEvent::Key(key))) => match app.handle_key(key) {
                    Action::None => {}
                    Action::Send(event) => {
                        if handle.send(event).await.is_err() {
                            return Ok(());
                        }
                    }
                    Action::Quit => return Ok(()),
                },
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e),
                None => return Ok(()),
            },
        }
    }
}
