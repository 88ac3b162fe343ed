use shortlist::async_preview::{Preloader, CACHE_SIZE};
use shortlist::cli::{AppConfig, Args};
use shortlist::config::UserConfig;
use shortlist::copier::Copier;
use shortlist::domain::ScanOptions;
use shortlist::error::ShortlistError;
use shortlist::logging;
use shortlist::prompt::Prompter;
use shortlist::session::{establish, Flow, Session, SessionSummary, StartupOptions};
use shortlist::tui::{
    handle_key_event, render_help_overlay, render_welcome_overlay, render_with_preview,
    route_key, ViewState,
};

use crossterm::{
    cursor::Show,
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, IsTerminal};
use std::process::ExitCode;
use std::time::Duration;

/// Input poll interval; also paces spinner frames and copy status updates
const TICK: Duration = Duration::from_millis(25);

fn main() -> ExitCode {
    // Parse command line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        return ExitCode::from(1);
    }

    if let Err(e) = logging::init(args.log_file.as_deref()) {
        eprintln!("Warning: logging disabled: {}", e);
    }

    let mut user_config = UserConfig::load_or_default();

    let config = AppConfig::from_args(args, &user_config);

    match run(&config, &mut user_config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(ShortlistError::NoImages { root }) => {
            println!("No images found in {}", root.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

fn run(config: &AppConfig, user_config: &mut UserConfig) -> shortlist::Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;

    let store = config.resume_store();
    if store.is_none() {
        tracing::warn!("no state directory; position will not be saved");
    }

    let options = StartupOptions {
        root: config.root.clone(),
        output: config.output.clone(),
        resume: config.resume,
        interactive: io::stdin().is_terminal(),
        scan: ScanOptions {
            skip_hidden: config.skip_hidden,
            ..Default::default()
        },
    };
    let mut prompter = Prompter::new(io::stdin().lock(), io::stdout());
    let startup = establish(&options, store.as_ref(), &mut prompter)?;
    drop(prompter);

    let copier = Copier::new(runtime.handle().clone(), config.copy.clone());
    let preloader = Preloader::new(runtime.handle(), CACHE_SIZE);
    let mut session = Session::new(
        startup.context,
        startup.images,
        copier,
        preloader,
        config.prefetch,
    );
    session.start(startup.cursor)?;

    // Queued copies are drained below whatever happens to the terminal
    let result = with_terminal(
        setup_terminal(),
        |terminal| run_loop(terminal, &mut session, user_config),
        restore_terminal,
    );

    let output_dir = session.output_dir().to_path_buf();
    let wait = Duration::from_secs(config.exit_wait_secs);
    if session.copies_pending() > 0 {
        println!(
            "Waiting up to {}s for {} pending copies...",
            wait.as_secs(),
            session.copies_pending()
        );
    }
    let summary = runtime.block_on(session.finish(wait));
    print_summary(&summary, &output_dir);

    result
}

/// Runs `ui` on the terminal and restores it afterwards, even when `ui` fails
fn with_terminal<T>(
    terminal: io::Result<T>,
    ui: impl FnOnce(&mut T) -> shortlist::Result<()>,
    restore: impl FnOnce(),
) -> shortlist::Result<()> {
    let mut terminal = terminal?;
    let result = ui(&mut terminal);
    restore();
    result
}

fn setup_terminal() -> io::Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    let terminal = execute!(stdout, EnterAlternateScreen)
        .and_then(|()| Terminal::new(CrosstermBackend::new(stdout)));
    if terminal.is_err() {
        restore_terminal();
    }
    terminal
}

/// Leaves raw mode and the alternate screen; failures are only logged
fn restore_terminal() {
    if let Err(e) = disable_raw_mode() {
        tracing::error!("failed to leave raw mode: {}", e);
    }
    if let Err(e) = execute!(io::stdout(), LeaveAlternateScreen, Show) {
        tracing::error!("failed to restore the screen: {}", e);
    }
}

/// Main application loop
fn run_loop<B: ratatui::backend::Backend + std::io::Write>(
    terminal: &mut Terminal<B>,
    session: &mut Session,
    user_config: &mut UserConfig,
) -> shortlist::Result<()> {
    // Show welcome on first launch
    let mut view_state = if user_config.welcome_shown {
        ViewState::Browsing
    } else {
        ViewState::Welcome
    };
    let mut tick: usize = 0;

    loop {
        let output_dir = session.output_dir().to_path_buf();
        terminal.draw(|frame| {
            render_with_preview(frame, session, tick);

            match view_state {
                ViewState::Help => render_help_overlay(frame),
                ViewState::Welcome => render_welcome_overlay(frame, &output_dir),
                ViewState::Browsing => {}
            }
        })?;
        tick = tick.wrapping_add(1);

        if !event::poll(TICK)? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };

        let (next_state, action) = route_key(view_state, handle_key_event(key));
        if view_state == ViewState::Welcome {
            user_config.welcome_shown = true;
            if let Err(e) = user_config.save() {
                tracing::warn!("failed to save user config: {}", e);
            }
        }
        view_state = next_state;

        if let Some(action) = action {
            if session.handle_action(action) == Flow::Quit {
                break;
            }
        }
    }

    Ok(())
}

fn print_summary(summary: &SessionSummary, output_dir: &std::path::Path) {
    println!("Viewed {} of {} images", summary.viewed, summary.total);
    println!(
        "Shortlisted {} into {}",
        summary.copied,
        output_dir.display()
    );
    if summary.already_present > 0 {
        println!("   {} already in the shortlist", summary.already_present);
    }
    if summary.failed > 0 {
        println!("   {} copies failed (see log)", summary.failed);
    }
    if summary.abandoned > 0 {
        println!("   {} copies did not finish before exit", summary.abandoned);
    }
    if let Some(index) = summary.last_index {
        println!("Position saved at image {}", index + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_with_terminal_restores_after_failed_loop() {
        let restored = Cell::new(false);
        let result = with_terminal(
            Ok(()),
            |_| Err(io::Error::other("draw failed").into()),
            || restored.set(true),
        );

        assert!(matches!(result, Err(ShortlistError::Io(_))));
        assert!(restored.get());
    }

    #[test]
    fn test_with_terminal_setup_failure_skips_loop() {
        let ran = Cell::new(false);
        let result = with_terminal(
            Err::<(), _>(io::Error::other("no tty")),
            |_| {
                ran.set(true);
                Ok(())
            },
            || {},
        );

        assert!(result.is_err());
        assert!(!ran.get());
    }
}
