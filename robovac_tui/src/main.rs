use anyhow::Result;
use clap::Parser;
use ratatui::{
    crossterm::{
        self,
        event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode},
        execute,
        terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
    },
    prelude::*,
    widgets::*,
};
use robovac_core::{
    CellKind, Layout as FloorLayout, RobotState, Simulation, StallReason, StepResult,
};
use std::{
    collections::VecDeque,
    io::{self, Stdout},
    path::PathBuf,
    time::{Duration, Instant},
};

/// How many log lines to keep around.
const LOG_CAPACITY: usize = 200;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Floor plan file to load ('.' free, '#' obstacle, 'B' base)
    #[arg(short, long, value_name = "MAP_FILE")]
    map: Option<PathBuf>,

    /// Generate a random floor plan instead of using the built-in one
    #[arg(long, conflicts_with = "map")]
    random: bool,

    /// Width of the random floor plan
    #[arg(long, default_value_t = 16, requires = "random")]
    width: usize,

    /// Height of the random floor plan
    #[arg(long, default_value_t = 10, requires = "random")]
    height: usize,

    /// Obstacle density of the random floor plan (0.0 - 1.0)
    #[arg(long, default_value_t = 0.15, requires = "random")]
    density: f64,

    /// Seed for the random floor plan
    #[arg(long, default_value_t = 0, requires = "random")]
    seed: u64,

    /// Milliseconds between simulation steps
    #[arg(long, default_value_t = 250)]
    tick_ms: u64,
}

struct App {
    /// The core simulation engine.
    simulation: Simulation,
    /// Layout kept around so 'r' can rebuild the same floor.
    layout: FloorLayout,
    /// Recent step results, newest last.
    messages: VecDeque<String>,
    paused: bool,
    should_quit: bool,
}

impl App {
    fn new(layout: FloorLayout) -> Result<Self> {
        let simulation = Simulation::new(&layout)?;
        Ok(App {
            simulation,
            layout,
            messages: VecDeque::new(),
            paused: false,
            should_quit: false,
        })
    }

    /// Handles one step of the simulation.
    fn tick(&mut self) {
        if self.paused {
            return;
        }
        let result = self.simulation.step();
        match result {
            StepResult::Moved {
                from,
                to,
                energy_remaining,
            } => {
                self.log(format!(
                    "Moved ({}, {}) -> ({}, {}). Battery: {:.1}%",
                    from.x, from.y, to.x, to.y, energy_remaining
                ));
            }
            StepResult::Covered => {
                self.log("All reachable cells cleaned, heading back to base".to_string());
            }
            StepResult::ArrivedAtBase => {
                let status = self.simulation.status();
                self.log(format!(
                    "Docked at base with {:.1}% battery ({} cycles done)",
                    status.energy, status.cycles_completed
                ));
                // Let the user admire the clean floor instead of instantly
                // starting the next cycle.
                self.paused = true;
            }
            StepResult::Stalled { reason } => {
                let text = match reason {
                    StallReason::EnergyExhausted => "Battery died before reaching the base!",
                    StallReason::NoPath => "No route home from here!",
                };
                self.log(format!("Stalled: {text}"));
                self.paused = true;
            }
        }
    }

    fn log(&mut self, message: String) {
        if self.messages.len() == LOG_CAPACITY {
            self.messages.pop_front();
        }
        self.messages.push_back(message);
    }

    /// Rebuilds the simulation from the original layout.
    fn reset(&mut self) {
        if let Ok(simulation) = Simulation::new(&self.layout) {
            self.simulation = simulation;
            self.messages.clear();
            self.log("Simulation reset".to_string());
            self.paused = false;
        }
    }

    fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }

    /// Sets the quit flag.
    fn quit(&mut self) {
        self.should_quit = true;
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let layout = if let Some(map_file) = args.map {
        if !map_file.exists() {
            return Err(anyhow::anyhow!(
                "Map file does not exist: {}",
                map_file.display()
            ));
        }
        let file_string = std::fs::read_to_string(&map_file)?;
        FloorLayout::parse(&file_string)?
    } else if args.random {
        FloorLayout::random(args.width, args.height, args.density, args.seed)
    } else {
        FloorLayout::reference()
    };

    // Create the application state before touching the terminal so layout
    // errors print normally.
    let mut app = App::new(layout)?;

    let mut terminal = setup_terminal()?;
    let result = run_app(&mut terminal, &mut app, Duration::from_millis(args.tick_ms));
    restore_terminal(&mut terminal)?;

    result
}

/// Configures the terminal for TUI interaction.
fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    let mut stdout = io::stdout();
    enable_raw_mode()?;
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).map_err(Into::into)
}

/// Restores the terminal to its original state.
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

/// Runs the main loop of the TUI application.
fn run_app(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &mut App,
    tick_rate: Duration,
) -> Result<()> {
    let mut last_tick = Instant::now();

    loop {
        // Draw the UI
        terminal.draw(|f| ui(f, app))?;

        // Calculate timeout for event polling
        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        // Poll for events (keyboard, mouse, etc.)
        if crossterm::event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => app.quit(),
                    KeyCode::Char(' ') => app.toggle_pause(),
                    KeyCode::Char('r') => app.reset(),
                    _ => {}
                }
            }
        }

        // Update application state if enough time has passed
        if last_tick.elapsed() >= tick_rate {
            app.tick(); // Perform simulation step
            last_tick = Instant::now();
        }

        // Exit loop if requested
        if app.should_quit {
            break;
        }
    }
    Ok(())
}

/// Renders the user interface.
fn ui(frame: &mut Frame, app: &App) {
    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(60), // Area for the floor plan
            Constraint::Percentage(30), // Area for the message log
            Constraint::Percentage(10), // Area for status/help
        ])
        .split(frame.area());

    render_floor(frame, main_layout[0], app);
    render_messages(frame, main_layout[1], app);
    render_status(frame, main_layout[2], app);
}

/// Renders the floor grid with the robot overlaid.
fn render_floor(frame: &mut Frame, area: Rect, app: &App) {
    let floor = app.simulation.floor();
    let robot = app.simulation.robot();

    let mut lines: Vec<Line> = Vec::with_capacity(floor.height());
    for y in 0..floor.height() {
        let mut spans: Vec<Span> = Vec::with_capacity(floor.width());
        for x in 0..floor.width() {
            if robot.position.x == x && robot.position.y == y {
                spans.push(Span::styled("@", Style::default().fg(Color::Red).bold()));
                continue;
            }
            let cell = &floor[(x, y)];
            let span = match cell.kind {
                CellKind::Obstacle => Span::styled("#", Style::default().fg(Color::DarkGray)),
                CellKind::Base => Span::styled("B", Style::default().fg(Color::Cyan).bold()),
                CellKind::Free => {
                    if cell.visited {
                        // Cleaned cells fade out.
                        Span::styled(".", Style::default().fg(Color::DarkGray))
                    } else {
                        Span::styled("O", Style::default().fg(Color::Yellow))
                    }
                }
            };
            spans.push(span);
        }
        lines.push(Line::from(spans));
    }

    let floor_paragraph = Paragraph::new(lines)
        .block(Block::default().title("Robovac").borders(Borders::ALL))
        .alignment(Alignment::Center);
    frame.render_widget(floor_paragraph, area);
}

/// Renders the scrolling message log, newest messages at the bottom.
fn render_messages(frame: &mut Frame, area: Rect, app: &App) {
    let visible = area.height.saturating_sub(2) as usize;
    let items: Vec<ListItem> = app
        .messages
        .iter()
        .rev()
        .take(visible)
        .rev()
        .map(|message| ListItem::new(message.as_str()))
        .collect();

    let log_widget =
        List::new(items).block(Block::default().borders(Borders::ALL).title("Messages"));
    frame.render_widget(log_widget, area);
}

/// Renders the status line and key help.
fn render_status(frame: &mut Frame, area: Rect, app: &App) {
    let status = app.simulation.status();
    let state_text = match status.state {
        RobotState::Idle => "Idle",
        RobotState::Exploring => "Exploring",
        RobotState::ReturningToBase => "Returning to base",
        RobotState::Stalled => "Stalled",
    };
    let paused_text = if app.paused { " [paused]" } else { "" };

    let status_line = format!(
        "{state_text}{paused_text} | Battery: {:.1}% | Cleaned: {}/{} | Cycles: {} | Space pause, 'r' reset, 'q' quit",
        status.energy, status.visited_count, status.total_cleanable, status.cycles_completed
    );
    let help_text = Paragraph::new(status_line)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::TOP));
    frame.render_widget(help_text, area);
}
