use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use dmx_channel_sync::{
    ChannelRef, ColourChannels, ConnectionStatus, DerivedProperty, LightingClient,
    PropertyDescriptor, Subscription, SyncConfig, VirtualDimmer,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph, Wrap},
    Frame, Terminal,
};
use std::fs::File;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Channels shown in the gauge bank
const BANK_SIZE: u32 = 12;
const NUDGE: i16 = 16;

struct App {
    client: LightingClient,
    /// Channels 1-3 treated as an RGB fixture without a dimmer
    dimmer: Option<DerivedProperty<VirtualDimmer>>,
    selected: u32,
    status_message: String,
    dirty: Arc<AtomicBool>,
    _watches: Vec<Subscription>,
}

impl App {
    fn new(client: LightingClient) -> Self {
        let dirty = Arc::new(AtomicBool::new(true));
        let mut watches = Vec::new();

        for channel_no in 1..=BANK_SIZE {
            let dirty = dirty.clone();
            watches.push(client.store().subscribe(ChannelRef::new(1, channel_no).key(), move |_| {
                dirty.store(true, Ordering::Relaxed);
            }));
        }

        let status_dirty = dirty.clone();
        watches.push(client.subscribe_status(move |_| {
            status_dirty.store(true, Ordering::Relaxed);
        }));

        let colour = ColourChannels::rgb(ChannelRef::new(1, 1), ChannelRef::new(1, 2), ChannelRef::new(1, 3));
        let dimmer = client.bind_fixture(&[PropertyDescriptor::Colour(colour)]).virtual_dimmer;

        Self {
            client,
            dimmer,
            selected: 1,
            status_message: "Up/Down to select, +/- to nudge, d/D for the RGB dimmer, r to reconnect, q to quit"
                .to_string(),
            dirty,
            _watches: watches,
        }
    }

    fn select_next(&mut self) {
        self.selected = self.selected % BANK_SIZE + 1;
    }

    fn select_previous(&mut self) {
        self.selected = if self.selected == 1 { BANK_SIZE } else { self.selected - 1 };
    }

    fn nudge(&mut self, delta: i16) {
        let channel = ChannelRef::new(1, self.selected);
        let current = i16::from(self.client.store().get(&channel));
        let level = (current + delta).clamp(0, 255) as u8;
        self.client.store().update(&channel, level);
        self.status_message = format!("Channel {} -> {}", channel, level);
    }

    fn nudge_dimmer(&mut self, delta: i16) {
        if let Some(dimmer) = &self.dimmer {
            let current = i16::from(dimmer.snapshot().value);
            let level = (current + delta).clamp(0, 255) as u8;
            dimmer.set_value(level);
            self.status_message = format!("RGB dimmer -> {}", level);
        }
    }

    fn reconnect(&mut self) {
        if self.client.status() == ConnectionStatus::Closed {
            self.client.reconnect();
            self.status_message = "Reconnecting...".to_string();
        } else {
            self.status_message = format!("Connection is {}, not reconnecting", self.client.status());
        }
    }
}

fn ui(f: &mut Frame, app: &App) {
    let outer_chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([Constraint::Length(4), Constraint::Min(0), Constraint::Length(3)])
        .split(f.size());

    render_header(f, app, outer_chunks[0]);
    render_bank(f, app, outer_chunks[1]);
    render_status(f, app, outer_chunks[2]);
}

fn render_header(f: &mut Frame, app: &App, area: Rect) {
    let status = app.client.status();
    let colour = match status {
        ConnectionStatus::Open => Color::Green,
        ConnectionStatus::Connecting | ConnectionStatus::Closing => Color::Yellow,
        ConnectionStatus::Closed => Color::Red,
    };

    let mut lines = vec![Line::from(vec![
        Span::styled("Connection: ", Style::default().fg(Color::Yellow)),
        Span::styled(status.to_string(), Style::default().fg(colour).add_modifier(Modifier::BOLD)),
        Span::raw(format!("  ({})", app.client.transport().url())),
    ])];

    if let Some(dimmer) = &app.dimmer {
        let state = dimmer.snapshot();
        lines.push(Line::from(vec![
            Span::styled("RGB dimmer: ", Style::default().fg(Color::Yellow)),
            Span::raw(format!("{} ({}%)", state.value, state.percentage)),
        ]));
    }

    let block = Block::default()
        .title(" DMX Monitor ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_bank(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(" Universe 1 ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints((0..BANK_SIZE).map(|_| Constraint::Length(1)).collect::<Vec<_>>())
        .split(inner);

    for (row, channel_no) in rows.iter().zip(1..=BANK_SIZE) {
        let channel = ChannelRef::new(1, channel_no);
        let level = app.client.store().get(&channel);
        let style = if channel_no == app.selected {
            Style::default().fg(Color::White).bg(Color::DarkGray)
        } else {
            Style::default().fg(Color::Cyan)
        };

        let gauge = Gauge::default()
            .gauge_style(style)
            .ratio(f64::from(level) / 255.0)
            .label(format!("{:>3}  ch {}", level, channel));
        f.render_widget(gauge, *row);
    }
}

fn render_status(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(" Status ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Gray));

    let text = Paragraph::new(app.status_message.clone())
        .block(block)
        .wrap(Wrap { trim: true });

    f.render_widget(text, area);
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Log to a file; the terminal belongs to the UI
    let log_file = File::create("monitor.log")?;
    tracing_subscriber::fmt()
        .with_writer(Mutex::new(log_file))
        .with_ansi(false)
        .init();

    let mut args = std::env::args().skip(1);
    let host = args.next().unwrap_or_else(|| "localhost".to_string());
    let port = match args.next() {
        Some(port) => port.parse()?,
        None => 8080,
    };
    let client = LightingClient::connect(SyncConfig::new(host, port))?;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(client);

    // Main loop
    let res = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    app.client.dispose();

    if let Err(err) = res {
        println!("Error: {}", err);
    }

    Ok(())
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        if app.dirty.swap(false, Ordering::Relaxed) {
            terminal.draw(|f| ui(f, app))?;
        }

        // Handle input events (non-blocking)
        if event::poll(std::time::Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') => return Ok(()),
                        KeyCode::Down | KeyCode::Char('j') => app.select_next(),
                        KeyCode::Up | KeyCode::Char('k') => app.select_previous(),
                        KeyCode::Char('+') | KeyCode::Char('=') => app.nudge(NUDGE),
                        KeyCode::Char('-') | KeyCode::Char('_') => app.nudge(-NUDGE),
                        KeyCode::Char('D') => app.nudge_dimmer(NUDGE),
                        KeyCode::Char('d') => app.nudge_dimmer(-NUDGE),
                        KeyCode::Char('r') => app.reconnect(),
                        _ => {}
                    }
                    app.dirty.store(true, Ordering::Relaxed);
                }
            }
        }
    }
}
