// loadwatch-monitor
//
// Live terminal dashboard for a backend under synthetic load: circuit
// breaker state, DB pool usage, rate limiting, per-source request outcomes.
//
// Quit: q / Esc / Ctrl-C   Toggle rate limit: t   Scroll timeline: ← → / End

use std::io::{self, Write};
use std::time::{Duration, Instant};

use anyhow::Context;
use chrono::Local;
use clap::Parser;
use crossbeam::channel;
use crossterm::style::{Attribute, Color, ResetColor, SetAttribute, SetForegroundColor};
use crossterm::{cursor, event, style, terminal, ExecutableCommand, QueueableCommand};

use loadwatch::api::ApiClient;
use loadwatch::dashboard::{Dashboard, DashboardConfig, DashboardView};
use loadwatch::stats::KnownSourceSet;
use loadwatch::view::{Autoscroll, EntrancePulse, Tone};
use loadwatch_tools::{MonitorConfig, MonitorOpts};

/// Source rows shown in the table; the aggregator itself is unbounded.
const SOURCE_ROWS: usize = 6;
const SCROLL_STEP: u32 = 4;

fn tone_color(tone: Tone) -> Color {
    match tone {
        Tone::Danger => Color::Red,
        Tone::Warn => Color::Yellow,
        Tone::Ok => Color::Green,
        Tone::Unknown => Color::DarkGrey,
    }
}

struct Tui {
    stdout: io::Stdout,
}

impl Tui {
    fn setup() -> io::Result<Tui> {
        let mut stdout = io::stdout();
        terminal::enable_raw_mode()?;
        stdout.execute(terminal::EnterAlternateScreen)?;
        stdout.execute(cursor::Hide)?;
        Ok(Tui { stdout })
    }

    fn teardown(&mut self) {
        let _ = self.stdout.execute(cursor::Show);
        let _ = self.stdout.execute(terminal::LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
        let _ = self.stdout.flush();
    }

    fn draw(
        &mut self,
        header: &str,
        view: &DashboardView,
        scroll: &Autoscroll,
        pulse_active: bool,
        known: &KnownSourceSet,
        quiet: bool,
    ) -> io::Result<()> {
        let (cols, _rows) = terminal::size()?;
        let strip_width = cols.saturating_sub(4).max(10) as usize;

        self.stdout.queue(cursor::MoveTo(0, 0))?;
        self.stdout
            .queue(terminal::Clear(terminal::ClearType::All))?;

        // Header
        self.stdout.queue(SetAttribute(Attribute::Bold))?;
        self.stdout.queue(style::Print(header))?;
        self.stdout.queue(SetAttribute(Attribute::Reset))?;
        self.stdout.queue(cursor::MoveToNextLine(2))?;

        // Circuit breaker line
        self.stdout.queue(style::Print("Circuit Breaker: "))?;
        self.stdout.queue(SetForegroundColor(tone_color(view.tone)))?;
        self.stdout.queue(SetAttribute(Attribute::Bold))?;
        self.stdout
            .queue(style::Print(format!("{}", view.circuit_state)))?;
        if pulse_active {
            self.stdout.queue(style::Print(" ●"))?;
        }
        self.stdout.queue(SetAttribute(Attribute::Reset))?;
        self.stdout.queue(ResetColor)?;
        self.stdout.queue(cursor::MoveToNextLine(1))?;

        // Snapshot chips
        let pool = match view.db_pool_pct {
            Some(pct) => format!(
                "DB Pool: {}/{} ({}%)  idle {}",
                view.active_connections, view.total_connections, pct, view.idle_connections
            ),
            None => "DB Pool: --".to_string(),
        };
        let avg = match view.avg_response_time_ms {
            Some(ms) => format!("{ms:.0} ms"),
            None => "--".to_string(),
        };
        let rate = match view.rate_limit_enabled {
            Some(true) => "ON",
            Some(false) => "OFF",
            None => "--",
        };
        self.stdout.queue(style::Print(format!("{pool}   ")))?;
        if view.waiting_warn {
            self.stdout.queue(SetForegroundColor(Color::Yellow))?;
        }
        self.stdout
            .queue(style::Print(format!("Waiting Threads: {}", view.waiting_threads)))?;
        self.stdout.queue(ResetColor)?;
        self.stdout.queue(style::Print(format!(
            "   Avg Response: {avg}   Rate Limit [t]: {rate}"
        )))?;
        self.stdout.queue(cursor::MoveToNextLine(2))?;

        self.draw_timeline(view, scroll, pulse_active, strip_width)?;
        self.draw_sources(view, known)?;
        self.draw_errors(view)?;

        if !quiet {
            self.stdout.queue(cursor::MoveToNextLine(1))?;
            self.stdout.queue(SetForegroundColor(Color::DarkGrey))?;
            self.stdout
                .queue(style::Print("q/Esc quit   t toggle rate limit   ← → scroll   End latest"))?;
            self.stdout.queue(ResetColor)?;
        }

        self.stdout.flush()
    }

    fn draw_timeline(
        &mut self,
        view: &DashboardView,
        scroll: &Autoscroll,
        pulse_active: bool,
        strip_width: usize,
    ) -> io::Result<()> {
        self.stdout.queue(SetAttribute(Attribute::Bold))?;
        self.stdout.queue(style::Print("Circuit Timeline"))?;
        self.stdout.queue(SetAttribute(Attribute::Reset))?;
        if scroll.newer_data_offscreen() {
            self.stdout.queue(SetForegroundColor(Color::Yellow))?;
            self.stdout
                .queue(style::Print("   → newer data off-screen (End)"))?;
            self.stdout.queue(ResetColor)?;
        }
        self.stdout.queue(cursor::MoveToNextLine(1))?;

        let ticks = &view.ticks;
        if ticks.is_empty() {
            self.stdout.queue(SetForegroundColor(Color::DarkGrey))?;
            self.stdout.queue(style::Print("  (no samples yet)"))?;
            self.stdout.queue(ResetColor)?;
            self.stdout.queue(cursor::MoveToNextLine(2))?;
            return Ok(());
        }

        let max_offset = ticks.len().saturating_sub(strip_width);
        let offset = (scroll.offset_from_end() as usize).min(max_offset);
        let end = ticks.len() - offset;
        let start = end.saturating_sub(strip_width);
        let visible = &ticks[start..end];

        self.stdout.queue(style::Print("  "))?;
        for (i, tick) in visible.iter().enumerate() {
            let newest_visible = offset == 0 && i == visible.len() - 1;
            self.stdout.queue(SetForegroundColor(tone_color(tick.tone)))?;
            if newest_visible && pulse_active {
                self.stdout.queue(SetAttribute(Attribute::Bold))?;
                self.stdout.queue(style::Print("█"))?;
                self.stdout.queue(SetAttribute(Attribute::Reset))?;
            } else {
                self.stdout.queue(style::Print("▇"))?;
            }
        }
        self.stdout.queue(ResetColor)?;
        self.stdout.queue(cursor::MoveToNextLine(1))?;

        // edge labels for the visible window
        let left = visible.first().map_or("", |t| t.label.as_str());
        let right = visible.last().map_or("", |t| t.label.as_str());
        let gap = strip_width.saturating_sub(left.len() + right.len());
        self.stdout.queue(SetForegroundColor(Color::DarkGrey))?;
        self.stdout.queue(style::Print(format!(
            "  {left}{}{right}",
            " ".repeat(gap)
        )))?;
        self.stdout.queue(ResetColor)?;
        self.stdout.queue(cursor::MoveToNextLine(2))?;
        Ok(())
    }

    fn draw_sources(&mut self, view: &DashboardView, known: &KnownSourceSet) -> io::Result<()> {
        self.stdout.queue(SetAttribute(Attribute::Bold))?;
        self.stdout.queue(style::Print(format!(
            "{:<18} {:>6} {:>6} {:>6} {:>6}  {}",
            "source", "total", "2xx", "429", "5xx", "class"
        )))?;
        self.stdout.queue(SetAttribute(Attribute::Reset))?;
        self.stdout.queue(cursor::MoveToNextLine(1))?;

        for row in view.sources.iter().take(SOURCE_ROWS) {
            let attack = known.contains(&row.ip);
            if attack {
                self.stdout.queue(SetForegroundColor(Color::Red))?;
            }
            self.stdout.queue(style::Print(format!(
                "{:<18} {:>6} {:>6} {:>6} {:>6}  {}",
                row.ip,
                row.total,
                row.ok,
                row.blocked,
                row.err5xx,
                if attack { "attack" } else { "-" }
            )))?;
            self.stdout.queue(ResetColor)?;
            self.stdout.queue(cursor::MoveToNextLine(1))?;
        }

        let status = view
            .status_counts
            .iter()
            .map(|(code, count)| format!("{code}: {count}"))
            .collect::<Vec<_>>()
            .join("   ");
        self.stdout.queue(cursor::MoveToNextLine(1))?;
        self.stdout
            .queue(style::Print(format!("Status  {status}")))?;
        self.stdout.queue(cursor::MoveToNextLine(1))?;
        Ok(())
    }

    fn draw_errors(&mut self, view: &DashboardView) -> io::Result<()> {
        let banners = [
            ("snapshot feed", &view.snapshot_error),
            ("event feed", &view.events_error),
            ("rate-limit toggle", &view.action_error),
        ];
        for (label, error) in banners {
            if let Some(message) = error {
                self.stdout.queue(cursor::MoveToNextLine(1))?;
                self.stdout.queue(SetForegroundColor(Color::Red))?;
                self.stdout
                    .queue(style::Print(format!("{label}: {message}")))?;
                self.stdout.queue(ResetColor)?;
            }
        }
        self.stdout.queue(cursor::MoveToNextLine(1))?;
        Ok(())
    }
}

fn init_logging(opts: &MonitorOpts) -> anyhow::Result<()> {
    let Some(path) = &opts.log_file else {
        return Ok(());
    };
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("cannot open {}", path.display()))?;
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::sync::Arc::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn run(tui: &mut Tui, opts: &MonitorOpts, known: &KnownSourceSet) -> anyhow::Result<()> {
    let client = ApiClient::new(&opts.url)?;
    let mut dashboard = Dashboard::start(
        client,
        DashboardConfig {
            snapshot_interval: Duration::from_millis(opts.snapshot_interval_ms.max(100)),
            events_interval: Duration::from_millis(opts.events_interval_ms.max(100)),
        },
    );
    let mut scroll = Autoscroll::new();
    let mut pulse = EntrancePulse::new();

    // Keyboard handler
    let (key_tx, key_rx) = channel::unbounded();
    std::thread::spawn(move || loop {
        if let Ok(ev) = event::read() {
            if key_tx.send(ev).is_err() {
                break;
            }
        }
    });

    let frame = Duration::from_millis(1000 / opts.fps.max(1));
    let tick = channel::tick(frame);
    let mut last_update: Option<chrono::DateTime<Local>> = None;

    'main: loop {
        crossbeam::select! {
            recv(key_rx) -> ev => {
                if let Ok(event::Event::Key(k)) = ev {
                    use event::{KeyCode, KeyEventKind, KeyModifiers};
                    if k.kind == KeyEventKind::Press {
                        let quit = k.code == KeyCode::Char('q')
                                 || k.code == KeyCode::Esc
                                 || (k.code == KeyCode::Char('c') && k.modifiers == KeyModifiers::CONTROL);
                        if quit { break 'main; }

                        match k.code {
                            KeyCode::Char('t') => dashboard.toggle_rate_limit(),
                            KeyCode::Left => {
                                let ticks = dashboard.view().ticks.len() as u32;
                                let max = ticks.saturating_sub(1);
                                scroll.scrolled_to((scroll.offset_from_end() + SCROLL_STEP).min(max));
                            }
                            KeyCode::Right => {
                                scroll.scrolled_to(scroll.offset_from_end().saturating_sub(SCROLL_STEP));
                            }
                            KeyCode::End => scroll.stick(),
                            _ => {}
                        }
                    }
                }
            }

            recv(tick) -> _ => {
                if dashboard.pump() {
                    scroll.on_update();
                    last_update = Some(Local::now());
                }
                let view = dashboard.view();
                pulse.observe(view.newest_timestamp.as_deref(), Instant::now());
                let pulse_active = pulse.is_active(Instant::now());

                let updated = last_update
                    .map(|t| t.format("%H:%M:%S").to_string())
                    .unwrap_or_else(|| "--:--:--".to_string());
                let header = format!(
                    "loadwatch-monitor — {}  snapshot={}ms  events={}ms  updated {}",
                    opts.url, opts.snapshot_interval_ms, opts.events_interval_ms, updated
                );
                if tui.draw(&header, &view, &scroll, pulse_active, known, opts.quiet).is_err() {
                    break 'main;
                }
            }
        }
    }

    dashboard.stop();
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let opts = MonitorOpts::parse();
    init_logging(&opts)?;

    let config = match &opts.config_file {
        Some(path) => MonitorConfig::load(path)?,
        None => MonitorConfig::default(),
    };
    let known = config.known_sources();

    let mut tui = Tui::setup().context("TUI setup failed")?;
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let mut t = Tui {
            stdout: io::stdout(),
        };
        t.teardown();
        original_hook(panic_info);
    }));

    let result = run(&mut tui, &opts, &known);
    tui.teardown();
    result
}
