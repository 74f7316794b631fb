use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Gauge, Paragraph};
use volcontrol::CanonicalSnapshot;
use volcontrol::time_utils::format_clock;

use crate::app::App;

const LABEL_WIDTH: usize = 16;
const PLACEHOLDER: &str = "-";
const NO_TIME: &str = "--:--";
const LEGEND: &str =
    "+/-: volume | p: play/pause | <: prev | >: next | [/]: seek -/+ | q: quit";

pub fn draw(f: &mut Frame, app: &App) {
    let snapshot = app.store().snapshot();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(11),
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Min(1),
        ])
        .split(f.size());

    let header = Paragraph::new(Line::from(Span::styled(
        " Volumito ",
        Style::default()
            .fg(Color::Black)
            .bg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    )));
    f.render_widget(header, chunks[0]);

    let rows = Paragraph::new(info_lines(&snapshot, app.host()))
        .block(Block::default().borders(Borders::ALL).title("Now playing"));
    f.render_widget(rows, chunks[1]);

    f.render_widget(progress_gauge(&snapshot), chunks[2]);

    let legend = Paragraph::new(Line::from(Span::styled(
        LEGEND,
        Style::default().add_modifier(Modifier::BOLD),
    )));
    f.render_widget(legend, chunks[3]);

    let last_key = match app.last_key() {
        Some(key) => format!("Last key: {key}"),
        None => "Last key: none".to_string(),
    };
    f.render_widget(Paragraph::new(last_key), chunks[4]);
}

fn row(label: &str, value: String, style: Style) -> Line<'static> {
    Line::from(vec![
        Span::styled(
            format!("{:<width$}", format!("{label}:"), width = LABEL_WIDTH),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::styled(value, style),
    ])
}

fn info_lines(snapshot: &CanonicalSnapshot, host: &str) -> Vec<Line<'static>> {
    let or_placeholder = |value: Option<String>| value.unwrap_or_else(|| PLACEHOLDER.to_string());
    let highlight = Style::default().fg(Color::Yellow);
    let normal = Style::default();

    let times = snapshot.times();
    let (elapsed, length) = match times.pair() {
        Some((elapsed, duration)) => (format_clock(elapsed), format_clock(duration)),
        None => (NO_TIME.to_string(), NO_TIME.to_string()),
    };

    vec![
        row("Title", or_placeholder(snapshot.title()), highlight),
        row("Artist", or_placeholder(snapshot.artist()), highlight),
        row("Album", or_placeholder(snapshot.album()), normal),
        row("State", or_placeholder(snapshot.status_text()), normal),
        row("Sample rate", or_placeholder(snapshot.sample_rate()), normal),
        row("Elapsed", elapsed, normal),
        row("Length", length, normal),
        row(
            "Volume",
            or_placeholder(snapshot.volume().map(|v| v.to_string())),
            normal,
        ),
        row("Server", host.to_string(), normal),
    ]
}

fn progress_gauge(snapshot: &CanonicalSnapshot) -> Gauge<'static> {
    let times = snapshot.times();
    let label = match times.pair() {
        Some((elapsed, duration)) => {
            format!("{} / {}", format_clock(elapsed), format_clock(duration))
        }
        None => format!("{NO_TIME} / {NO_TIME}"),
    };
    Gauge::default()
        .block(Block::default().borders(Borders::ALL).title("Progress"))
        .gauge_style(Style::default().fg(Color::Green))
        .ratio(times.ratio())
        .label(label)
}
