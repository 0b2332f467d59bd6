use crate::app::{App, AppView};
use crate::session::{Session, Status, PROGRESS_MAX};
use crate::settings::SettingsField;
use ratatui::{
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph, Wrap},
    Frame,
};

// Palette
const ACCENT: Color = Color::Rgb(6, 182, 212); // Cyan
const DOWNLOAD: Color = Color::Rgb(6, 182, 212);
const UPLOAD: Color = Color::Rgb(168, 85, 247); // Purple
const PING: Color = Color::Rgb(59, 130, 246); // Blue
const ERROR: Color = Color::Rgb(230, 120, 120);
const TEXT_PRIMARY: Color = Color::Rgb(230, 230, 230);
const TEXT_SECONDARY: Color = Color::Rgb(160, 160, 160);
const TEXT_MUTED: Color = Color::Rgb(100, 100, 100);
const BORDER: Color = Color::Rgb(60, 60, 65);
const TRACK: Color = Color::Rgb(40, 40, 48);

// Full-scale values of the result gauges, in Mbps.
const DOWNLOAD_SCALE: f64 = 10.0;
const UPLOAD_SCALE: f64 = 5.0;

pub fn draw_ui(frame: &mut Frame, app: &App) {
    let area = frame.area();

    match app.view {
        AppView::Main => draw_main_view(frame, area, app),
        AppView::Settings => draw_settings_view(frame, area, app),
    }
}

fn draw_main_view(frame: &mut Frame, area: Rect, app: &App) {
    let details_height = if app.show_details { 5 } else { 0 };
    let chunks = Layout::vertical([
        Constraint::Length(3),
        Constraint::Min(10),
        Constraint::Length(details_height),
        Constraint::Length(1),
    ])
    .split(area);

    draw_header(frame, chunks[0], app.session());
    draw_session(frame, chunks[1], app.session());
    if app.show_details {
        draw_details(frame, chunks[2], app);
    }
    draw_help(frame, chunks[3], app);
}

fn draw_header(frame: &mut Frame, area: Rect, session: &Session) {
    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(Style::default().fg(BORDER));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::horizontal([
        Constraint::Length(12),
        Constraint::Min(10),
        Constraint::Length(6),
    ])
    .split(inner);

    let title = Paragraph::new("speedring")
        .style(Style::default().fg(TEXT_PRIMARY).add_modifier(Modifier::BOLD));
    frame.render_widget(title, chunks[0]);

    let (status, color) = status_label(session.status());
    frame.render_widget(
        Paragraph::new(status)
            .style(Style::default().fg(color))
            .alignment(Alignment::Center),
        chunks[1],
    );

    frame.render_widget(
        Paragraph::new(format!("{}%", session.progress()))
            .style(Style::default().fg(TEXT_SECONDARY))
            .alignment(Alignment::Right),
        chunks[2],
    );
}

fn status_label(status: Status) -> (&'static str, Color) {
    match status {
        Status::Idle => ("Ready", TEXT_MUTED),
        Status::Running => ("Measuring...", ACCENT),
        Status::Complete => ("Complete", TEXT_PRIMARY),
        Status::Failed => ("Failed", ERROR),
    }
}

fn draw_session(frame: &mut Frame, area: Rect, session: &Session) {
    let chunks = Layout::vertical([
        Constraint::Length(3),
        Constraint::Length(3),
        Constraint::Min(4),
    ])
    .split(area);

    draw_progress_ring(frame, chunks[0], session);
    draw_start_control(frame, chunks[1], session);

    match session.status() {
        Status::Failed => {
            let message = session.error().unwrap_or("unknown error");
            draw_failure(frame, chunks[2], message);
        }
        _ => draw_results(frame, chunks[2], session),
    }
}

fn draw_progress_ring(frame: &mut Frame, area: Rect, session: &Session) {
    let ratio = f64::from(session.progress()) / f64::from(PROGRESS_MAX);
    let gauge = Gauge::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(BORDER))
                .title(Span::styled(" Progress ", Style::default().fg(TEXT_SECONDARY))),
        )
        .gauge_style(Style::default().fg(ACCENT).bg(TRACK))
        .ratio(ratio.clamp(0.0, 1.0))
        .label(format!("{}%", session.progress()));

    frame.render_widget(gauge, area);
}

fn draw_start_control(frame: &mut Frame, area: Rect, session: &Session) {
    let (label, style) = match session.status() {
        Status::Running => ("[ Testing... ]", Style::default().fg(TEXT_MUTED)),
        Status::Idle => (
            "[ Start ]",
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        ),
        Status::Complete | Status::Failed => (
            "[ Run again ]",
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        ),
    };

    frame.render_widget(
        Paragraph::new(Line::from(Span::styled(label, style))).alignment(Alignment::Center),
        Layout::vertical([Constraint::Length(1), Constraint::Length(1), Constraint::Min(0)])
            .split(area)[1],
    );
}

fn draw_results(frame: &mut Frame, area: Rect, session: &Session) {
    let panels = Layout::horizontal([
        Constraint::Ratio(1, 3),
        Constraint::Ratio(1, 3),
        Constraint::Ratio(1, 3),
    ])
    .split(area);

    draw_speed_gauge(
        frame,
        panels[0],
        "Download",
        DOWNLOAD,
        session.download_speed(),
        DOWNLOAD_SCALE,
    );
    draw_speed_gauge(
        frame,
        panels[1],
        "Upload",
        UPLOAD,
        session.upload_speed(),
        UPLOAD_SCALE,
    );
    draw_ping_readout(frame, panels[2], session.ping());
}

fn draw_speed_gauge(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    color: Color,
    speed: Option<f64>,
    scale: f64,
) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(BORDER))
        .title(Span::styled(format!(" {} ", title), Style::default().fg(color)));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Min(0),
    ])
    .split(inner);

    frame.render_widget(
        Paragraph::new(format_speed(speed))
            .style(Style::default().fg(TEXT_PRIMARY).add_modifier(Modifier::BOLD))
            .alignment(Alignment::Center),
        chunks[0],
    );

    // Readings beyond the scale pin the needle at full.
    if let Some(mbps) = speed {
        let gauge = Gauge::default()
            .gauge_style(Style::default().fg(color).bg(TRACK))
            .ratio((mbps / scale).clamp(0.0, 1.0))
            .label(format!("/ {scale:.0}"));
        frame.render_widget(gauge, chunks[1]);
    }
}

fn draw_ping_readout(frame: &mut Frame, area: Rect, ping: Option<f64>) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(BORDER))
        .title(Span::styled(" Ping ", Style::default().fg(PING)));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let value = match ping {
        Some(ms) => format!("{ms:.0} ms"),
        None => "—".to_string(),
    };

    frame.render_widget(
        Paragraph::new(value)
            .style(Style::default().fg(TEXT_PRIMARY).add_modifier(Modifier::BOLD))
            .alignment(Alignment::Center),
        inner,
    );
}

fn draw_failure(frame: &mut Frame, area: Rect, message: &str) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(ERROR))
        .title(Span::styled(" Measurement failed ", Style::default().fg(ERROR)));

    frame.render_widget(
        Paragraph::new(message)
            .style(Style::default().fg(TEXT_SECONDARY))
            .wrap(Wrap { trim: true })
            .block(block),
        area,
    );
}

fn draw_details(frame: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(BORDER))
        .title(Span::styled(" Test Details ", Style::default().fg(ACCENT)));

    let lines = vec![
        detail_line("Server", &app.details.server),
        detail_line("ISP", &app.details.isp),
        detail_line("Connection Type", &app.details.connection),
    ];

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn detail_line<'a>(label: &'a str, value: &'a str) -> Line<'a> {
    Line::from(vec![
        Span::styled(format!(" {label}: "), Style::default().fg(TEXT_SECONDARY)),
        Span::styled(value, Style::default().fg(TEXT_PRIMARY)),
    ])
}

// Settings
fn draw_settings_view(frame: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::vertical([
        Constraint::Length(3),
        Constraint::Min(10),
        Constraint::Length(1),
    ])
    .split(area);

    let header_block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(Style::default().fg(BORDER));
    let header_inner = header_block.inner(chunks[0]);
    frame.render_widget(header_block, chunks[0]);

    frame.render_widget(
        Paragraph::new("Settings")
            .style(Style::default().fg(TEXT_PRIMARY).add_modifier(Modifier::BOLD)),
        header_inner,
    );

    let content_area = Layout::horizontal([
        Constraint::Length(2),
        Constraint::Min(30),
        Constraint::Length(2),
    ])
    .split(chunks[1])[1];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(BORDER));
    let inner = block.inner(content_area);
    frame.render_widget(block, content_area);

    let rows = Layout::vertical([
        Constraint::Length(3),
        Constraint::Length(3),
        Constraint::Length(3),
        Constraint::Min(0),
    ])
    .split(inner);

    draw_setting_row(
        frame,
        rows[0],
        "Tick interval",
        &format!("{} ms", app.settings.tick_interval_ms),
        app.selected_setting == SettingsField::TickInterval,
    );

    draw_setting_row(
        frame,
        rows[1],
        "Progress step",
        &format!("{}", app.settings.progress_step),
        app.selected_setting == SettingsField::ProgressStep,
    );

    draw_setting_row(
        frame,
        rows[2],
        "Fill on finish",
        if app.settings.fill_progress_on_complete { "on" } else { "off" },
        app.selected_setting == SettingsField::FillOnComplete,
    );

    let help = "↑↓ select · ←→ adjust · enter done";
    frame.render_widget(
        Paragraph::new(help)
            .style(Style::default().fg(TEXT_MUTED))
            .alignment(Alignment::Center),
        chunks[2],
    );
}

fn draw_setting_row(frame: &mut Frame, area: Rect, label: &str, value: &str, selected: bool) {
    let chunks = Layout::horizontal([
        Constraint::Length(16),
        Constraint::Min(10),
    ])
    .split(area);

    let label_style = if selected {
        Style::default().fg(ACCENT)
    } else {
        Style::default().fg(TEXT_SECONDARY)
    };

    frame.render_widget(
        Paragraph::new(format!(" {}", label)).style(label_style),
        chunks[0],
    );

    let value_text = if selected {
        format!("< {} >", value)
    } else {
        value.to_string()
    };

    let value_style = if selected {
        Style::default().fg(TEXT_PRIMARY)
    } else {
        Style::default().fg(TEXT_MUTED)
    };

    frame.render_widget(Paragraph::new(value_text).style(value_style), chunks[1]);
}

fn draw_help(frame: &mut Frame, area: Rect, app: &App) {
    let help = if app.session().is_running() {
        "d details · q quit"
    } else {
        "enter start · d details · s settings · q quit"
    };

    frame.render_widget(
        Paragraph::new(help)
            .style(Style::default().fg(TEXT_MUTED))
            .alignment(Alignment::Center),
        area,
    );
}

fn format_speed(mbps: Option<f64>) -> String {
    match mbps {
        Some(v) if v >= 1000.0 => format!("{:.1} Gbps", v / 1000.0),
        Some(v) if v >= 1.0 => format!("{:.2} Mbps", v),
        Some(v) => format!("{:.0} Kbps", v * 1000.0),
        None => "—".to_string(),
    }
}
