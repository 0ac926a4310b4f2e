use crate::analysis::aggregate::TimeBucket;
use crate::ui::app::App;
use chrono::{DateTime, Local};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{
        block::Title, Axis, Bar, BarChart, BarGroup, Block, Borders, Cell, Chart, Dataset,
        GraphType, List, ListItem, Paragraph, Row, Table,
    },
    Frame,
};

const PRIMARY: Color = Color::Rgb(0, 117, 255);
const DANGER: Color = Color::Rgb(227, 26, 26);

pub const HELP: &str =
    "KEYS: [1] Sim SSH | [2] Sim HTTP | [e] Export CSV | [l] Listen/Pause | [r] Refresh | [Arrows] Select | [End] Follow | [q] Quit";

pub fn draw(f: &mut Frame, app: &mut App) {
    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0), Constraint::Length(1)])
        .split(f.size());

    draw_header(f, app, main_chunks[0]);

    let body = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(main_chunks[1]);

    let top = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(62), Constraint::Percentage(38)])
        .split(body[0]);

    draw_traffic_chart(f, app, top[0]);
    draw_side_stats(f, app, top[1]);
    draw_log_table(f, app, body[1]);

    // Выбранную строку показываем, только пока не следим за новым трафиком
    let selected = match app.selected() {
        Some(sel) if !app.auto_scroll => format!(" | Selected: {} -> {}", sel.record.src_ip, sel.record.dst_port),
        _ => String::new(),
    };
    let status = Paragraph::new(format!("Status: {}{} | {}", app.status_msg, selected, HELP))
        .style(Style::default().bg(Color::Blue).fg(Color::White));
    f.render_widget(status, main_chunks[2]);
}

fn draw_header(f: &mut Frame, app: &App, area: Rect) {
    let badge = if app.store.listening() {
        Span::styled(" LISTENING ", Style::default().bg(PRIMARY).fg(Color::White).add_modifier(Modifier::BOLD))
    } else {
        Span::styled(" PAUSED ", Style::default().bg(DANGER).fg(Color::White).add_modifier(Modifier::BOLD))
    };

    let ports = if app.honeypot_ports.is_empty() {
        "-".to_string()
    } else {
        app.honeypot_ports.iter().map(|p| p.to_string()).collect::<Vec<_>>().join(", ")
    };

    let line = Line::from(vec![
        Span::styled("Dashboard Overview", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(format!("  backend: {}  ports: {}  ", app.backend_label, ports)),
        badge,
    ]);

    let header = Paragraph::new(line)
        .block(Block::default().borders(Borders::ALL).title(" d-honey | Vision Honeypot "));
    f.render_widget(header, area);
}

fn draw_traffic_chart(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Traffic Overview ")
        .title(
            Title::from(format!(" (+{}) detected attempts ", app.stats.total))
                .alignment(Alignment::Right),
        );

    let timeline = &app.stats.timeline;
    if timeline.is_empty() {
        let placeholder = Paragraph::new("No data yet")
            .style(Style::default().fg(Color::Gray))
            .alignment(Alignment::Center)
            .block(block);
        f.render_widget(placeholder, area);
        return;
    }

    let points: Vec<(f64, f64)> = timeline
        .iter()
        .enumerate()
        .map(|(i, b)| (i as f64, b.attempts as f64))
        .collect();
    let max_attempts = timeline.iter().map(|b| b.attempts).max().unwrap_or(0);
    let y_top = (max_attempts as f64 * 1.2).ceil().max(1.0);
    let x_top = (timeline.len().saturating_sub(1)).max(1) as f64;

    let datasets = vec![Dataset::default()
        .name("attempts")
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(PRIMARY))
        .data(&points)];

    let chart = Chart::new(datasets)
        .block(block)
        .x_axis(
            Axis::default()
                .style(Style::default().fg(Color::Gray))
                .bounds([0.0, x_top])
                .labels(axis_time_labels(timeline)),
        )
        .y_axis(
            Axis::default()
                .style(Style::default().fg(Color::Gray))
                .bounds([0.0, y_top])
                .labels(vec![Span::raw("0"), Span::raw(format!("{}", y_top as u64))]),
        );
    f.render_widget(chart, area);
}

fn axis_time_labels(timeline: &[TimeBucket]) -> Vec<Span<'static>> {
    let first = timeline.first().map(|b| bucket_label(&b.time)).unwrap_or_default();
    let last = timeline.last().map(|b| bucket_label(&b.time)).unwrap_or_default();
    vec![Span::raw(first), Span::raw(last)]
}

// Ключ корзины в UTC, на оси показываем локальное HH:MM
pub fn bucket_label(key: &str) -> String {
    DateTime::parse_from_rfc3339(key)
        .map(|t| t.with_timezone(&Local).format("%H:%M").to_string())
        .unwrap_or_else(|_| key.to_string())
}

fn draw_side_stats(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(u16::try_from(app.top_n.max(1)).unwrap_or(u16::MAX).saturating_add(2)), Constraint::Min(0)])
        .split(area);

    let items: Vec<ListItem> = if app.stats.top_ips.is_empty() {
        vec![ListItem::new(Span::styled("No data yet", Style::default().fg(Color::Gray)))]
    } else {
        app.stats
            .top_ips
            .iter()
            .map(|x| {
                ListItem::new(Line::from(vec![
                    Span::styled(format!("{:<18}", x.ip), Style::default().fg(Color::White).add_modifier(Modifier::BOLD)),
                    Span::styled(format!("{} hits", x.count), Style::default().fg(Color::Cyan)),
                ]))
            })
            .collect()
    };
    let attackers = List::new(items).block(Block::default().borders(Borders::ALL).title(" Top Attackers "));
    f.render_widget(attackers, chunks[0]);

    let bars: Vec<Bar> = app
        .stats
        .top_ports
        .iter()
        .map(|p| {
            Bar::default()
                .label(Line::from(p.port.to_string()))
                .value(p.count as u64)
                .style(Style::default().fg(PRIMARY))
        })
        .collect();

    let ports = BarChart::default()
        .block(Block::default().borders(Borders::ALL).title(" Target Ports "))
        .direction(Direction::Horizontal)
        .bar_width(1)
        .bar_gap(0)
        .value_style(Style::default().fg(Color::White).add_modifier(Modifier::BOLD))
        .data(BarGroup::default().bars(&bars));
    f.render_widget(ports, chunks[1]);
}

fn draw_log_table(f: &mut Frame, app: &mut App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Connection Logs ")
        .title(Title::from(" Real-time incoming traffic ").alignment(Alignment::Right));

    if app.store.is_empty() {
        let placeholder = Paragraph::new("Waiting for traffic...")
            .style(Style::default().fg(Color::Gray))
            .alignment(Alignment::Center)
            .block(block);
        f.render_widget(placeholder, area);
        return;
    }

    let header = Row::new(vec!["Timestamp", "Source IP", "Src Port", "Dst Port", "Payload Preview"])
        .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
        .bottom_margin(1);

    let rows: Vec<Row> = app
        .visible_rows()
        .map(|r| {
            let rec = &r.record;
            let when = rec
                .parsed_time()
                .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| rec.timestamp.clone());
            let port_bg = if rec.dst_port == 22 { DANGER } else { PRIMARY };

            Row::new(vec![
                Cell::from(when),
                Cell::from(rec.src_ip.clone()).style(Style::default().add_modifier(Modifier::BOLD)),
                Cell::from(rec.src_port.to_string()),
                Cell::from(format!(" {} ", rec.dst_port)).style(Style::default().bg(port_bg).fg(Color::White)),
                Cell::from(rec.preview().to_string()).style(Style::default().fg(Color::Gray)),
            ])
        })
        .collect();

    let table = Table::new(rows, [
        Constraint::Length(20),
        Constraint::Length(16),
        Constraint::Length(9),
        Constraint::Length(9),
        Constraint::Min(20),
    ])
    .header(header)
    .block(block)
    .highlight_style(Style::default().bg(Color::DarkGray));

    f.render_stateful_widget(table, area, &mut app.table_state);
}
