use crate::app::App;
use crate::timer::Control;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Gauge, Paragraph},
    Frame,
};

pub fn draw(f: &mut Frame, app: &mut App) {
    let area = f.area();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(7),
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(area);

    draw_header(f, chunks[0], app);
    draw_timer(f, chunks[1], app);
    draw_counter(f, chunks[2], app);
    draw_status_bar(f, chunks[4], app);

    if app.take_mode_effect() {
        app.trigger_mode_change_effect(chunks[1]);
    }
    let delta = app.frame_delta();
    app.effect_manager
        .process_effects(delta, f.buffer_mut(), chunks[1]);
}

fn draw_header(f: &mut Frame, area: Rect, app: &App) {
    let theme = &app.config.theme;
    let icons = &app.config.icons;
    let text = Line::from(vec![
        Span::raw(icons.header_left.clone()),
        Span::styled(
            "TOMATO",
            Style::default()
                .fg(theme.accent)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(icons.header_right.clone()),
    ]);
    f.render_widget(
        Paragraph::new(text).alignment(Alignment::Center).block(
            Block::default()
                .borders(Borders::BOTTOM)
                .border_style(Style::default().fg(theme.black)),
        ),
        area,
    );
}

fn draw_timer(f: &mut Frame, area: Rect, app: &App) {
    let theme = &app.config.theme;
    let icons = &app.config.icons;
    let snapshot = &app.snapshot;
    let mode_color = theme.mode_color(snapshot.mode);

    let block = Block::default()
        .title(Span::styled(
            format!(" {} {} ", icons.timer, snapshot.mode.label()),
            Style::default().fg(mode_color).add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(mode_color));
    let inner_area = block.inner(area);
    f.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(inner_area);

    f.render_widget(
        Paragraph::new(snapshot.clock())
            .style(
                Style::default()
                    .fg(theme.foreground)
                    .add_modifier(Modifier::BOLD),
            )
            .alignment(Alignment::Center),
        rows[0],
    );
    f.render_widget(
        Gauge::default()
            .gauge_style(Style::default().fg(mode_color).bg(theme.black))
            .ratio(snapshot.progress())
            .label(""),
        rows[1],
    );

    let (state_icon, state_text) = if snapshot.running {
        (&icons.play, "running")
    } else if snapshot.control == Control::Resume {
        (&icons.pause, "paused")
    } else {
        (&icons.stop, "ready")
    };
    let mut state = vec![Span::styled(
        format!("{} {}", state_icon, state_text),
        Style::default().fg(theme.gray),
    )];
    if let Some(ends) = app.ends_at() {
        state.push(Span::styled(
            format!(" {} ends {}", icons.separator, ends.format("%H:%M")),
            Style::default().fg(theme.gray),
        ));
    }
    f.render_widget(
        Paragraph::new(Line::from(state)).alignment(Alignment::Center),
        rows[2],
    );
}

fn draw_counter(f: &mut Frame, area: Rect, app: &App) {
    let theme = &app.config.theme;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(theme.black));
    f.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled(
                format!("{} ", app.config.icons.counter),
                Style::default().fg(theme.work),
            ),
            Span::styled(app.counter_text(), Style::default().fg(theme.foreground)),
        ]))
        .alignment(Alignment::Center)
        .block(block),
        area,
    );
}

fn draw_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let theme = &app.config.theme;
    let snapshot = &app.snapshot;
    let (state_text, state_color) = if snapshot.running {
        ("RUNNING", theme.mode_color(snapshot.mode))
    } else {
        ("PAUSED", theme.gray)
    };
    let help = format!(
        "space:{} │ s:start │ p:pause │ r:reset │ c:clear count │ q:quit",
        snapshot.control.label()
    );
    f.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled(
                format!(" {} ", state_text),
                Style::default()
                    .bg(state_color)
                    .fg(theme.background)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(" "),
            Span::raw(help),
        ]))
        .block(Block::default().style(Style::default().bg(theme.black).fg(theme.gray))),
        area,
    );
}
