use crate::prefs::FieldValue;
use crate::tui::app::{App, Mode, SegmentKind};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph},
    Frame,
};

/// Background of every match
const MATCH_BG: Color = Color::Yellow;
/// Background of the selected match
const CURRENT_MATCH_BG: Color = Color::Rgb(255, 165, 0);

const HELP_TEXT: &[(&str, &str)] = &[
    ("/  Ctrl+F", "Focus the find bar"),
    ("Enter", "Search (in the find bar)"),
    ("n  N", "Next / previous match"),
    ("Ctrl+N  Ctrl+P", "Next / previous match (in the find bar)"),
    ("j k  Up Down", "Scroll"),
    ("h l  Left Right", "Scroll sideways"),
    ("PgUp PgDn", "Page"),
    ("g  G", "Top / bottom (bottom follows output)"),
    ("F2  F3  F4", "Settings / commands / aliases"),
    ("Ctrl+S  Esc", "Save / cancel preferences"),
    ("?  F1", "This help"),
    ("q  Ctrl+C", "Quit"),
];

pub fn draw(f: &mut Frame, app: &App) {
    let chunks = layout(f.area());

    draw_output(f, app, chunks[0]);
    draw_find_bar(f, app, chunks[1]);
    draw_status_bar(f, app, chunks[2]);

    match app.mode {
        Mode::Preferences => draw_preferences(f, app),
        Mode::Help => draw_help(f),
        Mode::Normal | Mode::Find => {}
    }
}

fn layout(area: Rect) -> std::rc::Rc<[Rect]> {
    Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),    // Output
            Constraint::Length(3), // Find bar
            Constraint::Length(1), // Status bar
        ])
        .split(area)
}

/// Text area of the output pane for a terminal of `area`, inside its border
pub fn output_viewport(area: Rect) -> (usize, usize) {
    let pane = layout(area)[0];
    (
        pane.width.saturating_sub(2) as usize,
        pane.height.saturating_sub(2) as usize,
    )
}

fn draw_output(f: &mut Frame, app: &App, area: Rect) {
    let height = area.height.saturating_sub(2) as usize;
    let end = (app.scroll_y + height).min(app.line_count());

    let lines: Vec<Line> = (app.scroll_y..end)
        .map(|i| {
            let text = app.line(i);
            let spans: Vec<Span> = app
                .line_segments(i)
                .into_iter()
                .map(|segment| {
                    let style = match segment.kind {
                        SegmentKind::Plain => Style::default(),
                        SegmentKind::Match => Style::default().fg(Color::Black).bg(MATCH_BG),
                        SegmentKind::CurrentMatch => Style::default()
                            .fg(Color::Black)
                            .bg(CURRENT_MATCH_BG)
                            .add_modifier(Modifier::BOLD),
                    };
                    Span::styled(&text[segment.range], style)
                })
                .collect();
            Line::from(spans)
        })
        .collect();

    let title = if app.is_running() {
        " Output (running) ".to_string()
    } else {
        format!(" Output ({} lines) ", app.line_count())
    };

    let output = Paragraph::new(Text::from(lines))
        .block(Block::default().borders(Borders::ALL).title(title))
        .scroll((0, app.scroll_x.min(u16::MAX as usize) as u16));

    f.render_widget(output, area);
}

fn draw_find_bar(f: &mut Frame, app: &App, area: Rect) {
    let focused = app.mode == Mode::Find;
    let border_style = if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let input = Paragraph::new(app.find_input.as_str()).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border_style)
            .title(" Find (/: focus, Enter: search, n/N: next/prev) ")
            .title_bottom(Line::from(format!(" {} ", app.search_status)).right_aligned()),
    );

    f.render_widget(input, area);

    // Show cursor
    if focused {
        let x = area.x + app.find_input.chars().count() as u16 + 1;
        f.set_cursor_position((x.min(area.right().saturating_sub(2)), area.y + 1));
    }
}

fn draw_status_bar(f: &mut Frame, app: &App, area: Rect) {
    let status =
        Paragraph::new(app.status_message.as_str()).style(Style::default().fg(Color::Cyan));

    f.render_widget(status, area);
}

fn draw_preferences(f: &mut Frame, app: &App) {
    let Some(form) = app.form.as_ref() else {
        return;
    };
    let area = centered_rect(60, 60, f.area());

    let items: Vec<ListItem> = if form.fields().is_empty() {
        vec![ListItem::new(Span::styled(
            "(empty)",
            Style::default().fg(Color::DarkGray),
        ))]
    } else {
        form.fields()
            .iter()
            .enumerate()
            .map(|(i, field)| {
                let value = match &field.value {
                    FieldValue::Toggle(true) => "[x]".to_string(),
                    FieldValue::Toggle(false) => "[ ]".to_string(),
                    FieldValue::Text(text) | FieldValue::Raw(text) => text.clone(),
                };
                let line = Line::from(vec![
                    Span::styled(format!("{}: ", field.key), Style::default().fg(Color::Blue)),
                    Span::raw(value),
                ]);
                let style = if i == form.selected() {
                    Style::default()
                        .bg(Color::DarkGray)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                };
                ListItem::new(line).style(style)
            })
            .collect()
    };

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!(" {} ", form.category().title()))
            .title_bottom(" Ctrl+S: save  Esc: cancel  Enter/Space: toggle "),
    );

    f.render_widget(Clear, area);
    f.render_widget(list, area);
}

fn draw_help(f: &mut Frame) {
    let area = centered_rect(60, 70, f.area());

    let lines: Vec<Line> = HELP_TEXT
        .iter()
        .map(|(keys, what)| {
            Line::from(vec![
                Span::styled(format!("{:<18}", keys), Style::default().fg(Color::Yellow)),
                Span::raw(*what),
            ])
        })
        .collect();

    let help = Paragraph::new(Text::from(lines))
        .block(Block::default().borders(Borders::ALL).title(" Help (Esc to close) "));

    f.render_widget(Clear, area);
    f.render_widget(help, area);
}

/// Rectangle of `percent_x` by `percent_y` centered in `area`
fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(rows[1])[1]
}
