use crate::app::{App, Focus};
use crate::palette::{to_color, PALETTE, PALETTE_NAMES};
use crate::pixels::{self, UPPER_HALF};
use crate::reconciler::{Tab, UiStatus};
use crate::settings::{
    NUM_SPARKLES_MAX, NUM_SPARKLES_MIN, SPARKLE_SIZE_MAX, SPARKLE_SIZE_MIN, SPEED_MAX, SPEED_MIN,
};
use crate::simulation::{self, Grid};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph, Wrap},
    Frame,
};

const SIDEBAR_WIDTH: u16 = 36;

/// Max scroll for help content
pub const HELP_CONTENT_LINES: u16 = 40;

/// Terminal rows per preset in the list; the thumbnail is twice as wide
const PRESET_ROW_HEIGHT: u16 = 5;

const TABS: [Tab; 3] = [Tab::Colors, Tab::Values, Tab::Presets];

// UI color scheme
const BORDER_COLOR: Color = Color::Cyan;
const HIGHLIGHT_COLOR: Color = Color::Yellow;
const TEXT_COLOR: Color = Color::White;
const DIM_TEXT_COLOR: Color = Color::Gray;

/// Creates a standard styled block with rounded borders
fn styled_block(title: &str) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(BORDER_COLOR))
        .title(title)
}

/// Areas of the sidebar, shared by rendering and mouse hit-testing
struct SidebarLayout {
    tabs: Rect,
    content: Rect,
    button: Rect,
    controls: Rect,
}

fn split_frame(area: Rect) -> (Rect, Rect) {
    let layout = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(0)])
        .split(area);
    (layout[0], layout[1])
}

fn sidebar_layout(area: Rect) -> SidebarLayout {
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Tabs
            Constraint::Min(7),    // Tab content
            Constraint::Length(3), // Primary button
            Constraint::Length(7), // Controls
        ])
        .split(area);
    SidebarLayout {
        tabs: sections[0],
        content: sections[1],
        button: sections[2],
        controls: sections[3],
    }
}

/// Inner area of a bordered box
fn inner(area: Rect) -> Rect {
    Block::default().borders(Borders::ALL).inner(area)
}

/// First item to show so that `cursor` stays visible
fn list_offset(cursor: usize, visible: usize) -> usize {
    if visible == 0 {
        0
    } else {
        cursor.saturating_sub(visible - 1)
    }
}

fn contains(area: Rect, column: u16, row: u16) -> bool {
    column >= area.x && column < area.x + area.width && row >= area.y && row < area.y + area.height
}

/// What a mouse position lands on
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Hit {
    Tab(Tab),
    Color(usize),
    Preset(usize),
    Button,
}

/// Resolve a mouse position against the current layout
pub fn hit_test(frame_area: Rect, app: &App, column: u16, row: u16) -> Option<Hit> {
    if app.fullscreen_mode {
        return None;
    }
    let (sidebar, _) = split_frame(frame_area);
    let layout = sidebar_layout(sidebar);

    let tabs = inner(layout.tabs);
    if contains(tabs, column, row) {
        let slot = (tabs.width / TABS.len() as u16).max(1);
        let index = ((column - tabs.x) / slot) as usize;
        return TABS.get(index).map(|tab| Hit::Tab(*tab));
    }
    if contains(layout.button, column, row) {
        return Some(Hit::Button);
    }

    let content = inner(layout.content);
    if !contains(content, column, row) {
        return None;
    }
    let line = (row - content.y) as usize;
    match app.session.tab() {
        Tab::Colors => {
            let offset = list_offset(app.color_cursor, content.height as usize);
            Some(offset + line)
                .filter(|i| *i < PALETTE.len())
                .map(Hit::Color)
        }
        Tab::Values => None,
        Tab::Presets => {
            let visible = (content.height / PRESET_ROW_HEIGHT) as usize;
            let offset = list_offset(app.preset_cursor, visible);
            Some(offset + line / PRESET_ROW_HEIGHT as usize)
                .filter(|i| *i < app.session.presets().len())
                .map(Hit::Preset)
        }
    }
}

/// Main render function
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();

    if app.fullscreen_mode {
        render_canvas(frame, area, app);
    } else {
        let (sidebar, canvas) = split_frame(area);
        render_sidebar(frame, sidebar, app);
        render_canvas(frame, canvas, app);
    }

    if let Some((_, name)) = app.session.confirmation() {
        render_confirmation(frame, area, name);
    }

    if app.show_help {
        render_help_overlay(frame, area, app);
    }
}

fn render_sidebar(frame: &mut Frame, area: Rect, app: &App) {
    let layout = sidebar_layout(area);

    render_tabs(frame, layout.tabs, app);
    match app.session.tab() {
        Tab::Colors => render_colors(frame, layout.content, app),
        Tab::Values => render_values(frame, layout.content, app),
        Tab::Presets => render_presets(frame, layout.content, app),
    }
    render_button(frame, layout.button, app);
    render_controls_box(frame, layout.controls, app);
}

fn render_tabs(frame: &mut Frame, area: Rect, app: &App) {
    let block = styled_block(" Sparkle Matrix ");
    let slot = (inner(area).width / TABS.len() as u16).max(1) as usize;

    let spans: Vec<Span> = TABS
        .iter()
        .map(|tab| {
            let style = if *tab == app.session.tab() {
                Style::default()
                    .fg(HIGHLIGHT_COLOR)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(DIM_TEXT_COLOR)
            };
            Span::styled(format!("{:^width$}", tab.name(), width = slot), style)
        })
        .collect();

    frame.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}

fn render_colors(frame: &mut Frame, area: Rect, app: &App) {
    let block = styled_block(" Colors ");
    let config = app.session.config();

    let content: Vec<Line> = PALETTE
        .iter()
        .zip(PALETTE_NAMES)
        .enumerate()
        .map(|(i, (rgb, name))| {
            let focused = i == app.color_cursor;
            let active = config.active_colors.get(i).copied().unwrap_or(false);
            let prefix = if focused { "> " } else { "  " };
            let mark = if active { "[x] " } else { "[ ] " };
            let style = if focused {
                Style::default().fg(HIGHLIGHT_COLOR)
            } else {
                Style::default().fg(TEXT_COLOR)
            };
            Line::from(vec![
                Span::styled(prefix, style),
                Span::styled("██ ", Style::default().fg(to_color(*rgb))),
                Span::styled(format!("{}{}", mark, name), style),
            ])
        })
        .collect();

    let visible = inner(area).height as usize;
    let scroll = list_offset(app.color_cursor, visible) as u16;
    frame.render_widget(Paragraph::new(content).block(block).scroll((scroll, 0)), area);
}

fn render_values(frame: &mut Frame, area: Rect, app: &App) {
    let block = styled_block(" Values ");
    let config = app.session.config();
    let bar_width = inner(area).width.saturating_sub(4) as usize;

    let make_lines = |label: &str, value: u32, unit: &str, (min, max): (u32, u32), focused: bool| {
        let prefix = if focused { "> " } else { "  " };
        let style = if focused {
            Style::default().fg(HIGHLIGHT_COLOR)
        } else {
            Style::default().fg(TEXT_COLOR)
        };
        let progress = (value.saturating_sub(min)) as f32 / (max - min).max(1) as f32;
        let filled = (progress * bar_width as f32).round() as usize;
        let empty = bar_width.saturating_sub(filled);
        vec![
            Line::from(Span::styled(
                format!("{}{}: {}{}", prefix, label, value, unit),
                style,
            )),
            Line::from(vec![
                Span::raw("  "),
                Span::styled("█".repeat(filled), Style::default().fg(Color::Green)),
                Span::styled("░".repeat(empty), Style::default().fg(Color::DarkGray)),
            ]),
        ]
    };

    let mut content = Vec::new();
    content.extend(make_lines(
        "Number",
        config.num_sparkles,
        "",
        (NUM_SPARKLES_MIN, NUM_SPARKLES_MAX),
        app.focus == Focus::Number,
    ));
    content.extend(make_lines(
        "Size",
        config.sparkle_size,
        "",
        (SPARKLE_SIZE_MIN, SPARKLE_SIZE_MAX),
        app.focus == Focus::Size,
    ));
    content.extend(make_lines(
        "Speed",
        config.speed,
        " ms",
        (SPEED_MIN, SPEED_MAX),
        app.focus == Focus::Speed,
    ));
    content.push(Line::from(Span::styled(
        format!(
            "  Frame every {} ms",
            app.session.tick_interval().as_millis()
        ),
        Style::default().fg(DIM_TEXT_COLOR),
    )));

    frame.render_widget(Paragraph::new(content).block(block), area);
}

fn render_presets(frame: &mut Frame, area: Rect, app: &App) {
    let block = styled_block(" Presets ");
    let list = block.inner(area);
    frame.render_widget(block, area);

    let presets = app.session.presets();
    if presets.is_empty() {
        let hint = Paragraph::new(vec![
            Line::from(Span::styled(
                "No presets yet.",
                Style::default().fg(DIM_TEXT_COLOR),
            )),
            Line::from(Span::styled(
                "Apply a look, then save it.",
                Style::default().fg(DIM_TEXT_COLOR),
            )),
        ])
        .wrap(Wrap { trim: true });
        frame.render_widget(hint, list);
        return;
    }

    let visible = (list.height / PRESET_ROW_HEIGHT) as usize;
    let offset = list_offset(app.preset_cursor, visible);
    let (thumb_cols, thumb_rows) = pixels::fit_square(PRESET_ROW_HEIGHT * 2, PRESET_ROW_HEIGHT);

    for (slot, (index, preset)) in presets
        .iter()
        .enumerate()
        .skip(offset)
        .take(visible)
        .enumerate()
    {
        let row = Rect {
            x: list.x,
            y: list.y + slot as u16 * PRESET_ROW_HEIGHT,
            width: list.width,
            height: PRESET_ROW_HEIGHT,
        };

        let thumb = Rect {
            width: thumb_cols.min(row.width),
            height: thumb_rows,
            ..row
        };
        render_grid(frame, thumb, &simulation::preview(&preset.configuration, preset.id));

        let focused = index == app.preset_cursor;
        let selected = app.session.selected() == Some(preset.id);
        let name_style = match (focused, selected) {
            (_, true) => Style::default()
                .fg(HIGHLIGHT_COLOR)
                .add_modifier(Modifier::BOLD),
            (true, false) => Style::default().fg(HIGHLIGHT_COLOR),
            (false, false) => Style::default().fg(TEXT_COLOR),
        };
        let marker = if selected { "● " } else if focused { "> " } else { "  " };
        let text = vec![
            Line::from(Span::styled(format!("{}{}", marker, preset.name), name_style)),
            Line::from(Span::styled(
                format!("  {}", preset.configuration.summary()),
                Style::default().fg(DIM_TEXT_COLOR),
            )),
        ];
        let text_area = Rect {
            x: row.x + thumb.width + 1,
            width: row.width.saturating_sub(thumb.width + 1),
            ..row
        };
        frame.render_widget(Paragraph::new(text).wrap(Wrap { trim: true }), text_area);
    }
}

fn render_button(frame: &mut Frame, area: Rect, app: &App) {
    let button = app.session.button();
    let style = if button.enabled {
        Style::default()
            .fg(Color::Black)
            .bg(HIGHLIGHT_COLOR)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(DIM_TEXT_COLOR)
    };
    let title = match app.session.status() {
        UiStatus::Loading => " Device: connecting ",
        _ if !app.session.has_api_key() => " Device: offline ",
        _ if app.session.has_pending_edits() => " Device: edits not sent ",
        _ if app.session.device_known() => " Device ",
        _ => " Device: unknown ",
    };

    let paragraph = Paragraph::new(Line::from(Span::styled(
        format!(" {} ", button.label),
        style,
    )))
    .alignment(Alignment::Center)
    .block(styled_block(title));
    frame.render_widget(paragraph, area);
}

fn render_controls_box(frame: &mut Frame, area: Rect, app: &App) {
    let key_style = Style::default().fg(HIGHLIGHT_COLOR);
    let desc_style = Style::default().fg(DIM_TEXT_COLOR);

    let make_control = |key: &str, desc: &str| -> Line<'static> {
        Line::from(vec![
            Span::styled(format!("{:>5}", key), key_style),
            Span::styled(format!(" {}", desc), desc_style),
        ])
    };

    let mut content = match app.session.tab() {
        Tab::Colors => vec![
            make_control("↑↓", "choose color"),
            make_control("Space", "toggle color"),
        ],
        Tab::Values => vec![
            make_control("↑↓", "choose value"),
            make_control("←→", "adjust"),
        ],
        Tab::Presets => vec![
            make_control("↑↓", "choose preset"),
            make_control("Space", "load / hold: delete"),
            make_control("D", "delete"),
        ],
    };
    content.push(make_control("Enter", "primary button"));
    content.push(make_control("Tab", "next tab  V fullscreen"));
    content.push(make_control("H/Q", "help / quit"));

    frame.render_widget(Paragraph::new(content).block(styled_block(" Controls ")), area);
}

fn render_canvas(frame: &mut Frame, area: Rect, app: &App) {
    let grid = app.session.grid();
    let title = format!(
        " {}x{} · {} sparkles · {} lit ",
        grid.width(),
        grid.height(),
        app.session.sparkle_count(),
        grid.lit_count()
    );
    let block = styled_block(&title);

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let (cols, rows) = pixels::fit_square(inner.width, inner.height);
    let square = Rect {
        x: inner.x + (inner.width - cols) / 2,
        y: inner.y + (inner.height - rows) / 2,
        width: cols,
        height: rows,
    };
    render_grid(frame, square, app.session.grid());
}

/// Draw `grid` with half-block cells filling `area`
fn render_grid(frame: &mut Frame, area: Rect, grid: &Grid) {
    for cell in pixels::render_to_cells(grid, area.width, area.height) {
        let x = area.x + cell.x;
        let y = area.y + cell.y;

        if x < area.x + area.width && y < area.y + area.height {
            let cell_rect = Rect {
                x,
                y,
                width: 1,
                height: 1,
            };
            let span = Span::styled(
                UPPER_HALF.to_string(),
                Style::default().fg(cell.top).bg(cell.bottom),
            );
            frame.render_widget(Paragraph::new(Line::from(span)), cell_rect);
        }
    }
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

fn render_confirmation(frame: &mut Frame, area: Rect, name: &str) {
    let popup = centered(area, 40, 6);
    frame.render_widget(Clear, popup);

    let content = vec![
        Line::from(""),
        Line::from(Span::styled(
            format!("Delete preset \"{}\"?", name),
            Style::default().fg(TEXT_COLOR),
        )),
        Line::from(vec![
            Span::styled("Y", Style::default().fg(HIGHLIGHT_COLOR)),
            Span::styled(" delete   ", Style::default().fg(DIM_TEXT_COLOR)),
            Span::styled("N/Esc", Style::default().fg(HIGHLIGHT_COLOR)),
            Span::styled(" keep", Style::default().fg(DIM_TEXT_COLOR)),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Double)
        .border_style(Style::default().fg(Color::Red))
        .title(" Delete ");

    let paragraph = Paragraph::new(content)
        .block(block)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, popup);
}

fn render_help_overlay(frame: &mut Frame, area: Rect, app: &App) {
    let canvas = if app.fullscreen_mode {
        area
    } else {
        split_frame(area).1
    };

    let help_width = 56.min(canvas.width.saturating_sub(4));
    let help_height = area.height.saturating_sub(4).min(30);
    let help_area = centered(canvas, help_width, help_height);

    frame.render_widget(Clear, help_area);

    let heading = |text: &'static str| {
        Line::from(Span::styled(text, Style::default().fg(HIGHLIGHT_COLOR)))
    };

    let content = vec![
        Line::from(""),
        Line::from(Span::styled("SPARKLE MATRIX", Style::default().fg(BORDER_COLOR))),
        Line::from(""),
        Line::from("Random squares of the chosen colors light up on a 64x64 LED matrix. The preview runs locally; the button sends it to the device."),
        Line::from(""),
        heading("COLORS"),
        Line::from("Toggle palette colors. At least one always stays on."),
        Line::from(""),
        heading("VALUES"),
        Line::from("Number of sparkles, their size in LEDs, and the frame interval in ms (lower is faster). Big, numerous sparkles slow the frame rate down."),
        Line::from(""),
        heading("PRESETS"),
        Line::from("Click or Space loads a preset. Hold the mouse on a preset (or press D) to delete it. With nothing selected the button asks the device for a generated preset."),
        Line::from(""),
        heading("BUTTON"),
        Line::from("Apply sends edits, Save preset stores what the device runs, Apply <name> sends a preset."),
        Line::from(""),
        heading("KEYS"),
        Line::from("Tab/Shift+Tab=Tabs, Arrows=Choose/Adjust, Enter=Button, V=Fullscreen, H=Help, Q=Quit"),
        Line::from(""),
    ];

    let content_height = content.len() as u16;
    let visible_height = help_height.saturating_sub(2);
    let is_scrollable = content_height > visible_height;

    let title = if is_scrollable {
        " Help (J/K scroll, H to close) "
    } else {
        " Help (H to close) "
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Double)
        .border_style(Style::default().fg(HIGHLIGHT_COLOR))
        .title(title);

    let paragraph = Paragraph::new(content)
        .block(block)
        .wrap(Wrap { trim: true })
        .scroll((app.help_scroll, 0));

    frame.render_widget(paragraph, help_area);
}
