use chrono::Local;
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use tui_textarea::TextArea;
use unicode_width::UnicodeWidthChar;

use crate::app::{ConfirmChoice, Overlay};
use crate::core::{EditorBuffer, Note, Theme};
use crate::input::Focus;

const LIST_WIDTH: u16 = 30;
const TAB_WIDTH: usize = 4;

pub struct UiModel<'a> {
    pub notes: Vec<&'a Note>,
    pub current_id: Option<&'a str>,
    pub editor: &'a EditorBuffer,
    pub preview: &'a str,
    pub overlay: &'a Overlay,
    pub focus: Focus,
    pub theme: Theme,
    pub filter: &'a str,
    pub status: &'a str,
    pub unsaved: bool,
    pub hint: &'static str,
    pub renderer: &'static str,
}

#[derive(Debug, Clone, Copy)]
struct Palette {
    text: Color,
    muted: Color,
    accent: Color,
    tag: Color,
    selected_bg: Color,
}

impl Palette {
    fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Dark => Self {
                text: Color::Gray,
                muted: Color::DarkGray,
                accent: Color::Cyan,
                tag: Color::Magenta,
                selected_bg: Color::Indexed(237),
            },
            Theme::Light => Self {
                text: Color::Black,
                muted: Color::Gray,
                accent: Color::Blue,
                tag: Color::Red,
                selected_bg: Color::Indexed(254),
            },
        }
    }

    fn border(self, focused: bool) -> Style {
        if focused {
            Style::default().fg(self.accent)
        } else {
            Style::default().fg(self.muted)
        }
    }
}

struct Panes {
    list: Rect,
    editor: Rect,
    preview: Rect,
    status: Rect,
}

fn split(area: Rect) -> Panes {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(area);
    let list_width = LIST_WIDTH.min(area.width / 3);
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(list_width),
            Constraint::Fill(1),
            Constraint::Fill(1),
        ])
        .split(rows[0]);
    Panes {
        list: cols[0],
        editor: cols[1],
        preview: cols[2],
        status: rows[1],
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaneSizes {
    pub editor_width: u16,
    pub editor_height: u16,
}

/// Text area available inside the editor pane for a terminal of this size.
pub fn pane_sizes(width: u16, height: u16) -> PaneSizes {
    let panes = split(Rect::new(0, 0, width, height));
    PaneSizes {
        editor_width: panes.editor.width.saturating_sub(2),
        editor_height: panes.editor.height.saturating_sub(2),
    }
}

pub fn draw(frame: &mut Frame<'_>, model: UiModel<'_>) {
    let palette = Palette::for_theme(model.theme);
    let panes = split(frame.area());

    draw_list(frame, panes.list, &model, palette);
    let cursor = draw_editor(frame, panes.editor, &model, palette);
    draw_preview(frame, panes.preview, &model, palette);
    draw_status(frame, panes.status, &model, palette);

    if matches!(model.overlay, Overlay::None) && model.focus == Focus::Editor {
        if let Some((x, y)) = cursor {
            frame.set_cursor_position((x, y));
        }
    }
    draw_overlay(frame, frame.area(), model.overlay, palette);
}

fn local_date(raw: &str) -> String {
    crate::core::parse_timestamp(raw)
        .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default()
}

fn draw_list(frame: &mut Frame<'_>, area: Rect, model: &UiModel<'_>, palette: Palette) {
    let title = if model.filter.trim().is_empty() {
        format!("Notes ({})", model.notes.len())
    } else {
        format!("Notes ({}) /{}", model.notes.len(), model.filter.trim())
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(palette.border(model.focus == Focus::List));

    let items: Vec<ListItem<'_>> = model
        .notes
        .iter()
        .map(|note| {
            ListItem::new(vec![
                Line::styled(
                    note.display_title().to_string(),
                    Style::default().fg(palette.text),
                ),
                Line::styled(local_date(&note.updated_at), Style::default().fg(palette.muted)),
            ])
        })
        .collect();

    let mut state = ListState::default();
    state.select(
        model
            .current_id
            .and_then(|cur| model.notes.iter().position(|n| n.id == cur)),
    );
    let list = List::new(items).block(block).highlight_style(
        Style::default()
            .bg(palette.selected_bg)
            .add_modifier(Modifier::BOLD),
    );
    frame.render_stateful_widget(list, area, &mut state);
}

fn draw_status(frame: &mut Frame<'_>, area: Rect, model: &UiModel<'_>, palette: Palette) {
    let ln = model.editor.cursor.line + 1;
    let col = model.editor.cursor.col + 1;
    let dirty = if model.unsaved { "*" } else { "" };
    let text = format!(
        " {}{dirty} | Ln {ln}, Col {col} | {} | {}",
        model.status, model.renderer, model.hint
    );
    frame.render_widget(
        Paragraph::new(text).style(Style::default().fg(palette.muted)),
        area,
    );
}

fn draw_editor(
    frame: &mut Frame<'_>,
    area: Rect,
    model: &UiModel<'_>,
    palette: Palette,
) -> Option<(u16, u16)> {
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Editor")
        .border_style(palette.border(model.focus == Focus::Editor));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if inner.width < 2 || inner.height < 1 {
        return None;
    }

    let buffer = model.editor;
    let top = buffer.viewport.top_line;
    let height = inner.height as usize;
    let mut lines: Vec<Line<'_>> = Vec::with_capacity(height);
    let mut cursor_xy = None;

    for row in 0..height {
        let line_idx = top + row;
        if line_idx >= buffer.line_count() {
            lines.push(Line::styled("~", Style::default().fg(palette.muted)));
            continue;
        }
        let on_cursor_line = line_idx == buffer.cursor.line;
        let (line, cursor_x) = expand_line(
            &buffer.line_text(line_idx),
            buffer.viewport.left_col,
            inner.width as usize,
            on_cursor_line.then_some(buffer.cursor.col),
        );
        lines.push(line.style(Style::default().fg(palette.text)));
        if on_cursor_line {
            cursor_xy = Some((inner.x + cursor_x as u16, inner.y + row as u16));
        }
    }

    frame.render_widget(Paragraph::new(lines), inner);
    cursor_xy
}

/// Lays a source line out in display columns, expanding tabs and honouring
/// wide characters. Returns the visible slice and the cursor's screen column.
fn expand_line(
    source: &str,
    left_col: usize,
    max_cols: usize,
    cursor_char: Option<usize>,
) -> (Line<'static>, usize) {
    let mut out = String::new();
    let mut col = 0usize;
    let mut cursor_x = None;

    for (idx, ch) in source.chars().enumerate() {
        if cursor_char == Some(idx) {
            cursor_x = Some(col);
        }
        let width = if ch == '\t' {
            TAB_WIDTH - (col % TAB_WIDTH)
        } else {
            UnicodeWidthChar::width(ch).unwrap_or(1).max(1)
        };
        let next = col + width;
        if col >= left_col && next <= left_col + max_cols {
            if ch == '\t' {
                out.extend(std::iter::repeat_n(' ', width));
            } else {
                out.push(ch);
            }
        }
        col = next;
    }

    let cursor_x = cursor_x
        .unwrap_or(col)
        .saturating_sub(left_col)
        .min(max_cols.saturating_sub(1));
    (Line::from(out), cursor_x)
}

fn draw_preview(frame: &mut Frame<'_>, area: Rect, model: &UiModel<'_>, palette: Palette) {
    let block = Block::default()
        .title("Preview")
        .borders(Borders::ALL)
        .border_style(palette.border(false));
    let lines: Vec<Line<'static>> = model
        .preview
        .lines()
        .map(|l| highlight_html(l, palette))
        .collect();
    frame.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
        area,
    );
}

/// Dims markup so the text of the rendered note stands out.
fn highlight_html(line: &str, palette: Palette) -> Line<'static> {
    let mut spans = Vec::new();
    let mut rest = line;
    while let Some(start) = rest.find('<') {
        if start > 0 {
            spans.push(Span::styled(
                rest[..start].to_string(),
                Style::default().fg(palette.text),
            ));
        }
        let end = rest[start..].find('>').map_or(rest.len(), |e| start + e + 1);
        spans.push(Span::styled(
            rest[start..end].to_string(),
            Style::default().fg(palette.tag),
        ));
        rest = &rest[end..];
    }
    if !rest.is_empty() {
        spans.push(Span::styled(rest.to_string(), Style::default().fg(palette.text)));
    }
    Line::from(spans)
}

fn input_box(frame: &mut Frame<'_>, rect: Rect, title: &str, value: &str, footer: &str) {
    frame.render_widget(Clear, rect);
    let mut textarea = TextArea::default();
    textarea.insert_str(value);
    textarea.set_block(Block::default().title(title.to_string()).borders(Borders::ALL));
    frame.render_widget(&textarea, rect);

    let footer_rect = Rect {
        x: rect.x + 2,
        y: rect.y + rect.height.saturating_sub(1),
        width: rect.width.saturating_sub(4),
        height: 1,
    };
    frame.render_widget(Paragraph::new(footer.to_string()), footer_rect);
}

fn message_box(frame: &mut Frame<'_>, area: Rect, title: &str, message: &str, color: Color) {
    let rect = centered_rect(70, 30, area);
    frame.render_widget(Clear, rect);
    let widget = Paragraph::new(message.to_string())
        .alignment(Alignment::Left)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .title(title.to_string())
                .borders(Borders::ALL)
                .border_style(Style::default().fg(color)),
        );
    frame.render_widget(widget, rect);
}

fn draw_overlay(frame: &mut Frame<'_>, area: Rect, overlay: &Overlay, palette: Palette) {
    match overlay {
        Overlay::None => {}
        Overlay::Help => {
            let rect = centered_rect(70, 70, area);
            frame.render_widget(Clear, rect);
            let text = vec![
                Line::from("Tab switch list/editor | Enter open note | Esc back to list"),
                Line::from("n / Ctrl+N new note | r / Ctrl+R rename | d / Ctrl+D delete"),
                Line::from("/ / Ctrl+F search | e / Ctrl+E export | i / Ctrl+O import"),
                Line::from("t / Ctrl+T toggle theme | ? / F1 help | q / Ctrl+Q quit"),
                Line::from("Edits are saved automatically shortly after you stop typing"),
                Line::from("Esc close overlay"),
            ];
            let widget = Paragraph::new(text)
                .alignment(Alignment::Left)
                .block(Block::default().title("Help").borders(Borders::ALL));
            frame.render_widget(widget, rect);
        }
        Overlay::NewNote { title } => input_box(
            frame,
            centered_rect(60, 20, area),
            "New note title",
            title,
            "Enter create | Esc cancel",
        ),
        Overlay::Rename { title, .. } => input_box(
            frame,
            centered_rect(60, 20, area),
            "Rename note",
            title,
            "Enter rename | Esc cancel",
        ),
        Overlay::Search { input } => input_box(
            frame,
            centered_rect(60, 20, area),
            "Search notes",
            input,
            "Enter keep filter | Esc clear",
        ),
        Overlay::Import { path } => input_box(
            frame,
            centered_rect(70, 20, area),
            "Import JSON file",
            path,
            "Enter import | Esc cancel",
        ),
        Overlay::ConfirmDelete { title, choice, .. } => {
            let rect = centered_rect(60, 30, area);
            frame.render_widget(Clear, rect);
            let yes = if *choice == ConfirmChoice::Yes {
                "[Yes]"
            } else {
                " Yes "
            };
            let no = if *choice == ConfirmChoice::No {
                "[No]"
            } else {
                " No "
            };
            let widget = Paragraph::new(format!(
                "Delete note \"{title}\"? This cannot be undone.\n\n{yes}   {no}"
            ))
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .title("Confirm Delete")
                    .borders(Borders::ALL),
            );
            frame.render_widget(widget, rect);
        }
        Overlay::Export {
            items,
            cursor,
            select_all,
        } => {
            let rect = centered_rect(70, 60, area);
            frame.render_widget(Clear, rect);
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(3), Constraint::Length(3)])
                .split(rect);

            let mut lines = vec![Line::from(format!(
                "[{}] Select all",
                if *select_all { "x" } else { " " }
            ))];
            for (idx, item) in items.iter().enumerate() {
                let marker = if idx == *cursor { ">" } else { " " };
                let check = if item.checked { "x" } else { " " };
                let style = if idx == *cursor {
                    Style::default().fg(palette.accent)
                } else {
                    Style::default()
                };
                lines.push(Line::styled(
                    format!(
                        "{marker} [{check}] {}  {}",
                        item.title,
                        local_date(&item.updated_at)
                    ),
                    style,
                ));
            }
            frame.render_widget(
                Paragraph::new(lines)
                    .block(Block::default().title("Export notes").borders(Borders::ALL)),
                chunks[0],
            );
            frame.render_widget(
                Paragraph::new("Space toggle | a all | Enter export selected | e export all | Esc cancel")
                    .block(Block::default().borders(Borders::ALL)),
                chunks[1],
            );
        }
        Overlay::Warning { message } => message_box(frame, area, "Warning", message, Color::Yellow),
        Overlay::Error { message } => message_box(frame, area, "Error", message, Color::Red),
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
