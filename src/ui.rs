use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, BorderType, Borders, Paragraph},
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::app::{App, MAX_QUESTION_CHARS};
use crate::theme::{Palette, ThemeMode};

const TITLE: &str = " Chatbot ";
const PLACEHOLDER: &str = "Example: How does AI work?";
const EMPTY_TRANSCRIPT: &str = "Ask a question to get started.";
const SPINNER: [&str; 3] = ["◐", "◓", "◑"];
const SEND_BUTTON_WIDTH: u16 = 12;
const MAX_BANNER_LINES: usize = 3;

/// Greedy word wrap by display width. Words wider than `width` are split.
/// Explicit newlines are kept, including blank lines.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut rows = Vec::new();

    for line in text.lines() {
        let mut row = String::new();
        let mut row_width = 0;

        for word in line.split(' ') {
            let word_width = word.width();
            if row_width > 0 && row_width + 1 + word_width > width {
                rows.push(std::mem::take(&mut row));
                row_width = 0;
            }
            if row_width > 0 {
                row.push(' ');
                row_width += 1;
            }
            for c in word.chars() {
                let char_width = c.width().unwrap_or(0);
                if row_width > 0 && row_width + char_width > width {
                    rows.push(std::mem::take(&mut row));
                    row_width = 0;
                }
                row.push(c);
                row_width += char_width;
            }
        }

        rows.push(row);
    }

    rows
}

/// The part of `row` that falls in columns `skip..skip + take`.
/// A wide character straddling either edge is left out.
fn slice_columns(row: &str, skip: usize, take: usize) -> String {
    let mut column = 0;
    let mut visible = String::new();
    for c in row.chars() {
        let char_width = c.width().unwrap_or(0);
        if column >= skip && column + char_width <= skip + take {
            visible.push(c);
        }
        column += char_width;
        if column >= skip + take {
            break;
        }
    }
    visible
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();
    let palette = app.theme.palette();

    frame.render_widget(
        Block::default().style(Style::default().bg(palette.background).fg(palette.foreground)),
        area,
    );

    let banner_width = area.width.saturating_sub(4) as usize;
    let banner_height = app
        .error
        .as_deref()
        .map(|error| (wrap_text(error, banner_width).len().min(MAX_BANNER_LINES) + 2) as u16)
        .unwrap_or(0);

    // Main layout: header, error banner, transcript, input, footer
    let [header_area, banner_area, chat_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(banner_height),
        Constraint::Min(3),
        Constraint::Length(4),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area, &palette);
    if let Some(error) = app.error.as_deref() {
        render_error_banner(error, frame, banner_area, &palette);
    }
    render_transcript(app, frame, chat_area, &palette);
    render_input(app, frame, input_area, &palette);
    render_footer(app, frame, footer_area, &palette);
}

fn render_header(app: &mut App, frame: &mut Frame, area: Rect, palette: &Palette) {
    // The button names the mode it switches to
    let button_label = match app.theme {
        ThemeMode::Light => " ☾ Dark mode ",
        ThemeMode::Dark => " ☀ Light mode ",
    };
    let button_width = (button_label.width() as u16).min(area.width);
    let [title_area, button_area] = Layout::horizontal([
        Constraint::Min(0),
        Constraint::Length(button_width),
    ])
    .areas(area);

    let title = Paragraph::new(Line::from(vec![
        Span::styled(TITLE, Style::default().fg(palette.border).bold()),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(palette.muted),
        ),
    ]));
    frame.render_widget(title, title_area);

    let button = Paragraph::new(button_label)
        .style(Style::default().bg(palette.button_bg).fg(palette.button_fg).bold());
    frame.render_widget(button, button_area);
    app.theme_button_area = Some(button_area);
}

fn render_error_banner(error: &str, frame: &mut Frame, area: Rect, palette: &Palette) {
    let width = area.width.saturating_sub(4) as usize;
    let lines: Vec<Line> = wrap_text(error, width)
        .into_iter()
        .take(MAX_BANNER_LINES)
        .map(Line::from)
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(palette.error_fg))
        .title(" Error ");

    let banner = Paragraph::new(lines)
        .block(block)
        .style(Style::default().bg(palette.error_bg).fg(palette.error_fg));
    frame.render_widget(banner, area);
}

fn render_transcript(app: &mut App, frame: &mut Frame, area: Rect, palette: &Palette) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(palette.border));
    let inner = block.inner(area);

    let lines = transcript_lines(app, inner.width as usize, palette);

    // Store geometry for scrolling and mouse hit-testing
    let total_lines = u16::try_from(lines.len()).unwrap_or(u16::MAX);
    app.chat_area = Some(area);
    app.chat_height = inner.height;
    app.max_chat_scroll = total_lines.saturating_sub(inner.height);
    app.chat_scroll = if app.follow_bottom {
        app.max_chat_scroll
    } else {
        app.chat_scroll.min(app.max_chat_scroll)
    };

    let chat = Paragraph::new(Text::from(lines))
        .block(block)
        .scroll((app.chat_scroll, 0));
    frame.render_widget(chat, area);
}

fn transcript_lines(app: &App, width: usize, palette: &Palette) -> Vec<Line<'static>> {
    if app.chat_messages.is_empty() && !app.is_busy() {
        return vec![Line::from(Span::styled(
            EMPTY_TRANSCRIPT,
            Style::default().fg(palette.muted).add_modifier(Modifier::ITALIC),
        ))];
    }

    // Keep bubbles narrower than the pane so the two sides read apart
    let bubble_width = (width * 4 / 5).max(1);
    let mut lines: Vec<Line> = Vec::new();

    for msg in &app.chat_messages {
        let (label, color, alignment) = if msg.is_user() {
            ("You", palette.user, Alignment::Right)
        } else {
            ("Bot", palette.assistant, Alignment::Left)
        };

        lines.push(
            Line::from(Span::styled(label, Style::default().fg(color).add_modifier(Modifier::BOLD)))
                .alignment(alignment),
        );
        for row in wrap_text(&msg.content, bubble_width) {
            lines.push(Line::from(row).alignment(alignment));
        }
        lines.push(Line::default());
    }

    if app.is_busy() {
        lines.push(Line::from(Span::styled(
            "Bot",
            Style::default().fg(palette.assistant).add_modifier(Modifier::BOLD),
        )));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("Thinking{}", dots),
            Style::default().fg(palette.muted).add_modifier(Modifier::ITALIC),
        )));
    }

    lines
}

fn render_input(app: &mut App, frame: &mut Frame, area: Rect, palette: &Palette) {
    let [input_area, send_area] = Layout::horizontal([
        Constraint::Min(10),
        Constraint::Length(SEND_BUTTON_WIDTH),
    ])
    .areas(area);

    let busy = app.is_busy();
    let border_color = if busy { palette.muted } else { palette.border };

    let too_long = app.draft.trim().chars().count() > MAX_QUESTION_CHARS;
    let counter_color = if too_long { palette.error_fg } else { palette.muted };
    let counter = Line::from(Span::styled(
        format!(" {}/{} ", app.draft_len(), MAX_QUESTION_CHARS),
        Style::default().fg(counter_color),
    ))
    .alignment(Alignment::Right);

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(border_color))
        .title(" Ask ")
        .title_bottom(counter);
    let inner = input_block.inner(input_area);

    if app.draft.is_empty() {
        let placeholder = Paragraph::new(PLACEHOLDER)
            .style(Style::default().fg(palette.muted))
            .block(input_block);
        frame.render_widget(placeholder, input_area);
    } else {
        let inner_width = inner.width as usize;
        let inner_height = inner.height.max(1) as usize;

        // Locate the cursor as (row, terminal column)
        let before: String = app.draft.chars().take(app.cursor).collect();
        let cursor_row = before.matches('\n').count();
        let cursor_col = before.rsplit('\n').next().map(|s| s.width()).unwrap_or(0);

        // Scroll both ways so the cursor stays visible
        let row_offset = cursor_row.saturating_sub(inner_height - 1);
        let col_offset = if inner_width > 0 && cursor_col >= inner_width {
            cursor_col - inner_width + 1
        } else {
            0
        };

        let visible: Vec<Line> = app
            .draft
            .split('\n')
            .skip(row_offset)
            .take(inner_height)
            .map(|row| Line::from(slice_columns(row, col_offset, inner_width)))
            .collect();

        let input = Paragraph::new(visible)
            .style(Style::default().fg(palette.foreground))
            .block(input_block);
        frame.render_widget(input, input_area);

        if !busy {
            frame.set_cursor_position((
                inner.x + (cursor_col - col_offset) as u16,
                inner.y + (cursor_row - row_offset) as u16,
            ));
        }
    }

    if app.draft.is_empty() && !busy {
        frame.set_cursor_position((inner.x, inner.y));
    }

    let label = if busy {
        format!("{} ...", SPINNER[app.animation_frame as usize % SPINNER.len()])
    } else {
        "Send".to_string()
    };
    let send_block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(border_color));
    let send = Paragraph::new(label)
        .alignment(Alignment::Center)
        .style(Style::default().fg(if busy { palette.muted } else { palette.user }).bold())
        .block(send_block);
    frame.render_widget(send, send_area);
    app.send_button_area = Some(send_area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect, palette: &Palette) {
    // Key style: inverted so hints stay readable in both themes
    let key_style = Style::default().bg(palette.button_bg).fg(palette.button_fg);
    let label_style = Style::default().fg(palette.muted);

    let mut hints = vec![
        Span::styled(" Enter ", key_style),
        Span::styled(" send ", label_style),
        Span::styled(" Shift/Alt+Enter ", key_style),
        Span::styled(" newline ", label_style),
    ];
    if app.is_busy() {
        hints.extend(vec![
            Span::styled(" Esc ", key_style),
            Span::styled(" cancel ", label_style),
        ]);
    }
    hints.extend(vec![
        Span::styled(" Ctrl+T ", key_style),
        Span::styled(" theme ", label_style),
        Span::styled(" PgUp/PgDn ", key_style),
        Span::styled(" scroll ", label_style),
        Span::styled(" Ctrl+Q ", key_style),
        Span::styled(" quit ", label_style),
    ]);

    frame.render_widget(Paragraph::new(Line::from(hints)), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::{app_with, FakeService};
    use crate::app::ChatMessage;
    use ratatui::{backend::TestBackend, Terminal};
    use std::time::Duration;

    fn draw(app: &mut App, width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|frame| render(app, frame)).unwrap();
        terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn test_wrap_text_breaks_on_words() {
        assert_eq!(wrap_text("hello world", 5), vec!["hello", "world"]);
        assert_eq!(wrap_text("a b c", 10), vec!["a b c"]);
    }

    #[test]
    fn test_wrap_text_splits_long_words() {
        assert_eq!(wrap_text("abcdefgh", 3), vec!["abc", "def", "gh"]);
        assert_eq!(wrap_text("ab ééééé", 3), vec!["ab", "ééé", "éé"]);
    }

    #[test]
    fn test_wrap_text_measures_display_width() {
        assert_eq!(wrap_text("一二三四五", 4), vec!["一二", "三四", "五"]);
        assert_eq!(wrap_text("ok 日本語", 5), vec!["ok", "日本", "語"]);
        assert!(wrap_text("一二三四五六七", 5).iter().all(|row| row.width() <= 5));
    }

    #[test]
    fn test_slice_columns_drops_straddling_wide_chars() {
        assert_eq!(slice_columns("a一b", 0, 3), "a一");
        assert_eq!(slice_columns("a一b", 2, 2), "b");
        assert_eq!(slice_columns("abc", 1, 1), "b");
    }

    #[test]
    fn test_wrap_text_keeps_blank_lines() {
        assert_eq!(wrap_text("a\n\nb", 10), vec!["a", "", "b"]);
    }

    #[tokio::test]
    async fn test_empty_widget_shows_placeholders() {
        let mut app = app_with(FakeService::answering("42"));
        let screen = draw(&mut app, 80, 20);

        assert!(screen.contains("Chatbot"));
        assert!(screen.contains(EMPTY_TRANSCRIPT));
        assert!(screen.contains(PLACEHOLDER));
        assert!(screen.contains("Send"));
        assert!(screen.contains("0/1000"));
        assert!(screen.contains("Shift/Alt+Enter"));
        assert!(!screen.contains("Error"));
    }

    #[tokio::test]
    async fn test_transcript_and_banner_are_rendered() {
        let mut app = app_with(FakeService::answering("42"));
        app.chat_messages.push(ChatMessage::user("What is the answer?"));
        app.chat_messages.push(ChatMessage::assistant("42"));
        app.error = Some("An error occurred. No response from server.".to_string());

        let screen = draw(&mut app, 80, 24);

        assert!(screen.contains("You"));
        assert!(screen.contains("What is the answer?"));
        assert!(screen.contains("Bot"));
        assert!(screen.contains("No response from server."));
    }

    #[tokio::test]
    async fn test_theme_button_names_the_other_mode() {
        let mut app = app_with(FakeService::answering("42"));
        assert!(draw(&mut app, 80, 20).contains("Dark mode"));

        app.toggle_theme();
        let screen = draw(&mut app, 80, 20);
        assert!(screen.contains("Light mode"));
        assert!(!screen.contains("Dark mode"));
        assert!(app.theme_button_area.is_some());
    }

    #[tokio::test]
    async fn test_busy_widget_shows_thinking() {
        let mut app = app_with(FakeService::slow("late", Duration::from_secs(3600)));
        app.draft = "hi".to_string();
        app.submit();

        let screen = draw(&mut app, 80, 20);
        assert!(screen.contains("Thinking"));
        assert!(screen.contains("Esc"));
        assert!(!screen.contains("Send"));
    }

    #[tokio::test]
    async fn test_latest_message_stays_in_view() {
        let mut app = app_with(FakeService::answering("42"));
        for i in 0..30 {
            app.chat_messages.push(ChatMessage::user(format!("question number {}", i)));
        }
        app.scroll_to_bottom();

        let screen = draw(&mut app, 60, 20);

        assert!(screen.contains("question number 29"));
        assert!(!screen.contains("question number 0"));
        assert!(app.max_chat_scroll > 0);
        assert_eq!(app.chat_scroll, app.max_chat_scroll);
    }

    #[tokio::test]
    async fn test_scrolled_back_view_is_kept() {
        let mut app = app_with(FakeService::answering("42"));
        for i in 0..30 {
            app.chat_messages.push(ChatMessage::user(format!("question number {}", i)));
        }
        draw(&mut app, 60, 20);

        app.scroll_up(u16::MAX);
        let screen = draw(&mut app, 60, 20);

        assert_eq!(app.chat_scroll, 0);
        assert!(screen.contains("question number 0"));
        assert!(!screen.contains("question number 29"));
    }

    #[tokio::test]
    async fn test_long_draft_counter() {
        let mut app = app_with(FakeService::answering("42"));
        app.draft = "x".repeat(1200);
        app.cursor = app.draft_len();

        let screen = draw(&mut app, 80, 20);
        assert!(screen.contains("1200/1000"));
    }

    fn count_cjk(screen: &str) -> usize {
        screen.chars().filter(|c| ('\u{4e00}'..='\u{9fff}').contains(c)).count()
    }

    #[tokio::test]
    async fn test_wide_character_answer_is_not_clipped() {
        let mut app = app_with(FakeService::answering("42"));
        let answer = format!("{}終", "人工知能".repeat(10));
        assert_eq!(answer.chars().count(), 41);
        app.chat_messages.push(ChatMessage::assistant(answer));

        let screen = draw(&mut app, 60, 20);

        assert!(screen.contains('終'));
        assert_eq!(count_cjk(&screen), 41);
    }

    #[tokio::test]
    async fn test_wide_character_draft_keeps_cursor_end_visible() {
        let mut app = app_with(FakeService::answering("42"));
        app.draft = format!("{}終", "字".repeat(39));
        app.cursor = app.draft_len();

        let screen = draw(&mut app, 80, 20);

        assert!(screen.contains('終'));
        assert!(screen.contains("40/1000"));
    }
}
