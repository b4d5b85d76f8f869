//! Rendering of the session screen
//!
//! ```text
//! +------------------------------------------------+
//! | Assessment name   Question 2 of 5   1✓ [2] 3×   |
//! +------------------------------------------------+
//! | Prompt, choices or answer editor, status        |
//! +------------------------------------------------+
//! | Transcript sections separated by rules          |
//! +------------------------------------------------+
//! | > chat input                                    |
//! +------------------------------------------------+
//!  help line
//! ```

use super::app::{App, Focus};
use crate::model::AnswerStatus;
use crate::state_machine::{LoadState, SessionState};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};
use std::ops::Range;
use unicode_width::UnicodeWidthChar;

const HELP: &str =
    "Enter check/send  Tab focus  ↑↓ choose  Ctrl-N next  Ctrl-G go to  Ctrl-E explain  Ctrl-R restart  PgUp/PgDn scroll  Esc quit";

pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(9),
            Constraint::Min(5),
            Constraint::Length(3),
            Constraint::Length(1),
        ])
        .split(frame.area());

    match app.session.as_deref() {
        Some(state) if state.load == LoadState::Ready => {
            render_header(frame, chunks[0], app, state);
            render_question(frame, chunks[1], app, state);
            render_transcript(frame, chunks[2], app, state);
        }
        Some(SessionState {
            load: LoadState::Failed { message },
            ..
        }) => {
            let text = Paragraph::new(format!("Could not load questions: {message}"))
                .style(Style::default().fg(Color::Red))
                .block(Block::default().borders(Borders::ALL).title(" Error "));
            frame.render_widget(text, chunks[1]);
        }
        _ => render_skeleton(frame, &chunks),
    }

    render_chat_input(frame, chunks[3], app);

    let help = app.notice.as_deref().map_or_else(
        || Line::from(Span::styled(HELP, Style::default().fg(Color::DarkGray))),
        |notice| Line::from(Span::styled(notice, Style::default().fg(Color::Red))),
    );
    frame.render_widget(Paragraph::new(help), chunks[4]);
}

fn render_skeleton(frame: &mut Frame, chunks: &[Rect]) {
    let dim = Style::default().fg(Color::DarkGray);
    for (area, title) in chunks.iter().zip([" … ", " Loading questions… ", " Transcript "]) {
        frame.render_widget(
            Block::default().borders(Borders::ALL).title(title).style(dim),
            *area,
        );
    }
}

fn render_header(frame: &mut Frame, area: Rect, app: &App, state: &SessionState) {
    let mut spans = vec![
        Span::styled(
            state.assessment.name.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw("   "),
        Span::raw(if state.questions.is_empty() {
            "No questions".to_string()
        } else {
            state.progress_label()
        }),
        Span::raw("   "),
    ];

    for (index, question) in state.questions.iter().enumerate() {
        let label = format!("{}{}", index + 1, question.marker());
        let style = match question.is_correct() {
            Some(true) => Style::default().fg(Color::Green),
            Some(false) => Style::default().fg(Color::Red),
            None => Style::default(),
        };
        if index == state.active_index {
            spans.push(Span::styled(
                format!("[{label}]"),
                style.add_modifier(Modifier::BOLD),
            ));
        } else {
            spans.push(Span::styled(label, style));
        }
        spans.push(Span::raw(" "));
    }

    if let Some(digits) = &app.goto {
        spans.push(Span::styled(
            format!("  go to: {digits}_"),
            Style::default().fg(Color::Yellow),
        ));
    }

    let header = Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL));
    frame.render_widget(header, area);
}

fn render_question(frame: &mut Frame, area: Rect, app: &App, state: &SessionState) {
    let Some(question) = state.active_question() else {
        let empty = Paragraph::new("This assessment has no questions.")
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(empty, area);
        return;
    };

    let mut lines = vec![Line::from(question.prompt.clone()), Line::default()];

    let choices = question.choices();
    if choices.is_empty() {
        lines.push(Line::from(vec![
            Span::styled("Answer: ", Style::default().fg(Color::Cyan)),
            Span::raw(app.draft.clone()),
            Span::styled(
                if app.focus == Focus::Answer { "_" } else { "" },
                Style::default().add_modifier(Modifier::SLOW_BLINK),
            ),
        ]));
    } else {
        for (index, choice) in choices.iter().enumerate() {
            let selected = *choice == app.draft;
            let pointer = if index == app.choice_cursor && app.focus == Focus::Answer {
                "›"
            } else {
                " "
            };
            let mark = if selected { "(•)" } else { "( )" };
            let style = if selected {
                Style::default().add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            lines.push(Line::from(Span::styled(
                format!("{pointer} {mark} {choice}"),
                style,
            )));
        }
    }

    lines.push(Line::default());
    lines.push(status_line(state));

    let border = if app.focus == Focus::Answer {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };
    let panel = Paragraph::new(lines).wrap(Wrap { trim: false }).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border)
            .title(" Question "),
    );
    frame.render_widget(panel, area);
}

fn status_line(state: &SessionState) -> Line<'static> {
    let Some(question) = state.active_question() else {
        return Line::default();
    };
    let (text, color) = match state.status_of(question) {
        AnswerStatus::Pending => ("Checking...", Color::Yellow),
        AnswerStatus::Correct => ("Correct", Color::Green),
        AnswerStatus::Incorrect => ("Incorrect", Color::Red),
        AnswerStatus::Drafted if question.is_grade_stale() => {
            ("Edited since last check", Color::DarkGray)
        }
        AnswerStatus::Drafted | AnswerStatus::Unanswered => ("", Color::Reset),
    };
    let mut spans = vec![Span::styled(text, Style::default().fg(color))];
    if state.can_check() {
        spans.push(Span::styled(
            "  Enter to check",
            Style::default().fg(Color::DarkGray),
        ));
    }
    if state.is_streaming() {
        spans.push(Span::styled(
            "  streaming reply…",
            Style::default().fg(Color::DarkGray),
        ));
    }
    Line::from(spans)
}

fn render_transcript(frame: &mut Frame, area: Rect, app: &App, state: &SessionState) {
    let block = Block::default().borders(Borders::ALL).title(" Explanation ");
    let inner = block.inner(area);
    let lines = transcript_lines(state.transcript.sections(), usize::from(inner.width));
    let window = visible_window(
        lines.len(),
        usize::from(inner.height),
        usize::from(app.scroll_back),
    );

    // Only the visible rows are handed over, so row counts never hit the
    // widget's u16 scroll offset
    let separator = Style::default().fg(Color::DarkGray);
    let rendered: Vec<Line> = lines
        .into_iter()
        .skip(window.start)
        .take(window.len())
        .map(|line| match line {
            TranscriptLine::Text(text) => Line::from(text),
            TranscriptLine::Separator(rule) => Line::from(Span::styled(rule, separator)),
        })
        .collect();

    frame.render_widget(Paragraph::new(rendered).block(block), area);
}

/// Rows of a `total`-row transcript shown in a pane `height` rows tall,
/// `scroll_back` rows up from the bottom. Scrolling stops at the first row.
fn visible_window(total: usize, height: usize, scroll_back: usize) -> Range<usize> {
    let bottom = total.saturating_sub(scroll_back).max(height.min(total));
    bottom.saturating_sub(height)..bottom
}

fn render_chat_input(frame: &mut Frame, area: Rect, app: &App) {
    let focused = app.focus == Focus::Chat;
    let border = if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };
    let input = Paragraph::new(Line::from(vec![
        Span::styled("> ", Style::default().fg(Color::Cyan)),
        Span::raw(app.chat_input.clone()),
        Span::raw(if focused { "_" } else { "" }),
    ]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border)
            .title(" Ask a follow-up "),
    );
    frame.render_widget(input, area);
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TranscriptLine {
    Text(String),
    Separator(String),
}

/// Lay out transcript sections as display lines, with a rule between
/// sections. Wrapping is done here so the scroll offset counts real rows.
fn transcript_lines<'a>(
    sections: impl Iterator<Item = &'a str>,
    width: usize,
) -> Vec<TranscriptLine> {
    let width = width.max(1);
    let mut lines = Vec::new();
    for (index, section) in sections.enumerate() {
        if index > 0 {
            lines.push(TranscriptLine::Separator("─".repeat(width)));
        }
        for paragraph in section.split('\n') {
            lines.extend(wrap(paragraph, width).into_iter().map(TranscriptLine::Text));
        }
    }
    lines
}

/// Hard wrap at `width` terminal columns
fn wrap(text: &str, width: usize) -> Vec<String> {
    if text.is_empty() {
        return vec![String::new()];
    }
    let mut rows = Vec::new();
    let mut row = String::new();
    let mut used = 0;
    for c in text.chars() {
        let columns = UnicodeWidthChar::width(c).unwrap_or(0);
        if used + columns > width && !row.is_empty() {
            rows.push(std::mem::take(&mut row));
            used = 0;
        }
        row.push(c);
        used += columns;
    }
    rows.push(row);
    rows
}
