use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget, Wrap},
};
use std::time::Instant;
use unicode_width::UnicodeWidthStr;

use crate::{
    aligner::{Alignment as WordAlignment, Mismatch, WordStatus},
    app::{App, StatusKind},
    audio::AudioDevice,
    confetti::Celebrations,
    playback::Speaker,
};

const HORIZONTAL_MARGIN: u16 = 3;
const VERTICAL_MARGIN: u16 = 1;
const SIDEBAR_WIDTH: u16 = 34;
const SIDEBAR_MIN_TOTAL_WIDTH: u16 = 90;

const KEY_HINTS: &str =
    "^R replay  Tab skip  ^D mastered  ^P/^K sounds  ^E export  ^O import  F1 help  Esc quit";

const HELP_LINES: [(&str, &str); 12] = [
    ("Ctrl+R", "replay the sentence"),
    ("Tab / PgDn / Ctrl+N", "next sentence"),
    ("Shift+Tab / PgUp", "previous sentence"),
    ("Ctrl+D", "mastered, remove from the bank"),
    ("Ctrl+P", "toggle completion sound"),
    ("Ctrl+K", "toggle keypress sound"),
    ("Ctrl+E", "export sentences"),
    ("Ctrl+O", "import sentences"),
    ("Ctrl+W", "delete last word"),
    ("Ctrl+U", "clear input"),
    ("F1", "close this help"),
    ("Esc / Ctrl+C", "quit"),
];

impl<P: Speaker, D: AudioDevice> Widget for &App<P, D> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let practice = self.practice();

        let bold_style = Style::default().add_modifier(Modifier::BOLD);
        let dim_style = Style::default().add_modifier(Modifier::DIM);

        let (main_area, sidebar_area) = if area.width >= SIDEBAR_MIN_TOTAL_WIDTH {
            let columns = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Min(1), Constraint::Length(SIDEBAR_WIDTH)])
                .split(area);
            (columns[0], Some(columns[1]))
        } else {
            (area, None)
        };

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .vertical_margin(VERTICAL_MARGIN)
            .constraints([
                Constraint::Length(1), // header
                Constraint::Length(1), // status
                Constraint::Length(1), // padding
                Constraint::Length(1), // prompt label
                Constraint::Length(5), // input
                Constraint::Length(1), // padding
                Constraint::Min(3),    // words + hint
                Constraint::Length(1), // key hints
            ])
            .split(main_area);

        let prefs = self.preferences();
        let header = Line::from(vec![
            Span::styled("dictate", bold_style.fg(Color::Cyan)),
            Span::raw("  "),
            Span::styled(practice.position_label(), bold_style),
            Span::raw("  "),
            Span::styled(
                format!(
                    "chime {}  keys {}",
                    if prefs.completion_sound { "on" } else { "off" },
                    if prefs.keypress_sound { "on" } else { "off" }
                ),
                dim_style,
            ),
        ]);
        Paragraph::new(header).render(chunks[0], buf);

        if let Some(status) = self.status() {
            let color = match status.kind {
                StatusKind::Success => Color::Green,
                StatusKind::Error => Color::Red,
                StatusKind::Info => Color::Yellow,
            };
            Paragraph::new(Span::styled(status.text.as_str(), Style::default().fg(color)))
                .render(chunks[1], buf);
        }

        match practice.current() {
            Some(sentence) => {
                Paragraph::new(Span::styled("Type what you hear", bold_style)).render(chunks[3], buf);

                let input = if practice.input().is_empty() {
                    Line::from(Span::styled(
                        "Start typing the sentence...",
                        dim_style.add_modifier(Modifier::ITALIC),
                    ))
                } else {
                    Line::from(vec![
                        Span::raw(practice.input()),
                        Span::styled("▏", Style::default().fg(Color::Cyan)),
                    ])
                };
                Paragraph::new(input)
                    .block(Block::default().borders(Borders::ALL))
                    .wrap(Wrap { trim: false })
                    .render(chunks[4], buf);

                let mut lines = vec![
                    Line::from(vec![
                        Span::styled("Speaking: ", dim_style),
                        Span::raw(sentence.text.as_str()),
                    ]),
                    Line::default(),
                    word_line(practice.alignment()),
                ];
                if let Some(mismatch) = &practice.alignment().mismatch {
                    lines.push(Line::default());
                    lines.push(Line::from(Span::styled(
                        mismatch_hint(mismatch),
                        Style::default().fg(Color::Red),
                    )));
                }
                Paragraph::new(lines)
                    .wrap(Wrap { trim: true })
                    .render(chunks[6], buf);
            }
            None => {
                Paragraph::new(vec![
                    Line::from("Add a sentence to get started."),
                    Line::from(Span::styled(
                        "dictate add \"Your sentence here.\"  or  Ctrl+O to import",
                        dim_style,
                    )),
                ])
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true })
                .render(chunks[6], buf);
            }
        }

        Paragraph::new(Span::styled(KEY_HINTS, dim_style)).render(chunks[7], buf);

        if let Some(sidebar) = sidebar_area {
            render_sentence_list(self, sidebar, buf);
        }

        if self.show_help() {
            render_help(area, buf);
        }

        render_confetti(self.celebrations(), Instant::now(), area, buf);
    }
}

/// One span per expected word: green when correct, red at the first error, dim after.
pub fn word_line(alignment: &WordAlignment) -> Line<'_> {
    let bold_style = Style::default().add_modifier(Modifier::BOLD);
    let mut spans = Vec::with_capacity(alignment.word_states.len() * 2);
    for (idx, state) in alignment.word_states.iter().enumerate() {
        if idx > 0 {
            spans.push(Span::raw(" "));
        }
        let style = match state.status {
            WordStatus::Correct => bold_style.fg(Color::Green),
            WordStatus::Error => bold_style.fg(Color::Red).add_modifier(Modifier::UNDERLINED),
            WordStatus::Upcoming => Style::default().add_modifier(Modifier::DIM),
        };
        spans.push(Span::styled(state.word.as_str(), style));
    }
    Line::from(spans)
}

pub fn mismatch_hint(mismatch: &Mismatch) -> String {
    if mismatch.is_insertion() {
        format!("You added an extra word: \"{}\".", mismatch.typed)
    } else {
        format!(
            "Check the word \"{}\". You typed \"{}\".",
            mismatch.expected, mismatch.typed
        )
    }
}

fn render_sentence_list<P: Speaker, D: AudioDevice>(app: &App<P, D>, area: Rect, buf: &mut Buffer) {
    let practice = app.practice();
    let block = Block::default()
        .borders(Borders::LEFT)
        .title(Span::styled(
            " Sentences ",
            Style::default().add_modifier(Modifier::BOLD),
        ));
    let inner = block.inner(area);
    block.render(area, buf);

    let max_width = inner.width.saturating_sub(4) as usize;
    let visible = inner.height as usize;
    // keep the current sentence in view
    let first = practice
        .current_index()
        .saturating_sub(visible.saturating_sub(1) / 2)
        .min(practice.len().saturating_sub(visible));

    let lines: Vec<Line> = practice
        .sentences()
        .iter()
        .enumerate()
        .skip(first)
        .take(visible)
        .map(|(idx, sentence)| {
            let active = idx == practice.current_index();
            let marker = if active { "▸ " } else { "  " };
            let style = if active {
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            Line::from(vec![
                Span::styled(marker, style),
                Span::styled(truncate(&sentence.text, max_width), style),
            ])
        })
        .collect();

    Paragraph::new(lines).render(inner, buf);
}

fn truncate(text: &str, max_width: usize) -> String {
    if text.width() <= max_width {
        return text.to_string();
    }
    let mut out = String::new();
    for c in text.chars() {
        if out.width() + 1 >= max_width {
            break;
        }
        out.push(c);
    }
    out.push('…');
    out
}

fn render_help(area: Rect, buf: &mut Buffer) {
    let width = 52.min(area.width);
    let height = (HELP_LINES.len() as u16 + 2).min(area.height);
    let popup = Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    );

    let lines: Vec<Line> = HELP_LINES
        .iter()
        .map(|(keys, action)| {
            Line::from(vec![
                Span::styled(
                    format!("{keys:<22}"),
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                ),
                Span::raw(*action),
            ])
        })
        .collect();

    Clear.render(popup, buf);
    Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(" Keys "))
        .render(popup, buf);
}

/// Draw every live confetti piece on top of whatever is already in `buf`.
pub fn render_confetti(celebrations: &Celebrations, now: Instant, area: Rect, buf: &mut Buffer) {
    if area.width == 0 || area.height == 0 {
        return;
    }
    for burst in celebrations.bursts() {
        let elapsed = burst.elapsed_ms(now);
        for piece in &burst.pieces {
            let Some(frame) = piece.frame_at(elapsed) else {
                continue;
            };
            if !(0.0..100.0).contains(&frame.x) || !(0.0..1.0).contains(&frame.y) {
                continue;
            }
            let x = (frame.x / 100.0 * area.width as f64) as u16;
            let y = (frame.y * area.height as f64) as u16;
            if x >= area.width || y >= area.height {
                continue;
            }

            let (r, g, b) = piece.rgb();
            if let Some(cell) = buf.cell_mut((area.x + x, area.y + y)) {
                cell.set_char(frame.glyph());
                cell.set_style(
                    Style::default()
                        .fg(Color::Rgb(r, g, b))
                        .add_modifier(Modifier::BOLD),
                );
            }
        }
    }
}
