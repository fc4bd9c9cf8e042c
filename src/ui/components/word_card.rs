use std::time::Duration;

use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph, Widget, Wrap};

use spellmaster::engine::turn::{Turn, TurnStatus};

use crate::ui::theme::Theme;

/// The practice card: prompt, answer box and feedback for the current word.
pub struct WordCard<'a> {
    turn: Option<&'a Turn>,
    input: &'a str,
    hint: Option<String>,
    listening: bool,
    silence_left: Option<Duration>,
    advancing: bool,
    theme: &'a Theme,
}

impl<'a> WordCard<'a> {
    pub fn new(turn: Option<&'a Turn>, input: &'a str, theme: &'a Theme) -> Self {
        Self {
            turn,
            input,
            hint: None,
            listening: false,
            silence_left: None,
            advancing: false,
            theme,
        }
    }

    pub fn hint(mut self, hint: Option<String>) -> Self {
        self.hint = hint;
        self
    }

    pub fn listening(mut self, listening: bool, silence_left: Option<Duration>) -> Self {
        self.listening = listening;
        self.silence_left = silence_left;
        self
    }

    pub fn advancing(mut self, advancing: bool) -> Self {
        self.advancing = advancing;
        self
    }
}

impl Widget for WordCard<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;

        let block = Block::bordered()
            .title(" Spell the word ")
            .border_style(Style::default().fg(if self.listening {
                colors.listening()
            } else {
                colors.border_focused()
            }))
            .style(Style::default().bg(colors.bg()));
        let inner = block.inner(area);
        block.render(area, buf);

        let Some(turn) = self.turn else {
            Paragraph::new(Line::from(Span::styled(
                "No word yet",
                Style::default().fg(colors.muted()),
            )))
            .alignment(Alignment::Center)
            .render(inner, buf);
            return;
        };

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2),
                Constraint::Length(3),
                Constraint::Length(2),
                Constraint::Min(0),
            ])
            .split(inner);

        let (prompt, prompt_color) = match turn.status {
            TurnStatus::Idle => ("Listen, then spell the word".to_string(), colors.fg()),
            TurnStatus::Incorrect => (
                format!("Not quite - try again ({} wrong)", turn.wrong_attempts),
                colors.warning(),
            ),
            TurnStatus::Correct => (format!("Correct! {}", turn.word), colors.success()),
            TurnStatus::Revealed => (format!("The word was: {}", turn.word), colors.error()),
        };
        Paragraph::new(Line::from(Span::styled(
            prompt,
            Style::default().fg(prompt_color).add_modifier(Modifier::BOLD),
        )))
        .alignment(Alignment::Center)
        .render(rows[0], buf);

        let answer_box = Block::bordered()
            .title(if self.listening { " Dictating " } else { " Answer " })
            .border_style(Style::default().fg(if self.listening {
                colors.listening()
            } else {
                colors.accent_dim()
            }));
        let answer = if turn.status.is_terminal() {
            turn.submitted.clone().unwrap_or_default()
        } else {
            format!("{}_", self.input)
        };
        Paragraph::new(Line::from(Span::styled(answer, Style::default().fg(colors.fg()))))
            .alignment(Alignment::Center)
            .block(answer_box)
            .render(rows[1], buf);

        let mut status = Vec::new();
        if let Some(left) = self.silence_left {
            status.push(Span::styled(
                format!("submitting in {:.1}s", left.as_secs_f32()),
                Style::default().fg(colors.listening()),
            ));
        } else if self.listening {
            status.push(Span::styled(
                "listening - say the letters one by one",
                Style::default().fg(colors.listening()),
            ));
        }
        if self.advancing {
            status.push(Span::styled("next word coming up", Style::default().fg(colors.muted())));
        }
        Paragraph::new(Line::from(status))
            .alignment(Alignment::Center)
            .render(rows[2], buf);

        if let Some(hint) = self.hint {
            Paragraph::new(Line::from(vec![
                Span::styled("Hint: ", Style::default().fg(colors.muted())),
                Span::styled(
                    hint,
                    Style::default().fg(colors.hint()).add_modifier(Modifier::BOLD),
                ),
            ]))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .render(rows[3], buf);
        } else if turn.hint_available() {
            Paragraph::new(Line::from(Span::styled(
                "Ctrl-T for a hint",
                Style::default().fg(colors.muted()),
            )))
            .alignment(Alignment::Center)
            .render(rows[3], buf);
        }
    }
}
