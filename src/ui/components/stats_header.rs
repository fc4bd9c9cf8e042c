use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph, Widget};

use spellmaster::engine::stats::Stats;
use spellmaster::engine::word_bank::Difficulty;

use crate::ui::theme::Theme;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MicIndicator {
    Unavailable,
    Off,
    Listening,
    /// Permission was refused or the microphone kept failing.
    Blocked,
}

pub struct StatsHeader<'a> {
    stats: &'a Stats,
    difficulty: Difficulty,
    mic: MicIndicator,
    auto_listen: bool,
    theme: &'a Theme,
}

impl<'a> StatsHeader<'a> {
    pub fn new(
        stats: &'a Stats,
        difficulty: Difficulty,
        mic: MicIndicator,
        auto_listen: bool,
        theme: &'a Theme,
    ) -> Self {
        Self {
            stats,
            difficulty,
            mic,
            auto_listen,
            theme,
        }
    }
}

impl Widget for StatsHeader<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;
        let base = Style::default().bg(colors.header_bg());

        let block = Block::bordered()
            .border_style(Style::default().fg(colors.border()))
            .style(base);
        let inner = block.inner(area);
        block.render(area, buf);

        let accuracy = self.stats.accuracy();
        let accuracy_color = if self.stats.total == 0 {
            colors.muted()
        } else if accuracy >= 90.0 {
            colors.success()
        } else if accuracy >= 70.0 {
            colors.warning()
        } else {
            colors.error()
        };

        let left = Line::from(vec![
            Span::styled(
                " spellmaster ",
                base.fg(colors.header_fg()).add_modifier(Modifier::BOLD),
            ),
            Span::styled(format!("| {} ", self.difficulty.label()), base.fg(colors.muted())),
            Span::styled("| Correct ", base.fg(colors.header_fg())),
            Span::styled(
                format!("{}/{} ", self.stats.correct, self.stats.total),
                base.fg(colors.accent()),
            ),
            Span::styled(format!("{accuracy:.0}% "), base.fg(accuracy_color)),
            Span::styled("| Streak ", base.fg(colors.header_fg())),
            Span::styled(format!("{}", self.stats.streak), base.fg(colors.success())),
            Span::styled(
                format!(" (best {})", self.stats.best_streak),
                base.fg(colors.muted()),
            ),
        ]);
        Paragraph::new(left).render(inner, buf);

        let (mic_text, mic_color) = match self.mic {
            MicIndicator::Unavailable => ("mic n/a", colors.muted()),
            MicIndicator::Off => ("mic off", colors.muted()),
            MicIndicator::Listening => ("listening", colors.listening()),
            MicIndicator::Blocked => ("mic blocked", colors.error()),
        };
        let auto = if self.auto_listen { "auto" } else { "manual" };
        let right = Line::from(vec![
            Span::styled(format!("{auto} | "), base.fg(colors.muted())),
            Span::styled(
                format!("{mic_text} "),
                base.fg(mic_color).add_modifier(Modifier::BOLD),
            ),
        ]);
        Paragraph::new(right)
            .alignment(Alignment::Right)
            .render(inner, buf);
    }
}
