use ratatui::layout::{Constraint, Direction, Layout, Rect};

/// Header with the counters, the practice card, and a footer for notices
/// and key hints.
pub struct AppLayout {
    pub header: Rect,
    pub main: Rect,
    pub footer: Rect,
}

impl AppLayout {
    pub fn new(area: Rect, footer_lines: u16) -> Self {
        let vertical = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(8),
                Constraint::Length(footer_lines.max(1) + 2),
            ])
            .split(area);

        Self {
            header: vertical[0],
            main: vertical[1],
            footer: vertical[2],
        }
    }
}

/// Greedily pack key hints into as few lines as fit `width`.
pub fn pack_hint_lines(hints: &[&str], width: usize) -> Vec<String> {
    if width == 0 || hints.is_empty() {
        return Vec::new();
    }

    let separator = "  ";
    let mut out: Vec<String> = Vec::new();
    let mut current = String::new();

    for hint in hints.iter().filter(|h| !h.is_empty()) {
        if current.is_empty() {
            current.push_str(hint);
            continue;
        }
        if current.chars().count() + separator.len() + hint.chars().count() <= width {
            current.push_str(separator);
            current.push_str(hint);
        } else {
            out.push(std::mem::take(&mut current));
            current.push_str(hint);
        }
    }

    if !current.is_empty() {
        out.push(current);
    }
    out
}

/// A rectangle of at most `width` x `height`, centred in `area`.
pub fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let w = width.min(area.width);
    let h = height.min(area.height);
    let left = area.x.saturating_add(area.width.saturating_sub(w) / 2);
    let top = area.y.saturating_add(area.height.saturating_sub(h) / 2);
    Rect::new(left, top, w, h)
}
