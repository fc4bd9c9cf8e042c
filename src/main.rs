mod app;
mod event;
mod logging;
mod ui;

use std::io;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Result;
use clap::Parser;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph};
use tracing::{error, info};

use spellmaster::config::Config;
use spellmaster::engine::NoticeLevel;
use spellmaster::engine::transcript::LetterPolicy;
use spellmaster::engine::word_bank::Difficulty;
use spellmaster::store::JsonStore;

use app::{App, AppScreen};
use event::{AppEvent, EventHandler};
use ui::components::stats_header::StatsHeader;
use ui::components::word_card::WordCard;
use ui::layout::{AppLayout, centered_rect, pack_hint_lines};
use ui::theme::Theme;

const TICK_RATE: Duration = Duration::from_millis(50);

#[derive(Parser)]
#[command(
    name = "spellmaster",
    version,
    about = "Spelling trainer: hear a word, then type or dictate it letter by letter"
)]
struct Cli {
    #[arg(short, long, help = "Difficulty: all, or a page from 1 (easy) to 6 (hard)")]
    difficulty: Option<Difficulty>,

    #[arg(short, long, help = "Theme name")]
    theme: Option<String>,

    #[arg(short, long, help = "Word list file (JSON array or one word per line)")]
    words: Option<PathBuf>,

    #[arg(long, help = "Text-to-speech program (espeak-ng, say, spd-say, ...)")]
    tts: Option<String>,

    #[arg(long, help = "Dictation program and arguments")]
    dictation: Option<String>,

    #[arg(long, value_parser = parse_letter_policy, help = "How dictated words count: strict or permissive")]
    letter_policy: Option<LetterPolicy>,

    #[arg(long, help = "Do not switch the microphone on after each word")]
    no_auto_listen: bool,

    #[arg(long, help = "Stay on a word after a correct answer")]
    no_auto_advance: bool,

    #[arg(long, help = "Zero the saved statistics and exit")]
    reset_stats: bool,

    #[arg(long, help = "List bundled themes and exit")]
    list_themes: bool,
}

fn parse_letter_policy(value: &str) -> Result<LetterPolicy, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "strict" => Ok(LetterPolicy::Strict),
        "permissive" => Ok(LetterPolicy::Permissive),
        other => Err(format!("expected strict or permissive, got {other:?}")),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.list_themes {
        for name in Theme::available_themes() {
            println!("{name}");
        }
        return Ok(());
    }
    if cli.reset_stats {
        JsonStore::new()?.reset_stats()?;
        println!("Statistics reset.");
        return Ok(());
    }

    let mut config = Config::load().unwrap_or_else(|e| {
        eprintln!("warning: {e:#}; using default settings");
        Config::default()
    });
    apply_cli(&mut config, cli);
    config.validate();

    match logging::init(&config.log_level) {
        Ok(path) => info!(log = %path.display(), "spellmaster starting"),
        Err(e) => eprintln!("warning: logging disabled: {e:#}"),
    }

    let theme: &'static Theme = Box::leak(Box::new(Theme::load_or_default(&config.theme)));
    let events = EventHandler::new(TICK_RATE);
    let mut app = App::new(config, theme, events.speech_sender())?;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app, &events);

    app.trainer.halt();
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = result {
        error!("exiting on error: {err:#}");
        eprintln!("Error: {err:?}");
    }

    Ok(())
}

fn apply_cli(config: &mut Config, cli: Cli) {
    if let Some(difficulty) = cli.difficulty {
        config.difficulty = difficulty;
    }
    if let Some(theme) = cli.theme {
        config.theme = theme;
    }
    if let Some(words) = cli.words {
        config.word_list = Some(words);
    }
    if let Some(tts) = cli.tts {
        config.tts_command = Some(tts);
    }
    if let Some(dictation) = cli.dictation {
        config.dictation_command = Some(dictation);
    }
    if let Some(policy) = cli.letter_policy {
        config.letter_policy = policy;
    }
    if cli.no_auto_listen {
        config.auto_listen = false;
    }
    if cli.no_auto_advance {
        config.auto_advance = false;
    }
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    events: &EventHandler,
) -> Result<()> {
    loop {
        terminal.draw(|frame| render(frame, app))?;

        let event = events.next()?;
        dispatch(app, event, Instant::now());

        if app.should_quit {
            return Ok(());
        }
    }
}

fn dispatch(app: &mut App, event: AppEvent, now: Instant) {
    match event {
        AppEvent::Key(key) => handle_key(app, key, now),
        AppEvent::Speech(event) => app.trainer.handle_speech(event, now),
        AppEvent::Tick | AppEvent::Resize => {}
    }
    // Timers run on every event; ticks only arrive while input is idle.
    app.tick(now);
}

fn handle_key(app: &mut App, key: KeyEvent, now: Instant) {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        app.should_quit = true;
        return;
    }

    match app.screen {
        AppScreen::Menu => handle_menu_key(app, key),
        AppScreen::Practice => handle_practice_key(app, key, now),
    }
}

fn handle_menu_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => app.should_quit = true,
        KeyCode::Up | KeyCode::Char('k') => app.menu.prev(),
        KeyCode::Down | KeyCode::Char('j') => app.menu.next(),
        KeyCode::Enter => {
            if let Some(action) = app.menu.selected_action() {
                app.activate(action);
            }
        }
        KeyCode::Char(ch) => {
            if let Some(action) = app.menu.action_for_key(ch) {
                app.menu.select_action(action);
                app.activate(action);
            }
        }
        _ => {}
    }
}

fn handle_practice_key(app: &mut App, key: KeyEvent, now: Instant) {
    let trainer = &mut app.trainer;

    if key.modifiers.contains(KeyModifiers::CONTROL) {
        match key.code {
            KeyCode::Char('v') => trainer.toggle_mic(),
            KeyCode::Char('t') => {
                if !trainer.show_hint() {
                    app.set_notice(NoticeLevel::Info, "Hints unlock after a wrong answer", now);
                }
            }
            KeyCode::Char('g') => {
                trainer.reveal();
            }
            KeyCode::Char('n') => {
                trainer.skip();
            }
            KeyCode::Char('a') => {
                let enabled = !app.config.auto_listen;
                app.set_auto_listen(enabled, now);
            }
            _ => {}
        }
        return;
    }

    match key.code {
        KeyCode::Esc => {
            if !trainer.stop_listening_by_user() {
                app.go_to_menu();
            }
        }
        KeyCode::Enter => {
            if trainer.turn_open() {
                trainer.check(now);
            } else {
                trainer.start_new_turn();
            }
        }
        KeyCode::Tab => trainer.repeat(),
        KeyCode::Char(' ') if trainer.input().is_empty() => trainer.repeat(),
        KeyCode::Backspace => trainer.backspace(),
        KeyCode::Char(ch) => trainer.push_char(ch),
        _ => {}
    }
}

fn render(frame: &mut ratatui::Frame, app: &App) {
    let area = frame.area();
    let colors = &app.theme.colors;

    let bg = Block::default().style(Style::default().bg(colors.bg()));
    frame.render_widget(bg, area);

    match app.screen {
        AppScreen::Menu => render_menu(frame, app),
        AppScreen::Practice => render_practice(frame, app),
    }
}

fn render_menu(frame: &mut ratatui::Frame, app: &App) {
    let area = frame.area();
    let hints = [
        "[a/1-6] Practice",
        "[l] Auto-listen",
        "[n] Auto-advance",
        "[r] Reset stats",
        "[q] Quit",
    ];
    let footer_lines = pack_hint_lines(&hints, area.width.saturating_sub(2) as usize);
    let layout = AppLayout::new(area, footer_lines.len() as u16 + 1);

    let header = StatsHeader::new(
        app.trainer.stats(),
        app.config.difficulty,
        app.mic_indicator(),
        app.config.auto_listen,
        app.theme,
    );
    frame.render_widget(header, layout.header);

    let menu_area = centered_rect(64, app.menu.items.len() as u16 + 7, layout.main);
    frame.render_widget(&app.menu, menu_area);

    render_footer(frame, app, &footer_lines, layout.footer);
}

fn render_practice(frame: &mut ratatui::Frame, app: &App) {
    let area = frame.area();
    let now = Instant::now();
    let trainer = &app.trainer;

    let mut hints = vec!["[Enter] Check", "[Tab] Repeat"];
    if trainer.voice_supported() {
        hints.push("[^V] Mic");
    }
    hints.extend(["[^T] Hint", "[^G] Give up", "[^N] Skip", "[^A] Auto-listen", "[Esc] Menu"]);
    let footer_lines = pack_hint_lines(&hints, area.width.saturating_sub(2) as usize);
    let layout = AppLayout::new(area, footer_lines.len() as u16 + 1);

    let header = StatsHeader::new(
        trainer.stats(),
        trainer.difficulty(),
        app.mic_indicator(),
        trainer.settings().auto_listen,
        app.theme,
    );
    frame.render_widget(header, layout.header);

    let card = WordCard::new(trainer.turn(), trainer.input(), app.theme)
        .hint(trainer.hint())
        .listening(trainer.is_listening(), trainer.silence_remaining(now))
        .advancing(trainer.auto_advance_pending());
    frame.render_widget(card, centered_rect(64, 14, layout.main));

    render_footer(frame, app, &footer_lines, layout.footer);
}

fn render_footer(frame: &mut ratatui::Frame, app: &App, hints: &[String], area: ratatui::layout::Rect) {
    let colors = &app.theme.colors;
    let mut lines = Vec::with_capacity(hints.len() + 1);

    let notice = match app.notice {
        Some((ref notice, _)) => {
            let color = match notice.level {
                NoticeLevel::Info => colors.accent(),
                NoticeLevel::Warning => colors.warning(),
                NoticeLevel::Error => colors.error(),
            };
            Span::styled(notice.message.clone(), Style::default().fg(color))
        }
        None => Span::raw(""),
    };
    lines.push(Line::from(notice));
    lines.extend(
        hints
            .iter()
            .map(|h| Line::from(Span::styled(h.clone(), Style::default().fg(colors.muted())))),
    );

    let block = Block::bordered().border_style(Style::default().fg(colors.border()));
    frame.render_widget(Paragraph::new(lines).block(block), area);
}
