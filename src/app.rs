use crate::audio::{MediaEngine, NullMediaEngine, RodioMediaEngine};
use crate::catalog::Catalog;
use crate::player::{Player, PlayerEvent};
use crate::view::SearchView;
use anyhow::Result;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers,
    MouseEvent, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::io::stdout;
use std::path::Path;
use std::time::{Duration, Instant};

const SEEK_STEP_FRACTION: f64 = 0.05;
const VOLUME_STEP: f32 = 0.05;
const STARTUP_VOLUME: f32 = 0.7;

pub fn run(catalog_path: &Path) -> Result<()> {
    let catalog = Catalog::load(catalog_path)?;
    let media_root = catalog_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();

    let mut player = Player::new(catalog, media_root);
    let mut engine: Box<dyn MediaEngine> = match RodioMediaEngine::new() {
        Ok(engine) => Box::new(engine),
        Err(_) => Box::new(NullMediaEngine::new()),
    };

    player.set_volume(&mut *engine, STARTUP_VOLUME);
    player.load_initial(&mut *engine);
    let mut view = SearchView::new(&player.catalog);

    enable_raw_mode()?;
    let mut out = stdout();
    execute!(out, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(out);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let mut selected_view = 0usize;
    let mut search_mode = false;
    let mut lyric_offset = 0usize;
    let mut dirty = true;
    let mut last_tick = Instant::now();
    let mut lyric_rect = ratatui::prelude::Rect::default();
    let mut library_rect = ratatui::prelude::Rect::default();

    let result: Result<()> = loop {
        let now = Instant::now();
        dirty |= pump_engine(&mut player, &mut *engine, now);
        dirty |= consume_player_events(&mut player, &mut view, &mut selected_view);

        if dirty || last_tick.elapsed() > Duration::from_millis(250) {
            terminal.draw(|frame| {
                let layout = crate::ui::draw(
                    frame,
                    &player,
                    &*engine,
                    &view,
                    selected_view,
                    search_mode,
                    &mut lyric_offset,
                    now,
                );
                library_rect = layout.library;
                lyric_rect = layout.lyrics;
            })?;
            dirty = false;
            last_tick = Instant::now();
        }

        if !event::poll(Duration::from_millis(33))? {
            continue;
        }

        let event = event::read()?;
        if let Event::Mouse(mouse) = event {
            dirty |= handle_mouse(
                &mut player,
                &view,
                &mut selected_view,
                &mut lyric_offset,
                mouse,
                library_rect,
                lyric_rect,
                Instant::now(),
            );
            continue;
        }

        let Event::Key(key) = event else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        if search_mode {
            match key.code {
                KeyCode::Esc => {
                    search_mode = false;
                    view.set_query(&player.catalog, "");
                    selected_view = 0;
                }
                KeyCode::Enter => search_mode = false,
                KeyCode::Backspace => {
                    let mut query = view.query().to_string();
                    query.pop();
                    view.set_query(&player.catalog, &query);
                    selected_view = 0;
                }
                KeyCode::Char(ch) => {
                    let query = format!("{}{}", view.query(), ch);
                    view.set_query(&player.catalog, &query);
                    selected_view = 0;
                }
                _ => {}
            }
            dirty = true;
            continue;
        }

        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => break Ok(()),
            KeyCode::Char('q') => break Ok(()),
            KeyCode::Down => {
                if !view.is_empty() {
                    selected_view = (selected_view + 1).min(view.len() - 1);
                }
            }
            KeyCode::Up => selected_view = selected_view.saturating_sub(1),
            KeyCode::Enter => activate_selection(&mut player, &mut *engine, &view, selected_view),
            KeyCode::Char(' ') => player.toggle_play(&mut *engine),
            KeyCode::Char('n') => player.next(&mut *engine),
            KeyCode::Char('p') => player.previous(&mut *engine),
            KeyCode::Char('m') => player.cycle_mode(),
            KeyCode::Char('s') => {
                player.shuffle();
                view.refresh(&player.catalog);
            }
            KeyCode::Char('/') => search_mode = true,
            KeyCode::Right => seek_by(&mut player, &mut *engine, SEEK_STEP_FRACTION),
            KeyCode::Left => seek_by(&mut player, &mut *engine, -SEEK_STEP_FRACTION),
            KeyCode::Char('+') | KeyCode::Char('=') => {
                let level = engine.volume() + VOLUME_STEP;
                player.set_volume(&mut *engine, level);
            }
            KeyCode::Char('-') => {
                let level = engine.volume() - VOLUME_STEP;
                player.set_volume(&mut *engine, level);
            }
            KeyCode::PageDown => {
                player.note_lyric_scroll(Instant::now());
                lyric_offset = lyric_offset.saturating_add(1);
            }
            KeyCode::PageUp => {
                player.note_lyric_scroll(Instant::now());
                lyric_offset = lyric_offset.saturating_sub(1);
            }
            _ => {}
        }
        dirty = true;
    };

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    result
}

/// Feeds pending engine notifications through the player. Returns whether
/// anything surfaced that warrants a redraw.
fn pump_engine(player: &mut Player, engine: &mut dyn MediaEngine, now: Instant) -> bool {
    let events = engine.poll_events();
    let had_events = !events.is_empty();
    for event in events {
        player.handle_engine_event(engine, event, now);
    }
    had_events
}

/// Drains outbound player notifications. The search view is rebuilt after a
/// shuffle so its rows never point at pre-shuffle indices, and the selection
/// follows the track that changed.
fn consume_player_events(
    player: &mut Player,
    view: &mut SearchView,
    selected_view: &mut usize,
) -> bool {
    let events = player.take_events();
    let mut dirty = !events.is_empty();
    for event in events {
        match event {
            PlayerEvent::ShuffleCompleted => {
                view.refresh(&player.catalog);
                if let Some(position) = view.position_of(player.current_index()) {
                    *selected_view = position;
                }
            }
            PlayerEvent::TrackChanged(index) => {
                if let Some(position) = view.position_of(index) {
                    *selected_view = position;
                }
            }
            PlayerEvent::PlaybackError(_) => dirty = true,
            _ => {}
        }
    }
    dirty
}

/// Resolves "the Nth visible row" back to its catalog index before touching
/// the player; the player never sees view positions.
fn activate_selection(
    player: &mut Player,
    engine: &mut dyn MediaEngine,
    view: &SearchView,
    selected_view: usize,
) {
    let Some(catalog_index) = view.resolve(selected_view) else {
        return;
    };
    player.load_track(engine, catalog_index);
    player.play(engine);
}

fn seek_by(player: &mut Player, engine: &mut dyn MediaEngine, step: f64) {
    let duration = player
        .current_track()
        .map(|track| track.duration_seconds)
        .unwrap_or(0.0);
    if !duration.is_finite() || duration <= 0.0 {
        return;
    }
    let fraction = player.position_seconds() / duration + step;
    player.seek_to_fraction(engine, fraction);
}

#[allow(clippy::too_many_arguments)]
fn handle_mouse(
    player: &mut Player,
    view: &SearchView,
    selected_view: &mut usize,
    lyric_offset: &mut usize,
    mouse: MouseEvent,
    library_rect: ratatui::prelude::Rect,
    lyric_rect: ratatui::prelude::Rect,
    now: Instant,
) -> bool {
    let in_library = point_in_rect(mouse.column, mouse.row, library_rect);
    let in_lyrics = point_in_rect(mouse.column, mouse.row, lyric_rect);
    match mouse.kind {
        MouseEventKind::ScrollDown if in_library => {
            if !view.is_empty() {
                *selected_view = (*selected_view + 1).min(view.len() - 1);
            }
            true
        }
        MouseEventKind::ScrollUp if in_library => {
            *selected_view = selected_view.saturating_sub(1);
            true
        }
        MouseEventKind::ScrollDown if in_lyrics => {
            player.note_lyric_scroll(now);
            *lyric_offset = lyric_offset.saturating_add(1);
            true
        }
        MouseEventKind::ScrollUp if in_lyrics => {
            player.note_lyric_scroll(now);
            *lyric_offset = lyric_offset.saturating_sub(1);
            true
        }
        _ => false,
    }
}

fn point_in_rect(x: u16, y: u16, rect: ratatui::prelude::Rect) -> bool {
    if rect.width == 0 || rect.height == 0 {
        return false;
    }
    x >= rect.x
        && x < rect.x.saturating_add(rect.width)
        && y >= rect.y
        && y < rect.y.saturating_add(rect.height)
}
