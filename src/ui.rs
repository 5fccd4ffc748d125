use crate::audio::MediaEngine;
use crate::player::{Player, format_clock};
use crate::view::{SearchView, highlight_span};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Gauge, List, ListItem, ListState, Paragraph};
use std::time::Instant;

const APP_TITLE: &str = "aria";

pub struct PaneLayout {
    pub library: Rect,
    pub lyrics: Rect,
}

struct Palette {
    text: Color,
    muted: Color,
    accent: Color,
    alert: Color,
    selected_bg: Color,
}

const PALETTE: Palette = Palette {
    text: Color::Rgb(214, 228, 248),
    muted: Color::Rgb(140, 160, 190),
    accent: Color::Rgb(100, 203, 184),
    alert: Color::Rgb(249, 174, 88),
    selected_bg: Color::Rgb(34, 55, 82),
};

#[allow(clippy::too_many_arguments)]
pub fn draw(
    frame: &mut Frame,
    player: &Player,
    engine: &dyn MediaEngine,
    view: &SearchView,
    selected_view: usize,
    search_mode: bool,
    lyric_offset: &mut usize,
    now: Instant,
) -> PaneLayout {
    let [main, transport, footer] = Layout::vertical([
        Constraint::Min(5),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(frame.area());
    let [library, lyrics] =
        Layout::horizontal([Constraint::Percentage(42), Constraint::Percentage(58)]).areas(main);

    draw_library(frame, player, view, selected_view, library);
    draw_lyrics(frame, player, lyric_offset, now, lyrics);
    draw_transport(frame, player, engine, transport);
    draw_footer(frame, player, view, search_mode, footer);

    PaneLayout { library, lyrics }
}

fn draw_library(
    frame: &mut Frame,
    player: &Player,
    view: &SearchView,
    selected_view: usize,
    area: Rect,
) {
    let items: Vec<ListItem> = view
        .entries()
        .iter()
        .filter_map(|catalog_index| player.catalog.get(*catalog_index))
        .map(|track| {
            let marker = if track.catalog_index == player.current_index() {
                "> "
            } else {
                "  "
            };
            let mut spans = vec![Span::styled(marker, Style::default().fg(PALETTE.accent))];
            spans.extend(highlighted_spans(&track.name, view.query(), PALETTE.text));
            spans.push(Span::styled(" - ", Style::default().fg(PALETTE.muted)));
            spans.extend(highlighted_spans(&track.artist, view.query(), PALETTE.muted));
            spans.push(Span::styled(
                format!("  {}", format_clock(track.duration_seconds)),
                Style::default().fg(PALETTE.muted),
            ));
            if !track.playable_extension() {
                spans.push(Span::styled(
                    " [unsupported]",
                    Style::default().fg(PALETTE.alert),
                ));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();

    let title = format!(" {APP_TITLE} - {} tracks ", view.len());
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default().bg(PALETTE.selected_bg));

    let mut state = ListState::default();
    if !view.is_empty() {
        state.select(Some(selected_view.min(view.len() - 1)));
    }
    frame.render_stateful_widget(list, area, &mut state);
}

/// Matched substring gets the accent color; everything else keeps `base`.
fn highlighted_spans(text: &str, query: &str, base: Color) -> Vec<Span<'static>> {
    let Some(range) = highlight_span(text, query) else {
        return vec![Span::styled(text.to_string(), Style::default().fg(base))];
    };

    vec![
        Span::styled(text[..range.start].to_string(), Style::default().fg(base)),
        Span::styled(
            text[range.clone()].to_string(),
            Style::default().fg(PALETTE.accent).bold(),
        ),
        Span::styled(text[range.end..].to_string(), Style::default().fg(base)),
    ]
}

fn draw_lyrics(
    frame: &mut Frame,
    player: &Player,
    lyric_offset: &mut usize,
    now: Instant,
    area: Rect,
) {
    let block = Block::default().borders(Borders::ALL).title(" Lyrics ");
    let inner_height = area.height.saturating_sub(2) as usize;
    let cues = player.cues();

    if cues.is_empty() {
        let placeholder = Paragraph::new("No lyrics for this track")
            .style(Style::default().fg(PALETTE.muted))
            .block(block);
        frame.render_widget(placeholder, area);
        return;
    }

    let active = player.active_cue();
    if !player.lyric_hold_active(now) {
        *lyric_offset = active
            .unwrap_or(0)
            .saturating_sub(inner_height / 2);
    }
    let offset = (*lyric_offset).min(cues.len().saturating_sub(1));

    let lines: Vec<Line> = cues
        .iter()
        .enumerate()
        .skip(offset)
        .take(inner_height.max(1))
        .map(|(index, cue)| {
            let style = if Some(index) == active {
                Style::default().fg(PALETTE.accent).bold()
            } else if cue.time_seconds.is_none() {
                Style::default().fg(PALETTE.muted).italic()
            } else {
                Style::default().fg(PALETTE.text)
            };
            Line::from(Span::styled(cue.text.clone(), style))
        })
        .collect();

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_transport(frame: &mut Frame, player: &Player, engine: &dyn MediaEngine, area: Rect) {
    let (name, artist, duration) = player
        .current_track()
        .map(|track| {
            (
                track.name.clone(),
                track.artist.clone(),
                track.duration_seconds,
            )
        })
        .unwrap_or_else(|| (String::from("--"), String::from("--"), 0.0));

    let symbol = if player.is_playing() { "|>" } else { "||" };
    let label = format!(
        "{symbol} {name} - {artist}   {} / {}   [{}]   vol {}%",
        format_clock(player.position_seconds()),
        format_clock(duration),
        player.mode().label(),
        (engine.volume() * 100.0).round() as u16,
    );

    let ratio = if duration.is_finite() && duration > 0.0 {
        (player.position_seconds() / duration).clamp(0.0, 1.0)
    } else {
        0.0
    };

    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL))
        .gauge_style(Style::default().fg(PALETTE.accent))
        .label(label)
        .ratio(ratio);
    frame.render_widget(gauge, area);
}

fn draw_footer(
    frame: &mut Frame,
    player: &Player,
    view: &SearchView,
    search_mode: bool,
    area: Rect,
) {
    let line = if search_mode {
        Line::from(vec![
            Span::styled("Search: ", Style::default().fg(PALETTE.accent)),
            Span::styled(format!("{}_", view.query()), Style::default().fg(PALETTE.text)),
        ])
    } else {
        Line::from(vec![
            Span::styled(player.status.clone(), Style::default().fg(PALETTE.text)),
            Span::styled(
                "   space play  n/p track  m mode  s shuffle  / search  q quit",
                Style::default().fg(PALETTE.muted),
            ),
        ])
    };
    frame.render_widget(Paragraph::new(line), area);
}
