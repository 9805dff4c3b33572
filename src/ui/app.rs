use super::events::{key_to_app_event, AppEvent};
use super::TerminalManager;
use crate::audio::progress::format_time;
use crate::player::{Player, PlayerSnapshot};
use anyhow::Result;
use crossterm::event::{self, Event};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    widgets::{BarChart, Block, Borders, Gauge, Paragraph},
    Frame,
};
use std::time::Duration;
use tracing::debug;

// Resting bar height while nothing plays
const MIN_BAR_HEIGHT: u64 = 2;
const BAR_CEILING: u64 = 100;

pub struct App {
    terminal: TerminalManager,
    player: Player,
    frame_interval: Duration,
    should_quit: bool,
}

impl App {
    pub fn new(player: Player, frame_interval: Duration) -> Result<Self> {
        Ok(Self {
            terminal: TerminalManager::new()?,
            player,
            frame_interval,
            should_quit: false,
        })
    }

    /// Draw/input loop. Hands the player back so the caller can shut it down.
    pub async fn run(mut self) -> Result<Player> {
        let state = self.player.subscribe();

        while !self.should_quit {
            let snapshot = state.borrow().clone();
            self.terminal.draw(|f| Self::render_ui(f, &snapshot))?;

            // crossterm polling blocks; keep it off the async workers' backs
            let interval = self.frame_interval;
            let input = tokio::task::block_in_place(|| -> Result<Option<Event>> {
                if event::poll(interval)? {
                    Ok(Some(event::read()?))
                } else {
                    Ok(None)
                }
            })?;

            if let Some(Event::Key(key)) = input {
                if let Some(app_event) = key_to_app_event(key) {
                    self.handle_event(app_event);
                }
            }
        }

        Ok(self.player)
    }

    fn handle_event(&mut self, event: AppEvent) {
        debug!("UI event: {:?}", event);
        match event {
            AppEvent::Quit => self.should_quit = true,
            AppEvent::TogglePlayPause => self.player.toggle_play_pause(),
            AppEvent::PlayFromStart => self.player.play_from_start(),
            AppEvent::NextTrack => self.player.next(),
            AppEvent::PreviousTrack => self.player.previous(),
            AppEvent::SeekBy(delta) => self.player.seek_by(delta),
            AppEvent::SeekToFraction(fraction) => self.player.seek_to_fraction(fraction),
        }
    }

    fn render_ui(f: &mut Frame, snapshot: &PlayerSnapshot) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(4), // Now playing
                Constraint::Min(6),    // Spectrum
                Constraint::Length(3), // Progress
                Constraint::Length(1), // Key help
            ])
            .split(f.area());

        Self::render_now_playing(f, chunks[0], snapshot);
        Self::render_spectrum(f, chunks[1], snapshot);
        Self::render_progress(f, chunks[2], snapshot);

        let help = Paragraph::new(" space play/pause  n/p next/prev  ←/→ seek 5s  0-9 jump  home restart  q quit")
            .style(Style::default().fg(Color::DarkGray));
        f.render_widget(help, chunks[3]);
    }

    fn render_now_playing(f: &mut Frame, area: Rect, snapshot: &PlayerSnapshot) {
        let status = if snapshot.loading {
            "Loading..."
        } else if snapshot.playing {
            "▶ Playing"
        } else if snapshot.playable {
            "⏸ Paused"
        } else {
            "No preview"
        };

        let text = match &snapshot.track {
            Some(track) => format!(
                "{} - {}\n{}  [{}/{}]",
                track.artist,
                track.title,
                status,
                snapshot.index + 1,
                snapshot.track_count
            ),
            None => "Nothing queued".to_string(),
        };

        let widget = Paragraph::new(text)
            .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
            .block(Block::default().borders(Borders::ALL).title("wavepeek"));
        f.render_widget(widget, area);
    }

    fn render_spectrum(f: &mut Frame, area: Rect, snapshot: &PlayerSnapshot) {
        let heights = snapshot.bars.heights(BAR_CEILING, MIN_BAR_HEIGHT);
        let data: Vec<(&str, u64)> = heights.iter().map(|h| ("", *h)).collect();

        let inner_width = area.width.saturating_sub(2);
        let bars = heights.len().max(1) as u16;
        let bar_width = (inner_width / bars).saturating_sub(1).max(1);

        let color = if snapshot.bars.is_live() {
            Color::Magenta
        } else {
            Color::DarkGray
        };

        let chart = BarChart::default()
            .block(Block::default().borders(Borders::ALL))
            .data(&data)
            .bar_width(bar_width)
            .bar_gap(1)
            .max(BAR_CEILING)
            .bar_style(Style::default().fg(color));
        f.render_widget(chart, area);
    }

    fn render_progress(f: &mut Frame, area: Rect, snapshot: &PlayerSnapshot) {
        let progress = &snapshot.progress;
        let label = format!(
            "{} / {}",
            format_time(progress.current_time),
            format_time(progress.duration)
        );

        let gauge = Gauge::default()
            .block(Block::default().borders(Borders::ALL))
            .gauge_style(Style::default().fg(Color::Green))
            .ratio(progress.fraction.clamp(0.0, 1.0))
            .label(label);
        f.render_widget(gauge, area);
    }
}
