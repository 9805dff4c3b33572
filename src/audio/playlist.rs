// Playlist state - ordered tracks, a wrapping cursor and the one-shot autoplay flag
// The audio side of track changes lives in player::controller; this is just bookkeeping.

use crate::catalog::Track;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct Playlist {
    tracks: Vec<Track>,
    index: usize,
    autoplay_pending: bool,
}

impl Playlist {
    #[cfg(test)]
    pub fn new(tracks: Vec<Track>) -> Self {
        Self {
            tracks,
            index: 0,
            autoplay_pending: false,
        }
    }

    /// Swap in a new list: cursor back to the top, nothing queued to autoplay
    pub fn replace(&mut self, tracks: Vec<Track>) {
        debug!("Playlist replaced with {} tracks", tracks.len());
        self.tracks = tracks;
        self.index = 0;
        self.autoplay_pending = false;
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn current(&self) -> Option<&Track> {
        self.tracks.get(self.index)
    }

    pub fn can_go_next(&self) -> bool {
        self.tracks.len() > 1
    }

    pub fn can_go_previous(&self) -> bool {
        self.tracks.len() > 1
    }

    /// Move to the following track, wrapping at the end.
    /// Returns false (and changes nothing) with fewer than two tracks.
    pub fn advance(&mut self) -> bool {
        if !self.can_go_next() {
            return false;
        }
        self.index = (self.index + 1) % self.tracks.len();
        self.autoplay_pending = true;
        true
    }

    pub fn retreat(&mut self) -> bool {
        if !self.can_go_previous() {
            return false;
        }
        let len = self.tracks.len();
        self.index = (self.index + len - 1) % len;
        self.autoplay_pending = true;
        true
    }

    /// Jump straight to `index`; out of range is ignored
    pub fn select(&mut self, index: usize) -> bool {
        if index >= self.tracks.len() {
            return false;
        }
        self.index = index;
        self.autoplay_pending = true;
        true
    }

    /// Read and clear the autoplay flag
    pub fn take_autoplay(&mut self) -> bool {
        std::mem::take(&mut self.autoplay_pending)
    }

    pub fn autoplay_pending(&self) -> bool {
        self.autoplay_pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracks(names: &[&str]) -> Vec<Track> {
        names
            .iter()
            .map(|name| Track {
                id: name.to_string(),
                title: name.to_string(),
                artist: "Tester".to_string(),
                album_art_url: None,
                preview_url: Some(format!("https://cdn/{}.mp3", name)),
            })
            .collect()
    }

    #[test]
    fn navigation_needs_two_tracks() {
        for len in 0..5 {
            let names: Vec<String> = (0..len).map(|i| format!("t{}", i)).collect();
            let refs: Vec<&str> = names.iter().map(String::as_str).collect();
            let playlist = Playlist::new(tracks(&refs));
            assert_eq!(playlist.can_go_next(), len > 1, "len {}", len);
            assert_eq!(playlist.can_go_previous(), len > 1, "len {}", len);
        }
    }

    #[test]
    fn advancing_len_times_returns_to_start() {
        let mut playlist = Playlist::new(tracks(&["a", "b", "c", "d"]));
        playlist.select(2);
        for _ in 0..playlist.len() {
            assert!(playlist.advance());
        }
        assert_eq!(playlist.index(), 2);

        for _ in 0..playlist.len() {
            assert!(playlist.retreat());
        }
        assert_eq!(playlist.index(), 2);
    }

    #[test]
    fn previous_from_first_wraps_to_last() {
        let mut playlist = Playlist::new(tracks(&["a", "b", "c"]));
        assert!(playlist.retreat());
        assert_eq!(playlist.current().unwrap().id, "c");
        assert!(playlist.advance());
        assert_eq!(playlist.current().unwrap().id, "a");
    }

    #[test]
    fn single_track_never_moves_or_arms_autoplay() {
        let mut playlist = Playlist::new(tracks(&["solo"]));
        assert!(!playlist.advance());
        assert!(!playlist.retreat());
        assert_eq!(playlist.index(), 0);
        assert!(!playlist.autoplay_pending());
    }

    #[test]
    fn autoplay_flag_is_one_shot() {
        let mut playlist = Playlist::new(tracks(&["a", "b"]));
        assert!(!playlist.take_autoplay());
        playlist.advance();
        assert!(playlist.take_autoplay());
        assert!(!playlist.take_autoplay());
    }

    #[test]
    fn replace_resets_cursor_and_flag() {
        let mut playlist = Playlist::new(tracks(&["a", "b", "c"]));
        playlist.advance();
        playlist.replace(tracks(&["x", "y"]));
        assert_eq!(playlist.index(), 0);
        assert!(!playlist.autoplay_pending());
        assert_eq!(playlist.current().unwrap().id, "x");
    }

    #[test]
    fn select_out_of_range_is_ignored() {
        let mut playlist = Playlist::new(tracks(&["a", "b"]));
        assert!(!playlist.select(5));
        assert_eq!(playlist.index(), 0);
        assert!(!playlist.autoplay_pending());
    }
}
