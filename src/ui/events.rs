use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// Seconds skipped by the arrow keys
pub const SEEK_STEP: f64 = 5.0;

#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    Quit,
    TogglePlayPause,
    PlayFromStart,
    NextTrack,
    PreviousTrack,
    SeekBy(f64),
    SeekToFraction(f64),
}

pub fn key_to_app_event(key: KeyEvent) -> Option<AppEvent> {
    if key.kind != KeyEventKind::Press {
        return None;
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => Some(AppEvent::Quit),
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(AppEvent::Quit),
        KeyCode::Char(' ') => Some(AppEvent::TogglePlayPause),
        KeyCode::Home => Some(AppEvent::PlayFromStart),
        KeyCode::Char('n') | KeyCode::Down => Some(AppEvent::NextTrack),
        KeyCode::Char('p') | KeyCode::Up => Some(AppEvent::PreviousTrack),
        KeyCode::Left => Some(AppEvent::SeekBy(-SEEK_STEP)),
        KeyCode::Right => Some(AppEvent::SeekBy(SEEK_STEP)),
        // 0..9 jump to 0%..90%, like clicking along the progress bar
        KeyCode::Char(c @ '0'..='9') => {
            let digit = c.to_digit(10).unwrap_or(0);
            Some(AppEvent::SeekToFraction(digit as f64 / 10.0))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn transport_keys() {
        assert_eq!(key_to_app_event(press(KeyCode::Char(' '))), Some(AppEvent::TogglePlayPause));
        assert_eq!(key_to_app_event(press(KeyCode::Char('n'))), Some(AppEvent::NextTrack));
        assert_eq!(key_to_app_event(press(KeyCode::Char('p'))), Some(AppEvent::PreviousTrack));
        assert_eq!(key_to_app_event(press(KeyCode::Left)), Some(AppEvent::SeekBy(-5.0)));
        assert_eq!(key_to_app_event(press(KeyCode::Home)), Some(AppEvent::PlayFromStart));
        assert_eq!(key_to_app_event(press(KeyCode::Char('x'))), None);
    }

    #[test]
    fn digits_seek_by_tenths() {
        assert_eq!(key_to_app_event(press(KeyCode::Char('0'))), Some(AppEvent::SeekToFraction(0.0)));
        assert_eq!(key_to_app_event(press(KeyCode::Char('7'))), Some(AppEvent::SeekToFraction(0.7)));
    }

    #[test]
    fn releases_are_ignored() {
        let release = KeyEvent {
            code: KeyCode::Char('q'),
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Release,
            state: KeyEventState::NONE,
        };
        assert_eq!(key_to_app_event(release), None);

        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(key_to_app_event(ctrl_c), Some(AppEvent::Quit));
    }
}
