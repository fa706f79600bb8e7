use std::error::Error;
use std::path::Path;

pub fn handle_play(path: &Path) -> Result<(), Box<dyn Error>> {
    #[cfg(feature = "player")]
    {
        let config = wavetrace::config::Config::load()?;
        terminal::run(path, &config)
    }

    #[cfg(not(feature = "player"))]
    {
        let _ = path;
        use owo_colors::OwoColorize;
        println!("{} {}", "🎵".cyan(), "Audio Player".bold());
        println!();
        println!(
            "{} Playback requires the 'player' feature to be enabled.",
            "Note:".yellow()
        );
        println!();
        println!("To enable it, install with:");
        println!("  {}", "cargo install wavetrace --features player".cyan());
        println!();
        println!("Or if building from source:");
        println!("  {}", "cargo build --release --features player".cyan());

        Ok(())
    }
}

#[cfg(feature = "player")]
mod terminal {
    use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
    use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
    use indicatif::ProgressBar;
    use owo_colors::OwoColorize;
    use std::error::Error;
    use std::path::Path;
    use std::sync::Arc;
    use std::sync::mpsc::Receiver;
    use std::time::{Duration, Instant};

    use wavetrace::config::Config;
    use wavetrace::error::ErrorKind;
    use wavetrace::media::source::{AudioSource, FileSource};
    use wavetrace::player::{AudioEvent, AudioSession, PlaybackState, default_output};
    use wavetrace::utils::progress::{create_playback_bar, set_playback_position};

    const SEEK_STEP: f64 = 0.05;
    const INPUT_POLL: Duration = Duration::from_millis(100);

    enum KeyAction {
        Toggle,
        Stop,
        SeekBy(f64),
        Quit,
        Ignore,
    }

    fn map_key(key: KeyEvent) -> KeyAction {
        if key.kind != KeyEventKind::Press {
            return KeyAction::Ignore;
        }
        match key.code {
            KeyCode::Char(' ') => KeyAction::Toggle,
            KeyCode::Char('s') => KeyAction::Stop,
            KeyCode::Left => KeyAction::SeekBy(-SEEK_STEP),
            KeyCode::Right => KeyAction::SeekBy(SEEK_STEP),
            KeyCode::Char('q') | KeyCode::Esc => KeyAction::Quit,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => KeyAction::Quit,
            _ => KeyAction::Ignore,
        }
    }

    fn state_label(state: PlaybackState) -> String {
        match state {
            PlaybackState::Playing { .. } => "▶ playing".to_string(),
            PlaybackState::Paused { .. } => "⏸ paused ".to_string(),
            PlaybackState::Stopped => "■ stopped".to_string(),
        }
    }

    pub fn run(path: &Path, config: &Config) -> Result<(), Box<dyn Error>> {
        let source: Arc<dyn AudioSource> = Arc::new(
            FileSource::open(path).map_err(|e| format!("Cannot open {}: {e}", path.display()))?,
        );
        let (mut session, events) =
            AudioSession::load(source, default_output(), &config.load_options());

        if let Some(duration) = session.duration() {
            println!("{} {}", session.name().cyan().bold(), duration);
        }
        for event in events.try_iter() {
            if let AudioEvent::Error { message, .. } = event {
                println!("{} {message}", "Error:".red().bold());
            }
        }
        if !session.playback_enabled() {
            let reason = session.disabled_reason().unwrap_or("unknown error").to_string();
            session.dispose();
            return Err(format!("Playback disabled: {reason}").into());
        }

        println!(
            "{}",
            "space play/pause · s stop · ←/→ seek 5% · q quit".dimmed()
        );

        let (_, total) = session.progress_micros();
        let bar = create_playback_bar(total);
        bar.set_prefix(state_label(session.state()));
        set_playback_position(&bar, 0, total);

        enable_raw_mode()?;
        let result = control_loop(&mut session, &events, &bar);
        let restored = disable_raw_mode();

        session.dispose();
        bar.finish();
        result?;
        restored?;
        Ok(())
    }

    fn control_loop(
        session: &mut AudioSession,
        events: &Receiver<AudioEvent>,
        bar: &ProgressBar,
    ) -> Result<(), Box<dyn Error>> {
        session.play()?;

        loop {
            if event::poll(INPUT_POLL)?
                && let Event::Key(key) = event::read()?
            {
                let outcome = match map_key(key) {
                    KeyAction::Toggle => session.toggle(),
                    KeyAction::Stop => session.stop(),
                    KeyAction::SeekBy(delta) => session.seek_by(delta),
                    KeyAction::Quit => return Ok(()),
                    KeyAction::Ignore => Ok(()),
                };
                if let Err(e) = outcome
                    && e.kind() != ErrorKind::InvalidTransition
                {
                    bar.println(format!("Error: {e}"));
                }
            }

            session.poll(Instant::now());

            for event in events.try_iter() {
                match event {
                    AudioEvent::Progress {
                        position_micros,
                        total_micros,
                        ..
                    } => set_playback_position(bar, position_micros, total_micros),
                    AudioEvent::PlaybackStateChanged(state) => bar.set_prefix(state_label(state)),
                    AudioEvent::Error { message, .. } => bar.println(format!("Error: {message}")),
                    AudioEvent::MetadataReady { .. } | AudioEvent::WaveformReady(_) => {}
                }
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_key_map() {
            let press = |code| KeyEvent::new(code, KeyModifiers::NONE);
            assert!(matches!(map_key(press(KeyCode::Char(' '))), KeyAction::Toggle));
            assert!(matches!(map_key(press(KeyCode::Char('s'))), KeyAction::Stop));
            assert!(matches!(map_key(press(KeyCode::Left)), KeyAction::SeekBy(d) if d < 0.0));
            assert!(matches!(map_key(press(KeyCode::Right)), KeyAction::SeekBy(d) if d > 0.0));
            assert!(matches!(map_key(press(KeyCode::Char('q'))), KeyAction::Quit));
            assert!(matches!(
                map_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
                KeyAction::Quit
            ));
            assert!(matches!(map_key(press(KeyCode::Char('x'))), KeyAction::Ignore));
        }
    }
}
