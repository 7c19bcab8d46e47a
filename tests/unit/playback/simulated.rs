use super::*;

#[test]
fn duration_is_unknown_until_loaded() {
    let mut media = SimulatedMedia::new(4.0);
    assert!(media.duration().is_nan());
    assert!(media.poll_event().is_none());

    media.load();
    assert_eq!(media.duration(), 4.0);
    assert_eq!(media.poll_event(), Some(MediaEvent::LoadedMetadata));
    assert!(media.poll_event().is_none());
}

#[test]
fn clock_advances_only_while_playing() {
    let mut media = SimulatedMedia::new(4.0);
    media.load();
    media.sync_clock(0.0);
    media.sync_clock(500.0);
    assert_eq!(media.current_time(), 0.0);

    media.set_playback_rate(2.0);
    media.play();
    media.sync_clock(1000.0);
    assert!((media.current_time() - 1.0).abs() < 1e-12);

    media.pause();
    media.sync_clock(2000.0);
    assert!((media.current_time() - 1.0).abs() < 1e-12);
}

#[test]
fn playback_stops_at_the_end() {
    let mut media = SimulatedMedia::new(1.0);
    media.load();
    media.play();
    media.advance(5.0);
    assert_eq!(media.current_time(), 1.0);
    assert!(media.is_paused());
}

#[test]
fn reload_resets_position() {
    let mut media = SimulatedMedia::new(3.0);
    media.load();
    media.set_current_time(2.0);
    media.set_current_time(9.0);
    assert_eq!(media.current_time(), 3.0);
    assert_eq!(media.seek_count(), 2);

    media.load();
    assert_eq!(media.current_time(), 0.0);
    assert_eq!(media.load_count(), 2);
}
