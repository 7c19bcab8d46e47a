use super::*;

const NOT_READY: BufferTimeline = BufferTimeline {
    frame_count: 0,
    frame_rate: 0.0,
};

#[test]
fn progress_is_clamped_into_the_duration() {
    for p in [-3.0, -0.0, 0.0, 0.25, 0.5, 1.0, 1.5, 1e9, f64::NAN, f64::INFINITY] {
        let t = to_target_time(p, NOT_READY, 10.0);
        assert!((0.0..=10.0).contains(&t), "progress {p} mapped to {t}");
    }
    assert_eq!(to_target_time(1.5, NOT_READY, 10.0), 10.0);
    assert_eq!(to_target_time(-1.0, NOT_READY, 10.0), 0.0);
    assert_eq!(to_target_time(0.25, NOT_READY, 10.0), 2.5);
}

#[test]
fn published_buffer_redefines_the_duration() {
    let ready = BufferTimeline {
        frame_count: 150,
        frame_rate: 30.0,
    };
    assert_eq!(effective_duration(ready, 7.0), 5.0);
    assert_eq!(to_target_time(1.0, ready, 7.0), 5.0);
    assert_eq!(to_target_time(0.0, ready, 7.0), 0.0);
    assert_eq!(to_target_time(0.5, ready, f64::NAN), 2.5);
}

#[test]
fn unknown_duration_is_degenerate() {
    assert!(to_target_time(0.5, NOT_READY, f64::NAN).is_nan());
    assert_eq!(to_progress(3.0, NOT_READY, f64::NAN), 0.0);
    assert_eq!(to_progress(3.0, NOT_READY, 0.0), 0.0);
}

#[test]
fn progress_round_trips_through_time() {
    for p in [0.0, 0.1, 0.5, 0.9, 1.0] {
        let t = to_target_time(p, NOT_READY, 12.0);
        assert!((to_progress(t, NOT_READY, 12.0) - p).abs() < 1e-12);
    }
    assert_eq!(to_progress(20.0, NOT_READY, 12.0), 1.0);
}

#[test]
fn scroll_formula() {
    assert_eq!(scroll_progress(0.0, 3000.0, 1000.0), 0.0);
    assert_eq!(scroll_progress(-1000.0, 3000.0, 1000.0), 0.5);
    assert_eq!(scroll_progress(-2000.0, 3000.0, 1000.0), 1.0);
    assert_eq!(scroll_progress(500.0, 3000.0, 1000.0), -0.25);
    assert_eq!(scroll_progress(-10.0, 800.0, 1000.0), 1.0);
    assert_eq!(scroll_progress(10.0, 800.0, 1000.0), 0.0);
}
