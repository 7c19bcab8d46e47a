use std::cell::RefCell;
use std::rc::Rc;

use super::*;
use crate::frames::DecodedFrame;
use crate::playback::simulated::SimulatedMedia;
use crate::playback::surface::CaptureSurface;

type Ctl = TransitionController<SimulatedMedia, CaptureSurface>;

fn frame(v: u8) -> DecodedFrame {
    DecodedFrame::new(image::RgbaImage::from_pixel(
        4,
        2,
        image::Rgba([v, 0, 0, 255]),
    ))
}

fn pending(n: usize) -> Arc<FrameBuffer> {
    let buf = FrameBuffer::shared();
    for i in 0..n {
        buf.push(frame(i as u8));
    }
    buf
}

fn published(n: usize, duration: f64) -> Arc<FrameBuffer> {
    let buf = pending(n);
    buf.publish(duration);
    buf
}

fn controller(duration: f64, frames: Arc<FrameBuffer>, options: ControllerOptions) -> Ctl {
    let mut media = SimulatedMedia::new(duration);
    media.load();
    TransitionController::new(
        media,
        CaptureSurface::new(kurbo::Size::new(400.0, 200.0)),
        frames,
        options,
    )
}

fn native(duration: f64) -> Ctl {
    controller(duration, FrameBuffer::shared(), ControllerOptions::default())
}

/// Put both the controller and the native clock at `t`.
fn place_at(ctl: &mut Ctl, t: f64) {
    ctl.state.current_time = t;
    ctl.state.target_time = t;
    ctl.media_mut().set_current_time(t);
}

#[test]
fn close_target_without_jump_schedules_nothing() {
    let mut ctl = native(10.0);
    place_at(&mut ctl, 5.0);

    assert!(!ctl.set_progress(0.505, SetProgressOptions::default()));
    assert!((ctl.target_time() - 5.05).abs() < 1e-12);
    assert_eq!(ctl.controller_state(), ControllerState::Idle);
    assert_eq!(ctl.on_animation_frame(0.0), TickOutcome::Idle);
}

#[test]
fn close_target_terminates_on_first_tick() {
    let mut ctl = native(10.0);
    place_at(&mut ctl, 5.0);

    assert!(ctl.set_progress(0.505, SetProgressOptions::jump()));
    assert_eq!(
        ctl.on_animation_frame(0.0),
        TickOutcome::Finished(FinishReason::Reached)
    );
    assert!(ctl.playback().animation_handle().is_none());
    assert_eq!(ctl.on_animation_frame(16.0), TickOutcome::Idle);
    assert!(ctl.media().is_paused());
}

#[test]
fn repeated_progress_is_a_no_op() {
    let mut ctl = native(10.0);
    assert!(ctl.set_progress(0.5, SetProgressOptions::default()));
    let handle = ctl.playback().animation_handle();
    assert!(handle.is_some());

    assert!(!ctl.set_progress(0.5, SetProgressOptions::default()));
    assert_eq!(ctl.playback().animation_handle(), handle);

    // A different target replaces the pending frame.
    assert!(ctl.set_progress(0.7, SetProgressOptions::default()));
    assert_ne!(ctl.playback().animation_handle(), handle);
}

#[test]
fn forward_motion_plays_natively_at_a_bounded_rate() {
    let mut ctl = native(10.0);
    ctl.set_progress(0.5, SetProgressOptions::default());

    ctl.media_mut().sync_clock(0.0);
    assert_eq!(
        ctl.on_animation_frame(0.0),
        TickOutcome::Advanced(TransitionMode::Native)
    );
    assert_eq!(ctl.media().playback_rate(), 8.0);
    assert!(!ctl.media().is_paused());

    ctl.media_mut().sync_clock(100.0);
    ctl.on_animation_frame(100.0);
    assert!((ctl.current_time() - 0.8).abs() < 1e-9);
}

#[test]
fn native_rate_never_drops_below_one() {
    let mut ctl = native(10.0);
    place_at(&mut ctl, 4.8);
    ctl.set_progress(0.5, SetProgressOptions::default());
    ctl.on_animation_frame(0.0);
    assert_eq!(ctl.media().playback_rate(), 1.0);
}

#[test]
fn native_overshoot_finishes() {
    let mut ctl = native(10.0);
    ctl.set_progress(0.5, SetProgressOptions::default());
    ctl.media_mut().sync_clock(0.0);
    ctl.on_animation_frame(0.0);
    // A long stall lets the native clock run past the target.
    ctl.media_mut().sync_clock(2000.0);
    ctl.on_animation_frame(2000.0);
    assert!(ctl.current_time() > 5.0);
    assert_eq!(
        ctl.on_animation_frame(2016.0),
        TickOutcome::Finished(FinishReason::Overshot)
    );
    assert!(ctl.media().is_paused());
}

#[test]
fn reverse_motion_scrubs_the_native_clock() {
    let mut ctl = native(10.0);
    place_at(&mut ctl, 5.0);
    ctl.set_progress(0.1, SetProgressOptions::default());

    assert_eq!(
        ctl.on_animation_frame(0.0),
        TickOutcome::Advanced(TransitionMode::Scrub)
    );
    assert!(ctl.media().is_paused());
    assert!((ctl.current_time() - 4.5).abs() < 1e-12);
    assert!((ctl.media().current_time() - 4.5).abs() < 1e-12);
}

#[test]
fn hosts_without_native_playback_always_scrub() {
    let options = ControllerOptions {
        reverse_capable: false,
        ..ControllerOptions::default()
    };
    let mut ctl = controller(10.0, FrameBuffer::shared(), options);
    ctl.set_progress(1.0, SetProgressOptions::default());
    assert_eq!(
        ctl.on_animation_frame(0.0),
        TickOutcome::Advanced(TransitionMode::Scrub)
    );
    assert!((ctl.current_time() - 10.0 / 8.0).abs() < 1e-12);
}

#[test]
fn jump_snaps_on_the_first_tick_only() {
    let mut ctl = native(10.0);
    ctl.set_progress(0.8, SetProgressOptions::jump());
    assert_eq!(
        ctl.on_animation_frame(0.0),
        TickOutcome::Advanced(TransitionMode::Scrub)
    );
    assert_eq!(ctl.current_time(), 8.0);
    assert_eq!(ctl.media().current_time(), 8.0);
    assert_eq!(
        ctl.on_animation_frame(16.0),
        TickOutcome::Finished(FinishReason::Reached)
    );
}

#[test]
fn buffered_mode_steps_and_paints() {
    let mut ctl = controller(10.0, published(100, 10.0), ControllerOptions::default());
    ctl.set_progress(1.0, SetProgressOptions::default());

    assert_eq!(
        ctl.on_animation_frame(0.0),
        TickOutcome::Advanced(TransitionMode::Buffered)
    );
    assert!((ctl.current_time() - 10.0 / 32.0).abs() < 1e-12);
    let (painted, dest) = ctl.painter().last().unwrap().clone();
    assert_eq!(painted.image().get_pixel(0, 0).0[0], 3);
    assert_eq!(dest, kurbo::Rect::new(0.0, 0.0, 400.0, 200.0));
    assert!(ctl.media().is_paused());
}

#[test]
fn buffered_jump_paints_the_target_frame() {
    let mut ctl = controller(10.0, published(100, 10.0), ControllerOptions::default());
    ctl.set_progress(1.0, SetProgressOptions::jump());
    ctl.on_animation_frame(0.0);
    assert_eq!(ctl.current_time(), 10.0);
    let (painted, _) = ctl.painter().last().unwrap();
    assert_eq!(painted.image().get_pixel(0, 0).0[0], 99);
}

#[test]
fn easing_follows_elapsed_time() {
    let options = ControllerOptions {
        transition_speed: 1.0,
        ..ControllerOptions::default()
    };
    let mut ctl = controller(10.0, published(100, 10.0), options);
    let opts = SetProgressOptions {
        easing: Some(Ease::Linear),
        ..SetProgressOptions::default()
    };
    ctl.set_progress(1.0, opts);

    ctl.on_animation_frame(500.0);
    assert_eq!(ctl.current_time(), 0.0);
    ctl.on_animation_frame(1500.0);
    assert!((ctl.current_time() - 1.0).abs() < 1e-12);
    ctl.on_animation_frame(6500.0);
    assert!((ctl.current_time() - 6.0).abs() < 1e-12);
}

#[test]
fn eased_steps_never_pass_the_target() {
    let mut ctl = controller(10.0, published(100, 10.0), ControllerOptions::default());
    let opts = SetProgressOptions {
        easing: Some(Ease::OutCubic),
        ..SetProgressOptions::default()
    };
    ctl.set_progress(0.5, opts);
    ctl.on_animation_frame(0.0);
    ctl.on_animation_frame(4000.0);
    assert_eq!(ctl.current_time(), 5.0);
    assert_eq!(
        ctl.on_animation_frame(4016.0),
        TickOutcome::Finished(FinishReason::Reached)
    );
}

#[test]
fn unknown_duration_is_degenerate() {
    let mut ctl = TransitionController::new(
        SimulatedMedia::new(10.0),
        CaptureSurface::new(kurbo::Size::new(1.0, 1.0)),
        FrameBuffer::shared(),
        ControllerOptions::default(),
    );
    assert!(ctl.set_progress(0.5, SetProgressOptions::default()));
    assert!(ctl.target_time().is_nan());
    assert_eq!(
        ctl.on_animation_frame(0.0),
        TickOutcome::Finished(FinishReason::Degenerate)
    );
    assert_eq!(ctl.current_time(), 0.0);
}

#[test]
fn decode_completing_mid_transition_switches_without_a_jump() {
    let frames = pending(100);
    let mut ctl = controller(10.0, Arc::clone(&frames), ControllerOptions::default());
    ctl.set_progress(1.0, SetProgressOptions::default());

    for now in [0.0, 16.0, 32.0] {
        ctl.media_mut().sync_clock(now);
        assert_eq!(
            ctl.on_animation_frame(now),
            TickOutcome::Advanced(TransitionMode::Native)
        );
    }
    let before = ctl.current_time();
    assert!(before > 0.0);

    frames.publish(10.0);
    ctl.media_mut().sync_clock(48.0);
    assert_eq!(
        ctl.on_animation_frame(48.0),
        TickOutcome::Advanced(TransitionMode::Buffered)
    );
    let after = ctl.current_time();
    let max_step = (10.0 - before) / (256.0 / 8.0);
    assert!(after >= before);
    assert!(after - before <= max_step + 1e-12);
    assert_eq!(
        ctl.controller_state(),
        ControllerState::Transitioning(Some(TransitionMode::Buffered))
    );
}

#[test]
fn on_change_reports_outward_progress() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let mut ctl = controller(10.0, published(100, 10.0), ControllerOptions::default());
    let sink = Rc::clone(&seen);
    ctl.set_on_change(move |p| sink.borrow_mut().push(p));

    ctl.set_progress(1.0, SetProgressOptions::jump());
    ctl.on_animation_frame(0.0);
    assert_eq!(*seen.borrow(), vec![1.0]);
    assert_eq!(ctl.current_progress(), 1.0);
}

#[test]
fn cancel_keeps_the_last_position() {
    let mut ctl = controller(10.0, published(100, 10.0), ControllerOptions::default());
    ctl.set_progress(1.0, SetProgressOptions::default());
    ctl.on_animation_frame(0.0);
    let t = ctl.current_time();

    ctl.cancel();
    assert_eq!(ctl.controller_state(), ControllerState::Idle);
    assert_eq!(ctl.on_animation_frame(16.0), TickOutcome::Idle);
    assert_eq!(ctl.current_time(), t);
}

#[test]
fn teardown_releases_frames() {
    let frames = published(10, 1.0);
    let mut ctl = controller(1.0, Arc::clone(&frames), ControllerOptions::default());
    assert!(ctl.repaint());
    ctl.teardown();
    assert!(!frames.is_ready());
    assert!(!ctl.repaint());
}

#[test]
fn zero_threshold_still_arrives() {
    let options = ControllerOptions {
        frame_threshold: 0.0,
        ..ControllerOptions::default()
    };
    let mut ctl = controller(5.0, published(150, 5.0), options);
    assert!(ctl.set_progress(0.5, SetProgressOptions::default()));

    let mut finished = None;
    for i in 0..20_000 {
        match ctl.on_animation_frame(f64::from(i) * 16.0) {
            TickOutcome::Advanced(mode) => assert_eq!(mode, TransitionMode::Buffered),
            TickOutcome::Finished(reason) => {
                finished = Some((i, reason));
                break;
            }
            TickOutcome::Idle => panic!("idle before arriving"),
        }
    }
    let (ticks, reason) = finished.expect("transition never finished");
    assert_eq!(reason, FinishReason::Reached);
    assert!(ticks < 1_000, "{ticks} ticks");
    assert!((ctl.current_time() - 2.5).abs() < 1e-6);
}
