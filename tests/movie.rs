mod common;

use common::{test_deck, test_rom_bytes};
use std::io::Cursor;
use tetanes_core::{
    control_deck::{Config, ControlDeck, Error},
    input::{JoypadBtn, Player},
    mem::RamState,
    movie::Mode as MovieMode,
};

fn run_frames(deck: &mut ControlDeck, frames: u32) {
    for _ in 0..frames {
        deck.run_frame().expect("valid frame clock");
        deck.clear_audio_samples();
    }
}

#[test]
fn record_then_replay_through_control_deck() {
    let mut recorder = test_deck();
    recorder.start_recording();

    // Press A on frame 2, release on frame 3, hold Right from frame 4 on.
    for frame in 0..6u32 {
        match frame {
            2 => recorder.joypad_mut(Player::One).set_button(JoypadBtn::A, true),
            3 => recorder.joypad_mut(Player::One).set_button(JoypadBtn::A, false),
            4 => recorder.joypad_mut(Player::One).set_button(JoypadBtn::Right, true),
            _ => {}
        }
        recorder.run_frame().expect("valid frame clock");
        recorder.clear_audio_samples();
    }
    assert_eq!(recorder.movie_frame_count(), 6);
    recorder.stop_movie();

    let mut player = test_deck();
    let movie_path = std::env::temp_dir().join("control_deck_movie_test.tasmov");
    recorder.save_movie(&movie_path).expect("save movie file");
    player.load_movie(&movie_path).expect("load movie file");
    assert_eq!(player.movie_mode(), MovieMode::Playback);
    assert_eq!(player.movie_frame_count(), 6);

    // One extra frame past the recorded length to observe the playback-finished transition.
    for _ in 0..7 {
        player.run_frame().expect("valid frame clock");
        player.clear_audio_samples();
    }
    assert_eq!(player.movie_mode(), MovieMode::Finished);
    let _ = std::fs::remove_file(&movie_path);
}

#[test]
fn save_state_adopts_movie_when_none_active() {
    let mut recorder = test_deck();
    recorder.start_recording();
    run_frames(&mut recorder, 3);

    let state_path = std::env::temp_dir().join("control_deck_save_state_adopt_test.state");
    recorder.save_state(&state_path).expect("save state");

    let mut fresh = test_deck();
    assert!(!fresh.movie_active());
    fresh.load_state(&state_path).expect("load state");
    assert!(fresh.movie_active());
    assert_eq!(fresh.movie_mode(), MovieMode::Playback);
    assert_eq!(fresh.movie_frame_count(), 3);

    let _ = std::fs::remove_file(&state_path);
}

#[test]
fn save_state_rejects_mismatched_movie_guid() {
    let mut first = test_deck();
    first.start_recording();
    run_frames(&mut first, 2);
    let state_path = std::env::temp_dir().join("control_deck_save_state_guid_test.state");
    first.save_state(&state_path).expect("save state");

    let mut second = test_deck();
    second.start_recording(); // distinct guid from `first`
    run_frames(&mut second, 2);

    match second.load_state(&state_path) {
        Err(Error::MovieTimelineRejected) => {}
        other => panic!("expected MovieTimelineRejected, got {other:?}"),
    }

    let _ = std::fs::remove_file(&state_path);
}

#[test]
fn load_state_requires_rom_loaded() {
    let mut deck = ControlDeck::with_config(Config {
        ram_state: RamState::AllZeros,
        ..Default::default()
    });
    let path = std::env::temp_dir().join("control_deck_no_rom_test.state");
    assert!(matches!(deck.load_state(&path), Err(Error::RomNotLoaded)));
    assert!(matches!(deck.save_state(&path), Err(Error::RomNotLoaded)));
}

#[test]
fn pause_and_step_gate_run_frame() {
    let mut deck = test_deck();
    deck.set_pause(true);
    let cycles = deck.run_frame().expect("run_frame while paused");
    assert_eq!(cycles, 0);
    assert_eq!(deck.frame_number(), 0);

    deck.step();
    let cycles = deck.run_frame().expect("stepped frame");
    assert!(cycles > 0);
    assert_eq!(deck.frame_number(), 1);

    // step_frame is consumed after one frame; still paused afterwards.
    let cycles = deck.run_frame().expect("paused again after step");
    assert_eq!(cycles, 0);
}

#[test]
fn slow_motion_gates_every_nth_frame() {
    let mut deck = test_deck();
    deck.toggle_slow_motion(); // 1x -> 2x
    assert_eq!(deck.slow_motion_factor(), 2);

    deck.run_frame().expect("first call, slow-motion gated");
    assert_eq!(deck.frame_number(), 0);
    deck.run_frame().expect("second call, advances");
    assert_eq!(deck.frame_number(), 1);
}

#[test]
fn change_save_slot_wraps_around() {
    let mut deck = test_deck();
    assert_eq!(deck.save_slot(), 1);
    deck.change_save_slot(-1);
    assert_eq!(deck.save_slot(), 10);
    deck.change_save_slot(1);
    assert_eq!(deck.save_slot(), 1);
}

#[test]
fn synthesized_rom_loads_and_clocks() {
    let mut rom = Cursor::new(test_rom_bytes());
    let mut deck = ControlDeck::with_config(Config {
        ram_state: RamState::AllZeros,
        ..Default::default()
    });
    let loaded = deck.load_rom("synth", &mut rom).expect("loads");
    assert_eq!(loaded.name, "synth");
    deck.clock_frame().expect("clocks a frame");
    deck.clear_audio_samples();
}
