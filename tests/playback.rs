//! End-to-end: build an SMF in memory → load → play against a manual clock → check the sink.

use std::fs;
use std::thread;

use smfplay::midi::utils::ManualClock;
use smfplay::output::ChannelSink;
use smfplay::{LoadError, Player, PlayerConfig, load_midi_file, parse_midi_bytes};

fn smf(time_div: u16, tracks: &[&[u8]]) -> Vec<u8> {
    let mut bytes = b"MThd".to_vec();
    bytes.extend_from_slice(&6u32.to_be_bytes());
    bytes.extend_from_slice(&1u16.to_be_bytes());
    bytes.extend_from_slice(&(tracks.len() as u16).to_be_bytes());
    bytes.extend_from_slice(&time_div.to_be_bytes());
    for body in tracks {
        bytes.extend_from_slice(b"MTrk");
        bytes.extend_from_slice(&(body.len() as u32).to_be_bytes());
        bytes.extend_from_slice(body);
    }
    bytes
}

fn render(bytes: &[u8], config: PlayerConfig) -> (Vec<u32>, ManualClock) {
    let midi = parse_midi_bytes(bytes).unwrap();
    let mut player = Player::new(midi, config);
    let clock = ManualClock::new();
    let mut sent = Vec::new();
    player.run(&mut |m: u32| sent.push(m), &clock);
    (sent, clock)
}

const NOTE_PAIR: &[u8] = &[
    0x00, 0x90, 0x3C, 0x64, // note on C4
    0x64, 0x80, 0x3C, 0x40, // note off after a quarter note
    0x00, 0xFF, 0x2F, 0x00,
];

#[test]
fn note_pair_round_trip() {
    let (sent, clock) = render(&smf(100, &[NOTE_PAIR]), PlayerConfig::default());
    assert_eq!(sent, vec![0x643C90, 0x403C80]);
    // One quarter note at the default 120 BPM
    assert_eq!(clock.sleeps(), vec![5_000_000]);
}

#[test]
fn load_from_disk() {
    let path = std::env::temp_dir().join(format!("smfplay-{}.mid", std::process::id()));
    fs::write(&path, smf(96, &[NOTE_PAIR, &[0x00, 0xFF, 0x2F, 0x00]])).unwrap();

    let midi = load_midi_file(&path);
    fs::remove_file(&path).unwrap();

    let midi = midi.unwrap();
    assert_eq!(midi.time_div, 96);
    assert_eq!(midi.tracks.len(), 2);
}

#[test]
fn failed_load_returns_no_tracks() {
    let mut bytes = smf(96, &[NOTE_PAIR]);
    bytes.truncate(bytes.len() - 2);
    assert!(matches!(parse_midi_bytes(&bytes), Err(LoadError::Io(_))));
}

#[test]
fn format_0_with_running_status_and_tempo() {
    let track: &[u8] = &[
        0x00, 0xFF, 0x51, 0x03, 0x07, 0xA1, 0x20, // 500_000 us/qn
        0x00, 0xC0, 0x00, // program change
        0x00, 0x90, 0x3C, 0x50, // note on
        0x00, 0x40, 0x50, // running status note on
        0x30, 0x3C, 0x00, // velocity 0, filtered by the default threshold
        0x00, 0x40, 0x00, // same
        0x00, 0xFF, 0x2F, 0x00,
    ];
    let (sent, _) = render(&smf(480, &[track]), PlayerConfig::default());
    assert_eq!(sent, vec![0x00C0, 0x503C90, 0x504090]);
}

#[test]
fn foreign_chunk_between_tracks_is_ignored() {
    let mut bytes = smf(96, &[NOTE_PAIR]);
    // Declare two tracks, then append an unknown chunk followed by a second track
    bytes[11] = 2;
    bytes.extend_from_slice(b"XYZW");
    bytes.extend_from_slice(&3u32.to_be_bytes());
    bytes.extend_from_slice(&[1, 2, 3]);
    bytes.extend_from_slice(b"MTrk");
    bytes.extend_from_slice(&8u32.to_be_bytes());
    bytes.extend_from_slice(&[0x30, 0x91, 0x40, 0x50, 0x00, 0xFF, 0x2F, 0x00]);

    let (sent, _) = render(&bytes, PlayerConfig::default());
    assert_eq!(sent, vec![0x643C90, 0x504091, 0x403C80]);
}

#[test]
fn relay_through_channel_sink() {
    let midi = parse_midi_bytes(&smf(100, &[NOTE_PAIR])).unwrap();
    let (mut sink, rx) = ChannelSink::bounded(16);

    let receiver = thread::spawn(move || rx.iter().collect::<Vec<u32>>());

    let mut player = Player::new(midi, PlayerConfig::default());
    let stats = player
        .play(&mut sink, &ManualClock::new(), |_| {})
        .unwrap();
    drop(sink);

    assert_eq!(receiver.join().unwrap(), vec![0x643C90, 0x403C80]);
    assert_eq!(stats.messages_sent, 2);
    assert_eq!(stats.final_tick, 0x64);
}
