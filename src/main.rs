use std::path::PathBuf;
use std::process::ExitCode;

use smfplay::kdmapi::Kdmapi;
use smfplay::midi::summary::MidiSummary;
use smfplay::midi::utils::SystemClock;
use smfplay::{MessageSink, PlaybackStats, Player, PlayerConfig, load_midi_file};
use thousands::Separable;

#[derive(clap::Parser)]
#[command(about = "Play a Standard MIDI File in real time")]
struct Args {
    /// MIDI file to play
    #[arg(required_unless_present = "file", conflicts_with = "file")]
    input: Option<PathBuf>,
    /// MIDI file to play
    #[arg(short, long)]
    file: Option<PathBuf>,
    /// Minimum velocity (0-127); quieter note-ons are dropped
    #[arg(
        short = 'm',
        long = "minvel",
        visible_alias = "mv",
        default_value_t = 1,
        value_parser = clap::value_parser!(u8).range(0..=127)
    )]
    min_velocity: u8,
    /// Note-rate window frames per second
    #[arg(long, default_value_t = 144, value_parser = clap::value_parser!(u32).range(1..))]
    fps: u32,
    /// Output to a sequencer port (index or name) instead of KDMAPI
    #[cfg(feature = "sequencer")]
    #[arg(short = 'p', long, visible_alias = "alsa")]
    port: Option<String>,
    /// List sequencer output ports and exit
    #[cfg(feature = "sequencer")]
    #[arg(long)]
    list_ports: bool,
    /// Print a summary of the file before playing
    #[arg(long, default_value_t = false)]
    summary: bool,
    /// Show extra debugging info
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args: Args = clap::Parser::parse();

    let level = match args.verbose {
        true => log::LevelFilter::Debug,
        false => log::LevelFilter::Info,
    };
    pretty_env_logger::formatted_builder()
        .filter_level(level)
        .parse_env("RUST_LOG")
        .target(pretty_env_logger::env_logger::Target::Stdout)
        .init();

    match run(args) {
        Ok(stats) => {
            log::info!(
                "Done: {} messages sent, {} of {} note-ons filtered",
                stats.messages_sent.separate_with_commas(),
                stats.notes_filtered.separate_with_commas(),
                stats.note_ons.separate_with_commas()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<PlaybackStats, Box<dyn std::error::Error>> {
    #[cfg(feature = "sequencer")]
    if args.list_ports {
        for (i, name) in smfplay::output::list_ports()?.iter().enumerate() {
            println!("{i}: {name}");
        }
        return Ok(PlaybackStats::default());
    }

    let Some(path) = args.file.as_ref().or(args.input.as_ref()) else {
        return Err("No MIDI file specified".into());
    };
    let midi = load_midi_file(path)?;

    if args.summary {
        println!("{}", MidiSummary::scan(&midi.tracks, midi.time_div));
    }

    let config = PlayerConfig {
        min_velocity: args.min_velocity,
        monitor_fps: args.fps as usize,
    };
    let mut player = Player::new(midi, config);

    #[cfg(feature = "sequencer")]
    if let Some(port) = &args.port {
        let mut sink = smfplay::output::SequencerSink::connect(port)?;
        return play(&mut player, &mut sink, config.monitor_fps);
    }

    let kdmapi = Kdmapi::load()?;
    let mut stream = kdmapi.open_stream()?;
    let stats = play(&mut player, &mut stream, config.monitor_fps);
    stream.reset();
    stats
}

fn play<S: MessageSink>(
    player: &mut Player,
    sink: &mut S,
    fps: usize,
) -> Result<PlaybackStats, Box<dyn std::error::Error>> {
    // Report the sliding note rate about once a second
    let mut frame = 0usize;
    let report = move |eps: u32| {
        frame += 1;
        if frame % fps == 0 {
            log::info!("Notes per second (sliding): {}", eps.separate_with_commas());
        }
    };
    Ok(player.play(sink, &SystemClock, report)?)
}
