//! # practice - Sheet Music Practice Trainer
//!
//! Command-line front end for `practice-core`. Listens to the microphone and
//! walks through a practice sequence, highlighting correct and incorrect notes.
//!
//! ## Commands
//! - `practice`: live session against the microphone
//! - `simulate`: feed note names without a microphone (demo mode)
//! - `tone`: run the detector on a synthesized sine (diagnostic)
//! - `init-config`: write the default configuration file

use anyhow::{Context, Result, bail};
use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};
use crossbeam_channel::RecvTimeoutError;
use practice_core::listener::{Listener, ListenerEvent};
use practice_core::practice::{demo_sequence, load_sequence};
use practice_core::sheet::{DemoRecognizer, SheetMusicRecognizer};
use practice_core::{
    AudioFrame, AutocorrelationMethod, Judgement, NoteName, PitchDetector, PracticeConfig,
    PracticeNote, PracticeSession,
};
use std::path::Path;
use std::time::{Duration, Instant};

/// How often the session loop wakes up when no event arrives.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

fn cli() -> Command {
    let sequence_args = [
        Arg::new("sequence")
            .short('s')
            .long("sequence")
            .value_name("FILE")
            .help("Practice sequence as a JSON array of notes")
            .conflicts_with("sheet"),
        Arg::new("sheet")
            .long("sheet")
            .value_name("IMAGE")
            .help("Photo of the sheet music to practice (simulated recognition)"),
    ];

    Command::new("practice")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Practice sheet music against live pitch detection")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("JSON configuration file")
                .global(true),
        )
        .subcommand(
            Command::new("practice")
                .about("Listen to the microphone and check each note")
                .args(sequence_args.clone()),
        )
        .subcommand(
            Command::new("simulate")
                .about("Play notes by name instead of through the microphone")
                .args(sequence_args)
                .arg(
                    Arg::new("notes")
                        .value_name("NOTE")
                        .help("Note names such as C4 or F#3")
                        .num_args(1..)
                        .required(true),
                ),
        )
        .subcommand(
            Command::new("tone")
                .about("Detect the note of a synthesized sine wave")
                .arg(
                    Arg::new("frequency")
                        .short('f')
                        .long("frequency")
                        .value_name("HZ")
                        .value_parser(value_parser!(f32))
                        .required(true),
                )
                .arg(
                    Arg::new("sample-rate")
                        .short('r')
                        .long("sample-rate")
                        .value_name("HZ")
                        .value_parser(value_parser!(u32))
                        .default_value("44100"),
                )
                .arg(
                    Arg::new("amplitude")
                        .short('a')
                        .long("amplitude")
                        .value_name("LEVEL")
                        .value_parser(value_parser!(f32))
                        .default_value("0.5"),
                )
                .arg(
                    Arg::new("frames")
                        .short('n')
                        .long("frames")
                        .value_name("N")
                        .help("Samples in the synthesized frame (default: config frame size)")
                        .value_parser(value_parser!(usize)),
                )
                .arg(
                    Arg::new("fft")
                        .long("fft")
                        .help("Use FFT autocorrelation")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("init-config")
                .about("Write the default configuration")
                .arg(Arg::new("path").value_name("FILE").required(true)),
        )
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let matches = cli().get_matches();
    let config = load_config(matches.get_one::<String>("config"))?;

    match matches.subcommand() {
        Some(("practice", sub)) => run_practice(&config, sub),
        Some(("simulate", sub)) => run_simulate(&config, sub),
        Some(("tone", sub)) => run_tone(&config, sub),
        Some(("init-config", sub)) => {
            let path = sub.get_one::<String>("path").context("missing path")?;
            PracticeConfig::default().save(path)?;
            println!("Wrote default configuration to {path}");
            Ok(())
        }
        _ => unreachable!("subcommand_required is set"),
    }
}

fn load_config(path: Option<&String>) -> Result<PracticeConfig> {
    match path {
        Some(path) => PracticeConfig::load(path)
            .with_context(|| format!("loading configuration {path}")),
        None => Ok(PracticeConfig::default()),
    }
}

/// Resolves the practice sequence from `--sequence`, `--sheet` or the demo data.
fn resolve_sequence(matches: &ArgMatches) -> Result<Vec<PracticeNote>> {
    if let Some(path) = matches.get_one::<String>("sequence") {
        return load_sequence(path);
    }
    if let Some(image) = matches.get_one::<String>("sheet") {
        println!("Processing sheet music...");
        return DemoRecognizer::default().recognize(Path::new(image));
    }
    Ok(demo_sequence())
}

fn run_practice(config: &PracticeConfig, matches: &ArgMatches) -> Result<()> {
    let mut session = PracticeSession::new(resolve_sequence(matches)?, config.incorrect_display());
    let listener = Listener::start(config)?;
    log::info!("[MAIN] Listening at {} Hz", listener.sample_rate());

    println!("Play the highlighted note. Press Ctrl-C to quit.");
    println!("{}", render(&session, Instant::now()));

    while !session.is_complete() {
        match listener.events().recv_timeout(POLL_INTERVAL) {
            Ok(ListenerEvent::Note(event)) => {
                let judgement = session.submit(&event.note, event.at);
                print_judgement(&judgement, event.frequency);
                println!("{}", render(&session, event.at));
            }
            Ok(ListenerEvent::Level(_)) | Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => bail!("listener stopped unexpectedly"),
        }
    }

    listener.stop();
    print_summary(&session);
    Ok(())
}

fn run_simulate(config: &PracticeConfig, matches: &ArgMatches) -> Result<()> {
    let mut session = PracticeSession::new(resolve_sequence(matches)?, config.incorrect_display());
    let notes = matches
        .get_many::<String>("notes")
        .into_iter()
        .flatten()
        .map(|s| s.parse::<NoteName>().with_context(|| format!("invalid note `{s}`")))
        .collect::<Result<Vec<_>>>()?;

    for note in notes {
        let now = Instant::now();
        let judgement = session.submit(&note, now);
        print_judgement(&judgement, note.frequency());
        println!("{}", render(&session, now));
        if matches!(judgement, Judgement::Complete) {
            break;
        }
    }

    print_summary(&session);
    Ok(())
}

fn run_tone(config: &PracticeConfig, matches: &ArgMatches) -> Result<()> {
    let frequency = *matches.get_one::<f32>("frequency").context("missing frequency")?;
    let sample_rate = *matches.get_one::<u32>("sample-rate").context("missing sample rate")?;
    let amplitude = *matches.get_one::<f32>("amplitude").context("missing amplitude")?;

    let frames = tone_frame_size(config, matches)?;

    let mut detector_config = config.detector.clone();
    if matches.get_flag("fft") {
        detector_config.method = AutocorrelationMethod::Fft;
    }

    let samples = (0..frames)
        .map(|i| {
            amplitude
                * (2.0 * std::f32::consts::PI * frequency * i as f32 / sample_rate as f32).sin()
        })
        .collect();
    let frame = AudioFrame::new(samples, sample_rate)?;
    let result = PitchDetector::new(detector_config).analyze(&frame);

    match (result.detected_frequency, result.note_name) {
        (Some(detected), Some(note)) => println!(
            "{frequency:.2} Hz -> {note} (estimated {detected:.2} Hz, {:+.1} cents, level {:.1}%)",
            result.cents_deviation.unwrap_or(0.0),
            result.level
        ),
        _ => println!("{frequency:.2} Hz -> no note (level {:.1}%)", result.level),
    }
    Ok(())
}

/// `--frames`, falling back to the configured frame size.
fn tone_frame_size(config: &PracticeConfig, matches: &ArgMatches) -> Result<usize> {
    let frames = matches
        .get_one::<usize>("frames")
        .copied()
        .unwrap_or(config.frame_size);
    if frames == 0 {
        bail!("--frames must be positive");
    }
    Ok(frames)
}

fn print_judgement(judgement: &Judgement, frequency: f32) {
    match judgement {
        Judgement::Correct { index, note } => {
            println!("  correct: {note} ({frequency:.1} Hz), note {}", index + 1)
        }
        Judgement::Incorrect { expected, played } => {
            println!("  wrong: heard {played} ({frequency:.1} Hz), expected {expected}")
        }
        Judgement::Complete => println!("  sequence already complete"),
    }
}

/// One line showing the sequence: played notes are checked, the current note
/// is bracketed and a recent wrong note is appended.
fn render(session: &PracticeSession, now: Instant) -> String {
    let mut line: Vec<String> = session
        .notes()
        .iter()
        .enumerate()
        .map(|(i, n)| {
            if n.played {
                format!("{}*", n.note)
            } else if i == session.current_index() {
                format!("[{}]", n.note)
            } else {
                n.note.to_string()
            }
        })
        .collect();
    if let Some(wrong) = session.incorrect_note(now) {
        line.push(format!("  (heard {wrong})"));
    }
    line.join(" ")
}

fn print_summary(session: &PracticeSession) {
    let (played, total) = session.progress();
    if session.is_complete() {
        println!("Sequence complete: {played}/{total} notes played.");
    } else {
        println!("Stopped at {played}/{total} notes.");
    }
}
