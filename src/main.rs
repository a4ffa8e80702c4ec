mod error;
mod events;
mod grid;
mod instruments;
mod midi;
mod note;
mod output;
mod tempo;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};

use error::Error;
use events::extract_note_events;
use grid::{resample, resample_chords, resolve_grid_step, Mode, Policy};
use instruments::{group_instruments, select_instrument};
use midi::MidiData;
use output::{emit_header, sanitize_name, Song, SymbolArray};

#[derive(Parser, Debug)]
#[command(name = "notegrid")]
#[command(about = "Convert MIDI files to time-quantized note arrays", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// One winning note per cell on a fixed-time grid
    Notes(NotesArgs),
    /// Chord symbols on a beat-relative grid, batched across songs
    Chords(ChordsArgs),
}

#[derive(clap::Args, Debug)]
struct NotesArgs {
    /// Path to the MIDI file
    midi: PathBuf,

    /// Musical grid: 16th, 8th, quarter, 32nd (fixed-time, from the initial tempo)
    #[arg(long)]
    grid: Option<String>,

    /// Fixed time grid in milliseconds (e.g. 10)
    #[arg(long)]
    grid_ms: Option<f64>,

    /// Overlap policy: first, highest, lowest, loudest
    #[arg(short, long, default_value = "highest")]
    policy: String,

    /// Token emitted for silent cells
    #[arg(long, default_value = "SIL")]
    silence: String,

    /// Print one token per line with its time index
    #[arg(long)]
    print: bool,

    /// Write the array as a text file, one token per line
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Emit JSON instead of text, both on stdout and for --out
    #[arg(long)]
    json: bool,

    /// Suppress informational messages (only errors)
    #[arg(short, long)]
    quiet: bool,
}

#[derive(clap::Args, Debug)]
struct ChordsArgs {
    /// Path(s) to .mid/.midi file(s)
    #[arg(required = true)]
    midi: Vec<PathBuf>,

    /// Grid resolution: 4 = 16th notes, 2 = 8th, 1 = quarter
    #[arg(long, default_value = "4")]
    steps_per_beat: u32,

    /// Resample mode: onset or sustain
    #[arg(short, long, default_value = "onset")]
    mode: String,

    /// Which instrument to use (default: non-percussion with most notes)
    #[arg(long)]
    instrument_index: Option<usize>,

    /// Token emitted for silent steps
    #[arg(long, default_value = " ")]
    silence: String,

    /// Joiner between chord members
    #[arg(long, default_value = "+")]
    join: String,

    /// Override song name (repeatable, matches order of MIDI inputs)
    #[arg(long)]
    song_name: Vec<String>,

    /// Print each converted array
    #[arg(long)]
    print: bool,

    /// Write each array as a comma-delimited text grid
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Write all songs as a C header of constant tables
    #[arg(long)]
    out_header: Option<PathBuf>,

    /// Suppress informational messages (only errors)
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    match Args::parse().command {
        Command::Notes(args) => run_notes(args),
        Command::Chords(args) => run_chords(args),
    }
}

fn run_notes(args: NotesArgs) -> Result<()> {
    if !args.quiet {
        eprintln!("Processing MIDI file: {}", args.midi.display());
    }

    let midi = MidiData::from_file(&args.midi)?;
    let step_seconds = resolve_grid_step(args.grid.as_deref(), args.grid_ms, midi.initial_tempo())?;
    let policy: Policy = args.policy.parse()?;

    let events = extract_note_events(&midi);
    let symbols = resample(&events, step_seconds, policy, &args.silence)?;
    let array = SymbolArray {
        symbols,
        step_seconds,
    };

    if args.json {
        println!("{}", array.to_json()?);
    } else if args.print {
        for (i, token) in array.symbols.iter().enumerate() {
            println!("{:10.4}s  {}", i as f64 * step_seconds, token);
        }
    }

    if let Some(path) = &args.out {
        let contents = if args.json {
            format!("{}\n", array.to_json()?)
        } else {
            array.to_lines()
        };
        fs::write(path, contents)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        if !args.quiet {
            eprintln!("Output saved to {}", path.display());
        }
    }

    if !args.print && !args.json && args.out.is_none() {
        println!(
            "Steps: {}  step_s={:.6}  policy={}",
            array.symbols.len(),
            step_seconds,
            policy
        );
        let preview: Vec<&str> = array.symbols.iter().take(50).map(String::as_str).collect();
        println!("First 50 tokens: {:?}", preview);
    }

    Ok(())
}

fn run_chords(args: ChordsArgs) -> Result<()> {
    if args.steps_per_beat == 0 {
        return Err(Error::InvalidGridSpec("--steps-per-beat must be positive".to_string()).into());
    }
    let mode: Mode = args.mode.parse()?;

    let mut songs = Vec::with_capacity(args.midi.len());
    for (index, path) in args.midi.iter().enumerate() {
        if !args.quiet {
            eprintln!("Processing MIDI file: {}", path.display());
        }

        let array = convert_chords(path, &args, mode)?;
        let name = args
            .song_name
            .get(index)
            .cloned()
            .unwrap_or_else(|| file_stem(path));

        let header = array.chord_summary(mode, args.steps_per_beat);
        if args.print {
            println!("{}", header);
            println!("{:?}", array.symbols);
        }

        if let Some(out) = &args.out {
            let target = per_song_path(out, path, args.midi.len());
            fs::write(&target, array.to_rows(20, &header))
                .with_context(|| format!("Failed to write {}", target.display()))?;
            if !args.quiet {
                eprintln!("Output saved to {}", target.display());
            }
        }

        songs.push(Song { name, array });
    }

    if let Some(path) = &args.out_header {
        fs::write(path, emit_header(&songs))
            .with_context(|| format!("Failed to write {}", path.display()))?;
        if !args.quiet {
            eprintln!("Header saved to {}", path.display());
        }
    }

    Ok(())
}

fn convert_chords(path: &Path, args: &ChordsArgs, mode: Mode) -> Result<SymbolArray> {
    let midi = MidiData::from_file(path)?;
    let events = extract_note_events(&midi);
    let instruments = group_instruments(&midi, &events);

    let selected = select_instrument(&instruments, args.instrument_index)?;
    let notes = match selected {
        Some(index) => instruments[index].notes.as_slice(),
        None => &[],
    };

    let seconds_per_beat = midi.initial_tempo() as f64 / 1_000_000.0;
    let step_seconds = seconds_per_beat / args.steps_per_beat as f64;

    let symbols = resample_chords(notes, step_seconds, mode, &args.silence, &args.join)?;
    Ok(SymbolArray {
        symbols,
        step_seconds,
    })
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("Song")
        .to_string()
}

/// With several inputs, suffix the output file name per song so files do not
/// clobber each other.
fn per_song_path(out: &Path, midi_path: &Path, input_count: usize) -> PathBuf {
    if input_count <= 1 {
        return out.to_path_buf();
    }
    let stem = out
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    let ext = out.extension().and_then(|s| s.to_str()).unwrap_or("txt");
    let name = format!("{}_{}.{}", stem, sanitize_name(&file_stem(midi_path)), ext);
    out.with_file_name(name)
}
