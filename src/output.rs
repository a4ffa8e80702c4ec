//! Output shaping for formatting collaborators: plain-text grids, JSON, and
//! a constant-table C header for embedded playback.

use serde::Serialize;
use std::fmt::Write;

use crate::grid::Mode;

/// The unit handed to output collaborators: one token per grid cell plus
/// the step duration that produced them.
#[derive(Debug, Clone, Serialize)]
pub struct SymbolArray {
    pub symbols: Vec<String>,
    pub step_seconds: f64,
}

/// A converted song, ready for batching into a combined export.
#[derive(Debug, Clone, Serialize)]
pub struct Song {
    pub name: String,
    #[serde(flatten)]
    pub array: SymbolArray,
}

impl SymbolArray {
    /// One-line summary placed at the top of text output.
    pub fn summary(&self) -> String {
        format!(
            "# steps={} step_s={:.6}",
            self.symbols.len(),
            self.step_seconds
        )
    }

    /// Summary line for the chord variant, carrying its grid parameters.
    pub fn chord_summary(&self, mode: Mode, steps_per_beat: u32) -> String {
        format!(
            "{} mode={} steps_per_beat={}",
            self.summary(),
            mode,
            steps_per_beat
        )
    }

    /// Pretty JSON rendering, used for both stdout and file output.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// One token per line, preceded by the summary line.
    pub fn to_lines(&self) -> String {
        let mut out = self.summary();
        out.push('\n');
        for symbol in &self.symbols {
            out.push_str(symbol);
            out.push('\n');
        }
        out
    }

    /// Comma-delimited grid with a fixed row width, preceded by `header`.
    pub fn to_rows(&self, width: usize, header: &str) -> String {
        let mut out = header.to_string();
        out.push('\n');
        for row in self.symbols.chunks(width.max(1)) {
            for symbol in row {
                out.push_str(symbol);
                out.push(',');
            }
            out.push('\n');
        }
        out
    }
}

/// Reduce a song name to a C identifier fragment. Never returns an empty
/// string.
pub fn sanitize_name(name: &str) -> String {
    let mut cleaned = String::with_capacity(name.len());
    let mut last_underscore = false;
    for c in name.trim().chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            cleaned.push(c);
            last_underscore = false;
        } else if !last_underscore {
            cleaned.push('_');
            last_underscore = true;
        }
    }
    let cleaned = cleaned.trim_matches('_');
    if cleaned.is_empty() {
        "Song".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Emit all songs as a C header of PROGMEM constant tables: one string per
/// step, a pointer table per song, and a `kSongs` array tying names, steps
/// and step duration together.
pub fn emit_header(songs: &[Song]) -> String {
    let mut out = String::new();

    out.push_str("#pragma once\n\n");
    out.push_str("#include <avr/pgmspace.h>\n\n");
    out.push_str("struct Song {\n");
    out.push_str("  const char* name;\n");
    out.push_str("  const char* const* steps;\n");
    out.push_str("  size_t stepCount;\n");
    out.push_str("  float stepSeconds;\n");
    out.push_str("};\n\n");

    for song in songs {
        let array_name = format!("kSong_{}", sanitize_name(&song.name));
        for (idx, symbol) in song.array.symbols.iter().enumerate() {
            let token = symbol.replace('"', "\\\"");
            let _ = writeln!(
                out,
                "static const char {}_{}[] PROGMEM = \"{}\";",
                array_name, idx, token
            );
        }
        out.push('\n');
        let _ = writeln!(out, "static const char* const {}[] PROGMEM = {{", array_name);
        for idx in 0..song.array.symbols.len() {
            let _ = writeln!(out, "  {}_{},", array_name, idx);
        }
        out.push_str("};\n\n");
    }

    for song in songs {
        let _ = writeln!(
            out,
            "static const char kSongName_{}[] PROGMEM = \"{}\";",
            sanitize_name(&song.name),
            song.name
        );
    }
    out.push('\n');

    out.push_str("static const Song kSongs[] = {\n");
    for song in songs {
        let id = sanitize_name(&song.name);
        out.push_str("  {\n");
        let _ = writeln!(out, "    kSongName_{},", id);
        let _ = writeln!(out, "    kSong_{},", id);
        let _ = writeln!(out, "    sizeof(kSong_{0}) / sizeof(kSong_{0}[0]),", id);
        let _ = writeln!(out, "    {:.6}f", song.array.step_seconds);
        out.push_str("  },\n");
    }
    out.push_str("};\n\n");
    out.push_str("static const size_t kSongCount = sizeof(kSongs) / sizeof(kSongs[0]);\n");

    out
}
