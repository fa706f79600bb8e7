use owo_colors::OwoColorize;
use serde::Serialize;
use std::error::Error;
use std::path::Path;

use wavetrace::config::Config;
use wavetrace::decode::Decoder;
use wavetrace::media::format::{AudioFormatDescriptor, format_file_size};
use wavetrace::media::source::AudioSource;
use wavetrace::pipeline::{Analysis, PlaybackMedia};
use wavetrace::waveform::EnvelopeSource;

#[derive(Serialize)]
struct InfoReport<'a> {
    file: String,
    size_bytes: u64,
    decoder: String,
    format: &'a AudioFormatDescriptor,
    duration_micros: u64,
    duration_exact: bool,
    duration: String,
    envelope_points: usize,
    envelope_source: EnvelopeSource,
    playback: &'static str,
}

fn decoder_label(decoder: Decoder) -> String {
    match decoder {
        Decoder::ContainerPcm(kind) => format!("{kind:?} PCM"),
        Decoder::Mp3Frames => "MP3 frames".to_string(),
    }
}

fn report<'a>(source: &dyn AudioSource, analysis: &'a Analysis) -> InfoReport<'a> {
    InfoReport {
        file: source.name().to_string(),
        size_bytes: source.len(),
        decoder: decoder_label(analysis.decoder),
        format: &analysis.format,
        duration_micros: analysis.duration.microseconds,
        duration_exact: analysis.duration.exact,
        duration: analysis.duration.to_string(),
        envelope_points: analysis.envelope.len(),
        envelope_source: analysis.envelope.source(),
        playback: match analysis.media {
            PlaybackMedia::Clip(_) => "clip",
            PlaybackMedia::Stream { .. } => "stream",
        },
    }
}

pub fn handle_info(path: &Path, json: bool) -> Result<(), Box<dyn Error>> {
    let config = Config::load()?;
    let (source, analysis) = super::analyze_file(path, &config, json)?;
    let report = report(&source, &analysis);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let format = &analysis.format;
    println!("{}", report.file.cyan().bold());
    println!("  Decoder:     {}", report.decoder);
    println!("  Encoding:    {}", format.encoding_kind);
    println!("  Sample rate: {}", format.sample_rate_label());
    println!("  Channels:    {}", format.channels_label());
    println!("  Bit depth:   {}", format.bit_depth_label());
    println!("  Duration:    {}", report.duration);
    println!("  File size:   {}", format_file_size(report.size_bytes));
    println!(
        "  Waveform:    {} points ({:?})",
        report.envelope_points, report.envelope_source
    );

    if !analysis.duration.exact {
        println!(
            "\n{} Duration and format are estimated from the file size.",
            "Note:".yellow()
        );
    }

    Ok(())
}
