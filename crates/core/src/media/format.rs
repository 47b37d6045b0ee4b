//! Human readable formatting of probe results onto items.

use crate::item::Item;

use super::types::MediaInfo;

/// Share of the overall bitrate assumed for video when the stream has none.
const VIDEO_BITRATE_SHARE: f64 = 0.8;
/// Share of the overall bitrate assumed for audio when the stream has none.
const AUDIO_BITRATE_SHARE: f64 = 0.1;

/// Fills display metadata and template parameters from probe output.
pub fn apply_media_info(item: &mut Item, info: &MediaInfo) {
    if let Some(secs) = info.duration_secs() {
        item.duration = format_duration(secs);
        item.duration_secs = secs;
    }

    if let Some(width) = info.video.get("width") {
        item.width = width.clone();
    }
    if let Some(height) = info.video.get("height") {
        item.height = height.clone();
    }

    let overall = info
        .general
        .get("bit_rate")
        .filter(|b| !b.is_empty())
        .and_then(|b| b.parse::<f64>().ok());

    match info.video.get("bit_rate").filter(|b| !b.is_empty()) {
        Some(rate) => item.video_bit_rate = format_bit_rate(rate),
        None => {
            if let Some(overall) = overall {
                item.video_bit_rate =
                    format_bit_rate(&format!("{:.0}", overall * VIDEO_BITRATE_SHARE));
            }
        }
    }

    match info.audio.get("bit_rate").filter(|b| !b.is_empty()) {
        Some(rate) => item.audio_bit_rate = format_bit_rate(rate),
        None => {
            if let Some(overall) = overall {
                item.audio_bit_rate =
                    format_bit_rate(&format!("{:.0}", overall * AUDIO_BITRATE_SHARE));
            }
        }
    }

    if let Some(codec) = info.video.get("codec_name") {
        item.video_codec = codec.clone();
    }
    if let Some(codec) = info.audio.get("codec_name") {
        item.audio_codec = codec.clone();
    }
    if let Some(rate) = info.general.get("bit_rate") {
        item.bit_rate = format_bit_rate(rate);
    }

    if let Some(fps) = info.video.get("r_frame_rate") {
        item.params.insert("%VIDEO_FPS_FRACTIONAL%".into(), fps.clone());
    }
    if let Some(fps) = info.video.get("fps_decimal") {
        item.params.insert("%VIDEO_FPS%".into(), fps.clone());
    }
    if let Some(rate) = info.audio.get("sample_rate") {
        item.params
            .insert("%AUDIO_SAMPLE_RATE%".into(), format_sample_rate(rate));
    }
    if let Some(channels) = info.audio.get("channels") {
        item.params
            .insert("%AUDIO_CHANNELS%".into(), format_channels(channels));
    }

    let sections = [
        ("General", &info.general),
        ("Video", &info.video),
        ("Audio", &info.audio),
    ];
    for (section, values) in sections {
        for (key, value) in values {
            item.params
                .insert(format!("%{}@{}%", section, key), value.clone());
        }
    }
}

/// Formats seconds as `M:SS` or `H:MM:SS`.
pub fn format_duration(secs: f64) -> String {
    let total = if secs.is_finite() && secs > 0.0 {
        secs as u64
    } else {
        0
    };
    let h = total / 3600;
    let m = (total / 60) % 60;
    let s = total % 60;

    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{}:{:02}", m, s)
    }
}

/// Formats a bits-per-second string as kbps or Mbps.
///
/// Unparseable input is returned unchanged.
pub fn format_bit_rate(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }
    let Ok(bps) = raw.parse::<f64>() else {
        return raw.to_string();
    };

    let kbps = bps / 1000.0;
    if kbps >= 1000.0 {
        format!("{:.1} Mbps", kbps / 1000.0)
    } else {
        format!("{:.0} kbps", kbps)
    }
}

/// Formats a byte count with binary units.
pub fn format_file_size(bytes: u64) -> String {
    const UNIT: u64 = 1024;
    if bytes < UNIT {
        return format!("{} B", bytes);
    }

    let mut div = UNIT;
    let mut exp = 0;
    let mut n = bytes / UNIT;
    while n >= UNIT {
        div *= UNIT;
        exp += 1;
        n /= UNIT;
    }

    let suffix = ['K', 'M', 'G', 'T', 'P', 'E'][exp];
    format!("{:.1} {}B", bytes as f64 / div as f64, suffix)
}

/// Formats a sample rate in Hz.
pub fn format_sample_rate(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }
    match raw.parse::<f64>() {
        Ok(rate) if rate >= 1000.0 => format!("{:.1} kHz", rate / 1000.0),
        Ok(rate) => format!("{:.0} Hz", rate),
        Err(_) => raw.to_string(),
    }
}

/// Describes a channel count.
pub fn format_channels(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }
    match raw.parse::<u32>() {
        Ok(1) => "1 channel (mono)".to_string(),
        Ok(2) => "2 channels (stereo)".to_string(),
        Ok(6) => "6 channels (5.1)".to_string(),
        Ok(8) => "8 channels (7.1)".to_string(),
        Ok(n) => format!("{} channels", n),
        Err(_) => raw.to_string(),
    }
}

/// Parses a frame rate like "24000/1001". Returns 0 when unusable.
pub fn parse_frame_rate(raw: &str) -> f64 {
    let Some((num, den)) = raw.split_once('/') else {
        return 0.0;
    };
    match (num.parse::<f64>(), den.parse::<f64>()) {
        (Ok(num), Ok(den)) if den != 0.0 => num / den,
        _ => 0.0,
    }
}

/// Splits a command-line string on spaces, keeping double-quoted runs together.
pub fn split_tool_args(raw: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for ch in raw.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ' ' if !in_quotes => {
                if !current.is_empty() {
                    args.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(ch),
        }
    }
    if !current.is_empty() {
        args.push(current);
    }

    args
}
