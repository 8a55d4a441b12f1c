use std::process::Command;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Physical size and pixel resolution of the display the stimulus is
/// shown on. Supplied at startup and immutable for the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorGeometry {
    pub width_mm: u32,
    pub height_mm: u32,
    pub width_px: u32,
    pub height_px: u32,
}

impl MonitorGeometry {
    pub fn new(size_mm: (u32, u32), size_px: (u32, u32)) -> Self {
        MonitorGeometry {
            width_mm: size_mm.0,
            height_mm: size_mm.1,
            width_px: size_px.0,
            height_px: size_px.1,
        }
    }
}

/// Probe the connected monitor by running `xrandr --query`. Returns `None`
/// when xrandr is missing or its output has no usable monitor line, in
/// which case the caller must fall back to explicit overrides.
pub fn detect_monitor() -> Option<MonitorGeometry> {
    let output = Command::new("xrandr").arg("--query").output().ok()?;
    if !output.status.success() {
        return None;
    }
    parse_xrandr(&String::from_utf8_lossy(&output.stdout))
}

/// Pick the primary connected output, or the first connected one.
fn parse_xrandr(query: &str) -> Option<MonitorGeometry> {
    let connected: Vec<&str> = query
        .lines()
        .filter(|line| line.contains(" connected"))
        .collect();

    connected
        .iter()
        .find(|line| line.contains(" connected primary"))
        .or_else(|| connected.first())
        .and_then(|line| parse_connected_line(line))
}

// e.g. "eDP-1 connected primary 1920x1080+0+0 (normal left) 344mm x 194mm"
fn parse_connected_line(line: &str) -> Option<MonitorGeometry> {
    let tokens: Vec<&str> = line.split_whitespace().collect();

    let mode = tokens.iter().find(|t| t.contains('x') && t.contains('+'))?;
    let resolution = mode.split('+').next()?;
    let (width_px, height_px) = split_pair(resolution, 'x')?;

    let millimeters: Vec<u32> = tokens
        .iter()
        .filter_map(|t| t.strip_suffix("mm"))
        .filter_map(|t| t.parse().ok())
        .collect();
    if millimeters.len() != 2 {
        return None;
    }

    Some(MonitorGeometry::new(
        (millimeters[0], millimeters[1]),
        (width_px, height_px),
    ))
}

fn split_pair(input: &str, separator: char) -> Option<(u32, u32)> {
    let mut parts = input.splitn(2, separator);
    let first = parts.next()?.trim().parse().ok()?;
    let second = parts.next()?.trim().parse().ok()?;
    Some((first, second))
}

/// Parse a CLI dimension override of the form "width,height". Both
/// components must be nonzero; a zero-sized monitor cannot position
/// targets and must fail here, before the loop starts.
pub fn parse_dimensions(input: &str) -> Result<(u32, u32), ConfigError> {
    match split_pair(input, ',') {
        Some((width, height)) if width > 0 && height > 0 => Ok((width, height)),
        _ => Err(ConfigError::Dimensions {
            input: input.to_string(),
        }),
    }
}
