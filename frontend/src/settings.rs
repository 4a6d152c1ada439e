use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow, bail};

pub const DEFAULT_FRAME_RATE: u64 = 60;
pub const DEFAULT_INSTRUCTIONS_PER_SECOND: u64 = 700;
pub const DEFAULT_SCREENSHOT_SCALE: usize = 10;

const ROM_KEY: &str = "RomName";
const IPS_KEY: &str = "OpcodesPerSecond";
const FRAME_RATE_KEY: &str = "FrameRate";
const SCALE_KEY: &str = "ScreenshotScale";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub frame_rate: u64,
    pub ips: u64,
    pub rom: PathBuf,
    pub screenshot_scale: usize,
}

impl Settings {
    /// Fills anything `layers` leaves unset with the defaults. A ROM has no default.
    pub fn resolve(layers: Overrides) -> anyhow::Result<Self> {
        let rom = layers
            .rom
            .ok_or_else(|| anyhow!("no ROM given on the command line or as {ROM_KEY} in a settings file"))?;
        let frame_rate = layers.frame_rate.unwrap_or(DEFAULT_FRAME_RATE);
        if frame_rate == 0 {
            bail!("frame rate must be at least 1");
        }
        let screenshot_scale = layers.screenshot_scale.unwrap_or(DEFAULT_SCREENSHOT_SCALE);
        if screenshot_scale == 0 {
            bail!("screenshot scale must be at least 1");
        }

        Ok(Settings {
            frame_rate,
            ips: layers.ips.unwrap_or(DEFAULT_INSTRUCTIONS_PER_SECOND),
            rom,
            screenshot_scale,
        })
    }

    /// Instructions to run between two timer ticks, never less than one.
    pub fn instructions_per_frame(&self) -> u64 {
        (self.ips / self.frame_rate).max(1)
    }
}

/// One configuration layer. Unset fields fall through to lower layers.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Overrides {
    pub rom: Option<PathBuf>,
    pub ips: Option<u64>,
    pub frame_rate: Option<u64>,
    pub screenshot_scale: Option<usize>,
}

impl Overrides {
    pub fn from_entries(entries: &HashMap<String, String>) -> anyhow::Result<Self> {
        Ok(Overrides {
            rom: entries.get(ROM_KEY).map(PathBuf::from),
            ips: parse_entry(entries, IPS_KEY)?,
            frame_rate: parse_entry(entries, FRAME_RATE_KEY)?,
            screenshot_scale: parse_entry(entries, SCALE_KEY)?,
        })
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("could not open settings file {}", path.display()))?;
        let entries =
            parse(&text).with_context(|| format!("{} appears to be malformed", path.display()))?;
        for key in entries.keys() {
            if ![ROM_KEY, IPS_KEY, FRAME_RATE_KEY, SCALE_KEY].contains(&key.as_str()) {
                log::warn!("ignoring unknown setting {key} in {}", path.display());
            }
        }
        Self::from_entries(&entries)
    }

    /// Keeps every field set here and takes the rest from `lower`.
    pub fn or(self, lower: Overrides) -> Overrides {
        Overrides {
            rom: self.rom.or(lower.rom),
            ips: self.ips.or(lower.ips),
            frame_rate: self.frame_rate.or(lower.frame_rate),
            screenshot_scale: self.screenshot_scale.or(lower.screenshot_scale),
        }
    }
}

fn parse_entry<T>(entries: &HashMap<String, String>, key: &str) -> anyhow::Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    entries
        .get(key)
        .map(|value| {
            value
                .parse()
                .with_context(|| format!("invalid value {value:?} for {key}"))
        })
        .transpose()
}

/// Parses `name:value` lines. Blank lines and lines starting with `*` are
/// comments, and a `*` inside a value starts a trailing comment.
pub fn parse(text: &str) -> anyhow::Result<HashMap<String, String>> {
    let mut entries = HashMap::new();

    for (number, line) in text.lines().enumerate() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() || line.starts_with('*') {
            continue;
        }

        let (name, rest) = line
            .split_once(':')
            .ok_or_else(|| anyhow!("line {}: expected name:value", number + 1))?;
        let value = rest.split('*').next().unwrap_or_default();
        let (name, value) = (name.trim(), value.trim());
        if name.is_empty() || value.is_empty() {
            bail!("line {}: setting name and value must not be empty", number + 1);
        }
        entries.insert(name.to_string(), value.to_string());
    }
    Ok(entries)
}
