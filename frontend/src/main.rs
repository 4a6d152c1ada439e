use std::path::{Path, PathBuf};

use clap::Parser;

mod emulator;
mod keymap;
mod screenshot;
mod settings;

use settings::{Overrides, Settings};

const DEFAULT_SETTINGS_FILE: &str = "settings.ini";

#[derive(Parser)]
#[command(name = "chip8-term")]
#[command(about = "Run a CHIP-8 program in the terminal")]
struct Args {
    #[arg(help = "ROM file to load, overrides RomName from the settings file")]
    rom: Option<PathBuf>,

    #[arg(long, help = "Settings file of name:value lines [default: settings.ini if present]")]
    settings: Option<PathBuf>,

    #[arg(long, help = "Instructions executed per second")]
    ips: Option<u64>,

    #[arg(long, help = "Frames (and timer ticks) per second")]
    frame_rate: Option<u64>,

    #[arg(long, help = "Pixels per CHIP-8 cell in screenshots")]
    scale: Option<usize>,
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            rom: self.rom.clone(),
            ips: self.ips,
            frame_rate: self.frame_rate,
            screenshot_scale: self.scale,
        }
    }

    fn settings_file(&self) -> anyhow::Result<Overrides> {
        match &self.settings {
            Some(path) => Overrides::load(path),
            None if Path::new(DEFAULT_SETTINGS_FILE).exists() => {
                Overrides::load(Path::new(DEFAULT_SETTINGS_FILE))
            }
            None => Ok(Overrides::default()),
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    let settings = Settings::resolve(args.overrides().or(args.settings_file()?))?;
    log::info!(
        "running {} at {} instructions/s, {} frames/s",
        settings.rom.display(),
        settings.ips,
        settings.frame_rate
    );

    let mut emulator = emulator::Emulator::new(settings)?;
    emulator.run()?;

    Ok(())
}
