use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use chip8_vm::{Address, DISPLAY_HEIGHT, DISPLAY_WIDTH, Framebuffer};

/// Writes the framebuffer as a plain (P1) portable bitmap, every cell
/// expanded to `scale` x `scale` pixels.
pub fn write_pbm(framebuffer: &Framebuffer, scale: usize, mut out: impl Write) -> io::Result<()> {
    let width = DISPLAY_WIDTH * scale;
    writeln!(out, "P1")?;
    writeln!(out, "{width} {}", DISPLAY_HEIGHT * scale)?;

    for row in framebuffer.scaled(scale).chunks(width) {
        let line: Vec<&str> = row.iter().map(|&lit| if lit { "1" } else { "0" }).collect();
        writeln!(out, "{}", line.join(" "))?;
    }
    out.flush()
}

/// Saves `images/screenshot_<pc>.pbm` under `dir`, named after the program
/// counter so repeated captures of a running program do not collide.
pub fn save(
    framebuffer: &Framebuffer,
    scale: usize,
    dir: &Path,
    pc: Address,
) -> anyhow::Result<PathBuf> {
    let images = dir.join("images");
    fs::create_dir_all(&images)
        .with_context(|| format!("could not create {}", images.display()))?;

    let path = images.join(format!("screenshot_{pc}.pbm"));
    let file =
        fs::File::create(&path).with_context(|| format!("could not create {}", path.display()))?;
    write_pbm(framebuffer, scale, BufWriter::new(file))?;
    log::info!("screenshot saved to {}", path.display());
    Ok(path)
}
