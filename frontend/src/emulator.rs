use std::io::Stdout;
use std::sync::mpsc::Receiver;
use std::time::{Duration, Instant};

use chip8_vm::{Chip8, DISPLAY_HEIGHT, DISPLAY_WIDTH, ExecutionError};
use crossterm::{
    event,
    terminal::{disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Style},
    widgets::{Block, Borders, Paragraph},
};
use rodio::{OutputStream, Sink, Source, source::SineWave};

use crate::keymap::{self, Input};
use crate::screenshot;
use crate::settings::Settings;

const DEFAULT_FREQUENCY: f32 = 440.0;

pub struct Beep {
    sink: Sink,
    #[allow(dead_code)]
    stream: OutputStream,
}

impl Beep {
    pub fn new(freq: f32) -> anyhow::Result<Self> {
        let (stream, stream_handle) = OutputStream::try_default()?;
        let sink = Sink::try_new(&stream_handle)?;
        let source = SineWave::new(freq).repeat_infinite();

        sink.append(source);
        sink.pause();

        Ok(Self { sink, stream })
    }

    pub fn set(&self, on: bool) {
        if on {
            self.sink.play();
        } else {
            self.sink.pause();
        }
    }
}

pub struct Emulator {
    chip8: Chip8,
    settings: Settings,
    /// Silent when no audio device could be opened.
    beeper: Option<Beep>,
    input: Receiver<Input>,
    fault: Option<ExecutionError>,
}

impl Emulator {
    pub fn new(settings: Settings) -> anyhow::Result<Self> {
        let mut chip8 = Chip8::new();
        chip8.reset();
        chip8.load_rom_file(&settings.rom)?;

        let beeper = match Beep::new(DEFAULT_FREQUENCY) {
            Ok(beep) => Some(beep),
            Err(err) => {
                log::warn!("no audio output available, running silently: {err}");
                None
            }
        };

        Ok(Emulator {
            chip8,
            settings,
            beeper,
            input: keymap::spawn_listener(),
            fault: None,
        })
    }

    fn draw(&self, frame: &mut ratatui::Frame, rom_name: &str) {
        let area = frame.area();

        // Exact size needed for 64x32 display plus borders
        let game_width = (DISPLAY_WIDTH as u16) + 2;
        let game_height = (DISPLAY_HEIGHT as u16) + 2;

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(game_height),
                Constraint::Length(7),
                Constraint::Min(0),
            ])
            .split(area);

        let game_area = if chunks[0].width > game_width {
            Layout::default()
                .direction(Direction::Horizontal)
                .constraints([
                    Constraint::Min(0),
                    Constraint::Length(game_width),
                    Constraint::Min(0),
                ])
                .split(chunks[0])[1]
        } else {
            chunks[0]
        };

        let mut screen = String::with_capacity(DISPLAY_WIDTH * DISPLAY_HEIGHT + DISPLAY_HEIGHT);
        for row in self.chip8.framebuffer().rows() {
            screen.extend(row.map(|lit| if lit { '█' } else { ' ' }));
            screen.push('\n');
        }

        let (title, color) = match &self.fault {
            Some(err) => (format!("{rom_name} | halted: {err}"), Color::Red),
            None => (
                format!("{rom_name} | PC {:#05X}", self.chip8.program_counter()),
                Color::White,
            ),
        };
        let game = Paragraph::new(screen)
            .block(Block::default().borders(Borders::ALL).title(title))
            .style(Style::default().fg(color));
        frame.render_widget(game, game_area);

        let key_mapping = "Key Mapping:   Esc quits, F12 saves a screenshot\n\
    1 2 3 4    →    1 2 3 C\n\
    Q W E R    →    4 5 6 D\n\
    A S D F    →    7 8 9 E\n\
    Z X C V    →    A 0 B F";
        let keys = Paragraph::new(key_mapping)
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).title("Keypad"))
            .style(Style::default().fg(Color::Yellow));
        frame.render_widget(keys, chunks[1]);
    }

    /// Applies queued key events. Returns `false` once the user asked to quit.
    fn handle_input(&mut self) -> bool {
        let pending: Vec<Input> = self.input.try_iter().collect();
        for input in pending {
            match input {
                Input::Quit => return false,
                Input::Screenshot => {
                    let dir = std::path::Path::new(".");
                    if let Err(err) = screenshot::save(
                        self.chip8.framebuffer(),
                        self.settings.screenshot_scale,
                        dir,
                        self.chip8.program_counter(),
                    ) {
                        log::error!("screenshot failed: {err:#}");
                    }
                }
                Input::Keypad { index, pressed } => {
                    // keymap only produces indices below 16
                    if let Err(err) = self.chip8.set_key(index, pressed) {
                        log::warn!("{err}");
                    }
                }
            }
        }
        true
    }

    /// One 1/frame_rate slice: a timer tick followed by a batch of instructions.
    fn run_frame(&mut self, instructions_per_frame: u64) {
        if self.fault.is_some() {
            return;
        }

        self.chip8.tick_timers();
        for _ in 0..instructions_per_frame {
            if let Err(err) = self.chip8.step() {
                self.fault = Some(err);
                break;
            }
        }

        if let Some(beeper) = &self.beeper {
            beeper.set(self.fault.is_none() && self.chip8.sound_timer_active());
        }
    }

    pub fn run(&mut self) -> anyhow::Result<()> {
        let instructions_per_frame = self.settings.instructions_per_frame();
        let rom_stem: String = self
            .settings
            .rom
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Unknown ROM".to_string());

        enable_raw_mode()?;
        let stdout = std::io::stdout();
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        let result = self.event_loop(&mut terminal, instructions_per_frame, &rom_stem);

        if let Some(beeper) = &self.beeper {
            beeper.set(false);
        }
        disable_raw_mode()?;
        result
    }

    fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<Stdout>>,
        instructions_per_frame: u64,
        rom_stem: &str,
    ) -> anyhow::Result<()> {
        let frame_duration = Duration::from_secs_f64(1.0 / self.settings.frame_rate as f64);

        'frames: loop {
            let frame_start = Instant::now();

            // Drain crossterm events so they are not echoed. Only the quit keys matter here.
            while event::poll(Duration::ZERO)? {
                if keymap::terminal_input(&event::read()?) == Some(Input::Quit) {
                    break 'frames;
                }
            }

            if !self.handle_input() {
                break;
            }
            self.run_frame(instructions_per_frame);
            terminal.draw(|frame| self.draw(frame, rom_stem))?;

            let elapsed = frame_start.elapsed();
            if elapsed < frame_duration {
                std::thread::sleep(frame_duration - elapsed);
            }
        }
        terminal.clear()?;
        Ok(())
    }
}
