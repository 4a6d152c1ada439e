use std::sync::mpsc::{self, Receiver};
use std::thread;

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use rdev::{EventType, Key};

/// What the run loop should do in response to a physical key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    Keypad { index: u8, pressed: bool },
    Screenshot,
    Quit,
}

/// Keyboard layout used by most CHIP-8 interpreters:
///
/// ```text
/// 1 2 3 4    ->    1 2 3 C
/// Q W E R    ->    4 5 6 D
/// A S D F    ->    7 8 9 E
/// Z X C V    ->    A 0 B F
/// ```
pub fn keypad_index(key: Key) -> Option<u8> {
    let index = match key {
        Key::KeyX => 0x0,
        Key::Num1 => 0x1,
        Key::Num2 => 0x2,
        Key::Num3 => 0x3,
        Key::KeyQ => 0x4,
        Key::KeyW => 0x5,
        Key::KeyE => 0x6,
        Key::KeyA => 0x7,
        Key::KeyS => 0x8,
        Key::KeyD => 0x9,
        Key::KeyZ => 0xA,
        Key::KeyC => 0xB,
        Key::Num4 => 0xC,
        Key::KeyR => 0xD,
        Key::KeyF => 0xE,
        Key::KeyV => 0xF,
        _ => return None,
    };
    Some(index)
}

pub fn translate(event: EventType) -> Option<Input> {
    match event {
        EventType::KeyPress(Key::Escape) => Some(Input::Quit),
        EventType::KeyPress(Key::F12) => Some(Input::Screenshot),
        EventType::KeyPress(key) => keypad_index(key).map(|index| Input::Keypad {
            index,
            pressed: true,
        }),
        EventType::KeyRelease(key) => keypad_index(key).map(|index| Input::Keypad {
            index,
            pressed: false,
        }),
        _ => None,
    }
}

/// Quit keys read from the terminal itself, so Esc and Ctrl-C still work when
/// the OS keyboard hook could not be installed.
pub fn terminal_input(event: &Event) -> Option<Input> {
    let Event::Key(KeyEvent {
        code,
        modifiers,
        kind: KeyEventKind::Press,
        ..
    }) = event
    else {
        return None;
    };
    match code {
        KeyCode::Esc => Some(Input::Quit),
        KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => Some(Input::Quit),
        _ => None,
    }
}

/// Starts a global keyboard listener on its own thread. Terminals only report
/// presses, so releases come from the OS hook instead.
pub fn spawn_listener() -> Receiver<Input> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let result = rdev::listen(move |event| {
            if let Some(input) = translate(event.event_type) {
                // the receiver is gone once the emulator has shut down
                let _ = tx.send(input);
            }
        });
        if let Err(err) = result {
            log::error!("keyboard listener stopped: {err:?}");
        }
    });
    rx
}
