// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::{
    fmt,
    io::{self, Write},
    thread,
};

use crossbeam_channel::{Receiver, Sender};
use tracing::{info, span, warn, Level};

use super::{GRID_WIDTH, KEY_COUNT};
use crate::palette::Color;

/// The configured device name that selects this keypad.
pub const DEVICE_NAME: &str = "terminal";

/// A key command typed on stdin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// `+N`: hold key N down.
    Press(usize),
    /// `-N`: let go of key N.
    Release(usize),
    /// `N`: flip key N between held and released.
    Toggle(usize),
}

/// Parses a single line of input into a command.
pub fn parse_command(input: &str) -> Option<Command> {
    let input = input.trim();
    let (constructor, number): (fn(usize) -> Command, &str) =
        if let Some(number) = input.strip_prefix('+') {
            (Command::Press, number)
        } else if let Some(number) = input.strip_prefix('-') {
            (Command::Release, number)
        } else {
            (Command::Toggle, input)
        };

    match number.trim().parse::<usize>() {
        Ok(key) if key < KEY_COUNT => Some(constructor(key)),
        _ => None,
    }
}

/// A keypad simulated on the terminal. Keys are driven from stdin and the LED grid
/// is drawn to stdout with 24-bit ANSI colours.
pub struct Keypad {
    pressed: [bool; KEY_COUNT],
    staged: [Color; KEY_COUNT],
    shown: Option<[Color; KEY_COUNT]>,
    commands_rx: Receiver<Command>,
    writer: Box<dyn Write + Send>,
}

impl Keypad {
    /// Starts reading commands from stdin on a background thread.
    pub fn start() -> Result<Keypad, io::Error> {
        let (commands_tx, commands_rx) = crossbeam_channel::unbounded();

        thread::Builder::new()
            .name("terminal-keypad".to_string())
            .spawn(move || {
                let span = span!(Level::INFO, "terminal keypad");
                let _enter = span.enter();

                info!("Terminal keypad started. Type N to toggle key N, +N to press, -N to release.");

                loop {
                    match Self::monitor_io(&commands_tx, io::stdin().lock()) {
                        Ok(true) => {}
                        Ok(false) => {
                            info!("Terminal keypad input closed.");
                            return;
                        }
                        Err(e) => {
                            warn!(err = e.to_string(), "Terminal keypad stopped");
                            return;
                        }
                    }
                }
            })?;

        Ok(Keypad::new(commands_rx, Box::new(io::stdout())))
    }

    fn new(commands_rx: Receiver<Command>, writer: Box<dyn Write + Send>) -> Keypad {
        Keypad {
            pressed: [false; KEY_COUNT],
            staged: [Color::OFF; KEY_COUNT],
            shown: None,
            commands_rx,
            writer,
        }
    }

    /// Reads one line from the reader and forwards it as a command. Returns false at
    /// end of input.
    fn monitor_io<R>(commands_tx: &Sender<Command>, mut reader: R) -> Result<bool, io::Error>
    where
        R: io::BufRead,
    {
        let mut input = String::default();
        if reader.read_line(&mut input)? == 0 {
            return Ok(false);
        }

        match parse_command(&input) {
            Some(command) => commands_tx
                .send(command)
                .map_err(|e| io::Error::new(io::ErrorKind::BrokenPipe, e))?,
            None if input.trim().is_empty() => {}
            None => warn!(input = input.trim(), "Unrecognized input"),
        }
        Ok(true)
    }

    fn apply(&mut self, command: Command) {
        match command {
            Command::Press(key) => self.pressed[key] = true,
            Command::Release(key) => self.pressed[key] = false,
            Command::Toggle(key) => self.pressed[key] = !self.pressed[key],
        }
    }

    /// Draws the grid, redrawing in place after the first frame.
    fn render(&mut self, redraw: bool) -> Result<(), io::Error> {
        if redraw {
            write!(self.writer, "\x1b[{}A", GRID_WIDTH)?;
        }
        for row in 0..GRID_WIDTH {
            for column in 0..GRID_WIDTH {
                // Inverse of key_to_xy.
                let key = column * GRID_WIDTH + row;
                let color = self.staged[key];
                write!(
                    self.writer,
                    "\x1b[48;2;{};{};{}m {:>2} \x1b[0m",
                    color.r, color.g, color.b, key
                )?;
            }
            writeln!(self.writer)?;
        }
        self.writer.flush()
    }
}

impl super::Keypad for Keypad {
    fn read_key_state(&mut self, key: usize) -> bool {
        while let Ok(command) = self.commands_rx.try_recv() {
            self.apply(command);
        }
        self.pressed[key]
    }

    fn set_led(&mut self, key: usize, color: Color) {
        self.staged[key] = color;
    }

    fn commit_leds(&mut self) {
        if self.shown == Some(self.staged) {
            return;
        }
        let redraw = self.shown.is_some();
        if let Err(e) = self.render(redraw) {
            warn!(err = e.to_string(), "Unable to draw keypad");
        }
        self.shown = Some(self.staged);
    }
}

impl fmt::Display for Keypad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Terminal)", DEVICE_NAME)
    }
}

#[cfg(test)]
mod test {
    use std::{
        io::{self, BufReader},
        sync::Arc,
    };

    use parking_lot::Mutex;

    use super::*;
    use crate::keypad::Keypad as _;

    /// A writer that keeps everything written to it.
    #[derive(Clone, Default)]
    struct SharedWriter(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn get_command(input: &str) -> Result<Option<Command>, io::Error> {
        let (sender, receiver) = crossbeam_channel::unbounded::<Command>();
        let reader = BufReader::new(input.as_bytes());
        Keypad::monitor_io(&sender, reader)?;
        Ok(receiver.try_recv().ok())
    }

    #[test]
    fn test_parse_command() {
        assert_eq!(Some(Command::Toggle(3)), parse_command("3"));
        assert_eq!(Some(Command::Press(15)), parse_command(" +15\n"));
        assert_eq!(Some(Command::Release(0)), parse_command("-0"));
        assert_eq!(None, parse_command("16"));
        assert_eq!(None, parse_command("play"));
        assert_eq!(None, parse_command(""));
    }

    #[test]
    fn test_monitor_io() -> Result<(), io::Error> {
        assert_eq!(Some(Command::Press(4)), get_command("+4\n")?);
        assert_eq!(None, get_command("unrecognized\n")?);

        let (sender, _receiver) = crossbeam_channel::unbounded::<Command>();
        assert!(!Keypad::monitor_io(&sender, BufReader::new("".as_bytes()))?);
        Ok(())
    }

    #[test]
    fn test_commands_drive_key_state() {
        let (sender, receiver) = crossbeam_channel::unbounded();
        let mut keypad = Keypad::new(receiver, Box::new(SharedWriter::default()));

        sender.send(Command::Toggle(3)).unwrap();
        assert!(keypad.read_key_state(3));
        sender.send(Command::Toggle(3)).unwrap();
        assert!(!keypad.read_key_state(3));
        sender.send(Command::Press(9)).unwrap();
        sender.send(Command::Release(9)).unwrap();
        assert!(!keypad.read_key_state(9));
    }

    #[test]
    fn test_commit_only_draws_changes() {
        let (_sender, receiver) = crossbeam_channel::unbounded();
        let writer = SharedWriter::default();
        let mut keypad = Keypad::new(receiver, Box::new(writer.clone()));

        keypad.set_led(0, Color::new(1, 2, 3));
        keypad.commit_leds();
        let first = writer.0.lock().len();
        assert!(first > 0);
        assert!(String::from_utf8_lossy(&writer.0.lock()).contains("48;2;1;2;3m"));

        keypad.commit_leds();
        assert_eq!(first, writer.0.lock().len());

        keypad.set_led(0, Color::WHITE);
        keypad.commit_leds();
        assert!(writer.0.lock().len() > first);
    }
}
