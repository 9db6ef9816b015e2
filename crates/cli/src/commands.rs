use std::io::BufRead;
use std::str::FromStr;
use std::thread;

use crossbeam_channel::Sender;

/// Interactive commands read from stdin, one per line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Start,
    Stop,
    Capture,
    Status,
    Help,
    Quit,
}

pub const HELP: &str = "Commands: start, stop, capture, status, help, quit";

impl FromStr for Command {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        match line.trim().to_lowercase().as_str() {
            "start" => Ok(Command::Start),
            "stop" => Ok(Command::Stop),
            "capture" | "screenshot" | "c" => Ok(Command::Capture),
            "status" | "s" => Ok(Command::Status),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" | "q" => Ok(Command::Quit),
            other => Err(format!("Unknown command '{other}'. {HELP}")),
        }
    }
}

/// Reads commands from `input` on a background thread. Blank lines are
/// skipped; unknown commands are reported and skipped. End of input sends
/// `Quit`.
pub fn spawn_reader<R>(input: R, commands: Sender<Command>)
where
    R: BufRead + Send + 'static,
{
    thread::spawn(move || {
        for line in input.lines() {
            let Ok(line) = line else { break };
            if line.trim().is_empty() {
                continue;
            }
            match line.parse::<Command>() {
                Ok(command) => {
                    if commands.send(command).is_err() || command == Command::Quit {
                        return;
                    }
                }
                Err(message) => eprintln!("{message}"),
            }
        }
        let _ = commands.send(Command::Quit);
    });
}
