//! Interactive text console.
//!
//! Line-oriented boundary used by the binary:
//!
//! ```text
//! get NAME          read a field
//! put NAME VALUE    write a field (VALUE parsed like the current value)
//! list              list field names
//! dump              all fields as JSON
//! help              this text
//! quit              stop the simulator
//! ```
//!
//! Names may be relative or carry the device prefix. Rejected writes are
//! reported to the user and logged at debug; they never stop the console.

use selene_common::device::driver::{SimDevice, SimError};
use selene_common::device::types::FieldValue;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, info};

const HELP: &str = "\
commands:
  get NAME          read a field
  put NAME VALUE    write a field
  list              list field names
  dump              all fields as JSON
  help              this text
  quit              stop the simulator";

/// One parsed console line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `get NAME`
    Get(String),
    /// `put NAME VALUE`
    Put(String, String),
    /// `list`
    List,
    /// `dump`
    Dump,
    /// `help`
    Help,
    /// `quit` / `exit`
    Quit,
    /// Blank line
    Empty,
}

impl Command {
    /// Parse one input line.
    pub fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        let mut parts = line.splitn(3, char::is_whitespace);
        let verb = parts.next().unwrap_or_default().to_ascii_lowercase();
        let name = parts.next().map(str::trim).filter(|s| !s.is_empty());
        let rest = parts.next().map(str::trim).filter(|s| !s.is_empty());

        match (verb.as_str(), name, rest) {
            ("", None, None) => Ok(Command::Empty),
            ("get", Some(name), None) => Ok(Command::Get(name.to_string())),
            ("put", Some(name), Some(value)) => Ok(Command::Put(name.to_string(), value.to_string())),
            ("list", None, None) => Ok(Command::List),
            ("dump", None, None) => Ok(Command::Dump),
            ("help" | "?", None, None) => Ok(Command::Help),
            ("quit" | "exit", None, None) => Ok(Command::Quit),
            ("get" | "put", _, _) => Err(format!("usage: {verb} NAME{}", if verb == "put" { " VALUE" } else { "" })),
            _ => Err(format!("unknown command '{line}', try 'help'")),
        }
    }
}

/// JSON document produced by `dump`.
#[derive(Debug, Serialize)]
struct Dump<'a> {
    kind: &'a str,
    prefix: &'a str,
    fields: BTreeMap<String, FieldValue>,
}

/// Console bound to one device.
pub struct Console {
    device: Arc<dyn SimDevice>,
    running: Arc<AtomicBool>,
}

impl Console {
    /// Create a console; `quit` clears `running`.
    pub fn new(device: Arc<dyn SimDevice>, running: Arc<AtomicBool>) -> Self {
        Self { device, running }
    }

    /// Execute one line and return the reply. `None` for blank lines.
    pub fn handle_line(&self, line: &str) -> Option<String> {
        match Command::parse(line) {
            Ok(command) => self.execute(command),
            Err(msg) => Some(format!("error: {msg}")),
        }
    }

    /// Execute one command and return the reply.
    pub fn execute(&self, command: Command) -> Option<String> {
        let reply = match command {
            Command::Empty => return None,
            Command::Get(name) => match self.device.read(&name) {
                Ok(value) => format!("{name} = {value}"),
                Err(e) => format!("error: {e}"),
            },
            Command::Put(name, text) => self.put(&name, &text),
            Command::List => self.device.field_names().join("\n"),
            Command::Dump => self.dump(),
            Command::Help => HELP.to_string(),
            Command::Quit => {
                info!("Quit requested from console");
                self.running.store(false, Ordering::SeqCst);
                "bye".to_string()
            }
        };
        Some(reply)
    }

    fn put(&self, name: &str, text: &str) -> String {
        let current = match self.device.read(name) {
            Ok(value) => value,
            Err(e) => return format!("error: {e}"),
        };
        let Some(value) = FieldValue::parse_like(&current, text) else {
            return format!("error: cannot parse '{text}' for {name}");
        };

        match self.device.write(name, value) {
            Ok(()) => match self.device.read(name) {
                Ok(value) => format!("{name} = {value}"),
                Err(e) => format!("error: {e}"),
            },
            Err(e @ SimError::Rejected { .. }) => {
                debug!("{}", e);
                format!("rejected: {e}")
            }
            Err(e) => format!("error: {e}"),
        }
    }

    fn dump(&self) -> String {
        let fields = self
            .device
            .field_names()
            .into_iter()
            .filter_map(|name| {
                let value = self.device.read(&name).ok()?;
                Some((name, value))
            })
            .collect();
        let dump = Dump {
            kind: self.device.kind(),
            prefix: self.device.prefix(),
            fields,
        };
        serde_json::to_string_pretty(&dump).unwrap_or_else(|e| format!("error: {e}"))
    }

    /// Serve lines from `input` until `quit`, end of input or the running
    /// flag clears.
    pub fn run<R: BufRead, W: Write>(&self, input: R, mut output: W) -> io::Result<()> {
        for line in input.lines() {
            let line = line?;
            if let Some(reply) = self.handle_line(&line) {
                writeln!(output, "{reply}")?;
                output.flush()?;
            }
            if !self.running.load(Ordering::SeqCst) {
                break;
            }
        }
        Ok(())
    }
}

/// Serve stdin/stdout on a background thread.
///
/// End of input only ends the console; the simulator keeps running.
pub fn spawn_stdin(console: Console) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("console".to_string())
        .spawn(move || {
            let stdin = io::stdin();
            let stdout = io::stdout();
            match console.run(stdin.lock(), stdout.lock()) {
                Ok(()) => debug!("Console input closed"),
                Err(e) => debug!("Console stopped: {}", e),
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::GasPumpDevice;
    use selene_common::device::config::DeviceConfig;

    fn make_console() -> (Console, Arc<AtomicBool>) {
        let config = DeviceConfig {
            kind: "gaspump".to_string(),
            prefix: "SQ:DMC:gaspump:".to_string(),
            channels: vec!["Ch1".to_string()],
            ..Default::default()
        };
        let device = Arc::new(GasPumpDevice::new(&config).unwrap());
        let running = Arc::new(AtomicBool::new(true));
        (Console::new(device, running.clone()), running)
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("  "), Ok(Command::Empty));
        assert_eq!(Command::parse("get MCU1.RBV"), Ok(Command::Get("MCU1.RBV".to_string())));
        assert_eq!(
            Command::parse("put Ch1:Error  pump stalled "),
            Ok(Command::Put("Ch1:Error".to_string(), "pump stalled".to_string()))
        );
        assert_eq!(Command::parse("QUIT"), Ok(Command::Quit));
        assert!(Command::parse("put MCU1").is_err());
        assert!(Command::parse("get").is_err());
        assert!(Command::parse("list extra").is_err());
        assert!(Command::parse("frobnicate").is_err());
    }

    #[test]
    fn test_get_and_put() {
        let (console, _) = make_console();
        assert_eq!(
            console.handle_line("get Ch1:Amplitude_RBV").unwrap(),
            "Ch1:Amplitude_RBV = 10000"
        );
        assert_eq!(
            console.handle_line("put Ch1:Amplitude 42").unwrap(),
            "Ch1:Amplitude = 42"
        );
        assert_eq!(
            console.handle_line("get SQ:DMC:gaspump:Ch1:Amplitude_RBV").unwrap(),
            "SQ:DMC:gaspump:Ch1:Amplitude_RBV = 42"
        );
    }

    #[test]
    fn test_put_errors() {
        let (console, running) = make_console();
        assert!(console.handle_line("put Ch1:Mode_RBV 2").unwrap().starts_with("rejected:"));
        assert!(console.handle_line("put Ch1:Amplitude lots").unwrap().starts_with("error:"));
        assert!(console.handle_line("get Ch9:Phase").unwrap().starts_with("error:"));
        assert!(running.load(Ordering::SeqCst));
    }

    #[test]
    fn test_dump_is_json() {
        let (console, _) = make_console();
        let text = console.handle_line("dump").unwrap();
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["kind"], "gaspump");
        assert_eq!(json["fields"]["Ch1:Frequency_RBV"], 50);
        assert_eq!(json["fields"]["Ch1:Error"], "");
    }

    #[test]
    fn test_run_until_quit() {
        let (console, running) = make_console();
        let input = "list\n\nput Ch1:Phase 5\nquit\nget Ch1:Phase\n";
        let mut output = Vec::new();
        console.run(input.as_bytes(), &mut output).unwrap();

        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("Ch1:Mode_RBV"));
        assert!(text.contains("Ch1:Phase = 5"));
        assert!(text.ends_with("bye\n"));
        assert!(!running.load(Ordering::SeqCst));
    }
}
