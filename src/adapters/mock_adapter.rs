//! Simulated logic card for testing
//!
//! [`SimulatedCard`] implements [`Transport`] by answering the card's ASCII
//! protocol from in-memory state instead of a serial port. It provides:
//! - A pointer register and per-address `CCA`/`CCB` field storage
//! - Output bitmasks, trigger source and firmware build name
//! - A log of every command received, for verifying bus traffic
//! - One-shot transport failure injection and forced replies
//!
//! Like the real card, changing a cell's type resets that cell's
//! configuration and inputs to zero.

use super::Transport;
use crate::hardware::codes::NUM_ADDRESSES;
use crate::hardware::protocol::ACK;
use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};

/// Field registers behind one address of the pointer space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Registers {
    /// `CCA Y`: cell type code
    pub cell_type: i64,
    /// `CCA Z`: cell configuration, or source address of an I/O channel
    pub config: i64,
    /// `CCB X`
    pub input_x: i64,
    /// `CCB Y`
    pub input_y: i64,
    /// `CCB Z`
    pub input_z: i64,
    /// `CCB F`
    pub input_f: i64,
}

impl Registers {
    fn field_mut(&mut self, mnemonic: &str, field: char) -> Option<&mut i64> {
        match (mnemonic, field) {
            ("CCA", 'Y') => Some(&mut self.cell_type),
            ("CCA", 'Z') => Some(&mut self.config),
            ("CCB", 'X') => Some(&mut self.input_x),
            ("CCB", 'Y') => Some(&mut self.input_y),
            ("CCB", 'Z') => Some(&mut self.input_z),
            ("CCB", 'F') => Some(&mut self.input_f),
            _ => None,
        }
    }
}

/// In-memory stand-in for a logic card on the bus.
///
/// # Example
///
/// ```
/// use rust_plogic::adapters::{SimulatedCard, Transport};
/// use std::time::Duration;
///
/// let mut card = SimulatedCard::new('1', 'M');
/// assert_eq!(card.query("M M=5", Duration::ZERO).unwrap(), ":A");
/// assert_eq!(card.query("W M", Duration::ZERO).unwrap(), ":A 5");
/// assert_eq!(card.command_log(), vec!["M M=5", "W M"]);
/// ```
#[derive(Debug)]
pub struct SimulatedCard {
    address: char,
    axis: char,
    build_name: String,
    pointer: u8,
    registers: HashMap<u8, Registers>,
    cell_outputs: i64,
    frontpanel_outputs: i64,
    backplane_outputs: i64,
    trigger_source: i64,
    saves: Vec<char>,
    call_log: Vec<String>,
    forced_replies: HashMap<String, String>,
    should_fail_next: AtomicBool,
    pending_reply: Option<String>,
}

impl SimulatedCard {
    /// Card at bus `address` with pointer axis `axis`, 16 cells, pointer at 1.
    pub fn new(address: char, axis: char) -> Self {
        Self {
            address,
            axis,
            build_name: "TIGER_PLOGIC_16".to_string(),
            pointer: 1,
            registers: HashMap::new(),
            cell_outputs: 0,
            frontpanel_outputs: 0,
            backplane_outputs: 0,
            trigger_source: 0,
            saves: Vec::new(),
            call_log: Vec::new(),
            forced_replies: HashMap::new(),
            should_fail_next: AtomicBool::new(false),
            pending_reply: None,
        }
    }

    /// Replace the firmware build name returned by `BU`.
    pub fn with_build_name(mut self, build_name: impl Into<String>) -> Self {
        self.build_name = build_name.into();
        self
    }

    /// Fail the next write with an I/O error.
    pub fn fail_next(&self) {
        self.should_fail_next.store(true, Ordering::SeqCst);
    }

    /// Answer `command` with `reply` verbatim, bypassing the simulation.
    pub fn force_reply(&mut self, command: impl Into<String>, reply: impl Into<String>) {
        self.forced_replies.insert(command.into(), reply.into());
    }

    /// Commands received so far, oldest first.
    pub fn command_log(&self) -> Vec<String> {
        self.call_log.clone()
    }

    /// Clear the command log.
    pub fn clear_command_log(&mut self) {
        self.call_log.clear();
    }

    /// Save commands received so far, by wire code.
    pub fn saves(&self) -> &[char] {
        &self.saves
    }

    /// Hardware pointer position.
    pub fn pointer(&self) -> u8 {
        self.pointer
    }

    /// Move the hardware pointer behind the driver's back.
    pub fn set_pointer(&mut self, address: u8) {
        self.pointer = address;
    }

    /// Registers at `address`.
    pub fn registers(&self, address: u8) -> Registers {
        self.registers.get(&address).copied().unwrap_or_default()
    }

    /// Overwrite the registers at `address`.
    pub fn set_registers(&mut self, address: u8, registers: Registers) {
        self.registers.insert(address, registers);
    }

    /// Set the raw trigger source code, including codes the card never reports.
    pub fn set_trigger_code(&mut self, code: i64) {
        self.trigger_source = code;
    }

    /// Raw trigger source code.
    pub fn trigger_code(&self) -> i64 {
        self.trigger_source
    }

    /// Set the internal, front-panel and backplane output bitmasks.
    pub fn set_outputs(&mut self, cells: i64, frontpanel: i64, backplane: i64) {
        self.cell_outputs = cells;
        self.frontpanel_outputs = frontpanel;
        self.backplane_outputs = backplane;
    }

    fn respond(&mut self, command: &str) -> Option<String> {
        if let Some(reply) = self.forced_replies.get(command) {
            return Some(reply.clone());
        }

        if let Some(rest) = command.strip_prefix("M ") {
            return self.axis_arg(rest).map(|arg| self.move_pointer(arg));
        }
        if let Some(rest) = command.strip_prefix("W ") {
            return (rest.trim() == self.axis.to_string())
                .then(|| format!("{} {}", ACK, self.pointer));
        }
        if let Some(rest) = command.strip_prefix("PM ") {
            return self.axis_arg(rest).map(|arg| self.trigger(arg));
        }

        let local = command.strip_prefix(self.address)?;
        Some(self.card_local(local))
    }

    /// Argument after `{axis}` for axis-addressed commands, if this is our axis.
    fn axis_arg<'a>(&self, rest: &'a str) -> Option<&'a str> {
        rest.strip_prefix(self.axis)
    }

    fn move_pointer(&mut self, arg: &str) -> String {
        match arg.strip_prefix('=').and_then(|v| v.trim().parse::<u8>().ok()) {
            Some(address) if address > 0 && address < NUM_ADDRESSES => {
                self.pointer = address;
                ACK.to_string()
            }
            _ => ":N-4".to_string(),
        }
    }

    fn trigger(&mut self, arg: &str) -> String {
        if arg == "?" {
            return format!("{}={} {}", self.axis, self.trigger_source, ACK);
        }
        match arg.strip_prefix('=').and_then(|v| v.trim().parse::<i64>().ok()) {
            Some(code) if (0..=4).contains(&code) => {
                self.trigger_source = code;
                ACK.to_string()
            }
            _ => ":N-4".to_string(),
        }
    }

    fn card_local(&mut self, local: &str) -> String {
        if local == "BU" {
            return self.build_name.clone();
        }

        let Some((mnemonic, arg)) = local.split_once(' ') else {
            return ":N-1".to_string();
        };

        match mnemonic {
            "RDADC" => match arg {
                "Z?" => format!("{} {}", ACK, self.cell_outputs),
                "X?" => format!("{} {}", ACK, self.frontpanel_outputs),
                "Y?" => format!("{} {}", ACK, self.backplane_outputs),
                _ => ":N-1".to_string(),
            },
            "SS" => match arg {
                "X" | "Y" | "Z" => {
                    self.saves.extend(arg.chars());
                    ACK.to_string()
                }
                _ => ":N-1".to_string(),
            },
            "CCA" | "CCB" => self.field_command(mnemonic, arg),
            _ => ":N-1".to_string(),
        }
    }

    fn field_command(&mut self, mnemonic: &str, arg: &str) -> String {
        let mut chars = arg.chars();
        let (Some(field), rest) = (chars.next(), chars.as_str()) else {
            return ":N-1".to_string();
        };

        let pointer = self.pointer;
        let registers = self.registers.entry(pointer).or_default();

        if rest == "?" {
            return match registers.field_mut(mnemonic, field) {
                Some(value) => format!("{} {}={}", ACK, field, value),
                None => ":N-1".to_string(),
            };
        }

        let Some(value) = rest.strip_prefix('=').and_then(|v| v.trim().parse::<i64>().ok())
        else {
            return ":N-1".to_string();
        };

        if mnemonic == "CCA" && field == 'Y' {
            *registers = Registers {
                cell_type: value,
                ..Registers::default()
            };
            return ACK.to_string();
        }

        match registers.field_mut(mnemonic, field) {
            Some(slot) => {
                *slot = value;
                ACK.to_string()
            }
            None => ":N-1".to_string(),
        }
    }
}

impl Transport for SimulatedCard {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.call_log.push(line.to_string());

        if self.should_fail_next.swap(false, Ordering::SeqCst) {
            self.pending_reply = None;
            return Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "Simulated transport failure",
            ));
        }

        self.pending_reply = self.respond(line);
        Ok(())
    }

    fn read_line(&mut self) -> io::Result<String> {
        // Commands for other cards or axes get no answer on a real bus
        self.pending_reply.take().ok_or_else(|| {
            io::Error::new(io::ErrorKind::TimedOut, "No reply from simulated card")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn ask(card: &mut SimulatedCard, command: &str) -> io::Result<String> {
        card.query(command, Duration::ZERO)
    }

    #[test]
    fn field_writes_apply_at_pointer() {
        let mut card = SimulatedCard::new('1', 'M');
        assert_eq!(ask(&mut card, "M M=7").unwrap(), ":A");
        assert_eq!(ask(&mut card, "1CCB X=65").unwrap(), ":A");
        assert_eq!(ask(&mut card, "1CCB X?").unwrap(), ":A X=65");
        assert_eq!(card.registers(7).input_x, 65);
    }

    #[test]
    fn type_change_resets_dependent_fields() {
        let mut card = SimulatedCard::new('1', 'M');
        card.set_registers(
            2,
            Registers {
                cell_type: 5,
                config: 9,
                input_x: 3,
                input_y: 4,
                input_z: 0,
                input_f: 1,
            },
        );
        ask(&mut card, "M M=2").unwrap();
        ask(&mut card, "1CCA Y=6").unwrap();

        let registers = card.registers(2);
        assert_eq!(registers.cell_type, 6);
        assert_eq!(registers.config, 0);
        assert_eq!(registers.input_x, 0);
    }

    #[test]
    fn trigger_query_is_acknowledged_by_axis_letter() {
        let mut card = SimulatedCard::new('1', 'M');
        card.set_trigger_code(2);
        assert_eq!(ask(&mut card, "PM M?").unwrap(), "M=2 :A");
    }

    #[test]
    fn other_addresses_time_out() {
        let mut card = SimulatedCard::new('1', 'M');
        let err = ask(&mut card, "2CCA Y?").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
        let err = ask(&mut card, "W X").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
    }

    #[test]
    fn failure_is_one_shot() {
        let mut card = SimulatedCard::new('1', 'M');
        card.fail_next();
        assert!(ask(&mut card, "W M").is_err());
        assert_eq!(ask(&mut card, "W M").unwrap(), ":A 1");
        assert_eq!(card.command_log(), vec!["W M", "W M"]);
    }

    #[test]
    fn unknown_commands_get_error_reply() {
        let mut card = SimulatedCard::new('1', 'M');
        assert_eq!(ask(&mut card, "1XYZ").unwrap(), ":N-1");
        assert_eq!(ask(&mut card, "1CCA Q?").unwrap(), ":N-1");
    }
}
