//! Address space and enumerated codes of the programmable logic card.
//!
//! The card exposes one flat address space: logic cells start at 1, the
//! physical I/O channels occupy 33..=48 (front panel, then backplane), and any
//! source address at or above [`INVERT_ADDRESS`] denotes the logical inversion
//! of the signal at `address - INVERT_ADDRESS`.

use crate::error::{PlogicError, PlogicResult};
use std::fmt;
use std::ops::RangeInclusive;

/// Size of the addressable space; valid addresses are `0..NUM_ADDRESSES`.
pub const NUM_ADDRESSES: u8 = 128;
/// Offset marking an inverted source.
pub const INVERT_ADDRESS: u8 = 64;

/// Front-panel BNC channels.
pub const FRONTPANEL_ADDRESSES: RangeInclusive<u8> = 33..=40;
/// Backplane TTL channels.
pub const BACKPLANE_ADDRESSES: RangeInclusive<u8> = 41..=48;
/// All physical I/O channels.
pub const PHYSICAL_IO_ADDRESSES: RangeInclusive<u8> = 33..=48;

/// Cell count assumed when the firmware build name does not carry one.
pub const DEFAULT_NUM_CELLS: u8 = 16;

/// Which band a physical I/O address belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IoBand {
    /// Front-panel BNC connectors
    Frontpanel,
    /// Backplane TTL lines
    Backplane,
}

impl IoBand {
    /// Band of `address`, or `None` when it is not a physical channel.
    pub fn of(address: u8) -> Option<Self> {
        if FRONTPANEL_ADDRESSES.contains(&address) {
            Some(IoBand::Frontpanel)
        } else if BACKPLANE_ADDRESSES.contains(&address) {
            Some(IoBand::Backplane)
        } else {
            None
        }
    }
}

// =============================================================================
// Source addresses
// =============================================================================

/// Raw source address as stored in a cell input or I/O channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceAddress(u8);

/// Decoded meaning of a [`SourceAddress`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signal {
    /// Address of the cell or channel driving the signal
    pub source: u8,
    /// Whether the signal is logically inverted
    pub inverted: bool,
}

impl Signal {
    /// Non-inverted signal from `source`.
    pub fn direct(source: u8) -> Self {
        Self {
            source,
            inverted: false,
        }
    }

    /// Inverted signal from `source`.
    pub fn invert(source: u8) -> Self {
        Self {
            source,
            inverted: true,
        }
    }
}

impl SourceAddress {
    /// Validate a raw address. Values outside `0..128` are rejected.
    pub fn new(raw: i64) -> Option<Self> {
        u8::try_from(raw)
            .ok()
            .filter(|value| *value < NUM_ADDRESSES)
            .map(SourceAddress)
    }

    /// Encode a signal; fails if the source does not fit below the invert offset.
    pub fn encode(signal: Signal) -> Option<Self> {
        if signal.source >= INVERT_ADDRESS {
            return None;
        }
        let raw = if signal.inverted {
            signal.source + INVERT_ADDRESS
        } else {
            signal.source
        };
        Some(SourceAddress(raw))
    }

    /// Split into source and inversion flag.
    pub fn decode(self) -> Signal {
        if self.0 >= INVERT_ADDRESS {
            Signal::invert(self.0 - INVERT_ADDRESS)
        } else {
            Signal::direct(self.0)
        }
    }

    /// Raw wire value.
    pub fn raw(self) -> u8 {
        self.0
    }
}

// =============================================================================
// Enumerated property values
// =============================================================================

/// Logic cell type (`CCA Y`).
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellType {
    Constant,
    DFlop,
    Lut2,
    Lut3,
    Lut4,
    And2,
    Or2,
    Xor2,
    OneShot,
    Delay,
}

impl CellType {
    /// Every type, ordered by wire code.
    pub const ALL: [CellType; 10] = [
        CellType::Constant,
        CellType::DFlop,
        CellType::Lut2,
        CellType::Lut3,
        CellType::Lut4,
        CellType::And2,
        CellType::Or2,
        CellType::Xor2,
        CellType::OneShot,
        CellType::Delay,
    ];

    /// Wire code.
    pub fn code(self) -> i64 {
        self as i64
    }

    /// Type for a wire code; unknown codes are an invalid value.
    pub fn from_code(code: i64) -> PlogicResult<Self> {
        usize::try_from(code)
            .ok()
            .and_then(|index| Self::ALL.get(index).copied())
            .ok_or_else(|| PlogicError::invalid_value("cell type", code))
    }

    /// Display label used as the property value.
    pub fn label(self) -> &'static str {
        match self {
            CellType::Constant => "0 - constant",
            CellType::DFlop => "1 - D flop",
            CellType::Lut2 => "2 - 2-input LUT",
            CellType::Lut3 => "3 - 3-input LUT",
            CellType::Lut4 => "4 - 4-input LUT",
            CellType::And2 => "5 - 2-input AND",
            CellType::Or2 => "6 - 2-input OR",
            CellType::Xor2 => "7 - 2-input XOR",
            CellType::OneShot => "8 - one shot",
            CellType::Delay => "9 - delay",
        }
    }

    /// Type for a display label.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.label() == label)
    }
}

impl fmt::Display for CellType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Event that clocks the logic array (`PM`).
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerSource {
    Internal4kHz,
    MicroMirrorCard,
    BackplaneTtl5,
    BackplaneTtl7,
    FrontpanelBnc1,
}

impl TriggerSource {
    /// Every source, ordered by wire code.
    pub const ALL: [TriggerSource; 5] = [
        TriggerSource::Internal4kHz,
        TriggerSource::MicroMirrorCard,
        TriggerSource::BackplaneTtl5,
        TriggerSource::BackplaneTtl7,
        TriggerSource::FrontpanelBnc1,
    ];

    /// Wire code.
    pub fn code(self) -> i64 {
        self as i64
    }

    /// Source for a wire code; unknown codes are an invalid value.
    pub fn from_code(code: i64) -> PlogicResult<Self> {
        usize::try_from(code)
            .ok()
            .and_then(|index| Self::ALL.get(index).copied())
            .ok_or_else(|| PlogicError::invalid_value("trigger source", code))
    }

    /// Display label used as the property value.
    pub fn label(self) -> &'static str {
        match self {
            TriggerSource::Internal4kHz => "0 - internal 4kHz",
            TriggerSource::MicroMirrorCard => "1 - Micro-mirror card",
            TriggerSource::BackplaneTtl5 => "2 - backplane TTL5",
            TriggerSource::BackplaneTtl7 => "3 - backplane TTL7",
            TriggerSource::FrontpanelBnc1 => "4 - frontpanel BNC 1",
        }
    }

    /// Source for a display label.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.label() == label)
    }
}

impl fmt::Display for TriggerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Axis group written to non-volatile memory by `SS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SaveTarget {
    /// Partial save, code `X`
    X,
    /// Partial save, code `Y`
    Y,
    /// Complete save, code `Z`
    Z,
}

impl SaveTarget {
    /// Character sent after `SS`.
    pub fn wire_code(self) -> char {
        match self {
            SaveTarget::X => 'X',
            SaveTarget::Y => 'Y',
            SaveTarget::Z => 'Z',
        }
    }
}

/// Value of the one-shot save-settings property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveSettings {
    /// Nothing requested yet
    NoAction,
    /// A save is requested for this target
    Save(SaveTarget),
    /// The last requested save finished
    Done,
}

impl SaveSettings {
    /// Every settable state, in listing order.
    pub const ALL: [SaveSettings; 5] = [
        SaveSettings::Save(SaveTarget::X),
        SaveSettings::Save(SaveTarget::Y),
        SaveSettings::Save(SaveTarget::Z),
        SaveSettings::NoAction,
        SaveSettings::Done,
    ];

    /// Display label used as the property value.
    pub fn label(self) -> &'static str {
        match self {
            SaveSettings::NoAction => "no action",
            SaveSettings::Done => "save settings done",
            SaveSettings::Save(SaveTarget::X) => "X - save settings to card (partial)",
            SaveSettings::Save(SaveTarget::Y) => "Y - save settings to card (partial)",
            SaveSettings::Save(SaveTarget::Z) => "Z - save settings to card (complete)",
        }
    }

    /// State for a display label.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.label() == label)
    }
}

/// Yes/No toggle used by the refresh and advanced-properties switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    #[allow(missing_docs)]
    No,
    #[allow(missing_docs)]
    Yes,
}

impl Toggle {
    /// Both states.
    pub const ALL: [Toggle; 2] = [Toggle::No, Toggle::Yes];

    /// Display label.
    pub fn label(self) -> &'static str {
        match self {
            Toggle::No => "No",
            Toggle::Yes => "Yes",
        }
    }

    /// State for a display label.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.label() == label)
    }
}

impl From<bool> for Toggle {
    fn from(value: bool) -> Self {
        if value {
            Toggle::Yes
        } else {
            Toggle::No
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invert_offset_decodes_to_inverted_source() {
        for k in 1..INVERT_ADDRESS {
            let address = SourceAddress::new(i64::from(k + INVERT_ADDRESS)).unwrap();
            assert_eq!(address.decode(), Signal::invert(k));
        }
    }

    #[test]
    fn direct_addresses_are_not_inverted() {
        let address = SourceAddress::new(33).unwrap();
        assert_eq!(address.decode(), Signal::direct(33));
        assert_eq!(SourceAddress::encode(Signal::invert(33)).unwrap().raw(), 97);
    }

    #[test]
    fn source_address_range() {
        assert!(SourceAddress::new(-1).is_none());
        assert!(SourceAddress::new(128).is_none());
        assert!(SourceAddress::new(127).is_some());
        assert!(SourceAddress::encode(Signal::direct(64)).is_none());
    }

    #[test]
    fn io_bands() {
        assert_eq!(IoBand::of(33), Some(IoBand::Frontpanel));
        assert_eq!(IoBand::of(40), Some(IoBand::Frontpanel));
        assert_eq!(IoBand::of(41), Some(IoBand::Backplane));
        assert_eq!(IoBand::of(48), Some(IoBand::Backplane));
        assert_eq!(IoBand::of(32), None);
        assert_eq!(IoBand::of(49), None);
    }

    #[test]
    fn cell_type_codes_and_labels() {
        for (code, cell_type) in CellType::ALL.iter().enumerate() {
            assert_eq!(cell_type.code(), code as i64);
            assert_eq!(CellType::from_code(code as i64).unwrap(), *cell_type);
            assert_eq!(CellType::from_label(cell_type.label()), Some(*cell_type));
        }
        assert!(matches!(
            CellType::from_code(10),
            Err(PlogicError::InvalidValue { .. })
        ));
        assert!(CellType::from_code(-1).is_err());
    }

    #[test]
    fn trigger_source_rejects_unknown_code() {
        assert_eq!(
            TriggerSource::from_code(4).unwrap(),
            TriggerSource::FrontpanelBnc1
        );
        assert!(matches!(
            TriggerSource::from_code(5),
            Err(PlogicError::InvalidValue { .. })
        ));
    }

    #[test]
    fn save_targets_have_distinct_wire_codes() {
        assert_eq!(SaveTarget::X.wire_code(), 'X');
        assert_eq!(SaveTarget::Y.wire_code(), 'Y');
        assert_eq!(SaveTarget::Z.wire_code(), 'Z');
    }
}
