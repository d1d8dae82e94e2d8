//! Property keys, descriptors and the per-card property table.
//!
//! Each externally visible property is identified by a [`PropertyKey`]: either
//! a card-wide property or an (entity, index, field) triple for cells and I/O
//! channels. The table maps keys to descriptors holding the display name,
//! value kind, allowed values and the last known-good value.

use crate::hardware::codes::{IoBand, BACKPLANE_ADDRESSES, FRONTPANEL_ADDRESSES};
use std::collections::BTreeMap;
use std::fmt;

/// Field of a logic cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CellField {
    /// Cell type, `CCA Y`
    Type,
    /// Type-dependent configuration, `CCA Z`
    Config,
    /// Input selector, `CCB <letter>`
    Input(InputSelector),
}

/// One of the four cell inputs.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum InputSelector {
    X,
    Y,
    Z,
    F,
}

impl InputSelector {
    /// All inputs in wire order.
    pub const ALL: [InputSelector; 4] = [
        InputSelector::X,
        InputSelector::Y,
        InputSelector::Z,
        InputSelector::F,
    ];

    /// Field letter used on the wire.
    pub fn letter(self) -> char {
        match self {
            InputSelector::X => 'X',
            InputSelector::Y => 'Y',
            InputSelector::Z => 'Z',
            InputSelector::F => 'F',
        }
    }
}

impl CellField {
    /// Every field of a cell, type first.
    pub const ALL: [CellField; 6] = [
        CellField::Type,
        CellField::Config,
        CellField::Input(InputSelector::X),
        CellField::Input(InputSelector::Y),
        CellField::Input(InputSelector::Z),
        CellField::Input(InputSelector::F),
    ];

    /// Fields the card resets when the cell type changes.
    pub const DEPENDENT: [CellField; 5] = [
        CellField::Config,
        CellField::Input(InputSelector::X),
        CellField::Input(InputSelector::Y),
        CellField::Input(InputSelector::Z),
        CellField::Input(InputSelector::F),
    ];

    /// Command mnemonic and field letter, e.g. `("CCB", 'X')`.
    pub fn wire(self) -> (&'static str, char) {
        match self {
            CellField::Type => ("CCA", 'Y'),
            CellField::Config => ("CCA", 'Z'),
            CellField::Input(input) => ("CCB", input.letter()),
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            CellField::Type => "_Type",
            CellField::Config => "_Config",
            CellField::Input(InputSelector::X) => "_InputX",
            CellField::Input(InputSelector::Y) => "_InputY",
            CellField::Input(InputSelector::Z) => "_InputZ",
            CellField::Input(InputSelector::F) => "_InputF",
        }
    }
}

/// Which output bitmask a snapshot property reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OutputBank {
    /// Logic cell outputs, `RDADC Z`
    Cells,
    /// Front-panel BNCs, `RDADC X`
    Frontpanel,
    /// Backplane lines, `RDADC Y`
    Backplane,
}

impl OutputBank {
    /// Field letter of the `RDADC` query.
    pub fn letter(self) -> char {
        match self {
            OutputBank::Cells => 'Z',
            OutputBank::Frontpanel => 'X',
            OutputBank::Backplane => 'Y',
        }
    }
}

/// Identity of a property.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PropertyKey {
    Description,
    AxisLetter,
    FirmwareBuild,
    NumLogicCells,
    PointerPosition,
    OutputState(OutputBank),
    TriggerSource,
    RefreshPropertyValues,
    SaveCardSettings,
    AdvancedProperties,
    Cell { index: u8, field: CellField },
    IoSource { address: u8 },
}

impl PropertyKey {
    /// Display name of the property.
    pub fn name(&self) -> String {
        match self {
            PropertyKey::Description => "Description".to_string(),
            PropertyKey::AxisLetter => "AxisLetter".to_string(),
            PropertyKey::FirmwareBuild => "FirmwareBuild".to_string(),
            PropertyKey::NumLogicCells => "NumLogicCells".to_string(),
            PropertyKey::PointerPosition => "PointerPosition".to_string(),
            PropertyKey::OutputState(OutputBank::Cells) => "PLogicOutputState".to_string(),
            PropertyKey::OutputState(OutputBank::Frontpanel) => {
                "FrontpanelOutputState".to_string()
            }
            PropertyKey::OutputState(OutputBank::Backplane) => "BackplaneOutputState".to_string(),
            PropertyKey::TriggerSource => "TriggerSource".to_string(),
            PropertyKey::RefreshPropertyValues => "RefreshPropertyValues".to_string(),
            PropertyKey::SaveCardSettings => "SaveCardSettings".to_string(),
            PropertyKey::AdvancedProperties => "EnableAdvancedProperties".to_string(),
            PropertyKey::Cell { index, field } => format!("Cell_{:02}{}", index, field.suffix()),
            PropertyKey::IoSource { address } => match IoBand::of(*address) {
                // Front panel is labelled from 1, backplane from 0
                Some(IoBand::Frontpanel) => format!(
                    "SourceAddress_Frontpanel_{}",
                    address - FRONTPANEL_ADDRESSES.start() + 1
                ),
                Some(IoBand::Backplane) => format!(
                    "SourceAddress_Backplane_{}",
                    address - BACKPLANE_ADDRESSES.start()
                ),
                None => format!("SourceAddress_{}", address),
            },
        }
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Value of a property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    /// Integer-valued property
    Integer(i64),
    /// String-valued property, including enumerated labels
    Text(String),
}

impl PropertyValue {
    /// Integer content, if any.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            PropertyValue::Integer(value) => Some(*value),
            PropertyValue::Text(text) => text.trim().parse().ok(),
        }
    }

    /// Text content, if any.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            PropertyValue::Text(text) => Some(text),
            PropertyValue::Integer(_) => None,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Integer(value) => write!(f, "{}", value),
            PropertyValue::Text(text) => f.write_str(text),
        }
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Integer(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::Text(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::Text(value)
    }
}

/// Kind of value a property holds.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    Integer,
    Text,
}

/// Declared property with its last known-good value.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDescriptor {
    /// Identity
    pub key: PropertyKey,
    /// Value kind
    pub kind: PropertyKind,
    /// Whether callers may write it
    pub read_only: bool,
    /// Allowed labels for enumerated properties; empty means unrestricted
    pub allowed: Vec<String>,
    /// Cached value
    pub value: PropertyValue,
}

impl PropertyDescriptor {
    /// Writable integer property starting at `initial`.
    pub fn integer(key: PropertyKey, initial: i64) -> Self {
        Self {
            key,
            kind: PropertyKind::Integer,
            read_only: false,
            allowed: Vec::new(),
            value: PropertyValue::Integer(initial),
        }
    }

    /// Writable text property starting at `initial`.
    pub fn text(key: PropertyKey, initial: impl Into<String>) -> Self {
        Self {
            key,
            kind: PropertyKind::Text,
            read_only: false,
            allowed: Vec::new(),
            value: PropertyValue::Text(initial.into()),
        }
    }

    /// Restrict to the given labels.
    pub fn with_allowed<I, S>(mut self, allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed = allowed.into_iter().map(Into::into).collect();
        self
    }

    /// Mark read-only.
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Display name.
    pub fn name(&self) -> String {
        self.key.name()
    }
}

/// All declared properties of one card.
#[derive(Debug, Default)]
pub struct PropertyTable {
    entries: BTreeMap<PropertyKey, PropertyDescriptor>,
    names: BTreeMap<String, PropertyKey>,
}

impl PropertyTable {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a property; an existing declaration with the same key is kept.
    pub fn declare(&mut self, descriptor: PropertyDescriptor) {
        let key = descriptor.key;
        if self.entries.contains_key(&key) {
            return;
        }
        self.names.insert(key.name(), key);
        self.entries.insert(key, descriptor);
    }

    /// Whether `key` has been declared.
    pub fn contains(&self, key: &PropertyKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Descriptor for `key`.
    pub fn get(&self, key: &PropertyKey) -> Option<&PropertyDescriptor> {
        self.entries.get(key)
    }

    /// Key declared under display `name`.
    pub fn key_for(&self, name: &str) -> Option<PropertyKey> {
        self.names.get(name).copied()
    }

    /// Cached value of `key`.
    pub fn value(&self, key: &PropertyKey) -> Option<&PropertyValue> {
        self.entries.get(key).map(|descriptor| &descriptor.value)
    }

    /// Replace the cached value of a declared property.
    pub fn store(&mut self, key: &PropertyKey, value: PropertyValue) {
        if let Some(descriptor) = self.entries.get_mut(key) {
            descriptor.value = value;
        }
    }

    /// Display names in sorted order.
    pub fn names(&self) -> Vec<String> {
        self.names.keys().cloned().collect()
    }

    /// Number of declared properties.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is declared.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate descriptors in key order.
    pub fn iter(&self) -> impl Iterator<Item = &PropertyDescriptor> {
        self.entries.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_property_names_are_zero_padded() {
        let key = PropertyKey::Cell {
            index: 3,
            field: CellField::Input(InputSelector::F),
        };
        assert_eq!(key.name(), "Cell_03_InputF");
        let key = PropertyKey::Cell {
            index: 12,
            field: CellField::Type,
        };
        assert_eq!(key.name(), "Cell_12_Type");
    }

    #[test]
    fn io_property_names_follow_band_numbering() {
        assert_eq!(
            PropertyKey::IoSource { address: 33 }.name(),
            "SourceAddress_Frontpanel_1"
        );
        assert_eq!(
            PropertyKey::IoSource { address: 40 }.name(),
            "SourceAddress_Frontpanel_8"
        );
        assert_eq!(
            PropertyKey::IoSource { address: 41 }.name(),
            "SourceAddress_Backplane_0"
        );
        assert_eq!(
            PropertyKey::IoSource { address: 48 }.name(),
            "SourceAddress_Backplane_7"
        );
    }

    #[test]
    fn field_wire_mapping() {
        assert_eq!(CellField::Type.wire(), ("CCA", 'Y'));
        assert_eq!(CellField::Config.wire(), ("CCA", 'Z'));
        assert_eq!(CellField::Input(InputSelector::F).wire(), ("CCB", 'F'));
    }

    #[test]
    fn table_lookup_by_name_and_store() {
        let mut table = PropertyTable::new();
        table.declare(PropertyDescriptor::integer(PropertyKey::PointerPosition, 0));
        table.declare(
            PropertyDescriptor::text(PropertyKey::AxisLetter, "M").read_only(),
        );

        assert_eq!(table.len(), 2);
        assert_eq!(
            table.key_for("PointerPosition"),
            Some(PropertyKey::PointerPosition)
        );
        assert!(table.key_for("Nope").is_none());

        table.store(&PropertyKey::PointerPosition, 9.into());
        assert_eq!(
            table.value(&PropertyKey::PointerPosition),
            Some(&PropertyValue::Integer(9))
        );
        assert!(table.get(&PropertyKey::AxisLetter).unwrap().read_only);
    }

    #[test]
    fn redeclaring_keeps_first_descriptor() {
        let mut table = PropertyTable::new();
        table.declare(PropertyDescriptor::integer(PropertyKey::PointerPosition, 4));
        table.declare(PropertyDescriptor::integer(PropertyKey::PointerPosition, 0));
        assert_eq!(
            table.value(&PropertyKey::PointerPosition),
            Some(&PropertyValue::Integer(4))
        );
    }
}
