//! Programmable logic card driver
//!
//! Protocol Overview:
//! - Transport: shared multi-drop serial bus, ASCII, half-duplex
//! - Card-local commands are prefixed with the card's bus address character
//! - Cell and I/O fields are register-indirect: move the pointer (`M`), then
//!   query or write `CCA`/`CCB` fields of whatever the pointer selects
//!
//! The driver exposes the card as a set of named properties. Reads return the
//! cached value once the card is initialized unless refresh mode is on; writes
//! always go to the card and update the cache only after the card acknowledged.
//!
//! # Example Usage
//!
//! ```
//! use rust_plogic::adapters::SimulatedCard;
//! use rust_plogic::hardware::codes::CellType;
//! use rust_plogic::hardware::plogic::{CardOptions, PlogicCard};
//!
//! # fn main() -> rust_plogic::error::PlogicResult<()> {
//! let mut card = PlogicCard::new(SimulatedCard::new('1', 'M'), '1', 'M', CardOptions::default());
//! card.initialize()?;
//! card.enable_advanced_properties()?;
//!
//! card.set_cell_type(1, CellType::And2)?;
//! assert_eq!(card.cell_type(1)?, CellType::And2);
//! # Ok(())
//! # }
//! ```

use crate::adapters::Transport;
use crate::error::{PlogicError, PlogicResult};
use crate::hardware::codes::{
    CellType, SaveSettings, SaveTarget, SourceAddress, Toggle, TriggerSource, DEFAULT_NUM_CELLS,
    NUM_ADDRESSES, PHYSICAL_IO_ADDRESSES,
};
use crate::hardware::pointer::{Move, PointerRegister};
use crate::hardware::properties::{
    CellField, InputSelector, OutputBank, PropertyDescriptor, PropertyKey, PropertyTable,
    PropertyValue,
};
use crate::hardware::protocol::{
    parse_after_equals, parse_after_token, parse_after_underscore, CardLink, ACK,
};
use std::time::Duration;
use tracing::{debug, info, instrument, trace, warn};

/// Per-card behaviour settings.
#[derive(Debug, Clone, PartialEq)]
pub struct CardOptions {
    /// Delay between sending a save command and reading its reply
    pub save_settle: Duration,
    /// Start with refresh mode on (every read goes to the card)
    pub refresh_properties: bool,
}

impl Default for CardOptions {
    fn default() -> Self {
        Self {
            save_settle: Duration::from_millis(200),
            refresh_properties: false,
        }
    }
}

/// Snapshot of the three output bitmasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputSnapshot {
    /// Logic cell outputs, bit `n - 1` for cell `n`
    pub cells: u32,
    /// Front-panel BNC outputs
    pub frontpanel: u32,
    /// Backplane outputs
    pub backplane: u32,
}

/// Driver for one programmable logic card.
pub struct PlogicCard<T> {
    link: CardLink<T>,
    axis: char,
    pointer: PointerRegister,
    num_cells: u8,
    properties: PropertyTable,
    /// Re-read from hardware on every get instead of serving the cache
    refresh: bool,
    initialized: bool,
    advanced: bool,
    /// Target of the last completed save, cleared by any settings write
    last_save: Option<SaveTarget>,
    save_settle: Duration,
}

impl<T: Transport> PlogicCard<T> {
    /// Create a driver for the card at bus `address` whose pointer register
    /// lives on `axis`. No bus traffic happens until [`initialize`](Self::initialize).
    pub fn new(transport: T, address: char, axis: char, options: CardOptions) -> Self {
        Self {
            link: CardLink::new(transport, address),
            axis,
            pointer: PointerRegister::new(axis),
            num_cells: DEFAULT_NUM_CELLS,
            properties: PropertyTable::new(),
            refresh: options.refresh_properties,
            initialized: false,
            advanced: false,
            last_save: None,
            save_settle: options.save_settle,
        }
    }

    /// Read the cell count, declare the card-wide properties and read their
    /// initial values from the card.
    #[instrument(skip(self), fields(card = %self.link.address(), axis = %self.axis), err)]
    pub fn initialize(&mut self) -> PlogicResult<()> {
        if self.initialized {
            return Ok(());
        }

        let build = self.link.query_raw(&self.link.addressed("BU"))?;
        self.num_cells = cell_count_from_build(&build);

        let address = self.link.address();
        let declarations = [
            PropertyDescriptor::text(
                PropertyKey::Description,
                format!("ASI Programmable Logic HexAddr={:02X}", address as u32),
            )
            .read_only(),
            PropertyDescriptor::text(PropertyKey::AxisLetter, self.axis.to_string()).read_only(),
            PropertyDescriptor::text(PropertyKey::FirmwareBuild, build).read_only(),
            PropertyDescriptor::integer(PropertyKey::NumLogicCells, i64::from(self.num_cells))
                .read_only(),
            PropertyDescriptor::integer(PropertyKey::PointerPosition, 0),
            PropertyDescriptor::integer(PropertyKey::OutputState(OutputBank::Cells), 0)
                .read_only(),
            PropertyDescriptor::integer(PropertyKey::OutputState(OutputBank::Frontpanel), 0)
                .read_only(),
            PropertyDescriptor::integer(PropertyKey::OutputState(OutputBank::Backplane), 0)
                .read_only(),
            PropertyDescriptor::text(
                PropertyKey::TriggerSource,
                TriggerSource::Internal4kHz.label(),
            )
            .with_allowed(TriggerSource::ALL.iter().map(|t| t.label())),
            PropertyDescriptor::text(
                PropertyKey::RefreshPropertyValues,
                Toggle::from(self.refresh).label(),
            )
            .with_allowed(Toggle::ALL.iter().map(|t| t.label())),
            PropertyDescriptor::text(PropertyKey::SaveCardSettings, SaveSettings::NoAction.label())
                .with_allowed(SaveSettings::ALL.iter().map(|s| s.label())),
            PropertyDescriptor::text(PropertyKey::AdvancedProperties, Toggle::No.label())
                .with_allowed(Toggle::ALL.iter().map(|t| t.label())),
        ];
        for descriptor in declarations {
            self.properties.declare(descriptor);
        }

        for key in [
            PropertyKey::PointerPosition,
            PropertyKey::OutputState(OutputBank::Cells),
            PropertyKey::OutputState(OutputBank::Frontpanel),
            PropertyKey::OutputState(OutputBank::Backplane),
            PropertyKey::TriggerSource,
        ] {
            self.get(key)?;
        }

        self.initialized = true;
        info!(num_cells = self.num_cells, "logic card initialized");
        Ok(())
    }

    // =========================================================================
    // Property façade
    // =========================================================================

    /// Read a property by display name.
    pub fn get_property(&mut self, name: &str) -> PlogicResult<PropertyValue> {
        let key = self.key_for(name)?;
        self.get(key)
    }

    /// Write a property by display name.
    pub fn set_property(
        &mut self,
        name: &str,
        value: impl Into<PropertyValue>,
    ) -> PlogicResult<()> {
        let key = self.key_for(name)?;
        self.set(key, value.into())
    }

    /// Read a property.
    ///
    /// Output states always hit the card. Hardware-backed properties are
    /// served from cache once initialized unless refresh mode is on. Local
    /// properties (toggles, identity) never touch the bus.
    #[instrument(skip(self), fields(card = %self.link.address()), err)]
    pub fn get(&mut self, key: PropertyKey) -> PlogicResult<PropertyValue> {
        let cached = self
            .properties
            .value(&key)
            .cloned()
            .ok_or_else(|| PlogicError::UnknownProperty(key.name()))?;

        let from_hardware = match key {
            PropertyKey::OutputState(_) => true,
            PropertyKey::PointerPosition
            | PropertyKey::TriggerSource
            | PropertyKey::Cell { .. }
            | PropertyKey::IoSource { .. } => !self.serve_from_cache(),
            _ => false,
        };

        if !from_hardware {
            trace!(property = %key, "served from cache");
            return Ok(cached);
        }

        let value = self.read_hardware(key)?;
        self.properties.store(&key, value.clone());
        Ok(value)
    }

    /// Write a property.
    ///
    /// The cached value changes only after the card acknowledged the write.
    #[instrument(skip(self), fields(card = %self.link.address()), err)]
    pub fn set(&mut self, key: PropertyKey, value: PropertyValue) -> PlogicResult<()> {
        let descriptor = self
            .properties
            .get(&key)
            .ok_or_else(|| PlogicError::UnknownProperty(key.name()))?;
        if descriptor.read_only {
            return Err(PlogicError::ReadOnly(key.name()));
        }

        match key {
            PropertyKey::PointerPosition => {
                let requested = pointer_target(&key, &value)?;
                self.write_pointer_position(requested)
            }
            PropertyKey::TriggerSource => {
                let source =
                    parse_enum(&key, &value, TriggerSource::from_label, TriggerSource::from_code)?;
                let command = format!("PM {}={}", self.axis, source.code());
                self.link.query_verify(&command, ACK)?;
                self.settings_changed();
                self.properties.store(&key, source.label().into());
                Ok(())
            }
            PropertyKey::RefreshPropertyValues => {
                let toggle = parse_toggle(&key, &value)?;
                self.refresh = toggle == Toggle::Yes;
                self.properties.store(&key, toggle.label().into());
                Ok(())
            }
            PropertyKey::SaveCardSettings => {
                let requested = value
                    .as_text()
                    .and_then(SaveSettings::from_label)
                    .ok_or_else(|| PlogicError::invalid_value(key.name(), &value))?;
                self.write_save_settings(requested)
            }
            PropertyKey::AdvancedProperties => match parse_toggle(&key, &value)? {
                Toggle::Yes => self.materialize_advanced(),
                Toggle::No if self.advanced => {
                    warn!("advanced properties cannot be disabled once enabled; ignoring");
                    Ok(())
                }
                Toggle::No => Ok(()),
            },
            PropertyKey::Cell {
                index,
                field: CellField::Type,
            } => {
                let cell_type = parse_enum(&key, &value, CellType::from_label, CellType::from_code)?;
                self.write_field(index, CellField::Type, cell_type.code())?;
                self.properties.store(&key, cell_type.label().into());
                self.refresh_dependent_fields(index)
            }
            PropertyKey::Cell {
                index,
                field: CellField::Config,
            } => {
                let config = expect_integer(&key, &value)?;
                self.write_field(index, CellField::Config, config)?;
                self.properties.store(&key, config.into());
                Ok(())
            }
            PropertyKey::Cell {
                index,
                field: field @ CellField::Input(_),
            } => {
                let source = source_address(&key, &value)?;
                self.write_field(index, field, i64::from(source.raw()))?;
                self.properties.store(&key, i64::from(source.raw()).into());
                Ok(())
            }
            PropertyKey::IoSource { address } => {
                let source = source_address(&key, &value)?;
                self.write_field(address, CellField::Config, i64::from(source.raw()))?;
                self.properties.store(&key, i64::from(source.raw()).into());
                Ok(())
            }
            PropertyKey::Description
            | PropertyKey::AxisLetter
            | PropertyKey::FirmwareBuild
            | PropertyKey::NumLogicCells
            | PropertyKey::OutputState(_) => Err(PlogicError::ReadOnly(key.name())),
        }
    }

    /// Create the per-cell and per-channel properties and populate them from
    /// the card. One-way: once enabled the properties stay. Either every
    /// property is created or, on failure, none is.
    #[instrument(skip(self), fields(card = %self.link.address()), err)]
    pub fn enable_advanced_properties(&mut self) -> PlogicResult<()> {
        self.set(
            PropertyKey::AdvancedProperties,
            Toggle::Yes.label().into(),
        )
    }

    fn materialize_advanced(&mut self) -> PlogicResult<()> {
        if self.advanced {
            debug!("advanced properties already enabled");
            return Ok(());
        }

        let mut created = Vec::new();
        for index in 1..=self.num_cells {
            for field in CellField::ALL {
                let key = PropertyKey::Cell { index, field };
                let mut descriptor = match field {
                    CellField::Type => {
                        PropertyDescriptor::text(key, CellType::Constant.label())
                            .with_allowed(CellType::ALL.iter().map(|t| t.label()))
                    }
                    _ => PropertyDescriptor::integer(key, 0),
                };
                descriptor.value = self.read_hardware(key)?;
                created.push(descriptor);
            }
        }
        for address in PHYSICAL_IO_ADDRESSES {
            let key = PropertyKey::IoSource { address };
            let mut descriptor = PropertyDescriptor::integer(key, 0);
            descriptor.value = self.read_hardware(key)?;
            created.push(descriptor);
        }

        let count = created.len();
        for descriptor in created {
            self.properties.declare(descriptor);
        }
        self.advanced = true;
        self.properties
            .store(&PropertyKey::AdvancedProperties, Toggle::Yes.label().into());
        info!(count, "advanced properties created");
        Ok(())
    }

    // =========================================================================
    // Hardware access
    // =========================================================================

    fn serve_from_cache(&self) -> bool {
        !self.refresh && self.initialized
    }

    /// Query the card for the current value of `key`, bypassing the cache.
    fn read_hardware(&mut self, key: PropertyKey) -> PlogicResult<PropertyValue> {
        match key {
            PropertyKey::PointerPosition => {
                let position = self.pointer.refresh_from_hardware(&mut self.link)?;
                Ok(i64::from(position).into())
            }
            PropertyKey::OutputState(bank) => {
                let command = self.link.addressed(&format!("RDADC {}?", bank.letter()));
                let reply = self.link.query_verify(&command, ACK)?;
                Ok(parse_after_token(&reply, ACK)?.into())
            }
            PropertyKey::TriggerSource => {
                let command = format!("PM {}?", self.axis);
                let reply = self.link.query_verify(&command, &self.axis.to_string())?;
                let code = parse_after_equals(&reply)?;
                let source = TriggerSource::from_code(code)
                    .map_err(|_| PlogicError::invalid_value(key.name(), code))?;
                Ok(source.label().into())
            }
            PropertyKey::Cell { index, field } => {
                let raw = self.read_field(index, field)?;
                match field {
                    CellField::Type => {
                        let cell_type = CellType::from_code(raw)
                            .map_err(|_| PlogicError::invalid_value(key.name(), raw))?;
                        Ok(cell_type.label().into())
                    }
                    _ => Ok(raw.into()),
                }
            }
            PropertyKey::IoSource { address } => {
                Ok(self.read_field(address, CellField::Config)?.into())
            }
            _ => self
                .properties
                .value(&key)
                .cloned()
                .ok_or_else(|| PlogicError::UnknownProperty(key.name())),
        }
    }

    /// Point the card at `address`, keeping the visible pointer property in step.
    /// In refresh mode the cached position is not trusted and the move is
    /// always sent.
    fn move_pointer(&mut self, address: u8) -> PlogicResult<()> {
        if self.refresh {
            self.pointer.invalidate();
        }
        if self.pointer.move_to(&mut self.link, address)? == Move::Moved {
            self.properties
                .store(&PropertyKey::PointerPosition, i64::from(address).into());
        }
        Ok(())
    }

    fn read_field(&mut self, address: u8, field: CellField) -> PlogicResult<i64> {
        self.move_pointer(address)?;
        let (mnemonic, letter) = field.wire();
        let command = self.link.addressed(&format!("{} {}?", mnemonic, letter));
        let reply = self.link.query_verify(&command, ACK)?;
        parse_after_equals(&reply)
    }

    fn write_field(&mut self, address: u8, field: CellField, value: i64) -> PlogicResult<()> {
        self.move_pointer(address)?;
        let (mnemonic, letter) = field.wire();
        let command = self
            .link
            .addressed(&format!("{} {}={}", mnemonic, letter, value));
        self.link.query_verify(&command, ACK)?;
        self.settings_changed();
        Ok(())
    }

    /// A type change resets the cell's other fields on the card; re-read them.
    fn refresh_dependent_fields(&mut self, index: u8) -> PlogicResult<()> {
        for field in CellField::DEPENDENT {
            let key = PropertyKey::Cell { index, field };
            if !self.properties.contains(&key) {
                continue;
            }
            let value = self.read_hardware(key)?;
            self.properties.store(&key, value);
        }
        Ok(())
    }

    fn write_pointer_position(&mut self, requested: u8) -> PlogicResult<()> {
        self.pointer.force_move(&mut self.link, requested)?;
        let actual = self.pointer.refresh_from_hardware(&mut self.link)?;
        if actual != requested {
            warn!(requested, actual, "pointer position drifted after move");
        }
        self.properties
            .store(&PropertyKey::PointerPosition, i64::from(actual).into());
        Ok(())
    }

    fn write_save_settings(&mut self, requested: SaveSettings) -> PlogicResult<()> {
        let key = PropertyKey::SaveCardSettings;
        match requested {
            SaveSettings::NoAction => {
                self.last_save = None;
                self.properties.store(&key, requested.label().into());
                Ok(())
            }
            SaveSettings::Done => Ok(()),
            SaveSettings::Save(target) => {
                if self.last_save == Some(target) {
                    debug!(?target, "settings already saved");
                    return Ok(());
                }
                let command = self
                    .link
                    .addressed(&format!("SS {}", target.wire_code()));
                self.link
                    .query_verify_delayed(&command, ACK, self.save_settle)?;
                self.last_save = Some(target);
                self.properties
                    .store(&key, SaveSettings::Done.label().into());
                info!(?target, "settings saved to card");
                Ok(())
            }
        }
    }

    fn settings_changed(&mut self) {
        self.last_save = None;
    }

    fn key_for(&self, name: &str) -> PlogicResult<PropertyKey> {
        self.properties
            .key_for(name)
            .ok_or_else(|| PlogicError::UnknownProperty(name.to_string()))
    }

    // =========================================================================
    // Typed accessors
    // =========================================================================

    /// Type of cell `index`.
    pub fn cell_type(&mut self, index: u8) -> PlogicResult<CellType> {
        let key = PropertyKey::Cell {
            index,
            field: CellField::Type,
        };
        let value = self.get(key)?;
        value
            .as_text()
            .and_then(CellType::from_label)
            .ok_or_else(|| PlogicError::invalid_value(key.name(), &value))
    }

    /// Change the type of cell `index`. The card resets the cell's other
    /// fields, which are re-read afterwards.
    pub fn set_cell_type(&mut self, index: u8, cell_type: CellType) -> PlogicResult<()> {
        self.set(
            PropertyKey::Cell {
                index,
                field: CellField::Type,
            },
            cell_type.label().into(),
        )
    }

    /// Configuration value of cell `index`.
    pub fn cell_config(&mut self, index: u8) -> PlogicResult<i64> {
        let key = PropertyKey::Cell {
            index,
            field: CellField::Config,
        };
        let value = self.get(key)?;
        expect_integer(&key, &value)
    }

    /// Set the configuration value of cell `index`.
    pub fn set_cell_config(&mut self, index: u8, config: i64) -> PlogicResult<()> {
        self.set(
            PropertyKey::Cell {
                index,
                field: CellField::Config,
            },
            config.into(),
        )
    }

    /// Source feeding `input` of cell `index`.
    pub fn cell_input(&mut self, index: u8, input: InputSelector) -> PlogicResult<SourceAddress> {
        let key = PropertyKey::Cell {
            index,
            field: CellField::Input(input),
        };
        let value = self.get(key)?;
        source_address(&key, &value)
    }

    /// Route `source` into `input` of cell `index`.
    pub fn set_cell_input(
        &mut self,
        index: u8,
        input: InputSelector,
        source: SourceAddress,
    ) -> PlogicResult<()> {
        self.set(
            PropertyKey::Cell {
                index,
                field: CellField::Input(input),
            },
            i64::from(source.raw()).into(),
        )
    }

    /// Source driving physical channel `address` (33..=48).
    pub fn io_source(&mut self, address: u8) -> PlogicResult<SourceAddress> {
        let key = PropertyKey::IoSource { address };
        let value = self.get(key)?;
        source_address(&key, &value)
    }

    /// Route `source` to physical channel `address` (33..=48).
    pub fn set_io_source(&mut self, address: u8, source: SourceAddress) -> PlogicResult<()> {
        self.set(
            PropertyKey::IoSource { address },
            i64::from(source.raw()).into(),
        )
    }

    /// Read all three output bitmasks from the card.
    pub fn output_states(&mut self) -> PlogicResult<OutputSnapshot> {
        Ok(OutputSnapshot {
            cells: self.output_state(OutputBank::Cells)?,
            frontpanel: self.output_state(OutputBank::Frontpanel)?,
            backplane: self.output_state(OutputBank::Backplane)?,
        })
    }

    fn output_state(&mut self, bank: OutputBank) -> PlogicResult<u32> {
        let key = PropertyKey::OutputState(bank);
        let value = self.get(key)?;
        value
            .as_integer()
            .and_then(|raw| u32::try_from(raw).ok())
            .ok_or_else(|| PlogicError::invalid_value(key.name(), &value))
    }

    /// Event clocking the logic array.
    pub fn trigger_source(&mut self) -> PlogicResult<TriggerSource> {
        let key = PropertyKey::TriggerSource;
        let value = self.get(key)?;
        value
            .as_text()
            .and_then(TriggerSource::from_label)
            .ok_or_else(|| PlogicError::invalid_value(key.name(), &value))
    }

    /// Select the event clocking the logic array.
    pub fn set_trigger_source(&mut self, source: TriggerSource) -> PlogicResult<()> {
        self.set(PropertyKey::TriggerSource, source.label().into())
    }

    /// Pointer position as seen by the driver.
    pub fn pointer_position(&mut self) -> PlogicResult<u8> {
        let key = PropertyKey::PointerPosition;
        let value = self.get(key)?;
        pointer_reading(&key, &value)
    }

    /// Move the pointer and confirm the move by reading it back.
    pub fn set_pointer_position(&mut self, address: u8) -> PlogicResult<()> {
        self.set(PropertyKey::PointerPosition, i64::from(address).into())
    }

    /// Save the card's settings for `target` to non-volatile memory. Repeating
    /// the same save with no settings change in between is a no-op.
    pub fn save_settings(&mut self, target: SaveTarget) -> PlogicResult<()> {
        self.set(
            PropertyKey::SaveCardSettings,
            SaveSettings::Save(target).label().into(),
        )
    }

    /// Turn refresh mode on or off.
    pub fn set_refresh_mode(&mut self, refresh: bool) -> PlogicResult<()> {
        self.set(
            PropertyKey::RefreshPropertyValues,
            Toggle::from(refresh).label().into(),
        )
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    /// Whether reads bypass the cache.
    pub fn refresh_mode(&self) -> bool {
        self.refresh
    }

    /// Whether [`initialize`](Self::initialize) completed.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Whether the per-cell properties exist.
    pub fn advanced_enabled(&self) -> bool {
        self.advanced
    }

    /// Number of logic cells.
    pub fn num_cells(&self) -> u8 {
        self.num_cells
    }

    /// Bus address character.
    pub fn address(&self) -> char {
        self.link.address()
    }

    /// Pointer axis letter.
    pub fn axis(&self) -> char {
        self.axis
    }

    /// Cached pointer register.
    pub fn pointer(&self) -> &PointerRegister {
        &self.pointer
    }

    /// Declared property names, sorted.
    pub fn property_names(&self) -> Vec<String> {
        self.properties.names()
    }

    /// Descriptor of the property called `name`.
    pub fn descriptor(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties
            .key_for(name)
            .and_then(|key| self.properties.get(&key))
    }

    /// All declared properties.
    pub fn properties(&self) -> &PropertyTable {
        &self.properties
    }

    /// Borrow the transport.
    pub fn transport(&self) -> &T {
        self.link.transport()
    }

    /// Mutably borrow the transport.
    pub fn transport_mut(&mut self) -> &mut T {
        self.link.transport_mut()
    }
}

/// Cell count from the firmware build name. The only lenient decode: an
/// unusable suffix falls back to the default.
fn cell_count_from_build(build: &str) -> u8 {
    let parsed = parse_after_underscore(build)
        .ok()
        .and_then(|count| u8::try_from(count).ok())
        .filter(|count| (1..*PHYSICAL_IO_ADDRESSES.start()).contains(count));

    match parsed {
        Some(count) => count,
        None => {
            warn!(
                build,
                default = DEFAULT_NUM_CELLS,
                "could not detect cell count from firmware build; using default"
            );
            DEFAULT_NUM_CELLS
        }
    }
}

fn expect_integer(key: &PropertyKey, value: &PropertyValue) -> PlogicResult<i64> {
    value
        .as_integer()
        .ok_or_else(|| PlogicError::invalid_value(key.name(), value))
}

/// Pointer position a caller may move to: 1..=127.
fn pointer_target(key: &PropertyKey, value: &PropertyValue) -> PlogicResult<u8> {
    let address = pointer_reading(key, value)?;
    if address == 0 {
        return Err(PlogicError::invalid_value(key.name(), address));
    }
    Ok(address)
}

/// Pointer position as the card may report it: 0..=127.
fn pointer_reading(key: &PropertyKey, value: &PropertyValue) -> PlogicResult<u8> {
    let raw = expect_integer(key, value)?;
    u8::try_from(raw)
        .ok()
        .filter(|address| *address < NUM_ADDRESSES)
        .ok_or_else(|| PlogicError::invalid_value(key.name(), raw))
}

fn source_address(key: &PropertyKey, value: &PropertyValue) -> PlogicResult<SourceAddress> {
    let raw = expect_integer(key, value)?;
    SourceAddress::new(raw).ok_or_else(|| PlogicError::invalid_value(key.name(), raw))
}

fn parse_toggle(key: &PropertyKey, value: &PropertyValue) -> PlogicResult<Toggle> {
    value
        .as_text()
        .and_then(Toggle::from_label)
        .ok_or_else(|| PlogicError::invalid_value(key.name(), value))
}

/// Enumerated property value given either as its label or as its wire code.
fn parse_enum<E>(
    key: &PropertyKey,
    value: &PropertyValue,
    from_label: fn(&str) -> Option<E>,
    from_code: fn(i64) -> PlogicResult<E>,
) -> PlogicResult<E> {
    let parsed = match value {
        PropertyValue::Text(label) => from_label(label),
        PropertyValue::Integer(code) => from_code(*code).ok(),
    };
    parsed.ok_or_else(|| PlogicError::invalid_value(key.name(), value))
}
