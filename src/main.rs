//! CLI Entry Point for rust_plogic
//!
//! Inspect and configure a programmable logic card on the serial bus.
//!
//! # Usage
//!
//! List the card-wide properties:
//! ```bash
//! plogic --config config/plogic.toml trigger list
//! ```
//!
//! Route front-panel BNC 1 from cell 3 and save everything:
//! ```bash
//! plogic trigger set SourceAddress_Frontpanel_1 3
//! plogic trigger save z
//! ```
//!
//! Try it without hardware:
//! ```bash
//! plogic --simulate trigger advanced
//! ```

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use rust_plogic::adapters::{SimulatedCard, Transport};
use rust_plogic::config::{AppConfig, BusConfig, DEFAULT_CONFIG_PATH};
use rust_plogic::hardware::codes::SaveTarget;
use rust_plogic::hardware::plogic::PlogicCard;
use rust_plogic::hardware::properties::{PropertyDescriptor, PropertyKind, PropertyValue};
use rust_plogic::logging::{self, TracingConfig};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "plogic")]
#[command(about = "Configure ASI programmable logic cards", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Talk to an in-memory simulated card instead of the serial port
    #[arg(long)]
    simulate: bool,

    /// Override the configured log level
    #[arg(long)]
    log_level: Option<String>,

    /// Card name from the configuration file
    card: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List properties and their values
    List,

    /// Read one property
    Get {
        /// Property name, e.g. TriggerSource or Cell_03_Type
        property: String,
    },

    /// Write one property
    Set {
        /// Property name
        property: String,
        /// New value: a label, or an integer
        value: String,
    },

    /// Create the per-cell and per-channel properties, then list everything
    Advanced,

    /// Save card settings to non-volatile memory
    Save {
        #[arg(value_enum)]
        target: SaveArg,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SaveArg {
    X,
    Y,
    Z,
}

impl From<SaveArg> for SaveTarget {
    fn from(arg: SaveArg) -> Self {
        match arg {
            SaveArg::X => SaveTarget::X,
            SaveArg::Y => SaveTarget::Y,
            SaveArg::Z => SaveTarget::Z,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load_from(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    config.validate()?;

    let mut tracing_config = TracingConfig::from_app_config(&config).map_err(|e| anyhow!(e))?;
    if let Some(level) = &cli.log_level {
        tracing_config.level = logging::parse_log_level(level).map_err(|e| anyhow!(e))?;
    }
    logging::init(tracing_config).map_err(|e| anyhow!(e))?;

    let card_config = config
        .card(&cli.card)
        .ok_or_else(|| anyhow!("No card named '{}' in configuration", cli.card))?;
    let address = card_config
        .address_char()
        .ok_or_else(|| anyhow!("Card '{}' has an invalid address", cli.card))?;
    let axis = card_config
        .axis_char()
        .ok_or_else(|| anyhow!("Card '{}' has an invalid axis", cli.card))?;

    let transport: Box<dyn Transport> = if cli.simulate {
        info!(address = %address, axis = %axis, "using simulated card");
        Box::new(SimulatedCard::new(address, axis))
    } else {
        open_bus(&config.bus)?
    };

    let mut card = PlogicCard::new(transport, address, axis, card_config.options());
    card.initialize()
        .with_context(|| format!("Failed to initialize card '{}'", cli.card))?;

    match cli.command {
        Commands::List => print_properties(&card),
        Commands::Get { property } => {
            ensure_declared(&mut card, &property)?;
            println!("{}", card.get_property(&property)?);
        }
        Commands::Set { property, value } => {
            ensure_declared(&mut card, &property)?;
            let value = card
                .descriptor(&property)
                .map(|descriptor| cli_value(descriptor, &value))
                .ok_or_else(|| anyhow!("Unknown property '{}'", property))?;
            card.set_property(&property, value)?;
            println!("{} = {}", property, card.get_property(&property)?);
        }
        Commands::Advanced => {
            card.enable_advanced_properties()?;
            print_properties(&card);
        }
        Commands::Save { target } => {
            card.save_settings(target.into())?;
            println!("Settings saved");
        }
    }

    Ok(())
}

#[cfg(feature = "instrument_serial")]
fn open_bus(bus: &BusConfig) -> Result<Box<dyn Transport>> {
    use rust_plogic::adapters::SerialTransportBuilder;

    let mut transport = SerialTransportBuilder::new(bus.port.clone(), bus.baud_rate)
        .with_timeout(bus.timeout())
        .with_line_terminator(bus.line_terminator.clone())
        .open()
        .with_context(|| format!("Failed to open serial port {}", bus.port))?;
    // Stale bytes from an earlier session would be taken for the first reply
    transport.clear_input()?;
    info!(transport = %transport.info(), "serial bus opened");
    Ok(Box::new(transport))
}

#[cfg(not(feature = "instrument_serial"))]
fn open_bus(bus: &BusConfig) -> Result<Box<dyn Transport>> {
    bail!(
        "Built without serial support; cannot open {}. Use --simulate.",
        bus.port
    )
}

/// Cell and I/O properties only exist once advanced properties are on.
fn ensure_declared<T: Transport>(card: &mut PlogicCard<T>, property: &str) -> Result<()> {
    if card.descriptor(property).is_none() && !card.advanced_enabled() {
        card.enable_advanced_properties()?;
    }
    if card.descriptor(property).is_none() {
        bail!("Unknown property '{}'", property);
    }
    Ok(())
}

/// Interpret a command-line value according to the property it targets.
fn cli_value(descriptor: &PropertyDescriptor, raw: &str) -> PropertyValue {
    match descriptor.kind {
        PropertyKind::Text if descriptor.allowed.iter().any(|label| label == raw) => raw.into(),
        _ => match raw.trim().parse::<i64>() {
            Ok(number) => number.into(),
            Err(_) => raw.into(),
        },
    }
}

fn print_properties<T: Transport>(card: &PlogicCard<T>) {
    for descriptor in card.properties().iter() {
        let access = if descriptor.read_only { " (read-only)" } else { "" };
        println!("{:<32} {}{}", descriptor.name(), descriptor.value, access);
        if !descriptor.allowed.is_empty() {
            println!("{:<32}   allowed: {}", "", descriptor.allowed.join(" | "));
        }
    }
}
