//! Integration tests for the logic card driver
//!
//! Drives [`PlogicCard`] end to end against [`SimulatedCard`], checking both
//! the values seen through the property façade and the exact bus traffic.
//!
//! ## Test Coverage
//!
//! 1. **Pointer cache**: repeated access to one cell moves the pointer once
//! 2. **Round trips**: cell types, inputs and I/O routing read back as written
//! 3. **Cell count**: firmware build suffix, with fallback to 16
//! 4. **Save settings**: idempotent per target, Y uses its own wire code
//! 5. **Trigger source**: out-of-range hardware codes are rejected
//! 6. **Advanced properties**: one-way, all-or-nothing
//! 7. **Caching and refresh mode**: reads skip the bus unless refresh is on

use rust_plogic::adapters::mock_adapter::Registers;
use rust_plogic::adapters::{SimulatedCard, Transport};
use rust_plogic::hardware::codes::{
    CellType, SaveTarget, Signal, SourceAddress, TriggerSource, INVERT_ADDRESS,
};
use rust_plogic::hardware::pointer::{Move, PointerState};
use rust_plogic::hardware::properties::{InputSelector, PropertyValue};
use rust_plogic::hardware::{CardOptions, PlogicCard};
use rust_plogic::PlogicError;
use std::time::Duration;
use tracing_test::traced_test;

fn fast_options() -> CardOptions {
    CardOptions {
        save_settle: Duration::ZERO,
        refresh_properties: false,
    }
}

/// Initialized card with advanced properties on and an empty command log.
fn advanced_card(sim: SimulatedCard) -> PlogicCard<SimulatedCard> {
    let mut card = PlogicCard::new(sim, '2', 'E', fast_options());
    card.initialize().unwrap();
    card.enable_advanced_properties().unwrap();
    card.transport_mut().clear_command_log();
    card
}

fn sim() -> SimulatedCard {
    SimulatedCard::new('2', 'E')
}

#[test]
fn test_repeated_access_to_one_cell_moves_pointer_once() {
    let mut card = advanced_card(sim());

    card.set_cell_config(7, 1).unwrap();
    card.set_cell_config(7, 2).unwrap();
    card.set_cell_input(7, InputSelector::X, SourceAddress::new(33).unwrap())
        .unwrap();

    let moves: Vec<String> = card
        .transport()
        .command_log()
        .into_iter()
        .filter(|command| command.starts_with("M "))
        .collect();
    assert_eq!(moves, vec!["M E=7"]);
    assert_eq!(card.pointer().state(), PointerState::PositionedAt(7));
}

#[test]
fn test_pointer_move_is_idempotent_at_register_level() {
    use rust_plogic::hardware::pointer::PointerRegister;
    use rust_plogic::hardware::protocol::CardLink;

    let mut link = CardLink::new(sim(), '2');
    let mut pointer = PointerRegister::new('E');

    assert_eq!(pointer.move_to(&mut link, 12).unwrap(), Move::Moved);
    assert_eq!(pointer.move_to(&mut link, 12).unwrap(), Move::CacheHit);
    assert_eq!(link.transport().command_log().len(), 1);
}

#[test]
fn test_cell_type_round_trip() {
    let mut card = advanced_card(sim());

    card.set_cell_type(9, CellType::Lut3).unwrap();
    assert_eq!(card.transport().registers(9).cell_type, 3);

    card.set_refresh_mode(true).unwrap();
    assert_eq!(card.cell_type(9).unwrap(), CellType::Lut3);
    assert_eq!(
        card.get_property("Cell_09_Type").unwrap(),
        PropertyValue::Text("3 - 3-input LUT".into())
    );
}

#[test]
fn test_cell_type_written_by_code() {
    let mut card = advanced_card(sim());
    card.set_property("Cell_01_Type", 3i64).unwrap();
    assert_eq!(card.cell_type(1).unwrap(), CellType::Lut3);

    assert!(matches!(
        card.set_property("Cell_01_Type", 10i64),
        Err(PlogicError::InvalidValue { .. })
    ));
}

#[test]
fn test_invert_convention_for_every_source() {
    for k in 1..INVERT_ADDRESS {
        let inverted = SourceAddress::new(i64::from(INVERT_ADDRESS + k)).unwrap();
        assert_eq!(inverted.decode(), Signal::invert(k));
        assert_eq!(SourceAddress::encode(Signal::invert(k)), Some(inverted));
    }
}

#[test]
fn test_inverted_input_round_trip_through_card() {
    let mut card = advanced_card(sim());
    let source = SourceAddress::encode(Signal::invert(5)).unwrap();

    card.set_cell_input(4, InputSelector::F, source).unwrap();
    assert_eq!(card.transport().registers(4).input_f, 69);

    card.set_refresh_mode(true).unwrap();
    let read = card.cell_input(4, InputSelector::F).unwrap();
    assert_eq!(read.decode(), Signal::invert(5));
}

#[test]
fn test_cell_count_from_firmware_build() {
    let mut card = PlogicCard::new(
        sim().with_build_name("TIGER_PLOGIC_build_24"),
        '2',
        'E',
        fast_options(),
    );
    card.initialize().unwrap();
    assert_eq!(card.num_cells(), 24);
    assert_eq!(
        card.get_property("NumLogicCells").unwrap(),
        PropertyValue::Integer(24)
    );

    card.enable_advanced_properties().unwrap();
    assert!(card.descriptor("Cell_24_InputF").is_some());
    assert!(card.descriptor("Cell_25_Type").is_none());
}

#[test]
#[traced_test]
fn test_cell_count_falls_back_to_sixteen() {
    let mut card = PlogicCard::new(
        sim().with_build_name("TIGER_PLOGIC"),
        '2',
        'E',
        fast_options(),
    );
    card.initialize().unwrap();
    assert_eq!(card.num_cells(), 16);
    assert!(logs_contain("using default"));
}

#[test]
fn test_save_settings_issued_once_per_target() {
    let mut card = advanced_card(sim());

    card.save_settings(SaveTarget::Z).unwrap();
    card.set_property("SaveCardSettings", "Z - save settings to card (complete)")
        .unwrap();

    assert_eq!(card.transport().saves(), &['Z']);
    assert_eq!(
        card.get_property("SaveCardSettings").unwrap(),
        PropertyValue::Text("save settings done".into())
    );
}

#[test]
fn test_save_settings_y_is_distinct_from_x() {
    let mut card = advanced_card(sim());

    card.save_settings(SaveTarget::X).unwrap();
    card.save_settings(SaveTarget::Y).unwrap();

    assert_eq!(card.transport().saves(), &['X', 'Y']);
}

#[test]
fn test_no_action_rearms_save() {
    let mut card = advanced_card(sim());

    card.save_settings(SaveTarget::X).unwrap();
    card.set_property("SaveCardSettings", "no action").unwrap();
    card.save_settings(SaveTarget::X).unwrap();

    assert_eq!(card.transport().saves(), &['X', 'X']);
}

#[test]
fn test_out_of_range_trigger_source_from_hardware() {
    let mut sim = sim();
    sim.set_trigger_code(9);
    let mut card = PlogicCard::new(sim, '2', 'E', fast_options());

    assert!(matches!(
        card.initialize(),
        Err(PlogicError::InvalidValue { .. })
    ));
    assert!(!card.is_initialized());
}

#[test]
fn test_trigger_source_round_trip() {
    let mut card = advanced_card(sim());

    card.set_trigger_source(TriggerSource::MicroMirrorCard).unwrap();
    assert_eq!(card.transport().command_log(), vec!["PM E=1"]);

    card.set_refresh_mode(true).unwrap();
    assert_eq!(card.trigger_source().unwrap(), TriggerSource::MicroMirrorCard);
}

#[test]
#[traced_test]
fn test_advanced_properties_stay_enabled() {
    let mut card = advanced_card(sim());
    let names = card.property_names();

    card.set_property("EnableAdvancedProperties", "No").unwrap();

    assert!(card.advanced_enabled());
    assert_eq!(card.property_names(), names);
    assert!(logs_contain("cannot be disabled"));
}

#[test]
fn test_disable_before_enable_is_a_no_op() {
    let mut card = PlogicCard::new(sim(), '2', 'E', fast_options());
    card.initialize().unwrap();
    card.transport_mut().clear_command_log();

    card.set_property("EnableAdvancedProperties", "No").unwrap();
    assert!(!card.advanced_enabled());
    assert!(card.transport().command_log().is_empty());
}

#[test]
fn test_materialization_failure_then_retry() {
    let mut card = PlogicCard::new(sim(), '2', 'E', fast_options());
    card.initialize().unwrap();
    let before = card.property_names();

    card.transport().fail_next();
    assert!(card.enable_advanced_properties().unwrap_err().is_transport());
    assert_eq!(card.property_names(), before);

    card.enable_advanced_properties().unwrap();
    assert!(card.advanced_enabled());
    assert!(card.property_names().len() > before.len());
}

#[test]
fn test_cached_reads_until_refresh_mode() {
    let mut sim = sim();
    sim.set_registers(
        6,
        Registers {
            cell_type: 6,
            ..Registers::default()
        },
    );
    let mut card = advanced_card(sim);

    // Change hardware behind the driver's back
    card.transport_mut().set_registers(
        6,
        Registers {
            cell_type: 7,
            ..Registers::default()
        },
    );

    assert_eq!(card.cell_type(6).unwrap(), CellType::Or2);
    assert!(card.transport().command_log().is_empty());

    card.set_refresh_mode(true).unwrap();
    assert_eq!(card.cell_type(6).unwrap(), CellType::Xor2);
    assert!(card.refresh_mode());
}

#[test]
fn test_refresh_mode_from_options() {
    let options = CardOptions {
        save_settle: Duration::ZERO,
        refresh_properties: true,
    };
    let mut card = PlogicCard::new(sim(), '2', 'E', options);
    card.initialize().unwrap();
    card.transport_mut().set_trigger_code(4);

    assert_eq!(card.trigger_source().unwrap(), TriggerSource::FrontpanelBnc1);
    assert_eq!(
        card.get_property("RefreshPropertyValues").unwrap(),
        PropertyValue::Text("Yes".into())
    );
}

#[test]
fn test_failed_refresh_keeps_last_good_value() {
    let mut card = advanced_card(sim());
    card.set_cell_config(2, 44).unwrap();
    card.set_refresh_mode(true).unwrap();

    card.transport().fail_next();
    assert!(card.cell_config(2).is_err());

    card.set_refresh_mode(false).unwrap();
    assert_eq!(card.cell_config(2).unwrap(), 44);
}

#[test]
fn test_output_routing_by_band() {
    let mut card = advanced_card(sim());

    card.set_io_source(33, SourceAddress::new(1).unwrap()).unwrap();
    card.set_io_source(48, SourceAddress::new(64 + 2).unwrap())
        .unwrap();

    assert_eq!(card.transport().registers(33).config, 1);
    assert_eq!(card.transport().registers(48).config, 66);
    assert_eq!(
        card.get_property("SourceAddress_Frontpanel_1").unwrap(),
        PropertyValue::Integer(1)
    );
    assert_eq!(
        card.get_property("SourceAddress_Backplane_7").unwrap(),
        PropertyValue::Integer(66)
    );
}

#[test]
fn test_output_states_hit_hardware_each_time() {
    let mut card = advanced_card(sim());

    card.transport_mut().set_outputs(1, 0, 0);
    assert_eq!(card.output_states().unwrap().cells, 1);
    card.transport_mut().set_outputs(2, 0, 0);
    assert_eq!(card.output_states().unwrap().cells, 2);
}

#[test]
fn test_other_cards_do_not_answer() {
    let mut card = PlogicCard::new(SimulatedCard::new('3', 'E'), '2', 'E', fast_options());
    let err = card.initialize().unwrap_err();
    assert!(err.is_transport());
}

#[test]
fn test_boxed_transport() {
    let transport: Box<dyn Transport> = Box::new(sim());
    let mut card = PlogicCard::new(transport, '2', 'E', fast_options());
    card.initialize().unwrap();
    assert_eq!(card.axis(), 'E');
    assert_eq!(card.address(), '2');
}

#[test]
fn test_refresh_mode_writes_follow_foreign_pointer_moves() {
    let mut card = advanced_card(sim());
    card.set_refresh_mode(true).unwrap();
    card.set_cell_config(3, 1).unwrap();

    card.transport_mut().set_pointer(11);
    card.set_cell_config(3, 2).unwrap();

    assert_eq!(card.transport().registers(3).config, 2);
    assert_eq!(card.transport().registers(11).config, 0);
}

#[test]
fn test_pointer_at_zero_after_power_up() {
    let mut sim = sim();
    sim.set_pointer(0);
    let mut card = PlogicCard::new(sim, '2', 'E', fast_options());
    card.initialize().unwrap();

    assert_eq!(card.pointer_position().unwrap(), 0);
    card.set_pointer_position(4).unwrap();
    assert_eq!(card.pointer_position().unwrap(), 4);
}
