mod common;

use common::{Fault, SimulatedBus};
use smd::packet::Command;
use smd::{
    settle_delay, Error, Index, Master, RegisterTable, Timing, Value, BROADCAST_ID,
    DEFAULT_BAUD_RATE, MAX_BAUD_RATE,
};
use std::time::Duration;
use test_case::test_case;

const TIMING: Timing = Timing {
    read_timeout: Duration::from_millis(100),
    scan_timeout: Duration::from_millis(25),
    module_scan_warmup: Duration::ZERO,
};

fn master(ids: &[u8]) -> Master<SimulatedBus> {
    Master::with_timing(SimulatedBus::new(ids), MAX_BAUD_RATE, TIMING).unwrap()
}

/// A master with mirrors already attached for the given drivers, as if a scan had found them.
fn attached(ids: &[u8]) -> Master<SimulatedBus> {
    let mut master = master(ids);
    for &id in ids {
        master.attach(RegisterTable::new(id));
    }
    master
}

#[test]
fn scan_finds_responding_drivers() {
    let mut master = master(&[3, 17, 254]);

    assert_eq!(master.scan().unwrap(), vec![3, 17, 254]);
    assert_eq!(master.attached(), &[3, 17, 254]);
    assert!(master.is_attached(3));
    assert!(master.is_attached(254));
    assert!(!master.is_attached(4));
    assert_eq!(master.mirror(4).device_id(), BROADCAST_ID);

    let bus = master.transport();
    assert_eq!(bus.written.len(), 255);
    assert!(bus
        .commands()
        .iter()
        .all(|&command| command == Command::Ping.to_byte()));
    assert_eq!(
        bus.timeouts,
        vec![
            TIMING.read_timeout,
            TIMING.scan_timeout,
            TIMING.read_timeout
        ]
    );
}

#[test]
fn scan_of_silent_bus() {
    let mut master = master(&[]);
    assert!(master.scan().unwrap().is_empty());
    assert!(master.attached().is_empty());
}

#[test]
fn invalid_baud_rate_on_creation() {
    assert!(matches!(
        Master::new(SimulatedBus::new(&[]), 3052),
        Err(Error::InvalidBaudRate(3052))
    ));
}

#[test]
fn get_variables_in_request_order() {
    let mut master = attached(&[3]);
    master
        .transport_mut()
        .set_register(3, Index::PresentPosition, 12.5f32.into());
    master
        .transport_mut()
        .set_register(3, Index::TorqueLimit, 800u16.into());

    let values = master
        .get_variables(3, &[Index::TorqueLimit, Index::PresentPosition])
        .unwrap()
        .unwrap();
    assert_eq!(values, vec![Value::from(800u16), Value::from(12.5f32)]);
    assert_eq!(master.mirror(3).get(Index::PresentPosition).as_f32(), Some(12.5));
}

#[test]
fn get_variables_with_empty_list() {
    let mut master = attached(&[3]);
    assert!(matches!(
        master.get_variables(3, &[]),
        Err(Error::EmptyInput)
    ));
    assert!(master.transport().written.is_empty());
}

#[test]
fn get_variables_from_broadcast() {
    let mut master = attached(&[3]);
    assert!(matches!(
        master.get_variables(BROADCAST_ID, &[Index::PresentPosition]),
        Err(Error::BroadcastRead)
    ));
    assert!(master.transport().written.is_empty());
}

#[test]
fn unattached_driver() {
    let mut master = attached(&[3]);
    assert!(matches!(
        master.get_variables(5, &[Index::PresentPosition]),
        Err(Error::NotAttached(5))
    ));
    assert!(matches!(
        master.set_variables(5, &[(Index::SetPosition, 1.0f32.into())], false),
        Err(Error::NotAttached(5))
    ));
    assert!(matches!(master.reboot(5), Err(Error::NotAttached(5))));
    assert!(master.transport().written.is_empty());
}

#[test]
fn read_reply_too_long_for_a_frame() {
    let mut master = attached(&[3]);
    let indices = [Index::PresentPosition; 60];
    assert!(matches!(
        master.get_variables(3, &indices),
        Err(Error::FrameTooLong(310))
    ));
    assert!(master.transport().written.is_empty());
}

#[test_case(Fault::Truncate; "short reply")]
#[test_case(Fault::Corrupt; "bad crc")]
fn faulty_reply_is_no_answer(fault: Fault) {
    let mut master = attached(&[3]);
    master
        .transport_mut()
        .set_register(3, Index::PresentVelocity, 2.0f32.into());
    master.transport_mut().fault = fault;

    assert_eq!(
        master.get_variables(3, &[Index::PresentVelocity]).unwrap(),
        None
    );
    assert_eq!(master.mirror(3).get(Index::PresentVelocity).as_f32(), Some(0.0));
    assert!(!master.ping(3).unwrap());
}

#[test]
fn set_variables_with_ack() {
    let mut master = attached(&[3]);
    let values = master
        .set_variables(
            3,
            &[
                (Index::SetVelocity, 150.0f32.into()),
                (Index::VelocityLimit, 200u16.into()),
            ],
            true,
        )
        .unwrap();
    assert_eq!(
        values,
        Some(vec![Value::from(150.0f32), Value::from(200u16)])
    );

    let bus = master.transport();
    assert_eq!(bus.commands(), vec![Command::WriteAck.to_byte()]);
    assert_eq!(bus.driver(3).get(Index::SetVelocity).as_f32(), Some(150.0));
    assert_eq!(bus.driver(3).get(Index::VelocityLimit).as_u16(), Some(200));
}

#[test]
fn set_variables_without_ack() {
    let mut master = attached(&[3]);
    assert_eq!(
        master
            .set_variables(3, &[(Index::SetDutyCycle, (-40.0f32).into())], false)
            .unwrap(),
        None
    );
    let bus = master.transport();
    assert_eq!(bus.commands(), vec![Command::Write.to_byte()]);
    assert_eq!(bus.driver(3).get(Index::SetDutyCycle).as_f32(), Some(-40.0));
}

#[test]
fn broadcast_write_never_waits_for_ack() {
    let mut master = attached(&[3]);
    assert_eq!(
        master
            .set_variables(BROADCAST_ID, &[(Index::TorqueEnable, 0u8.into())], true)
            .unwrap(),
        None
    );
    assert_eq!(master.transport().commands(), vec![Command::Write.to_byte()]);
}

#[test]
fn set_variables_rejects_bad_values() {
    let mut master = attached(&[3]);
    assert!(matches!(
        master.set_variables(3, &[(Index::Header, 0u8.into())], false),
        Err(Error::ReadOnly(Index::Header))
    ));
    assert!(matches!(
        master.set_variables(3, &[(Index::SetPosition, 1u8.into())], false),
        Err(Error::ValueShape(Index::SetPosition))
    ));
    assert!(matches!(
        master.set_variables(3, &[], false),
        Err(Error::EmptyInput)
    ));
    assert!(master.transport().written.is_empty());
}

#[test]
fn sync_write_reaches_every_driver() {
    let mut master = attached(&[3, 17]);
    master
        .set_variables_sync(
            Index::SetPosition,
            &[(3, 100.0f32.into()), (17, (-100.0f32).into())],
        )
        .unwrap();

    let bus = master.transport();
    assert_eq!(bus.written.len(), 1);
    assert_eq!(bus.written[0][Index::DeviceId as usize], BROADCAST_ID);
    assert_eq!(bus.commands(), vec![Command::SyncWrite.to_byte()]);
    assert_eq!(bus.driver(3).get(Index::SetPosition).as_f32(), Some(100.0));
    assert_eq!(bus.driver(17).get(Index::SetPosition).as_f32(), Some(-100.0));
}

#[test]
fn empty_sync_write() {
    let mut master = attached(&[3]);
    assert!(matches!(
        master.set_variables_sync(Index::SetPosition, &[]),
        Err(Error::EmptyInput)
    ));
    assert!(master.transport().written.is_empty());
}

#[test]
fn driver_info() {
    let mut master = attached(&[3]);
    master
        .transport_mut()
        .set_register(3, Index::HardwareVersion, 0x0001_0000u32.into());
    master
        .transport_mut()
        .set_register(3, Index::SoftwareVersion, 0x0000_0302u32.into());

    let info = master.get_driver_info(3).unwrap().unwrap();
    assert_eq!(info.hardware_version.to_string(), "v1.0.0");
    assert_eq!(info.software_version.to_string(), "v0.3.2");
}

#[test]
fn eeprom_write_acknowledgment() {
    let mut master = attached(&[3]);
    assert_eq!(master.eeprom_write(3, true).unwrap(), Some(true));
    assert_eq!(master.eeprom_write(3, false).unwrap(), None);
    assert_eq!(
        master.transport().commands(),
        vec![
            Command::EepromWriteAck.to_byte(),
            Command::EepromWrite.to_byte()
        ]
    );
}

#[test]
fn header_only_commands() {
    let mut master = attached(&[3]);
    master.reboot(3).unwrap();
    master.factory_reset(3).unwrap();
    master.reset_encoder(3).unwrap();
    master.pid_tuner(3).unwrap();
    master.enter_bootloader(3).unwrap();

    let bus = master.transport();
    assert_eq!(
        bus.commands(),
        vec![
            Command::Reboot.to_byte(),
            Command::HardReset.to_byte(),
            Command::ResetEncoder.to_byte(),
            Command::Tune.to_byte(),
            Command::BootloaderJump.to_byte(),
        ]
    );
    assert!(bus.written.iter().all(|frame| frame.len() == 10));
}

#[test]
fn update_driver_id_moves_mirror() {
    let mut master = master(&[3]);
    master.scan().unwrap();
    master.transport_mut().written.clear();

    master.update_driver_id(3, 9).unwrap();

    assert!(!master.is_attached(3));
    assert!(master.is_attached(9));
    assert_eq!(master.attached(), &[9]);

    let bus = master.transport();
    assert_eq!(
        bus.commands(),
        vec![
            Command::Write.to_byte(),
            Command::EepromWrite.to_byte(),
            Command::Reboot.to_byte()
        ]
    );
    let addressed: Vec<u8> = bus
        .written
        .iter()
        .map(|frame| frame[Index::DeviceId as usize])
        .collect();
    assert_eq!(addressed, vec![3, 9, 9]);
    assert_eq!(bus.driver(9).device_id(), 9);
}

#[test]
fn update_driver_id_to_broadcast() {
    let mut master = attached(&[3]);
    assert!(matches!(
        master.update_driver_id(3, BROADCAST_ID),
        Err(Error::InvalidDeviceId(BROADCAST_ID))
    ));
    assert!(master.transport().written.is_empty());
}

#[test]
fn update_driver_baudrate() {
    let mut master = attached(&[3]);
    assert!(matches!(
        master.update_driver_baudrate(3, 12_500_001),
        Err(Error::InvalidBaudRate(12_500_001))
    ));
    assert!(master.transport().written.is_empty());

    master.update_driver_baudrate(3, 1_000_000).unwrap();
    let bus = master.transport();
    assert_eq!(
        bus.commands(),
        vec![
            Command::Write.to_byte(),
            Command::EepromWrite.to_byte(),
            Command::Reboot.to_byte()
        ]
    );
    assert_eq!(bus.driver(3).get(Index::Baudrate).as_u32(), Some(1_000_000));

    assert_eq!(master.get_driver_baudrate(3).unwrap(), Some(1_000_000));
}

#[test]
fn update_master_baudrate() {
    let mut master = attached(&[3]);
    assert!(matches!(
        master.update_master_baudrate(1200),
        Err(Error::InvalidBaudRate(1200))
    ));
    assert_eq!(master.transport().baud_rate, None);

    master.update_master_baudrate(DEFAULT_BAUD_RATE).unwrap();
    assert_eq!(master.transport().baud_rate, Some(DEFAULT_BAUD_RATE));
    assert_eq!(master.transport().output_clears, 1);
    assert_eq!(master.baud_rate(), DEFAULT_BAUD_RATE);
    assert_eq!(master.settle_delay(), settle_delay(DEFAULT_BAUD_RATE));
}

#[test]
fn scan_modules_decodes_mask() {
    let mut master = attached(&[3]);
    master
        .transport_mut()
        .set_module_mask(3, 1 << 1 | 1 << 27 | 1 << 41);

    assert_eq!(
        master.scan_modules(3).unwrap(),
        Some(vec![Index::Button1, Index::Qtr2, Index::Rgb1])
    );
    assert_eq!(
        master.transport().commands(),
        vec![Command::ModuleScan.to_byte(); 2]
    );
}

#[test]
fn scan_modules_without_reply() {
    let mut master = attached(&[3]);
    master.transport_mut().fault = Fault::Truncate;
    assert_eq!(master.scan_modules(3).unwrap(), None);
    assert!(matches!(
        master.scan_modules(BROADCAST_ID),
        Err(Error::BroadcastRead)
    ));
}

#[test]
fn drop_clears_buffers() {
    let mut bus = SimulatedBus::new(&[3]);
    {
        let mut master = Master::with_timing(&mut bus, MAX_BAUD_RATE, TIMING).unwrap();
        master.attach(RegisterTable::new(3));
        assert!(master.ping(3).unwrap());
    }
    assert_eq!(bus.output_clears, 1);
    assert_eq!(bus.input_clears, 2);
}

#[test_case(Index::DeviceId, 9u8.into())]
#[test_case(Index::Status, 1u8.into())]
#[test_case(Index::PackageSize, 10u8.into())]
#[test_case(Index::CrcValue, 0u32.into())]
fn framing_registers_are_not_writable(index: Index, value: Value) {
    let mut master = attached(&[3]);
    assert!(matches!(
        master.set_variables(3, &[(index, value)], false),
        Err(Error::ReadOnly(i)) if i == index
    ));
    assert!(master.transport().written.is_empty());
    assert!(master.is_attached(3));
    assert_eq!(master.mirror(3).device_id(), 3);
    assert_eq!(master.transport().driver(3).device_id(), 3);
}

#[test]
fn reply_from_another_driver_is_no_answer() {
    let mut master = attached(&[3]);
    master
        .transport_mut()
        .set_register(3, Index::PresentPosition, 5.0f32.into());
    master.transport_mut().reply_as = Some(9);

    assert_eq!(
        master
            .get_variables(3, &[Index::DeviceId, Index::PresentPosition])
            .unwrap(),
        None
    );
    assert_eq!(master.mirror(3).get(Index::PresentPosition).as_f32(), Some(0.0));
    assert!(!master.is_attached(9));
    assert_eq!(master.mirror(9).device_id(), BROADCAST_ID);
    assert!(!master.ping(3).unwrap());
}

#[test]
fn scan_interrupted_by_transport_error() {
    let mut master = master(&[3, 17]);
    master.transport_mut().unplugged_at = Some(10);

    assert!(matches!(master.scan(), Err(Error::Io(_))));
    assert!(master.is_attached(3));
    assert!(!master.is_attached(10));
    assert_eq!(master.mirror(10).device_id(), BROADCAST_ID);
    assert!(!master.is_attached(17));
    assert_eq!(master.attached(), &[3]);
    assert_eq!(master.transport().timeouts.last(), Some(&TIMING.read_timeout));
}

#[test]
fn update_driver_id_onto_attached_driver() {
    let mut master = attached(&[3, 9]);
    assert!(matches!(
        master.update_driver_id(3, 9),
        Err(Error::IdInUse(9))
    ));
    assert!(master.transport().written.is_empty());
    assert!(master.is_attached(3));
    assert!(master.is_attached(9));
}

#[test]
fn module_scan_reply_from_another_driver() {
    let mut master = attached(&[3]);
    master.transport_mut().set_module_mask(3, 1 << 1);
    master.transport_mut().reply_as = Some(4);
    assert_eq!(master.scan_modules(3).unwrap(), None);
}
