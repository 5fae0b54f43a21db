use crate::crc;
use crate::packet::{self, Command, Frame, BARE_FRAME_SIZE};
use crate::registers::BROADCAST_ID;
use crate::{Error, Index, RegisterTable, Transport, Value};
use log::{debug, info, trace, warn};
use std::fmt::{self, Display, Formatter};
use std::mem;
use std::thread::sleep;
use std::time::Duration;

pub const MIN_BAUD_RATE: u32 = 3053;
pub const MAX_BAUD_RATE: u32 = 12_500_000;
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// The reply to a module scan: a bare header, an 8 byte bitmask and the CRC.
const MODULE_SCAN_REPLY_SIZE: usize = BARE_FRAME_SIZE + 8;

/// Timeouts and fixed delays used by the master.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Timing {
    /// How long to wait for an acknowledgment.
    pub read_timeout: Duration,
    /// How long to wait for each ping while scanning the bus. This is shorter than
    /// `read_timeout` so that a scan of all 255 IDs finishes in reasonable time.
    pub scan_timeout: Duration,
    /// Pause between the two module scan requests. Drivers need the first one to wake their
    /// peripheral ports up.
    pub module_scan_warmup: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_millis(100),
            scan_timeout: Duration::from_millis(25),
            module_scan_warmup: Duration::from_secs(2),
        }
    }
}

/// Time for about 30 bit periods: enough for the driver to turn the line around, plus margin.
pub fn settle_delay(baud_rate: u32) -> Duration {
    Duration::from_secs_f64(10.0 / f64::from(baud_rate) * 3.0)
}

fn check_baud_rate(baud_rate: u32) -> Result<(), Error> {
    if (MIN_BAUD_RATE..=MAX_BAUD_RATE).contains(&baud_rate) {
        Ok(())
    } else {
        Err(Error::InvalidBaudRate(baud_rate))
    }
}

/// A `major.minor.patch` version, as reported by the driver.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Version {
    pub major: u8,
    pub minor: u8,
    pub patch: u8,
}

impl From<u32> for Version {
    /// The driver packs versions as `0x00MMmmpp`; the top byte isn't part of the version.
    fn from(raw: u32) -> Self {
        let [patch, minor, major, _] = raw.to_le_bytes();
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl Display for Version {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "v{}.{}.{}", self.major, self.minor, self.patch)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct DriverInfo {
    pub hardware_version: Version,
    pub software_version: Version,
}

/// The single master on an SMD bus.
///
/// It keeps a mirror of the registers of every device it knows about, indexed by device ID.
/// Slots that nothing is attached to hold a sentinel mirror whose ID is the broadcast ID, so any
/// request for them is refused before it reaches the bus.
///
/// Every method that sends a frame sleeps for the settle delay afterwards, and methods that expect
/// a reply then block for up to the read timeout. A driver that doesn't answer, or answers with a
/// bad CRC, gives `Ok(None)` or `Ok(false)`: nothing is retried.
pub struct Master<T: Transport> {
    transport: T,
    baud_rate: u32,
    settle_delay: Duration,
    timing: Timing,
    devices: Vec<RegisterTable>,
    attached: Vec<u8>,
}

#[cfg(feature = "serialport")]
impl Master<Box<dyn serialport::SerialPort>> {
    /// Opens the named serial port and uses it as the bus.
    pub fn open(port_name: &str, baud_rate: u32) -> Result<Self, Error> {
        check_baud_rate(baud_rate)?;
        let timing = Timing::default();
        let port = serialport::new(port_name, baud_rate)
            .timeout(timing.read_timeout)
            .open()
            .map_err(std::io::Error::from)?;
        Self::with_timing(port, baud_rate, timing)
    }
}

impl<T: Transport> Master<T> {
    /// Creates a master on a transport that is already running at `baud_rate`.
    pub fn new(transport: T, baud_rate: u32) -> Result<Self, Error> {
        Self::with_timing(transport, baud_rate, Timing::default())
    }

    pub fn with_timing(mut transport: T, baud_rate: u32, timing: Timing) -> Result<Self, Error> {
        check_baud_rate(baud_rate)?;
        transport.set_timeout(timing.read_timeout)?;
        Ok(Self {
            transport,
            baud_rate,
            settle_delay: settle_delay(baud_rate),
            timing,
            devices: (0..=u8::MAX).map(|_| RegisterTable::sentinel()).collect(),
            attached: vec![],
        })
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    pub fn settle_delay(&self) -> Duration {
        self.settle_delay
    }

    /// IDs found by the last [`scan`](Self::scan).
    pub fn attached(&self) -> &[u8] {
        &self.attached
    }

    /// The master's mirror of the given device.
    pub fn mirror(&self, id: u8) -> &RegisterTable {
        &self.devices[usize::from(id)]
    }

    pub fn is_attached(&self, id: u8) -> bool {
        self.mirror(id).device_id() == id
    }

    /// Makes a device accessible through the master, in the slot named by its `DeviceId`.
    pub fn attach(&mut self, mirror: RegisterTable) {
        let id = mirror.device_id();
        self.devices[usize::from(id)] = mirror;
    }

    pub fn detach(&mut self, id: u8) {
        self.devices[usize::from(id)] = RegisterTable::sentinel();
    }

    fn check_attached(&self, id: u8) -> Result<(), Error> {
        if self.is_attached(id) {
            Ok(())
        } else {
            Err(Error::NotAttached(id))
        }
    }

    fn mirror_mut(&mut self, id: u8) -> &mut RegisterTable {
        &mut self.devices[usize::from(id)]
    }

    fn values(&self, id: u8, indices: impl IntoIterator<Item = Index>) -> Vec<Value> {
        let mirror = self.mirror(id);
        indices
            .into_iter()
            .map(|index| mirror.get(index).clone())
            .collect()
    }

    /// Puts a frame on the bus and waits for the line to settle. Stale input, such as a late reply
    /// to an earlier request, is dropped first.
    fn send(&mut self, frame: &Frame) -> Result<(), Error> {
        self.transport.clear_input()?;
        trace!("Sending {:02x?}", frame.as_bytes());
        self.transport.write_all(frame.as_bytes())?;
        sleep(self.settle_delay);
        Ok(())
    }

    /// Reads an acknowledgment of exactly `size` bytes from device `id`, and stores any values it
    /// carries in that device's mirror. A reply from any other device doesn't count.
    fn read_ack(&mut self, id: u8, size: usize) -> Result<bool, Error> {
        let reply = self.transport.read_up_to(size)?;
        if reply.len() != size {
            debug!(
                "Expected a {} byte acknowledgment but got {} bytes",
                size,
                reply.len()
            );
            return Ok(false);
        }
        if !crc::is_valid(&reply) {
            debug!("CRC mismatch in acknowledgment {:02x?}", reply);
            return Ok(false);
        }
        trace!("Received {:02x?}", reply);

        let sender = packet::device_id(&reply);
        if sender != Some(id) {
            debug!("Expected acknowledgment from {} but got one from {:?}", id, sender);
            return Ok(false);
        }
        if packet::package_size(&reply)
            .map_or(false, |package_size| usize::from(package_size) > BARE_FRAME_SIZE)
        {
            packet::decode(self.mirror_mut(id), &reply)?;
        }
        Ok(true)
    }

    /// Sends a header-only command to an attached device.
    fn send_command(&mut self, id: u8, command: Command) -> Result<Frame, Error> {
        self.check_attached(id)?;
        let frame = packet::encode_command(self.mirror_mut(id), command)?;
        self.send(&frame)?;
        Ok(frame)
    }

    /// Writes the given registers.
    ///
    /// With `ack`, waits for the driver to echo the write and returns the values now in the
    /// mirror, or `None` if no valid echo arrived. Without `ack`, or when writing to the
    /// broadcast ID, always returns `None`.
    pub fn set_variables(
        &mut self,
        id: u8,
        pairs: &[(Index, Value)],
        ack: bool,
    ) -> Result<Option<Vec<Value>>, Error> {
        self.check_attached(id)?;
        if pairs.is_empty() {
            return Err(Error::EmptyInput);
        }
        let ack = ack && id != BROADCAST_ID;

        let frame = packet::encode_write(self.mirror_mut(id), pairs, ack)?;
        self.send(&frame)?;

        if ack && self.read_ack(id, frame.ack_size())? {
            Ok(Some(self.values(id, pairs.iter().map(|(index, _)| *index))))
        } else {
            Ok(None)
        }
    }

    /// Reads the given registers, returning their values in the order requested, or `None` if
    /// the driver didn't give a valid reply.
    pub fn get_variables(&mut self, id: u8, indices: &[Index]) -> Result<Option<Vec<Value>>, Error> {
        if id == BROADCAST_ID {
            return Err(Error::BroadcastRead);
        }
        self.check_attached(id)?;
        if indices.is_empty() {
            return Err(Error::EmptyInput);
        }

        let frame = packet::encode_read(self.mirror_mut(id), indices)?;
        self.send(&frame)?;

        if self.read_ack(id, frame.ack_size())? {
            Ok(Some(self.values(id, indices.iter().copied())))
        } else {
            Ok(None)
        }
    }

    /// Writes one register on several drivers with a single broadcast frame. Nobody answers.
    pub fn set_variables_sync(&mut self, index: Index, pairs: &[(u8, Value)]) -> Result<(), Error> {
        if pairs.is_empty() {
            return Err(Error::EmptyInput);
        }
        let frame = packet::encode_sync_write(index, pairs)?;
        self.send(&frame)
    }

    pub(crate) fn get_one<V>(
        &mut self,
        id: u8,
        index: Index,
        convert: impl FnOnce(&Value) -> Option<V>,
    ) -> Result<Option<V>, Error> {
        match self.get_variables(id, &[index])? {
            Some(values) => values
                .first()
                .and_then(convert)
                .map(Some)
                .ok_or(Error::ValueShape(index)),
            None => Ok(None),
        }
    }

    /// Writes registers without an acknowledgment, then gives the driver another settle delay to
    /// apply them.
    pub(crate) fn set_many(&mut self, id: u8, pairs: &[(Index, Value)]) -> Result<(), Error> {
        self.set_variables(id, pairs, false)?;
        sleep(self.settle_delay);
        Ok(())
    }

    pub(crate) fn set_one(&mut self, id: u8, index: Index, value: Value) -> Result<(), Error> {
        self.set_many(id, &[(index, value)])
    }

    /// Pings every ID from 0 to 254 and keeps attached the ones that answer.
    ///
    /// This takes a while: each ID that doesn't answer costs a full scan timeout. If the transport
    /// fails part way, the IDs found so far stay attached and the rest of the table is untouched.
    pub fn scan(&mut self) -> Result<Vec<u8>, Error> {
        self.transport.clear_input()?;
        self.transport.clear_output()?;
        self.transport.set_timeout(self.timing.scan_timeout)?;
        let result = self.probe_all();
        self.attached = (0..BROADCAST_ID)
            .filter(|&id| self.is_attached(id))
            .collect();
        self.transport.set_timeout(self.timing.read_timeout)?;
        result?;

        info!("Found {} drivers: {:?}", self.attached.len(), self.attached);
        Ok(self.attached.clone())
    }

    fn probe_all(&mut self) -> Result<(), Error> {
        for id in 0..BROADCAST_ID {
            self.attach(RegisterTable::new(id));
            let answered = self.ping(id);
            if !matches!(answered, Ok(true)) {
                self.detach(id);
            }
            answered?;
        }
        Ok(())
    }

    /// Returns whether the driver answered.
    pub fn ping(&mut self, id: u8) -> Result<bool, Error> {
        if id == BROADCAST_ID {
            return Err(Error::BroadcastRead);
        }
        let frame = self.send_command(id, Command::Ping)?;
        self.read_ack(id, frame.ack_size())
    }

    pub fn reboot(&mut self, id: u8) -> Result<(), Error> {
        self.send_command(id, Command::Reboot)?;
        Ok(())
    }

    /// Clears the driver's EEPROM configuration.
    pub fn factory_reset(&mut self, id: u8) -> Result<(), Error> {
        self.send_command(id, Command::HardReset)?;
        Ok(())
    }

    /// Saves the driver's configuration to its EEPROM.
    ///
    /// Returns `None` if no acknowledgment was requested, otherwise whether a valid one arrived.
    pub fn eeprom_write(&mut self, id: u8, ack: bool) -> Result<Option<bool>, Error> {
        let ack = ack && id != BROADCAST_ID;
        let command = if ack {
            Command::EepromWriteAck
        } else {
            Command::EepromWrite
        };
        let frame = self.send_command(id, command)?;
        if ack {
            Ok(Some(self.read_ack(id, frame.ack_size())?))
        } else {
            Ok(None)
        }
    }

    pub fn reset_encoder(&mut self, id: u8) -> Result<(), Error> {
        self.send_command(id, Command::ResetEncoder)?;
        Ok(())
    }

    /// Starts the driver's PID auto-tuning routine.
    pub fn pid_tuner(&mut self, id: u8) -> Result<(), Error> {
        self.send_command(id, Command::Tune)?;
        Ok(())
    }

    /// Puts the driver into its bootloader. Flashing happens outside this crate.
    pub fn enter_bootloader(&mut self, id: u8) -> Result<(), Error> {
        self.send_command(id, Command::BootloaderJump)?;
        Ok(())
    }

    /// Asks the driver which peripheral modules are plugged into it.
    ///
    /// The request is sent twice with [`Timing::module_scan_warmup`] in between, because drivers
    /// only report reliably on the second one.
    pub fn scan_modules(&mut self, id: u8) -> Result<Option<Vec<Index>>, Error> {
        if id == BROADCAST_ID {
            return Err(Error::BroadcastRead);
        }
        let frame = self.send_command(id, Command::ModuleScan)?;
        sleep(self.timing.module_scan_warmup);
        self.send(&frame)?;

        let reply = self.transport.read_up_to(MODULE_SCAN_REPLY_SIZE)?;
        if reply.len() != MODULE_SCAN_REPLY_SIZE
            || !crc::is_valid(&reply)
            || packet::device_id(&reply) != Some(id)
        {
            debug!("No valid module scan reply from {}: {:02x?}", id, reply);
            return Ok(None);
        }
        let mut mask = [0; 8];
        mask.copy_from_slice(packet::payload(&reply));
        Ok(Some(crate::modules::decode_module_mask(u64::from_le_bytes(
            mask,
        ))))
    }

    pub fn get_driver_info(&mut self, id: u8) -> Result<Option<DriverInfo>, Error> {
        let indices = [Index::HardwareVersion, Index::SoftwareVersion];
        let values = match self.get_variables(id, &indices)? {
            Some(values) => values,
            None => return Ok(None),
        };
        match (values[0].as_u32(), values[1].as_u32()) {
            (Some(hardware), Some(software)) => Ok(Some(DriverInfo {
                hardware_version: hardware.into(),
                software_version: software.into(),
            })),
            (None, _) => Err(Error::ValueShape(Index::HardwareVersion)),
            (_, None) => Err(Error::ValueShape(Index::SoftwareVersion)),
        }
    }

    /// Gives the driver a new ID, saves it and reboots the driver. The mirror moves to the new
    /// slot, which must not already hold another attached driver.
    pub fn update_driver_id(&mut self, id: u8, new_id: u8) -> Result<(), Error> {
        if id == BROADCAST_ID {
            return Err(Error::InvalidDeviceId(id));
        }
        if new_id == BROADCAST_ID {
            return Err(Error::InvalidDeviceId(new_id));
        }
        self.check_attached(id)?;
        if new_id != id && self.is_attached(new_id) {
            return Err(Error::IdInUse(new_id));
        }

        let frame = packet::encode_id_update(self.mirror_mut(id), new_id)?;
        self.send(&frame)?;

        let mut mirror = mem::take(self.mirror_mut(id));
        mirror.store(Index::DeviceId, new_id.into())?;
        self.attach(mirror);
        for attached in self.attached.iter_mut().filter(|attached| **attached == id) {
            *attached = new_id;
        }

        self.eeprom_write(new_id, false)?;
        self.reboot(new_id)
    }

    /// Changes the driver's baud rate, saves it and reboots the driver. Afterwards the master
    /// has to follow with [`update_master_baudrate`](Self::update_master_baudrate) before it
    /// can talk to the driver again.
    pub fn update_driver_baudrate(&mut self, id: u8, baud_rate: u32) -> Result<(), Error> {
        check_baud_rate(baud_rate)?;
        self.set_one(id, Index::Baudrate, baud_rate.into())?;
        self.eeprom_write(id, false)?;
        self.reboot(id)
    }

    pub fn get_driver_baudrate(&mut self, id: u8) -> Result<Option<u32>, Error> {
        self.get_one(id, Index::Baudrate, Value::as_u32)
    }

    /// Reconfigures the local end of the bus.
    pub fn update_master_baudrate(&mut self, baud_rate: u32) -> Result<(), Error> {
        check_baud_rate(baud_rate)?;
        self.transport.clear_input()?;
        self.transport.clear_output()?;
        self.transport.set_baud_rate(baud_rate)?;
        self.baud_rate = baud_rate;
        self.settle_delay = settle_delay(baud_rate);
        Ok(())
    }
}

impl<T: Transport> Drop for Master<T> {
    fn drop(&mut self) {
        if let Err(e) = self
            .transport
            .clear_input()
            .and_then(|()| self.transport.clear_output())
        {
            warn!("Failed to clear bus buffers: {}", e);
        }
    }
}
