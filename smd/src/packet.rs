use crate::crc::{crc32, CRC_SIZE};
use crate::registers::{BROADCAST_ID, HEADER_SIZE};
use crate::{Error, Index, RegisterTable, Value};
use arrayvec::ArrayVec;
use log::trace;

/// `PackageSize` is a single byte, so no frame can be longer than this.
pub const MAX_FRAME_SIZE: usize = 255;

/// Length of a frame with no payload.
pub const BARE_FRAME_SIZE: usize = HEADER_SIZE + CRC_SIZE;

/// Opcodes for the `Command` header field.
#[repr(u8)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Command {
    Ping = 0x00,
    Read = 0x01,
    Write = 0x02,
    EepromWrite = 0x03,
    Tune = 0x04,
    ResetEncoder = 0x05,
    ModuleScan = 0x06,
    Reboot = 0x10,
    BootloaderJump = 0x12,
    HardReset = 0x20,
    SyncWrite = 0x40 | 0x02,
    WriteAck = 0x80 | 0x02,
    EepromWriteAck = 0x80 | 0x03,
}

impl Command {
    pub fn to_byte(self) -> u8 {
        self as u8
    }

    /// Size of the reply to a header-only command, or 0 if the driver doesn't send one.
    fn bare_ack_size(self) -> usize {
        match self {
            Self::Ping
            | Self::EepromWrite
            | Self::EepromWriteAck
            | Self::ResetEncoder
            | Self::ModuleScan => BARE_FRAME_SIZE,
            _ => 0,
        }
    }
}

/// A sealed frame ready to go on the wire, together with the size of the reply it solicits.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Frame {
    bytes: ArrayVec<u8, MAX_FRAME_SIZE>,
    ack_size: usize,
}

impl Frame {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Number of bytes the driver will answer with, or 0 if no answer is expected.
    pub fn ack_size(&self) -> usize {
        self.ack_size
    }
}

/// Fills in the `Command`, `PackageSize` and `CrcValue` registers of `table` and builds the frame
/// around `payload`.
fn seal(
    table: &mut RegisterTable,
    command: Command,
    payload: &[u8],
    ack_size: usize,
) -> Result<Frame, Error> {
    let total = HEADER_SIZE + payload.len() + CRC_SIZE;
    if total > MAX_FRAME_SIZE {
        return Err(Error::FrameTooLong(total));
    }
    table.store(Index::Command, command.to_byte().into())?;
    table.store(Index::PackageSize, (total as u8).into())?;

    let mut bytes = ArrayVec::new();
    bytes
        .try_extend_from_slice(&table.header_bytes())
        .and_then(|()| bytes.try_extend_from_slice(payload))
        .map_err(|_| Error::FrameTooLong(total))?;
    let crc = crc32(&bytes);
    table.store(Index::CrcValue, crc.into())?;
    bytes
        .try_extend_from_slice(&crc.to_le_bytes())
        .map_err(|_| Error::FrameTooLong(total))?;

    trace!("Encoded {:?} frame {:02x?}", command, &bytes[..]);
    Ok(Frame { bytes, ack_size })
}

/// Encodes a command that carries no payload, such as a ping or reboot.
pub fn encode_command(table: &mut RegisterTable, command: Command) -> Result<Frame, Error> {
    seal(table, command, &[], command.bare_ack_size())
}

/// Stores `pairs` in `table` and encodes a frame writing them to the driver.
///
/// Every value is checked against its register before anything is stored, so on error the table
/// is left untouched.
pub fn encode_write(
    table: &mut RegisterTable,
    pairs: &[(Index, Value)],
    ack: bool,
) -> Result<Frame, Error> {
    let mut total = BARE_FRAME_SIZE;
    for (index, value) in pairs {
        let variable = table.variable(*index);
        variable.check(value)?;
        total += 1 + variable.size();
    }
    if total > MAX_FRAME_SIZE {
        return Err(Error::FrameTooLong(total));
    }

    let mut payload = Vec::with_capacity(total - BARE_FRAME_SIZE);
    for (index, value) in pairs {
        table.set(*index, value.clone())?;
        payload.push(index.to_byte());
        table.get(*index).extend_le_bytes(&mut payload);
    }

    if ack {
        seal(table, Command::WriteAck, &payload, total)
    } else {
        seal(table, Command::Write, &payload, 0)
    }
}

/// Encodes a request for the given registers. The reply echoes each index followed by its value.
pub fn encode_read(table: &mut RegisterTable, indices: &[Index]) -> Result<Frame, Error> {
    let ack_size = BARE_FRAME_SIZE
        + indices
            .iter()
            .map(|index| 1 + table.variable(*index).size())
            .sum::<usize>();
    if ack_size > MAX_FRAME_SIZE {
        return Err(Error::FrameTooLong(ack_size));
    }
    let payload: Vec<u8> = indices.iter().map(|index| index.to_byte()).collect();
    seal(table, Command::Read, &payload, ack_size)
}

/// Encodes a write of a new device ID. The frame is still addressed to the current ID, and the
/// mirror's `DeviceId` register is left alone.
pub fn encode_id_update(table: &mut RegisterTable, new_id: u8) -> Result<Frame, Error> {
    seal(table, Command::Write, &[Index::DeviceId.to_byte(), new_id], 0)
}

/// Encodes one broadcast frame writing the same register on several drivers at once.
pub fn encode_sync_write(index: Index, pairs: &[(u8, Value)]) -> Result<Frame, Error> {
    let mut table = RegisterTable::new(BROADCAST_ID);
    let variable = table.variable(index);
    let mut payload = vec![index.to_byte()];
    for (id, value) in pairs {
        variable.check(value)?;
        payload.push(*id);
        value.extend_le_bytes(&mut payload);
    }
    seal(&mut table, Command::SyncWrite, &payload, 0)
}

/// The `DeviceId` field of a received frame.
pub fn device_id(frame: &[u8]) -> Option<u8> {
    frame.get(Index::DeviceId as usize).copied()
}

/// The `PackageSize` field of a received frame.
pub fn package_size(frame: &[u8]) -> Option<u8> {
    frame.get(Index::PackageSize as usize).copied()
}

/// The bytes between the header and the CRC trailer.
pub fn payload(frame: &[u8]) -> &[u8] {
    if frame.len() < BARE_FRAME_SIZE {
        return &[];
    }
    &frame[HEADER_SIZE..frame.len() - CRC_SIZE]
}

/// Splits a payload of `index, value, index, value, ...` into its parts.
///
/// A payload that ends part way through a value, or names an index that doesn't exist, is a
/// framing error.
pub fn parse_payload(mut payload: &[u8]) -> Result<Vec<(Index, Value)>, Error> {
    let mut pairs = vec![];
    while let Some((&byte, rest)) = payload.split_first() {
        let index = Index::from_byte(byte).ok_or(Error::UnknownIndex(byte))?;
        let format = index.wire_format();
        let value = format.read(rest).ok_or(Error::Truncated(index))?;
        pairs.push((index, value));
        payload = &rest[format.size()..];
    }
    Ok(pairs)
}

/// Stores every value carried by a CRC-checked reply into `table`. Nothing is stored if the
/// payload is malformed.
pub fn decode(table: &mut RegisterTable, frame: &[u8]) -> Result<(), Error> {
    for (index, value) in parse_payload(payload(frame))? {
        table.store(index, value)?;
    }
    Ok(())
}
