use crate::{Index, ModuleKind};
use std::io;

/// Everything that can go wrong before or while talking to the bus.
///
/// A device that simply doesn't answer (timeout or bad CRC) is not an error: bus operations
/// report that as `Ok(None)` or `Ok(false)` and leave retrying to the caller.
#[derive(displaydoc::Display, Debug)]
pub enum Error {
    /// `{0}` is not a valid device ID
    InvalidDeviceId(u8),
    /// can't read with the broadcast ID
    BroadcastRead,
    /// `{0}` is not an attached ID
    NotAttached(u8),
    /// ID `{0}` already belongs to an attached driver
    IdInUse(u8),
    /// baud rate `{0}` is not in the range 3053..=12500000
    InvalidBaudRate(u32),
    /// the given list is empty
    EmptyInput,
    /// module ID `{module_id}` is out of range for {kind:?} modules
    InvalidModule { kind: ModuleKind, module_id: u8 },
    /// value doesn't match the wire format of {0:?}
    ValueShape(Index),
    /// {0:?} is read-only
    ReadOnly(Index),
    /// frame would be `{0}` bytes long, which doesn't fit in a package size byte
    FrameTooLong(usize),
    /// got an unknown index byte: `{0}`
    UnknownIndex(u8),
    /// payload ends in the middle of {0:?}
    Truncated(Index),
    /// got an unknown operation mode: `{0}`
    UnknownOperationMode(u8),
    /// unsupported hardware
    UnsupportedHardware,
    /// unsupported firmware
    UnsupportedFirmware,
    /// transport error: {0}
    Io(io::Error),
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}
