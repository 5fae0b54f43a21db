use crate::index::INDEX_COUNT;
use crate::{Error, Index, Value, Variable};

/// The start-of-frame marker.
pub const HEADER: u8 = 0x55;
/// Product type reported by SMD Red drivers.
pub const PRODUCT_TYPE: u8 = 0xBA;
/// Address that reaches every device on the bus. Devices never answer it.
pub const BROADCAST_ID: u8 = 0xFF;

/// A mirror of every register on one driver, in wire order.
///
/// The layout of each register is fixed when the table is built; only values change afterwards.
#[derive(Clone, Debug, PartialEq)]
pub struct RegisterTable {
    variables: Vec<Variable>,
}

impl RegisterTable {
    /// Builds a table for the driver with the given ID, with every other register zeroed.
    pub fn new(device_id: u8) -> Self {
        let mut variables: Vec<Variable> = Index::ALL.iter().copied().map(Variable::new).collect();
        debug_assert_eq!(variables.len(), INDEX_COUNT);
        for (index, byte) in [
            (Index::Header, HEADER),
            (Index::DeviceId, device_id),
            (Index::DeviceFamily, PRODUCT_TYPE),
        ] {
            variables[index as usize] = Variable::preset_u8(index, byte);
        }
        Self { variables }
    }

    /// A table that stands in for an empty slot in the master's device table. Its ID is the
    /// broadcast ID, so it never matches a real request for any other slot.
    pub fn sentinel() -> Self {
        Self::new(BROADCAST_ID)
    }

    pub fn device_id(&self) -> u8 {
        self.variables[Index::DeviceId as usize]
            .get()
            .as_u8()
            .unwrap_or(BROADCAST_ID)
    }

    pub fn variable(&self, index: Index) -> &Variable {
        &self.variables[index as usize]
    }

    pub fn get(&self, index: Index) -> &Value {
        self.variable(index).get()
    }

    /// Writes a caller-supplied value, refusing read-only registers and mismatched shapes.
    pub fn set(&mut self, index: Index, value: Value) -> Result<(), Error> {
        self.variables[index as usize].set(value)
    }

    pub(crate) fn store(&mut self, index: Index, value: Value) -> Result<(), Error> {
        self.variables[index as usize].store(value)
    }

    /// Encoded bytes of the six header registers, in order.
    pub(crate) fn header_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_SIZE);
        for variable in &self.variables[..HEADER_SIZE] {
            variable.get().extend_le_bytes(&mut out);
        }
        out
    }

    pub fn iter(&self) -> impl Iterator<Item = &Variable> {
        self.variables.iter()
    }
}

/// Number of bytes before the payload of every frame.
pub const HEADER_SIZE: usize = 6;

impl Default for RegisterTable {
    fn default() -> Self {
        Self::sentinel()
    }
}
