//! Bus master for SMD Red motor drivers.
//!
//! Drivers share a half-duplex serial bus and are addressed by a one byte ID. The master keeps a
//! mirror of every driver's register table, builds request frames from it and stores the values
//! carried by replies back into it.

pub mod crc;
mod error;
mod index;
mod master;
mod modules;
mod motor;
pub mod packet;
mod registers;
mod transport;
mod variable;

pub use error::Error;
pub use index::{Index, INDEX_COUNT};
pub use master::{
    settle_delay, DriverInfo, Master, Timing, Version, DEFAULT_BAUD_RATE, MAX_BAUD_RATE,
    MIN_BAUD_RATE,
};
pub use modules::{
    decode_module_mask, decode_qtr, pack_rgb, Imu, Joystick, ModuleKind, MODULES_PER_KIND,
};
pub use motor::{ControlLoop, ControlParameters, OperationMode};
pub use registers::{RegisterTable, BROADCAST_ID, HEADER, HEADER_SIZE, PRODUCT_TYPE};
pub use transport::Transport;
pub use variable::{Field, Scalar, Value, Variable, WireFormat};
