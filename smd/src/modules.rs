//! Peripheral modules plugged into a driver's module ports.
//!
//! Each kind of module has five register slots, addressed by a module ID from 1 to 5.

use crate::{Error, Index, Master, Scalar, Transport, Value};
use log::warn;

/// Number of modules of each kind a driver can address.
pub const MODULES_PER_KIND: u8 = 5;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ModuleKind {
    Button,
    Light,
    Buzzer,
    Joystick,
    Distance,
    Qtr,
    Servo,
    Potentiometer,
    Rgb,
    Imu,
}

/// For each kind of module, the bit of the module scan mask that reports module ID 1, and the
/// register of module ID 1.
const MODULE_BANKS: [(ModuleKind, u8, Index); 10] = [
    (ModuleKind::Button, 1, Index::Button1),
    (ModuleKind::Light, 6, Index::Light1),
    (ModuleKind::Buzzer, 11, Index::Buzzer1),
    (ModuleKind::Joystick, 16, Index::Joystick1),
    (ModuleKind::Distance, 21, Index::Distance1),
    (ModuleKind::Qtr, 26, Index::Qtr1),
    (ModuleKind::Servo, 31, Index::Servo1),
    (ModuleKind::Potentiometer, 36, Index::Pot1),
    (ModuleKind::Rgb, 41, Index::Rgb1),
    (ModuleKind::Imu, 46, Index::Imu1),
];

impl ModuleKind {
    fn bank(self) -> (u8, Index) {
        let (_, bit_offset, first_index) = MODULE_BANKS[self as usize];
        (bit_offset, first_index)
    }

    /// The mask bit reporting module ID 1 of this kind.
    pub fn bit_offset(self) -> u8 {
        self.bank().0
    }

    /// The register of module ID 1 of this kind.
    pub fn first_index(self) -> Index {
        self.bank().1
    }

    /// The register of the given module, or an error if the module ID is not between 1 and 5.
    pub fn index(self, module_id: u8) -> Result<Index, Error> {
        if !(1..=MODULES_PER_KIND).contains(&module_id) {
            return Err(Error::InvalidModule {
                kind: self,
                module_id,
            });
        }
        self.first_index()
            .offset(module_id - 1)
            .ok_or(Error::InvalidModule {
                kind: self,
                module_id,
            })
    }
}

/// Maps the bitmask from a module scan reply to the registers of the modules it reports.
///
/// Bits that don't fall in any bank are logged and skipped.
pub fn decode_module_mask(mask: u64) -> Vec<Index> {
    let mut modules = vec![];
    for bit in 0..64u8 {
        if mask & (1 << bit) == 0 {
            continue;
        }
        let bank = MODULE_BANKS.iter().find(|(_, bit_offset, _)| {
            (*bit_offset..*bit_offset + MODULES_PER_KIND).contains(&bit)
        });
        match bank.and_then(|(_, bit_offset, first_index)| first_index.offset(bit - bit_offset)) {
            Some(index) => modules.push(index),
            None => warn!("Module scan reported unknown bit {}", bit),
        }
    }
    modules
}

/// The three reflectance sensors of a QTR module: left, middle and right.
pub fn decode_qtr(byte: u8) -> [bool; 3] {
    [byte & 0b001 != 0, byte & 0b010 != 0, byte & 0b100 != 0]
}

/// Packs a colour the way RGB modules expect it.
pub fn pack_rgb(red: u8, green: u8, blue: u8) -> i32 {
    i32::from(red) + i32::from(green) * 256 + i32::from(blue) * 65536
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Joystick {
    pub x: i32,
    pub y: i32,
    pub button: bool,
}

/// Orientation reported by an IMU module, in degrees.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Imu {
    pub roll: f32,
    pub pitch: f32,
}

/// Peripheral module accessors.
///
/// The module ID is checked before anything goes on the bus. Getters return `Ok(None)` if the
/// driver didn't give a valid reply.
impl<T: Transport> Master<T> {
    pub fn get_button(&mut self, id: u8, module_id: u8) -> Result<Option<bool>, Error> {
        let index = ModuleKind::Button.index(module_id)?;
        self.get_one(id, index, |value| value.as_u8().map(|state| state != 0))
    }

    /// Ambient light level.
    pub fn get_light(&mut self, id: u8, module_id: u8) -> Result<Option<u16>, Error> {
        let index = ModuleKind::Light.index(module_id)?;
        self.get_one(id, index, Value::as_u16)
    }

    /// Plays a note on a buzzer module. 0 silences it.
    pub fn set_buzzer(&mut self, id: u8, module_id: u8, note: u8) -> Result<(), Error> {
        let index = ModuleKind::Buzzer.index(module_id)?;
        self.set_one(id, index, note.into())
    }

    pub fn get_joystick(&mut self, id: u8, module_id: u8) -> Result<Option<Joystick>, Error> {
        let index = ModuleKind::Joystick.index(module_id)?;
        self.get_one(id, index, |value| match value.as_record()? {
            [Scalar::I32(x), Scalar::I32(y), Scalar::U8(button)] => Some(Joystick {
                x: *x,
                y: *y,
                button: *button != 0,
            }),
            _ => None,
        })
    }

    /// Distance measured by an ultrasonic module, in centimetres.
    pub fn get_distance(&mut self, id: u8, module_id: u8) -> Result<Option<u16>, Error> {
        let index = ModuleKind::Distance.index(module_id)?;
        self.get_one(id, index, Value::as_u16)
    }

    pub fn get_qtr(&mut self, id: u8, module_id: u8) -> Result<Option<[bool; 3]>, Error> {
        let index = ModuleKind::Qtr.index(module_id)?;
        self.get_one(id, index, |value| value.as_u8().map(decode_qtr))
    }

    /// Moves a servo module to the given position.
    pub fn set_servo(&mut self, id: u8, module_id: u8, position: u8) -> Result<(), Error> {
        let index = ModuleKind::Servo.index(module_id)?;
        self.set_one(id, index, position.into())
    }

    pub fn get_potentiometer(&mut self, id: u8, module_id: u8) -> Result<Option<u8>, Error> {
        let index = ModuleKind::Potentiometer.index(module_id)?;
        self.get_one(id, index, Value::as_u8)
    }

    pub fn set_rgb(
        &mut self,
        id: u8,
        module_id: u8,
        red: u8,
        green: u8,
        blue: u8,
    ) -> Result<(), Error> {
        let index = ModuleKind::Rgb.index(module_id)?;
        self.set_one(id, index, pack_rgb(red, green, blue).into())
    }

    pub fn get_imu(&mut self, id: u8, module_id: u8) -> Result<Option<Imu>, Error> {
        let index = ModuleKind::Imu.index(module_id)?;
        self.get_one(id, index, |value| match value.as_record()? {
            [Scalar::F32(roll), Scalar::F32(pitch)] => Some(Imu {
                roll: *roll,
                pitch: *pitch,
            }),
            _ => None,
        })
    }
}
