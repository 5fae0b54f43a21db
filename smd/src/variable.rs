use crate::{Error, Index};

/// A fixed-width primitive on the wire. Everything is little-endian.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Field {
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    F32,
}

impl Field {
    pub fn size(self) -> usize {
        match self {
            Self::U8 | Self::I8 => 1,
            Self::U16 | Self::I16 => 2,
            Self::U32 | Self::I32 | Self::F32 => 4,
        }
    }

    /// The zero value of this field type.
    pub fn zero(self) -> Scalar {
        match self {
            Self::U8 => Scalar::U8(0),
            Self::I8 => Scalar::I8(0),
            Self::U16 => Scalar::U16(0),
            Self::I16 => Scalar::I16(0),
            Self::U32 => Scalar::U32(0),
            Self::I32 => Scalar::I32(0),
            Self::F32 => Scalar::F32(0.0),
        }
    }

    /// Decodes one field from the front of `bytes`, which must be at least `self.size()` long.
    fn read(self, bytes: &[u8]) -> Scalar {
        match self {
            Self::U8 => Scalar::U8(bytes[0]),
            Self::I8 => Scalar::I8(bytes[0] as i8),
            Self::U16 => Scalar::U16(u16::from_le_bytes(prefix(bytes))),
            Self::I16 => Scalar::I16(i16::from_le_bytes(prefix(bytes))),
            Self::U32 => Scalar::U32(u32::from_le_bytes(prefix(bytes))),
            Self::I32 => Scalar::I32(i32::from_le_bytes(prefix(bytes))),
            Self::F32 => Scalar::F32(f32::from_le_bytes(prefix(bytes))),
        }
    }
}

fn prefix<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut array = [0; N];
    array.copy_from_slice(&bytes[..N]);
    array
}

/// The layout of a register's value on the wire.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum WireFormat {
    Scalar(Field),
    /// X axis, Y axis and button state.
    Joystick,
    /// Roll and pitch angles.
    Imu,
}

const JOYSTICK_FIELDS: [Field; 3] = [Field::I32, Field::I32, Field::U8];
const IMU_FIELDS: [Field; 2] = [Field::F32, Field::F32];

impl WireFormat {
    pub fn fields(&self) -> &[Field] {
        match self {
            Self::Scalar(field) => core::slice::from_ref(field),
            Self::Joystick => &JOYSTICK_FIELDS,
            Self::Imu => &IMU_FIELDS,
        }
    }

    /// Number of bytes a value of this format takes on the wire.
    pub fn size(&self) -> usize {
        self.fields().iter().map(|field| field.size()).sum()
    }

    pub fn default_value(&self) -> Value {
        match self {
            Self::Scalar(field) => Value::Scalar(field.zero()),
            Self::Joystick | Self::Imu => {
                Value::Record(self.fields().iter().map(|field| field.zero()).collect())
            }
        }
    }

    /// Whether `value` has exactly the fields this format declares.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (Self::Scalar(field), Value::Scalar(scalar)) => scalar.field() == *field,
            (Self::Joystick | Self::Imu, Value::Record(scalars)) => {
                scalars.len() == self.fields().len()
                    && scalars
                        .iter()
                        .zip(self.fields())
                        .all(|(scalar, field)| scalar.field() == *field)
            }
            _ => false,
        }
    }

    /// Decodes a value from the front of `bytes`, or returns `None` if there aren't enough.
    pub fn read(&self, bytes: &[u8]) -> Option<Value> {
        if bytes.len() < self.size() {
            return None;
        }
        match self {
            Self::Scalar(field) => Some(Value::Scalar(field.read(bytes))),
            Self::Joystick | Self::Imu => {
                let mut offset = 0;
                let mut scalars = Vec::with_capacity(self.fields().len());
                for field in self.fields() {
                    scalars.push(field.read(&bytes[offset..]));
                    offset += field.size();
                }
                Some(Value::Record(scalars))
            }
        }
    }
}

/// A single primitive value.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Scalar {
    U8(u8),
    I8(i8),
    U16(u16),
    I16(i16),
    U32(u32),
    I32(i32),
    F32(f32),
}

impl Scalar {
    pub fn field(&self) -> Field {
        match self {
            Self::U8(_) => Field::U8,
            Self::I8(_) => Field::I8,
            Self::U16(_) => Field::U16,
            Self::I16(_) => Field::I16,
            Self::U32(_) => Field::U32,
            Self::I32(_) => Field::I32,
            Self::F32(_) => Field::F32,
        }
    }

    fn extend_le_bytes(&self, out: &mut Vec<u8>) {
        match *self {
            Self::U8(v) => out.push(v),
            Self::I8(v) => out.push(v as u8),
            Self::U16(v) => out.extend_from_slice(&v.to_le_bytes()),
            Self::I16(v) => out.extend_from_slice(&v.to_le_bytes()),
            Self::U32(v) => out.extend_from_slice(&v.to_le_bytes()),
            Self::I32(v) => out.extend_from_slice(&v.to_le_bytes()),
            Self::F32(v) => out.extend_from_slice(&v.to_le_bytes()),
        }
    }
}

/// The current value of a register: a single primitive, or an ordered record of them for the
/// composite registers (joystick and IMU).
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Scalar(Scalar),
    Record(Vec<Scalar>),
}

impl Value {
    /// Appends the little-endian wire encoding of this value.
    pub fn extend_le_bytes(&self, out: &mut Vec<u8>) {
        match self {
            Self::Scalar(scalar) => scalar.extend_le_bytes(out),
            Self::Record(scalars) => scalars.iter().for_each(|s| s.extend_le_bytes(out)),
        }
    }

    pub fn to_le_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.extend_le_bytes(&mut out);
        out
    }

    pub fn as_u8(&self) -> Option<u8> {
        match self {
            Self::Scalar(Scalar::U8(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u16(&self) -> Option<u16> {
        match self {
            Self::Scalar(Scalar::U16(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Self::Scalar(Scalar::U32(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Self::Scalar(Scalar::I32(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Self::Scalar(Scalar::F32(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&[Scalar]> {
        match self {
            Self::Record(scalars) => Some(scalars),
            _ => None,
        }
    }
}

impl From<Scalar> for Value {
    fn from(scalar: Scalar) -> Self {
        Self::Scalar(scalar)
    }
}

impl From<u8> for Value {
    fn from(v: u8) -> Self {
        Self::Scalar(Scalar::U8(v))
    }
}

impl From<i8> for Value {
    fn from(v: i8) -> Self {
        Self::Scalar(Scalar::I8(v))
    }
}

impl From<u16> for Value {
    fn from(v: u16) -> Self {
        Self::Scalar(Scalar::U16(v))
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Self::Scalar(Scalar::I16(v))
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Self::Scalar(Scalar::U32(v))
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Scalar(Scalar::I32(v))
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Self::Scalar(Scalar::F32(v))
    }
}

/// One register of a driver: where it lives, how it's encoded, and what we last knew about it.
#[derive(Clone, Debug, PartialEq)]
pub struct Variable {
    index: Index,
    format: WireFormat,
    mutable: bool,
    value: Value,
}

impl Variable {
    pub fn new(index: Index) -> Self {
        let format = index.wire_format();
        Self {
            index,
            format,
            mutable: index.is_mutable(),
            value: format.default_value(),
        }
    }

    /// A one-byte register with a fixed starting value, for the header fields.
    pub(crate) fn preset_u8(index: Index, byte: u8) -> Self {
        debug_assert_eq!(index.wire_format(), WireFormat::Scalar(Field::U8));
        Self {
            value: Value::Scalar(Scalar::U8(byte)),
            ..Self::new(index)
        }
    }

    pub fn with_value(index: Index, value: Value) -> Result<Self, Error> {
        let mut variable = Self::new(index);
        variable.store(value)?;
        Ok(variable)
    }

    pub fn index(&self) -> Index {
        self.index
    }

    pub fn format(&self) -> WireFormat {
        self.format
    }

    pub fn is_mutable(&self) -> bool {
        self.mutable
    }

    /// Width of the value on the wire, not counting the index byte.
    pub fn size(&self) -> usize {
        self.format.size()
    }

    pub fn get(&self) -> &Value {
        &self.value
    }

    /// Checks that `value` could be written with [`set`](Self::set), without writing it.
    pub fn check(&self, value: &Value) -> Result<(), Error> {
        if !self.mutable {
            return Err(Error::ReadOnly(self.index));
        }
        self.check_shape(value)
    }

    /// Updates the value, if the register is writable and `value` matches its wire format.
    pub fn set(&mut self, value: Value) -> Result<(), Error> {
        self.check(&value)?;
        self.value = value;
        Ok(())
    }

    /// Like [`set`](Self::set) but ignores mutability. Used when a value comes from the device
    /// itself, or when the codec fills in header fields.
    pub(crate) fn store(&mut self, value: Value) -> Result<(), Error> {
        self.check_shape(&value)?;
        self.value = value;
        Ok(())
    }

    fn check_shape(&self, value: &Value) -> Result<(), Error> {
        if self.format.accepts(value) {
            Ok(())
        } else {
            Err(Error::ValueShape(self.index))
        }
    }
}
