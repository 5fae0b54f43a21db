use crate::variable::{Field, WireFormat};

/// Number of registers in a [`RegisterTable`](crate::RegisterTable).
pub const INDEX_COUNT: usize = 98;

/// The address of a register on an SMD Red driver. Each one is sent as a single byte on the wire,
/// and doubles as the register's position in the driver's register table.
#[repr(u8)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum Index {
    /// Start of frame marker, always `0x55`.
    Header = 0,
    /// Bus address of the driver. 255 is the broadcast address.
    DeviceId = 1,
    /// Product type, `0xBA` for SMD Red.
    DeviceFamily = 2,
    /// Total frame length, including the CRC.
    PackageSize = 3,
    Command = 4,
    Status = 5,
    /// `0x00MMmmpp` hardware version.
    HardwareVersion = 6,
    /// `0x00MMmmpp` firmware version.
    SoftwareVersion = 7,
    Baudrate = 8,
    OperationMode = 9,
    TorqueEnable = 10,
    OutputShaftCpr = 11,
    OutputShaftRpm = 12,
    /// Writing 1 lights the user indicator for a few seconds.
    UserIndicator = 13,
    MinimumPositionLimit = 14,
    MaximumPositionLimit = 15,
    TorqueLimit = 16,
    VelocityLimit = 17,
    PositionFeedForward = 18,
    VelocityFeedForward = 19,
    TorqueFeedForward = 20,
    PositionDeadband = 21,
    VelocityDeadband = 22,
    TorqueDeadband = 23,
    PositionOutputLimit = 24,
    VelocityOutputLimit = 25,
    TorqueOutputLimit = 26,
    PositionScalerGain = 27,
    PositionPGain = 28,
    PositionIGain = 29,
    PositionDGain = 30,
    VelocityScalerGain = 31,
    VelocityPGain = 32,
    VelocityIGain = 33,
    VelocityDGain = 34,
    TorqueScalerGain = 35,
    TorquePGain = 36,
    TorqueIGain = 37,
    TorqueDGain = 38,
    SetPosition = 39,
    SetVelocity = 40,
    SetTorque = 41,
    SetDutyCycle = 42,
    Buzzer1 = 43,
    Buzzer2 = 44,
    Buzzer3 = 45,
    Buzzer4 = 46,
    Buzzer5 = 47,
    Servo1 = 48,
    Servo2 = 49,
    Servo3 = 50,
    Servo4 = 51,
    Servo5 = 52,
    Rgb1 = 53,
    Rgb2 = 54,
    Rgb3 = 55,
    Rgb4 = 56,
    Rgb5 = 57,
    PresentPosition = 58,
    PresentVelocity = 59,
    /// Measured motor current in milliamps.
    MotorCurrent = 60,
    /// ADC reading of the analog port.
    AnalogPort = 61,
    Button1 = 62,
    Button2 = 63,
    Button3 = 64,
    Button4 = 65,
    Button5 = 66,
    Light1 = 67,
    Light2 = 68,
    Light3 = 69,
    Light4 = 70,
    Light5 = 71,
    Joystick1 = 72,
    Joystick2 = 73,
    Joystick3 = 74,
    Joystick4 = 75,
    Joystick5 = 76,
    Distance1 = 77,
    Distance2 = 78,
    Distance3 = 79,
    Distance4 = 80,
    Distance5 = 81,
    Qtr1 = 82,
    Qtr2 = 83,
    Qtr3 = 84,
    Qtr4 = 85,
    Qtr5 = 86,
    Pot1 = 87,
    Pot2 = 88,
    Pot3 = 89,
    Pot4 = 90,
    Pot5 = 91,
    Imu1 = 92,
    Imu2 = 93,
    Imu3 = 94,
    Imu4 = 95,
    Imu5 = 96,
    /// CRC32 trailer of the last frame.
    CrcValue = 97,
}

impl Index {
    /// Every index, in register table order.
    pub const ALL: [Index; INDEX_COUNT] = [
        Self::Header,
        Self::DeviceId,
        Self::DeviceFamily,
        Self::PackageSize,
        Self::Command,
        Self::Status,
        Self::HardwareVersion,
        Self::SoftwareVersion,
        Self::Baudrate,
        Self::OperationMode,
        Self::TorqueEnable,
        Self::OutputShaftCpr,
        Self::OutputShaftRpm,
        Self::UserIndicator,
        Self::MinimumPositionLimit,
        Self::MaximumPositionLimit,
        Self::TorqueLimit,
        Self::VelocityLimit,
        Self::PositionFeedForward,
        Self::VelocityFeedForward,
        Self::TorqueFeedForward,
        Self::PositionDeadband,
        Self::VelocityDeadband,
        Self::TorqueDeadband,
        Self::PositionOutputLimit,
        Self::VelocityOutputLimit,
        Self::TorqueOutputLimit,
        Self::PositionScalerGain,
        Self::PositionPGain,
        Self::PositionIGain,
        Self::PositionDGain,
        Self::VelocityScalerGain,
        Self::VelocityPGain,
        Self::VelocityIGain,
        Self::VelocityDGain,
        Self::TorqueScalerGain,
        Self::TorquePGain,
        Self::TorqueIGain,
        Self::TorqueDGain,
        Self::SetPosition,
        Self::SetVelocity,
        Self::SetTorque,
        Self::SetDutyCycle,
        Self::Buzzer1,
        Self::Buzzer2,
        Self::Buzzer3,
        Self::Buzzer4,
        Self::Buzzer5,
        Self::Servo1,
        Self::Servo2,
        Self::Servo3,
        Self::Servo4,
        Self::Servo5,
        Self::Rgb1,
        Self::Rgb2,
        Self::Rgb3,
        Self::Rgb4,
        Self::Rgb5,
        Self::PresentPosition,
        Self::PresentVelocity,
        Self::MotorCurrent,
        Self::AnalogPort,
        Self::Button1,
        Self::Button2,
        Self::Button3,
        Self::Button4,
        Self::Button5,
        Self::Light1,
        Self::Light2,
        Self::Light3,
        Self::Light4,
        Self::Light5,
        Self::Joystick1,
        Self::Joystick2,
        Self::Joystick3,
        Self::Joystick4,
        Self::Joystick5,
        Self::Distance1,
        Self::Distance2,
        Self::Distance3,
        Self::Distance4,
        Self::Distance5,
        Self::Qtr1,
        Self::Qtr2,
        Self::Qtr3,
        Self::Qtr4,
        Self::Qtr5,
        Self::Pot1,
        Self::Pot2,
        Self::Pot3,
        Self::Pot4,
        Self::Pot5,
        Self::Imu1,
        Self::Imu2,
        Self::Imu3,
        Self::Imu4,
        Self::Imu5,
        Self::CrcValue,
    ];

    /// Looks up the index with the given wire value.
    pub fn from_byte(byte: u8) -> Option<Self> {
        Self::ALL.get(usize::from(byte)).copied()
    }

    pub fn to_byte(self) -> u8 {
        self as u8
    }

    /// The index `offset` slots after this one, if there is one.
    pub(crate) fn offset(self, offset: u8) -> Option<Self> {
        self.to_byte()
            .checked_add(offset)
            .and_then(Self::from_byte)
    }

    /// How values of this register are laid out on the wire. This never changes at runtime.
    pub fn wire_format(self) -> WireFormat {
        use Index::*;

        match self {
            Header | DeviceId | DeviceFamily | PackageSize | Command | Status => {
                WireFormat::Scalar(Field::U8)
            }
            HardwareVersion | SoftwareVersion | Baudrate | CrcValue => WireFormat::Scalar(Field::U32),
            OperationMode | TorqueEnable | UserIndicator => WireFormat::Scalar(Field::U8),
            MinimumPositionLimit | MaximumPositionLimit => WireFormat::Scalar(Field::I32),
            TorqueLimit | VelocityLimit | AnalogPort => WireFormat::Scalar(Field::U16),
            OutputShaftCpr | OutputShaftRpm | PositionFeedForward | VelocityFeedForward
            | TorqueFeedForward | PositionDeadband | VelocityDeadband | TorqueDeadband
            | PositionOutputLimit | VelocityOutputLimit | TorqueOutputLimit
            | PositionScalerGain | PositionPGain | PositionIGain | PositionDGain
            | VelocityScalerGain | VelocityPGain | VelocityIGain | VelocityDGain
            | TorqueScalerGain | TorquePGain | TorqueIGain | TorqueDGain | SetPosition
            | SetVelocity | SetTorque | SetDutyCycle | PresentPosition | PresentVelocity
            | MotorCurrent => WireFormat::Scalar(Field::F32),
            Buzzer1 | Buzzer2 | Buzzer3 | Buzzer4 | Buzzer5 => WireFormat::Scalar(Field::U8),
            Servo1 | Servo2 | Servo3 | Servo4 | Servo5 => WireFormat::Scalar(Field::U8),
            Rgb1 | Rgb2 | Rgb3 | Rgb4 | Rgb5 => WireFormat::Scalar(Field::I32),
            Button1 | Button2 | Button3 | Button4 | Button5 => WireFormat::Scalar(Field::U8),
            Light1 | Light2 | Light3 | Light4 | Light5 => WireFormat::Scalar(Field::U16),
            Joystick1 | Joystick2 | Joystick3 | Joystick4 | Joystick5 => WireFormat::Joystick,
            Distance1 | Distance2 | Distance3 | Distance4 | Distance5 => {
                WireFormat::Scalar(Field::U16)
            }
            Qtr1 | Qtr2 | Qtr3 | Qtr4 | Qtr5 => WireFormat::Scalar(Field::U8),
            Pot1 | Pot2 | Pot3 | Pot4 | Pot5 => WireFormat::Scalar(Field::U8),
            Imu1 | Imu2 | Imu3 | Imu4 | Imu5 => WireFormat::Imu,
        }
    }

    /// Whether callers may write this register. The header fields and the CRC are filled in by
    /// the codec, and the device ID only changes through an ID update.
    pub fn is_mutable(self) -> bool {
        !matches!(
            self,
            Self::Header
                | Self::DeviceId
                | Self::DeviceFamily
                | Self::PackageSize
                | Self::Command
                | Self::Status
                | Self::CrcValue
        )
    }
}

impl From<Index> for u8 {
    fn from(index: Index) -> u8 {
        index.to_byte()
    }
}
