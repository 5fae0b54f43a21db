use crate::{Error, Index, Master, Transport, Value};

/// What the driver's control loop regulates.
#[repr(u8)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum OperationMode {
    /// Open loop: the duty cycle is applied directly.
    Pwm = 0,
    Position = 1,
    Velocity = 2,
    Torque = 3,
}

impl TryFrom<u8> for OperationMode {
    type Error = Error;

    fn try_from(byte: u8) -> Result<Self, Error> {
        match byte {
            0 => Ok(Self::Pwm),
            1 => Ok(Self::Position),
            2 => Ok(Self::Velocity),
            3 => Ok(Self::Torque),
            _ => Err(Error::UnknownOperationMode(byte)),
        }
    }
}

impl From<OperationMode> for u8 {
    fn from(mode: OperationMode) -> u8 {
        mode as u8
    }
}

/// One of the driver's three cascaded control loops.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ControlLoop {
    Position,
    Velocity,
    Torque,
}

impl ControlLoop {
    /// Registers for P, I, D, deadband, feed-forward and output limit, in that order.
    fn registers(self) -> [Index; 6] {
        match self {
            Self::Position => [
                Index::PositionPGain,
                Index::PositionIGain,
                Index::PositionDGain,
                Index::PositionDeadband,
                Index::PositionFeedForward,
                Index::PositionOutputLimit,
            ],
            Self::Velocity => [
                Index::VelocityPGain,
                Index::VelocityIGain,
                Index::VelocityDGain,
                Index::VelocityDeadband,
                Index::VelocityFeedForward,
                Index::VelocityOutputLimit,
            ],
            Self::Torque => [
                Index::TorquePGain,
                Index::TorqueIGain,
                Index::TorqueDGain,
                Index::TorqueDeadband,
                Index::TorqueFeedForward,
                Index::TorqueOutputLimit,
            ],
        }
    }
}

/// Parameters of a control loop. When writing, only the fields that are set are sent.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct ControlParameters {
    pub p: Option<f32>,
    pub i: Option<f32>,
    pub d: Option<f32>,
    /// In units of the loop's setpoint.
    pub deadband: Option<f32>,
    pub feed_forward: Option<f32>,
    pub output_limit: Option<f32>,
}

impl ControlParameters {
    fn as_array(&self) -> [Option<f32>; 6] {
        [
            self.p,
            self.i,
            self.d,
            self.deadband,
            self.feed_forward,
            self.output_limit,
        ]
    }

    fn from_values(values: &[Value]) -> Self {
        let get = |i: usize| values.get(i).and_then(Value::as_f32);
        Self {
            p: get(0),
            i: get(1),
            d: get(2),
            deadband: get(3),
            feed_forward: get(4),
            output_limit: get(5),
        }
    }
}

/// Motor configuration and setpoints.
///
/// Setters write without an acknowledgment. Getters return `Ok(None)` if the driver didn't give a
/// valid reply.
impl<T: Transport> Master<T> {
    /// Powers the motor's output stage on or off.
    pub fn enable_torque(&mut self, id: u8, enable: bool) -> Result<(), Error> {
        self.set_one(id, Index::TorqueEnable, u8::from(enable).into())
    }

    pub fn set_operation_mode(&mut self, id: u8, mode: OperationMode) -> Result<(), Error> {
        self.set_one(id, Index::OperationMode, u8::from(mode).into())
    }

    pub fn get_operation_mode(&mut self, id: u8) -> Result<Option<OperationMode>, Error> {
        self.get_one(id, Index::OperationMode, Value::as_u8)?
            .map(OperationMode::try_from)
            .transpose()
    }

    /// Encoder counts per revolution of the output shaft.
    pub fn set_shaft_cpr(&mut self, id: u8, cpr: f32) -> Result<(), Error> {
        self.set_one(id, Index::OutputShaftCpr, cpr.into())
    }

    pub fn get_shaft_cpr(&mut self, id: u8) -> Result<Option<f32>, Error> {
        self.get_one(id, Index::OutputShaftCpr, Value::as_f32)
    }

    /// Rated speed of the output shaft.
    pub fn set_shaft_rpm(&mut self, id: u8, rpm: f32) -> Result<(), Error> {
        self.set_one(id, Index::OutputShaftRpm, rpm.into())
    }

    pub fn get_shaft_rpm(&mut self, id: u8) -> Result<Option<f32>, Error> {
        self.get_one(id, Index::OutputShaftRpm, Value::as_f32)
    }

    /// Lights the driver's indicator LED for a few seconds, to tell drivers on a bus apart.
    pub fn set_user_indicator(&mut self, id: u8) -> Result<(), Error> {
        self.set_one(id, Index::UserIndicator, 1u8.into())
    }

    /// Limits in encoder ticks. The driver disables torque when the position leaves them.
    pub fn set_position_limits(&mut self, id: u8, min: i32, max: i32) -> Result<(), Error> {
        self.set_many(
            id,
            &[
                (Index::MinimumPositionLimit, min.into()),
                (Index::MaximumPositionLimit, max.into()),
            ],
        )
    }

    /// Returns `(min, max)`.
    pub fn get_position_limits(&mut self, id: u8) -> Result<Option<(i32, i32)>, Error> {
        let values = match self.get_variables(
            id,
            &[Index::MinimumPositionLimit, Index::MaximumPositionLimit],
        )? {
            Some(values) => values,
            None => return Ok(None),
        };
        let min = values[0]
            .as_i32()
            .ok_or(Error::ValueShape(Index::MinimumPositionLimit))?;
        let max = values[1]
            .as_i32()
            .ok_or(Error::ValueShape(Index::MaximumPositionLimit))?;
        Ok(Some((min, max)))
    }

    pub fn set_torque_limit(&mut self, id: u8, limit: u16) -> Result<(), Error> {
        self.set_one(id, Index::TorqueLimit, limit.into())
    }

    pub fn get_torque_limit(&mut self, id: u8) -> Result<Option<u16>, Error> {
        self.get_one(id, Index::TorqueLimit, Value::as_u16)
    }

    pub fn set_velocity_limit(&mut self, id: u8, limit: u16) -> Result<(), Error> {
        self.set_one(id, Index::VelocityLimit, limit.into())
    }

    pub fn get_velocity_limit(&mut self, id: u8) -> Result<Option<u16>, Error> {
        self.get_one(id, Index::VelocityLimit, Value::as_u16)
    }

    /// Sets the position setpoint, in encoder ticks.
    pub fn set_position(&mut self, id: u8, position: f32) -> Result<(), Error> {
        self.set_one(id, Index::SetPosition, position.into())
    }

    /// Reads the present position, in encoder ticks.
    pub fn get_position(&mut self, id: u8) -> Result<Option<f32>, Error> {
        self.get_one(id, Index::PresentPosition, Value::as_f32)
    }

    /// Sets the velocity setpoint, in RPM.
    pub fn set_velocity(&mut self, id: u8, velocity: f32) -> Result<(), Error> {
        self.set_one(id, Index::SetVelocity, velocity.into())
    }

    pub fn get_velocity(&mut self, id: u8) -> Result<Option<f32>, Error> {
        self.get_one(id, Index::PresentVelocity, Value::as_f32)
    }

    /// Sets the torque setpoint, in milliamps.
    pub fn set_torque(&mut self, id: u8, torque: f32) -> Result<(), Error> {
        self.set_one(id, Index::SetTorque, torque.into())
    }

    /// Reads the motor current, in milliamps.
    pub fn get_torque(&mut self, id: u8) -> Result<Option<f32>, Error> {
        self.get_one(id, Index::MotorCurrent, Value::as_f32)
    }

    /// Sets the duty cycle for PWM mode, as a percentage. Negative values reverse the motor.
    pub fn set_duty_cycle(&mut self, id: u8, percent: f32) -> Result<(), Error> {
        self.set_one(id, Index::SetDutyCycle, percent.into())
    }

    /// Raw ADC reading of the driver's analog input.
    pub fn get_analog_port(&mut self, id: u8) -> Result<Option<u16>, Error> {
        self.get_one(id, Index::AnalogPort, Value::as_u16)
    }

    /// Writes the parameters that are set. Writing none of them is an error.
    pub fn set_control_parameters(
        &mut self,
        id: u8,
        control_loop: ControlLoop,
        parameters: &ControlParameters,
    ) -> Result<(), Error> {
        let pairs: Vec<(Index, Value)> = control_loop
            .registers()
            .iter()
            .zip(parameters.as_array().iter())
            .filter_map(|(index, value)| value.map(|value| (*index, value.into())))
            .collect();
        self.set_many(id, &pairs)
    }

    /// Reads all six parameters of the loop.
    pub fn get_control_parameters(
        &mut self,
        id: u8,
        control_loop: ControlLoop,
    ) -> Result<Option<ControlParameters>, Error> {
        Ok(self
            .get_variables(id, &control_loop.registers())?
            .map(|values| ControlParameters::from_values(&values)))
    }
}
