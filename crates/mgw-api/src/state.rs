//! ---
//! mgw_section: "05-networking-external-interfaces"
//! mgw_subsection: "module"
//! mgw_type: "source"
//! mgw_scope: "code"
//! mgw_description: "Motor state DTO and node value codec."
//! mgw_version: "v0.1.0"
//! mgw_owner: "tbd"
//! ---
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Lowest accepted motor speed setpoint.
pub const MOTOR_SPEED_MIN: i64 = 0;

/// Highest accepted motor speed setpoint.
pub const MOTOR_SPEED_MAX: i64 = 10_000;

/// The two-field state this gateway exposes as its entire domain model.
///
/// Constructed fresh per request from two independent node reads; never
/// cached or merged with prior state. The controller remains the system
/// of record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MotorState {
    pub motor_enable: bool,
    pub motor_speed: i64,
}

/// Domain constraint and node coercion failures.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StateError {
    #[error("motorSpeed {0} is outside the allowed range 0..=10000")]
    SpeedOutOfRange(i64),
    #[error("node value {0} is not interpretable as a boolean")]
    NotBoolean(Value),
    #[error("node value {0} is not interpretable as an integer")]
    NotInteger(Value),
}

impl MotorState {
    /// Enforce the API-boundary domain constraints. The upstream store's
    /// own type/range rules are not replicated here.
    pub fn validate(&self) -> Result<(), StateError> {
        if !(MOTOR_SPEED_MIN..=MOTOR_SPEED_MAX).contains(&self.motor_speed) {
            return Err(StateError::SpeedOutOfRange(self.motor_speed));
        }
        Ok(())
    }

    /// Assemble a state from the two raw node values.
    pub fn from_node_values(enable: &Value, speed: &Value) -> Result<Self, StateError> {
        Ok(Self {
            motor_enable: coerce_bool(enable)?,
            motor_speed: coerce_int(speed)?,
        })
    }

    /// The enable flag as a Data Layer node value.
    pub fn enable_value(&self) -> Value {
        Value::Bool(self.motor_enable)
    }

    /// The speed setpoint as a Data Layer node value.
    pub fn speed_value(&self) -> Value {
        json!(self.motor_speed)
    }
}

/// PLC boolean symbols occasionally surface as 0/1 integers depending on
/// the controller firmware; accept both.
fn coerce_bool(value: &Value) -> Result<bool, StateError> {
    match value {
        Value::Bool(flag) => Ok(*flag),
        Value::Number(number) => match number.as_f64() {
            Some(numeric) => Ok(numeric != 0.0),
            None => Err(StateError::NotBoolean(value.clone())),
        },
        _ => Err(StateError::NotBoolean(value.clone())),
    }
}

fn coerce_int(value: &Value) -> Result<i64, StateError> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .ok_or_else(|| StateError::NotInteger(value.clone())),
        _ => Err(StateError::NotInteger(value.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_accepts_full_range() {
        for speed in [MOTOR_SPEED_MIN, 1, 1500, MOTOR_SPEED_MAX] {
            let state = MotorState {
                motor_enable: true,
                motor_speed: speed,
            };
            state.validate().unwrap();
        }
    }

    #[test]
    fn validate_rejects_out_of_range_speed() {
        for speed in [-1, MOTOR_SPEED_MAX + 1, i64::MIN, i64::MAX] {
            let state = MotorState {
                motor_enable: false,
                motor_speed: speed,
            };
            assert_eq!(state.validate(), Err(StateError::SpeedOutOfRange(speed)));
        }
    }

    #[test]
    fn wire_field_names_are_camel_case() {
        let state = MotorState {
            motor_enable: true,
            motor_speed: 1500,
        };
        let encoded = serde_json::to_value(state).unwrap();
        assert_eq!(encoded, json!({ "motorEnable": true, "motorSpeed": 1500 }));
    }

    #[test]
    fn assembles_from_plain_node_values() {
        let state = MotorState::from_node_values(&json!(true), &json!(1500)).unwrap();
        assert_eq!(
            state,
            MotorState {
                motor_enable: true,
                motor_speed: 1500
            }
        );
    }

    #[test]
    fn accepts_numeric_enable_flags() {
        let state = MotorState::from_node_values(&json!(1), &json!(0)).unwrap();
        assert!(state.motor_enable);
        let state = MotorState::from_node_values(&json!(0), &json!(0)).unwrap();
        assert!(!state.motor_enable);
    }

    #[test]
    fn rejects_uninterpretable_node_values() {
        assert!(matches!(
            MotorState::from_node_values(&json!("on"), &json!(1500)),
            Err(StateError::NotBoolean(_))
        ));
        assert!(matches!(
            MotorState::from_node_values(&json!(true), &json!("fast")),
            Err(StateError::NotInteger(_))
        ));
        assert!(matches!(
            MotorState::from_node_values(&json!(true), &json!(12.5)),
            Err(StateError::NotInteger(_))
        ));
    }
}
