use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    Buy,
    Sell,
    #[default]
    Hold,
}

impl Signal {
    /// Maps a position change (+1 entered, -1 exited) to a signal.
    pub fn from_position_change(change: i8) -> Self {
        match change {
            1 => Self::Buy,
            -1 => Self::Sell,
            _ => Self::Hold,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalPoint {
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub signal: Signal,
}

impl SignalPoint {
    pub fn new(timestamp: OffsetDateTime, signal: Signal) -> Self {
        Self { timestamp, signal }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use time::macros::datetime;

    use super::{Signal, SignalPoint};

    #[test]
    fn maps_position_changes_to_signals() {
        assert_eq!(Signal::from_position_change(1), Signal::Buy);
        assert_eq!(Signal::from_position_change(-1), Signal::Sell);
        assert_eq!(Signal::from_position_change(0), Signal::Hold);
    }

    #[test]
    fn signal_point_deserializes_from_wire_shape() {
        let point: SignalPoint = serde_json::from_value(json!({
            "timestamp": "2024-01-05T00:00:00Z",
            "signal": "buy",
        }))
        .unwrap();

        assert_eq!(
            point,
            SignalPoint::new(datetime!(2024-01-05 0:00 UTC), Signal::Buy)
        );
    }
}
