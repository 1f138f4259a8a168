pub mod adapter;
pub mod publisher;
pub mod router;
pub mod topics;

use rumqttc::QoS;

/// Config carries QoS as the wire integer; rumqttc wants the enum.
pub fn qos_from_u8(qos: u8) -> QoS {
    match qos {
        0 => QoS::AtMostOnce,
        2 => QoS::ExactlyOnce,
        _ => QoS::AtLeastOnce,
    }
}
