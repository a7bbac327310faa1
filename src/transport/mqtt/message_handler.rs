//! Pure routing of rumqttc event-loop events
//!
//! The supervisor in [`super::client`] only needs to know a handful of
//! things about each event; this module makes that decision without any I/O.

use rumqttc::{ConnectReturnCode, Event, Outgoing, Packet};

/// Pure routing decisions based on MQTT events
pub struct MessageHandler;

impl MessageHandler {
    /// Route an event-loop event to the supervisor action it calls for
    pub fn route_mqtt_event(event: &Event) -> EventRoute {
        match event {
            Event::Incoming(Packet::ConnAck(ack)) => {
                if ack.code == ConnectReturnCode::Success {
                    EventRoute::ConnectionAcknowledged {
                        session_present: ack.session_present,
                    }
                } else {
                    EventRoute::ConnectionRefused(format!("{:?}", ack.code))
                }
            }
            Event::Incoming(Packet::PubAck(ack)) => {
                EventRoute::PublishAcknowledged { packet_id: ack.pkid }
            }
            Event::Incoming(Packet::PubComp(comp)) => {
                EventRoute::PublishAcknowledged {
                    packet_id: comp.pkid,
                }
            }
            Event::Incoming(Packet::Disconnect) => EventRoute::DisconnectReceived,
            Event::Incoming(other) => EventRoute::InfrastructureEvent(format!("{other:?}")),
            Event::Outgoing(Outgoing::Disconnect) => EventRoute::DisconnectSent,
            Event::Outgoing(_) => EventRoute::OutgoingEvent,
        }
    }
}

/// Routing decisions for MQTT events
#[derive(Debug, Clone, PartialEq)]
pub enum EventRoute {
    /// Broker accepted the session
    ConnectionAcknowledged { session_present: bool },
    /// Broker answered CONNECT with a failure code
    ConnectionRefused(String),
    /// QoS 1 or QoS 2 publish completed
    PublishAcknowledged { packet_id: u16 },
    /// Broker closed the session
    DisconnectReceived,
    /// Our DISCONNECT went out
    DisconnectSent,
    /// Other incoming packets (pings, subscriptions)
    InfrastructureEvent(String),
    /// Other outgoing packets
    OutgoingEvent,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rumqttc::{ConnAck, PubAck, PubComp};

    #[test]
    fn test_route_successful_connack() {
        let event = Event::Incoming(Packet::ConnAck(ConnAck::new(
            ConnectReturnCode::Success,
            true,
        )));
        assert_eq!(
            MessageHandler::route_mqtt_event(&event),
            EventRoute::ConnectionAcknowledged {
                session_present: true
            }
        );
    }

    #[test]
    fn test_route_refused_connack() {
        let event = Event::Incoming(Packet::ConnAck(ConnAck::new(
            ConnectReturnCode::BadUserNamePassword,
            false,
        )));
        match MessageHandler::route_mqtt_event(&event) {
            EventRoute::ConnectionRefused(reason) => {
                assert!(reason.contains("BadUserNamePassword"))
            }
            other => panic!("unexpected route {other:?}"),
        }
    }

    #[test]
    fn test_route_publish_acknowledgements() {
        let puback = Event::Incoming(Packet::PubAck(PubAck::new(7)));
        assert_eq!(
            MessageHandler::route_mqtt_event(&puback),
            EventRoute::PublishAcknowledged { packet_id: 7 }
        );

        let pubcomp = Event::Incoming(Packet::PubComp(PubComp::new(9)));
        assert_eq!(
            MessageHandler::route_mqtt_event(&pubcomp),
            EventRoute::PublishAcknowledged { packet_id: 9 }
        );
    }

    #[test]
    fn test_route_disconnects() {
        assert_eq!(
            MessageHandler::route_mqtt_event(&Event::Outgoing(Outgoing::Disconnect)),
            EventRoute::DisconnectSent
        );
        assert_eq!(
            MessageHandler::route_mqtt_event(&Event::Incoming(Packet::Disconnect)),
            EventRoute::DisconnectReceived
        );
    }

    #[test]
    fn test_route_infrastructure_events() {
        assert!(matches!(
            MessageHandler::route_mqtt_event(&Event::Incoming(Packet::PingResp)),
            EventRoute::InfrastructureEvent(_)
        ));
        assert_eq!(
            MessageHandler::route_mqtt_event(&Event::Outgoing(Outgoing::PingReq)),
            EventRoute::OutgoingEvent
        );
    }
}
