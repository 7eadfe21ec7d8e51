use crate::runtime::contract::NotificationEnvelope;

pub trait TopicPublisher {
    fn publish(&self, envelope: &NotificationEnvelope) -> Result<(), String>;
}
