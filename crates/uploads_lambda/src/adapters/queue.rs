pub trait QueueAcknowledger {
    fn delete_message(&self, receipt_handle: &str) -> Result<(), String>;
}
