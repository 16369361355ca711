//! In-process bus for status notifications.

use std::sync::mpsc::{channel, Receiver, SendError, Sender};

use crate::notify::StatusEnvelope;

#[derive(Clone)]
pub struct StatusBus {
    sender: Sender<StatusEnvelope>,
}

impl StatusBus {
    pub fn new_pair() -> (Self, Receiver<StatusEnvelope>) {
        let (sender, receiver) = channel();
        (Self { sender }, receiver)
    }

    pub fn emit(&self, envelope: StatusEnvelope) -> Result<(), SendError<StatusEnvelope>> {
        self.sender.send(envelope)
    }
}
