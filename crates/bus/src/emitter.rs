use crate::Message;

/// Handle for queueing messages onto the bus. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Emitter {
    tx: flume::Sender<Message>,
}

impl Emitter {
    pub fn new(tx: flume::Sender<Message>) -> Self {
        Self { tx }
    }

    /// An emitter whose messages land in the returned receiver instead of on
    /// a websocket.
    pub fn channel() -> (Self, flume::Receiver<Message>) {
        let (tx, rx) = flume::unbounded();
        (Self::new(tx), rx)
    }

    /// Queues a message. If the bus task has gone away the message is dropped.
    pub fn emit(&self, message: Message) {
        trace!("emit {}", message.msg_type);

        if let Err(err) = self.tx.send(message) {
            warn!("bus is closed, dropping {}", err.into_inner().msg_type);
        }
    }
}
