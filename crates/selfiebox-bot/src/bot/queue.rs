use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};

use crate::bot::context::BotContext;
use crate::handlers::message::handle_message;
use crate::telegram::Message;

/// Keyed by sender id. Messages without a sender fall back to the chat id.
type QueueKey = i64;

pub(crate) type UserQueueMap = Arc<Mutex<HashMap<QueueKey, mpsc::UnboundedSender<Message>>>>;

pub(crate) fn new_user_queues() -> UserQueueMap {
    Arc::new(Mutex::new(HashMap::new()))
}

fn queue_key(message: &Message) -> QueueKey {
    message
        .from
        .as_ref()
        .map_or(message.chat.id, |user| user.id)
}

/// Hands `message` to its sender's worker, spawning one if needed.
pub(crate) async fn dispatch_message(
    queues: &UserQueueMap,
    context: &Arc<BotContext>,
    message: Message,
) {
    let key = queue_key(&message);
    let sender = {
        let mut queues = queues.lock().await;
        if let Some(sender) = queues.get(&key) {
            sender.clone()
        } else {
            let sender = spawn_queue_worker(key, Arc::clone(context));
            queues.insert(key, sender.clone());
            sender
        }
    };

    if let Err(err) = sender.send(message) {
        // Worker is gone; replace it and retry once.
        let message = err.0;
        let sender = spawn_queue_worker(key, Arc::clone(context));
        queues.lock().await.insert(key, sender.clone());
        let _ = sender.send(message);
    }
}

fn spawn_queue_worker(key: QueueKey, context: Arc<BotContext>) -> mpsc::UnboundedSender<Message> {
    let (sender, mut receiver) = mpsc::unbounded_channel::<Message>();
    tokio::spawn(async move {
        tracing::debug!(queue = key, "queue worker started");
        while let Some(message) = receiver.recv().await {
            if let Err(err) = handle_message(context.as_ref(), message).await {
                tracing::error!(queue = key, "Message handling error: {err:#}");
            }
        }
    });
    sender
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn message(value: serde_json::Value) -> Message {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn queue_key_prefers_sender() {
        let with_sender = message(json!({
            "message_id": 1,
            "chat": { "id": -100, "type": "group" },
            "from": { "id": 42, "is_bot": false }
        }));
        assert_eq!(queue_key(&with_sender), 42);

        let without_sender = message(json!({
            "message_id": 2,
            "chat": { "id": -100, "type": "channel" }
        }));
        assert_eq!(queue_key(&without_sender), -100);
    }
}
