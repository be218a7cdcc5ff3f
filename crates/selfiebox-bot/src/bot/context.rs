use selfiebox_core::SessionTracker;

use crate::telegram::TelegramClient;

pub(crate) struct BotContext {
    client: TelegramClient,
    tracker: SessionTracker,
}

impl BotContext {
    pub(crate) fn new(client: TelegramClient, tracker: SessionTracker) -> Self {
        Self { client, tracker }
    }

    pub(crate) fn client(&self) -> &TelegramClient {
        &self.client
    }

    pub(crate) fn tracker(&self) -> &SessionTracker {
        &self.tracker
    }
}
