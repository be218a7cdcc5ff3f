pub struct IncomingMessage {
    pub chat_id: i64,
    pub message_id: i64,
    pub user_id: i64,
    pub is_private: bool,
    pub text: Option<String>,
    pub image: Option<IncomingImage>,
}

pub struct IncomingImage {
    pub mime_type: String,
    pub data: Vec<u8>,
}
