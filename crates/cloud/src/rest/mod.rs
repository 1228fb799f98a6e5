//! HTTP client for the hosted document store.
//!
//! The store exposes create, equality-filtered query, ordered list, and
//! partial update over named collections. Document ids and timestamps are
//! assigned server-side; this client never invents either.

mod wire;

use std::time::Duration;

use serde_json::{Value, json};
use snafu::ResultExt;

use crate::error::{
    CloudResult, DecodePayloadSnafu, MalformedDocumentSnafu, StatusSnafu, TransportSnafu,
};
use crate::ids::{GlobalMessageId, MessageId, SessionId, UserId};
use crate::types::{
    ChatMessageRecord, ChatSessionRecord, GlobalMessageRecord, MessageAuthor, NewChatMessage,
    NewChatSession, NewGlobalMessage, SessionPatch,
};
use crate::{BoxFuture, MessageStore, RoomStore, SessionStore};
use wire::{
    CreateDocumentRequest, DocumentEnvelope, FieldFilter, GlobalMessageFields, MessageFields,
    OrderBy, PatchDocumentRequest, QueryRequest, QueryResponse, SessionFields,
};

pub const COLLECTION_SESSIONS: &str = "chatSessions";
pub const COLLECTION_MESSAGES: &str = "messages";
pub const COLLECTION_GLOBAL_MESSAGES: &str = "globalMessages";

/// Server-maintained timestamp field used for the room's ordered read.
const SERVER_TIMESTAMP_FIELD: &str = "createTimeMs";

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub base_url: String,
    pub api_key: String,
}

impl StoreConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim().trim_end_matches('/').to_string(),
            api_key: api_key.into().trim().to_string(),
        }
    }
}

pub struct RestDocumentStore {
    config: StoreConfig,
    client: reqwest::Client,
}

impl RestDocumentStore {
    pub fn new(config: StoreConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self { config, client }
    }

    fn documents_url(&self, collection: &str) -> String {
        format!(
            "{}/v1/collections/{}/documents",
            self.config.base_url, collection
        )
    }

    fn document_url(&self, collection: &str, id: &str) -> String {
        format!("{}/{}", self.documents_url(collection), id)
    }

    fn query_url(&self, collection: &str) -> String {
        format!("{}/v1/collections/{}:query", self.config.base_url, collection)
    }

    async fn create_document(
        &self,
        collection: &'static str,
        fields: Value,
        stage: &'static str,
    ) -> CloudResult<DocumentEnvelope> {
        let response = self
            .client
            .post(self.documents_url(collection))
            .bearer_auth(&self.config.api_key)
            .json(&CreateDocumentRequest { fields })
            .send()
            .await
            .context(TransportSnafu { stage })?;

        Self::decode_body::<DocumentEnvelope>(response, stage).await
    }

    async fn patch_document(
        &self,
        collection: &'static str,
        id: &str,
        fields: Value,
        stage: &'static str,
    ) -> CloudResult<DocumentEnvelope> {
        let response = self
            .client
            .patch(self.document_url(collection, id))
            .bearer_auth(&self.config.api_key)
            .json(&PatchDocumentRequest { fields })
            .send()
            .await
            .context(TransportSnafu { stage })?;

        Self::decode_body::<DocumentEnvelope>(response, stage).await
    }

    async fn run_query(
        &self,
        collection: &'static str,
        request: QueryRequest,
        stage: &'static str,
    ) -> CloudResult<Vec<DocumentEnvelope>> {
        let response = self
            .client
            .post(self.query_url(collection))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .context(TransportSnafu { stage })?;

        let decoded = Self::decode_body::<QueryResponse>(response, stage).await?;
        Ok(decoded.documents)
    }

    async fn decode_body<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
        stage: &'static str,
    ) -> CloudResult<T> {
        let status = response.status();
        let body = response.text().await.context(TransportSnafu { stage })?;

        if !status.is_success() {
            return StatusSnafu {
                stage,
                status: status.as_u16(),
                body,
            }
            .fail();
        }

        serde_json::from_str(&body).context(DecodePayloadSnafu { stage })
    }
}

fn session_from_envelope(envelope: DocumentEnvelope) -> CloudResult<ChatSessionRecord> {
    let fields: SessionFields =
        serde_json::from_value(envelope.fields.clone()).context(MalformedDocumentSnafu {
            stage: "decode-session-fields",
            collection: COLLECTION_SESSIONS,
            id: envelope.id.clone(),
        })?;

    Ok(ChatSessionRecord {
        id: SessionId::new(envelope.id.clone()),
        user_id: UserId::new(fields.user_id),
        title: fields.title,
        last_message: fields.last_message,
        updated_at_unix_ms: envelope.last_write_ms(),
    })
}

fn message_from_envelope(envelope: DocumentEnvelope) -> CloudResult<ChatMessageRecord> {
    let fields: MessageFields =
        serde_json::from_value(envelope.fields.clone()).context(MalformedDocumentSnafu {
            stage: "decode-message-fields",
            collection: COLLECTION_MESSAGES,
            id: envelope.id.clone(),
        })?;

    Ok(ChatMessageRecord {
        id: MessageId::new(envelope.id),
        session_id: SessionId::new(fields.session_id),
        content: fields.content,
        author: MessageAuthor::from_is_user(fields.is_user),
        created_at_unix_ms: envelope.create_time_ms,
    })
}

fn global_message_from_envelope(envelope: DocumentEnvelope) -> CloudResult<GlobalMessageRecord> {
    let fields: GlobalMessageFields =
        serde_json::from_value(envelope.fields.clone()).context(MalformedDocumentSnafu {
            stage: "decode-global-message-fields",
            collection: COLLECTION_GLOBAL_MESSAGES,
            id: envelope.id.clone(),
        })?;

    Ok(GlobalMessageRecord {
        id: GlobalMessageId::new(envelope.id),
        user_id: UserId::new(fields.user_id),
        user_name: fields.user_name,
        user_photo: fields.user_photo,
        content: fields.content,
        created_at_unix_ms: envelope.create_time_ms,
    })
}

fn session_patch_fields(patch: &SessionPatch) -> Value {
    let mut fields = serde_json::Map::new();
    if let Some(title) = &patch.title {
        fields.insert("title".to_string(), Value::String(title.clone()));
    }
    if let Some(last_message) = &patch.last_message {
        fields.insert("lastMessage".to_string(), Value::String(last_message.clone()));
    }
    Value::Object(fields)
}

impl SessionStore for RestDocumentStore {
    fn list_sessions<'a>(
        &'a self,
        user_id: &'a UserId,
    ) -> BoxFuture<'a, CloudResult<Vec<ChatSessionRecord>>> {
        Box::pin(async move {
            let request = QueryRequest {
                filters: vec![FieldFilter::equals("userId", user_id.as_str())],
                order_by: None,
            };

            let documents = self
                .run_query(COLLECTION_SESSIONS, request, "list-sessions")
                .await?;
            documents.into_iter().map(session_from_envelope).collect()
        })
    }

    fn create_session<'a>(
        &'a self,
        input: NewChatSession,
    ) -> BoxFuture<'a, CloudResult<ChatSessionRecord>> {
        Box::pin(async move {
            let fields = json!({
                "userId": input.user_id.as_str(),
                "title": input.title,
                "lastMessage": "",
            });

            let envelope = self
                .create_document(COLLECTION_SESSIONS, fields, "create-session")
                .await?;
            session_from_envelope(envelope)
        })
    }

    fn update_session<'a>(
        &'a self,
        session_id: &'a SessionId,
        patch: SessionPatch,
    ) -> BoxFuture<'a, CloudResult<ChatSessionRecord>> {
        Box::pin(async move {
            let envelope = self
                .patch_document(
                    COLLECTION_SESSIONS,
                    session_id.as_str(),
                    session_patch_fields(&patch),
                    "update-session",
                )
                .await?;
            session_from_envelope(envelope)
        })
    }
}

impl MessageStore for RestDocumentStore {
    fn list_messages<'a>(
        &'a self,
        session_id: &'a SessionId,
    ) -> BoxFuture<'a, CloudResult<Vec<ChatMessageRecord>>> {
        Box::pin(async move {
            let request = QueryRequest {
                filters: vec![FieldFilter::equals("sessionId", session_id.as_str())],
                order_by: None,
            };

            let documents = self
                .run_query(COLLECTION_MESSAGES, request, "list-messages")
                .await?;
            documents.into_iter().map(message_from_envelope).collect()
        })
    }

    fn append_message<'a>(
        &'a self,
        input: NewChatMessage,
    ) -> BoxFuture<'a, CloudResult<ChatMessageRecord>> {
        Box::pin(async move {
            let fields = json!({
                "sessionId": input.session_id.as_str(),
                "content": input.content,
                "isUser": input.author.is_user(),
            });

            let envelope = self
                .create_document(COLLECTION_MESSAGES, fields, "append-message")
                .await?;
            message_from_envelope(envelope)
        })
    }
}

impl RoomStore for RestDocumentStore {
    fn list_room_messages<'a>(
        &'a self,
    ) -> BoxFuture<'a, CloudResult<Vec<GlobalMessageRecord>>> {
        Box::pin(async move {
            // Ordering is delegated to the store's native ascending query.
            let request = QueryRequest {
                filters: Vec::new(),
                order_by: Some(OrderBy::ascending(SERVER_TIMESTAMP_FIELD)),
            };

            let documents = self
                .run_query(COLLECTION_GLOBAL_MESSAGES, request, "list-room-messages")
                .await?;
            documents
                .into_iter()
                .map(global_message_from_envelope)
                .collect()
        })
    }

    fn post_room_message<'a>(
        &'a self,
        input: NewGlobalMessage,
    ) -> BoxFuture<'a, CloudResult<GlobalMessageRecord>> {
        Box::pin(async move {
            let fields = json!({
                "userId": input.user_id.as_str(),
                "userName": input.user_name,
                "userPhoto": input.user_photo,
                "content": input.content,
            });

            let envelope = self
                .create_document(COLLECTION_GLOBAL_MESSAGES, fields, "post-room-message")
                .await?;
            global_message_from_envelope(envelope)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(id: &str, create_ms: i64, fields: Value) -> DocumentEnvelope {
        DocumentEnvelope {
            id: id.to_string(),
            create_time_ms: create_ms,
            update_time_ms: None,
            fields,
        }
    }

    #[test]
    fn session_decoding_uses_server_write_time() {
        let mut raw = envelope(
            "s-1",
            1_000,
            json!({"userId": "u-1", "title": "New Chat", "lastMessage": ""}),
        );
        raw.update_time_ms = Some(2_500);

        let record = session_from_envelope(raw).expect("decode session");
        assert_eq!(record.id, SessionId::new("s-1"));
        assert_eq!(record.user_id, UserId::new("u-1"));
        assert_eq!(record.updated_at_unix_ms, 2_500);
    }

    #[test]
    fn message_decoding_maps_the_is_user_flag() {
        let record = message_from_envelope(envelope(
            "m-1",
            42,
            json!({"sessionId": "s-1", "content": "Apa itu diabetes?", "isUser": true}),
        ))
        .expect("decode message");

        assert_eq!(record.author, MessageAuthor::User);
        assert_eq!(record.created_at_unix_ms, 42);
        assert_eq!(record.content, "Apa itu diabetes?");
    }

    #[test]
    fn message_decoding_rejects_missing_fields() {
        let result = message_from_envelope(envelope("m-2", 42, json!({"content": "halo"})));
        assert!(result.is_err());
    }

    #[test]
    fn session_patch_serializes_only_set_fields() {
        let fields = session_patch_fields(&SessionPatch {
            title: Some("Apa itu diabetes?".to_string()),
            last_message: None,
        });

        assert_eq!(fields["title"], "Apa itu diabetes?");
        assert!(fields.get("lastMessage").is_none());
    }

    #[test]
    fn store_config_normalizes_trailing_slash() {
        let config = StoreConfig::new("https://store.example.com/", "key");
        assert_eq!(config.base_url, "https://store.example.com");
    }
}
