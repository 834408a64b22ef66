//! Conversation upsert and message log
//!
//! One conversation row per canonical contact. Every recorded message
//! rewrites the last-message preview fields; inbound messages bump the
//! unread counter, an outbound send may reset it (sending implies the
//! operator is caught up). The upsert is a single statement, so two
//! concurrent messages for the same contact cannot create two rows.

use corral_common::db::{Conversation, Direction};
use corral_common::{time, Result};
use sqlx::SqlitePool;
use uuid::Uuid;

/// One inbound or outbound message to record against a conversation.
#[derive(Debug, Clone)]
pub struct MessageInput<'a> {
    /// Canonical contact key. Callers normalize before calling.
    pub contact: &'a str,
    pub direction: Direction,
    pub text: Option<&'a str>,
    pub media_url: Option<&'a str>,
    pub media_type: Option<&'a str>,
    pub owner_mobile: Option<&'a str>,
    /// Outbound sends pass true: replying counts as having read the thread.
    pub reset_unread: bool,
}

#[derive(Clone)]
pub struct ConversationStore {
    db: SqlitePool,
}

impl ConversationStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Find-or-create the conversation for a contact and fold one message
    /// into it, appending the message to the permanent log as well.
    pub async fn record_message(&self, input: MessageInput<'_>) -> Result<Conversation> {
        let now = time::now();
        let preview = input.text.unwrap_or("[media]");
        let initial_unread: i64 = match input.direction {
            Direction::In => 1,
            Direction::Out => 0,
        };

        sqlx::query(
            r#"
            INSERT INTO whatsapp_conversations
                (id, contact, last_message_at, last_message_text, last_message_dir,
                 unread_count, owner_mobile)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(contact) DO UPDATE SET
                last_message_at = excluded.last_message_at,
                last_message_text = excluded.last_message_text,
                last_message_dir = excluded.last_message_dir,
                owner_mobile = COALESCE(excluded.owner_mobile, owner_mobile),
                unread_count = CASE
                    WHEN excluded.last_message_dir = 'in'
                        THEN whatsapp_conversations.unread_count + 1
                    WHEN ? THEN 0
                    ELSE whatsapp_conversations.unread_count
                END
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(input.contact)
        .bind(now)
        .bind(preview)
        .bind(input.direction)
        .bind(initial_unread)
        .bind(input.owner_mobile)
        .bind(input.reset_unread)
        .execute(&self.db)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO whatsapp_messages (id, contact, direction, text, media_url, media_type, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(input.contact)
        .bind(input.direction)
        .bind(input.text)
        .bind(input.media_url)
        .bind(input.media_type)
        .bind(now)
        .execute(&self.db)
        .await?;

        let conversation =
            sqlx::query_as::<_, Conversation>("SELECT * FROM whatsapp_conversations WHERE contact = ?")
                .bind(input.contact)
                .fetch_one(&self.db)
                .await?;

        Ok(conversation)
    }

    /// Zero the unread counter. Unknown contact is a silent no-op; calling
    /// twice leaves the counter at zero both times.
    pub async fn mark_read(&self, contact: &str) -> Result<()> {
        sqlx::query("UPDATE whatsapp_conversations SET unread_count = 0 WHERE contact = ?")
            .bind(contact)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    pub async fn get(&self, contact: &str) -> Result<Option<Conversation>> {
        Ok(
            sqlx::query_as::<_, Conversation>("SELECT * FROM whatsapp_conversations WHERE contact = ?")
                .bind(contact)
                .fetch_optional(&self.db)
                .await?,
        )
    }

    /// Most recently active conversations first.
    pub async fn list(&self, limit: i64) -> Result<Vec<Conversation>> {
        Ok(sqlx::query_as::<_, Conversation>(
            "SELECT * FROM whatsapp_conversations ORDER BY last_message_at DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.db)
        .await?)
    }
}
