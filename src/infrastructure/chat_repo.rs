use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::ports::ChatProvisioner;
use crate::schema::{chat_participants, chats};

use super::models::{NewChatParticipantRow, NewChatRow};

#[derive(Clone)]
pub struct DieselChatProvisioner {
    pool: DbPool,
}

impl DieselChatProvisioner {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl ChatProvisioner for DieselChatProvisioner {
    fn create_chat(&self, order_id: Uuid, participants: &[Uuid]) -> Result<Uuid, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let chat_id = Uuid::new_v4();
            diesel::insert_into(chats::table)
                .values(&NewChatRow { id: chat_id, order_id })
                .execute(conn)?;

            let rows: Vec<NewChatParticipantRow> = participants
                .iter()
                .map(|&user_id| NewChatParticipantRow {
                    id: Uuid::new_v4(),
                    chat_id,
                    user_id,
                })
                .collect();
            diesel::insert_into(chat_participants::table)
                .values(&rows)
                .execute(conn)?;

            Ok(chat_id)
        })
    }

    fn deactivate_chat(&self, chat_id: Uuid) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;
        diesel::update(chats::table.filter(chats::id.eq(chat_id)))
            .set(chats::is_active.eq(false))
            .execute(&mut conn)?;
        Ok(())
    }
}
