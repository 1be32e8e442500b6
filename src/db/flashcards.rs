//! Flashcard set database operations

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use super::{new_id, now};
use crate::error::{AppError, Result};

/// Flashcard set summary
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct FlashcardSet {
    pub id: String,
    pub user_id: String,
    pub upload_id: Option<String>,
    pub title: String,
    pub created_at: String,
    pub card_count: i64,
}

/// A single card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Flashcard {
    pub id: String,
    pub set_id: String,
    pub front: String,
    pub back: String,
    pub position: i64,
}

/// Set with its cards in order
#[derive(Debug, Clone, Serialize)]
pub struct FlashcardSetWithCards {
    #[serde(flatten)]
    pub set: FlashcardSet,
    pub cards: Vec<Flashcard>,
}

/// Card content without identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardContent {
    pub front: String,
    pub back: String,
}

/// Create set request
#[derive(Debug, Clone, Deserialize)]
pub struct CreateFlashcardSet {
    pub title: String,
    pub upload_id: Option<String>,
    #[serde(default)]
    pub cards: Vec<CardContent>,
}

const SET_SELECT: &str = r#"
    SELECT s.id, s.user_id, s.upload_id, s.title, s.created_at,
           (SELECT COUNT(*) FROM flashcards f WHERE f.set_id = s.id) AS card_count
    FROM flashcard_sets s
"#;

/// Flashcard repository
pub struct FlashcardRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> FlashcardRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get_set(&self, id: &str) -> Result<Option<FlashcardSet>> {
        let set = sqlx::query_as::<_, FlashcardSet>(&format!("{} WHERE s.id = ?", SET_SELECT))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        Ok(set)
    }

    pub async fn get_with_cards(&self, id: &str) -> Result<Option<FlashcardSetWithCards>> {
        let Some(set) = self.get_set(id).await? else {
            return Ok(None);
        };

        let cards = sqlx::query_as::<_, Flashcard>(
            "SELECT id, set_id, front, back, position FROM flashcards WHERE set_id = ? ORDER BY position ASC",
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?;

        Ok(Some(FlashcardSetWithCards { set, cards }))
    }

    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<FlashcardSet>> {
        let sets = sqlx::query_as::<_, FlashcardSet>(&format!(
            "{} WHERE s.user_id = ? ORDER BY s.created_at DESC",
            SET_SELECT
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(sets)
    }

    /// Create a set and its cards in one transaction
    pub async fn create(&self, user_id: &str, data: &CreateFlashcardSet) -> Result<FlashcardSetWithCards> {
        let set_id = new_id();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO flashcard_sets (id, user_id, upload_id, title, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&set_id)
        .bind(user_id)
        .bind(&data.upload_id)
        .bind(data.title.trim())
        .bind(now())
        .execute(&mut *tx)
        .await?;

        for (position, card) in data.cards.iter().enumerate() {
            sqlx::query(
                "INSERT INTO flashcards (id, set_id, front, back, position) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(new_id())
            .bind(&set_id)
            .bind(&card.front)
            .bind(&card.back)
            .bind(position as i64)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        self.get_with_cards(&set_id)
            .await?
            .ok_or_else(|| AppError::Internal("Failed to fetch created flashcard set".to_string()))
    }

    pub async fn delete(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM flashcard_sets WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_memory_pool, Role, UserRepository};

    #[tokio::test]
    async fn test_cards_keep_order() {
        let pool = create_memory_pool().await.unwrap();
        let user = UserRepository::new(&pool)
            .create("f@uni.edu", "f", "hash", None, Role::User)
            .await
            .unwrap();
        let repo = FlashcardRepository::new(&pool);

        let created = repo
            .create(
                &user.id,
                &CreateFlashcardSet {
                    title: "Organelles".into(),
                    upload_id: None,
                    cards: vec![
                        CardContent { front: "Mitochondria".into(), back: "ATP".into() },
                        CardContent { front: "Ribosome".into(), back: "Protein synthesis".into() },
                    ],
                },
            )
            .await
            .unwrap();

        assert_eq!(created.set.card_count, 2);
        assert_eq!(created.cards[0].front, "Mitochondria");
        assert_eq!(created.cards[1].position, 1);

        assert!(repo.delete(&created.set.id).await.unwrap());
        assert!(repo.get_with_cards(&created.set.id).await.unwrap().is_none());
    }
}
