// Quiz and quiz-history repository operations.
// Table names come from `QuizKind`, never from request input.

use tokio_postgres::Row;
use tracing::info;

use super::Database;
use crate::error::ApiError;
use crate::models::{Grade, Quiz, QuizKind, QuizStatus};

fn quiz_from_row(row: &Row) -> Quiz {
    Quiz {
        id: row.get("id"),
        text: row.get("text"),
        level: row.get("level"),
        is_open: row.get("is_open"),
    }
}

fn status_from_row(row: &Row) -> QuizStatus {
    QuizStatus {
        id: row.get("id"),
        text: row.get("text"),
        level: row.get("level"),
        is_open: row.get("is_open"),
        is_answered: row.get("is_answered"),
        checker: row.get("checker"),
    }
}

/// Quiz rows joined with the newest history row of one user. `$1` is the
/// filter value, `$2` the user id (NULL for anonymous callers).
fn status_query(kind: QuizKind, filter_column: &str) -> String {
    format!(
        r#"
        SELECT q.id, q.text, q.level, q.is_open,
               h.id IS NOT NULL AND h.is_answered AS is_answered,
               h.checker
        FROM {quiz} q
        LEFT JOIN LATERAL (
            SELECT id, is_answered, checker
            FROM {history}
            WHERE id_quiz = q.id AND id_user = $2
            ORDER BY created_at DESC, id DESC
            LIMIT 1
        ) h ON TRUE
        WHERE q.{column} = $1
        ORDER BY q.id
        "#,
        quiz = kind.table(),
        history = kind.history_table(),
        column = filter_column,
    )
}

impl Database {
    pub async fn get_all_quizzes(&self, kind: QuizKind) -> Result<Vec<Quiz>, ApiError> {
        let client = self.get_connection().await?;

        let query = format!("SELECT id, text, level, is_open FROM {} ORDER BY level, id", kind.table());
        let rows = client.query(&query, &[])
            .await
            .map_err(ApiError::from)?;

        Ok(rows.iter().map(quiz_from_row).collect())
    }

    /// Quizzes of one level with the caller's latest verdict on each.
    ///
    /// # Arguments
    /// * `kind` - Which quiz table to read
    /// * `level` - Difficulty level to filter on
    /// * `user_id` - The caller, or `None` for anonymous requests
    ///
    /// # Returns
    /// * `Result<Vec<QuizStatus>, ApiError>` - Possibly empty, ordered by id
    pub async fn get_quizzes_by_level(
        &self,
        kind: QuizKind,
        level: i32,
        user_id: Option<i32>,
    ) -> Result<Vec<QuizStatus>, ApiError> {
        let client = self.get_connection().await?;

        let rows = client.query(&status_query(kind, "level"), &[&level, &user_id])
            .await
            .map_err(ApiError::from)?;

        Ok(rows.iter().map(status_from_row).collect())
    }

    pub async fn get_quiz_status(
        &self,
        kind: QuizKind,
        id: i32,
        user_id: Option<i32>,
    ) -> Result<QuizStatus, ApiError> {
        let client = self.get_connection().await?;

        let row = client.query_opt(&status_query(kind, "id"), &[&id, &user_id])
            .await
            .map_err(ApiError::from)?;

        row.as_ref()
            .map(status_from_row)
            .ok_or_else(|| ApiError::not_found("Quiz not found"))
    }

    /// The bare quiz row, without history.
    pub async fn get_quiz(&self, kind: QuizKind, id: i32) -> Result<Quiz, ApiError> {
        let client = self.get_connection().await?;

        let query = format!("SELECT id, text, level, is_open FROM {} WHERE id = $1", kind.table());
        let row = client.query_opt(&query, &[&id])
            .await
            .map_err(ApiError::from)?;

        row.as_ref()
            .map(quiz_from_row)
            .ok_or_else(|| ApiError::not_found("Quiz not found"))
    }

    /// Duplicate texts surface as `Conflict` through the unique constraint.
    pub async fn create_quiz(&self, kind: QuizKind, text: &str, level: i32) -> Result<Quiz, ApiError> {
        let client = self.get_connection().await?;

        let query = format!(
            "INSERT INTO {} (text, level) VALUES ($1, $2) RETURNING id, text, level, is_open",
            kind.table()
        );
        let row = client.query_one(&query, &[&text, &level])
            .await
            .map_err(ApiError::from)?;

        let quiz = quiz_from_row(&row);
        info!("Created {} quiz with id: {}", kind, quiz.id);
        Ok(quiz)
    }

    pub async fn delete_quiz(&self, kind: QuizKind, id: i32) -> Result<(), ApiError> {
        let client = self.get_connection().await?;

        let query = format!("DELETE FROM {} WHERE id = $1", kind.table());
        let rows_affected = client.execute(&query, &[&id])
            .await
            .map_err(ApiError::from)?;

        if rows_affected == 0 {
            Err(ApiError::not_found("Quiz not found"))
        } else {
            info!("Deleted {} quiz with id: {}", kind, id);
            Ok(())
        }
    }

    /// Appends one graded attempt to the kind's history table.
    pub async fn record_attempt(
        &self,
        kind: QuizKind,
        user_id: i32,
        quiz_id: i32,
        grade: Grade,
    ) -> Result<(), ApiError> {
        let client = self.get_connection().await?;

        let query = format!(
            "INSERT INTO {} (id_user, id_quiz, is_answered, checker) VALUES ($1, $2, TRUE, $3)",
            kind.history_table()
        );
        client.execute(&query, &[&user_id, &quiz_id, &grade.as_str()])
            .await
            .map_err(ApiError::from)?;

        info!("Recorded {} attempt: user {} quiz {} -> {}", kind, user_id, quiz_id, grade);
        Ok(())
    }
}

// Nothing in the API closes a quiz or reads history counts directly
#[cfg(test)]
impl Database {
    pub(crate) async fn set_quiz_open(&self, kind: QuizKind, id: i32, is_open: bool) -> Result<(), ApiError> {
        let client = self.get_connection().await?;

        let query = format!("UPDATE {} SET is_open = $1 WHERE id = $2", kind.table());
        client.execute(&query, &[&is_open, &id]).await?;
        Ok(())
    }

    pub(crate) async fn count_attempts(&self, kind: QuizKind, user_id: i32) -> Result<i64, ApiError> {
        let client = self.get_connection().await?;

        let query = format!("SELECT COUNT(*) FROM {} WHERE id_user = $1", kind.history_table());
        let row = client.query_one(&query, &[&user_id]).await?;
        Ok(row.get(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_query_targets_kind_tables() {
        let query = status_query(QuizKind::Pronunciation, "level");

        assert!(query.contains("FROM pronunciation_quizzes q"));
        assert!(query.contains("FROM pronunciation_history"));
        assert!(query.contains("WHERE q.level = $1"));
        assert!(!query.contains("spelling"));
    }
}
