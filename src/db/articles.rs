// Article repository operations

use chrono::NaiveDate;
use tokio_postgres::Row;
use tracing::info;

use super::Database;
use crate::error::ApiError;
use crate::models::Article;

const ARTICLE_COLUMNS: &str = "id, title, writer_by, date, content, image_url";

fn article_from_row(row: &Row) -> Article {
    Article {
        id: row.get("id"),
        title: row.get("title"),
        writer_by: row.get("writer_by"),
        date: row.get("date"),
        content: row.get("content"),
        image_url: row.get("image_url"),
    }
}

impl Database {
    /// Inserts an article whose content file and image are already in the bucket.
    ///
    /// # Returns
    /// * `Result<Article, ApiError>` - The stored row with its generated id
    pub async fn create_article(
        &self,
        title: &str,
        writer_by: &str,
        date: NaiveDate,
        content_url: &str,
        image_url: &str,
    ) -> Result<Article, ApiError> {
        let client = self.get_connection().await?;

        let query = format!(
            r#"
            INSERT INTO articles (title, writer_by, date, content, image_url)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            ARTICLE_COLUMNS
        );

        let row = client.query_one(&query, &[&title, &writer_by, &date, &content_url, &image_url])
            .await
            .map_err(ApiError::from)?;

        let article = article_from_row(&row);
        info!("Created article with id: {}", article.id);
        Ok(article)
    }

    pub async fn get_article_by_id(&self, id: i32) -> Result<Article, ApiError> {
        let client = self.get_connection().await?;

        let query = format!("SELECT {} FROM articles WHERE id = $1", ARTICLE_COLUMNS);
        let row = client.query_opt(&query, &[&id])
            .await
            .map_err(ApiError::from)?;

        row.as_ref()
            .map(article_from_row)
            .ok_or_else(|| ApiError::not_found("Article not found"))
    }

    /// Exact title match, ignoring case and surrounding whitespace.
    pub async fn find_articles_by_title(&self, title: &str) -> Result<Vec<Article>, ApiError> {
        let client = self.get_connection().await?;

        let query = format!(
            "SELECT {} FROM articles WHERE LOWER(title) = LOWER($1) ORDER BY date DESC, id DESC",
            ARTICLE_COLUMNS
        );
        let rows = client.query(&query, &[&title.trim()])
            .await
            .map_err(ApiError::from)?;

        Ok(rows.iter().map(article_from_row).collect())
    }

    pub async fn get_all_articles(&self) -> Result<Vec<Article>, ApiError> {
        let client = self.get_connection().await?;

        let query = format!("SELECT {} FROM articles ORDER BY date DESC, id DESC", ARTICLE_COLUMNS);
        let rows = client.query(&query, &[])
            .await
            .map_err(ApiError::from)?;

        Ok(rows.iter().map(article_from_row).collect())
    }

    /// `NotFound` when no row was deleted.
    pub async fn delete_article(&self, id: i32) -> Result<(), ApiError> {
        let client = self.get_connection().await?;

        let rows_affected = client.execute("DELETE FROM articles WHERE id = $1", &[&id])
            .await
            .map_err(ApiError::from)?;

        if rows_affected == 0 {
            Err(ApiError::not_found("Article not found"))
        } else {
            info!("Deleted article with id: {}", id);
            Ok(())
        }
    }
}
