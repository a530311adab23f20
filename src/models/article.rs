use serde::Serialize;
use chrono::NaiveDate;

/// A learning article. `content` and `image_url` point at uploaded blobs.
#[derive(Debug, Clone, Serialize)]
pub struct Article {
    pub id: i32,
    pub title: String,
    #[serde(rename = "writerBy")]
    pub writer_by: String,
    pub date: NaiveDate,
    pub content: String,
    #[serde(rename = "imageUrl")]
    pub image_url: String,
}

/// Text fields of the CMS `POST /addArtikel` multipart form.
#[derive(Debug)]
pub struct NewArticleForm {
    pub title: String,
    pub writer_by: String,
}

impl NewArticleForm {
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("Title cannot be empty".to_string());
        }

        if self.title.len() > 255 {
            return Err("Title cannot exceed 255 characters".to_string());
        }

        if self.writer_by.trim().is_empty() {
            return Err("Writer cannot be empty".to_string());
        }

        if self.writer_by.len() > 255 {
            return Err("Writer cannot exceed 255 characters".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_article_serialization() {
        let article = Article {
            id: 3,
            title: "Greetings".to_string(),
            writer_by: "Rina".to_string(),
            date: NaiveDate::from_ymd_opt(2023, 12, 1).unwrap(),
            content: "https://storage.googleapis.com/bucket/1content2".to_string(),
            image_url: "https://storage.googleapis.com/bucket/1images2".to_string(),
        };

        let json = serde_json::to_value(&article).unwrap();
        assert_eq!(json["writerBy"], "Rina");
        assert_eq!(json["date"], "2023-12-01");
        assert_eq!(json["imageUrl"], "https://storage.googleapis.com/bucket/1images2");
    }

    #[test]
    fn test_new_article_validation() {
        let ok = NewArticleForm { title: "Greetings".to_string(), writer_by: "Rina".to_string() };
        assert!(ok.validate().is_ok());

        let missing_writer = NewArticleForm { title: "Greetings".to_string(), writer_by: " ".to_string() };
        assert!(missing_writer.validate().is_err());
    }
}
