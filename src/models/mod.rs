// Models module

pub mod admin;
pub mod article;
pub mod quiz;
pub mod response;
pub mod user;

// Re-export commonly used types
pub use admin::{Admin, CreateAdminRequest};
pub use article::{Article, NewArticleForm};
pub use quiz::{CreateQuizRequest, Grade, Quiz, QuizKind, QuizStatus, SubmissionResult};
pub use response::{ApiResponse, Empty, Rows};
pub use user::{LoginRequest, NewUserForm, RegisterRequest, UpdateNameRequest, User};
