mod error_body;
mod generate_content_request;

pub use error_body::{GeminiErrorBody, GeminiErrorObject};
pub use generate_content_request::GeminiGenerateContentRequest;
pub use generate_content_request::{Content, GenerationConfig, InlineData, Part, Tool};
