pub mod gemini;
pub mod proxy;

pub use gemini::{
    Content, GeminiErrorBody, GeminiErrorObject, GeminiGenerateContentRequest, Part,
};
pub use proxy::{ChatProxyRequest, ImageInstances, ImageProxyRequest};
