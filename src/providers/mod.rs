pub mod gemini;
mod gemini_types;
pub mod http_client;
pub mod scrub;
pub mod traits;

pub use gemini::GeminiProvider;
pub use http_client::build_provider_client_with_timeout;
pub use scrub::{sanitize_api_error, scrub_secret_patterns};
pub use traits::ReviewModel;
