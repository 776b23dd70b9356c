pub mod openai;
pub mod providers;
pub mod voice;

pub use openai::OpenAiProvider;
pub use providers::{ChatMessage, ChatRole, LlmProvider, LlmRequest, LlmResponse, Usage};
pub use voice::{OpenAiTts, SpeechVoice, SttProvider, TtsProvider, WhisperStt};
