pub mod classifier;
pub mod factory;
pub mod providers;
pub mod reformulator;

pub use classifier::LlmClassifier;
pub use factory::LlmProviderFactory;
pub use providers::{LlmMetadata, LlmProvider, LlmProviderError, LlmProviderWithFallback};
pub use reformulator::LlmReformulator;
