pub mod detector;
pub mod fallback;
pub mod followup;
pub mod intent;
pub mod orchestrator;
pub mod reformulate;

pub use detector::NewSearchDetector;
pub use fallback::FallbackClassifier;
pub use followup::FollowUpResolver;
pub use intent::{Classifier, ClassifyContext, Intent, IntentLabel, ReformulatedQuery};
pub use orchestrator::{AssistantReply, Orchestrator, ReplyMeta};
pub use reformulate::{QueryReformulator, ReformulateContext, Reformulator};
