//! HIYES Document Generator Core
//!
//! # Guarantees
//! 1. Placeholders Match Across Runs
//! 2. Untouched Paragraphs Stay Untouched
//! 3. Missing Values Never Abort Generation
//! 4. Document Numbers Are Frozen Format
//! 5. Decoding Never Panics

pub mod config;
pub mod document;
pub mod document_number;
pub mod hashing;
pub mod pipeline;
pub mod placeholders;
pub mod templates;
pub mod validation;
pub mod variables;

pub use config::{ConfigError, GeneratorConfig};
pub use document::{LogicalParagraphs, Paragraph, RichTextDocument, Run};
pub use document_number::{
    decode, encode, is_valid, next_counter_for_date, CodecError, CounterError, CounterSource,
    DecodedNumber, DocumentCode, InMemoryLedger,
};
pub use hashing::{body_fingerprint, canonical_json};
pub use pipeline::{
    BatchOutcome, BatchRequest, GenerateRequest, GeneratedDocument, GenerationPipeline,
    PipelineError, Regeneration,
};
pub use placeholders::{discover, discover_ordered, substitute, substitute_text};
pub use templates::{DocumentBody, DocumentKind, Template, TemplateId, TemplateRegistry};
pub use validation::{ValidationResult, ValidationRule, ValidationViolation, ViolationSeverity};
pub use variables::{categorize, ValueMap, VariableCategories, STANDARD_VARIABLES};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
