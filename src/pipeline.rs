//! Generation Pipeline - Single Entry Point
//!
//! Template lookup, document number allocation, variable preparation,
//! substitution and fingerprinting, in that order, for every document.
//! The merged values are stored on the document so it can be rendered again
//! later without allocating a new number.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::GeneratorConfig;
use crate::document_number::{CodecError, CounterError, CounterSource, DocumentCode};
use crate::hashing::body_fingerprint;
use crate::placeholders::{substitute, substitute_text};
use crate::templates::{DocumentBody, DocumentKind, Template, TemplateRegistry};
use crate::validation::{CoverageInput, ValidationResult, Validator};
use crate::variables::{
    categorize, prepare_standard_variables, project_date, CompanyRecord, ContactRecord,
    ProjectRecord, ValueMap, VariableCategories,
};
use crate::ENGINE_VERSION;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    #[error("Template version {0} requires engine >= {1}, current is {2}")]
    EngineVersionMismatch(String, String, String),

    #[error("Invalid version: {0}")]
    InvalidVersion(String),

    #[error(transparent)]
    Counter(#[from] CounterError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl PipelineError {
    pub fn is_daily_limit(&self) -> bool {
        matches!(self, Self::Counter(CounterError::DailyLimitReached { .. }))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub template_id: String,
    pub project: ProjectRecord,
    #[serde(default)]
    pub company: CompanyRecord,
    #[serde(default)]
    pub contact: ContactRecord,
    /// Template-specific values; override standard variables of the same name.
    #[serde(default)]
    pub extra: ValueMap,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRequest {
    pub project: ProjectRecord,
    #[serde(default)]
    pub company: CompanyRecord,
    #[serde(default)]
    pub contact: ContactRecord,
    pub template_ids: Vec<String>,
    /// Extra values keyed by template id.
    #[serde(default)]
    pub extra: BTreeMap<String, ValueMap>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedDocument {
    pub id: String,
    pub template_id: String,
    pub template_version: String,
    pub engine_version: String,
    pub kind: DocumentKind,
    pub document_number: DocumentCode,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regenerated_at: Option<DateTime<Utc>>,
    /// SHA-256 of the rendered body.
    pub content_hash: String,
    pub coverage: ValidationResult,
    /// Values the body was rendered from, in substitution order.
    pub generation_data: ValueMap,
    pub body: DocumentBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Regeneration {
    pub document: GeneratedDocument,
    /// False when the template rendered the stored values to the same body.
    pub content_changed: bool,
}

struct Rendered {
    body: DocumentBody,
    coverage: ValidationResult,
    content_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedTemplate {
    pub template_id: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub document_number: DocumentCode,
    pub documents: Vec<GeneratedDocument>,
    pub failed: Vec<FailedTemplate>,
}

/// The generation pipeline - single entry point for document generation
pub struct GenerationPipeline {
    registry: TemplateRegistry,
    validator: Validator,
    config: GeneratorConfig,
}

impl GenerationPipeline {
    pub fn new(registry: TemplateRegistry, config: GeneratorConfig) -> Self {
        Self {
            registry,
            validator: Validator::new(),
            config,
        }
    }

    /// List all available templates
    pub fn list_templates(&self) -> Vec<&Template> {
        self.registry.list()
    }

    /// Get a specific template
    pub fn get_template(&self, id: &str) -> Option<&Template> {
        self.registry.get(id)
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Split a template's placeholders into standard and extra variables.
    pub fn analyze_template(&self, template_id: &str) -> Result<VariableCategories, PipelineError> {
        let template = self.resolve(template_id)?;
        let names = template.variables();
        Ok(categorize(names.iter().map(String::as_str)))
    }

    /// Generate one document.
    ///
    /// Reserves the next counter for the project date from `counters`, so
    /// each call on the same source gets a new document number.
    pub fn generate(
        &self,
        request: &GenerateRequest,
        counters: &dyn CounterSource,
    ) -> Result<GeneratedDocument, PipelineError> {
        let template = self.resolve(&request.template_id)?;
        let now = Utc::now();

        let (number, mut values) =
            self.prepare(&request.project, &request.company, &request.contact, counters, now)?;
        values.merge(&request.extra);

        self.issue(template, number, values, now)
    }

    /// Render a stored document again from its `generation_data`.
    ///
    /// Uses the template's current body and version. The id, document number
    /// and creation time are kept and no counter is allocated.
    pub fn regenerate(&self, original: &GeneratedDocument) -> Result<Regeneration, PipelineError> {
        let template = self.resolve(&original.template_id)?;
        let rendered = self.render(template, &original.generation_data)?;
        let content_changed = rendered.content_hash != original.content_hash;

        info!(
            template = %template.id,
            document_number = %original.document_number,
            content_changed,
            "regenerated document"
        );

        Ok(Regeneration {
            document: GeneratedDocument {
                id: original.id.clone(),
                template_id: template.id.clone(),
                template_version: template.template_version.clone(),
                engine_version: ENGINE_VERSION.to_string(),
                kind: template.kind,
                document_number: original.document_number.clone(),
                created_at: original.created_at,
                regenerated_at: Some(Utc::now()),
                content_hash: rendered.content_hash,
                coverage: rendered.coverage,
                generation_data: original.generation_data.clone(),
                body: rendered.body,
            },
            content_changed,
        })
    }

    /// Generate several templates for one project under a single document number.
    ///
    /// A template that fails is reported in `failed` and does not stop the rest.
    /// Number allocation failures abort the whole batch.
    pub fn generate_batch(
        &self,
        request: &BatchRequest,
        counters: &dyn CounterSource,
    ) -> Result<BatchOutcome, PipelineError> {
        let now = Utc::now();
        let (number, standard) =
            self.prepare(&request.project, &request.company, &request.contact, counters, now)?;

        let mut documents = Vec::new();
        let mut failed = Vec::new();

        for template_id in &request.template_ids {
            let result = self.resolve(template_id).and_then(|template| {
                let mut values = standard.clone();
                if let Some(extra) = request.extra.get(template_id) {
                    values.merge(extra);
                }
                self.issue(template, number.clone(), values, now)
            });

            match result {
                Ok(doc) => documents.push(doc),
                Err(e) => {
                    warn!(template = %template_id, error = %e, "template generation failed");
                    failed.push(FailedTemplate {
                        template_id: template_id.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            document_number = %number,
            generated = documents.len(),
            failed = failed.len(),
            "batch generation finished"
        );

        Ok(BatchOutcome {
            document_number: number,
            documents,
            failed,
        })
    }

    fn resolve(&self, template_id: &str) -> Result<&Template, PipelineError> {
        let template = self
            .registry
            .get(template_id)
            .ok_or_else(|| PipelineError::TemplateNotFound(template_id.to_string()))?;

        self.check_engine_version(template)?;

        if template.deprecated {
            warn!(
                template = %template.id,
                superseded_by = template.superseded_by.as_deref().unwrap_or("-"),
                "generating from deprecated template"
            );
        }
        Ok(template)
    }

    fn prepare(
        &self,
        project: &ProjectRecord,
        company: &CompanyRecord,
        contact: &ContactRecord,
        counters: &dyn CounterSource,
        now: DateTime<Utc>,
    ) -> Result<(DocumentCode, ValueMap), PipelineError> {
        let date = project_date(project, now.date_naive());
        let counter = counters.reserve(date)?;
        let number = DocumentCode::generate(date, counter)?;

        let values = prepare_standard_variables(
            project,
            company,
            contact,
            date,
            &number,
            &self.config,
            now,
        );
        Ok((number, values))
    }

    fn issue(
        &self,
        template: &Template,
        number: DocumentCode,
        values: ValueMap,
        now: DateTime<Utc>,
    ) -> Result<GeneratedDocument, PipelineError> {
        let rendered = self.render(template, &values)?;

        info!(
            template = %template.id,
            document_number = %number,
            complete = rendered.coverage.complete,
            "generated document"
        );

        Ok(GeneratedDocument {
            id: Uuid::new_v4().to_string(),
            template_id: template.id.clone(),
            template_version: template.template_version.clone(),
            engine_version: ENGINE_VERSION.to_string(),
            kind: template.kind,
            document_number: number,
            created_at: now,
            regenerated_at: None,
            content_hash: rendered.content_hash,
            coverage: rendered.coverage,
            generation_data: values,
            body: rendered.body,
        })
    }

    fn render(&self, template: &Template, values: &ValueMap) -> Result<Rendered, PipelineError> {
        let placeholders = template.variables();
        let coverage = self.validator.validate(
            &CoverageInput { placeholders: &placeholders, values },
            template,
        );
        for name in coverage.missing() {
            warn!(template = %template.id, placeholder = %name, "no value supplied, placeholder kept");
        }

        let body = match &template.body {
            DocumentBody::Rich(doc) => {
                let mut doc = doc.clone();
                substitute(&mut doc, values);
                DocumentBody::Rich(doc)
            }
            DocumentBody::Text(text) => DocumentBody::Text(substitute_text(text, values)),
        };
        let content_hash = body_fingerprint(&body)?;

        Ok(Rendered { body, coverage, content_hash })
    }

    fn check_engine_version(&self, template: &Template) -> Result<(), PipelineError> {
        let engine_ver = semver::Version::parse(ENGINE_VERSION)
            .map_err(|_| PipelineError::InvalidVersion(ENGINE_VERSION.to_string()))?;
        let min_ver = semver::Version::parse(&template.engine_min_version)
            .map_err(|_| PipelineError::InvalidVersion(template.engine_min_version.clone()))?;

        if engine_ver < min_ver {
            return Err(PipelineError::EngineVersionMismatch(
                template.template_version.clone(),
                template.engine_min_version.clone(),
                ENGINE_VERSION.to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for GenerationPipeline {
    fn default() -> Self {
        Self::new(TemplateRegistry::default(), GeneratorConfig::default())
    }
}
