//! Expressions and the dependency resolver
//!
//! An expression holds a value: nothing, free text, or a direct reference to
//! another expression. Text is run through the injected
//! [`DependencyExtractor`]; every identifier path it yields becomes a
//! [`Dependency`] which the resolver tries to bind to a parameter in scope.
//! Bound dependencies are mirrored as inbound/outbound connections on both
//! endpoints.

mod binding;
mod extractor;
mod reference;
mod resolver;

use crate::error::{ModelError, ModelResult};
use crate::events::Event;
use crate::model::{EntityId, Model};

pub use binding::BindingError;
pub use extractor::{DependencyExtractor, ExtractError, ExtractedIdentifier, PestExtractor};


/* ===================== Values ===================== */

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ExpressionValue {
    #[default]
    Undefined,
    Text(String),
    /// Explicit binding to another expression
    Reference(EntityId),
}

impl ExpressionValue {
    pub fn is_undefined(&self) -> bool {
        matches!(self, ExpressionValue::Undefined)
    }
}

/// Why a dependency has no source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyProblem {
    /// No candidate in scope matches the identifier
    Unresolved,
    /// A rename made the identifier point somewhere else
    Ambiguous,
    /// Candidates matched, but none may legally be bound
    Illegal(BindingError),
}

/// One identifier an expression depends on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub identifier: String,
    pub source: Option<EntityId>,
    pub problem: Option<DependencyProblem>,
}

impl Dependency {
    pub(crate) fn resolved(identifier: impl Into<String>, source: EntityId) -> Self {
        Self {
            identifier: identifier.into(),
            source: Some(source),
            problem: None,
        }
    }

    pub(crate) fn unresolved(identifier: impl Into<String>, problem: DependencyProblem) -> Self {
        Self {
            identifier: identifier.into(),
            source: None,
            problem: Some(problem),
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.source.is_some()
    }
}

/// Expression state shared by parameters and bare expressions
#[derive(Debug, Clone, Default)]
pub struct ExpressionData {
    pub(crate) value: ExpressionValue,
    pub(crate) dependencies: Vec<Dependency>,
    /// Expressions this one depends on
    pub(crate) inbound: Vec<EntityId>,
    /// Expressions depending on this one
    pub(crate) outbound: Vec<EntityId>,
    pub(crate) extract_error: Option<ExtractError>,
}

impl ExpressionData {
    pub fn value(&self) -> &ExpressionValue {
        &self.value
    }

    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    pub fn inbound(&self) -> &[EntityId] {
        &self.inbound
    }

    pub fn outbound(&self) -> &[EntityId] {
        &self.outbound
    }

    pub fn extract_error(&self) -> Option<&ExtractError> {
        self.extract_error.as_ref()
    }
}

/* ===================== Model API ===================== */

impl Model {
    pub(crate) fn expression_data(&self, id: EntityId) -> ModelResult<&ExpressionData> {
        self.node(id)?
            .expression()
            .ok_or(ModelError::WrongKind {
                id,
                expected: "expression",
            })
    }

    fn expression_data_mut(&mut self, id: EntityId) -> ModelResult<&mut ExpressionData> {
        self.node_mut(id)?
            .expression_mut()
            .ok_or(ModelError::WrongKind {
                id,
                expected: "expression",
            })
    }

    pub fn value(&self, id: EntityId) -> ModelResult<&ExpressionValue> {
        Ok(&self.expression_data(id)?.value)
    }

    /// Whether the expression holds text or a reference
    pub fn has_value(&self, id: EntityId) -> bool {
        self.expression_data(id)
            .map(|expression| match &expression.value {
                ExpressionValue::Undefined => false,
                ExpressionValue::Text(text) => !text.trim().is_empty(),
                ExpressionValue::Reference(_) => true,
            })
            .unwrap_or(false)
    }

    /// Value as source text; a reference renders relative to `id`
    pub fn expression_text(&self, id: EntityId) -> ModelResult<Option<String>> {
        Ok(match &self.expression_data(id)?.value {
            ExpressionValue::Undefined => None,
            ExpressionValue::Text(text) => Some(text.clone()),
            ExpressionValue::Reference(source) => Some(self.reference(*source, id)),
        })
    }

    pub fn dependencies(&self, id: EntityId) -> ModelResult<&[Dependency]> {
        Ok(&self.expression_data(id)?.dependencies)
    }

    pub fn inbound(&self, id: EntityId) -> ModelResult<&[EntityId]> {
        Ok(&self.expression_data(id)?.inbound)
    }

    pub fn outbound(&self, id: EntityId) -> ModelResult<&[EntityId]> {
        Ok(&self.expression_data(id)?.outbound)
    }

    /// The dependency, when the whole value is one identifier path
    pub(crate) fn sole_dependency(&self, id: EntityId) -> Option<&Dependency> {
        let expression = self.expression_data(id).ok()?;
        let [dependency] = expression.dependencies.as_slice() else {
            return None;
        };
        match &expression.value {
            ExpressionValue::Text(text) if text.trim() == dependency.identifier => Some(dependency),
            ExpressionValue::Reference(_) => Some(dependency),
            _ => None,
        }
    }

    /// Replace the value and re-resolve dependencies
    ///
    /// A `Reference` value goes through [`bind`](Model::bind) and its
    /// legality checks.
    pub fn set_value(&mut self, id: EntityId, value: ExpressionValue) -> ModelResult<()> {
        if let ExpressionValue::Reference(source) = value {
            return self.bind(id, source);
        }
        self.store_value(id, value)
    }

    /// Set free text; blank text clears the value
    pub fn set_text(&mut self, id: EntityId, text: &str) -> ModelResult<()> {
        let value = if text.trim().is_empty() {
            ExpressionValue::Undefined
        } else {
            ExpressionValue::Text(text.to_string())
        };
        self.store_value(id, value)
    }

    /// Bind `target` directly to `source`
    ///
    /// Fails with a [`BindingError`] when the binding is structurally illegal
    /// or the effective types are incompatible; the graph is left unchanged.
    pub fn bind(&mut self, target: EntityId, source: EntityId) -> ModelResult<()> {
        self.ensure_live(source)?;
        self.expression_data(target)?;
        self.check_structure(source, target)?;
        self.check_types(source, target, None)?;
        self.store_value(target, ExpressionValue::Reference(source))
    }

    /// Clear the value, dropping every connection into `target`
    pub fn unbind(&mut self, target: EntityId) -> ModelResult<()> {
        self.store_value(target, ExpressionValue::Undefined)
    }

    fn store_value(&mut self, id: EntityId, value: ExpressionValue) -> ModelResult<()> {
        let expression = self.expression_data_mut(id)?;
        if expression.value == value {
            return Ok(());
        }
        expression.value = value;
        // a fresh value gets a fresh search, even for flagged identifiers
        for dependency in &mut expression.dependencies {
            if dependency.problem == Some(DependencyProblem::Ambiguous) {
                dependency.problem = Some(DependencyProblem::Unresolved);
            }
        }
        self.resolve(id)?;
        self.emit(id, Event::ValueChanged);
        Ok(())
    }
}
