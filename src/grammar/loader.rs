//! Grammar loading: read a YAML document, resolve its variables, hand back a
//! self-contained grammar.
//!
//! The variable table can be rewritten by a hook before resolution. The default hook
//! is the identity; [`GrammarLoader::with_overrides`] installs the language-specific
//! override used by configuration files.

use super::document::{RawGrammar, ResolvedGrammar, VariableTable};
use super::error::GrammarError;
use super::variables::VariableResolver;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Rewrites a grammar's variable table before it is resolved
pub type VariableHook = Arc<dyn Fn(VariableTable) -> VariableTable + Send + Sync>;

/// Loads and resolves grammar documents
#[derive(Clone, Default)]
pub struct GrammarLoader {
    hook: Option<VariableHook>,
}

impl GrammarLoader {
    /// Loader that resolves variables exactly as declared
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a hook that rewrites the variable table before resolution
    pub fn with_variable_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(VariableTable) -> VariableTable + Send + Sync + 'static,
    {
        self.hook = Some(Arc::new(hook));
        self
    }

    /// Install a hook that applies `overrides` (see [`apply_overrides`])
    pub fn with_overrides(self, overrides: BTreeMap<String, String>) -> Self {
        if overrides.is_empty() {
            return self;
        }
        self.with_variable_hook(move |variables| apply_overrides(variables, &overrides))
    }

    /// Load a grammar from YAML text. `origin` names the document in errors.
    pub fn load_str(&self, origin: &str, text: &str) -> Result<ResolvedGrammar, GrammarError> {
        let value: serde_yaml::Value =
            serde_yaml::from_str(text).map_err(|e| GrammarError::malformed(origin, e))?;
        let raw = RawGrammar::from_value(value).map_err(|e| GrammarError::malformed(origin, e))?;
        self.resolve(origin, raw)
    }

    /// Read and load a grammar file.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<ResolvedGrammar, GrammarError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| GrammarError::io(path, e))?;
        self.load_str(&path.display().to_string(), &text)
    }

    /// Resolve an already deserialized grammar.
    pub fn resolve(&self, origin: &str, raw: RawGrammar) -> Result<ResolvedGrammar, GrammarError> {
        let RawGrammar { body, variables } = raw;
        let variables = match &self.hook {
            Some(hook) => hook(variables),
            None => variables,
        };
        let resolver = VariableResolver::new(&variables)?;
        debug!(
            origin,
            variables = resolver.len(),
            rules = body.repository.as_ref().map_or(0, |repository| repository.len()),
            "resolving grammar variables"
        );
        Ok(ResolvedGrammar::from_body(resolver.resolve(&body)))
    }
}

impl fmt::Debug for GrammarLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GrammarLoader")
            .field("hook", &self.hook.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

/// Replace same-named variables in place and append the remaining overrides.
///
/// Replaced variables keep their declaration position, so earlier variables still
/// cannot see them; appended ones come last in name order.
pub fn apply_overrides(
    mut variables: VariableTable,
    overrides: &BTreeMap<String, String>,
) -> VariableTable {
    for (name, pattern) in overrides {
        variables.insert(name.clone(), pattern.clone());
    }
    variables
}
