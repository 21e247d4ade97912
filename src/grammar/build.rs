//! Build side: resolve both grammars and write them to their configured paths.

use super::document::{OutputFormat, ResolvedGrammar};
use super::error::GrammarError;
use super::kind::GrammarKind;
use super::variables::{unresolved_placeholders, UnresolvedPlaceholder};
use crate::settings::Settings;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// A grammar written to disk
#[derive(Debug, Clone)]
pub struct BuiltGrammar {
    pub kind: GrammarKind,
    pub output: PathBuf,
    /// Placeholders that survived resolution (written verbatim)
    pub unresolved: Vec<UnresolvedPlaceholder>,
}

/// Outcome of building one grammar kind
#[derive(Debug)]
pub struct BuildOutcome {
    pub kind: GrammarKind,
    pub result: Result<BuiltGrammar, GrammarError>,
}

/// Serialize `grammar` and write it to `path`, creating parent folders as needed.
pub fn write_grammar(
    grammar: &ResolvedGrammar,
    path: &Path,
    format: OutputFormat,
) -> Result<(), GrammarError> {
    let bytes = grammar.encode(format)?;
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| GrammarError::io(parent, e))?;
    }
    fs::write(path, bytes).map_err(|e| GrammarError::io(path, e))
}

/// Load, resolve and write one grammar kind.
pub fn build_grammar(settings: &Settings, kind: GrammarKind) -> Result<BuiltGrammar, GrammarError> {
    let entry = settings.grammars.get(kind);
    let grammar = entry.loader().load_file(&entry.source)?;

    let unresolved = unresolved_placeholders(&grammar);
    for placeholder in &unresolved {
        warn!(
            %kind,
            path = %placeholder.path,
            field = %placeholder.field,
            name = %placeholder.name,
            "placeholder left unresolved"
        );
    }

    let output = settings.output_path(kind);
    write_grammar(&grammar, &output, settings.build.format)?;
    info!(%kind, output = %output.display(), "wrote grammar");

    Ok(BuiltGrammar {
        kind,
        output,
        unresolved,
    })
}

/// Build every grammar kind. One kind failing does not stop the other.
pub fn build_grammars(settings: &Settings) -> Vec<BuildOutcome> {
    GrammarKind::ALL
        .into_iter()
        .map(|kind| {
            let result = build_grammar(settings, kind);
            if let Err(err) = &result {
                warn!(%kind, error = %err, "grammar build failed");
            }
            BuildOutcome { kind, result }
        })
        .collect()
}
