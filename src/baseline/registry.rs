//! Process-scoped cache of compiled grammars
//!
//! The registry is built once, before any document is traced, and is read-only
//! afterwards. Both grammar kinds load as independent blocking tasks that are awaited
//! together; a kind that fails to load is remembered as unavailable and only the
//! documents that need it fail.

use super::error::BaselineError;
use crate::grammar::{GrammarKind, GrammarLoader, ResolvedGrammar};
use crate::scan::{LineTokenizer, ScannerBackend};
use crate::settings::Settings;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

/// A resolved grammar together with its compiled tokenizer
#[derive(Debug)]
pub struct LoadedGrammar<T> {
    pub kind: GrammarKind,
    /// File name shown in report banners, e.g. `4GL.tmLanguage`
    pub file_name: String,
    pub grammar: Arc<ResolvedGrammar>,
    pub tokenizer: T,
}

impl<T> LoadedGrammar<T> {
    pub fn new(
        kind: GrammarKind,
        file_name: impl Into<String>,
        grammar: Arc<ResolvedGrammar>,
        tokenizer: T,
    ) -> Self {
        LoadedGrammar {
            kind,
            file_name: file_name.into(),
            grammar,
            tokenizer,
        }
    }
}

type Slot<T> = Result<Arc<LoadedGrammar<T>>, String>;

/// Compiled grammars keyed by kind
#[derive(Debug)]
pub struct GrammarRegistry<T> {
    source: Slot<T>,
    form: Slot<T>,
}

/// What the registry needs to load one grammar kind
#[derive(Debug, Clone)]
struct LoadRequest {
    kind: GrammarKind,
    path: PathBuf,
    file_name: String,
    loader: GrammarLoader,
}

impl<T: LineTokenizer + 'static> GrammarRegistry<T> {
    /// Registry over grammars that are already compiled
    pub fn from_grammars(source: LoadedGrammar<T>, form: LoadedGrammar<T>) -> Self {
        GrammarRegistry {
            source: Ok(Arc::new(source)),
            form: Ok(Arc::new(form)),
        }
    }

    /// Load, resolve and compile both grammar kinds concurrently.
    pub async fn load<B>(settings: &Settings, backend: Arc<B>) -> Self
    where
        B: ScannerBackend<Tokenizer = T> + 'static,
    {
        let request = |kind: GrammarKind| {
            let entry = settings.grammars.get(kind);
            LoadRequest {
                kind,
                path: entry.source.clone(),
                file_name: entry.display_name(),
                loader: entry.loader(),
            }
        };

        let (source, form) = tokio::join!(
            load_slot(request(GrammarKind::Source), Arc::clone(&backend)),
            load_slot(request(GrammarKind::Form), backend),
        );
        GrammarRegistry { source, form }
    }

    /// The loaded grammar of `kind`, or why it is unavailable
    pub fn get(&self, kind: GrammarKind) -> Result<&LoadedGrammar<T>, BaselineError> {
        let slot = match kind {
            GrammarKind::Source => &self.source,
            GrammarKind::Form => &self.form,
        };
        slot.as_deref()
            .map_err(|reason| BaselineError::GrammarUnavailable {
                kind,
                reason: reason.clone(),
            })
    }

    pub fn is_loaded(&self, kind: GrammarKind) -> bool {
        self.get(kind).is_ok()
    }
}

async fn load_slot<B>(request: LoadRequest, backend: Arc<B>) -> Slot<B::Tokenizer>
where
    B: ScannerBackend + 'static,
{
    let kind = request.kind;
    let task = tokio::task::spawn_blocking(move || load_blocking(request, backend.as_ref()));
    let loaded = match task.await {
        Ok(result) => result.map_err(|err| err.to_string()),
        Err(join_error) => Err(join_error.to_string()),
    };
    match loaded {
        Ok(grammar) => {
            debug!(%kind, file = %grammar.file_name, "grammar loaded");
            Ok(Arc::new(grammar))
        }
        Err(reason) => {
            warn!(%kind, %reason, "grammar failed to load");
            Err(reason)
        }
    }
}

fn load_blocking<B: ScannerBackend>(
    request: LoadRequest,
    backend: &B,
) -> Result<LoadedGrammar<B::Tokenizer>, BaselineError> {
    let grammar = request.loader.load_file(&request.path)?;
    let tokenizer = backend.compile(request.kind, &grammar)?;
    Ok(LoadedGrammar::new(
        request.kind,
        request.file_name,
        Arc::new(grammar),
        tokenizer,
    ))
}
