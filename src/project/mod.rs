//! Projects: document loading and import resolution
//!
//! A [`Project`] owns a [`Model`] and loads documents into it through two
//! injected collaborators: a [`ContentResolver`] (uri to text) and a
//! [`DocumentParser`] (text to construction payload).
//!
//! Loading happens in two phases per document:
//!
//! 1. fetch, parse and build, memoized per resolved uri so concurrent
//!    requests for one uri share a single fetch and a single build;
//! 2. resolve the document's imports.
//!
//! The whole load is memoized per uri as well, so every caller of
//! [`Project::load`] sees the imports resolved. A load only waits on an
//! import's full load when that import is not already waiting (directly or
//! through other loads) on the importer; inside a cycle the import is bound
//! to the built document instead.
//!
//! A failing import is recorded on its Import entity and never aborts its
//! siblings. Exceeding `max_import_depth` fails the whole load.

mod resolver;

use std::cell::{Ref, RefCell, RefMut};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::path::{Component, Path, PathBuf};
use std::pin::Pin;
use std::rc::Rc;

use tokio::sync::OnceCell;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::Settings;
use crate::error::{ModelError, ModelResult};
use crate::model::{EntityId, EntityKind, Model};
use crate::payload::{DocumentParser, JsonDocumentParser};

pub use resolver::{ContentResolver, FsResolver, MemoryResolver};

#[cfg(test)]
mod tests;

type LocalBoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

type LoadCell = Rc<OnceCell<ModelResult<EntityId>>>;

pub struct Project {
    model: RefCell<Model>,
    resolver: Rc<dyn ContentResolver>,
    parser: Rc<dyn DocumentParser>,
    settings: Settings,
    /// Build outcome per resolved uri
    builds: RefCell<HashMap<String, LoadCell>>,
    /// Full load outcome (build plus imports) per resolved uri
    loads: RefCell<HashMap<String, LoadCell>>,
    /// Import loads in flight: importer uri to the uris it is waiting on
    waits: RefCell<HashMap<String, HashSet<String>>>,
}

impl Project {
    pub fn new(
        settings: Settings,
        resolver: Rc<dyn ContentResolver>,
        parser: Rc<dyn DocumentParser>,
    ) -> Self {
        Self {
            model: RefCell::new(Model::new()),
            resolver,
            parser,
            settings,
            builds: RefCell::new(HashMap::new()),
            loads: RefCell::new(HashMap::new()),
            waits: RefCell::new(HashMap::new()),
        }
    }

    /// Project reading JSON payloads from the file system
    pub fn with_fs(settings: Settings) -> Self {
        Self::new(
            settings,
            Rc::new(FsResolver),
            Rc::new(JsonDocumentParser),
        )
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn model(&self) -> Ref<'_, Model> {
        self.model.borrow()
    }

    /// Mutable access to the model
    ///
    /// Do not hold the guard across an `.await` on this project.
    pub fn model_mut(&self) -> RefMut<'_, Model> {
        self.model.borrow_mut()
    }

    /// Resolved uris loaded so far (successfully or not)
    pub fn loaded_uris(&self) -> Vec<String> {
        let mut uris: Vec<String> = self.builds.borrow().keys().cloned().collect();
        uris.sort();
        uris
    }

    /// Load a top-level document and, transitively, its imports
    ///
    /// Relative uris are resolved against `base_dir` from the settings.
    pub async fn load(&self, uri: &str) -> ModelResult<EntityId> {
        let resolved = match &self.settings.base_dir {
            Some(dir) if parse_url(uri).is_none() && Path::new(uri).is_relative() => {
                normalize(&dir.join(uri))
            }
            _ => resolve_uri(None, uri),
        };
        info!(uri = %resolved, "loading document");
        self.load_at(resolved, 0).await
    }

    fn load_at(&self, uri: String, depth: usize) -> LocalBoxFuture<'_, ModelResult<EntityId>> {
        Box::pin(async move {
            if depth > self.settings.max_import_depth {
                warn!(uri = %uri, depth, "import recursion depth exceeded");
                return Err(ModelError::RecursionDepthExceeded {
                    uri,
                    depth: self.settings.max_import_depth,
                });
            }

            let cell = self.loads.borrow_mut().entry(uri.clone()).or_default().clone();
            match cell.get_or_init(|| self.load_uncached(&uri, depth)).await {
                Ok(document) => Ok(*document),
                Err(err) => {
                    // depth failures belong to the chain that got here
                    if matches!(err, ModelError::RecursionDepthExceeded { .. }) {
                        let mut loads = self.loads.borrow_mut();
                        if loads.get(&uri).is_some_and(|memo| Rc::ptr_eq(memo, &cell)) {
                            loads.remove(&uri);
                        }
                    }
                    Err(share_error(&uri, err))
                }
            }
        })
    }

    async fn load_uncached(&self, uri: &str, depth: usize) -> ModelResult<EntityId> {
        let document = self.build(uri).await?;
        self.resolve_imports(document, uri, depth).await?;
        Ok(document)
    }

    async fn build(&self, uri: &str) -> ModelResult<EntityId> {
        let cell = self.builds.borrow_mut().entry(uri.to_string()).or_default().clone();
        match cell.get_or_init(|| self.fetch_and_build(uri)).await {
            Ok(document) => Ok(*document),
            Err(err) => Err(share_error(uri, err)),
        }
    }

    /// Whether the load of `from` is waiting, through any chain of import
    /// loads, on the load of `to`
    fn waits_on(&self, from: &str, to: &str) -> bool {
        let waits = self.waits.borrow();
        let mut seen = HashSet::new();
        let mut pending = vec![from];
        while let Some(current) = pending.pop() {
            if current == to {
                return true;
            }
            if !seen.insert(current) {
                continue;
            }
            if let Some(targets) = waits.get(current) {
                pending.extend(targets.iter().map(String::as_str));
            }
        }
        false
    }

    /// Full load of an import of `uri`, or just its build inside a cycle
    async fn load_import(&self, uri: &str, target: &str, depth: usize) -> ModelResult<EntityId> {
        if self.waits_on(target, uri) {
            debug!(uri, import = target, "import cycle");
            return self.build(target).await;
        }

        self.waits
            .borrow_mut()
            .entry(uri.to_string())
            .or_default()
            .insert(target.to_string());
        let loaded = self.load_at(target.to_string(), depth + 1).await;
        if let Some(targets) = self.waits.borrow_mut().get_mut(uri) {
            targets.remove(target);
        }
        loaded
    }

    async fn fetch_and_build(&self, uri: &str) -> ModelResult<EntityId> {
        let text = self
            .resolver
            .resolve(uri)
            .await
            .map_err(|err| ModelError::Load {
                uri: uri.to_string(),
                cause: format!("{err:#}"),
            })?;

        let mut payload = self.parser.parse(&text).map_err(|err| ModelError::Load {
            uri: uri.to_string(),
            cause: err.to_string(),
        })?;
        if payload.version.is_none() {
            payload.version = Some(self.settings.default_version.clone());
        }

        let document = self.model.borrow_mut().build_document(&payload, Some(uri))?;
        debug!(uri, document = %document, "document built");
        Ok(document)
    }

    async fn resolve_imports(
        &self,
        document: EntityId,
        uri: &str,
        depth: usize,
    ) -> ModelResult<()> {
        let imports: Vec<(EntityId, String)> = {
            let model = self.model.borrow();
            model
                .children_of_kind(document, EntityKind::Import)
                .into_iter()
                .filter_map(|import| {
                    let target = model.import(import).ok()?.uri().to_string();
                    Some((import, resolve_uri(Some(uri), &target)))
                })
                .collect()
        };

        for (import, target) in imports {
            let loaded = match self.load_import(uri, &target, depth).await {
                Ok(imported) => Ok(imported),
                Err(err @ ModelError::RecursionDepthExceeded { .. }) => {
                    self.model
                        .borrow_mut()
                        .set_import_document(import, Err(err.to_string()))?;
                    return Err(err);
                }
                Err(err) => {
                    warn!(uri = %target, error = %err, "import failed");
                    Err(err.to_string())
                }
            };
            self.model.borrow_mut().set_import_document(import, loaded)?;
        }
        Ok(())
    }
}

/// Rebuild a memoized failure for another waiter
fn share_error(uri: &str, err: &ModelError) -> ModelError {
    match err {
        ModelError::Load { uri: failed, cause } => ModelError::Load {
            uri: failed.clone(),
            cause: cause.clone(),
        },
        ModelError::RecursionDepthExceeded { uri: failed, depth } => {
            ModelError::RecursionDepthExceeded {
                uri: failed.clone(),
                depth: *depth,
            }
        }
        other => ModelError::Load {
            uri: uri.to_string(),
            cause: other.to_string(),
        },
    }
}

/* ===================== URI resolution ===================== */

/// Resolve `uri` relative to the document at `base`
///
/// Scheme uris are joined with [`Url::join`]; plain paths are joined to the
/// base's directory and normalized lexically.
pub fn resolve_uri(base: Option<&str>, uri: &str) -> String {
    if let Some(url) = parse_url(uri) {
        return url.to_string();
    }
    let Some(base) = base else {
        return normalize(Path::new(uri));
    };
    if let Some(joined) = parse_url(base).and_then(|base| base.join(uri).ok()) {
        return joined.to_string();
    }
    let directory = Path::new(base).parent().unwrap_or_else(|| Path::new(""));
    normalize(&directory.join(uri))
}

/// Single-letter schemes are drive letters, not urls
fn parse_url(text: &str) -> Option<Url> {
    Url::parse(text).ok().filter(|url| url.scheme().len() > 1)
}

fn normalize(path: &Path) -> String {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !result.pop() {
                    result.push("..");
                }
            }
            other => result.push(other),
        }
    }
    result.to_string_lossy().into_owned()
}
