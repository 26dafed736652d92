//! Documents and imports

use std::collections::{BTreeMap, HashSet};

use super::{EntityData, EntityId, EntityKind, Model};
use crate::error::{ModelError, ModelResult};
use crate::events::Event;

#[derive(Debug, Clone, Default)]
pub struct DocumentData {
    pub(crate) uri: Option<String>,
    pub(crate) version: Option<String>,
}

impl DocumentData {
    pub fn uri(&self) -> Option<&str> {
        self.uri.as_deref()
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ImportData {
    pub(crate) uri: String,
    /// `(original struct name, local name)`
    pub(crate) struct_aliases: Vec<(String, String)>,
    pub(crate) document: Option<EntityId>,
    pub(crate) failure: Option<String>,
}

impl ImportData {
    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn struct_aliases(&self) -> &[(String, String)] {
        &self.struct_aliases
    }

    pub fn document(&self) -> Option<EntityId> {
        self.document
    }

    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }
}

impl Model {
    /* ===================== Documents ===================== */

    pub fn create_document(
        &mut self,
        uri: Option<&str>,
        version: Option<&str>,
    ) -> ModelResult<EntityId> {
        let document = self.create(EntityKind::Document, None)?;
        if let EntityData::Document(data) = &mut self.node_mut(document)?.data {
            data.uri = uri.map(str::to_string);
            data.version = version.map(str::to_string);
        }
        Ok(document)
    }

    pub fn document(&self, id: EntityId) -> ModelResult<&DocumentData> {
        match &self.node(id)?.data {
            EntityData::Document(data) => Ok(data),
            _ => Err(ModelError::WrongKind {
                id,
                expected: "document",
            }),
        }
    }

    /// Document whose uri is `uri`
    pub fn document_by_uri(&self, uri: &str) -> Option<EntityId> {
        self.documents()
            .iter()
            .copied()
            .find(|doc| self.document(*doc).is_ok_and(|data| data.uri() == Some(uri)))
    }

    /* ===================== Imports ===================== */

    pub fn add_import(
        &mut self,
        document: EntityId,
        uri: &str,
        alias: Option<&str>,
        struct_aliases: Vec<(String, String)>,
    ) -> ModelResult<EntityId> {
        self.ensure_live(document)?;
        let import = self.create(EntityKind::Import, None)?;
        let node = self.node_mut(import)?;
        node.alias = alias.map(str::to_string);
        if let EntityData::Import(data) = &mut node.data {
            data.uri = uri.to_string();
            data.struct_aliases = struct_aliases;
        }
        if let Err(err) = self.set_parent(import, Some(document)) {
            self.mark_destroyed(import);
            return Err(err);
        }
        Ok(import)
    }

    pub fn import(&self, id: EntityId) -> ModelResult<&ImportData> {
        match &self.node(id)?.data {
            EntityData::Import(data) => Ok(data),
            _ => Err(ModelError::WrongKind {
                id,
                expected: "import",
            }),
        }
    }

    /// Namespace of an import: its alias, or the file stem of its uri
    pub fn import_namespace(&self, import: EntityId) -> Option<String> {
        if let Some(alias) = self.alias(import) {
            return Some(alias.to_string());
        }
        let uri = self.import(import).ok()?.uri.as_str();
        let file = uri.rsplit(['/', '\\']).next().unwrap_or(uri);
        let stem = file.strip_suffix(".wdl").unwrap_or(file);
        (!stem.is_empty()).then(|| stem.to_string())
    }

    /// Record the outcome of loading an import
    ///
    /// Spreads `TreeChanged` from the importing document so calls and struct
    /// types re-resolve against the new namespace.
    pub fn set_import_document(
        &mut self,
        import: EntityId,
        loaded: Result<EntityId, String>,
    ) -> ModelResult<()> {
        let (document, failure) = match loaded {
            Ok(document) => (Some(document), None),
            Err(failure) => (None, Some(failure)),
        };
        match &mut self.node_mut(import)?.data {
            EntityData::Import(data) => {
                data.document = document;
                data.failure = failure;
            }
            _ => {
                return Err(ModelError::WrongKind {
                    id: import,
                    expected: "import",
                })
            }
        }
        self.emit(import, Event::ImportLoaded { document });
        let root = self.root(import);
        self.spread_from(root, Event::TreeChanged { source: import });
        Ok(())
    }

    /// Clear imports pointing at a destroyed document
    pub(crate) fn forget_imported_document(&mut self, document: EntityId) {
        for node in self.entities.values_mut() {
            if let EntityData::Import(data) = &mut node.data {
                if data.document == Some(document) {
                    data.document = None;
                }
            }
        }
    }

    /* ===================== Lookup ===================== */

    /// Find a task or workflow by `name` or `namespace.name`
    pub fn find_executable(&self, document: EntityId, name: &str) -> Option<EntityId> {
        self.find_executable_in(document, name, &mut HashSet::new())
    }

    fn find_executable_in(
        &self,
        document: EntityId,
        name: &str,
        visited: &mut HashSet<EntityId>,
    ) -> Option<EntityId> {
        if !visited.insert(document) {
            return None;
        }
        match name.split_once('.') {
            Some((namespace, rest)) => self
                .children_of_kind(document, EntityKind::Import)
                .into_iter()
                .filter(|import| self.import_namespace(*import).as_deref() == Some(namespace))
                .filter_map(|import| self.import(import).ok()?.document)
                .find_map(|imported| self.find_executable_in(imported, rest, visited)),
            None => self.children(document).iter().copied().find(|child| {
                child.kind().is_executable() && self.name(*child) == Some(name)
            }),
        }
    }

    /// Structs visible in `document`: its own plus every imported struct,
    /// under its import alias where one is given
    ///
    /// Structs are not namespace-qualified; a local definition shadows an
    /// imported one of the same name.
    pub fn global_structs(&self, document: EntityId) -> BTreeMap<String, EntityId> {
        let mut structs = BTreeMap::new();
        self.collect_structs(document, &mut structs, &mut HashSet::new());
        structs
    }

    fn collect_structs(
        &self,
        document: EntityId,
        structs: &mut BTreeMap<String, EntityId>,
        visited: &mut HashSet<EntityId>,
    ) {
        if !visited.insert(document) {
            return;
        }
        for structure in self.children_of_kind(document, EntityKind::Struct) {
            if let Some(name) = self.name(structure) {
                structs.entry(name.to_string()).or_insert(structure);
            }
        }

        for import in self.children_of_kind(document, EntityKind::Import) {
            let Ok(data) = self.import(import) else {
                continue;
            };
            let Some(imported) = data.document else {
                continue;
            };
            let mut nested = BTreeMap::new();
            self.collect_structs(imported, &mut nested, visited);
            for (name, structure) in nested {
                let local = data
                    .struct_aliases
                    .iter()
                    .find(|(original, _)| *original == name)
                    .map_or(name, |(_, alias)| alias.clone());
                structs.entry(local).or_insert(structure);
            }
        }
        visited.remove(&document);
    }

    /// The struct [`global_structs`](Self::global_structs) would list under
    /// `name`, looked up without collecting the others
    pub fn find_struct(&self, document: EntityId, name: &str) -> Option<EntityId> {
        self.find_struct_in(document, name, &mut HashSet::new())
    }

    fn find_struct_in(
        &self,
        document: EntityId,
        name: &str,
        visited: &mut HashSet<EntityId>,
    ) -> Option<EntityId> {
        if !visited.insert(document) {
            return None;
        }
        let mut found = self
            .children_of_kind(document, EntityKind::Struct)
            .into_iter()
            .find(|structure| self.name(*structure) == Some(name));

        for import in self.children_of_kind(document, EntityKind::Import) {
            if found.is_some() {
                break;
            }
            let Ok(data) = self.import(import) else {
                continue;
            };
            let Some(imported) = data.document else {
                continue;
            };
            let original = match data.struct_aliases.iter().find(|(_, alias)| alias == name) {
                Some((original, _)) => original.as_str(),
                None if data.struct_aliases.iter().any(|(original, _)| original == name) => {
                    continue
                }
                None => name,
            };
            found = self.find_struct_in(imported, original, visited);
        }
        visited.remove(&document);
        found
    }
}
