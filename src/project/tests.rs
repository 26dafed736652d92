//! Tests for document loading and import resolution

use std::rc::Rc;

use anyhow::Result;
use async_trait::async_trait;

use super::*;
use crate::model::EntityKind;

// ============================================================================
// Helper Functions
// ============================================================================

fn project_with(settings: Settings, resolver: MemoryResolver) -> (Project, Rc<MemoryResolver>) {
    let resolver = Rc::new(resolver);
    let project = Project::new(settings, resolver.clone(), Rc::new(JsonDocumentParser));
    (project, resolver)
}

fn project(resolver: MemoryResolver) -> (Project, Rc<MemoryResolver>) {
    project_with(Settings::default(), resolver)
}

/// Serves `slow` only after letting other tasks run for a while
struct SlowResolver {
    inner: MemoryResolver,
    slow: &'static str,
}

#[async_trait(?Send)]
impl ContentResolver for SlowResolver {
    async fn resolve(&self, uri: &str) -> Result<String> {
        if uri == self.slow {
            for _ in 0..20 {
                tokio::task::yield_now().await;
            }
        }
        self.inner.resolve(uri).await
    }
}

fn imports_of(project: &Project, document: EntityId) -> Vec<EntityId> {
    project
        .model()
        .children_of_kind(document, EntityKind::Import)
}

const LIBRARY: &str = r#"{
    "tasks": [{
        "name": "index",
        "inputs": [{"name": "x", "type": "Int"}],
        "outputs": [{"name": "o", "type": "Int", "expression": "x"}],
        "command": {"text": "echo ~{x}"}
    }]
}"#;

const MAIN: &str = r#"{
    "imports": [{"uri": "lib.wdl", "alias": "lib"}],
    "workflows": [{
        "name": "main",
        "inputs": [{"name": "n", "type": "Int"}],
        "body": [
            {"kind": "call", "target": "lib.index", "inputs": [{"name": "x", "expression": "n"}]}
        ],
        "outputs": [{"name": "r", "type": "Int", "expression": "index.o"}]
    }]
}"#;

// ============================================================================
// Loading
// ============================================================================

#[tokio::test]
async fn test_load_resolves_calls_through_imports() {
    let (project, _) = project(
        MemoryResolver::new()
            .with_file("main.wdl", MAIN)
            .with_file("lib.wdl", LIBRARY),
    );

    let main = project.load("main.wdl").await.unwrap();

    let mut model = project.model_mut();
    let library = model.document_by_uri("lib.wdl").unwrap();
    let task = model.find_executable(library, "index").unwrap();
    let workflow = model.find_executable(main, "main").unwrap();
    let call = model.find_by_name(workflow, EntityKind::Call, "lib.index").unwrap();
    assert_eq!(model.callee(call), Some(task));

    let issues = model.validate(main).unwrap();
    assert!(issues.iter().all(|issue| !issue.is_error()), "{issues:?}");
}

#[tokio::test]
async fn test_default_version_is_applied() {
    let (project, _) = project(
        MemoryResolver::new()
            .with_file("old.wdl", r#"{"version": "draft-2"}"#)
            .with_file("new.wdl", "{}"),
    );

    let old = project.load("old.wdl").await.unwrap();
    let new = project.load("new.wdl").await.unwrap();

    let model = project.model();
    assert_eq!(model.document(old).unwrap().version(), Some("draft-2"));
    assert_eq!(model.document(new).unwrap().version(), Some("1.0"));
}

#[tokio::test]
async fn test_concurrent_loads_share_one_fetch() {
    let (project, resolver) = project(MemoryResolver::new().with_file("a.wdl", LIBRARY));

    let (first, second) = tokio::join!(project.load("a.wdl"), project.load("./a.wdl"));

    assert_eq!(first.unwrap(), second.unwrap());
    assert_eq!(resolver.fetch_count(), 1);
    assert_eq!(project.model().documents().len(), 1);
    assert_eq!(project.loaded_uris(), vec!["a.wdl".to_string()]);
}

#[tokio::test]
async fn test_failed_load_is_memoized() {
    let (project, resolver) = project(MemoryResolver::new().with_file("bad.wdl", "{ not json"));

    for _ in 0..2 {
        let err = project.load("bad.wdl").await.unwrap_err();
        assert!(matches!(err, ModelError::Load { ref uri, .. } if uri == "bad.wdl"));
    }
    assert_eq!(resolver.fetch_count(), 1);
    assert!(project.model().documents().is_empty());
}

#[tokio::test]
async fn test_missing_document_is_a_load_error() {
    let (project, _) = project(MemoryResolver::new());

    let err = project.load("nowhere.wdl").await.unwrap_err();
    assert!(err.to_string().contains("no such document: nowhere.wdl"));
}

// ============================================================================
// Imports
// ============================================================================

#[tokio::test]
async fn test_import_cycle_terminates() {
    let (project, resolver) = project(
        MemoryResolver::new()
            .with_file("a.wdl", r#"{"imports": [{"uri": "b.wdl"}], "structs": [{"name": "A"}]}"#)
            .with_file("b.wdl", r#"{"imports": [{"uri": "a.wdl"}], "structs": [{"name": "B"}]}"#),
    );

    let a = project.load("a.wdl").await.unwrap();

    let model = project.model();
    let b = model.document_by_uri("b.wdl").unwrap();
    assert_eq!(resolver.fetch_count(), 2);

    let a_import = model.children_of_kind(a, EntityKind::Import)[0];
    let b_import = model.children_of_kind(b, EntityKind::Import)[0];
    assert_eq!(model.import(a_import).unwrap().document(), Some(b));
    assert_eq!(model.import(b_import).unwrap().document(), Some(a));

    let structs = model.global_structs(a);
    assert!(structs.contains_key("A"));
    assert!(structs.contains_key("B"));
}

#[tokio::test]
async fn test_concurrent_loads_both_see_resolved_imports() {
    let resolver = SlowResolver {
        inner: MemoryResolver::new()
            .with_file("main.wdl", MAIN)
            .with_file("lib.wdl", LIBRARY),
        slow: "lib.wdl",
    };
    let project = Project::new(
        Settings::default(),
        Rc::new(resolver),
        Rc::new(JsonDocumentParser),
    );

    let (first, second) = tokio::join!(project.load("main.wdl"), project.load("main.wdl"));

    for main in [first.unwrap(), second.unwrap()] {
        let import = imports_of(&project, main)[0];
        assert!(project.model().import(import).unwrap().document().is_some());
    }
}

#[tokio::test]
async fn test_concurrent_loads_of_a_cycle_complete() {
    let (project, resolver) = project(
        MemoryResolver::new()
            .with_file("a.wdl", r#"{"imports": [{"uri": "b.wdl"}]}"#)
            .with_file("b.wdl", r#"{"imports": [{"uri": "a.wdl"}]}"#),
    );

    let (a, b) = tokio::join!(project.load("a.wdl"), project.load("b.wdl"));
    let (a, b) = (a.unwrap(), b.unwrap());

    let model = project.model();
    let a_import = model.children_of_kind(a, EntityKind::Import)[0];
    let b_import = model.children_of_kind(b, EntityKind::Import)[0];
    assert_eq!(model.import(a_import).unwrap().document(), Some(b));
    assert_eq!(model.import(b_import).unwrap().document(), Some(a));
    assert_eq!(resolver.fetch_count(), 2);
}

#[tokio::test]
async fn test_recursion_depth_exceeded() {
    let settings = Settings {
        max_import_depth: 1,
        ..Settings::default()
    };
    let (project, _) = project_with(
        settings,
        MemoryResolver::new()
            .with_file("a.wdl", r#"{"imports": [{"uri": "b.wdl"}]}"#)
            .with_file("b.wdl", r#"{"imports": [{"uri": "c.wdl"}]}"#)
            .with_file("c.wdl", "{}"),
    );

    let err = project.load("a.wdl").await.unwrap_err();
    assert!(matches!(
        err,
        ModelError::RecursionDepthExceeded { ref uri, depth: 1 } if uri == "c.wdl"
    ));

    let model = project.model();
    let b = model.document_by_uri("b.wdl").unwrap();
    let import = model.children_of_kind(b, EntityKind::Import)[0];
    assert!(model.import(import).unwrap().failure().is_some());
}

#[tokio::test]
async fn test_failed_import_does_not_abort_siblings() {
    let (project, _) = project(
        MemoryResolver::new()
            .with_file(
                "main.wdl",
                r#"{"imports": [{"uri": "missing.wdl"}, {"uri": "lib.wdl"}]}"#,
            )
            .with_file("lib.wdl", LIBRARY),
    );

    let main = project.load("main.wdl").await.unwrap();
    let imports = imports_of(&project, main);

    let mut model = project.model_mut();
    let missing = model.import(imports[0]).unwrap();
    assert_eq!(missing.document(), None);
    assert!(missing.failure().unwrap().contains("missing.wdl"));
    assert!(model.import(imports[1]).unwrap().document().is_some());

    let issues = model.validate(main).unwrap();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].rule_id, "import-failed");
    assert_eq!(issues[0].entity, imports[0]);
}

#[tokio::test]
async fn test_imports_resolve_relative_to_importer() {
    let (project, _) = project(
        MemoryResolver::new()
            .with_file("wf/main.wdl", r#"{"imports": [{"uri": "../lib/tools.wdl"}]}"#)
            .with_file("lib/tools.wdl", LIBRARY),
    );

    let main = project.load("wf/main.wdl").await.unwrap();

    let model = project.model();
    assert!(model.find_executable(main, "tools.index").is_some());
    assert_eq!(
        project.loaded_uris(),
        vec!["lib/tools.wdl".to_string(), "wf/main.wdl".to_string()]
    );
}

#[tokio::test]
async fn test_relative_top_level_uri_uses_base_dir() {
    let settings = Settings {
        base_dir: Some(PathBuf::from("/data/pipelines")),
        ..Settings::default()
    };
    let (project, _) = project_with(
        settings,
        MemoryResolver::new().with_file("/data/pipelines/main.wdl", "{}"),
    );

    let main = project.load("main.wdl").await.unwrap();
    assert_eq!(
        project.model().document(main).unwrap().uri(),
        Some("/data/pipelines/main.wdl")
    );
}

// ============================================================================
// File System
// ============================================================================

#[tokio::test]
async fn test_fs_resolver_reads_paths_and_file_urls() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("main.wdl"), MAIN).unwrap();
    std::fs::write(dir.path().join("lib.wdl"), LIBRARY).unwrap();

    let by_path = Project::with_fs(Settings {
        base_dir: Some(dir.path().to_path_buf()),
        ..Settings::default()
    });
    let main = by_path.load("main.wdl").await.unwrap();
    assert!(by_path.model().find_executable(main, "lib.index").is_some());

    let url = Url::from_file_path(dir.path().join("main.wdl")).unwrap();
    let by_url = Project::with_fs(Settings::default());
    let main = by_url.load(url.as_str()).await.unwrap();
    assert!(by_url.model().find_executable(main, "lib.index").is_some());
}

#[tokio::test]
async fn test_fs_resolver_rejects_remote_schemes() {
    let err = FsResolver.resolve("https://example.com/a.wdl").await.unwrap_err();
    assert!(err.to_string().contains("unsupported uri scheme 'https'"));
}

#[test]
fn test_memory_resolver_counts_fetches() {
    let resolver = MemoryResolver::new().with_file("a.wdl", "{}");

    let text = tokio_test::block_on(resolver.resolve("a.wdl")).unwrap();
    assert_eq!(text, "{}");
    assert!(tokio_test::block_on(resolver.resolve("b.wdl")).is_err());
    assert_eq!(resolver.fetch_count(), 2);
}

// ============================================================================
// URI Resolution
// ============================================================================

#[test]
fn test_resolve_uri() {
    assert_eq!(resolve_uri(None, "./x/../y.wdl"), "y.wdl");
    assert_eq!(resolve_uri(Some("main.wdl"), "lib.wdl"), "lib.wdl");
    assert_eq!(resolve_uri(Some("a/b/main.wdl"), "../c.wdl"), "a/c.wdl");
    assert_eq!(resolve_uri(Some("main.wdl"), "../up.wdl"), "../up.wdl");
    assert_eq!(resolve_uri(Some("/abs/main.wdl"), "/other/x.wdl"), "/other/x.wdl");
    assert_eq!(
        resolve_uri(Some("https://example.com/wdl/main.wdl"), "lib/tools.wdl"),
        "https://example.com/wdl/lib/tools.wdl"
    );
    assert_eq!(
        resolve_uri(Some("main.wdl"), "https://example.com/x.wdl"),
        "https://example.com/x.wdl"
    );
}
