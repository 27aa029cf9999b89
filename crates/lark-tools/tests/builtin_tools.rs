//! Built-in tools driven through a registry, the way an agent loop calls them.

use lark_tools::{register_all, ToolError, ToolKind, ToolRegistry};
use tempfile::TempDir;

fn registry(dir: &TempDir) -> ToolRegistry {
    let registry = ToolRegistry::new();
    register_all(&registry, dir.path()).unwrap();
    registry
}

#[test]
fn test_register_all() {
    let dir = TempDir::new().unwrap();
    let registry = registry(&dir);
    assert_eq!(
        registry.names(),
        ["current_date", "read_file", "think", "write_file"]
    );
    assert!(registry
        .all()
        .iter()
        .all(|tool| tool.kind() == ToolKind::Builtin));
}

#[test]
fn test_schema_describes_parameters() {
    let dir = TempDir::new().unwrap();
    let write = registry(&dir).lookup("write_file").unwrap();
    let params = write.parameters_schema();
    assert_eq!(params["type"], "object");
    assert_eq!(params["properties"]["path"]["type"], "string");
    let required: Vec<&str> = params["required"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|v| v.as_str())
        .collect();
    assert!(required.contains(&"path"));
    assert!(required.contains(&"content"));
}

#[tokio::test]
async fn test_write_then_read() {
    let dir = TempDir::new().unwrap();
    let registry = registry(&dir);

    registry
        .invoke_json(
            "write_file",
            r#"{"path": "notes/todo.md", "content": "buy milk\ncall bob\n"}"#,
        )
        .await
        .unwrap();
    let out = registry
        .invoke_json("read_file", r#"{"path": "notes/todo.md", "offset": 1}"#)
        .await
        .unwrap();
    assert_eq!(out, "   2 | call bob");
}

#[tokio::test]
async fn test_missing_parameter_surfaces() {
    let dir = TempDir::new().unwrap();
    let err = registry(&dir)
        .invoke_json("think", "{}")
        .await
        .unwrap_err();
    match err {
        ToolError::MissingParameter { tool, parameter } => {
            assert_eq!(tool, "think");
            assert_eq!(parameter, "task");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_missing_working_dir_rejected() {
    let dir = TempDir::new().unwrap();
    let gone = dir.path().join("does-not-exist");
    let err = register_all(&ToolRegistry::new(), &gone).unwrap_err();
    assert!(matches!(err, ToolError::ExecutionError(_)));
}
