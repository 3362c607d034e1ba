mod common;

use common::{TempRoot, A_TXT, INDEX_HTML};
use static_httpd::error::HandlerError;
use static_httpd::fs::resolver::{document_path, Resolver};

#[test]
fn test_document_path_rules() {
    assert_eq!(document_path("/"), "index.html");
    assert_eq!(document_path("/a.txt"), "a.txt");
    assert_eq!(document_path("/docs/"), "docs/index.html");
    assert_eq!(document_path("/a.txt?download=1"), "a.txt");
    assert_eq!(document_path("/docs/?x"), "docs/index.html");
    assert_eq!(document_path("a.txt"), "a.txt");
}

#[test]
fn test_document_path_percent_decodes() {
    assert_eq!(document_path("/my%20file.txt"), "my file.txt");
    assert_eq!(document_path("/%2e%2e/secret"), "../secret");
}

#[test]
fn test_resolve_existing_file() {
    let root = TempRoot::new();
    let resolver = Resolver::new(root.path());

    let resolved = resolver.resolve("/a.txt");

    assert_eq!(resolved.path, root.path().join("a.txt"));
    assert!(resolved.exists);
    assert!(!resolved.outside_root);
    assert_eq!(resolved.len, A_TXT.len() as u64);
    assert_eq!(resolved.content_type(), "text/plain");
    assert!(resolved.check().is_ok());
}

#[test]
fn test_resolve_directory_index() {
    let root = TempRoot::new();
    let resolver = Resolver::new(root.path());

    let resolved = resolver.resolve("/");

    assert!(resolved.exists);
    assert_eq!(resolved.len, INDEX_HTML.len() as u64);
    assert_eq!(resolved.content_type(), "text/html");
}

#[test]
fn test_resolve_directory_without_index_is_absent() {
    let root = TempRoot::new();
    let resolver = Resolver::new(root.path());

    let resolved = resolver.resolve("/empty/");

    assert!(!resolved.exists);
    assert!(matches!(resolved.check(), Err(HandlerError::ResourceAbsent(_))));
}

#[test]
fn test_resolve_directory_without_trailing_slash_is_absent() {
    let root = TempRoot::new();
    let resolver = Resolver::new(root.path());

    assert!(!resolver.resolve("/empty").exists);
}

#[test]
fn test_resolve_traversal_is_forbidden_whether_or_not_target_exists() {
    let root = TempRoot::new();
    let resolver = Resolver::new(root.path());

    for resource in ["/../../etc/passwd", "/empty/../a.txt", "/%2e%2e/nothing-here"] {
        let resolved = resolver.resolve(resource);
        assert!(resolved.outside_root, "{resource}");
        assert!(
            matches!(resolved.check(), Err(HandlerError::PathEscapesRoot(_))),
            "{resource}"
        );
    }
}

#[test]
fn test_resolve_absolute_component_is_forbidden() {
    let root = TempRoot::new();
    let resolver = Resolver::new(root.path());

    let resolved = resolver.resolve("//etc/passwd");

    assert!(resolved.outside_root);
}

#[test]
fn test_resolve_unknown_extension_falls_back_to_octet_stream() {
    let root = TempRoot::new();
    root.write("blob.zzzunknown", b"\x00\x01");
    let resolver = Resolver::new(root.path());

    let resolved = resolver.resolve("/blob.zzzunknown");

    assert_eq!(resolved.content_type(), "application/octet-stream");
}
