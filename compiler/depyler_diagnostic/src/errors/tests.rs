use super::*;

#[test]
fn test_every_kind_is_documented() {
    for kind in DiagnosticKind::ALL {
        let doc = ErrorDocs::get(kind);
        assert!(doc.is_some(), "{kind} has no documentation");
    }
    assert_eq!(ErrorDocs::all_kinds().count(), DiagnosticKind::ALL.len());
}

#[test]
fn test_doc_title_matches_code() {
    for kind in DiagnosticKind::ALL {
        let doc = ErrorDocs::get(kind).unwrap_or_default();
        assert!(
            doc.starts_with(&format!("# {}:", kind.code())),
            "{} doc starts with the wrong heading",
            kind.code()
        );
    }
}

#[test]
fn test_lookup_by_code() {
    let doc = ErrorDocs::lookup("E3001").unwrap_or_default();
    assert!(doc.contains("container_typing"));
    assert!(ErrorDocs::lookup("E0000").is_none());
}
