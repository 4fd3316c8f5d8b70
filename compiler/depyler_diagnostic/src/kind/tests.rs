use super::*;

#[test]
fn test_codes_are_unique() {
    let mut codes: Vec<_> = DiagnosticKind::ALL.iter().map(|k| k.code()).collect();
    codes.sort_unstable();
    codes.dedup();
    assert_eq!(codes.len(), DiagnosticKind::ALL.len());
}

#[test]
fn test_from_code_roundtrips_every_kind() {
    for kind in DiagnosticKind::ALL {
        assert_eq!(DiagnosticKind::from_code(kind.code()), Some(kind));
    }
    assert_eq!(
        DiagnosticKind::from_code("e3001"),
        Some(DiagnosticKind::TypeUnificationError)
    );
    assert_eq!(DiagnosticKind::from_code("E9999"), None);
}

#[test]
fn test_fatality() {
    assert!(DiagnosticKind::TypeUnificationError.is_fatal());
    assert!(DiagnosticKind::OwnershipConflict.is_fatal());
    assert!(DiagnosticKind::IndexSemanticsError.is_fatal());
    assert!(DiagnosticKind::UnsupportedConstruct.is_fatal());
    assert!(!DiagnosticKind::ParseError.is_fatal());
    assert!(!DiagnosticKind::UnknownPragma.is_fatal());
    assert!(!DiagnosticKind::PragmaOverride.is_fatal());
    assert!(!DiagnosticKind::PossibleOverflow.is_fatal());
}

#[test]
fn test_warning_codes_use_w_prefix() {
    for kind in DiagnosticKind::ALL {
        let expected = if kind.default_severity() == Severity::Warning {
            'W'
        } else {
            'E'
        };
        assert!(kind.code().starts_with(expected), "{kind}");
    }
}
