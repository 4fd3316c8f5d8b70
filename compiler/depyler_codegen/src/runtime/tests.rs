#![expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]

use pretty_assertions::assert_eq;

use depyler_types::{IntKind, RustType};

use super::{Imports, RuntimeHelpers};

#[test]
fn empty_set_renders_nothing() {
    assert_eq!(RuntimeHelpers::empty().render(), "");
}

#[test]
fn floor_div_is_specialized_per_width() {
    let text = RuntimeHelpers::floor_div(IntKind::I32).render();
    assert!(text.starts_with("fn py_floor_div_i32(a: i32, b: i32) -> i32 {"));
    assert!(!text.contains("$int"));
    assert!(!text.contains("i64"));
}

#[test]
fn helpers_render_in_flag_order() {
    let set = RuntimeHelpers::STR_FIND | RuntimeHelpers::MOD_I64 | RuntimeHelpers::FLOOR_DIV_I64;
    let text = set.render();
    let floor = text.find("fn py_floor_div_i64").unwrap();
    let modulo = text.find("fn py_mod_i64").unwrap();
    let find = text.find("fn py_str_find").unwrap();
    assert!(floor < modulo && modulo < find);
}

#[test]
fn slices_pull_in_index_computation() {
    let text = RuntimeHelpers::STR_SLICE.render();
    assert!(text.contains("fn py_slice_indices"));
    assert!(text.contains("fn py_str_slice"));
    assert!(!text.contains("fn py_list_slice"));
}

#[test]
fn checked_string_index_never_indexes_bytes() {
    let text = RuntimeHelpers::STR_INDEX.render();
    assert!(text.contains("char_indices()"));
    assert!(text.contains("IndexError: string index out of range"));
    assert!(!text.contains("as_bytes"));
}

#[test]
fn imports_follow_nested_types() {
    let ty = RustType::option(RustType::Tuple(vec![
        RustType::hash_set(RustType::Str),
        RustType::vec(RustType::hash_map(RustType::Str, RustType::Float)),
    ]));
    let imports = Imports::for_type(&ty);
    assert_eq!(imports, Imports::INDEX_MAP | Imports::INDEX_SET);
    assert_eq!(
        imports.render(),
        vec![
            "use indexmap::IndexMap;",
            "use indexmap::IndexSet;"
        ]
    );
}
