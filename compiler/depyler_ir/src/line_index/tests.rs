use pretty_assertions::assert_eq;

use super::*;

const SOURCE: &str = "def f(x):\n    return x\n\nprint(f(1))\n";

#[test]
fn test_line_of_offsets() {
    let index = LineIndex::new(SOURCE);
    assert_eq!(index.line_of(0), 1);
    assert_eq!(index.line_of(9), 1);
    assert_eq!(index.line_of(10), 2);
    assert_eq!(index.line_of(24), 4);
    assert_eq!(index.line_count(), 5);
}

#[test]
fn test_line_col_counts_chars() {
    let source = "s = \"é\"\nx = 1\n";
    let index = LineIndex::new(source);
    let offset = u32::try_from(source.find('x').unwrap_or(0)).unwrap_or(0);
    assert_eq!(index.line_col(source, offset), LineCol { line: 2, col: 1 });
    // 'é' is two bytes but one column
    let quote = u32::try_from(source.rfind('"').unwrap_or(0)).unwrap_or(0);
    assert_eq!(index.line_col(source, quote), LineCol { line: 1, col: 7 });
}

#[test]
fn test_line_text() {
    let index = LineIndex::new(SOURCE);
    assert_eq!(index.line_text(SOURCE, 2), "    return x");
    assert_eq!(index.line_text(SOURCE, 3), "");
    assert_eq!(index.line_text(SOURCE, 99), "");
}
