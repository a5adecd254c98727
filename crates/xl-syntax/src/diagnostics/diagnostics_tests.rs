use xl_core::Positions;

use super::Diagnostics;

#[test]
fn builder_accumulates_messages() {
    let mut diagnostics = Diagnostics::new();
    assert!(diagnostics.is_empty());

    diagnostics.error("no form matches 'foo'", 3).emit();
    diagnostics.warning("unused rewrite", 10).emit();

    assert_eq!(diagnostics.len(), 2);
    assert!(diagnostics.has_errors());
}

#[test]
fn plain_rendering_without_positions() {
    let mut diagnostics = Diagnostics::new();
    diagnostics.error("mismatched delimiter", 4).emit();
    let rendered = diagnostics.printer().render();
    assert!(rendered.contains("error"));
    assert!(rendered.contains("mismatched delimiter"));
}

#[test]
fn rendering_with_positions_shows_the_source_line() {
    let mut positions = Positions::new();
    let base = positions.open_file("demo.xl", "first\nsecond line\n");
    let mut diagnostics = Diagnostics::new();
    // Position of the 's' of "second".
    diagnostics.error("unknown operator", base + 6).emit();

    let rendered = diagnostics.printer().positions(&positions).render();
    assert!(rendered.contains("unknown operator"));
    assert!(rendered.contains("demo.xl"));
    assert!(rendered.contains("second line"));
}

#[test]
fn related_locations_are_kept() {
    let mut diagnostics = Diagnostics::new();
    diagnostics
        .error("type mismatch", 12)
        .related_to("declared here", 2)
        .emit();
    let rendered = diagnostics.printer().render();
    assert!(rendered.contains("declared here"));
}

#[test]
fn extend_merges_sinks() {
    let mut first = Diagnostics::new();
    first.error("one", 0).emit();
    let mut second = Diagnostics::new();
    second.error("two", 1).emit();
    first.extend(second);
    assert_eq!(first.len(), 2);
}
