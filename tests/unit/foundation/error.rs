use super::*;

#[test]
fn constructors_pick_the_matching_variant() {
    assert!(matches!(
        AtlasflipError::validation("x"),
        AtlasflipError::Validation(_)
    ));
    assert!(matches!(
        AtlasflipError::content("x"),
        AtlasflipError::Content(_)
    ));
    assert!(matches!(
        AtlasflipError::resource("x"),
        AtlasflipError::Resource(_)
    ));
    assert!(matches!(AtlasflipError::serde("x"), AtlasflipError::Serde(_)));
}

#[test]
fn display_includes_the_category() {
    let err = AtlasflipError::content("missing symbol 'hero'");
    assert_eq!(err.to_string(), "content error: missing symbol 'hero'");
}

#[test]
fn anyhow_errors_convert_transparently() {
    fn fails() -> AtlasflipResult<()> {
        Err(anyhow::anyhow!("decode failed"))?;
        Ok(())
    }
    let err = fails().unwrap_err();
    assert!(matches!(err, AtlasflipError::Other(_)));
    assert_eq!(err.to_string(), "decode failed");
}
