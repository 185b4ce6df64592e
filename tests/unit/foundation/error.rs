use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        StageError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(StageError::asset("x").to_string().contains("asset error:"));
    assert!(StageError::render("x").to_string().contains("render error:"));
    assert!(
        StageError::serde("x")
            .to_string()
            .contains("serialization error:")
    );
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = StageError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
