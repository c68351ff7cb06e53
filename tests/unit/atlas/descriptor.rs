use super::*;

#[test]
fn parses_regions_with_rotation_defaulting_off() {
    let json = r#"{
        "sprites": {
            "body": {"x": 0, "y": 0, "w": 4, "h": 3},
            "eyes": {"x": 4, "y": 0, "w": 2, "h": 2, "rotated": true}
        }
    }"#;
    let descriptor = AtlasDescriptor::from_reader(json.as_bytes()).unwrap();
    descriptor.validate().unwrap();

    let body = descriptor.sprites.get("body").unwrap();
    assert_eq!((body.x, body.y, body.w, body.h), (0, 0, 4, 3));
    assert!(!body.rotated);
    assert!(descriptor.sprites.get("eyes").unwrap().rotated);
}

#[test]
fn malformed_json_is_a_serde_error() {
    let err = AtlasDescriptor::from_reader("{".as_bytes()).unwrap_err();
    assert!(matches!(err, AtlasflipError::Serde(_)));
}

#[test]
fn validate_rejects_zero_area_regions() {
    let mut descriptor = AtlasDescriptor::default();
    descriptor.sprites.insert(
        "bad".to_string(),
        AtlasRegion {
            x: 0,
            y: 0,
            w: 0,
            h: 5,
            rotated: false,
        },
    );
    let err = descriptor.validate().unwrap_err();
    assert!(err.to_string().contains("'bad'"));
    assert!(err.to_string().contains("zero-area"));
}

#[test]
fn from_path_names_the_missing_file() {
    let err = AtlasDescriptor::from_path("/nonexistent/atlas.json").unwrap_err();
    assert!(matches!(err, AtlasflipError::Validation(_)));
    assert!(err.to_string().contains("/nonexistent/atlas.json"));
}
