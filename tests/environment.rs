// Kept in its own test binary: it mutates the process environment.

use schematic_gen::{SchematicError, SchematicGenerator, API_KEY_ENV};

#[test]
fn construction_without_key_or_variable_fails_naming_it() {
    let saved = std::env::var(API_KEY_ENV).ok();
    std::env::remove_var(API_KEY_ENV);

    let result = SchematicGenerator::from_env(None);

    std::env::set_var(API_KEY_ENV, "from_env");
    let from_env = SchematicGenerator::from_env(None).map(|g| g.api_key().to_string());
    let explicit = SchematicGenerator::from_env(Some("test_key".into()))
        .map(|g| g.api_key().to_string());

    match saved {
        Some(value) => std::env::set_var(API_KEY_ENV, value),
        None => std::env::remove_var(API_KEY_ENV),
    }

    let err = result.unwrap_err();
    assert!(matches!(err, SchematicError::Configuration(_)));
    assert!(err.to_string().contains("OPENROUTER_API_KEY"), "{err}");
    assert_eq!(from_env.unwrap(), "from_env");
    assert_eq!(explicit.unwrap(), "test_key");
}
