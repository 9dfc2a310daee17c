use uuid::Uuid;

/// Source of globally unique identifiers for runnables.
pub trait IdGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Random (v4) UUIDs rendered as hyphenated strings.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn generate(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Fresh id from the default generator
pub fn new_id() -> String {
    UuidGenerator.generate()
}
