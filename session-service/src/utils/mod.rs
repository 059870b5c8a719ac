pub mod validation;

pub use validation::{OptionalValidatedJson, ValidatedJson};
