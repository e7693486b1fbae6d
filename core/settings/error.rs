use thiserror::*;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Could not parse constraints declaration: {reason}")]
    InvalidConstraints { reason: String },

    #[error("Constraint on setting {name} extracts attribute {attribute} but the resolved value is not a mapping")]
    NotAMapping { name: String, attribute: String },

    #[error("Setting {name} is declared as a {option_type} but {value} does not parse as one")]
    Objectification {
        name: String,
        option_type: String,
        value: String,
    },
}
