use thiserror::Error;

pub type Result<T> = std::result::Result<T, TrainerError>;

#[derive(Error, Debug)]
pub enum TrainerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Rule error ({category}): {message}")]
    Rule { category: String, message: String },

    #[error("Manifest error in {path}: {message}")]
    Manifest { path: String, message: String },

    #[error("No active challenge. Start a challenge before checking a solution.")]
    NoActiveChallenge,

    #[error("Attempt {attempt_id} is already completed; restart the challenge to try again")]
    AttemptClosed { attempt_id: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl TrainerError {
    pub fn exit_code(&self) -> i32 {
        2
    }
}
