use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("unterminated single quote in command template")]
    UnterminatedSingleQuote,

    #[error("unterminated double quote in command template")]
    UnterminatedDoubleQuote,

    #[error("unterminated backtick in command template")]
    UnterminatedBacktick,

    #[error("unterminated `${{` in command template")]
    UnterminatedBrace,

    #[error("unterminated `$(` in command template")]
    UnterminatedSubshell,

    #[error("invalid variable name `{0}`")]
    InvalidVariable(String),

    #[error("failed to run subcommand `{command}`: {source}")]
    SubcommandSpawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("command resolution did not finish: {0}")]
    Interrupted(String),

    #[error("subcommand `{command}` exited with {status}: {stderr}")]
    SubcommandFailed {
        command: String,
        status: String,
        stderr: String,
    },
}
