//! Registration-time error taxonomy.
//!
//! Everything in this module surfaces while routes are being declared, before
//! the router starts serving. The matching hot path never returns an error:
//! "no route matched" is an empty result, and a handler's cascade signal is
//! plain data (see [`crate::Response::is_pass`]).

use thiserror::Error;

/// Errors raised while compiling and registering routes.
///
/// All variants are fatal to application boot: a route table that fails to
/// compile is a configuration defect, not something to recover from at
/// request time.
#[derive(Debug, Error)]
pub enum RouterError {
    /// The route pattern text could not be parsed.
    #[error("invalid route pattern `{pattern}`: {message}")]
    Parse {
        /// The offending pattern text.
        pattern: String,
        /// What the parser choked on.
        message: String,
    },

    /// A requirement supplied for a named parameter is not a valid regex.
    #[error("invalid requirement for parameter `{name}`")]
    Requirement {
        /// The parameter the requirement was registered for.
        name: String,
        #[source]
        source: regex::Error,
    },

    /// The fully composed route expression failed to compile.
    ///
    /// This can only happen when a requirement regex is valid on its own but
    /// does not compose into the surrounding route expression.
    #[error("route pattern `{pattern}` compiled to an invalid expression")]
    Compile {
        /// The pattern whose composed regex failed.
        pattern: String,
        #[source]
        source: regex::Error,
    },
}
