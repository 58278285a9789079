//! Settings resolver: verb-specific argument parsing using clap
//!
//! Verb routing is manual because `--version` is itself a verb; everything
//! after the verb goes to that verb's own schema.

use tracing::debug;

use crate::application::VerbOptions;

/// Printed when the verb is missing or unknown.
pub const USAGE: &str = "Usage: gridstage <get|put|--version> [OPTIONS]\n\n\
Run 'gridstage get --help' or 'gridstage put --help' for the options of a verb.";

/// Printed for `--version`.
pub const VERSION: &str = concat!(env!("CARGO_PKG_NAME"), " ", env!("CARGO_PKG_VERSION"));

/// Result of parsing one verb's arguments.
#[derive(Debug)]
pub struct ParsedSettings<O> {
    pub options: O,
    /// Positional arguments no flag consumed
    pub remnants: Vec<String>,
    /// Help text of the verb
    pub banner: String,
}

/// Parse the arguments following the verb.
///
/// Repeated `--meta` values are folded in order into one sequence. Unknown
/// flags and malformed values come back as the parser's error.
pub fn parse_settings<O: VerbOptions>(args: &[String]) -> Result<ParsedSettings<O>, clap::Error> {
    let mut options = O::try_parse_from(args)?;
    let remnants = options.take_remnants();
    let banner = O::command().render_help().to_string();
    debug!("parse_settings: {} {:?}", O::COMMAND, options);
    Ok(ParsedSettings {
        options,
        remnants,
        banner,
    })
}
