//! Command dispatcher
//!
//! Drives one invocation through parsing, enriching, validating and executing.
//! Classified failures are translated once, here; anything else is reported
//! generically.

use std::error::Error;
use std::io::{self, Write};
use std::str::FromStr;

use itertools::Itertools;
use tracing::{debug, instrument};

use crate::application::{ApplicationResult, GetOptions, PutOptions, Resolved, VerbOptions};
use crate::cli::args::{parse_settings, USAGE, VERSION};
use crate::cli::error::{CliError, CliResult};
use crate::domain::{translate, Command};
use crate::exitcode::ExitOutcome;
use crate::infrastructure::di::ServiceContainer;

/// Runs commands against a set of wired services.
pub struct Dispatcher {
    container: ServiceContainer,
}

impl Dispatcher {
    pub fn new(container: ServiceContainer) -> Self {
        Self { container }
    }

    /// Run one invocation. `args` excludes the program name.
    ///
    /// Diagnostic lines, help and the version go to `out`; usage, parse errors
    /// and failure messages go to `err`.
    pub fn run(&self, args: &[String], out: &mut dyn Write, err: &mut dyn Write) -> ExitOutcome {
        match self.try_run(args, out, err) {
            Ok(outcome) => outcome,
            Err(e) => {
                debug!("run: cannot write output: {}", e);
                ExitOutcome::Unexpected
            }
        }
    }

    fn try_run(
        &self,
        args: &[String],
        out: &mut dyn Write,
        err: &mut dyn Write,
    ) -> io::Result<ExitOutcome> {
        writeln!(out, "[gridstage] [arguments] {:?}", args)?;

        let Some((verb, rest)) = args.split_first() else {
            writeln!(out, "[gridstage] [command] ")?;
            write_unparsed(out)?;
            return report(CliError::Usage(USAGE.to_string()), err);
        };
        writeln!(out, "[gridstage] [command] {}", verb)?;
        let command = match Command::from_str(verb) {
            Ok(command) => command,
            Err(unknown) => {
                debug!("try_run: unknown verb {:?}", unknown.0);
                write_unparsed(out)?;
                return report(CliError::Usage(USAGE.to_string()), err);
            }
        };

        match command {
            Command::Version => {
                write_unparsed(out)?;
                writeln!(out, "{}", VERSION)?;
                Ok(ExitOutcome::Success)
            }
            Command::Get => self.run_verb::<GetOptions, _>(rest, out, err, |c, resolved| {
                c.validation().validate_get(&resolved)?;
                c.transfer().get(&resolved).map(|_| ())
            }),
            Command::Put => self.run_verb::<PutOptions, _>(rest, out, err, |c, resolved| {
                c.validation().validate_put(&resolved)?;
                c.transfer().put(&resolved).map(|_| ())
            }),
        }
    }

    #[instrument(skip_all, fields(command = %O::COMMAND))]
    fn run_verb<O, F>(
        &self,
        rest: &[String],
        out: &mut dyn Write,
        err: &mut dyn Write,
        execute: F,
    ) -> io::Result<ExitOutcome>
    where
        O: VerbOptions,
        F: FnOnce(&ServiceContainer, Resolved<O>) -> ApplicationResult<()>,
    {
        let parsed = match parse_settings::<O>(rest) {
            Ok(parsed) => parsed,
            Err(e) => {
                write_unparsed(out)?;
                write!(err, "{}", e.render())?;
                return Ok(ExitOutcome::Failure);
            }
        };
        writeln!(out, "[gridstage] [options] {:?}", parsed.options)?;
        writeln!(out, "[gridstage] [remnants] {:?}", parsed.remnants)?;

        if rest.is_empty() {
            write!(err, "{}", parsed.banner)?;
            return Ok(ExitOutcome::Failure);
        }
        if parsed.options.help() {
            write!(out, "{}", parsed.banner)?;
            return Ok(ExitOutcome::Success);
        }

        match self.resolve_and_execute(parsed.options, execute) {
            Ok(()) => Ok(ExitOutcome::Success),
            Err(e) => report(e, err),
        }
    }

    fn resolve_and_execute<O, F>(&self, options: O, execute: F) -> CliResult<()>
    where
        O: VerbOptions,
        F: FnOnce(&ServiceContainer, Resolved<O>) -> ApplicationResult<()>,
    {
        let resolved = self.container.secret_resolver().enrich(options)?;
        execute(&self.container, resolved)?;
        Ok(())
    }
}

/// Diagnostic lines for an invocation whose arguments were never parsed.
fn write_unparsed(out: &mut dyn Write) -> io::Result<()> {
    writeln!(out, "[gridstage] [options] {{}}")?;
    writeln!(out, "[gridstage] [remnants] []")
}

/// Print a failure and pick its exit outcome.
fn report(error: CliError, err: &mut dyn Write) -> io::Result<ExitOutcome> {
    match (&error, error.record()) {
        (_, Some(record)) => writeln!(err, "{}", translate(record))?,
        (CliError::Usage(usage), None) => writeln!(err, "{}", usage)?,
        (_, None) => {
            let chain = std::iter::successors(Some(&error as &dyn Error), |&e| e.source())
                .map(ToString::to_string)
                .join(": ");
            writeln!(err, "Error: {}", chain)?
        }
    }
    Ok(match error.exit_code() {
        crate::exitcode::FAILURE => ExitOutcome::Failure,
        _ => ExitOutcome::Unexpected,
    })
}
