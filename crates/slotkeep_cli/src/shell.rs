use std::io::{self, BufRead, Write};

use clap::{Parser, Subcommand};
use slotkeep_core::Archive;
use tracing::debug;

use crate::commands::{ArchiveCommand, execute};

pub const PROMPT: &str = "(slotkeep)> ";

const INTRO: &str = "\
slotkeep keeps an unlimited, annotated archive next to a game's save slots.
  slot  a save position in the game's own save menu
  id    an archive number, independent of slots, starting at 0
  memo  a note stored in the archived file's name
Type `help` for commands, `help <command>` for usage, `quit` to leave.";

#[derive(Debug, Parser)]
#[command(no_binary_name = true, disable_version_flag = true)]
struct ShellLine {
    #[command(subcommand)]
    command: ShellCommand,
}

#[derive(Debug, Subcommand)]
enum ShellCommand {
    #[command(flatten)]
    Archive(ArchiveCommand),
    /// Leave the shell
    #[command(visible_alias = "exit")]
    Quit,
}

/// Reads commands line by line until `quit` or end of input. Failed commands
/// are reported and the loop continues.
pub fn run<R: BufRead, W: Write>(archive: &mut Archive, input: R, mut out: W) -> io::Result<()> {
    writeln!(out, "{INTRO}")?;
    write!(out, "{PROMPT}")?;
    out.flush()?;

    for line in input.lines() {
        let line = line?;
        if !dispatch_line(archive, &line, &mut out)? {
            return Ok(());
        }
        write!(out, "{PROMPT}")?;
        out.flush()?;
    }
    writeln!(out)?;
    Ok(())
}

/// Returns `false` once the user asked to leave.
fn dispatch_line<W: Write>(archive: &mut Archive, line: &str, out: &mut W) -> io::Result<bool> {
    let words = match shell_words::split(line) {
        Ok(words) => words,
        Err(e) => {
            writeln!(out, "Error: {e}")?;
            return Ok(true);
        }
    };
    if words.is_empty() {
        return Ok(true);
    }
    debug!(?words, "shell command");

    match ShellLine::try_parse_from(&words) {
        Ok(ShellLine {
            command: ShellCommand::Quit,
        }) => Ok(false),
        Ok(ShellLine {
            command: ShellCommand::Archive(command),
        }) => {
            match execute(archive, &command) {
                Ok(message) => writeln!(out, "{message}")?,
                Err(e) => writeln!(out, "Error: {}", e.message)?,
            }
            Ok(true)
        }
        Err(e) => {
            write!(out, "{}", e.render())?;
            Ok(true)
        }
    }
}
