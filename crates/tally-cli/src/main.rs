//! Tally CLI - an interactive shell around the spreadsheet engine

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;
use tally::{Position, Sheet};

#[derive(Parser)]
#[command(name = "tally")]
#[command(author, version, about = "Minimal spreadsheet shell")]
struct Cli {
    /// Script of commands to run instead of reading stdin
    script: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut sheet = Sheet::new();
    match cli.script {
        Some(path) => {
            let file =
                File::open(&path).with_context(|| format!("failed to open '{}'", path.display()))?;
            run(&mut sheet, BufReader::new(file), false)
        }
        None => {
            let stdin = io::stdin();
            let interactive = true;
            run(&mut sheet, stdin.lock(), interactive)
        }
    }
}

/// Read commands line by line until `quit` or end of input.
///
/// Blank lines and `#` comments are skipped. A failed command prints its
/// error to stderr and the loop continues; only I/O failures abort.
fn run<R: BufRead>(sheet: &mut Sheet, input: R, interactive: bool) -> Result<()> {
    if interactive {
        print_prompt()?;
    }

    for line in input.lines() {
        let line = line.context("failed to read input")?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            if interactive {
                print_prompt()?;
            }
            continue;
        }

        match execute(sheet, line) {
            Ok(Outcome::Continue) => {}
            Ok(Outcome::Quit) => return Ok(()),
            Err(err) => eprintln!("error: {err:#}"),
        }

        if interactive {
            print_prompt()?;
        }
    }

    Ok(())
}

fn print_prompt() -> Result<()> {
    print!("> ");
    io::stdout().flush().context("failed to flush stdout")
}

enum Outcome {
    Continue,
    Quit,
}

fn execute(sheet: &mut Sheet, line: &str) -> Result<Outcome> {
    let mut parts = line.splitn(2, char::is_whitespace);
    let command = parts.next().unwrap_or_default();
    let rest = parts.next().unwrap_or("").trim();

    match command {
        "set" => {
            let (addr, text) = match rest.split_once(char::is_whitespace) {
                Some((addr, text)) => (addr, text.trim_start()),
                None if !rest.is_empty() => (rest, ""),
                None => bail!("usage: set ADDR [TEXT]"),
            };
            let pos = parse_address(addr)?;
            sheet
                .set_cell(pos, text)
                .with_context(|| format!("cannot set {addr}"))?;
        }
        "clear" => {
            if rest.is_empty() {
                bail!("usage: clear ADDR");
            }
            let pos = parse_address(rest)?;
            sheet
                .clear_cell(pos)
                .with_context(|| format!("cannot clear {rest}"))?;
        }
        "values" => {
            let stdout = io::stdout();
            sheet
                .print_values(&mut stdout.lock())
                .context("failed to write values")?;
        }
        "texts" => {
            let stdout = io::stdout();
            sheet
                .print_texts(&mut stdout.lock())
                .context("failed to write texts")?;
        }
        "size" => {
            let size = sheet.printable_size();
            println!("{} x {}", size.rows, size.cols);
        }
        "quit" | "exit" => return Ok(Outcome::Quit),
        other => bail!("unknown command '{other}' (set, clear, values, texts, size, quit)"),
    }

    Ok(Outcome::Continue)
}

fn parse_address(addr: &str) -> Result<Position> {
    let pos = Position::parse(addr).with_context(|| format!("invalid address '{addr}'"))?;
    if !pos.is_valid() {
        bail!("address '{addr}' is out of bounds");
    }
    Ok(pos)
}
