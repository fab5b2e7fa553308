use std::error::Error;
use std::fs::File;
use std::io::{self, BufWriter, Read};
use std::ops::ControlFlow;
use std::path::PathBuf;

use clap::Parser;
use lsml::{Arena, Document, IoReader, IoWriter, ParseOptions};

const DEFAULT_MEM: usize = 16 * 1024 * 1024;

#[derive(Parser, Debug)]
#[command(
    name = "lsmlcat",
    version,
    about = "Parse LSML files and reprint the combined document"
)]
struct Args {
    /// Input files; reads stdin when empty.
    files: Vec<PathBuf>,

    /// Arena capacity in bytes.
    #[arg(long, value_name = "bytes", default_value_t = DEFAULT_MEM)]
    mem: usize,

    /// Escape non-ASCII characters in the output.
    #[arg(long)]
    ascii: bool,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("lsmlcat: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let arena = Arena::with_capacity(args.mem);
    let mut doc = Document::new(&arena)?;

    let mut error_count = 0usize;
    let mut logger = |err: lsml::Error, line: u32| {
        eprintln!("lsml parse error: {err} on line {line}");
        error_count += 1;
        ControlFlow::Continue(())
    };

    if args.files.is_empty() {
        let stdin = io::stdin().lock();
        lsml::parse(
            &mut doc,
            IoReader::new(stdin),
            ParseOptions::new().with_logger(&mut logger),
        )?;
    } else {
        for path in &args.files {
            let file = File::open(path)
                .map_err(|err| format!("{}: {err}", path.display()))?;
            parse_one(&mut doc, file, &mut logger)?;
        }
    }

    let stdout = io::stdout().lock();
    let mut writer = IoWriter::new(BufWriter::new(stdout));
    lsml::write_document(&mut writer, &doc, args.ascii)?;
    io::Write::flush(&mut writer.into_inner())?;

    if error_count > 0 {
        return Err(format!("input contained {error_count} parse error(s)").into());
    }
    Ok(())
}

fn parse_one<'a, R: Read>(
    doc: &mut Document<'a>,
    input: R,
    logger: &mut dyn FnMut(lsml::Error, u32) -> ControlFlow<()>,
) -> Result<(), lsml::Error> {
    lsml::parse(
        doc,
        IoReader::new(input),
        ParseOptions::new().with_logger(logger),
    )
}
