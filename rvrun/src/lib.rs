//! Driver glue: reads sources, runs the assembler and linker, wires up
//! the process environment and reports how the run ended.

use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::PathBuf;

use rvasm::LinkError;
use rvsim::{Device, Interpreter, Memory, MemoryLayout, Meter, Outcome, SimConfig};


#[derive(Debug)]
pub enum Error {
    Io(std::io::Error, PathBuf),
    Asm(Box<rvasm::Error>),
    Link(LinkError),
    BadWeight(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(error, path) => {
                write!(f, "Reading \"{}\" failed: {}", path.display(), error)
            }
            Error::Asm(error) => {
                writeln!(f, "Parsing input failed:")?;
                write!(f, "{}", error)
            }
            Error::Link(error) => write!(f, "Linking failed: {}", error),
            Error::BadWeight(spec) => write!(f, "Invalid weight \"{}\"", spec),
        }
    }
}

impl std::error::Error for Error {}

pub struct Options {
    pub assembly_files: Vec<String>,
    pub input_file: Option<String>,
    pub output_file: Option<String>,
    pub config: SimConfig,
    pub weights: Vec<(Meter, u64)>,
    pub detail: bool,
    pub debug: bool,
    pub cache: bool,
    pub silent: bool,
}

impl Default for Options {
    fn default() -> Options {
        Options {
            assembly_files: Vec::new(),
            input_file: None,
            output_file: None,
            config: SimConfig::default(),
            weights: Vec::new(),
            detail: false,
            debug: false,
            cache: false,
            silent: false,
        }
    }
}

/// Parse one `name=cycles` weight override.
pub fn parse_weight(spec: &str) -> Result<(Meter, u64), Error> {
    let bad = || Error::BadWeight(spec.to_string());
    let mut parts = spec.splitn(2, '=');
    let name = parts.next().unwrap().trim();
    let cycles = parts.next().ok_or_else(bad)?.trim();

    let meter = Meter::parse(name).ok_or_else(bad)?;
    let cycles = cycles.parse().map_err(|_| bad())?;
    Ok((meter, cycles))
}

/// Assemble and link the given `(name, source)` pairs.
pub fn build(sources: &[(&str, &str)]) -> Result<MemoryLayout, Error> {
    let mut layouts = Vec::new();
    for (name, source) in sources {
        layouts.push(rvasm::assemble(name, source).map_err(|error| Error::Asm(Box::new(error)))?);
    }
    rvasm::link(layouts).map_err(Error::Link)
}

/// Run a linked image against the given device; prints the end-of-run
/// report unless silenced.
pub fn interpret(layout: &MemoryLayout, options: &Options, device: Device) -> Result<Outcome, Error> {
    let entry = layout
        .entry()
        .ok_or(Error::Link(LinkError::MissingMain))?;

    if options.detail && !options.silent {
        print_sections(layout);
    }

    let mut interpreter = Interpreter::new(layout, &options.config, device, entry);
    let outcome = interpreter.run();

    if !options.silent {
        report(&outcome, &interpreter, options.detail);
    }
    Ok(outcome)
}

/// The whole pipeline, reading sources and streams from the filesystem.
pub fn run(options: &Options) -> Result<Outcome, Error> {
    let mut sources = Vec::new();
    for path in &options.assembly_files {
        let mut text = String::new();
        File::open(path)
            .and_then(|mut file| file.read_to_string(&mut text))
            .map_err(|error| Error::Io(error, PathBuf::from(path)))?;
        sources.push((path.clone(), text));
    }
    let borrowed: Vec<(&str, &str)> = sources
        .iter()
        .map(|(name, text)| (name.as_str(), text.as_str()))
        .collect();
    let layout = build(&borrowed)?;

    let mut device = make_device(options)?;
    for &(meter, cycles) in &options.weights {
        device.set_weight(meter, cycles);
    }

    interpret(&layout, options, device)
}

fn make_device(options: &Options) -> Result<Device, Error> {
    let input: Box<dyn std::io::BufRead> = match &options.input_file {
        Some(path) => Box::new(BufReader::new(
            File::open(path).map_err(|error| Error::Io(error, PathBuf::from(path)))?,
        )),
        None => Box::new(BufReader::new(std::io::stdin())),
    };
    let output: Box<dyn Write> = match &options.output_file {
        Some(path) => Box::new(
            File::create(path).map_err(|error| Error::Io(error, PathBuf::from(path)))?,
        ),
        None => Box::new(std::io::stdout()),
    };
    Ok(Device::new(input, output))
}

fn print_sections(layout: &MemoryLayout) {
    let print = |name: &str, section: &rvsim::Section| {
        eprintln!(
            "Section {:<8} at [{:#x}, {:#x})",
            name,
            section.begin(),
            section.end()
        );
    };
    print("text", &layout.text);
    print("data", &layout.data);
    print("rodata", &layout.rodata);
    print("unknown", &layout.unknown);
    print("bss", &layout.bss);
}

fn report(outcome: &Outcome, interpreter: &Interpreter, detail: bool) {
    match outcome {
        Outcome::Exited(code) => {
            eprintln!(
                "Program exited with code {} after {} cycles",
                code,
                interpreter.device.cycles()
            );
        }
        Outcome::Timeout => {
            eprintln!(
                "Program timed out after {} cycles at pc {:#x}",
                interpreter.device.cycles(),
                interpreter.regs.pc()
            );
        }
        Outcome::Trap(trap) => {
            let pc = interpreter.regs.pc();
            eprintln!("Runtime error: {}", trap);
            eprintln!("  at pc {:#x}", pc);
            if let Ok(word) = current_word(&interpreter.memory, pc) {
                eprintln!("  instruction word {:#010x}", word);
            }
        }
    }

    if detail {
        eprint!("{}", interpreter.regs.dump());
        eprint!("{}", interpreter.device.report());
    }
}

fn current_word(memory: &Memory, pc: u32) -> Result<u32, rvsim::FailToInterpret> {
    memory.load_cmd(pc)
}
