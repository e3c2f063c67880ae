#[macro_use]
extern crate clap;

use clap::Arg;

use rvrun::{parse_weight, Options};
use rvsim::Outcome;

/// Accept decimal or `0x` hex for the size/budget options.
fn parse_number(text: &str) -> Option<u64> {
    if let Some(hex) = text.strip_prefix("0x") {
        u64::from_str_radix(hex, 16).ok()
    } else {
        text.parse().ok()
    }
}

fn main() {
    let matches = app_from_crate!()
        .arg(
            Arg::with_name("ASSEMBLY")
                .help("Assembly source files, linked in the given order")
                .required(true)
                .multiple(true),
        )
        .arg(
            Arg::with_name("input")
                .short("i")
                .long("input")
                .takes_value(true)
                .value_name("FILE")
                .help("Redirect the program's standard input"),
        )
        .arg(
            Arg::with_name("output")
                .short("o")
                .long("output")
                .takes_value(true)
                .value_name("FILE")
                .help("Redirect the program's standard output"),
        )
        .arg(
            Arg::with_name("stack_size")
                .long("stack-size")
                .takes_value(true)
                .value_name("BYTES")
                .help("Size of the stack region"),
        )
        .arg(
            Arg::with_name("memory_size")
                .long("memory-size")
                .takes_value(true)
                .value_name("BYTES")
                .help("Total size of the simulated address space"),
        )
        .arg(
            Arg::with_name("timeout")
                .long("timeout")
                .takes_value(true)
                .value_name("CYCLES")
                .help("Stop after this many weighted cycles"),
        )
        .arg(
            Arg::with_name("weight")
                .short("w")
                .long("weight")
                .takes_value(true)
                .multiple(true)
                .number_of_values(1)
                .value_name("NAME=CYCLES")
                .help("Override one instruction weight"),
        )
        .arg(
            Arg::with_name("detail")
                .long("detail")
                .help("Print the section map, registers and counters"),
        )
        .arg(
            Arg::with_name("debug")
                .long("debug")
                .help("Reserved debugging switch"),
        )
        .arg(
            Arg::with_name("cache")
                .long("cache")
                .help("Reserved cache statistics switch"),
        )
        .arg(
            Arg::with_name("silent")
                .long("silent")
                .help("Suppress the end-of-run report"),
        )
        .get_matches();

    let mut options = Options::default();
    options.assembly_files = matches
        .values_of("ASSEMBLY")
        .unwrap()
        .map(str::to_string)
        .collect();
    options.input_file = matches.value_of("input").map(str::to_string);
    options.output_file = matches.value_of("output").map(str::to_string);
    options.detail = matches.is_present("detail");
    options.debug = matches.is_present("debug");
    options.cache = matches.is_present("cache");
    options.silent = matches.is_present("silent");

    let number = |name: &str| -> Option<u64> {
        matches.value_of(name).map(|text| match parse_number(text) {
            Some(value) => value,
            None => {
                eprintln!("Invalid number for --{}: \"{}\"", name.replace('_', "-"), text);
                std::process::exit(2);
            }
        })
    };
    if let Some(size) = number("stack_size") {
        options.config.stack_size = size as u32;
    }
    if let Some(size) = number("memory_size") {
        options.config.storage_size = size as u32;
    }
    if let Some(budget) = number("timeout") {
        options.config.timeout = budget;
    }

    if let Some(specs) = matches.values_of("weight") {
        for spec in specs {
            match parse_weight(spec) {
                Ok(weight) => options.weights.push(weight),
                Err(error) => {
                    eprintln!("{}", error);
                    std::process::exit(2);
                }
            }
        }
    }

    match rvrun::run(&options) {
        Ok(Outcome::Exited(code)) => std::process::exit(code as i32),
        Ok(Outcome::Timeout) => std::process::exit(1),
        Ok(Outcome::Trap(_)) => std::process::exit(1),
        Err(error) => {
            eprintln!("{}", error);
            std::process::exit(1);
        }
    }
}
