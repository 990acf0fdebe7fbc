use miditext::output::{default_output_path, write_output};
use miditext::{convert_file, ConvertConfig};
use std::env;
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "Usage: miditext [--config <file.yaml>] [--overwrite] [--save] [--report] [--verbose] <input.mid> [output.txt]";

#[derive(Debug, Default)]
struct Options {
    config_path: Option<PathBuf>,
    overwrite: bool,
    save: bool,
    report: bool,
    verbose: bool,
    input_path: PathBuf,
    output_path: Option<PathBuf>,
}

fn parse_args(args: &[String]) -> Result<Options, String> {
    let mut options = Options::default();
    let mut positional: Vec<&String> = Vec::new();

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => match iter.next() {
                Some(path) => options.config_path = Some(PathBuf::from(path)),
                None => return Err("--config needs a file path".to_string()),
            },
            "--overwrite" => options.overwrite = true,
            "--save" => options.save = true,
            "--report" => options.report = true,
            "--verbose" => options.verbose = true,
            flag if flag.starts_with("--") => return Err(format!("Unknown option '{}'", flag)),
            _ => positional.push(arg),
        }
    }

    match positional.as_slice() {
        [input] => options.input_path = PathBuf::from(input),
        [input, output] => {
            options.input_path = PathBuf::from(input);
            options.output_path = Some(PathBuf::from(output));
        }
        [] => return Err("Missing input file".to_string()),
        _ => return Err("Too many arguments".to_string()),
    }

    Ok(options)
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> ConvertConfig {
    match path {
        Some(path) => match ConvertConfig::from_path(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error: {}", e);
                process::exit(1);
            }
        },
        None => ConvertConfig::default(),
    }
}

fn main() {
    let args: Vec<String> = env::args().skip(1).collect();

    let options = match parse_args(&args) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("{}", e);
            eprintln!("{}", USAGE);
            process::exit(1);
        }
    };

    init_logging(options.verbose);
    let config = load_config(options.config_path.as_deref());

    // Convert
    let conversion = match convert_file(&options.input_path, &config) {
        Ok(conversion) => conversion,
        Err(e) => {
            eprintln!("Conversion error: {}", e);
            process::exit(1);
        }
    };

    if options.report && !conversion.diagnostics.is_empty() {
        match serde_yaml::to_string(&conversion.diagnostics) {
            Ok(yaml) => eprint!("{}", yaml),
            Err(e) => eprintln!("Could not serialize diagnostics: {}", e),
        }
    }

    // Output
    let output_path = match options.output_path {
        Some(path) => Some(path),
        None if options.save => Some(default_output_path(&options.input_path)),
        None => None,
    };

    match output_path {
        Some(path) => match write_output(&path, &conversion.text, options.overwrite) {
            Ok(written) => eprintln!("Wrote text notation to {}", written.display()),
            Err(e) => {
                eprintln!("Error: {}", e);
                process::exit(1);
            }
        },
        None => {
            println!("{}", conversion.text);
        }
    }
}
