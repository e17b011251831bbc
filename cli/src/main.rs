use std::fs;
use std::path::{Path, PathBuf};

use bytepatch::analysis::max_stack_depth;
use bytepatch::{
    CodeArtifact, CodeInstaller, DecodeOptions, Decoder, EncodeOptions, Encoder, Error,
    ErrorReport, NestedCodeInstaller, RawCode, assemble_into, find_nested,
};
use clap::{Args, Parser, Subcommand};
use miette::{Diagnostic, Result};
use tracing::{debug, info};

/// Bytepatch - inspect and patch CPython 2.7 code objects
#[derive(Parser, Debug)]
#[command(name = "bytepatch")]
#[command(about = "Inspect and patch CPython 2.7 code objects", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a disassembly of a code object
    Dis(Target),

    /// Compare the declared stack size with the analyzed maximum depth
    Stack(Target),

    /// Decode and re-encode a code object, reporting any difference
    Roundtrip(Target),

    /// Replace a function body with an assembled listing
    Patch {
        #[command(flatten)]
        target: Target,

        /// Listing to assemble into the function's code object
        #[arg(long)]
        listing: PathBuf,

        /// Where to write the patched code object
        #[arg(short, long)]
        output: PathBuf,

        /// Keep the declared stack size instead of recomputing it
        #[arg(long)]
        keep_stack_size: bool,
    },

    /// Assemble a listing into a new code object
    Asm {
        /// Listing to assemble
        listing: PathBuf,

        /// Name of the new code object
        #[arg(long, default_value = "<listing>")]
        name: String,

        /// Where to write the code object
        #[arg(short, long)]
        output: PathBuf,
    },
}

#[derive(Args, Debug)]
struct Target {
    /// Serialized code object
    file: PathBuf,

    /// Operate on the nested code object with this name
    #[arg(short, long)]
    function: Option<String>,

    /// Accept operands that index past the end of their table
    #[arg(long)]
    no_validate: bool,
}

#[derive(Debug, thiserror::Error, Diagnostic)]
enum CliError {
    #[error("cannot read {}", .path.display())]
    #[diagnostic(code(bytepatch::io))]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write {}", .path.display())]
    #[diagnostic(code(bytepatch::io))]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} is not a serialized code object", .path.display())]
    #[diagnostic(code(bytepatch::format))]
    Format {
        path: PathBuf,
        #[source]
        source: postcard::Error,
    },

    #[error("no code object named `{0}`")]
    #[diagnostic(
        code(bytepatch::install),
        help("functions are looked up among the nested code constants")
    )]
    NoFunction(String),
}

fn report(error: impl Into<Error>) -> ErrorReport {
    ErrorReport(error.into())
}

fn load(path: &Path) -> Result<RawCode, CliError> {
    let bytes = fs::read(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    RawCode::from_bytes(&bytes).map_err(|source| CliError::Format {
        path: path.to_path_buf(),
        source,
    })
}

fn store(path: &Path, code: &RawCode) -> Result<(), CliError> {
    let bytes = code.to_bytes().map_err(|source| CliError::Format {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, bytes).map_err(|source| CliError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// The code object `target` names: the file's top-level code, or a nested
/// function inside it.
fn select<'a>(module: &'a RawCode, function: Option<&str>) -> Result<&'a RawCode, CliError> {
    match function {
        None => Ok(module),
        Some(name) if module.name == name => Ok(module),
        Some(name) => find_nested(module, name).ok_or_else(|| CliError::NoFunction(name.into())),
    }
}

fn decoder(target: &Target) -> Decoder {
    Decoder::new(DecodeOptions {
        validate_operands: !target.no_validate,
    })
}

fn dis(target: &Target) -> Result<()> {
    let module = load(&target.file)?;
    let raw = select(&module, target.function.as_deref())?;
    let artifact = decoder(target).decode(raw).map_err(report)?;
    print!("{artifact}");
    Ok(())
}

fn stack(target: &Target) -> Result<()> {
    let module = load(&target.file)?;
    let raw = select(&module, target.function.as_deref())?;
    let artifact = decoder(target).decode(raw).map_err(report)?;
    let depth = max_stack_depth(&artifact.instructions, artifact.arg_count).map_err(report)?;
    println!("declared {}, computed {depth}", raw.stack_size);
    Ok(())
}

fn roundtrip(target: &Target) -> Result<()> {
    let module = load(&target.file)?;
    let raw = select(&module, target.function.as_deref())?;
    let artifact = decoder(target).decode(raw).map_err(report)?;
    let encoded = Encoder::new(EncodeOptions::default())
        .encode(&artifact)
        .map_err(report)?;

    let mut same = true;
    if encoded.code != raw.code {
        same = false;
        println!("code: {} bytes -> {} bytes", raw.code.len(), encoded.code.len());
    }
    if encoded.lnotab != raw.lnotab {
        same = false;
        println!("lnotab: {:?} -> {:?}", raw.lnotab, encoded.lnotab);
    }
    if encoded.stack_size != raw.stack_size {
        same = false;
        println!("stack_size: {} -> {}", raw.stack_size, encoded.stack_size);
    }
    if same {
        println!("identical");
    }
    Ok(())
}

fn patch(target: &Target, listing: &Path, output: &Path, keep_stack_size: bool) -> Result<()> {
    let mut module = load(&target.file)?;
    let function = target.function.as_deref();
    let source = fs::read_to_string(listing).map_err(|source| CliError::Read {
        path: listing.to_path_buf(),
        source,
    })?;

    let raw = select(&module, function)?;
    let mut artifact = decoder(target).decode(raw).map_err(report)?;
    assemble_into(&source, &mut artifact)?;
    info!(
        name = %artifact.name,
        instructions = artifact.instructions.len(),
        "assembled replacement body"
    );

    let encoder = Encoder::new(EncodeOptions {
        recompute_stack_size: !keep_stack_size,
        ..EncodeOptions::default()
    });
    let encoded = encoder.encode(&artifact).map_err(report)?;

    match function {
        Some(name) if module.name != name => {
            NestedCodeInstaller::new(name)
                .install(&mut module, encoded)
                .map_err(report)?;
        }
        _ => module = encoded,
    }

    store(output, &module)?;
    debug!(path = %output.display(), "wrote patched code object");
    Ok(())
}

fn asm(listing: &Path, name: &str, output: &Path) -> Result<()> {
    let source = fs::read_to_string(listing).map_err(|source| CliError::Read {
        path: listing.to_path_buf(),
        source,
    })?;
    let mut artifact = CodeArtifact::new(name);
    artifact.filename = listing.display().to_string();
    assemble_into(&source, &mut artifact)?;
    let encoded = Encoder::new(EncodeOptions::default())
        .encode(&artifact)
        .map_err(report)?;
    store(output, &encoded)?;
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging subscriber
    use tracing_subscriber::{EnvFilter, fmt};

    // Use RUST_LOG environment variable to control log level
    // Default to WARN if not set
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match &cli.command {
        Command::Dis(target) => dis(target),
        Command::Stack(target) => stack(target),
        Command::Roundtrip(target) => roundtrip(target),
        Command::Patch {
            target,
            listing,
            output,
            keep_stack_size,
        } => patch(target, listing, output, *keep_stack_size),
        Command::Asm {
            listing,
            name,
            output,
        } => asm(listing, name, output),
    }
}
