use clap::Parser;
use mjml_email::{parse_with_registry, MjmlError, ParserOptions, Registry, RenderOptions, Renderer};
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

/// Compile MJML email markup into HTML.
#[derive(Parser, Debug)]
#[command(name = "mjml-compile", version, about)]
struct Cli {
    /// Markup files to compile
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// YAML file with render options
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write HTML here instead of stdout (a directory when several files are given)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Only check the files, print no HTML
    #[arg(long)]
    validate: bool,

    /// Print the parsed tree as YAML instead of compiling
    #[arg(long, conflicts_with = "validate")]
    dump_tree: bool,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let options = match &cli.config {
        Some(path) => match RenderOptions::from_path(path) {
            Ok(options) => options,
            Err(e) => {
                eprintln!("✗ {}", path.display());
                print_error(&e);
                process::exit(2);
            }
        },
        None => RenderOptions::default(),
    };

    let renderer = Renderer::new(Registry::core(), options);
    let mut exit_code = 0;
    let many = cli.files.len() > 1;

    for file_path in &cli.files {
        if let Err(e) = compile_file(&cli, &renderer, file_path, many) {
            eprintln!("✗ {} has errors:", file_path.display());
            print_error(&e);
            exit_code = 1;
        }
    }

    process::exit(exit_code);
}

fn compile_file(cli: &Cli, renderer: &Renderer, path: &Path, many: bool) -> Result<(), MjmlError> {
    let content = fs::read_to_string(path)
        .map_err(|e| MjmlError::Config(format!("Failed to read file: {}", e)))?;

    if cli.dump_tree {
        let parser_options = ParserOptions {
            keep_comments: renderer.options().keep_comments,
        };
        let root = parse_with_registry(&content, Registry::core(), &parser_options)?;
        print!("{}", serde_yaml::to_string(&root)?);
        return Ok(());
    }

    let output = renderer.render(&content)?;
    for diagnostic in &output.errors {
        eprintln!("  ! {}: {}", path.display(), diagnostic);
    }

    if cli.validate {
        println!("✓ {} is valid", path.display());
        return Ok(());
    }

    match &cli.output {
        None => println!("{}", output.html),
        Some(target) => {
            let destination = if many || target.is_dir() {
                let stem = path.file_stem().unwrap_or_default();
                target.join(Path::new(stem).with_extension("html"))
            } else {
                target.clone()
            };
            fs::write(&destination, &output.html).map_err(|e| {
                MjmlError::Config(format!("Failed to write '{}': {}", destination.display(), e))
            })?;
            println!("✓ {} -> {}", path.display(), destination.display());
        }
    }
    Ok(())
}

fn print_error(error: &MjmlError) {
    match error {
        MjmlError::ParseError {
            line,
            column,
            message,
        } => {
            eprintln!("  Parse error at line {}, column {}:", line, column);
            eprintln!("    {}", message);
        }
        MjmlError::UnknownTag { tag, line, column } => {
            eprintln!("  Unknown tag <{}> at line {}, column {}", tag, line, column);
        }
        MjmlError::InvalidAttributeValue {
            tag,
            attribute,
            value,
            expected,
        } => {
            eprintln!("  Invalid value '{}' for attribute '{}' on <{}>:", value, attribute, tag);
            eprintln!("    Expected {}", expected);
        }
        MjmlError::InvalidUrl { url } => {
            eprintln!("  Unsafe URL '{}'", url);
        }
        MjmlError::Config(msg) => {
            eprintln!("  {}", msg);
        }
    }
}
