//! paramsketch CLI
//!
//! Usage:
//!   paramsketch render <INPUT> [-o OUTPUT] [--svg FILE] [--var NAME=VALUE]... [--offset X,Y]
//!   paramsketch parameterize <INPUT> [-o OUTPUT] [--default EXPR]
//!
//! Options:
//!   -c, --config <FILE>  Settings file (TOML format)
//!   -v, --verbose        Log pipeline details to stderr
//!   -h, --help           Print help

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use tracing::info;

use paramsketch::annotation::AnnotationError;
use paramsketch::drawing::io::{backup_existing, parametric_output_path};
use paramsketch::graph::builder::GraphError;
use paramsketch::svg::save_svg;
use paramsketch::variables::VariableError;
use paramsketch::{parameterize, render, Drawing, Error, RenderError, Settings};

#[derive(Parser)]
#[command(name = "paramsketch")]
#[command(about = "Render parametric 2D drawings from length annotations")]
struct Cli {
    /// Log pipeline details (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Settings file (TOML format)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render a parametric drawing and print its landmarks
    Render {
        /// Parametric drawing (TOML)
        input: PathBuf,

        /// Output drawing (defaults to <INPUT>_rendered.toml)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also write an SVG preview
        #[arg(long)]
        svg: Option<PathBuf>,

        /// Extra variable, may be repeated
        #[arg(long = "var", value_name = "NAME=VALUE", value_parser = parse_variable)]
        variables: Vec<(String, f64)>,

        /// Placement offset of the rendered geometry
        #[arg(long, value_name = "X,Y", value_parser = parse_offset)]
        offset: Option<(f64, f64)>,
    },

    /// Annotate and connect a freehand drawing so it can be rendered
    Parameterize {
        /// Drawing to convert (TOML)
        input: PathBuf,

        /// Output drawing (defaults to <DIR>/parametric/parametric_<NAME>)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Default length expression for every entity
        #[arg(long = "default", value_name = "EXPR")]
        default_annotation: Option<String>,
    },
}

fn parse_variable(s: &str) -> Result<(String, f64), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{}'", s))?;
    let value = value
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("invalid value for '{}': {}", name.trim(), e))?;
    Ok((name.trim().to_string(), value))
}

fn parse_offset(s: &str) -> Result<(f64, f64), String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y, got '{}'", s))?;
    let parse = |v: &str| {
        v.trim()
            .parse::<f64>()
            .map_err(|e| format!("invalid coordinate '{}': {}", v.trim(), e))
    };
    Ok((parse(x)?, parse(y)?))
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        report(&e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Error> {
    let settings = match &cli.config {
        Some(path) => Settings::from_file(path)?,
        None => Settings::default(),
    };

    match cli.command {
        Command::Render {
            input,
            output,
            svg,
            variables,
            offset,
        } => {
            let mut config = settings.render_config();
            for (name, value) in variables {
                config = config.with_variable(name, value);
            }
            if let Some((x, y)) = offset {
                config = config.with_offset(x, y);
            }

            let source = Drawing::from_file(&input)?;
            let (drawing, landmarks) = render(&source, config)?;

            let output = output.unwrap_or_else(|| rendered_output_path(&input));
            drawing.save(&output)?;
            info!(path = %output.display(), "wrote rendered drawing");

            if let Some(svg) = svg {
                save_svg(&drawing, &settings.svg, &svg)?;
                info!(path = %svg.display(), "wrote svg preview");
            }

            for (label, position) in &landmarks {
                println!("{}: {}", label, position);
            }
        }
        Command::Parameterize {
            input,
            output,
            default_annotation,
        } => {
            let mut config = settings.repair_config();
            if let Some(expr) = default_annotation {
                config = config.with_default_annotation(expr);
            }

            let mut drawing = Drawing::from_file(&input)?;
            let report = parameterize(&mut drawing, &config)?;

            let output = output.unwrap_or_else(|| parametric_output_path(&input));
            if let Some(backup) = backup_existing(&output)? {
                eprintln!("Moved existing '{}' to '{}'", output.display(), backup.display());
            }
            drawing.save(&output)?;

            println!(
                "{} entities kept, {} removed, {} cluster(s) joined by {} connector(s)",
                report.kept,
                report.removed,
                report.components,
                report.connectors.len()
            );
            println!("Wrote {}", output.display());
        }
    }
    Ok(())
}

/// `<dir>/<stem>_rendered.toml`
fn rendered_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    input.with_file_name(format!("{}_rendered.toml", stem))
}

/// Print an error, with a source excerpt when it comes from an expression
fn report(error: &Error) {
    match error {
        Error::Render(RenderError::Graph(GraphError::Expression {
            entity,
            expression,
            source,
        })) => {
            eprintln!("Error in annotation of {}", entity);
            eprint!("{}", source.format(expression, "annotation"));
        }
        Error::Render(RenderError::Graph(GraphError::Annotation {
            entity,
            source: AnnotationError::Expression {
                expression, source, ..
            },
        })) => {
            eprintln!("Error in annotation of {}", entity);
            eprint!("{}", source.format(expression, "annotation"));
        }
        Error::Render(RenderError::Variables(VariableError::Expression {
            name,
            expression,
            source,
        })) => {
            eprintln!("Error in variable '{}'", name);
            eprint!("{}", source.format(expression, "variables"));
        }
        _ => eprintln!("Error: {}", error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_variable() {
        assert_eq!(parse_variable("w=2.5"), Ok(("w".to_string(), 2.5)));
        assert_eq!(parse_variable(" h = 4 "), Ok(("h".to_string(), 4.0)));
        assert!(parse_variable("w").is_err());
        assert!(parse_variable("w=abc").is_err());
    }

    #[test]
    fn test_parse_offset() {
        assert_eq!(parse_offset("10,-5"), Ok((10.0, -5.0)));
        assert!(parse_offset("10").is_err());
    }

    #[test]
    fn test_rendered_output_path() {
        assert_eq!(
            rendered_output_path(Path::new("plans/room.toml")),
            PathBuf::from("plans/room_rendered.toml")
        );
    }

    #[test]
    fn test_cli_parses_render() {
        let cli = Cli::try_parse_from([
            "paramsketch",
            "render",
            "in.toml",
            "--var",
            "w=3",
            "--var",
            "h=4",
            "--offset",
            "1,2",
        ])
        .unwrap();
        match cli.command {
            Command::Render {
                variables, offset, ..
            } => {
                assert_eq!(variables.len(), 2);
                assert_eq!(offset, Some((1.0, 2.0)));
            }
            _ => panic!("expected render"),
        }
    }
}
