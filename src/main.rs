use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};
use rayon::prelude::*;
use refmt::debug::dump_tree;
use refmt::diagnostics::{TracingReporter, WriterReporter};
use refmt::formatter::{CodeFormatter, FormatOptions, Mode};
use refmt::language::SupportedLanguage;
use refmt::parser::GrammarAdapter;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Parser, Debug)]
#[command(name = "refmt", version, about = "Syntax-tree Java reformatter")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    Fmt {
        /// Paths (files or directories) to format (defaults to current dir)
        paths: Vec<PathBuf>,
        /// Write the formatted content back to the files
        #[arg(long)]
        write: bool,
        /// Check if files are formatted; non-zero exit if changes needed
        #[arg(long)]
        check: bool,
        /// Maximum line width
        #[arg(long, default_value_t = 120)]
        max_width: usize,
        /// Print every correction to stderr
        #[arg(long)]
        report: bool,
    },
    Debug {
        /// File to debug
        file: PathBuf,
    },
}

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("refmt=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(false),
        )
        .init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Commands::Fmt {
            paths,
            write,
            check,
            max_width,
            report,
        } => {
            if write && check {
                bail!("--write and --check are mutually exclusive");
            }
            let mode = if write {
                Mode::Write
            } else if check {
                Mode::Check
            } else {
                Mode::Stdout
            };
            let opts = FormatOptions {
                max_line_length: max_width,
                mode,
                ..FormatOptions::default()
            };
            let targets = if paths.is_empty() {
                vec![PathBuf::from(".")]
            } else {
                paths
            };
            let mut java_files = Vec::new();
            for p in targets {
                collect_java_files(&p, &mut java_files);
            }
            tracing::debug!(files = java_files.len(), "collected sources");

            let results: Vec<_> = java_files
                .par_iter()
                .map_init(
                    || CodeFormatter::new(opts.clone()),
                    |formatter, path| match formatter {
                        Ok(formatter) => process_file(formatter, path, report),
                        Err(e) => Err(anyhow!("cannot start formatter: {e}")),
                    },
                )
                .collect();
            let mut had_change = false;
            for r in results {
                match r {
                    Ok(changed) => had_change |= changed,
                    Err(e) => eprintln!("{:#}", e),
                }
            }
            if matches!(mode, Mode::Check) && had_change {
                std::process::exit(1);
            }
        }
        Commands::Debug { file } => {
            debug_file(&file)?;
        }
    }
    Ok(())
}

fn debug_file(path: &Path) -> Result<()> {
    let language = SupportedLanguage::from_path(path)
        .ok_or_else(|| anyhow!("no grammar for {}", path.display()))?;
    let content = fs::read_to_string(path)?;
    let tree = GrammarAdapter::init()?.parse(language, &refmt::formatter::normalize(&content))?;
    println!("===== {} =====", path.display());
    print!("{}", dump_tree(&tree));
    Ok(())
}

fn is_java(path: &Path) -> bool {
    SupportedLanguage::from_path(path).is_some()
}

fn collect_java_files(path: &Path, out: &mut Vec<PathBuf>) {
    if path.is_file() {
        if is_java(path) {
            out.push(path.to_path_buf());
        }
        return;
    }
    for entry in WalkDir::new(path).into_iter().filter_map(|e| e.ok()) {
        let p = entry.path();
        if p.is_file() && is_java(p) {
            out.push(p.to_path_buf());
        }
    }
}

fn process_file(formatter: &mut CodeFormatter, path: &Path, report: bool) -> Result<bool> {
    let content =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let name = path.display().to_string();
    let formatted = if report {
        let mut reporter = WriterReporter::new(Vec::new());
        let formatted = formatter.reformat_or_original(&name, &content, &mut reporter);
        eprint!("{}", String::from_utf8_lossy(&reporter.into_inner()));
        formatted
    } else {
        formatter.reformat_or_original(&name, &content, &mut TracingReporter)
    };
    let changed = formatted != content;
    match formatter.options().mode {
        Mode::Stdout => {
            println!("===== {} =====", path.display());
            print!("{}", formatted);
        }
        Mode::Write => {
            if changed {
                fs::write(path, formatted)
                    .with_context(|| format!("writing {}", path.display()))?;
            }
        }
        Mode::Check => {
            if changed {
                println!("{} needs formatting", path.display());
            }
        }
    }
    Ok(changed)
}
