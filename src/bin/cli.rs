//! cbv CLI - import and browse class-based view snapshots.

use anyhow::{bail, Context, Result};
use cbv::{Cbv, CbvConfig, DumpReflector, Snapshot};
use clap::{Parser, Subcommand};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cbv")]
#[command(about = "cbv - inspect class-based views across framework versions", long_about = None)]
struct Cli {
    /// Path to the config file
    #[arg(short, long, default_value = "cbv.toml")]
    config: PathBuf,

    /// Path to the store directory (default: from config, else ./.cbv)
    #[arg(short, long)]
    store: Option<PathBuf>,

    /// Log debug output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new store
    Init,

    /// Import one project version from an object-graph dump
    Import {
        /// Dump file written by the host runtime
        #[arg(short, long)]
        dump: PathBuf,

        /// Project name (default: from config, else from the dump)
        #[arg(short, long)]
        project: Option<String>,

        /// Version (default: from config, else from the dump)
        #[arg(short = 'V', long)]
        version: Option<String>,

        /// Root module to walk; repeatable (default: config sources)
        #[arg(short, long = "module")]
        modules: Vec<String>,
    },

    /// List stored projects and versions
    List,

    /// Show a snapshot, or one class in it
    Show {
        project: String,
        version: String,

        /// Class path or name
        klass: Option<String>,
    },

    /// Compare two versions of a project
    Diff {
        project: String,
        old: String,
        new: String,
    },

    /// Delete a stored snapshot
    Delete {
        project: String,
        version: String,

        /// Skip confirmation
        #[arg(short, long)]
        force: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let config = CbvConfig::load(&cli.config)
        .with_context(|| format!("loading config {}", cli.config.display()))?;
    let store_path = cli
        .store
        .clone()
        .unwrap_or_else(|| config.resolve_storage_path(&cli.config));

    match cli.command {
        Commands::Init => {
            let cbv = Cbv::init(&store_path)?;
            println!("✓ Initialized cbv store at {}", cbv.root().display());
        }

        Commands::Import {
            dump,
            project,
            version,
            modules,
        } => {
            let reflector = DumpReflector::load(&dump)
                .with_context(|| format!("reading dump {}", dump.display()))?;

            debug!(objects = reflector.object_count(), "loaded dump");

            let project = config.project_name(project, reflector.project());
            let Some(version) = config.project_version(version, reflector.version()) else {
                bail!("no version given; pass --version or set [project] version");
            };
            let roots = if modules.is_empty() {
                config.root_modules()
            } else {
                modules
            };
            if roots.is_empty() {
                bail!("no root modules; pass --module or add [[sources]] to {}", cli.config.display());
            }

            let mut cbv = Cbv::init(&store_path)?;
            let summary = cbv.import(&reflector, &roots, &project, &version, config.lazy_functions())?;

            println!("✓ Imported {} {}", summary.project, summary.version);
            println!("  Modules:     {}", summary.stats.modules);
            println!("  Classes:     {}", summary.stats.klasses);
            println!("  Methods:     {}", summary.stats.methods);
            println!("  Attributes:  {}", summary.stats.attributes);
            println!("  Inheritance: {}", summary.stats.inheritance);
        }

        Commands::List => {
            let cbv = Cbv::open(&store_path)?;
            let versions = cbv.versions()?;

            if versions.is_empty() {
                println!("No snapshots found.");
            } else {
                println!("Snapshots ({}):", versions.len());
                for v in versions {
                    println!(
                        "  - {} {} ({} classes, imported {})",
                        v.project,
                        v.version,
                        v.stats.klasses,
                        v.imported_at.format("%Y-%m-%d %H:%M")
                    );
                }
            }
        }

        Commands::Show {
            project,
            version,
            klass,
        } => {
            let cbv = Cbv::open(&store_path)?;
            let snapshot = cbv.snapshot(&project, &version)?;
            match klass {
                Some(query) => show_klass(&snapshot, &query)?,
                None => show_snapshot(&snapshot),
            }
        }

        Commands::Diff { project, old, new } => {
            let cbv = Cbv::open(&store_path)?;
            let diff = cbv.diff(&project, &old, &new)?;

            if diff.is_empty() {
                println!("No class or method changes between {} and {}.", old, new);
            } else {
                for path in &diff.added_klasses {
                    println!("+ class  {}", path);
                }
                for path in &diff.removed_klasses {
                    println!("- class  {}", path);
                }
                for path in &diff.added_methods {
                    println!("+ method {}", path);
                }
                for path in &diff.removed_methods {
                    println!("- method {}", path);
                }
            }
        }

        Commands::Delete {
            project,
            version,
            force,
        } => {
            if !force {
                println!(
                    "Are you sure you want to delete {} {}? Use --force to confirm.",
                    project, version
                );
                return Ok(());
            }

            let cbv = Cbv::open(&store_path)?;
            cbv.delete(&project, &version)?;
            println!("✓ Deleted {} {}", project, version);
        }
    }

    Ok(())
}

fn show_snapshot(snapshot: &Snapshot) {
    let stats = snapshot.stats();
    println!("{} {}", snapshot.project, snapshot.version);
    println!("─────────────────");
    println!("Imported: {}", snapshot.imported_at.to_rfc3339());
    println!(
        "Modules: {}  Classes: {}  Methods: {}  Attributes: {}",
        stats.modules, stats.klasses, stats.methods, stats.attributes
    );

    for module in &snapshot.modules {
        let klasses: Vec<&str> = snapshot
            .klasses
            .iter()
            .filter(|k| k.module == module.name)
            .map(|k| k.name.as_str())
            .collect();
        if klasses.is_empty() {
            continue;
        }
        println!();
        println!("{}  ({})", module.name, file_name(&module.filename));
        for name in klasses {
            println!("  {}", name);
        }
    }
}

fn show_klass(snapshot: &Snapshot, query: &str) -> Result<()> {
    let matches = snapshot.find_klasses(query);
    let klass = match matches.as_slice() {
        [] => bail!("no class matching '{}' in {} {}", query, snapshot.project, snapshot.version),
        [klass] => *klass,
        several => {
            let paths: Vec<&str> = several.iter().map(|k| k.path.as_str()).collect();
            bail!("'{}' is ambiguous: {}", query, paths.join(", "));
        }
    };

    let mro = snapshot.mro(&klass.path);

    println!("class {}", klass.name);
    println!("  from {} import {}", klass.best_import_path, klass.name);
    match klass.line_number {
        Some(line) => println!("  defined in {} line {}", klass.module, line),
        None => println!("  defined in {}", klass.module),
    }
    if let Some(summary) = klass.docstring.lines().next().filter(|l| !l.is_empty()) {
        println!("  {}", summary);
    }

    if mro.len() > 1 {
        println!();
        println!("Ancestors:");
        for ancestor in &mro[1..] {
            println!("  {}", ancestor.path);
        }
    }

    let children = snapshot.children_of(&klass.path);
    if !children.is_empty() {
        println!();
        println!("Subclasses:");
        for child in &children {
            println!("  {}", child);
        }
        let descendants = snapshot.descendants_of(&klass.path);
        if descendants.len() > children.len() {
            println!("  ({} descendants in total)", descendants.len());
        }
    }

    // The first definition along the MRO wins.
    let mut seen = HashSet::new();
    println!();
    println!("Attributes:");
    for owner in &mro {
        for attribute in snapshot.attributes_of(&owner.path) {
            if seen.insert(attribute.name.as_str()) {
                println!("  {} = {}  [{}]", attribute.name, attribute.value, owner.name);
            }
        }
    }

    let mut seen = HashSet::new();
    println!();
    println!("Methods:");
    for owner in &mro {
        for method in snapshot.methods_of(&owner.path) {
            if seen.insert(method.name.as_str()) {
                println!("  {}({})  [{}]", method.name, method.kwargs.join(", "), owner.name);
            }
        }
    }

    Ok(())
}

fn file_name(path: &str) -> &str {
    Path::new(path)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(path)
}
