//! CLI subcommands: init, validate, schema, synth, plan, graph, bootstrap.

use crate::core::resource::Pool;
use crate::core::types::{ChangeSet, PlanAction, StackConfig};
use crate::core::{parser, planner, render, state};
use crate::topology::{self, bootstrap, LogicalIds};
use anyhow::{bail, Context, Result};
use clap::{Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

/// Rendering format of `synth`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Yaml,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a new tierplan project
    Init {
        /// Directory to initialize (default: current)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Validate tierplan.yaml and check the resulting graph
    Validate {
        /// Path to tierplan.yaml
        #[arg(short, long, default_value = "tierplan.yaml")]
        file: PathBuf,
    },

    /// Print the JSON Schema of tierplan.yaml
    Schema,

    /// Render the resource graph as a template document
    Synth {
        /// Path to tierplan.yaml
        #[arg(short, long, default_value = "tierplan.yaml")]
        file: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Yaml)]
        format: Format,

        /// Write the document here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Record a lock file under this state directory
        #[arg(long)]
        state_dir: Option<PathBuf>,
    },

    /// Show changes against the last synthesized lock
    Plan {
        /// Path to tierplan.yaml
        #[arg(short, long, default_value = "tierplan.yaml")]
        file: PathBuf,

        /// State directory
        #[arg(long, default_value = "state")]
        state_dir: PathBuf,
    },

    /// Show creation order and dependency edges
    Graph {
        /// Path to tierplan.yaml
        #[arg(short, long, default_value = "tierplan.yaml")]
        file: PathBuf,
    },

    /// Print the first-boot script of a pool
    Bootstrap {
        /// Path to tierplan.yaml
        #[arg(short, long, default_value = "tierplan.yaml")]
        file: PathBuf,

        /// Service label: server (web) or math (math worker)
        #[arg(long)]
        service: String,

        /// Log group name (default: substitution token of the plan's log group)
        #[arg(long)]
        log_group: Option<String>,
    },
}

/// Dispatch a CLI command.
pub fn dispatch(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Init { path } => cmd_init(&path),
        Commands::Validate { file } => cmd_validate(&file),
        Commands::Schema => cmd_schema(),
        Commands::Synth {
            file,
            format,
            output,
            state_dir,
        } => cmd_synth(&file, format, output.as_deref(), state_dir.as_deref()),
        Commands::Plan { file, state_dir } => cmd_plan(&file, &state_dir),
        Commands::Graph { file } => cmd_graph(&file),
        Commands::Bootstrap {
            file,
            service,
            log_group,
        } => cmd_bootstrap(&file, &service, log_group.as_deref()),
    }
}

const INIT_TEMPLATE: &str = r#"# tierplan stack configuration
name: Preprod
region: us-east-1
envFile: .env.preprod
# branch: edge
enableSSHAccess: false
# sshAllowedIpRange: 203.0.113.0/24
# webKeyPairName: my-web-key
# mathWorkerKeyPairName: my-math-key
network:
  maxAzs: 2
  cidrMask: 24
  vpcCidr: 10.0.0.0/16
"#;

fn cmd_init(path: &Path) -> Result<()> {
    let config_path = path.join("tierplan.yaml");
    if config_path.exists() {
        bail!("{} already exists", config_path.display());
    }

    let state_dir = path.join("state");
    std::fs::create_dir_all(&state_dir)
        .with_context(|| format!("cannot create {}", state_dir.display()))?;
    std::fs::write(&config_path, INIT_TEMPLATE)
        .with_context(|| format!("cannot write {}", config_path.display()))?;

    println!("Initialized tierplan project at {}", path.display());
    println!("  Created: {}", config_path.display());
    println!("  Created: {}/", state_dir.display());
    Ok(())
}

/// Parse and validate a config file, listing every error on stderr.
fn parse_and_validate(file: &Path) -> Result<StackConfig> {
    let config = parser::parse_config_file(file)?;
    let errors = parser::validate_config(&config);
    if errors.is_empty() {
        return Ok(config);
    }
    for e in &errors {
        eprintln!("  ERROR: {}", e);
    }
    bail!("{} validation error(s)", errors.len())
}

fn cmd_validate(file: &Path) -> Result<()> {
    let config = parse_and_validate(file)?;
    let graph = topology::build(&config)?;
    println!(
        "OK: {} ({} resources, {} edges)",
        config.name,
        graph.len(),
        graph.edges().len()
    );
    Ok(())
}

fn cmd_schema() -> Result<()> {
    let schema = schemars::schema_for!(StackConfig);
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}

fn cmd_synth(
    file: &Path,
    format: Format,
    output: Option<&Path>,
    state_dir: Option<&Path>,
) -> Result<()> {
    let config = parse_and_validate(file)?;
    let graph = topology::build(&config)?;
    let document = match format {
        Format::Yaml => render::to_yaml(&graph)?,
        Format::Json => render::to_json(&graph)?,
    };

    match output {
        Some(path) => {
            std::fs::write(path, &document)
                .with_context(|| format!("cannot write {}", path.display()))?;
            eprintln!("Wrote {} ({} resources)", path.display(), graph.len());
        }
        None => print!("{}", document),
    }

    if let Some(dir) = state_dir {
        let lock = state::new_lock(&graph)?;
        let path = state::save_lock(dir, &lock)?;
        eprintln!("Locked {} at {}", lock.fingerprint, path.display());
    }
    Ok(())
}

fn cmd_plan(file: &Path, state_dir: &Path) -> Result<()> {
    let config = parse_and_validate(file)?;
    let graph = topology::build(&config)?;
    let lock = state::load_lock(state_dir, graph.name())?;
    let changes = planner::plan(&graph, lock.as_ref())?;
    print_plan(&changes);
    Ok(())
}

fn plan_symbol(action: &PlanAction) -> &'static str {
    match action {
        PlanAction::Create => "+",
        PlanAction::Update => "~",
        PlanAction::Destroy => "-",
        PlanAction::NoOp => " ",
    }
}

/// Display a change set to stdout.
fn print_plan(changes: &ChangeSet) {
    println!("Planning: {} ({} resources)", changes.name, changes.changes.len());
    println!();
    for change in &changes.changes {
        println!(
            "  {} {} [{}]",
            plan_symbol(&change.action),
            change.description,
            change.resource_type
        );
    }
    println!();
    println!(
        "Plan: {} to add, {} to change, {} to destroy, {} unchanged.",
        changes.to_create, changes.to_update, changes.to_destroy, changes.unchanged
    );
}

fn cmd_graph(file: &Path) -> Result<()> {
    let config = parse_and_validate(file)?;
    let graph = topology::build(&config)?;

    println!("Creation order ({} resources):", graph.len());
    for (i, id) in graph.execution_order().iter().enumerate() {
        let type_name = graph.resource(id).map(|r| r.type_name()).unwrap_or("?");
        println!("  {:>3}. {} [{}]", i + 1, id, type_name);
    }

    let edges = graph.edges();
    println!();
    println!("Edges ({}):", edges.len());
    for edge in &edges {
        println!("  {} -> {} ({:?})", edge.from, edge.to, edge.kind);
    }
    Ok(())
}

fn pool_for_service(service: &str) -> Result<Pool> {
    Pool::ALL
        .into_iter()
        .find(|p| p.service_label() == service)
        .with_context(|| {
            let labels: Vec<&str> = Pool::ALL.iter().map(|p| p.service_label()).collect();
            format!("unknown service '{}' (expected one of: {})", service, labels.join(", "))
        })
}

fn cmd_bootstrap(file: &Path, service: &str, log_group: Option<&str>) -> Result<()> {
    let pool = pool_for_service(service)?;
    let config = parse_and_validate(file)?;
    let ids = LogicalIds::new(&config.name);
    let destination = match log_group {
        Some(name) => name.to_string(),
        None => format!("${{{}}}", ids.log_group),
    };
    print!(
        "{}",
        bootstrap::render(&destination, &config.region, pool.service_label())
    );
    Ok(())
}
