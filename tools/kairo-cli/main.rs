use clap::{Parser, Subcommand};
use kairo::bytecode::visualizer;
use kairo::legacy;
use kairo::prelude::*;
use kairo::project::ProjectManifest;
use std::fs;
use std::path::Path;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// Compiles node-graph scripts and runs them headless
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    action: Action,
}

#[derive(Subcommand, Debug)]
enum Action {
    /// Compile every graph of a project manifest into a script table
    Build {
        /// Path to the project manifest JSON
        manifest: String,
        /// Where to write the bincode script table
        #[arg(short, long, default_value = "scripts.bin")]
        output: String,
        /// Also write the generated source of all units and the lookup table
        #[arg(long)]
        source: Option<String>,
    },
    /// Run one unit of a script table for a number of ticks
    Run {
        /// Path to a script table written by `build`
        table: String,
        /// Index of the unit to run
        #[arg(short, long, default_value_t = 0)]
        asset: u16,
        #[arg(short, long, default_value_t = 60)]
        ticks: u32,
        /// Seconds per tick
        #[arg(long, default_value_t = 1.0 / 60.0)]
        dt: f32,
        /// Optional runtime configuration JSON
        #[arg(long)]
        config: Option<String>,
    },
    /// Print the program and generated source of every unit in a script table
    Dump {
        table: String,
    },
    /// Pack a single graph into the legacy binary record format
    Pack {
        graph: String,
        #[arg(short, long)]
        output: String,
        #[arg(long, default_value_t = 0)]
        uuid: u64,
    },
    /// Decode a legacy binary blob and list its records
    Unpack {
        blob: String,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match cli.action {
        Action::Build {
            manifest,
            output,
            source,
        } => run_build(&manifest, &output, source.as_deref()),
        Action::Run {
            table,
            asset,
            ticks,
            dt,
            config,
        } => run_simulation(&table, asset, ticks, dt, config.as_deref()),
        Action::Dump { table } => run_dump(&table),
        Action::Pack {
            graph,
            output,
            uuid,
        } => run_pack(&graph, &output, uuid),
        Action::Unpack { blob } => run_unpack(&blob),
    }
}

fn run_build(manifest_path: &str, output: &str, source: Option<&str>) {
    let start = Instant::now();
    let manifest = ProjectManifest::from_file(manifest_path)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to load manifest: {}", e)));
    let base_dir = Path::new(manifest_path)
        .parent()
        .unwrap_or_else(|| Path::new("."));
    let assets = manifest
        .load_assets(base_dir)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to load graphs: {}", e)));

    let build = build_project(&assets, None);
    build
        .table
        .save(output)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to save script table: {}", e)));
    if let Some(path) = source {
        fs::write(path, build.table.render_source()).unwrap_or_else(|e| {
            exit_with_error(&format!("Failed to write source '{}': {}", path, e))
        });
    }

    println!(
        "Built {} of {} graphs in {:?} -> {}",
        build.table.len(),
        assets.len(),
        start.elapsed(),
        output
    );
    for error in &build.errors {
        eprintln!("  error: {}", error);
    }
    if !build.is_ok() {
        std::process::exit(1);
    }
}

fn run_simulation(table_path: &str, asset: u16, ticks: u32, dt: f32, config: Option<&str>) {
    let table = ScriptTable::from_file(table_path)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to load script table: {}", e)));
    let config = match config {
        Some(path) => {
            let json = fs::read_to_string(path).unwrap_or_else(|e| {
                exit_with_error(&format!("Failed to read config '{}': {}", path, e))
            });
            serde_json::from_str(&json)
                .unwrap_or_else(|e| exit_with_error(&format!("Invalid config: {}", e)))
        }
        None => RuntimeConfig::default(),
    };

    let runtime = ScriptRuntime::new(table, FunctionRegistry::new(), config);
    let mut scheduler = Scheduler::new(&runtime);
    let object_id = 1;
    scheduler.spawn(
        object_id,
        ComponentRecord {
            asset_index: asset,
            auto_run: true,
            repeatable: false,
        },
    );

    for tick in 0..ticks {
        for command in scheduler.tick(dt) {
            println!("[tick {:>4}] {:?}", tick, command);
        }
        match scheduler.instance(object_id) {
            Some(instance) if instance.is_finished() => {
                println!("[tick {:>4}] finished", tick);
                return;
            }
            Some(_) => {}
            None => {
                println!("[tick {:>4}] object removed", tick);
                return;
            }
        }
    }
    if let Some(instance) = scheduler.instance(object_id) {
        println!("Stopped after {} ticks in state {:?}", ticks, instance.state());
    }
}

fn run_dump(table_path: &str) {
    let table = ScriptTable::from_file(table_path)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to load script table: {}", e)));
    for (index, unit) in table.units().enumerate() {
        println!("=== [{}] {} (stack {}) ===", index, unit.name, unit.stack_size);
        println!("{}", visualizer::visualize_program(&unit.program, &unit.name));
        println!("{}", unit.source);
    }
    println!("{}", table.render_table_source());
}

fn run_pack(graph_path: &str, output: &str, uuid: u64) {
    let json = fs::read_to_string(graph_path)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to read '{}': {}", graph_path, e)));
    let graph = Graph::from_json(&json)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to parse graph: {}", e)));
    let unit = Compiler::builder(graph.clone())
        .with_asset_uuid(uuid)
        .with_asset_name(graph_path)
        .build()
        .compile()
        .unwrap_or_else(|e| exit_with_error(&format!("Compilation failed: {}", e)));
    let blob = legacy::encode(&graph, &unit)
        .unwrap_or_else(|e| exit_with_error(&format!("Packing failed: {}", e)));
    fs::write(output, &blob)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to write '{}': {}", output, e)));
    println!("Packed {} bytes -> {}", blob.len(), output);
}

fn run_unpack(blob_path: &str) {
    let bytes = fs::read(blob_path)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to read '{}': {}", blob_path, e)));
    let blob = legacy::decode(&bytes)
        .unwrap_or_else(|e| exit_with_error(&format!("Decoding failed: {}", e)));
    println!(
        "uuid {:016X}, stack {}, {} records",
        blob.uuid,
        blob.stack_size,
        blob.nodes.len()
    );
    for (index, node) in blob.nodes.iter().enumerate() {
        println!(
            "{:>3} @{:04} {:<14} -> {:?} {:?}",
            index,
            node.offset,
            node.node_type.name(),
            node.successors,
            node.payload
        );
    }
}

fn exit_with_error(message: &str) -> ! {
    eprintln!("\nError: {}", message);
    std::process::exit(1);
}
