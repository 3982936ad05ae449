use crate::artifact::{CompiledUnit, ScriptTable};
use crate::bytecode::{Program, Trigger};
use crate::error::CompileError;
use crate::graph::Graph;
use crate::hash;
use crate::runtime::FunctionRegistry;
use itertools::Itertools;
use tracing::{error, info};

#[cfg(feature = "debug-tools")]
use {crate::bytecode::visualizer, std::fs, tracing::warn};

mod builder;
pub mod context;
mod nodes;

use builder::GraphLowering;
use context::EmittedUnit;

/// Stack slots every unit needs on top of the locals of its largest node block.
pub const BASE_STACK_SLOTS: u16 = 4;

/// Compiles one graph asset into a `CompiledUnit`.
pub struct Compiler<'r> {
    graph: Graph,
    asset_uuid: u64,
    asset_name: String,
    functions: Option<&'r FunctionRegistry>,
}

pub struct CompilerBuilder<'r> {
    graph: Graph,
    asset_uuid: u64,
    asset_name: String,
    functions: Option<&'r FunctionRegistry>,
}

impl<'r> CompilerBuilder<'r> {
    pub fn new(graph: Graph) -> Self {
        Self {
            graph,
            asset_uuid: 0,
            asset_name: "graph".to_string(),
            functions: None,
        }
    }

    /// UUID of the graph asset; names the generated function and keys the script table.
    pub fn with_asset_uuid(mut self, uuid: u64) -> Self {
        self.asset_uuid = uuid;
        self
    }

    /// Name used in diagnostics and generated comments.
    pub fn with_asset_name(mut self, name: &str) -> Self {
        self.asset_name = name.to_string();
        self
    }

    /// Checks Func nodes against this registry and warns about names it does not know.
    pub fn with_functions(mut self, functions: &'r FunctionRegistry) -> Self {
        self.functions = Some(functions);
        self
    }

    pub fn build(self) -> Compiler<'r> {
        Compiler {
            graph: self.graph,
            asset_uuid: self.asset_uuid,
            asset_name: self.asset_name,
            functions: self.functions,
        }
    }
}

impl<'r> Compiler<'r> {
    pub fn builder(graph: Graph) -> CompilerBuilder<'r> {
        CompilerBuilder::new(graph)
    }

    pub fn compile(self) -> Result<CompiledUnit, CompileError> {
        info!(
            "Compiling '{}' ({} nodes, {} links)",
            self.asset_name,
            self.graph.nodes().len(),
            self.graph.links().len()
        );

        let lowering = GraphLowering::new(&self.graph, &self.asset_name, self.functions);
        let (emitted, entries) = lowering.lower()?;

        let function = format!("graph_{}", hash::to_hex64(self.asset_uuid));
        let max_locals = emitted.max_locals.min(u16::MAX as usize) as u16;
        let stack_size = BASE_STACK_SLOTS.saturating_add(max_locals);
        let source = self.render_source(&function, &emitted, &entries);

        let program = Program {
            code: emitted.code,
            entries,
            globals: emitted.globals,
            max_locals,
        };

        let unit = CompiledUnit {
            uuid: self.asset_uuid,
            name: self.asset_name,
            function,
            program,
            stack_size,
            source,
        };

        #[cfg(feature = "debug-tools")]
        write_debug_files(&unit);

        info!(
            "Compiled '{}': {} instructions, {} globals, stack {}",
            unit.name,
            unit.program.code.len(),
            unit.program.globals.len(),
            unit.stack_size
        );
        Ok(unit)
    }

    fn render_source(
        &self,
        function: &str,
        emitted: &EmittedUnit,
        entries: &[Option<u32>; 3],
    ) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "// '{}' ({})\n",
            self.asset_name,
            hash::to_hex64(self.asset_uuid)
        ));
        for line in &emitted.global_lines {
            out.push_str(line);
            out.push('\n');
        }
        if !emitted.global_lines.is_empty() {
            out.push('\n');
        }
        if !emitted.state_lines.is_empty() {
            out.push_str("typedef struct {\n");
            for line in &emitted.state_lines {
                out.push_str(&format!("  {}\n", line));
            }
            out.push_str(&format!("}} {}_state;\n\n", function));
        }

        out.push_str(&format!(
            "void {}(Instance* inst, Trigger trigger) {{\n",
            function
        ));
        if !emitted.state_lines.is_empty() {
            out.push_str(&format!(
                "  {0}_state* state = ({0}_state*)inst->state;\n",
                function
            ));
        }
        out.push_str("  switch (trigger) {\n");
        let cases = Trigger::ALL
            .iter()
            .filter(|t| entries[t.pin() as usize].is_some())
            .map(|t| {
                format!(
                    "    case TRIGGER_{}: goto {};",
                    t.to_string().to_uppercase(),
                    t.label()
                )
            })
            .join("\n");
        if !cases.is_empty() {
            out.push_str(&cases);
            out.push('\n');
        }
        out.push_str("    default: return;\n");
        out.push_str("  }\n");
        for line in &emitted.body_lines {
            out.push_str(line);
            out.push('\n');
        }
        out.push_str("}\n");
        out
    }
}

/// One graph asset of a project build.
#[derive(Debug, Clone)]
pub struct GraphAsset {
    pub uuid: u64,
    /// Asset path or display name, used in diagnostics.
    pub name: String,
    /// The graph JSON as saved by the editor.
    pub json: String,
}

/// The result of building every graph asset of a project.
#[derive(Debug, Default)]
pub struct ProjectBuild {
    pub table: ScriptTable,
    /// Assets that failed to build. They are missing from `table`.
    pub errors: Vec<CompileError>,
}

impl ProjectBuild {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Builds all assets into one script table. A broken asset is reported and skipped so
/// the remaining assets still build.
pub fn build_project(assets: &[GraphAsset], functions: Option<&FunctionRegistry>) -> ProjectBuild {
    let mut build = ProjectBuild::default();

    for asset in assets {
        let result = Graph::from_json(&asset.json)
            .map_err(|source| CompileError::Graph {
                asset: asset.name.clone(),
                source,
            })
            .and_then(|graph| {
                let mut builder = Compiler::builder(graph)
                    .with_asset_uuid(asset.uuid)
                    .with_asset_name(&asset.name);
                if let Some(functions) = functions {
                    builder = builder.with_functions(functions);
                }
                builder.build().compile()
            });

        match result {
            Ok(unit) => build.table.add(unit),
            Err(e) => {
                error!("Build of '{}' failed: {}", asset.name, e);
                build.errors.push(e);
            }
        }
    }

    info!(
        "Project build finished: {} units, {} failed",
        build.table.len(),
        build.errors.len()
    );
    build
}

#[cfg(feature = "debug-tools")]
fn write_debug_files(unit: &CompiledUnit) {
    let name: String = unit
        .name
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_')
        .collect();
    let files = [
        (
            format!("tmp/unit_{}_program.txt", name),
            visualizer::visualize_program(&unit.program, &unit.name),
        ),
        (format!("tmp/unit_{}_source.c", name), unit.source.clone()),
    ];
    for (path, content) in files {
        let written = fs::create_dir_all("tmp").and_then(|_| fs::write(&path, content));
        if let Err(e) = written {
            warn!("Could not write debug file '{}': {}", path, e);
        }
    }
}
