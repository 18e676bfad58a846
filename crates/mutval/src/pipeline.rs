//! The validation pipeline.
//!
//! Stages run in a fixed order and the first failure ends the run:
//! resolve the mutator group, load the module, build testees, find mutation
//! points, print the count, prepare and apply every point, verify, compile.

use crate::task::SingleTaskExecutor;
use mutval_core::{Result, ValidatorConfig};
use mutval_ir::{Context, Program, Verifier};
use mutval_mutation::{
    apply_mutation, build_testees, prepare_program, ExclusionFilter, MutationPoint,
    MutationsFinder, Mutator, MutatorCatalogue,
};
use mutval_toolchain::{CompiledArtifact, TargetDescription, Toolchain};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// Outcome of a successful run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub mutants: usize,
    pub modules_compiled: usize,
}

pub struct Pipeline {
    config: ValidatorConfig,
    filter: ExclusionFilter,
    catalogue: MutatorCatalogue,
    emit_wasm: Option<PathBuf>,
}

impl Pipeline {
    pub fn new(config: ValidatorConfig) -> Result<Self> {
        config.validate()?;
        let filter = ExclusionFilter::from_config(&config.filter)?;
        Ok(Self {
            config,
            filter,
            catalogue: MutatorCatalogue::new(),
            emit_wasm: None,
        })
    }

    /// Also write the lowered WebAssembly of the mutated module to `path`
    pub fn with_emit_wasm(mut self, path: Option<PathBuf>) -> Self {
        self.emit_wasm = path;
        self
    }

    pub fn run(&self, group: &str, module_path: &Path, out: &mut dyn Write) -> Result<Report> {
        let mutators = self.resolve(group)?;

        let context = Context::new();
        let mut program = Program::new(&context);
        program.load(module_path)?;

        let points = self.discover(&program, mutators);
        writeln!(out, "Found {} mutants", points.len())?;
        out.flush()?;

        self.apply(&mut program, &points)?;
        let artifacts = self.compile(&program)?;

        if let (Some(path), Some(artifact)) = (&self.emit_wasm, artifacts.first()) {
            std::fs::write(path, &artifact.wasm)?;
            info!(path = %path.display(), "Wrote mutated module");
        }

        Ok(Report {
            mutants: points.len(),
            modules_compiled: artifacts.len(),
        })
    }

    pub fn resolve(&self, group: &str) -> Result<Vec<Mutator>> {
        self.catalogue.mutators(&[group])
    }

    pub fn discover(&self, program: &Program<'_>, mutators: Vec<Mutator>) -> Vec<MutationPoint> {
        let testees = build_testees(program);
        let finder = MutationsFinder::new(mutators);
        let points = finder.find(program, &testees, &self.filter);
        info!(testees = testees.len(), mutants = points.len(), "Discovered mutants");
        points
    }

    /// Prepare every module, then rewrite every point
    pub fn apply(&self, program: &mut Program<'_>, points: &[MutationPoint]) -> Result<()> {
        SingleTaskExecutor::new("Preparing mutants", || prepare_program(program, points))
            .execute()?;
        SingleTaskExecutor::new("Applying mutants", || {
            points
                .iter()
                .try_for_each(|point| apply_mutation(program, point))
        })
        .execute()
    }

    /// Verify every module, then compile them. Nothing is compiled unless
    /// all modules verify.
    pub fn compile(&self, program: &Program<'_>) -> Result<Vec<CompiledArtifact>> {
        let verifier = Verifier::new();
        for loaded in program.modules() {
            verifier.check(loaded.module(), loaded.identifier())?;
        }

        let target = TargetDescription::from_config(&self.config.target);
        let toolchain = Toolchain::new(&target, self.config.compiler.clone())?;
        SingleTaskExecutor::new("Compiling mutants", || {
            program
                .modules()
                .iter()
                .map(|loaded| toolchain.compile(loaded.module()))
                .collect()
        })
        .execute()
    }
}
