use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// unisel - constraint-programming instruction selection driver
#[derive(Debug, Parser)]
#[command(name = "unisel", version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOptions,

    #[command(subcommand)]
    pub command: Command,
}

/// Options shared across all subcommands.
#[derive(Debug, Parser)]
pub struct GlobalOptions {
    /// Emit reports as JSON instead of human-readable text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose (debug-level) logging output.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// What the `make` command should produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MakeAction {
    /// The match list for the function on the target.
    Matches,
    /// The high-level constraint model.
    HlModel,
    /// The array-index map lists.
    Maps,
    /// The low-level (array-indexed) model.
    LlModel,
    /// Raise a low-level solution into the high-level form.
    HlSolution,
}

/// Which rewrite the `transform` command should run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TransformAction {
    /// Rewrite identity-operand computations into copies.
    CanonicalizeCopies,
    /// Rewrite pointer values and conversions into integer form.
    LowerPointers,
    /// Enforce the phi node invariants.
    EnforcePhiInvariants,
    /// Delete single-input phi nodes.
    RemoveRedundantPhis,
    /// Remove dead values and their producers.
    DeadCodeElimination,
    /// Rewrite masking that reproduces an extension into copies.
    RemoveRedundantConversions,
    /// Run the whole pipeline in order.
    All,
}

/// What the `plot` command should draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PlotAction {
    /// The full function graph.
    FunGraph,
    /// The control-flow view (blocks only).
    Cfg,
    /// The SSA view (operations and values only).
    Ssa,
}

/// What the `check` command should verify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CheckAction {
    /// Edge-number contiguity per node, kind, and direction.
    EdgeNumbers,
    /// Constraint, location, and entry-block references resolve.
    References,
    /// Every check.
    All,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Produce matches, models, map lists, or a raised solution.
    Make {
        /// What to produce.
        #[arg(long, value_enum)]
        action: MakeAction,

        /// Path to the function file.
        #[arg(short = 'f', long, value_name = "FILE")]
        function: PathBuf,

        /// Name of the target machine.
        #[arg(short = 't', long, value_name = "NAME")]
        target: String,

        /// Path to the low-level solution file (hl-solution only).
        #[arg(long, value_name = "FILE")]
        solution: Option<PathBuf>,

        /// Directory for output files (default: alongside the function
        /// file).
        #[arg(short = 'o', long, value_name = "DIR")]
        output_dir: Option<PathBuf>,
    },

    /// Rewrite a function file through the op-structure transformations.
    Transform {
        /// Which rewrite to run.
        #[arg(long, value_enum)]
        action: TransformAction,

        /// Path to the function file.
        #[arg(short = 'f', long, value_name = "FILE")]
        function: PathBuf,

        /// Name of the target machine (needed for pointer lowering).
        #[arg(short = 't', long, value_name = "NAME")]
        target: String,

        /// Directory for output files (default: alongside the function
        /// file).
        #[arg(short = 'o', long, value_name = "DIR")]
        output_dir: Option<PathBuf>,
    },

    /// Emit DOT plots of a function's graphs.
    Plot {
        /// Which graph to draw.
        #[arg(long, value_enum)]
        action: PlotAction,

        /// Path to the function file.
        #[arg(short = 'f', long, value_name = "FILE")]
        function: PathBuf,

        /// Directory for output files (default: alongside the function
        /// file).
        #[arg(short = 'o', long, value_name = "DIR")]
        output_dir: Option<PathBuf>,
    },

    /// Verify the structural invariants of a function file.
    Check {
        /// Which checks to run.
        #[arg(long, value_enum, default_value = "all")]
        action: CheckAction,

        /// Path to the function file.
        #[arg(short = 'f', long, value_name = "FILE")]
        function: PathBuf,
    },
}
