use crate::utils::parser::parse_point;
use clap::{Args, Parser, Subcommand, ValueEnum};
use nalgebra::Point3;
use std::path::PathBuf;
use structkit::engine::config::{FitMethod, PcaAlgorithm};

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    version,
    about = "structkit - Read, edit, superimpose and analyse multi-model molecular structures.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of threads for parallel computation.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,

    /// Path to a TOML settings file. Defaults to `config.toml` in the user's
    /// configuration directory, when present.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Set a specific configuration value, overriding the settings file.
    /// Can be used multiple times. Example: -S pca.modes=6
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", global = true)]
    pub set_values: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Summarise the models, molecules and secondary structure of a file.
    Info(InfoArgs),
    /// Read a structure, optionally edit it, and write it back out.
    Convert(ConvertArgs),
    /// Superimpose the members of an ensemble and write the fitted structure.
    Superimpose(SuperimposeArgs),
    /// Report the RMSD of an ensemble about its mean structure.
    Rmsd(RmsdArgs),
    /// Report the rigid-body displacement between every pair of ensemble members.
    Displacement(DisplacementArgs),
    /// Principal component analysis of an ensemble.
    Pca(PcaArgs),
    /// Locate the point about which the members of an ensemble rotate.
    Pivot(PivotArgs),
    /// Replace an ensemble by its mean structure.
    Mean(MeanArgs),
}

/// Input file formats.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Pdb,
    Xyz,
    Gaussian,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitMethodArg {
    First,
    Mean,
}

impl From<FitMethodArg> for FitMethod {
    fn from(arg: FitMethodArg) -> Self {
        match arg {
            FitMethodArg::First => FitMethod::First,
            FitMethodArg::Mean => FitMethod::Mean,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PcaAlgorithmArg {
    Eigen,
    Svd,
}

impl From<PcaAlgorithmArg> for PcaAlgorithm {
    fn from(arg: PcaAlgorithmArg) -> Self {
        match arg {
            PcaAlgorithmArg::Eigen => PcaAlgorithm::Eigen,
            PcaAlgorithmArg::Svd => PcaAlgorithm::Svd,
        }
    }
}

/// How an input structure is read.
#[derive(Args, Debug, Clone)]
pub struct ReadArgs {
    /// Input format. Guessed from the file extension when omitted.
    #[arg(long, value_enum)]
    pub format: Option<InputFormat>,

    /// Only read these model numbers (comma-separated).
    #[arg(long, value_name = "MODELS", value_delimiter = ',')]
    pub read_model: Option<Vec<u32>>,

    /// Only read these molecules, counted from 1 within each model (comma-separated).
    #[arg(long, value_name = "MOLS", value_delimiter = ',')]
    pub read_mol: Option<Vec<usize>>,

    /// Keep only atoms with this alternate location indicator.
    #[arg(long, value_name = "CHAR")]
    pub alt_loc: Option<char>,
}

/// Which atoms and members of a structure form the analysed ensemble.
#[derive(Args, Debug, Clone)]
pub struct EnsembleArgs {
    /// Atom selection string, e.g. '#pep:1-50@N,CA,C'. Defaults to all atoms.
    #[arg(short, long, value_name = "SELECTION")]
    pub atoms: Option<String>,

    /// Only use these models (comma-separated). Defaults to all models.
    #[arg(long, value_name = "MODELS", value_delimiter = ',', conflicts_with = "molecules")]
    pub models: Option<Vec<u32>>,

    /// Compare these molecules of a single model instead of the models (comma-separated).
    #[arg(long, value_name = "NAMES", value_delimiter = ',')]
    pub molecules: Option<Vec<String>>,
}

#[derive(Args, Debug)]
pub struct InfoArgs {
    /// The structure file to summarise.
    #[arg(value_name = "PATH")]
    pub input: PathBuf,

    #[command(flatten)]
    pub read: ReadArgs,
}

#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// Path to the input structure file.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Path for the output structure file (.pdb or .xyz).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,

    #[command(flatten)]
    pub read: ReadArgs,

    /// Delete the atoms matched by this selection before writing.
    #[arg(long, value_name = "SELECTION")]
    pub delete: Option<String>,

    /// Keep only this model of the ensemble, renumbered to 1.
    #[arg(long, value_name = "MODEL")]
    pub collapse: Option<u32>,

    /// Write only this model.
    #[arg(long, value_name = "MODEL", conflicts_with = "collapse")]
    pub model: Option<u32>,
}

#[derive(Args, Debug)]
pub struct SuperimposeArgs {
    /// Path to the input structure file.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Path for the superimposed structure (.pdb or .xyz).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,

    #[command(flatten)]
    pub read: ReadArgs,

    #[command(flatten)]
    pub ensemble: EnsembleArgs,

    /// Fit onto the first member or onto the iteratively refined mean.
    #[arg(short, long, value_enum)]
    pub method: Option<FitMethodArg>,

    /// Rotate about this fixed point instead of the centroids, as 'x,y,z'.
    #[arg(long, value_name = "X,Y,Z", value_parser = parse_point, allow_hyphen_values = true)]
    pub centroid: Option<Point3<f64>>,

    /// Apply the fitted motion only to the atoms matched by this selection.
    #[arg(long, value_name = "SELECTION")]
    pub displace: Option<String>,
}

#[derive(Args, Debug)]
pub struct RmsdArgs {
    /// Path to the input structure file.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    #[command(flatten)]
    pub read: ReadArgs,

    #[command(flatten)]
    pub ensemble: EnsembleArgs,

    /// Write the RMSD of every atom to this CSV file.
    #[arg(long, value_name = "PATH")]
    pub per_atom: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct DisplacementArgs {
    /// Path to the input structure file.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    #[command(flatten)]
    pub read: ReadArgs,

    #[command(flatten)]
    pub ensemble: EnsembleArgs,

    /// Rotate about this fixed point instead of the centroids, as 'x,y,z'.
    #[arg(long, value_name = "X,Y,Z", value_parser = parse_point, allow_hyphen_values = true)]
    pub centroid: Option<Point3<f64>>,

    /// Write the displacements to this CSV file instead of the terminal.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct PcaArgs {
    /// Path to the input structure file.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    #[command(flatten)]
    pub read: ReadArgs,

    #[command(flatten)]
    pub ensemble: EnsembleArgs,

    /// Number of principal modes to compute.
    #[arg(long, value_name = "INT")]
    pub modes: Option<usize>,

    /// Decomposition used to obtain the modes.
    #[arg(long, value_enum)]
    pub algorithm: Option<PcaAlgorithmArg>,

    /// Models projected onto the modes without contributing to them (comma-separated).
    #[arg(long, value_name = "MODELS", value_delimiter = ',')]
    pub observers: Vec<u32>,

    /// Write '<PREFIX>_values.csv' and '<PREFIX>_projections.csv'.
    #[arg(long, value_name = "PREFIX")]
    pub output_prefix: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct PivotArgs {
    /// Path to the input structure file.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    #[command(flatten)]
    pub read: ReadArgs,

    #[command(flatten)]
    pub ensemble: EnsembleArgs,

    /// Starting position of the search, as 'x,y,z'.
    #[arg(long, value_name = "X,Y,Z", value_parser = parse_point, allow_hyphen_values = true)]
    pub init: Option<Point3<f64>>,

    /// Stop once an optimisation round improves the target by less than this.
    #[arg(long, value_name = "FLOAT")]
    pub func_tol: Option<f64>,

    /// Half-width of the cubic search box, in Å.
    #[arg(long, value_name = "FLOAT")]
    pub box_limit: Option<f64>,
}

#[derive(Args, Debug)]
pub struct MeanArgs {
    /// Path to the input structure file.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Path for the mean structure (.pdb or .xyz).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,

    #[command(flatten)]
    pub read: ReadArgs,
}
