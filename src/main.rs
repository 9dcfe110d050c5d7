use std::path::{Path, PathBuf};
use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use log::{info, LevelFilter};
use dukebox::storage::FileJar;
use dukewiden::apply::{ApplyOptions, ApplyOutcome};
use quill::provider::Grouping;
use crate::config::Config;
use crate::provide::Provider;

mod config;
mod provide;

#[derive(Debug, Parser)]
struct Cli {
	/// Be verbose.
	#[arg(short = 'v', long = "verbose")]
	verbose: bool,

	/// Only print warnings and errors.
	#[arg(short = 'q', long = "quiet", conflicts_with = "verbose")]
	quiet: bool,

	/// The configuration file.
	#[arg(short = 'c', long = "config", default_value = "remap.json")]
	config: PathBuf,

	#[command(subcommand)]
	command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
	/// Resolves the mappings of a grouping, and writes them as a tiny v2 file, or as a jar if the output ends in `.jar`
	Mappings {
		#[arg(short = 'g', long = "grouping", default_value_t = Grouping::Combined)]
		grouping: Grouping,
		/// Merge the mapping files again, even if they're cached.
		#[arg(long = "refresh")]
		refresh: bool,
		output: PathBuf,
	},
	/// Remaps a jar from the source namespace to the target namespace
	Remap {
		#[arg(short = 'g', long = "grouping", default_value_t = Grouping::Combined)]
		grouping: Grouping,
		#[arg(short = 't', long = "target")]
		target: String,
		/// Remap again, even if the remapped jar exists already.
		#[arg(long = "refresh")]
		refresh: bool,
		/// Where to write the remapped jar, by default it's put next to the input.
		#[arg(short = 'o', long = "output")]
		output: Option<PathBuf>,
		input: PathBuf,
	},
	/// Remaps access wideners to the target namespace and merges them into one
	MergeWideners {
		#[arg(short = 'g', long = "grouping", default_value_t = Grouping::Combined)]
		grouping: Grouping,
		#[arg(short = 't', long = "target")]
		target: String,
		/// Fail on access wideners in a namespace the mappings don't have, instead of leaving them out.
		#[arg(long = "strict")]
		strict: bool,
		#[arg(short = 'o', long = "output")]
		output: PathBuf,
		#[arg(required = true)]
		inputs: Vec<PathBuf>,
	},
	/// Applies an access widener to a jar
	Widen {
		/// The namespace of the jar.
		#[arg(short = 'n', long = "namespace")]
		namespace: String,
		/// Fail if the access widener is in another namespace, instead of copying the jar unchanged.
		#[arg(long = "strict")]
		strict: bool,
		#[arg(short = 'o', long = "output")]
		output: PathBuf,
		widener: PathBuf,
		input: PathBuf,
	},
}

fn setup_logging(level: LevelFilter) -> Result<()> {
	fern::Dispatch::new()
		.format(|out, message, record| {
			out.finish(format_args!("[{} {}] {}", record.level(), record.target(), message))
		})
		.level(level)
		.chain(std::io::stderr())
		.apply()
		.context("failed to set up logging")
}

fn main() -> Result<()> {
	let cli = Cli::parse();

	let level = if cli.verbose {
		LevelFilter::Debug
	} else if cli.quiet {
		LevelFilter::Warn
	} else {
		LevelFilter::Info
	};
	setup_logging(level)?;

	run(&cli.config, cli.command)
}

fn run(config: &Path, command: Command) -> Result<()> {
	match command {
		Command::Mappings { grouping, refresh, output } => {
			let config = Config::read(config)?;
			let tree = Provider::new(&config)?.resolve(grouping, refresh)?;

			if output.extension().is_some_and(|extension| extension == "jar") {
				quill::archive::write_file(&tree, &output)?;
			} else {
				std::fs::write(&output, quill::tiny_v2::write_vec(&tree)?)
					.with_context(|| anyhow!("failed to write mappings to {output:?}"))?;
			}
			info!("wrote mappings for {grouping} to {output:?}");
		},
		Command::Remap { grouping, target, refresh, output, input } => {
			let config = Config::read(config)?;
			let mut provider = Provider::new(&config)?;

			let provided = match output {
				Some(output) => provider.remap(grouping, &input, &target, &output, refresh)?,
				None => provider.provide(grouping, &input, &target, refresh)?,
			};
			info!("remapped jar is at {:?}", provided.path);
		},
		Command::MergeWideners { grouping, target, strict, output, inputs } => {
			let config = Config::read(config)?;
			let tree = Provider::new(&config)?.resolve(grouping, false)?;

			let wideners = inputs.iter()
				.map(|path| Ok((path.display().to_string(), dukewiden::read_file(path)?)))
				.collect::<Result<Vec<_>>>()?;
			let merged = dukewiden::merge::merge(&wideners, &tree, &target, strict)?;

			dukewiden::write_file(&merged.widener, &output)?;
			info!("merged {} access wideners into {output:?}, with {} warnings", inputs.len(), merged.warnings.len());
		},
		Command::Widen { namespace, strict, output, widener, input } => {
			let widener = dukewiden::read_file(&widener)?;
			let result = dukewiden::apply::apply(&widener, &namespace, &FileJar::new(input), &output, &ApplyOptions { strict })?;

			match result.outcome {
				ApplyOutcome::Applied => info!("widened {} classes into {output:?}", result.widened_classes.len()),
				ApplyOutcome::SkippedNamespaceMismatch => info!("copied the jar to {output:?} without widening it"),
			}
		},
	}
	Ok(())
}
