pub mod state;

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use color_eyre::eyre;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use crate::state::AppState;
use jurex_domain::{HintIntent, TypeHint};
use jurex_service::{
	ContextDocument, GroundedAnswer, RetrievalDiagnostics, RetrieveRequest, RetrieveResponse,
};

#[derive(Debug, Parser)]
#[command(
	version = jurex_cli::VERSION,
	rename_all = "kebab",
	styles = jurex_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	/// Legal question, in natural language.
	#[arg(value_name = "QUERY")]
	pub query: String,
	/// State name or code, e.g. "CDMX" or "Nuevo León".
	#[arg(long, short = 'j')]
	pub jurisdiction: Option<String>,
	/// Payload field used to restrict or favor a document type, e.g. "tipo_codigo".
	#[arg(long, requires = "hint_values")]
	pub hint_field: Option<String>,
	#[arg(long, value_delimiter = ',', requires = "hint_field")]
	pub hint_values: Vec<String>,
	#[arg(long, value_enum, default_value_t = IntentArg::Exclusive)]
	pub hint_intent: IntentArg,
	#[arg(long)]
	pub top_k: Option<u32>,
	#[arg(long)]
	pub merged_top_k: Option<u32>,
	/// Also generate an answer grounded in the retrieved context.
	#[arg(long)]
	pub answer: bool,
	#[arg(long, value_enum, default_value_t = OutputFormat::Json)]
	pub format: OutputFormat,
}
impl Args {
	pub fn to_request(&self) -> RetrieveRequest {
		let type_hint = self.hint_field.as_ref().map(|field| TypeHint {
			field: field.clone(),
			values: self.hint_values.clone(),
			intent: self.hint_intent.into(),
		});

		RetrieveRequest {
			query: self.query.clone(),
			jurisdiction: self.jurisdiction.clone(),
			type_hint,
			top_k: self.top_k,
			merged_top_k: self.merged_top_k,
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum IntentArg {
	Exclusive,
	Preferred,
}
impl From<IntentArg> for HintIntent {
	fn from(value: IntentArg) -> Self {
		match value {
			IntentArg::Exclusive => Self::Exclusive,
			IntentArg::Preferred => Self::Preferred,
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
	/// Context, diagnostics, and answer as one JSON document.
	Json,
	/// The rendered context block only.
	Context,
}

#[derive(Debug, Serialize)]
pub struct Report {
	pub context: ContextDocument,
	pub diagnostics: RetrievalDiagnostics,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub answer: Option<GroundedAnswer>,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = jurex_config::load(&args.config)?;

	init_tracing(&config.service.log_level)?;

	let state = AppState::new(config)?;

	tracing::info!(
		silos = state.service.silos.len(),
		jurisdiction = ?args.jurisdiction,
		answer = args.answer,
		"Running retrieval."
	);

	let RetrieveResponse { context, diagnostics } =
		state.service.retrieve(args.to_request()).await?;
	let answer = if args.answer {
		if context.is_empty() {
			return Err(eyre::eyre!(
				"No documents were included in the context; refusing to answer."
			));
		}

		Some(state.service.ground_answer(&args.query, &context).await?)
	} else {
		None
	};

	println!("{}", render(args.format, Report { context, diagnostics, answer })?);

	Ok(())
}

pub fn render(format: OutputFormat, report: Report) -> color_eyre::Result<String> {
	match format {
		OutputFormat::Json => Ok(serde_json::to_string_pretty(&report)?),
		OutputFormat::Context => Ok(report.context.text),
	}
}

/// Installs the global subscriber; fails if one is already set.
pub fn init_tracing(log_level: &str) -> color_eyre::Result<()> {
	let filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

	// Stdout carries the report.
	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.try_init()
		.map_err(|err| eyre::eyre!(err))?;

	Ok(())
}
