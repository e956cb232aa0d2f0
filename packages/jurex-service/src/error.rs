pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Invalid config: {message}")]
	InvalidConfig { message: String },
	#[error("Filter composition rejected: {0}")]
	FilterComposition(#[from] jurex_domain::FilterCompositionError),
	#[error("Provider error: {message}")]
	Provider { message: String },
	#[error("Qdrant error: {message}")]
	Qdrant { message: String },
	#[error("Context assembly failed: {0}")]
	Assembly(#[from] crate::context::AssemblyError),
}
impl From<color_eyre::Report> for Error {
	fn from(err: color_eyre::Report) -> Self {
		Self::Provider { message: err.to_string() }
	}
}

impl From<jurex_domain::InvalidQuery> for Error {
	fn from(err: jurex_domain::InvalidQuery) -> Self {
		Self::InvalidRequest { message: err.to_string() }
	}
}

impl From<jurex_storage::Error> for Error {
	fn from(err: jurex_storage::Error) -> Self {
		match err {
			jurex_storage::Error::Qdrant(inner) => Self::Qdrant { message: inner.to_string() },
		}
	}
}
