pub mod citation;
pub mod expansion;
pub mod filter;
pub mod jurisdiction;
pub mod query;
pub mod rights;
pub mod silo;

pub use filter::{
	Condition, FilterBuilder, FilterCompositionError, FilterError, FilterExpression,
	FilterSemantics, UnsupportedFilterFieldError, compile_filter, compile_jurisdiction_filter,
};
pub use jurisdiction::{AliasTable, Estado, Jurisdiction, normalize_estado};
pub use query::{HintIntent, InvalidQuery, RetrievalQuery, TypeHint};
pub use silo::{PrimaryScope, SiloRegistry, SiloSpec};
