//! CLI command implementations.

pub(crate) mod resolve;

pub(crate) use resolve::ResolveArgs;
