//! Composite tool names
//!
//! Tools from different providers can share a local name, so the model sees
//! `<local>@<provider>` instead. Provider names never contain the separator
//! (enforced when a provider is registered); local names are provider-supplied
//! and might, so decoding splits on the last occurrence.

use crate::utils::errors::{HostError, HostResult};

pub const SEPARATOR: char = '@';

/// A composite name split back into its parts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompositeName<'a> {
    pub local: &'a str,
    pub provider: &'a str,
}

pub struct NameCodec;

impl NameCodec {
    pub fn encode(local: &str, provider: &str) -> String {
        let mut composite = String::with_capacity(local.len() + provider.len() + 1);
        composite.push_str(local);
        composite.push(SEPARATOR);
        composite.push_str(provider);
        composite
    }

    pub fn decode(composite: &str) -> HostResult<CompositeName<'_>> {
        let (local, provider) = composite
            .rsplit_once(SEPARATOR)
            .ok_or_else(|| HostError::InvalidFormat(composite.to_string()))?;
        Ok(CompositeName { local, provider })
    }
}
