//! Derivative styles and their URI layout.

use crate::error::{DerivativeError, DerivativeResult};
use darkroom_storage::split_uri;
use std::fmt;

/// A named derivative style (e.g. a thumbnail preset).
///
/// The style itself carries no transformation parameters; those live in
/// the generator collaborator. What the style owns is the URI layout:
/// where the durable derivative sits relative to the source, and where
/// its local temporary copy goes while the remote push is pending.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct DerivativeStyle {
    id: String,
}

impl DerivativeStyle {
    /// Create a style. Ids are lowercase alphanumeric plus `_` and `-`.
    pub fn new(id: impl Into<String>) -> DerivativeResult<Self> {
        let id = id.into();
        let valid = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-');
        if !valid {
            return Err(DerivativeError::InvalidStyle(id));
        }
        Ok(Self { id })
    }

    /// The style identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The durable derivative location for a source, on the source's
    /// own scheme: `scheme://styles/<id>/<path>`.
    pub fn derivative_uri(&self, source_uri: &str) -> DerivativeResult<String> {
        let (scheme, path) = split_uri(source_uri)?;
        Ok(format!("{scheme}://styles/{}/{path}", self.id))
    }

    /// The local temporary location for a source's derivative:
    /// `<temp_scheme>://darkroom/<scheme>/styles/<id>/<path>`.
    ///
    /// The source scheme is part of the path so identically named
    /// sources on different schemes never collide in temp storage.
    pub fn temp_uri(&self, source_uri: &str, temp_scheme: &str) -> DerivativeResult<String> {
        let (scheme, path) = split_uri(source_uri)?;
        Ok(format!(
            "{temp_scheme}://darkroom/{scheme}/styles/{}/{path}",
            self.id
        ))
    }
}

impl fmt::Debug for DerivativeStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DerivativeStyle({})", self.id)
    }
}

impl fmt::Display for DerivativeStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}
