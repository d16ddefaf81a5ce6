use thiserror::Error;

/// Errors reported when reading through a selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Error {
    /// The provider the selector subscribed to has been dropped.
    #[error("the provider backing this selector has been unmounted")]
    ProviderUnmounted,
    /// The holder does not contain a value of the expected type.
    #[error("context holder does not contain a value of type `{0}`")]
    TypeMismatch(&'static str),
}

pub type Result<T> = std::result::Result<T, Error>;
