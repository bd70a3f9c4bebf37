#[non_exhaustive]
#[derive(Debug)]
pub enum Error {
    /// Two arrays that should share a dimension disagree on its extent
    Shape(String),
    /// Got invalid values in the input batch (out of range atomic numbers,
    /// neighbor indexes, missing data required by the model, ...)
    InvalidInput(String),
    /// Got an invalid hyper-parameter when creating a model or one of its
    /// layers
    Configuration(String),
    /// Error while serializing/deserializing hyper-parameters
    Json(serde_json::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Shape(e) => write!(f, "shape mismatch: {}", e),
            Error::InvalidInput(e) => write!(f, "invalid input: {}", e),
            Error::Configuration(e) => write!(f, "invalid configuration: {}", e),
            Error::Json(e) => write!(f, "json error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Shape(_) |
            Error::InvalidInput(_) |
            Error::Configuration(_) => None,
            Error::Json(e) => Some(e),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Error {
        Error::Json(error)
    }
}

/// Check that `actual` matches the `expected` extent of the dimension
/// called `name`, returning `Error::Shape` otherwise.
pub(crate) fn check_extent(name: &str, actual: usize, expected: usize) -> Result<(), Error> {
    if actual != expected {
        return Err(Error::Shape(format!(
            "expected {} to be {}, got {}", name, expected, actual
        )));
    }
    return Ok(());
}
