use failure::Fail;

#[derive(Debug, Fail)]
pub enum Error {
    #[fail(display = "Backend: {}", _0)]
    Backend(String),
    #[fail(display = "GPU thread: {}", _0)]
    Executor(String),
    #[fail(display = "Invalid video params: {}", _0)]
    Params(String),
    #[fail(display = "Failed to create shader, errors: \n{}.", _0)]
    ShaderCreationFailure(String),
    #[fail(display = "Uniform value with {} components has no matching type.", _0)]
    UniformShapeUnsupported(usize),
    #[fail(display = "Unknown compose method '{}'.", _0)]
    ComposeMethodInvalid(String),
    #[fail(display = "Out of bounds.")]
    OutOfBounds,
}

pub type Result<T> = ::std::result::Result<T, Error>;

impl From<::failure::Error> for Error {
    fn from(err: ::failure::Error) -> Error {
        Error::Backend(format!("{}", err))
    }
}

impl From<::serde_json::Error> for Error {
    fn from(err: ::serde_json::Error) -> Error {
        Error::Params(format!("{}", err))
    }
}
