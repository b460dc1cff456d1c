use ::std::error::Error;
use ::std::convert::From;
use ::std::io::Error as IoError;

use ::jedi::JSONError;

quick_error! {
    #[derive(Debug)]
    /// forcesync's main error object.
    pub enum FError {
        Boxed(err: Box<dyn Error + Send + Sync>) {
            description("boxed error")
            display("error: {}", err)
        }
        Msg(str: String) {
            description(str)
            display("error: {}", str)
        }
        BadValue(str: String) {
            description(str)
            display("bad value: {}", str)
        }
        MissingField(str: String) {
            description(str)
            display("missing field: {}", str)
        }
        MissingData(str: String) {
            description(str)
            display("missing data: {}", str)
        }
        Config(str: String) {
            description(str)
            display("configuration error: {}", str)
        }
        Api(status: u16, msg: String) {
            description("API error")
            display("api error ({}): {}", status, msg)
        }
        Unauthorized(str: String) {
            description(str)
            display("unauthorized: {}", str)
        }
        JSON(err: JSONError) {
            cause(err)
            description("JSON error")
            display("JSON error: {}", err)
        }
        Io(err: IoError) {
            cause(err)
            description("io error")
            display("io error: {}", err)
        }
    }
}

impl FError {
    /// Grab the HTTP status attached to this error, if any
    pub fn status(&self) -> Option<u16> {
        match *self {
            FError::Api(status, _) => Some(status),
            FError::Unauthorized(_) => Some(401),
            _ => None,
        }
    }
}

/// converts non-FError errors to FError, via the From trait.
#[macro_export]
macro_rules! toferr {
    ($e:expr) => (
        {
            let err: $crate::error::FError = From::from($e);
            err
        }
    )
}

/// A macro to make it easy to create From impls for FError
macro_rules! from_err {
    ($t:ty) => (
        impl From<$t> for FError {
            fn from(err: $t) -> FError {
                FError::Boxed(Box::new(err))
            }
        }
    )
}

impl From<JSONError> for FError {
    fn from(err: JSONError) -> FError {
        match err {
            JSONError::Boxed(x) => FError::Boxed(x),
            _ => FError::JSON(err),
        }
    }
}
impl From<IoError> for FError {
    fn from(err: IoError) -> FError {
        FError::Io(err)
    }
}
from_err!(::reqwest::Error);

pub type FResult<T> = Result<T, FError>;
