use axum::extract::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use std::env;
use std::fmt::{self, Debug, Display};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    Database,
    Io,
    Internal,
    TransactionAborted,
    StoreUnavailable,
    UserLookupFailed,
    CreateFailed,
    UpdateFailed,
    DeleteFailed,
    InvalidInput,
    NotFound,
    NoPlaces,
    Unauthenticated,
    Forbidden,
    AddressNotFound,
    GeocodingFailed,
}

impl ErrorKind {
    /// Codes below 100 are infrastructure failures whose message never reaches the client.
    pub fn code(&self) -> i32 {
        match self {
            Self::Config => 1,
            Self::Database => 2,
            Self::Io => 3,
            Self::Internal => 4,
            Self::TransactionAborted => 5,
            Self::StoreUnavailable => 100,
            Self::UserLookupFailed => 101,
            Self::CreateFailed => 102,
            Self::UpdateFailed => 103,
            Self::DeleteFailed => 104,
            Self::InvalidInput => 110,
            Self::NotFound => 111,
            Self::NoPlaces => 112,
            Self::Unauthenticated => 113,
            Self::Forbidden => 114,
            Self::AddressNotFound => 120,
            Self::GeocodingFailed => 121,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidInput | Self::AddressNotFound => StatusCode::UNPROCESSABLE_ENTITY,
            Self::NotFound | Self::NoPlaces => StatusCode::NOT_FOUND,
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::GeocodingFailed => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Error {
    pub kind: ErrorKind,
    pub message: String,
}

impl Error {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn code(&self) -> i32 {
        self.kind.code()
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }

    pub fn is_geocoding_error(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::AddressNotFound | ErrorKind::GeocodingFailed
        )
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.message, self.code())
    }
}

impl std::error::Error for Error {}

impl From<env::VarError> for Error {
    fn from(err: env::VarError) -> Self {
        config_error(err)
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        database_error(err)
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        geocoding_failed_error(err)
    }
}

impl From<oso::OsoError> for Error {
    fn from(err: oso::OsoError) -> Self {
        internal_error(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        io_error(err)
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.kind.status();
        let message = match self.code() {
            1..=99 => "Internal Server Error",
            _ => self.message.as_str(),
        };

        let body = Json(json!({
            "code": self.code(),
            "message": message,
        }));

        (status, body).into_response()
    }
}

pub fn config_error<T: Display>(err: T) -> Error {
    Error::new(ErrorKind::Config, format!("configuration error: {}", err))
}

pub fn database_error<T: Debug>(err: T) -> Error {
    Error::new(ErrorKind::Database, format!("database error: {:?}", err))
}

pub fn io_error<T: Display>(err: T) -> Error {
    Error::new(ErrorKind::Io, format!("io error: {}", err))
}

pub fn internal_error<T: Display>(err: T) -> Error {
    Error::new(ErrorKind::Internal, format!("internal error: {}", err))
}

pub fn transaction_aborted_error() -> Error {
    Error::new(ErrorKind::TransactionAborted, "transaction aborted")
}

pub fn store_unavailable_error(message: &str) -> Error {
    Error::new(ErrorKind::StoreUnavailable, message)
}

pub fn user_lookup_failed_error() -> Error {
    Error::new(
        ErrorKind::UserLookupFailed,
        "Creating place failed, please try again.",
    )
}

pub fn create_failed_error() -> Error {
    Error::new(
        ErrorKind::CreateFailed,
        "Creating place failed, please try again.",
    )
}

pub fn update_failed_error() -> Error {
    Error::new(
        ErrorKind::UpdateFailed,
        "Something went wrong, could not update place.",
    )
}

pub fn delete_failed_error() -> Error {
    Error::new(
        ErrorKind::DeleteFailed,
        "Something went wrong, could not delete place.",
    )
}

pub fn invalid_input_error(message: &str) -> Error {
    Error::new(ErrorKind::InvalidInput, message)
}

pub fn not_found_error(message: &str) -> Error {
    Error::new(ErrorKind::NotFound, message)
}

pub fn no_places_error() -> Error {
    Error::new(
        ErrorKind::NoPlaces,
        "Could not find places for the provided user id.",
    )
}

pub fn unauthenticated_error() -> Error {
    Error::new(ErrorKind::Unauthenticated, "Authentication failed.")
}

pub fn forbidden_error(message: &str) -> Error {
    Error::new(ErrorKind::Forbidden, message)
}

pub fn address_not_found_error() -> Error {
    Error::new(
        ErrorKind::AddressNotFound,
        "Could not find location for the specified address.",
    )
}

pub fn geocoding_failed_error<T: Display>(err: T) -> Error {
    tracing::warn!(%err, "geocoding request failed");
    Error::new(
        ErrorKind::GeocodingFailed,
        "Could not resolve the address, please try again later.",
    )
}
