use std::fmt::Debug;

use tracing::error;

pub trait LogErrorExt<T> {
    /// Logs the error, if any, and hands back the success value
    fn log_error(self, message: &str) -> Option<T>;
}

impl<T, E: Debug> LogErrorExt<T> for Result<T, E> {
    fn log_error(self, message: &str) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(err) => {
                error!("{message}: {err:?}");
                None
            }
        }
    }
}
