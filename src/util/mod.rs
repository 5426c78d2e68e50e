use crate::{ARGS, Args};
use inquire::{InquireError, error::InquireResult};
use std::{process, sync::OnceLock};
use tracing::{info, warn};

pub mod logging;

// 202501192003
pub fn timestamp() -> String {
    chrono::Local::now().format("%Y%m%d%H%M").to_string()
}

pub fn args() -> &'static Args {
    // Tests never parse the command line
    static FALLBACK: OnceLock<Args> = OnceLock::new();
    ARGS.get().unwrap_or_else(|| FALLBACK.get_or_init(Args::default))
}

pub trait UnwrapOrExit<T> {
    fn unwrap_or_exit(self) -> T;
}

impl<T> UnwrapOrExit<T> for InquireResult<T> {
    fn unwrap_or_exit(self) -> T {
        self.unwrap_or_else(|why| match why {
            InquireError::OperationInterrupted | InquireError::OperationCanceled => {
                info!("Goodbye");
                process::exit(0);
            }
            why => {
                warn!(err = ?why, "Prompt failed");
                process::exit(1);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_is_minute_precision() {
        let ts = timestamp();
        assert_eq!(ts.len(), 12);
        assert!(ts.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn args_default_to_quiet() {
        assert_eq!(args().verbose, 0);
    }

    #[test]
    fn answered_prompt_passes_through() {
        let answered: InquireResult<u8> = Ok(3);
        assert_eq!(answered.unwrap_or_exit(), 3);
    }
}
