//! Reading values for `set`.

use std::io::Read;

use atty::Stream;
use dialoguer::Password;
use zeroize::Zeroizing;

use crate::cli::output;
use crate::error::{Result, ValidationError};

/// Raw bytes for `key`.
///
/// An explicit argument wins; otherwise piped stdin is read to the end, and
/// on a terminal secrets are prompted for with hidden input.
pub fn read_value(key: &str, arg: Option<String>, is_secret: bool) -> Result<Zeroizing<Vec<u8>>> {
    if let Some(value) = arg {
        return Ok(Zeroizing::new(value.into_bytes()));
    }

    if atty::isnt(Stream::Stdin) {
        let mut buf = Vec::new();
        std::io::stdin().read_to_end(&mut buf)?;
        return Ok(Zeroizing::new(buf));
    }

    if is_secret {
        let value = Password::new()
            .with_prompt(format!("Secret for {}", output::key(key)))
            .allow_empty_password(true)
            .interact()?;
        return Ok(Zeroizing::new(value.into_bytes()));
    }

    Err(ValidationError::MissingValue(key.to_string()).into())
}
