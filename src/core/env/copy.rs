//! Copying values between environments of the same depth.

use tracing::{debug, info};

use super::{check_override_key, list_dirs, EnvPath, Package};
use crate::core::client::InitOptions;
use crate::core::constants::OVERRIDE_FILE;
use crate::core::store;
use crate::core::types::Key;
use crate::error::{Result, ValidationError};

/// Options for [`copy`].
#[derive(Debug, Clone, Default)]
pub struct CopyOptions {
    /// Only copy keys containing this substring.
    pub pattern: Option<String>,
    /// Leave keys that already exist at the destination untouched.
    pub skip_existing: bool,
    /// Descend into the source's sub-environments, creating missing
    /// destination levels.
    pub recursive: bool,
    pub ignore_role: bool,
}

impl CopyOptions {
    fn selects(&self, key: &str) -> bool {
        self.pattern.as_deref().map_or(true, |p| key.contains(p))
    }
}

/// Keys copied into one destination level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopiedLevel {
    pub src: String,
    pub dest: String,
    pub keys: Vec<Key>,
}

/// Copy values from `src` to `dest`.
///
/// Main environments copy through the client, so secrets are decrypted with
/// the source key and re-encrypted with the destination key. Sub-environments
/// merge override layers directly; every merged key must be a non-secret key
/// of the destination's main store.
///
/// # Errors
///
/// Returns `ValidationError::DepthMismatch` unless both paths have the same
/// depth, `ConflictError` for override keys the destination cannot accept,
/// and any error from opening or writing either side.
pub fn copy(
    package: &Package,
    src: &EnvPath,
    dest: &EnvPath,
    options: &CopyOptions,
) -> Result<Vec<CopiedLevel>> {
    if src.depth() != dest.depth() {
        return Err(ValidationError::DepthMismatch {
            src: src.to_string(),
            dest: dest.to_string(),
        }
        .into());
    }

    let mut report = Vec::new();
    copy_level(package, src, dest, options, &mut report)?;
    Ok(report)
}

fn copy_level(
    package: &Package,
    src: &EnvPath,
    dest: &EnvPath,
    options: &CopyOptions,
    report: &mut Vec<CopiedLevel>,
) -> Result<()> {
    let keys = if src.is_main() {
        copy_store(package, src, dest, options)?
    } else {
        copy_overrides(package, src, dest, options)?
    };
    info!(src = %src, dest = %dest, keys = keys.len(), "copied values");
    report.push(CopiedLevel {
        src: src.to_string(),
        dest: dest.to_string(),
        keys,
    });

    if !options.recursive {
        return Ok(());
    }

    for name in list_dirs(&package.dir(src))? {
        let src_sub = src.child(&name);
        let dest_sub = dest.child(&name);
        if !package.exists(&dest_sub) {
            debug!(env = %dest_sub, "creating destination sub-environment");
            package.create(&dest_sub, &InitOptions::default())?;
        }
        copy_level(package, &src_sub, &dest_sub, options, report)?;
    }
    Ok(())
}

fn copy_store(
    package: &Package,
    src: &EnvPath,
    dest: &EnvPath,
    options: &CopyOptions,
) -> Result<Vec<Key>> {
    let source = package.open(src, options.ignore_role)?;
    let mut target = package.open(dest, options.ignore_role)?;

    let mut copied = Vec::new();
    for (key, value) in source.get_all(false)? {
        if !options.selects(&key) || (options.skip_existing && target.exists(&key)) {
            continue;
        }
        target.set(&key, value.as_bytes(), value.is_secret(), value.is_binary())?;
        copied.push(key);
    }
    Ok(copied)
}

fn copy_overrides(
    package: &Package,
    src: &EnvPath,
    dest: &EnvPath,
    options: &CopyOptions,
) -> Result<Vec<Key>> {
    let source = package.load_override(src)?;
    let mut target = package.load_override(dest)?;

    let resolved = package.resolve(dest)?;
    let base = store::load(&resolved.store)?;
    let layer = resolved.dir.join(OVERRIDE_FILE);

    let mut copied = Vec::new();
    for (key, value) in source {
        if !options.selects(&key) || (options.skip_existing && target.contains_key(&key)) {
            continue;
        }
        check_override_key(&base, &key, &layer)?;
        target.insert(key.clone(), value);
        copied.push(key);
    }

    package.save_override(dest, &target)?;
    Ok(copied)
}
