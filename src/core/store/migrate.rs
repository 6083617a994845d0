//! Store schema migrations.
//!
//! Migrations form a linear chain of steps keyed by the version they upgrade
//! from. Each step is applied and persisted before the next one runs, so an
//! interrupted upgrade resumes from the last saved version.

use std::path::Path;
use tracing::debug;

use super::{save, Document};
use crate::core::constants::LATEST_VERSION;
use crate::error::{Result, ValidationError};

/// What a step may ask of its caller.
pub trait MigrationContext {
    /// Master key id that wraps the document's data key.
    ///
    /// Resolving it may require a round-trip to the key-management provider.
    fn master_key_id(&self, doc: &Document) -> Result<String>;
}

type Step = fn(Document, &dyn MigrationContext) -> Result<Document>;

/// Registered steps, keyed by source version.
const STEPS: &[(u32, Step)] = &[(1, v1_to_v2 as Step), (2, v2_to_v3 as Step)];

/// Bring `doc` up to `LATEST_VERSION`, saving after every step.
///
/// A document already at the latest version is returned unchanged and the
/// file is not written.
///
/// # Errors
///
/// Returns `ValidationError::UnsupportedVersion` for versions without a
/// registered step (including versions newer than this build), or any error
/// from a step or from saving.
pub fn migrate(path: &Path, mut doc: Document, ctx: &dyn MigrationContext) -> Result<Document> {
    while doc.version != LATEST_VERSION {
        let from = doc.version;
        let step = STEPS
            .iter()
            .find(|(version, _)| *version == from)
            .map(|(_, step)| *step)
            .ok_or(ValidationError::UnsupportedVersion {
                version: from,
                latest: LATEST_VERSION,
            })?;

        doc = step(doc, ctx)?;
        debug!(from, to = doc.version, "migrated store");
        save(path, &doc)?;
    }
    Ok(doc)
}

fn v1_to_v2(mut doc: Document, ctx: &dyn MigrationContext) -> Result<Document> {
    doc.master_key_id = ctx.master_key_id(&doc)?;
    doc.version = 2;
    Ok(doc)
}

fn v2_to_v3(mut doc: Document, _ctx: &dyn MigrationContext) -> Result<Document> {
    // Entries gain `is_binary`, which deserializes to false when absent.
    doc.version = 3;
    Ok(doc)
}
