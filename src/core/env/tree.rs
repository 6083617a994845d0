//! Key tree across every environment of a package.
//!
//! For each key: the value in every main environment and, nested below it,
//! the override values of its sub-environments. Branches that override
//! nothing for the key are pruned.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use super::{list_dirs, EnvPath, OverrideCache, Package};
use crate::core::client::Value;
use crate::core::types::Key;
use crate::error::Result;

/// Children by name, sorted.
pub type Tree = BTreeMap<String, TreeNode>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeNode {
    /// Value at this level; `None` when absent or not overridden.
    pub value: Option<String>,
    pub is_secret: bool,
    pub children: Tree,
}

/// Build the key tree for every main environment in `package`.
///
/// Stores are opened with `ignore_role` and read with `skip_decryption` as
/// given; override layers are read once each.
pub fn build_tree(package: &Package, ignore_role: bool, skip_decryption: bool) -> Result<Tree> {
    let mut views: BTreeMap<String, BTreeMap<Key, Value>> = BTreeMap::new();
    for name in package.environments()? {
        let env = EnvPath::parse(&name)?;
        let client = package.open(&env, ignore_role)?;
        views.insert(name, client.get_all(skip_decryption)?);
    }

    let keys: BTreeSet<Key> = views.values().flat_map(|v| v.keys().cloned()).collect();
    let mut cache = OverrideCache::new();
    let mut tree = Tree::new();

    for key in keys {
        let mut per_env = Tree::new();
        for (name, values) in &views {
            let (value, is_secret) = match values.get(&key) {
                Some(v) => (Some(v.display()), v.is_secret()),
                None => (None, false),
            };
            let dir = package.env_root().join(name);
            let (children, _) = subtree(&key, &dir, &mut cache)?;
            per_env.insert(
                name.clone(),
                TreeNode {
                    value,
                    is_secret,
                    children,
                },
            );
        }
        tree.insert(
            key,
            TreeNode {
                children: per_env,
                ..TreeNode::default()
            },
        );
    }

    Ok(tree)
}

/// Override tree for `key` below `dir`, and whether anything in it
/// overrides the key. Returns an empty tree when nothing does.
fn subtree(key: &str, dir: &Path, cache: &mut OverrideCache) -> Result<(Tree, bool)> {
    let mut tree = Tree::new();
    let mut overridden = false;

    for name in list_dirs(dir)? {
        let sub_dir = dir.join(&name);
        let value = cache.get(&sub_dir)?.get(key).cloned();
        let (children, below) = subtree(key, &sub_dir, cache)?;

        overridden |= value.is_some() || below;
        tree.insert(
            name,
            TreeNode {
                value,
                is_secret: false,
                children,
            },
        );
    }

    if !overridden {
        tree.clear();
    }
    Ok((tree, overridden))
}
