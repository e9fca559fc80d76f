//! Sprite deduplication
//!
//! Atlas metadata occasionally lists the same sprite name more than once,
//! sometimes with different geometry. Only the first entry for a name is
//! kept; later entries are dropped and counted. The same rule applies
//! across the atlases of a run, where two sprites collide when they would
//! be written to the same output file.

use std::collections::{HashMap, HashSet};

use crate::models::SpriteDescriptor;
use crate::output::sanitize_name;

/// Sprites of one metadata file, unique by name, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortraitSet {
    sprites: Vec<SpriteDescriptor>,
}

impl PortraitSet {
    pub fn len(&self) -> usize {
        self.sprites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sprites.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&SpriteDescriptor> {
        self.sprites.iter().find(|s| s.name == name)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SpriteDescriptor> {
        self.sprites.iter()
    }

    pub fn into_vec(self) -> Vec<SpriteDescriptor> {
        self.sprites
    }
}

impl<'a> IntoIterator for &'a PortraitSet {
    type Item = &'a SpriteDescriptor;
    type IntoIter = std::slice::Iter<'a, SpriteDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.sprites.iter()
    }
}

/// Result of deduplicating one metadata file.
#[derive(Debug, Clone, Default)]
pub struct DedupOutcome {
    pub set: PortraitSet,
    /// Later entries whose name was already taken, in source order
    pub discarded: Vec<SpriteDescriptor>,
}

/// Collapse repeated sprite names, keeping the first entry for each.
pub fn dedup(sprites: Vec<SpriteDescriptor>) -> DedupOutcome {
    let mut seen = HashSet::with_capacity(sprites.len());
    let mut kept = Vec::with_capacity(sprites.len());
    let mut discarded = Vec::new();

    for sprite in sprites {
        if seen.contains(sprite.name.as_str()) {
            discarded.push(sprite);
        } else {
            seen.insert(sprite.name.clone());
            kept.push(sprite);
        }
    }

    DedupOutcome { set: PortraitSet { sprites: kept }, discarded }
}

/// Output names already taken by earlier atlases of a run.
#[derive(Debug, Clone, Default)]
pub struct ClaimedNames {
    names: HashSet<String>,
}

impl ClaimedNames {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove from `sprites` every entry whose output file is already
    /// taken, then claim the files of the rest.
    ///
    /// A file is taken when an earlier call claimed it, or when a sprite
    /// with a different name earlier in `sprites` maps to it. Repeats of
    /// the same name are left for [`dedup`]. Returns the removed entries in
    /// source order.
    pub fn claim(&mut self, sprites: &mut Vec<SpriteDescriptor>) -> Vec<SpriteDescriptor> {
        let mut owners: HashMap<String, String> = HashMap::new();
        let mut kept = Vec::with_capacity(sprites.len());
        let mut taken = Vec::new();

        for sprite in std::mem::take(sprites) {
            let file = sanitize_name(&sprite.name);
            let free = !self.names.contains(&file)
                && owners.get(&file).map_or(true, |owner| *owner == sprite.name);
            if free {
                owners.entry(file).or_insert_with(|| sprite.name.clone());
                kept.push(sprite);
            } else {
                taken.push(sprite);
            }
        }

        self.names.extend(owners.into_keys());
        *sprites = kept;
        taken
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
