//! The named bones of an imported model and their bind pose offsets.
use glam::Mat4;
use indexmap::IndexMap;
use log::debug;
use smol_str::SmolStr;

/// The id and bind offset for a single bone in a [BoneDirectory].
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct BoneInfo {
    /// The index of this bone's skinning matrix.
    pub id: usize,
    /// The inverse of the bone's rest pose model space transform.
    pub offset: Mat4,
}

/// A mapping from bone names to dense ids and bind offsets.
///
/// Ids are assigned in the order bones are first inserted starting from 0.
/// A directory is built once when a model is imported
/// and then shared read only by every clip and entity using that model.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, PartialEq, Clone, Default)]
pub struct BoneDirectory {
    // The id of each bone is its insertion index.
    bones: IndexMap<SmolStr, Mat4>,
}

impl BoneDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a bone and return its id.
    ///
    /// Inserting a name that is already present keeps the original id and offset.
    pub fn insert(&mut self, name: &str, offset: Mat4) -> usize {
        match self.bones.get_index_of(name) {
            Some(id) => id,
            None => {
                let (id, _) = self.bones.insert_full(name.into(), offset);
                id
            }
        }
    }

    /// Add a bone with an identity offset if `name` is not already present.
    ///
    /// Importers use this for animation channels targeting nodes
    /// that no mesh references as a bone.
    pub fn register_missing(&mut self, name: &str) -> usize {
        if let Some(id) = self.bones.get_index_of(name) {
            id
        } else {
            debug!("Bone {name:?} not found in skeleton, adding with identity offset");
            self.insert(name, Mat4::IDENTITY)
        }
    }

    pub fn get(&self, name: &str) -> Option<BoneInfo> {
        self.bones
            .get_full(name)
            .map(|(id, _, offset)| BoneInfo {
                id,
                offset: *offset,
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bones.contains_key(name)
    }

    /// The name of the bone with the given `id`.
    pub fn name(&self, id: usize) -> Option<&str> {
        self.bones.get_index(id).map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    /// Iterate over bone names and info in id order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, BoneInfo)> {
        self.bones
            .iter()
            .enumerate()
            .map(|(id, (name, offset))| {
                (
                    name.as_str(),
                    BoneInfo {
                        id,
                        offset: *offset,
                    },
                )
            })
    }
}

impl<'a> FromIterator<(&'a str, Mat4)> for BoneDirectory {
    fn from_iter<T: IntoIterator<Item = (&'a str, Mat4)>>(iter: T) -> Self {
        let mut bones = Self::new();
        for (name, offset) in iter {
            bones.insert(name, offset);
        }
        bones
    }
}
