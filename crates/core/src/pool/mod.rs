use std::{collections::HashMap, fmt};

use serde::{Deserialize, Serialize};

use crate::{
    placement::Placement,
    track::{Note, NoteKind},
    PoolConfig,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NoteStyle {
    Arrow,
    Dot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NoteColor {
    Red,
    Blue,
}

/// Category of presentable object. Every key is served by its own pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PoolKey {
    Note { style: NoteStyle, color: NoteColor },
    /// Inert note; carries no color.
    Mine,
    Wall,
}

impl PoolKey {
    pub const ALL: [PoolKey; 6] = [
        PoolKey::Note {
            style: NoteStyle::Arrow,
            color: NoteColor::Red,
        },
        PoolKey::Note {
            style: NoteStyle::Arrow,
            color: NoteColor::Blue,
        },
        PoolKey::Note {
            style: NoteStyle::Dot,
            color: NoteColor::Red,
        },
        PoolKey::Note {
            style: NoteStyle::Dot,
            color: NoteColor::Blue,
        },
        PoolKey::Mine,
        PoolKey::Wall,
    ];

    pub fn for_note(note: &Note) -> Self {
        let style = if note.cut_direction.is_dot() {
            NoteStyle::Dot
        } else {
            NoteStyle::Arrow
        };
        match note.kind {
            NoteKind::Mine => PoolKey::Mine,
            NoteKind::Red => PoolKey::Note {
                style,
                color: NoteColor::Red,
            },
            NoteKind::Blue => PoolKey::Note {
                style,
                color: NoteColor::Blue,
            },
        }
    }
}

impl fmt::Display for PoolKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolKey::Note { style, color } => {
                let style = match style {
                    NoteStyle::Arrow => "arrow",
                    NoteStyle::Dot => "dot",
                };
                let color = match color {
                    NoteColor::Red => "red",
                    NoteColor::Blue => "blue",
                };
                write!(f, "beat-{style}-{color}")
            }
            PoolKey::Mine => f.write_str("beat-mine"),
            PoolKey::Wall => f.write_str("wall"),
        }
    }
}

/// Reference to a pooled object currently lent out to the session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PresentableHandle {
    id: u64,
    key: PoolKey,
}

impl PresentableHandle {
    pub fn new(id: u64, key: PoolKey) -> Self {
        Self { id, key }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn key(&self) -> PoolKey {
        self.key
    }
}

/// Source of reusable presentable objects. None of the calls may block;
/// `acquire` returns `None` when the pool for `key` is missing or exhausted.
pub trait PoolGateway {
    fn acquire(&mut self, key: &PoolKey) -> Option<PresentableHandle>;

    /// Positions the object and starts it playing.
    fn present(&mut self, handle: &PresentableHandle, placement: Placement);

    fn release(&mut self, handle: PresentableHandle);
}

#[derive(Debug, Default)]
struct Pool {
    free: Vec<u64>,
    active: HashMap<u64, Option<Placement>>,
}

/// In-memory bounded pools, one per [`PoolKey`].
#[derive(Debug, Default)]
pub struct PoolSet {
    pools: HashMap<PoolKey, Pool>,
    next_id: u64,
}

impl PoolSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &PoolConfig) -> Self {
        let mut pools = Self::new();
        for key in PoolKey::ALL {
            let capacity = match key {
                PoolKey::Note {
                    style: NoteStyle::Arrow,
                    ..
                } => config.arrow,
                PoolKey::Note {
                    style: NoteStyle::Dot,
                    ..
                } => config.dot,
                PoolKey::Mine => config.mine,
                PoolKey::Wall => config.wall,
            };
            pools.register(key, capacity);
        }
        pools
    }

    /// Adds `capacity` fresh objects to the pool for `key`, creating it if
    /// needed.
    pub fn register(&mut self, key: PoolKey, capacity: usize) {
        let pool = self.pools.entry(key).or_default();
        for _ in 0..capacity {
            pool.free.push(self.next_id);
            self.next_id += 1;
        }
    }

    pub fn contains(&self, key: &PoolKey) -> bool {
        self.pools.contains_key(key)
    }

    pub fn available(&self, key: &PoolKey) -> usize {
        self.pools.get(key).map_or(0, |pool| pool.free.len())
    }

    pub fn in_use(&self, key: &PoolKey) -> usize {
        self.pools.get(key).map_or(0, |pool| pool.active.len())
    }

    pub fn total_in_use(&self) -> usize {
        self.pools.values().map(|pool| pool.active.len()).sum()
    }

    /// Latest placement handed to a lent-out object.
    pub fn placement(&self, handle: &PresentableHandle) -> Option<&Placement> {
        self.pools
            .get(&handle.key)
            .and_then(|pool| pool.active.get(&handle.id))
            .and_then(Option::as_ref)
    }
}

impl PoolGateway for PoolSet {
    fn acquire(&mut self, key: &PoolKey) -> Option<PresentableHandle> {
        let Some(pool) = self.pools.get_mut(key) else {
            tracing::warn!(%key, "pool unavailable");
            return None;
        };
        let Some(id) = pool.free.pop() else {
            tracing::debug!(%key, "pool exhausted");
            return None;
        };
        pool.active.insert(id, None);
        Some(PresentableHandle::new(id, *key))
    }

    fn present(&mut self, handle: &PresentableHandle, placement: Placement) {
        if let Some(slot) = self
            .pools
            .get_mut(&handle.key)
            .and_then(|pool| pool.active.get_mut(&handle.id))
        {
            *slot = Some(placement);
        }
    }

    fn release(&mut self, handle: PresentableHandle) {
        let Some(pool) = self.pools.get_mut(&handle.key) else {
            return;
        };
        if pool.active.remove(&handle.id).is_some() {
            pool.free.push(handle.id);
        } else {
            tracing::debug!(key = %handle.key, id = handle.id, "ignoring release of idle object");
        }
    }
}
