//! Identity types for the effect graph.
//!
//! All IDs are newtypes over `u32`. Unlike array indices they stay stable
//! across removals, so they can be serialized and restored verbatim.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! graph_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl $name {
            #[inline]
            pub fn raw(self) -> u32 {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Debug::fmt(self, f)
            }
        }
    };
}

graph_id!(
    /// Identifies a [`Node`](crate::graph::Node) within a graph.
    NodeId
);
graph_id!(
    /// Identifies a [`Connection`](crate::graph::Connection).
    ConnectionId
);
graph_id!(
    /// Identifies a [`ModulationSourceNode`](crate::graph::ModulationSourceNode).
    ModulationSourceId
);
graph_id!(
    /// Identifies a [`Modulation`](crate::graph::Modulation).
    ModulationId
);

/// Monotonic id allocator, one per entity kind.
///
/// Restoring a serialized id through [`IdAllocator::reserve`] moves the
/// counter past it, so ids handed out afterwards never collide. Once
/// `u32::MAX` has been reserved the allocator is exhausted and never wraps.
#[derive(Debug, Clone)]
pub struct IdAllocator {
    next: Option<u32>,
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self { next: Some(0) }
    }
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// The id the next add should use, or `None` when exhausted.
    pub fn peek(&self) -> Option<u32> {
        self.next
    }

    pub fn reserve(&mut self, id: u32) {
        if self.next.is_some_and(|next| id >= next) {
            self.next = id.checked_add(1);
        }
    }
}
