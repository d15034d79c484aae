use super::SpaceId;
use crate::platform::WindowServer;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Space {
    pub id: SpaceId,
    /// 1-based position in Mission Control order, across all displays.
    pub index: usize,
    pub is_current: bool,
}

/// Known spaces, replaced wholesale on every full refresh.
#[derive(Debug, Default)]
pub struct SpaceRegistry {
    spaces: Vec<Space>,
    current: Option<SpaceId>,
}

impl SpaceRegistry {
    /// Re-query every space and return their `(id, index)` pairs in display order.
    pub fn refresh<S: WindowServer + ?Sized>(&mut self, server: &S) -> Vec<(SpaceId, usize)> {
        let ids = match server.list_spaces() {
            Ok(spaces) => spaces.into_iter().map(|s| s.id).collect(),
            Err(error) => {
                debug!(target: "alt_tab::spaces", %error, "space list unavailable");
                Vec::new()
            }
        };
        let current = server.current_space_id();
        self.replace(ids, current);
        self.ids_and_indexes()
    }

    /// The "active space changed" notification is not delivered when displays
    /// don't have separate spaces, so callers poll this before every layout pass.
    pub fn refresh_current_space_id<S: WindowServer + ?Sized>(&mut self, server: &S) {
        let current = server.current_space_id();
        if current == self.current {
            return;
        }
        debug!(target: "alt_tab::spaces", ?current, previous = ?self.current, "current space changed");
        self.set_current(current);
    }

    pub fn replace(&mut self, ids: Vec<SpaceId>, current: Option<SpaceId>) {
        self.spaces = ids
            .into_iter()
            .enumerate()
            .map(|(i, id)| Space {
                id,
                index: i + 1,
                is_current: Some(id) == current,
            })
            .collect();
        self.current = current;
    }

    pub fn set_current(&mut self, current: Option<SpaceId>) {
        self.current = current;
        for space in &mut self.spaces {
            space.is_current = Some(space.id) == current;
        }
    }

    pub fn current_space_id(&self) -> Option<SpaceId> {
        self.current
    }

    pub fn index_of(&self, id: SpaceId) -> Option<usize> {
        self.spaces.iter().find(|s| s.id == id).map(|s| s.index)
    }

    pub fn is_single_space(&self) -> bool {
        self.spaces.len() <= 1
    }

    pub fn spaces(&self) -> &[Space] {
        &self.spaces
    }

    pub fn ids_and_indexes(&self) -> Vec<(SpaceId, usize)> {
        self.spaces.iter().map(|s| (s.id, s.index)).collect()
    }
}
