//! The live document tree that rendered markup is attached to.
//!
//! Visible nodes back the preview surface. Offscreen nodes exist only while a
//! capture runs: [`OffscreenContainer`] attaches one and removes it again when
//! dropped, whatever path the capture takes out.

use crate::layout::MarkupNode;

/// Horizontal offset that keeps offscreen containers out of any viewport.
pub const OFFSCREEN_LEFT: f32 = -100_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u64);

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Placement {
    /// In normal flow, visible and interactive
    Visible,
    /// Fixed-positioned outside the viewport, hidden from assistive tech, inert
    Offscreen { left: f32, top: f32 },
}

impl Placement {
    pub fn offscreen() -> Self {
        Placement::Offscreen { left: OFFSCREEN_LEFT, top: 0.0 }
    }

    pub fn is_interactive(&self) -> bool {
        matches!(self, Placement::Visible)
    }

    pub fn is_aria_hidden(&self) -> bool {
        matches!(self, Placement::Offscreen { .. })
    }
}

#[derive(Debug)]
pub struct HostNode {
    pub id: NodeId,
    pub placement: Placement,
    pub tree: MarkupNode,
}

/// Top-level children of the host body, in attach order.
#[derive(Debug, Default)]
pub struct HostDocument {
    body: Vec<HostNode>,
    next_id: u64,
}

impl HostDocument {
    pub fn new() -> Self {
        HostDocument::default()
    }

    pub fn attach(&mut self, tree: MarkupNode, placement: Placement) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.body.push(HostNode { id, placement, tree });
        tracing::trace!(node = id.0, ?placement, "attached host node");
        id
    }

    /// Remove a node; returns it if it was attached.
    pub fn detach(&mut self, id: NodeId) -> Option<HostNode> {
        let idx = self.body.iter().position(|n| n.id == id)?;
        tracing::trace!(node = id.0, "detached host node");
        Some(self.body.remove(idx))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.body.iter().any(|n| n.id == id)
    }

    pub fn get(&self, id: NodeId) -> Option<&HostNode> {
        self.body.iter().find(|n| n.id == id)
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    pub fn offscreen_count(&self) -> usize {
        self.body.iter().filter(|n| !n.placement.is_interactive()).count()
    }
}

// ============================================================================
// OFFSCREEN CONTAINER
// ============================================================================

/// An offscreen node attached for the lifetime of this guard.
#[derive(Debug)]
pub struct OffscreenContainer<'a> {
    host: &'a mut HostDocument,
    id: NodeId,
}

impl<'a> OffscreenContainer<'a> {
    pub fn attach(host: &'a mut HostDocument, tree: MarkupNode) -> Self {
        let id = host.attach(tree, Placement::offscreen());
        OffscreenContainer { host, id }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn host(&self) -> &HostDocument {
        &*self.host
    }

    /// Resolve an `#id` selector within the container.
    pub fn query(&self, id: &str) -> Option<&MarkupNode> {
        self.host.get(self.id).and_then(|n| n.tree.find_by_id(id))
    }
}

impl Drop for OffscreenContainer<'_> {
    fn drop(&mut self) {
        self.host.detach(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attach_and_detach() {
        let mut host = HostDocument::new();
        let a = host.attach(MarkupNode::view(), Placement::Visible);
        let b = host.attach(MarkupNode::view(), Placement::offscreen());
        assert_eq!(host.len(), 2);
        assert_eq!(host.offscreen_count(), 1);

        assert!(host.detach(a).is_some());
        assert!(host.detach(a).is_none());
        assert!(!host.contains(a));
        assert!(host.contains(b));
    }

    #[test]
    fn test_container_is_offscreen_and_inert() {
        let mut host = HostDocument::new();
        let guard = OffscreenContainer::attach(&mut host, MarkupNode::view().with_id("x"));
        let node = guard.host().get(guard.id()).unwrap();
        assert!(!node.placement.is_interactive());
        assert!(node.placement.is_aria_hidden());
        assert!(guard.query("x").is_some());
        assert!(guard.query("y").is_none());
    }

    #[test]
    fn test_container_removed_on_drop() {
        let mut host = HostDocument::new();
        let visible = host.attach(MarkupNode::view(), Placement::Visible);
        let id = {
            let guard = OffscreenContainer::attach(&mut host, MarkupNode::view());
            assert!(guard.host().contains(guard.id()));
            guard.id()
        };
        assert!(!host.contains(id));
        assert!(host.contains(visible));
        assert_eq!(host.offscreen_count(), 0);
    }

    #[test]
    fn test_container_removed_on_early_return() {
        fn fails(host: &mut HostDocument) -> Result<(), &'static str> {
            let guard = OffscreenContainer::attach(host, MarkupNode::view());
            guard.query("missing").ok_or("not found")?;
            Ok(())
        }

        let mut host = HostDocument::new();
        assert!(fails(&mut host).is_err());
        assert!(host.is_empty());
    }
}
