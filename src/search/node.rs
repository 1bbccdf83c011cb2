use std::sync::Arc;

pub type NodeRef<P, M> = Arc<Node<P, M>>;

pub struct Node<P, M> {
    pub position: P,
    pub mov: Option<M>,
    pub parent: Option<NodeRef<P, M>>,
    pub depth: usize,
}

impl<P, M> Node<P, M> {
    #[must_use]
    pub fn root(position: P) -> NodeRef<P, M> {
        Arc::new(Self {
            position,
            mov: None,
            parent: None,
            depth: 0,
        })
    }

    #[must_use]
    pub fn child(parent: &NodeRef<P, M>, mov: M, position: P) -> NodeRef<P, M> {
        Arc::new(Self {
            position,
            mov: Some(mov),
            parent: Some(Arc::clone(parent)),
            depth: parent.depth + 1,
        })
    }

    #[inline]
    pub const fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    fn ancestry(&self) -> impl Iterator<Item = &Self> {
        std::iter::successors(Some(self), |node| node.parent.as_deref())
    }

    #[must_use]
    pub fn path_from_root(&self) -> Vec<M>
    where
        M: Clone,
    {
        let mut moves: Vec<M> = self.ancestry().filter_map(|node| node.mov.clone()).collect();
        moves.reverse();
        moves
    }

    #[must_use]
    pub fn positions_from_root(&self) -> Vec<P>
    where
        P: Clone,
    {
        let mut positions: Vec<P> = self.ancestry().map(|node| node.position.clone()).collect();
        positions.reverse();
        positions
    }
}

// Unlinks the chain iteratively so dropping a deep leaf does not recurse once per ancestor.
impl<P, M> Drop for Node<P, M> {
    fn drop(&mut self) {
        let mut next = self.parent.take();
        while let Some(node) = next {
            match Arc::try_unwrap(node) {
                Ok(mut owned) => next = owned.parent.take(),
                Err(_) => break,
            }
        }
    }
}
