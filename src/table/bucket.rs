use std::{borrow::Borrow, mem};

type Link<K, V> = Option<Box<Node<K, V>>>;

/// A key-value pair linked into exactly one chain.
///
/// The hash is computed once at insertion. Rehashing reuses it, so moving a node
/// into a larger table never calls back into the key's `Hash` impl.
pub(crate) struct Node<K, V> {
    hash: u64,
    key: K,
    value: V,
    next: Link<K, V>,
}

impl<K, V> Node<K, V> {
    pub(crate) fn new(hash: u64, key: K, value: V) -> Box<Self> {
        Box::new(Self {
            hash,
            key,
            value,
            next: None,
        })
    }

    #[inline]
    pub(crate) fn hash(&self) -> u64 {
        self.hash
    }
}

/// The head of one singly-linked chain.
///
/// A bucket is always accessed through the `Mutex` that owns it in a
/// `BucketArray`, so every structural change to the chain happens under that
/// bucket's lock.
///
/// Once a resize or a clear has taken the chain out, the bucket is marked
/// _forwarded_. A forwarded bucket is permanently empty and belongs to a table
/// that has been (or is about to be) replaced; whoever locks it must go back to
/// the map and retry against the published table.
pub(crate) struct Bucket<K, V> {
    head: Link<K, V>,
    len: usize,
    forwarded: bool,
}

impl<K, V> Default for Bucket<K, V> {
    fn default() -> Self {
        Self {
            head: None,
            len: 0,
            forwarded: false,
        }
    }
}

impl<K, V> Bucket<K, V> {
    #[inline]
    pub(crate) fn is_forwarded(&self) -> bool {
        self.forwarded
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            next: self.head.as_deref(),
        }
    }

    /// Links a detached node at the head of the chain. The caller guarantees no
    /// node with an equal key is already in the chain.
    pub(crate) fn push_front(&mut self, mut node: Box<Node<K, V>>) {
        debug_assert!(!self.forwarded);
        node.next = self.head.take();
        self.head = Some(node);
        self.len += 1;
    }

    /// Takes the whole chain out of this bucket and marks it forwarded.
    pub(crate) fn forward(&mut self) -> Chain<K, V> {
        self.forwarded = true;
        Chain {
            head: self.head.take(),
            len: mem::take(&mut self.len),
        }
    }
}

impl<K: Eq, V> Bucket<K, V> {
    pub(crate) fn get<Q>(&self, hash: u64, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
    {
        let mut link = self.head.as_deref();
        while let Some(node) = link {
            if node.hash == hash && node.key.borrow() == key {
                return Some(&node.value);
            }
            link = node.next.as_deref();
        }
        None
    }

    fn get_mut<Q>(&mut self, hash: u64, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
    {
        let mut link = self.head.as_deref_mut();
        while let Some(node) = link {
            if node.hash == hash && node.key.borrow() == key {
                return Some(&mut node.value);
            }
            link = node.next.as_deref_mut();
        }
        None
    }

    /// Replaces the value of an existing key in place and returns the old value,
    /// or links a new node at the head of the chain and returns `None`.
    pub(crate) fn insert(&mut self, hash: u64, key: K, value: V) -> Option<V> {
        if let Some(existing) = self.get_mut(hash, &key) {
            return Some(mem::replace(existing, value));
        }
        self.push_front(Node::new(hash, key, value));
        None
    }

    /// Unlinks the node for `key` in a single walk, fixing up either the bucket
    /// head or the predecessor's `next`.
    pub(crate) fn remove<Q>(&mut self, hash: u64, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
    {
        let mut link = &mut self.head;
        loop {
            match link {
                None => return None,
                Some(node) if node.hash == hash && node.key.borrow() == key => {
                    let next = node.next.take();
                    self.len -= 1;
                    return mem::replace(link, next).map(|removed| {
                        let Node { value, .. } = *removed;
                        value
                    });
                }
                Some(node) => link = &mut node.next,
            }
        }
    }
}

impl<K, V> Drop for Bucket<K, V> {
    fn drop(&mut self) {
        // Unlink one node at a time; the default recursive drop could overflow the
        // stack on a long chain.
        drop(Chain {
            head: self.head.take(),
            len: 0,
        });
    }
}

pub(crate) struct Iter<'a, K, V> {
    next: Option<&'a Node<K, V>>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.next?;
        self.next = node.next.as_deref();
        Some((&node.key, &node.value))
    }
}

/// A chain detached from its bucket. Yields its nodes one by one, each with a
/// cleared `next`, ready to be relinked elsewhere.
pub(crate) struct Chain<K, V> {
    head: Link<K, V>,
    len: usize,
}

impl<K, V> Chain<K, V> {
    pub(crate) fn len(&self) -> usize {
        self.len
    }
}

impl<K, V> Iterator for Chain<K, V> {
    type Item = Box<Node<K, V>>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut node = self.head.take()?;
        self.head = node.next.take();
        self.len = self.len.saturating_sub(1);
        Some(node)
    }
}

impl<K, V> Drop for Chain<K, V> {
    fn drop(&mut self) {
        for _node in self.by_ref() {}
    }
}
