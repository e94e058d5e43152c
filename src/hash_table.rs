//! HashTable: byte-keyed chained table over a slot arena with incremental splitting.

use crate::error::{Error, Result};
use crate::lookup::{hashmask, hashsize, lookup};
use slotmap::{DefaultKey, SlotMap};
use std::fmt;

/// Initial tablesize exponent (512 buckets).
pub const DEFAULT_TABLESIZE: u32 = 9;

/// Largest tablesize exponent; hashes are 32-bit.
pub const MAX_TABLESIZE: u32 = 31;

/// Callback run on every owned value before it is freed.
pub type Destructor<'a> = Box<dyn FnMut(&mut [u8]) + 'a>;

/// What a successful `set`/`set_static` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOutcome {
    /// A new entry was created for the key.
    Inserted,
    /// The key existed; its value was swapped in place.
    Replaced,
}

/// A stored value: a private copy, or a caller-owned slice.
#[derive(Debug, PartialEq, Eq)]
pub enum Value<'a> {
    /// Copied on insert; passed to the destructor and freed on removal.
    Owned(Box<[u8]>),
    /// Stored verbatim; never copied, freed, or passed to the destructor.
    Static(&'a [u8]),
}

impl Value<'_> {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Value::Owned(bytes) => &bytes[..],
            Value::Static(bytes) => bytes,
        }
    }

    pub fn is_static(&self) -> bool {
        matches!(self, Value::Static(_))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Links {
    prev: Option<DefaultKey>,
    next: Option<DefaultKey>,
}

#[derive(Debug)]
struct Entry<'a> {
    key: Box<[u8]>,
    hash: u32,
    value: Value<'a>,
    chain: Links, // neighbours within the bucket
    order: Links, // neighbours within the key-list
}

fn copy_bytes(src: &[u8]) -> Result<Box<[u8]>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(src.len())?;
    buf.extend_from_slice(src);
    Ok(buf.into_boxed_slice())
}

/// Configuration for a new [`HashTable`].
pub struct Builder<'a> {
    tablesize: u32,
    destructor: Option<Destructor<'a>>,
}

impl<'a> Builder<'a> {
    /// Start with `2^tablesize` buckets.
    pub fn initial_tablesize(mut self, tablesize: u32) -> Self {
        self.tablesize = tablesize;
        self
    }

    /// Run `f` on each owned value right before it is freed.
    pub fn destructor<F>(mut self, f: F) -> Self
    where
        F: FnMut(&mut [u8]) + 'a,
    {
        self.destructor = Some(Box::new(f));
        self
    }

    pub fn build(self) -> Result<HashTable<'a>> {
        if self.tablesize > MAX_TABLESIZE {
            return Err(Error::InvalidTablesize(self.tablesize));
        }
        let n = hashsize(self.tablesize) as usize;
        let mut buckets = Vec::new();
        buckets.try_reserve_exact(n)?;
        buckets.resize(n, None);

        log::trace!("Created hash table with {n} buckets");

        Ok(HashTable {
            tablesize: self.tablesize,
            buckets,
            slots: SlotMap::with_key(),
            head: None,
            tail: None,
            destructor: self.destructor,
        })
    }
}

/// Chained hash table keyed by byte strings.
///
/// Entries live in a slot arena. Each bucket holds the head of a doubly
/// linked chain; a second doubly linked list (the key-list) threads every
/// entry in insertion order and drives iteration and teardown.
///
/// The table grows by one bit when a new key collides in a table holding
/// at least as many entries as buckets. It never shrinks.
pub struct HashTable<'a> {
    tablesize: u32,
    buckets: Vec<Option<DefaultKey>>,
    slots: SlotMap<DefaultKey, Entry<'a>>,
    head: Option<DefaultKey>,
    tail: Option<DefaultKey>,
    destructor: Option<Destructor<'a>>,
}

impl<'a> HashTable<'a> {
    /// Create an empty table with [`DEFAULT_TABLESIZE`].
    pub fn new(destructor: Option<Destructor<'a>>) -> Result<Self> {
        Builder {
            tablesize: DEFAULT_TABLESIZE,
            destructor,
        }
        .build()
    }

    pub fn builder() -> Builder<'a> {
        Builder {
            tablesize: DEFAULT_TABLESIZE,
            destructor: None,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Current exponent; the table has `2^tablesize` buckets.
    pub fn tablesize(&self) -> u32 {
        self.tablesize
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    #[inline]
    fn bucket_of(&self, hash: u32) -> usize {
        (hash & hashmask(self.tablesize)) as usize
    }

    fn find(&self, key: &[u8], hash: u32) -> Option<DefaultKey> {
        let mut cur = self.buckets[self.bucket_of(hash)];
        while let Some(k) = cur {
            let e = &self.slots[k];
            if e.hash == hash && *e.key == *key {
                return Some(k);
            }
            cur = e.chain.next;
        }
        None
    }

    /// Store a copy of `value` under `key`, replacing any previous value.
    pub fn set(&mut self, key: &[u8], value: &[u8]) -> Result<SetOutcome> {
        if key.is_empty() {
            return Err(Error::EmptyKey);
        }
        let value = Value::Owned(copy_bytes(value)?);
        self.store(key, value)
    }

    /// Store `value` under `key` without copying it. The table never frees
    /// it nor hands it to the destructor.
    pub fn set_static(&mut self, key: &[u8], value: &'a [u8]) -> Result<SetOutcome> {
        if key.is_empty() {
            return Err(Error::EmptyKey);
        }
        self.store(key, Value::Static(value))
    }

    fn store(&mut self, key: &[u8], value: Value<'a>) -> Result<SetOutcome> {
        let hash = lookup(key, 0);

        if let Some(k) = self.find(key, hash) {
            let old = std::mem::replace(&mut self.slots[k].value, value);
            self.release(old);
            return Ok(SetOutcome::Replaced);
        }

        let key = copy_bytes(key)?;
        let mut idx = self.bucket_of(hash);
        if self.buckets[idx].is_some() && self.is_saturated() {
            self.split()?;
            idx = self.bucket_of(hash);
        }

        let k = self.slots.insert(Entry {
            key,
            hash,
            value,
            chain: Links::default(),
            order: Links::default(),
        });
        self.append_to_chain(k, idx);
        self.append_to_key_list(k);

        Ok(SetOutcome::Inserted)
    }

    fn is_saturated(&self) -> bool {
        self.tablesize < MAX_TABLESIZE && self.slots.len() >= self.buckets.len()
    }

    /// Double the bucket array and move only the entries whose bucket
    /// changes under the wider mask.
    ///
    /// An entry in bucket `i` either stays or moves to `i + old`, which
    /// lies in the fresh upper half, so prepending there never disturbs
    /// a chain still to be visited.
    fn split(&mut self) -> Result<()> {
        let old = self.buckets.len();
        self.buckets.try_reserve_exact(old)?;
        self.buckets.resize(old * 2, None);
        self.tablesize += 1;

        let mut moved = 0usize;
        for i in 0..old {
            let mut cur = self.buckets[i];
            while let Some(k) = cur {
                let (next, hash) = {
                    let e = &self.slots[k];
                    (e.chain.next, e.hash)
                };
                let target = self.bucket_of(hash);
                if target != i {
                    self.unlink_chain(k, i);
                    self.push_chain_front(k, target);
                    moved += 1;
                }
                cur = next;
            }
        }

        log::debug!(
            "Split hash table from {old} to {} buckets, moved {moved} of {} entries",
            self.buckets.len(),
            self.slots.len()
        );
        Ok(())
    }

    fn append_to_chain(&mut self, k: DefaultKey, idx: usize) {
        let Some(mut last) = self.buckets[idx] else {
            self.buckets[idx] = Some(k);
            return;
        };
        while let Some(next) = self.slots[last].chain.next {
            last = next;
        }
        self.slots[last].chain.next = Some(k);
        self.slots[k].chain.prev = Some(last);
    }

    fn push_chain_front(&mut self, k: DefaultKey, idx: usize) {
        let first = self.buckets[idx];
        self.slots[k].chain = Links {
            prev: None,
            next: first,
        };
        if let Some(f) = first {
            self.slots[f].chain.prev = Some(k);
        }
        self.buckets[idx] = Some(k);
    }

    fn unlink_chain(&mut self, k: DefaultKey, idx: usize) {
        let Links { prev, next } = std::mem::take(&mut self.slots[k].chain);
        match prev {
            Some(p) => self.slots[p].chain.next = next,
            None => self.buckets[idx] = next,
        }
        if let Some(n) = next {
            self.slots[n].chain.prev = prev;
        }
    }

    fn append_to_key_list(&mut self, k: DefaultKey) {
        self.slots[k].order.prev = self.tail;
        match self.tail {
            Some(t) => self.slots[t].order.next = Some(k),
            None => self.head = Some(k),
        }
        self.tail = Some(k);
    }

    fn unlink_key_list(&mut self, k: DefaultKey) {
        let Links { prev, next } = std::mem::take(&mut self.slots[k].order);
        match prev {
            Some(p) => self.slots[p].order.next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.slots[n].order.prev = prev,
            None => self.tail = prev,
        }
    }

    /// Run the destructor on an owned value, then drop it.
    fn release(&mut self, value: Value<'a>) {
        if let Value::Owned(mut bytes) = value {
            if let Some(destroy) = self.destructor.as_mut() {
                destroy(&mut bytes[..]);
            }
        }
    }

    /// Unlink an entry from both lists, then release its value.
    fn remove_entry(&mut self, k: DefaultKey) {
        let idx = self.bucket_of(self.slots[k].hash);
        self.unlink_chain(k, idx);
        self.unlink_key_list(k);
        if let Some(entry) = self.slots.remove(k) {
            self.release(entry.value);
        }
    }

    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        self.get_value(key).map(Value::as_bytes)
    }

    /// Like `get`, but tells owned values apart from static ones.
    pub fn get_value(&self, key: &[u8]) -> Option<&Value<'a>> {
        let k = self.find(key, lookup(key, 0))?;
        Some(&self.slots[k].value)
    }

    /// Mutable access to an owned value. Static values are read-only.
    pub fn get_mut(&mut self, key: &[u8]) -> Option<&mut [u8]> {
        let k = self.find(key, lookup(key, 0))?;
        match &mut self.slots[k].value {
            Value::Owned(bytes) => Some(&mut bytes[..]),
            Value::Static(_) => None,
        }
    }

    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.find(key, lookup(key, 0)).is_some()
    }

    /// Remove `key`. Returns `Ok(false)` if it was absent.
    pub fn delete(&mut self, key: &[u8]) -> Result<bool> {
        if key.is_empty() {
            return Err(Error::EmptyKey);
        }
        let Some(k) = self.find(key, lookup(key, 0)) else {
            return Ok(false);
        };
        self.remove_entry(k);
        Ok(true)
    }

    /// Release every entry in key-list order and free the bucket array.
    ///
    /// Dropping the table does the same.
    pub fn destroy(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        let entries = self.slots.len();
        while let Some(k) = self.head {
            self.remove_entry(k);
        }
        self.buckets = Vec::new();
        log::trace!("Destroyed hash table holding {entries} entries");
    }

    /// Iterate `(key, value)` pairs in insertion order.
    pub fn iter(&self) -> Iter<'_, 'a> {
        Iter {
            table: self,
            cur: self.head,
            remaining: self.slots.len(),
        }
    }

    pub fn keys(&self) -> Keys<'_, 'a> {
        Keys { it: self.iter() }
    }
}

impl Drop for HashTable<'_> {
    fn drop(&mut self) {
        // Empty only after an explicit `destroy`.
        if !self.buckets.is_empty() {
            self.teardown();
        }
    }
}

impl fmt::Debug for HashTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashTable")
            .field("tablesize", &self.tablesize)
            .field("len", &self.len())
            .field("entries", &DebugEntries(self))
            .finish()
    }
}

struct DebugEntries<'t, 'a>(&'t HashTable<'a>);

impl fmt::Debug for DebugEntries<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.0.iter()).finish()
    }
}

/// Iterator over `(key, value)` pairs in key-list order.
pub struct Iter<'t, 'a> {
    table: &'t HashTable<'a>,
    cur: Option<DefaultKey>,
    remaining: usize,
}

impl<'t, 'a> Iterator for Iter<'t, 'a> {
    type Item = (&'t [u8], &'t [u8]);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let k = self.cur?;
        let e = &self.table.slots[k];
        self.cur = e.order.next;
        self.remaining -= 1;
        Some((&e.key[..], e.value.as_bytes()))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Iter<'_, '_> {}

/// Iterator over keys in key-list order.
pub struct Keys<'t, 'a> {
    it: Iter<'t, 'a>,
}

impl<'t, 'a> Iterator for Keys<'t, 'a> {
    type Item = &'t [u8];

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.it.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.it.size_hint()
    }
}

impl ExactSizeIterator for Keys<'_, '_> {}

impl<'t, 'a> IntoIterator for &'t HashTable<'a> {
    type Item = (&'t [u8], &'t [u8]);
    type IntoIter = Iter<'t, 'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
impl HashTable<'_> {
    /// Panics unless every structural invariant holds.
    pub(crate) fn assert_consistent(&self) {
        use std::collections::BTreeSet;

        assert_eq!(self.buckets.len(), hashsize(self.tablesize) as usize);

        let mut chained = 0usize;
        for (i, head) in self.buckets.iter().enumerate() {
            let mut prev = None;
            let mut cur = *head;
            while let Some(k) = cur {
                let e = &self.slots[k];
                assert_eq!(e.hash, lookup(&e.key, 0), "stale cached hash");
                assert_eq!(self.bucket_of(e.hash), i, "entry in wrong bucket");
                assert_eq!(e.chain.prev, prev, "broken chain back-link");
                chained += 1;
                prev = cur;
                cur = e.chain.next;
            }
        }
        assert_eq!(chained, self.slots.len(), "chains miss entries");

        let mut listed = 0usize;
        let mut prev = None;
        let mut cur = self.head;
        while let Some(k) = cur {
            let e = &self.slots[k];
            assert_eq!(e.order.prev, prev, "broken key-list back-link");
            listed += 1;
            prev = cur;
            cur = e.order.next;
        }
        assert_eq!(self.tail, prev, "key-list tail out of date");
        assert_eq!(listed, self.slots.len(), "key-list misses entries");

        let distinct: BTreeSet<&[u8]> = self.keys().collect();
        assert_eq!(distinct.len(), self.slots.len(), "duplicate keys");
    }

    /// Keys of bucket `idx` in chain order.
    pub(crate) fn chain_keys(&self, idx: usize) -> Vec<Vec<u8>> {
        let mut out = Vec::new();
        let mut cur = self.buckets[idx];
        while let Some(k) = cur {
            out.push(self.slots[k].key.to_vec());
            cur = self.slots[k].chain.next;
        }
        out
    }
}
