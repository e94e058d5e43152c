//! chained-hashtable: a single-threaded hash table keyed by byte strings,
//! with per-table value destructors and borrowed ("static") values.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: a small, self-contained table whose structure (buckets, chains,
//!   growth) is explicit and inspectable, for stores that hand around
//!   opaque byte blobs as both keys and values.
//! - Layers:
//!   - `lookup`: Bob Jenkins' `lookup2` hash (1996), reproduced bit for
//!     bit, plus `Hasher`/`BuildHasher` adapters that chain it.
//!   - `HashTable<'a>`: bucket array of chain heads over a `SlotMap`
//!     arena, with a key-list threading every entry in insertion order.
//!
//! Constraints
//! - Single-threaded: no internal synchronization. Share behind an
//!   external lock if needed.
//! - Keys are length-authoritative byte strings; embedded NULs are legal.
//!   Zero-length keys are rejected by mutators.
//! - At most one entry per distinct key; `set` on an existing key swaps
//!   the value in place and leaves chain and key-list positions alone.
//!
//! Ownership
//! - `set` copies the value; the copy is owned by the table, handed to the
//!   destructor (if any) and freed on replace, delete or teardown.
//! - `set_static` stores a `&'a [u8]` verbatim. The table never frees it
//!   and never passes it to the destructor; the lifetime parameter ties
//!   the borrow to the table.
//! - Values are released only after the entry is unlinked, so the table
//!   is structurally consistent whenever the destructor runs.
//!
//! Growth
//! - Starts at `2^DEFAULT_TABLESIZE` buckets. A genuinely new key that
//!   lands in an occupied bucket while `len() >= bucket_count()` doubles
//!   the bucket array first. Only entries whose bucket changes under the
//!   wider mask are moved; each entry caches its 32-bit hash so nothing
//!   is re-hashed. The table never shrinks.
//!
//! Errors
//! - Allocation failures for keys, values and the bucket array surface as
//!   `Error::Alloc`; reservations happen before any structural change, so
//!   a failed call leaves the table as it was. Missing keys are not errors.
//!
//! Logging
//! - Emits through the `log` facade: table creation/destruction at trace
//!   level, every split at debug level.

mod error;
mod hash_table;
mod hash_table_proptest;
pub mod lookup;

// Public surface
pub use error::{Error, Result};
pub use hash_table::{
    Builder, Destructor, HashTable, Iter, Keys, SetOutcome, Value, DEFAULT_TABLESIZE,
    MAX_TABLESIZE,
};
pub use lookup::{lookup, LookupBuildHasher, LookupHasher};
