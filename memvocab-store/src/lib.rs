//! # MemVocab Store
//!
//! The embedded persistence layer for the MemVocab vocabulary trainer:
//! a versioned, two-collection document database with repository services,
//! idempotent default-data seeding, and live (reactive) queries.
//!
//! - [`VocabDb`] - the document store: schema versions, forward-only
//!   migrations, atomic file persistence, change events.
//! - [`DeckStore`] / [`CardStore`] - repositories implementing the
//!   `memvocab-core` traits; decks are decorated with their computed card
//!   count at read time.
//! - [`LiveQuery`] - subscriptions that re-deliver fresh snapshots after
//!   every relevant committed write.
//! - [`SeedService`] - guarantees usable data on first run without ever
//!   clobbering user data.

pub mod cards;
pub mod db;
pub mod decks;
pub mod live;
pub mod paths;
pub mod schema;
pub mod seed;

pub use cards::CardStore;
pub use db::{ChangeEvent, Collection, VocabDb};
pub use decks::DeckStore;
pub use live::LiveQuery;
pub use seed::{SeedDelay, SeedService, DEFAULT_DECK_ID};
