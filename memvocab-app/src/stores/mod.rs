pub mod cards;
pub mod decks;

pub use cards::{CardsSnapshot, CardsStore};
pub use decks::{DecksSnapshot, DecksStore};
