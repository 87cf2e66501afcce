//! `adjective-animal` identifier generation.
//!
//! `rand` backs uniform sampling over two word lists. The generator is
//! pure with respect to its random source: callers supply the "already
//! taken" set and get back either a fresh name or `NameGenerationExhausted`.

use std::collections::HashSet;

use rand::Rng;

use crate::error::WtError;

const MAX_ATTEMPTS: u32 = 10;

const ADJECTIVES: &[&str] = &[
    "swift", "quiet", "bold", "lucky", "brave", "calm", "clever", "eager",
    "fuzzy", "gentle", "happy", "jolly", "keen", "lively", "mighty", "nimble",
    "proud", "quick", "rapid", "sharp", "shy", "sleepy", "sly", "sturdy",
    "tidy", "vivid", "witty", "zany", "amber", "azure", "coral", "crimson",
    "golden", "ivory", "jade", "scarlet", "silver", "violet", "ancient",
    "cosmic", "hidden", "humble", "icy", "loyal", "merry", "noble", "odd",
    "plucky", "rustic",
];

const ANIMALS: &[&str] = &[
    "fox", "owl", "wolf", "hawk", "bear", "deer", "otter", "heron", "lynx",
    "raven", "badger", "beaver", "falcon", "gecko", "ibis", "jaguar", "koala",
    "lemur", "mole", "newt", "panda", "quail", "rabbit", "seal", "tapir",
    "urchin", "vole", "walrus", "yak", "zebra", "antelope", "bison", "cobra",
    "dingo", "egret", "ferret", "gazelle", "bobcat", "iguana", "jackal",
    "kestrel", "llama", "magpie", "narwhal", "ocelot", "pelican", "quokka",
    "stoat", "toucan", "viper", "wombat", "caribou", "finch",
];

/// Uniformly sample a fresh `adjective-animal` id disjoint from `taken`.
/// Fails after `MAX_ATTEMPTS` consecutive collisions.
pub fn generate(taken: &HashSet<String>) -> anyhow::Result<String> {
    let mut rng = rand::rng();
    for _ in 0..MAX_ATTEMPTS {
        let adjective = ADJECTIVES[rng.random_range(0..ADJECTIVES.len())];
        let animal = ANIMALS[rng.random_range(0..ANIMALS.len())];
        let candidate = format!("{adjective}-{animal}");
        if !taken.contains(&candidate) {
            return Ok(candidate);
        }
    }
    Err(WtError::NameGenerationExhausted.into())
}
