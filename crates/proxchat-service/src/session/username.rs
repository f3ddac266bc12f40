//! Random display name generation.

use rand::Rng;

const ADJECTIVES: &[&str] = &[
    "Happy", "Lucky", "Swift", "Bright", "Cool", "Smart", "Brave", "Quick", "Calm", "Bold",
    "Wise", "Silent", "Sharp", "Gentle", "Noble", "Wild",
];

const NOUNS: &[&str] = &[
    "Panda", "Tiger", "Eagle", "Falcon", "Wolf", "Bear", "Fox", "Hawk", "Lion", "Otter",
    "Raven", "Lynx", "Deer", "Owl", "Cobra", "Shark",
];

/// Generate a random adjective+noun+number display name.
pub fn generate_username() -> String {
    let mut rng = rand::thread_rng();
    let adjective = ADJECTIVES[rng.gen_range(0..ADJECTIVES.len())];
    let noun = NOUNS[rng.gen_range(0..NOUNS.len())];
    let number: u16 = rng.gen_range(0..10000);
    format!("{adjective}{noun}{number}")
}
