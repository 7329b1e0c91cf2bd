use rand::Rng;

use funnel_core::NewLead;

const ASCII_LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Acquisition channel families and the sources allowed within each.
const CHANNELS: &[(&str, &[&str])] = &[
    ("email", &["klaviyo.com"]),
    ("social", &["facebook.com", "twitter.com", "instagram.com"]),
    ("organic", &["none", "google.com"]),
    ("referral", &["hackernews.com", "reddit.com"]),
];

fn rand_letters<R: Rng>(rng: &mut R, len: usize) -> String {
    (0..len)
        .map(|_| ASCII_LETTERS[rng.gen_range(0..ASCII_LETTERS.len())] as char)
        .collect()
}

/// Fabricate a lead: a random email-looking address plus a channel/source
/// pair drawn from the fixed categorical distribution.
pub fn rand_lead<R: Rng>(rng: &mut R) -> NewLead {
    let local_len = rng.gen_range(4..=20);
    let domain_len = rng.gen_range(3..=5);
    let email = format!(
        "{}@{}.com",
        rand_letters(rng, local_len),
        rand_letters(rng, domain_len)
    );

    let (utm_medium, sources) = CHANNELS[rng.gen_range(0..CHANNELS.len())];
    let utm_source = sources[rng.gen_range(0..sources.len())];

    NewLead {
        email,
        utm_medium: utm_medium.to_string(),
        utm_source: utm_source.to_string(),
    }
}
