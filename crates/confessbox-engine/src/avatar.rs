use rand::Rng;

/// Decorative tokens shown next to comments. Not tied to who wrote them.
pub const AVATARS: &[&str] = &[
    "🗿", "👤", "👽", "🤖", "👻", "🦊", "🐼", "🐵", "🐥", "🦄", "😺", "😎", "🫥", "🪄", "🧋",
];

pub fn pick_avatar<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    AVATARS[rng.random_range(0..AVATARS.len())]
}
