use crate::vehicle::Identity;

const COLORS: [&str; 8] = [
    "blue", "red", "green", "purple", "orange", "cyan", "magenta", "yellow",
];

// Pick a colour based on slot
pub fn generate_color(slot: usize) -> &'static str {
    COLORS[slot % COLORS.len()]
}

// Rider identity for a slot: player1, player2, ...
// Later occupants of the same slot get a suffix: player1-2, player1-3, ...
pub fn identity_for_slot(slot: usize, admission: u32) -> Identity {
    let name = match admission {
        0 | 1 => format!("player{}", slot + 1),
        n => format!("player{}-{}", slot + 1, n),
    };
    Identity::new(name, generate_color(slot))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_color_wraps() {
        assert_eq!(generate_color(0), "blue");
        assert_eq!(generate_color(7), "yellow");
        assert_eq!(generate_color(8), "blue");
    }

    #[test]
    fn test_identity_for_slot() {
        let identity = identity_for_slot(2, 1);
        assert_eq!(identity.name, "player3");
        assert_eq!(identity.colour, "green");
    }

    #[test]
    fn test_reused_slot_gets_suffix() {
        let identity = identity_for_slot(0, 3);
        assert_eq!(identity.name, "player1-3");
        assert_eq!(identity.colour, "blue");
    }
}
