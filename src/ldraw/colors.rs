//! LDraw color codes.
//!
//! The subset of the standard LDraw color table that the code-generation
//! prompt advertises. Generated code refers to these by name through the
//! `Colors` object the sandbox exposes.

pub const BLACK: u32 = 0;
pub const BLUE: u32 = 1;
pub const GREEN: u32 = 2;
pub const DARK_TURQUOISE: u32 = 3;
pub const RED: u32 = 4;
pub const DARK_PINK: u32 = 5;
pub const BROWN: u32 = 6;
pub const LIGHT_GRAY: u32 = 7;
pub const DARK_GRAY: u32 = 8;
pub const LIGHT_BLUE: u32 = 9;
pub const BRIGHT_GREEN: u32 = 10;
pub const LIGHT_TURQUOISE: u32 = 11;
pub const SALMON: u32 = 12;
pub const PINK: u32 = 13;
pub const YELLOW: u32 = 14;
pub const WHITE: u32 = 15;
pub const MAIN_COLOR: u32 = 16;
pub const LIGHT_GREEN: u32 = 17;
pub const LIGHT_YELLOW: u32 = 18;
pub const TAN: u32 = 19;
pub const LIGHT_VIOLET: u32 = 20;
pub const TRANS_RED: u32 = 36;
pub const TRANS_LIGHT_BLUE: u32 = 43;
pub const TRANS_CLEAR: u32 = 47;

/// Every named color, in declaration order. The sandbox iterates this to
/// build the `Colors` object visible to generated code.
pub const ALL: &[(&str, u32)] = &[
    ("BLACK", BLACK),
    ("BLUE", BLUE),
    ("GREEN", GREEN),
    ("DARK_TURQUOISE", DARK_TURQUOISE),
    ("RED", RED),
    ("DARK_PINK", DARK_PINK),
    ("BROWN", BROWN),
    ("LIGHT_GRAY", LIGHT_GRAY),
    ("DARK_GRAY", DARK_GRAY),
    ("LIGHT_BLUE", LIGHT_BLUE),
    ("BRIGHT_GREEN", BRIGHT_GREEN),
    ("LIGHT_TURQUOISE", LIGHT_TURQUOISE),
    ("SALMON", SALMON),
    ("PINK", PINK),
    ("YELLOW", YELLOW),
    ("WHITE", WHITE),
    ("MAIN_COLOR", MAIN_COLOR),
    ("LIGHT_GREEN", LIGHT_GREEN),
    ("LIGHT_YELLOW", LIGHT_YELLOW),
    ("TAN", TAN),
    ("LIGHT_VIOLET", LIGHT_VIOLET),
    ("TRANS_RED", TRANS_RED),
    ("TRANS_LIGHT_BLUE", TRANS_LIGHT_BLUE),
    ("TRANS_CLEAR", TRANS_CLEAR),
];

/// Looks up a color code by its constant name.
pub fn by_name(name: &str) -> Option<u32> {
    ALL.iter()
        .find(|(n, _)| *n == name)
        .map(|(_, code)| *code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_by_name_known() {
        assert_eq!(by_name("RED"), Some(4));
        assert_eq!(by_name("BLACK"), Some(0));
        assert_eq!(by_name("TRANS_CLEAR"), Some(47));
    }

    #[test]
    fn test_by_name_unknown() {
        assert_eq!(by_name("CHARTREUSE"), None);
        assert_eq!(by_name("red"), None);
    }

    #[test]
    fn test_no_duplicate_names() {
        for (i, (name, _)) in ALL.iter().enumerate() {
            assert!(
                !ALL[i + 1..].iter().any(|(n, _)| n == name),
                "duplicate color name {name}"
            );
        }
    }
}
