pub const DEFAULT: &[&str] = &[
    "#FF0055", "#FF5500", "#FFCC00", "#33FF99", "#00FFFF", "#3366FF", "#9933FF", "#FF66CC",
];

pub const RAINBOW: &[&str] = &[
    "#ff0000", "#ff7f00", "#ffff00", "#7fff00", "#00ff7f", "#00ffff", "#007fff", "#8b00ff",
];

pub const FIRE: &[&str] = &[
    "#2b0000", "#5a0e00", "#7a1c00", "#c43a00", "#ff6a00", "#ffa300", "#ffd200",
];

pub const OCEAN: &[&str] = &[
    "#0077b6", "#0096c7", "#00b4d8", "#48cae4", "#90e0ef", "#ade8f4", "#caf0f8",
];

pub const MONO: &[&str] = &[
    "#666666", "#7a7a7a", "#8f8f8f", "#a5a5a5", "#bbbbbb", "#d2d2d2", "#e6e6e6", "#ffffff",
];

pub const SUNSET: &[&str] = &[
    "#120c3c", "#3d1e6d", "#6d2e85", "#a23e8f", "#d24f6b", "#ff7043", "#ff9e43", "#ffd166",
];

pub const FOREST: &[&str] = &[
    "#0b3d20", "#14532d", "#1f6f3b", "#2e8b57", "#3fae72", "#66c28d", "#93d5ae", "#c7e9c0",
];

pub const ICE: &[&str] = &[
    "#001219", "#004e64", "#0a9396", "#94d2bd", "#e9d8a6", "#ee9b00", "#ca6702", "#bb3e03",
];

pub const CYBERPUNK: &[&str] = &[
    "#0a0014", "#16002b", "#2a003d", "#ff007f", "#ff00ff", "#00f0ff", "#00ffa3", "#faff00",
];

pub const PASTEL: &[&str] = &[
    "#ffd6e8", "#ffe6f2", "#e2f0ff", "#d7fff1", "#fff6d6", "#ffe8cc", "#e6e6ff", "#f2ffe6",
];

pub const MATRIX: &[&str] = &[
    "#001a00", "#002600", "#003300", "#004d00", "#007a00", "#00a300", "#00d400", "#7aff7a",
];

/// Every named palette, in menu order.
pub const NAMED: &[(&str, &[&str])] = &[
    ("default", DEFAULT),
    ("rainbow", RAINBOW),
    ("fire", FIRE),
    ("ocean", OCEAN),
    ("mono", MONO),
    ("sunset", SUNSET),
    ("forest", FOREST),
    ("ice", ICE),
    ("cyberpunk", CYBERPUNK),
    ("pastel", PASTEL),
    ("matrix", MATRIX),
];

pub fn by_name(name: &str) -> Option<&'static [&'static str]> {
    NAMED
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name.trim()))
        .map(|(_, colors)| *colors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::parse_css_color;

    #[test]
    fn every_preset_parses() {
        for (name, colors) in NAMED {
            assert!(!colors.is_empty(), "{} is empty", name);
            for c in *colors {
                assert!(parse_css_color(c).is_some(), "{}: bad color {}", name, c);
            }
        }
    }

    #[test]
    fn lookup_is_case_insensitive() {
        assert_eq!(by_name("Fire"), Some(FIRE));
        assert_eq!(by_name("nope"), None);
    }
}
