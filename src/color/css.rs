//! Just enough CSS color syntax for palette strings.

use super::Rgb;

/// Parse a CSS color string. Alpha components are accepted and dropped.
pub fn parse_css_color(input: &str) -> Option<Rgb> {
    let s = input.trim().to_ascii_lowercase();
    if let Some(hex) = s.strip_prefix('#') {
        return parse_hex(hex);
    }
    if let Some((name, args)) = split_function(&s) {
        return match name {
            "rgb" | "rgba" => parse_rgb_args(&args),
            "hsl" | "hsla" => parse_hsl_args(&args),
            _ => None,
        };
    }
    named_color(&s)
}

fn parse_hex(hex: &str) -> Option<Rgb> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let nibble = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|v| v * 17);
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    match hex.len() {
        3 | 4 => Some(Rgb::new(nibble(0)?, nibble(1)?, nibble(2)?)),
        6 | 8 => Some(Rgb::new(byte(0)?, byte(2)?, byte(4)?)),
        _ => None,
    }
}

/// `name(a, b, c)` → (`name`, [`a`, `b`, `c`]). Accepts comma or
/// whitespace separators and a `/ alpha` tail.
fn split_function(s: &str) -> Option<(&str, Vec<&str>)> {
    let open = s.find('(')?;
    let inner = s[open + 1..].strip_suffix(')')?;
    let args = inner
        .split(|c: char| c == ',' || c == '/' || c.is_whitespace())
        .filter(|a| !a.is_empty())
        .collect();
    Some((s[..open].trim(), args))
}

fn parse_channel(arg: &str) -> Option<u8> {
    let value = if let Some(pct) = arg.strip_suffix('%') {
        pct.parse::<f32>().ok()? * 2.55
    } else {
        arg.parse::<f32>().ok()?
    };
    if !value.is_finite() {
        return None;
    }
    Some(value.round().clamp(0.0, 255.0) as u8)
}

fn parse_rgb_args(args: &[&str]) -> Option<Rgb> {
    if !(3..=4).contains(&args.len()) {
        return None;
    }
    Some(Rgb::new(
        parse_channel(args[0])?,
        parse_channel(args[1])?,
        parse_channel(args[2])?,
    ))
}

fn parse_hsl_args(args: &[&str]) -> Option<Rgb> {
    if !(3..=4).contains(&args.len()) {
        return None;
    }
    let h = args[0].trim_end_matches("deg").parse::<f32>().ok()?;
    let s = args[1].strip_suffix('%')?.parse::<f32>().ok()? / 100.0;
    let l = args[2].strip_suffix('%')?.parse::<f32>().ok()? / 100.0;
    if !(h.is_finite() && s.is_finite() && l.is_finite()) {
        return None;
    }
    Some(hsl_to_rgb(h, s.clamp(0.0, 1.0), l.clamp(0.0, 1.0)))
}

pub fn hsl_to_rgb(h: f32, s: f32, l: f32) -> Rgb {
    let h = h.rem_euclid(360.0);
    let a = s * l.min(1.0 - l);
    let f = |n: f32| {
        let k = (n + h / 30.0) % 12.0;
        let c = l - a * (k - 3.0).min(9.0 - k).clamp(-1.0, 1.0);
        (c * 255.0).round().clamp(0.0, 255.0) as u8
    };
    Rgb::new(f(0.0), f(8.0), f(4.0))
}

fn named_color(name: &str) -> Option<Rgb> {
    let rgb = match name {
        "black" => Rgb::new(0, 0, 0),
        "white" => Rgb::new(255, 255, 255),
        "red" => Rgb::new(255, 0, 0),
        "lime" => Rgb::new(0, 255, 0),
        "green" => Rgb::new(0, 128, 0),
        "blue" => Rgb::new(0, 0, 255),
        "yellow" => Rgb::new(255, 255, 0),
        "cyan" | "aqua" => Rgb::new(0, 255, 255),
        "magenta" | "fuchsia" => Rgb::new(255, 0, 255),
        "orange" => Rgb::new(255, 165, 0),
        "purple" => Rgb::new(128, 0, 128),
        "pink" => Rgb::new(255, 192, 203),
        "gray" | "grey" => Rgb::new(128, 128, 128),
        "silver" => Rgb::new(192, 192, 192),
        "maroon" => Rgb::new(128, 0, 0),
        "navy" => Rgb::new(0, 0, 128),
        "teal" => Rgb::new(0, 128, 128),
        "olive" => Rgb::new(128, 128, 0),
        "gold" => Rgb::new(255, 215, 0),
        "indigo" => Rgb::new(75, 0, 130),
        "violet" => Rgb::new(238, 130, 238),
        "crimson" => Rgb::new(220, 20, 60),
        "coral" => Rgb::new(255, 127, 80),
        "turquoise" => Rgb::new(64, 224, 208),
        _ => return None,
    };
    Some(rgb)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_forms() {
        assert_eq!(parse_css_color("#FF0055"), Some(Rgb::new(255, 0, 85)));
        assert_eq!(parse_css_color("#f05"), Some(Rgb::new(255, 0, 85)));
        assert_eq!(parse_css_color("#ff005580"), Some(Rgb::new(255, 0, 85)));
        assert_eq!(parse_css_color("  #ABCDEF "), Some(Rgb::new(0xab, 0xcd, 0xef)));
    }

    #[test]
    fn parses_functions() {
        assert_eq!(parse_css_color("rgb(10, 20, 30)"), Some(Rgb::new(10, 20, 30)));
        assert_eq!(parse_css_color("rgba(10,20,30,0.5)"), Some(Rgb::new(10, 20, 30)));
        assert_eq!(parse_css_color("rgb(100% 0% 50%)"), Some(Rgb::new(255, 0, 128)));
        assert_eq!(parse_css_color("hsl(0, 100%, 50%)"), Some(Rgb::new(255, 0, 0)));
        assert_eq!(parse_css_color("hsl(120deg 100% 25%)"), Some(Rgb::new(0, 128, 0)));
    }

    #[test]
    fn parses_names() {
        assert_eq!(parse_css_color("White"), Some(Rgb::new(255, 255, 255)));
        assert_eq!(parse_css_color("teal"), Some(Rgb::new(0, 128, 128)));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_css_color(""), None);
        assert_eq!(parse_css_color("#12"), None);
        assert_eq!(parse_css_color("#zzzzzz"), None);
        assert_eq!(parse_css_color("rgb(1,2)"), None);
        assert_eq!(parse_css_color("notacolor"), None);
        assert_eq!(parse_css_color("hsl(10, 20, 30)"), None);
    }
}
