//! URL slugs derived from titles.

/// Lowercases, transliterates Turkish letters, and collapses every other
/// non-alphanumeric run into a single dash.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;

    for c in title.chars() {
        let mapped = match c.to_lowercase().next().unwrap_or(c) {
            'ç' => Some('c'),
            'ğ' => Some('g'),
            'ı' | 'i' => Some('i'),
            'ö' => Some('o'),
            'ş' => Some('s'),
            'ü' => Some('u'),
            c if c.is_ascii_alphanumeric() => Some(c),
            _ => None,
        };

        match mapped {
            Some(c) => {
                if pending_dash && !slug.is_empty() {
                    slug.push('-');
                }
                pending_dash = false;
                slug.push(c);
            }
            None => pending_dash = true,
        }
    }

    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic() {
        assert_eq!(slugify("Ceramic Vase"), "ceramic-vase");
    }

    #[test]
    fn test_turkish_transliteration() {
        assert_eq!(slugify("Şık Çay Takımı"), "sik-cay-takimi");
        assert_eq!(slugify("Yünlü Örtü"), "yunlu-ortu");
        assert_eq!(slugify("Işıklı Ağaç"), "isikli-agac");
    }

    #[test]
    fn test_collapses_punctuation_and_trims() {
        assert_eq!(slugify("  Hand-made -- Bowl!  "), "hand-made-bowl");
        assert_eq!(slugify("50% Off: Pillow Set"), "50-off-pillow-set");
    }
}
