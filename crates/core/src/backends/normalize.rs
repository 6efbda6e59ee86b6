use crate::backends::ScriptNormalizer;
use crate::error::Result;

/// No-op normalization.
pub struct IdentityNormalizer;

impl ScriptNormalizer for IdentityNormalizer {
    fn normalize(&self, text: &str) -> Result<String> {
        Ok(text.to_string())
    }
}

/// Character-variant canonicalization for speech-to-text output: folds
/// full-width ASCII forms to half-width, maps the ideographic space and
/// common CJK punctuation variants, and collapses runs of spaces.
pub struct WidthNormalizer;

impl ScriptNormalizer for WidthNormalizer {
    fn normalize(&self, text: &str) -> Result<String> {
        let mut out = String::with_capacity(text.len());
        let mut last_was_space = false;
        for c in text.chars() {
            let mapped = fold_char(c);
            if mapped == ' ' {
                if last_was_space {
                    continue;
                }
                last_was_space = true;
            } else {
                last_was_space = false;
            }
            out.push(mapped);
        }
        Ok(out)
    }
}

fn fold_char(c: char) -> char {
    match c {
        // Fullwidth ASCII block maps straight onto ASCII.
        '\u{FF01}'..='\u{FF5E}' => {
            char::from_u32(c as u32 - 0xFEE0).unwrap_or(c)
        }
        '\u{3000}' => ' ',
        '\u{2018}' | '\u{2019}' => '\'',
        '\u{201C}' | '\u{201D}' => '"',
        _ => c,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_passes_through() {
        let text = "ｈｅｌｌｏ　ｗｏｒｌｄ";
        assert_eq!(IdentityNormalizer.normalize(text).unwrap(), text);
    }

    #[test]
    fn folds_fullwidth_ascii() {
        assert_eq!(
            WidthNormalizer.normalize("ｈｅｌｌｏ，ｗｏｒｌｄ！").unwrap(),
            "hello,world!"
        );
    }

    #[test]
    fn collapses_ideographic_spaces() {
        assert_eq!(WidthNormalizer.normalize("你好　　世界").unwrap(), "你好 世界");
    }

    #[test]
    fn maps_curly_quotes() {
        assert_eq!(WidthNormalizer.normalize("“quoted” ‘word’").unwrap(), "\"quoted\" 'word'");
    }

    #[test]
    fn cjk_text_is_otherwise_untouched() {
        assert_eq!(WidthNormalizer.normalize("这是一段话。").unwrap(), "这是一段话。");
    }
}
