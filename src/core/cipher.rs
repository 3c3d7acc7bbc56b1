//! Deterministic cipher that renders text in an unintelligible tongue.
//!
//! One-directional: there is no decoder, and applying the cipher twice
//! does not give back the input.

const DIGITS: [char; 10] = ['Q', 'M', 's', 't', 'h', 'n', 'p', 's', 'z', 'y'];

const IDEOGRAPHIC_ONSETS: [char; 12] = ['b', 'd', 'g', 'k', 'l', 'm', 'n', 'r', 's', 't', 'v', 'z'];
const IDEOGRAPHIC_NUCLEI: [char; 6] = ['a', 'e', 'i', 'o', 'u', 'y'];

const IDEOGRAPH_START: u32 = 0x4E00;
const IDEOGRAPH_END: u32 = 0x9FFF;

pub fn convert_to_dwarvish(text: &str) -> String {
    if text.chars().any(is_ideograph) {
        return transliterate_ideographs(text);
    }

    let mut out = String::with_capacity(text.len() + 4);
    for c in text.chars() {
        match c {
            'a' => out.push('o'),
            'o' => out.push('u'),
            'u' => out.push('i'),
            'i' => out.push('e'),
            'e' => out.push('a'),
            'A' => out.push('O'),
            'O' => out.push('U'),
            'U' => out.push('I'),
            'I' => out.push('E'),
            'E' => out.push('A'),
            'y' => out.push_str("ol"),
            'Y' => out.push_str("Ol"),
            'c' => out.push('k'),
            'C' => out.push('K'),
            'g' => out.push('l'),
            'G' => out.push('L'),
            'z' => out.push('b'),
            'Z' => out.push('B'),
            '0'..='9' => out.push(DIGITS[(c as u8 - b'0') as usize]),
            c if c.is_ascii_lowercase() => out.push(shift(c, b'a')),
            c if c.is_ascii_uppercase() => out.push(shift(c, b'A')),
            other => out.push(other),
        }
    }
    out.replace("nhu", "doo")
}

fn shift(c: char, base: u8) -> char {
    (((c as u8 - base + 2) % 26) + base) as char
}

fn is_ideograph(c: char) -> bool {
    (IDEOGRAPH_START..=IDEOGRAPH_END).contains(&(c as u32))
}

/// Each ideograph becomes an onset/nucleus syllable. Words are capitalized.
fn transliterate_ideographs(text: &str) -> String {
    let mut out = String::with_capacity(text.len() * 2);
    let mut at_word_start = true;
    for c in text.chars() {
        if is_ideograph(c) {
            let idx = (c as u32 - IDEOGRAPH_START) as usize;
            let onset = IDEOGRAPHIC_ONSETS[idx % IDEOGRAPHIC_ONSETS.len()];
            let nucleus = IDEOGRAPHIC_NUCLEI[(idx / IDEOGRAPHIC_ONSETS.len()) % IDEOGRAPHIC_NUCLEI.len()];
            if at_word_start {
                out.push(onset.to_ascii_uppercase());
            } else {
                out.push(onset);
            }
            out.push(nucleus);
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = c.is_whitespace();
        }
    }
    out
}
