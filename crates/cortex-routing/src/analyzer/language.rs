//! Indicator-based language detection.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Languages the detector distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    /// English, the fallback.
    English,
    /// German.
    German,
    /// French.
    French,
    /// Spanish.
    Spanish,
}

impl Language {
    /// ISO 639-1 code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::English => "en",
            Self::German => "de",
            Self::French => "fr",
            Self::Spanish => "es",
        }
    }

    /// English name, used in prompts.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::English => "English",
            Self::German => "German",
            Self::French => "French",
            Self::Spanish => "Spanish",
        }
    }
}

impl FromStr for Language {
    type Err = String;

    /// Parses an ISO 639-1 code.
    fn from_str(code: &str) -> Result<Self, Self::Err> {
        match code.trim().to_lowercase().as_str() {
            "en" => Ok(Self::English),
            "de" => Ok(Self::German),
            "fr" => Ok(Self::French),
            "es" => Ok(Self::Spanish),
            other => Err(format!("unsupported language code: {other}")),
        }
    }
}

impl Display for Language {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FmtResult {
        formatter.write_str(self.code())
    }
}

/// A language needs at least this many indicator hits to be chosen.
const MIN_MATCHES: usize = 2;

/// Indicator words and characters for one language.
///
/// `shared` words are also common English words; they only count once a
/// distinctive word or character has been seen.
struct Indicators {
    words: &'static [&'static str],
    shared: &'static [&'static str],
    chars: &'static [char],
}

const GERMAN: Indicators = Indicators {
    words: &[
        "der", "das", "und", "ist", "sind", "nicht", "ich", "sie", "wir", "für", "auf", "wie",
        "warum", "ein", "eine", "bitte", "kannst", "können", "mir", "zu", "dem",
    ],
    shared: &["die", "was", "mit", "den"],
    chars: &['ä', 'ö', 'ü', 'ß'],
};

const FRENCH: Indicators = Indicators {
    words: &[
        "le", "les", "est", "et", "une", "pour", "avec", "je", "vous", "nous", "que", "qui",
        "dans", "quel", "quelle", "pourquoi", "comment", "bonjour", "merci",
    ],
    shared: &["des", "pas", "sur"],
    chars: &['é', 'è', 'ê', 'à', 'ç', 'ù', 'œ', 'â', 'î'],
};

const SPANISH: Indicators = Indicators {
    words: &[
        "el", "los", "las", "por", "una", "que", "del", "qué", "cómo", "está", "pero", "puedes",
        "hola", "gracias", "dónde",
    ],
    shared: &["es", "para", "con", "son", "como"],
    chars: &['ñ', 'á', 'í', 'ó', 'ú', '¿', '¡'],
};

fn indicator_count(lowered: &str, indicators: &Indicators) -> usize {
    let tokens = || {
        lowered
            .split(|character: char| !character.is_alphanumeric())
            .filter(|token| !token.is_empty())
    };
    let distinctive = tokens()
        .filter(|token| indicators.words.contains(token))
        .count()
        + lowered
            .chars()
            .filter(|character| indicators.chars.contains(character))
            .count();
    if distinctive == 0 {
        return 0;
    }
    distinctive
        + tokens()
            .filter(|token| indicators.shared.contains(token))
            .count()
}

/// Detects the language of `text` by counting indicator words and diacritics.
///
/// German is compared first; French and then Spanish replace the current
/// choice only with a strictly higher count. Anything without at least two
/// hits for some language is English. Words that double as English words
/// never decide a language on their own.
#[must_use]
pub fn detect_language(text: &str) -> Language {
    let lowered = text.to_lowercase();
    let candidates = [
        (Language::German, indicator_count(&lowered, &GERMAN)),
        (Language::French, indicator_count(&lowered, &FRENCH)),
        (Language::Spanish, indicator_count(&lowered, &SPANISH)),
    ];

    let mut best: Option<(Language, usize)> = None;
    for (language, count) in candidates {
        if count < MIN_MATCHES {
            continue;
        }
        match best {
            Some((_, best_count)) if count <= best_count => {}
            _ => best = Some((language, count)),
        }
    }

    best.map_or(Language::English, |(language, _)| language)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_german() {
        assert_eq!(
            detect_language("Was sind die aktuellen Nachrichten?"),
            Language::German
        );
        assert_eq!(detect_language("Schreibe eine Geschichte über Bäume"), Language::German);
    }

    #[test]
    fn test_detects_french_and_spanish() {
        assert_eq!(
            detect_language("Pourquoi le ciel est bleu et pas vert ?"),
            Language::French
        );
        assert_eq!(
            detect_language("¿Cómo puedo aprender Rust para el trabajo?"),
            Language::Spanish
        );
    }

    #[test]
    fn test_plain_english() {
        assert_eq!(detect_language("Explain how a hash map works"), Language::English);
        assert_eq!(detect_language(""), Language::English);
    }

    #[test]
    fn test_single_indicator_is_not_enough() {
        assert_eq!(detect_language("Why did the dinosaurs die out"), Language::English);
        assert_eq!(detect_language("Wie many more"), Language::English);
    }

    #[test]
    fn test_english_words_shared_with_other_languages_stay_english() {
        let prompts = [
            "It was what it was",
            "I was told the die was cast",
            "Tell me what es means to me para",
            "Was it done with mit licensing",
            "My son was at the den",
            "Is it on sur des pas faux pas",
        ];
        for prompt in prompts {
            assert_eq!(detect_language(prompt), Language::English, "{prompt}");
        }
    }

    #[test]
    fn test_shared_words_count_after_a_distinctive_hit() {
        // "sind" is distinctive, "was" and "die" then add to it
        assert_eq!(detect_language("Was sind die Regeln"), Language::German);
        assert_eq!(detect_language("Es para el equipo"), Language::Spanish);
    }

    #[test]
    fn test_ascii_with_fewer_than_two_indicators_is_english() {
        let prompts = [
            "What is the capital of France",
            "list three sorting algorithms",
            "hola",
            "merci for the help",
            "the le thing",
        ];
        for prompt in prompts {
            assert_eq!(detect_language(prompt), Language::English, "{prompt}");
        }
    }

    #[test]
    fn test_tie_keeps_german() {
        // two German hits ("und", "ist") and two French hits ("est", "et")
        assert_eq!(detect_language("und ist est et"), Language::German);
    }
}
