use std::collections::{HashMap, HashSet};

use lazy_static::lazy_static;
use regex::Regex;

use crate::core::state::Language;


/// One attribute word with its canonical form in both languages and every
/// surface variant the matcher accepts.
pub struct AttributeEntry {
    pub id: &'static str,
    pub en: &'static str,
    pub variants: &'static [&'static str],
}

impl AttributeEntry {
    pub fn canonical(&self, language: Language) -> &'static str {
        match language {
            Language::Id => self.id,
            Language::En => self.en,
        }
    }
}


/// Kind of attribute a lexicon term belongs to. Order of the variants is
/// the fixed append order used when rebuilding a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeKind {
    Category,
    Color,
    Material,
    Price,
}


pub static COLORS: &[AttributeEntry] = &[
    AttributeEntry { id: "putih", en: "white", variants: &["putih", "white"] },
    AttributeEntry { id: "hitam", en: "black", variants: &["hitam", "black"] },
    AttributeEntry { id: "merah", en: "red", variants: &["merah", "red"] },
    AttributeEntry { id: "biru", en: "blue", variants: &["biru", "blue"] },
    AttributeEntry { id: "hijau", en: "green", variants: &["hijau", "green"] },
    AttributeEntry { id: "kuning", en: "yellow", variants: &["kuning", "yellow"] },
    AttributeEntry { id: "coklat", en: "brown", variants: &["coklat", "cokelat", "brown"] },
    AttributeEntry { id: "abu-abu", en: "gray", variants: &["abu-abu", "abu", "gray", "grey"] },
    AttributeEntry { id: "krem", en: "cream", variants: &["krem", "cream", "beige"] },
    AttributeEntry { id: "emas", en: "gold", variants: &["emas", "gold", "golden"] },
    AttributeEntry { id: "perak", en: "silver", variants: &["perak", "silver"] },
    AttributeEntry { id: "ungu", en: "purple", variants: &["ungu", "purple"] },
    AttributeEntry { id: "merah muda", en: "pink", variants: &["merah muda", "pink"] },
];

pub static MATERIALS: &[AttributeEntry] = &[
    AttributeEntry { id: "kayu", en: "wood", variants: &["kayu", "wood", "wooden"] },
    AttributeEntry { id: "jati", en: "teak", variants: &["jati", "teak"] },
    AttributeEntry { id: "mahoni", en: "mahogany", variants: &["mahoni", "mahogany"] },
    AttributeEntry { id: "besi", en: "iron", variants: &["besi", "iron"] },
    AttributeEntry { id: "baja", en: "steel", variants: &["baja", "steel"] },
    AttributeEntry { id: "logam", en: "metal", variants: &["logam", "metal"] },
    AttributeEntry { id: "aluminium", en: "aluminum", variants: &["aluminium", "aluminum"] },
    AttributeEntry { id: "kain", en: "fabric", variants: &["kain", "fabric", "cloth"] },
    AttributeEntry { id: "kulit", en: "leather", variants: &["kulit", "leather"] },
    AttributeEntry { id: "rotan", en: "rattan", variants: &["rotan", "rattan"] },
    AttributeEntry { id: "kaca", en: "glass", variants: &["kaca", "glass"] },
    AttributeEntry { id: "plastik", en: "plastic", variants: &["plastik", "plastic"] },
    AttributeEntry { id: "marmer", en: "marble", variants: &["marmer", "marble"] },
    AttributeEntry { id: "beludru", en: "velvet", variants: &["beludru", "velvet"] },
    AttributeEntry { id: "bambu", en: "bamboo", variants: &["bambu", "bamboo"] },
];

/// Furniture category terms, both languages mixed. Multi-word terms come
/// first so the most specific match wins.
pub static CATEGORIES: &[&str] = &[
    "tempat tidur",
    "meja makan",
    "meja kerja",
    "meja rias",
    "kursi makan",
    "kursi kantor",
    "dining table",
    "coffee table",
    "bunk bed",
    "bedside table",
    "office chair",
    "bean bag",
    "sofa",
    "couch",
    "kursi",
    "chair",
    "armchair",
    "recliner",
    "meja",
    "table",
    "desk",
    "lemari",
    "wardrobe",
    "cabinet",
    "cupboard",
    "rak",
    "shelf",
    "bookshelf",
    "bookcase",
    "kasur",
    "mattress",
    "bed",
    "ranjang",
    "nakas",
    "nightstand",
    "dresser",
    "bangku",
    "bench",
    "stool",
    "ottoman",
    "cermin",
    "mirror",
    "karpet",
    "rug",
    "carpet",
    "gorden",
    "curtain",
    "buffet",
    "sideboard",
];

/// Price descriptors. Kept as matched; they never canonicalize across
/// languages because they are qualitative, not values.
pub static PRICE_TERMS: &[&str] = &[
    "murah",
    "mahal",
    "terjangkau",
    "hemat",
    "ekonomis",
    "mewah",
    "cheap",
    "inexpensive",
    "affordable",
    "budget",
    "expensive",
    "premium",
    "luxury",
    "luxurious",
];

/// Words ignored when judging whether a message is "just an attribute".
pub static FILLER_WORDS: &[&str] = &[
    "yang", "mau", "saya", "aku", "ada", "dong", "deh", "nih", "kak", "min",
    "tolong", "itu", "ini", "aja", "saja", "warna", "warnanya", "bahan",
    "bahannya", "dengan", "untuk", "yg", "gak", "nggak",
    "the", "a", "an", "i", "im", "want", "would", "like", "some", "please",
    "me", "in", "with", "color", "colour", "colored", "one", "that", "for",
    "of", "is", "it", "do", "you", "have",
];

/// Explicit new-search trigger terms and phrases.
pub static NEW_SEARCH_TRIGGERS: &[&str] = &[
    "cari", "carikan", "cariin", "mencari", "mau beli", "beli",
    "tunjukkan", "lihatkan",
    "find", "search for", "show me", "looking for", "need a",
];

/// Lead-in phrases stripped from the front of a query. Longest first so a
/// longer phrase is never shadowed by its own prefix.
pub static LEAD_IN_PHRASES: &[&str] = &[
    "saya lagi cari", "saya mau cari", "saya mau beli", "saya ingin",
    "saya cari", "saya mau", "aku mau", "aku ingin", "lagi cari",
    "mau cari", "mau beli", "carikan", "cariin", "mencari", "cari",
    "tolong", "coba", "mau", "apakah ada", "ada", "punya",
    "do you have",
    "i am looking for", "i'm looking for", "im looking for", "looking for",
    "i want to buy", "i would like", "i'd like", "i want", "i need",
    "show me", "find me", "find", "please",
    "yang warna", "warna", "yang",
];

pub static GREETING_PREFIXES: &[&str] = &[
    "halo", "hallo", "hai", "hi", "hello", "hey",
    "selamat pagi", "selamat siang", "selamat sore", "selamat malam",
    "good morning", "good afternoon", "good evening",
    "assalamualaikum",
];

pub static HELP_PREFIXES: &[&str] = &[
    "help", "bantuan", "bantu", "bisa bantu", "tolong bantu",
    "how do i", "how does", "apa yang bisa", "bisa apa", "menu",
];

pub static RESET_KEYWORDS: &[&str] = &[
    "reset", "restart", "mulai ulang", "start over", "ulang dari awal",
];

pub static FILTER_CLEAR_PHRASES: &[&str] = &[
    "hapus filter", "hapus semua filter", "clear filter", "clear filters",
    "reset filter", "reset filters", "tanpa filter", "remove filter",
    "remove filters",
];

pub static FAQ_LOCATION_KEYWORDS: &[&str] = &[
    "dimana", "di mana", "alamat", "lokasi", "where", "location", "address",
];

pub static FAQ_HOURS_KEYWORDS: &[&str] = &[
    "jam buka", "jam operasional", "jam tutup", "opening hours", "open",
    "close", "what time", "buka sampai",
];

pub static FAQ_PAYMENT_KEYWORDS: &[&str] = &[
    "pembayaran", "bayar", "cicilan", "payment", "pay", "installment",
];

pub static FAQ_DELIVERY_KEYWORDS: &[&str] = &[
    "pengiriman", "ongkir", "dikirim", "delivery", "shipping", "deliver",
];

/// Tokens that mark a message as Indonesian. Any hit wins; the default is
/// English.
pub static INDONESIAN_INDICATORS: &[&str] = &[
    "saya", "aku", "mau", "yang", "ada", "tidak", "nggak", "gak", "bisa",
    "tolong", "berapa", "harga", "murah", "mahal", "warna", "bahan",
    "kayu", "jati", "rotan", "kursi", "meja", "lemari", "kasur", "ranjang",
    "putih", "hitam", "merah", "biru", "hijau", "coklat", "cari", "beli",
    "dong", "kak", "pakai", "dengan", "untuk", "dan", "atau", "itu", "ini",
    "gimana", "dimana", "alamat", "jam", "buka", "selamat", "terima",
    "kasih", "iya", "boleh", "bagus", "cocok", "halo", "hai",
];

lazy_static! {
    static ref AFFIRMATIVE_RE: Regex = Regex::new(
        r"(?i)^\s*(iya|ya|yes|yup|yep|ok|oke|okay|boleh|sip|siap|sure|baik|betul|bener|mau|yoi)\s*[.!?]*\s*$"
    )
    .expect("affirmative regex is valid");

    static ref FILLER_SET: HashSet<&'static str> = FILLER_WORDS.iter().copied().collect();

    static ref INDONESIAN_SET: HashSet<&'static str> =
        INDONESIAN_INDICATORS.iter().copied().collect();

    /// Every color variant mapped back to its entry.
    static ref COLOR_INDEX: HashMap<&'static str, &'static AttributeEntry> = {
        let mut m = HashMap::new();
        for entry in COLORS {
            for variant in entry.variants {
                m.insert(*variant, entry);
            }
        }
        m
    };

    static ref MATERIAL_INDEX: HashMap<&'static str, &'static AttributeEntry> = {
        let mut m = HashMap::new();
        for entry in MATERIALS {
            for variant in entry.variants {
                m.insert(*variant, entry);
            }
        }
        m
    };
}


/// Lowercase and strip punctuation, padding with single spaces so that
/// ` term ` containment is a word-boundary match. Hyphens survive because
/// of "abu-abu"; apostrophes survive for "i'd" / "i'm".
pub fn normalize(text: &str) -> String {
    let lowered = text.to_lowercase();
    let mut out = String::with_capacity(lowered.len() + 2);
    out.push(' ');
    let mut last_space = true;
    for ch in lowered.chars() {
        if ch.is_alphanumeric() || ch == '-' || ch == '\'' {
            out.push(ch);
            last_space = false;
        } else if !last_space {
            out.push(' ');
            last_space = true;
        }
    }
    if !last_space {
        out.push(' ');
    }
    out
}

/// Word-boundary containment check over normalized text.
pub fn has_term(text: &str, term: &str) -> bool {
    normalize(text).contains(&format!(" {term} "))
}

fn starts_with_any(text: &str, prefixes: &[&str]) -> bool {
    let normalized = normalize(text);
    let trimmed = normalized.trim_start();
    prefixes.iter().any(|p| {
        trimmed.starts_with(p)
            && trimmed[p.len()..].chars().next().map_or(true, |c| c == ' ')
    })
}

fn contains_any(text: &str, terms: &[&str]) -> bool {
    let normalized = normalize(text);
    terms.iter().any(|t| normalized.contains(&format!(" {t} ")))
}


pub fn find_category(text: &str) -> Option<&'static str> {
    let normalized = normalize(text);
    CATEGORIES
        .iter()
        .find(|term| normalized.contains(&format!(" {term} ")))
        .copied()
}

pub fn find_color(text: &str) -> Option<&'static AttributeEntry> {
    let normalized = normalize(text);
    COLORS
        .iter()
        .find(|entry| {
            entry
                .variants
                .iter()
                .any(|v| normalized.contains(&format!(" {v} ")))
        })
}

pub fn find_material(text: &str) -> Option<&'static AttributeEntry> {
    let normalized = normalize(text);
    MATERIALS
        .iter()
        .find(|entry| {
            entry
                .variants
                .iter()
                .any(|v| normalized.contains(&format!(" {v} ")))
        })
}

pub fn find_price_term(text: &str) -> Option<&'static str> {
    let normalized = normalize(text);
    PRICE_TERMS
        .iter()
        .find(|term| normalized.contains(&format!(" {term} ")))
        .copied()
}

/// Canonical form of a color term in the requested language, if the term
/// is a known color variant.
pub fn canonical_color(term: &str, language: Language) -> Option<&'static str> {
    COLOR_INDEX
        .get(normalize(term).trim())
        .map(|entry| entry.canonical(language))
}

pub fn canonical_material(term: &str, language: Language) -> Option<&'static str> {
    MATERIAL_INDEX
        .get(normalize(term).trim())
        .map(|entry| entry.canonical(language))
}


/// Count of words that are not filler. The attribute terms themselves do
/// count, so "yang warna putih" has one meaningful word.
pub fn meaningful_word_count(text: &str) -> usize {
    normalize(text)
        .split_whitespace()
        .filter(|w| !FILLER_SET.contains(w))
        .count()
}

/// Strip lead-in phrases from the front, repeatedly, so "tolong cariin
/// sofa" reduces to "sofa".
pub fn strip_lead_in(text: &str) -> String {
    let mut current = normalize(text).trim().to_string();
    loop {
        let mut stripped = false;
        for phrase in LEAD_IN_PHRASES {
            if current == *phrase {
                current.clear();
                stripped = true;
                break;
            }
            if let Some(rest) = current.strip_prefix(&format!("{phrase} ")) {
                current = rest.trim_start().to_string();
                stripped = true;
                break;
            }
        }
        if !stripped || current.is_empty() {
            break;
        }
    }
    current
}

/// Remove every variant of the given attribute kinds from the text.
/// Used to clear stale attributes out of a base query before appending
/// the replacements detected this turn.
pub fn strip_attribute_terms(text: &str, kinds: &[AttributeKind]) -> String {
    let mut padded = normalize(text);
    for kind in kinds {
        match kind {
            AttributeKind::Color => {
                for entry in COLORS {
                    for variant in entry.variants {
                        remove_term(&mut padded, variant);
                    }
                }
            }
            AttributeKind::Material => {
                for entry in MATERIALS {
                    for variant in entry.variants {
                        remove_term(&mut padded, variant);
                    }
                }
            }
            AttributeKind::Price => {
                for term in PRICE_TERMS {
                    remove_term(&mut padded, term);
                }
            }
            AttributeKind::Category => {
                for term in CATEGORIES {
                    remove_term(&mut padded, term);
                }
            }
        }
    }
    padded.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn remove_term(padded: &mut String, term: &str) {
    let needle = format!(" {term} ");
    while padded.contains(&needle) {
        *padded = padded.replace(&needle, " ");
    }
}


pub fn is_affirmative(text: &str) -> bool {
    AFFIRMATIVE_RE.is_match(text)
}

pub fn has_new_search_trigger(text: &str) -> bool {
    contains_any(text, NEW_SEARCH_TRIGGERS)
}

pub fn is_greeting(text: &str) -> bool {
    starts_with_any(text, GREETING_PREFIXES)
}

pub fn is_help_request(text: &str) -> bool {
    starts_with_any(text, HELP_PREFIXES)
}

pub fn is_filter_clear(text: &str) -> bool {
    contains_any(text, FILTER_CLEAR_PHRASES)
}

pub fn is_reset(text: &str) -> bool {
    contains_any(text, RESET_KEYWORDS)
}

/// FAQ sub-topic, if the message looks like a store question.
pub fn find_faq_topic(text: &str) -> Option<&'static str> {
    if contains_any(text, FAQ_HOURS_KEYWORDS) {
        Some("hours")
    } else if contains_any(text, FAQ_LOCATION_KEYWORDS) {
        Some("location")
    } else if contains_any(text, FAQ_PAYMENT_KEYWORDS) {
        Some("payment")
    } else if contains_any(text, FAQ_DELIVERY_KEYWORDS) {
        Some("delivery")
    } else {
        None
    }
}

pub fn detect_language(text: &str) -> Language {
    let normalized = normalize(text);
    let is_indonesian = normalized
        .split_whitespace()
        .any(|w| INDONESIAN_SET.contains(w));
    if is_indonesian {
        Language::Id
    } else {
        Language::En
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_category_word_boundary() {
        assert_eq!(find_category("ada meja kayu"), Some("meja"));
        assert_eq!(find_category("sofa putih"), Some("sofa"));
        // "bed" must not match inside "bedside" without the full phrase
        assert_eq!(find_category("bedside table"), Some("bedside table"));
        assert_eq!(find_category("warna putih"), None);
    }

    #[test]
    fn test_find_color_both_languages() {
        assert_eq!(find_color("yang putih dong").unwrap().en, "white");
        assert_eq!(find_color("white one please").unwrap().id, "putih");
        assert_eq!(find_color("abu-abu").unwrap().en, "gray");
        assert!(find_color("kayu jati").is_none());
    }

    #[test]
    fn test_canonical_color_directions() {
        assert_eq!(canonical_color("white", Language::Id), Some("putih"));
        assert_eq!(canonical_color("putih", Language::En), Some("white"));
        assert_eq!(canonical_color("grey", Language::Id), Some("abu-abu"));
        assert_eq!(canonical_color("sofa", Language::Id), None);
    }

    #[test]
    fn test_canonical_material() {
        assert_eq!(canonical_material("wooden", Language::Id), Some("kayu"));
        assert_eq!(canonical_material("jati", Language::En), Some("teak"));
    }

    #[test]
    fn test_meaningful_word_count_strips_filler() {
        assert_eq!(meaningful_word_count("putih"), 1);
        assert_eq!(meaningful_word_count("yang warna putih dong"), 1);
        assert_eq!(meaningful_word_count("saya mau sofa kulit coklat"), 3);
        assert_eq!(meaningful_word_count("yang mau saya"), 0);
    }

    #[test]
    fn test_strip_lead_in() {
        assert_eq!(strip_lead_in("saya mau cari sofa putih"), "sofa putih");
        assert_eq!(strip_lead_in("I'm looking for a wooden table"), "a wooden table");
        assert_eq!(strip_lead_in("tolong carikan meja makan"), "meja makan");
        assert_eq!(strip_lead_in("sofa"), "sofa");
    }

    #[test]
    fn test_strip_attribute_terms_per_kind() {
        assert_eq!(
            strip_attribute_terms("sofa putih", &[AttributeKind::Color]),
            "sofa"
        );
        // material untouched when only color is being replaced
        assert_eq!(
            strip_attribute_terms("sofa putih kayu", &[AttributeKind::Color]),
            "sofa kayu"
        );
        assert_eq!(
            strip_attribute_terms("meja kayu murah", &[AttributeKind::Material, AttributeKind::Price]),
            "meja"
        );
    }

    #[test]
    fn test_affirmative_tokens() {
        for msg in ["iya", "Ya!", "ok", "Oke", "boleh", "yes", "sip"] {
            assert!(is_affirmative(msg), "{msg} should be affirmative");
        }
        assert!(!is_affirmative("iya tapi yang murah"));
        assert!(!is_affirmative("sofa"));
    }

    #[test]
    fn test_triggers_and_phrases() {
        assert!(has_new_search_trigger("cari meja makan"));
        assert!(has_new_search_trigger("show me some chairs"));
        assert!(!has_new_search_trigger("yang warna putih"));
        assert!(is_greeting("Halo kak"));
        assert!(is_greeting("selamat pagi"));
        assert!(!is_greeting("sofa halo"));
        assert!(is_filter_clear("hapus filter dong"));
        assert!(is_reset("mulai ulang"));
        // "reset filter" is a filter clear, checked before reset
        assert!(is_filter_clear("reset filter"));
    }

    #[test]
    fn test_detect_language() {
        assert_eq!(detect_language("saya mau sofa"), Language::Id);
        assert_eq!(detect_language("show me leather couches"), Language::En);
        assert_eq!(detect_language("yang murah"), Language::Id);
    }

    #[test]
    fn test_faq_topics() {
        assert_eq!(find_faq_topic("dimana alamat toko?"), Some("location"));
        assert_eq!(find_faq_topic("jam buka sampai kapan"), Some("hours"));
        assert_eq!(find_faq_topic("bisa bayar cicilan?"), Some("payment"));
        assert_eq!(find_faq_topic("sofa murah"), None);
    }
}
