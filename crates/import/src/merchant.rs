//! Raw statement description → short merchant name (at most two words).

use crate::util::{is_phone_like, is_upper, title_case, truncate_chars, PROCESSOR_PREFIXES};

/// A known merchant. Matches when, for every group in `all_of`, the
/// lower-cased description contains at least one of the group's needles.
#[derive(Debug, Clone, Copy)]
pub struct KnownMerchant {
    pub name: &'static str,
    pub all_of: &'static [&'static [&'static str]],
}

impl KnownMerchant {
    const fn new(name: &'static str, all_of: &'static [&'static [&'static str]]) -> Self {
        Self { name, all_of }
    }

    pub fn matches(&self, lowered: &str) -> bool {
        self.all_of
            .iter()
            .all(|any_of| any_of.iter().any(|needle| lowered.contains(needle)))
    }
}

/// Checked top to bottom; earlier entries shadow later ones, so narrower
/// rules come first.
pub const KNOWN_MERCHANTS: &[KnownMerchant] = &[
    KnownMerchant::new("TESLA Charging", &[&["tesla"], &["supercharger", "charge"]]),
    KnownMerchant::new("Blink Charging", &[&["blink charging", "blink"]]),
    KnownMerchant::new("AMAZON", &[&["amazon"]]),
    KnownMerchant::new("STARBUCKS", &[&["starbucks"]]),
    KnownMerchant::new("DELTA Airlines", &[&["delta"], &["air"]]),
    KnownMerchant::new("UBER", &[&["uber"]]),
    KnownMerchant::new("LYFT", &[&["lyft"]]),
    KnownMerchant::new("SAFEWAY", &[&["safeway"]]),
    KnownMerchant::new("QFC", &[&["qfc"]]),
    KnownMerchant::new("AT&T", &[&["at&t"]]),
    KnownMerchant::new("T&T Supermarket", &[&["t&t"], &["supermarket"]]),
    KnownMerchant::new("Puget Sound", &[&["puget sound energy"]]),
    KnownMerchant::new("Progressive Insurance", &[&["progressive"], &["insurance"]]),
    KnownMerchant::new("REI", &[&["rei"], &["rei ", "rei.com"]]),
    KnownMerchant::new("Best Buy", &[&["best buy"]]),
    KnownMerchant::new("Target", &[&["target"]]),
    KnownMerchant::new("Home Depot", &[&["home depot"]]),
    KnownMerchant::new("IKEA", &[&["ikea"]]),
    KnownMerchant::new("USCIS", &[&["uscis"]]),
    KnownMerchant::new("US Treasury", &[&["us treas"], &["tax", "pymt"]]),
    KnownMerchant::new("Payment", &[&["autopay", "payment"]]),
    KnownMerchant::new("WALGREENS", &[&["walgreens"]]),
    KnownMerchant::new("CVS", &[&["cvs"]]),
    KnownMerchant::new("SHELL", &[&["shell"]]),
    KnownMerchant::new("CHEVRON", &[&["chevron"]]),
    KnownMerchant::new("ARCO", &[&["arco"]]),
    KnownMerchant::new("McDonalds", &[&["mcdonald"]]),
    KnownMerchant::new("SUBWAY", &[&["subway"]]),
    KnownMerchant::new("Trader Joes", &[&["trader joe"]]),
    KnownMerchant::new("Whole Foods", &[&["whole foods"]]),
    KnownMerchant::new("WALMART", &[&["walmart", "wm supercenter"]]),
    KnownMerchant::new("Fred Meyer", &[&["fred meyer", "fred-meyer"]]),
    KnownMerchant::new("GOODWILL", &[&["goodwill"]]),
    KnownMerchant::new("NETFLIX", &[&["netflix"]]),
    KnownMerchant::new("SPOTIFY", &[&["spotify"]]),
    KnownMerchant::new("Apple Store", &[&["apple"], &["store", "itunes"]]),
    KnownMerchant::new("GOOGLE", &[&["google"]]),
    KnownMerchant::new("MICROSOFT", &[&["microsoft"]]),
    KnownMerchant::new("Too Good", &[&["too good to go"]]),
    KnownMerchant::new("Summit Snoqualmie", &[&["summit"], &["snoqualmie"]]),
    KnownMerchant::new("CLAIRE", &[&["claire"]]),
    KnownMerchant::new("Ten Seconds", &[&["ten seconds"]]),
    KnownMerchant::new("LEGOLAND", &[&["legoland"]]),
    KnownMerchant::new("Dough Zone", &[&["dough zone"]]),
    KnownMerchant::new("Parking", &[&["pay by phone", "paybyphone"]]),
    KnownMerchant::new("Spokane Club", &[&["spokane"], &["hotel", "club"]]),
    KnownMerchant::new("Spokane Restaurant", &[&["spokane"], &["restaurant", "kitchen"]]),
    KnownMerchant::new("Spokane Business", &[&["spokane"]]),
];

const STOP_WORDS: &[&str] = &["phone", "number:", "folio", "arrive:", "depart:", "www", "com", "ecom"];

const MAX_WORDS: usize = 2;
const FALLBACK_MAX_CHARS: usize = 15;

/// Maps a raw statement description to a merchant name of at most two words.
pub fn normalize(raw_description: &str) -> String {
    known_merchant(raw_description)
        .map(str::to_string)
        .unwrap_or_else(|| heuristic_name(raw_description))
}

/// Canonical name of the first known merchant matching `raw_description`.
pub fn known_merchant(raw_description: &str) -> Option<&'static str> {
    let lowered = raw_description.to_lowercase();
    KNOWN_MERCHANTS
        .iter()
        .find(|m| m.matches(&lowered))
        .map(|m| m.name)
}

fn heuristic_name(raw_description: &str) -> String {
    let mut cleaned = raw_description.trim();
    for prefix in PROCESSOR_PREFIXES {
        if let Some(rest) = cleaned.strip_prefix(prefix) {
            cleaned = rest.trim();
        }
    }

    let words: Vec<&str> = cleaned.split_whitespace().collect();
    let kept: Vec<String> = words
        .iter()
        .copied()
        .filter(|w| !is_noise(w))
        .take(MAX_WORDS)
        .map(title_case)
        .collect();

    if !kept.is_empty() {
        return kept.join(" ");
    }

    let first = words.first().copied().unwrap_or(cleaned);
    truncate_chars(&title_case(first), FALLBACK_MAX_CHARS)
}

/// Phone numbers, state codes, filler words and single characters.
fn is_noise(word: &str) -> bool {
    is_phone_like(word)
        || (word.chars().count() == 2 && is_upper(word))
        || STOP_WORDS.contains(&word.to_lowercase().as_str())
        || word.chars().count() <= 1
}
